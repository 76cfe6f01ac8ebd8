//! MCP tool handler implementations

use std::sync::Arc;

use foreman_core::{
    display::{Ideas, PlanSummaries},
    params as core, Agent,
};
use log::debug;
use rmcp::{
    handler::server::tool::Parameters,
    model::{CallToolResult, Content},
    ErrorData,
};
use schemars::JsonSchema;
use serde::Deserialize;

use super::errors::to_mcp_error;

/// Transparent MCP wrapper adding deserialization and a JSON schema to a core
/// parameter type.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct McpParams<T>(T)
where
    T: JsonSchema;

impl<T> JsonSchema for McpParams<T>
where
    T: JsonSchema,
{
    fn schema_name() -> std::borrow::Cow<'static, str> {
        T::schema_name()
    }

    fn json_schema(g: &mut schemars::SchemaGenerator) -> schemars::Schema {
        T::json_schema(g)
    }
}

impl<T> AsRef<T> for McpParams<T>
where
    T: JsonSchema,
{
    fn as_ref(&self) -> &T {
        &self.0
    }
}

pub type PlanDate = McpParams<core::PlanDate>;
pub type ListPlans = McpParams<core::ListPlans>;

pub type McpResult = Result<CallToolResult, ErrorData>;

fn text(body: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(body)])
}

fn resolve_date(params: &PlanDate) -> Result<jiff::civil::Date, ErrorData> {
    params
        .as_ref()
        .resolve()
        .map_err(|e| to_mcp_error("Invalid date", &e))
}

pub struct McpHandlers {
    agent: Arc<Agent>,
}

impl McpHandlers {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { agent }
    }

    pub async fn status(&self, Parameters(params): Parameters<PlanDate>) -> McpResult {
        debug!("status: {params:?}");
        let date = resolve_date(&params)?;
        let snapshot = self
            .agent
            .status(date)
            .await
            .map_err(|e| to_mcp_error("Failed to read status", &e))?;
        Ok(text(snapshot.to_string()))
    }

    pub async fn show_plan(&self, Parameters(params): Parameters<PlanDate>) -> McpResult {
        debug!("show_plan: {params:?}");
        let date = resolve_date(&params)?;
        let plan = self
            .agent
            .store()
            .get_plan(date)
            .await
            .map_err(|e| to_mcp_error("Failed to read plan", &e))?;
        match plan {
            Some(plan) => Ok(text(plan.to_string())),
            None => Ok(text(format!("No plan for {date}."))),
        }
    }

    pub async fn list_plans(&self, Parameters(params): Parameters<ListPlans>) -> McpResult {
        debug!("list_plans: {params:?}");
        let plans = self
            .agent
            .store()
            .list_plans(params.as_ref().limit)
            .await
            .map_err(|e| to_mcp_error("Failed to list plans", &e))?;
        Ok(text(format!("# Recent plans\n\n{}", PlanSummaries(plans))))
    }

    pub async fn list_ideas(&self) -> McpResult {
        let ideas = self
            .agent
            .store()
            .latest_ideas()
            .await
            .map_err(|e| to_mcp_error("Failed to list ideas", &e))?;
        Ok(text(Ideas(ideas).to_string()))
    }

    pub async fn generate_ideas(&self, Parameters(params): Parameters<PlanDate>) -> McpResult {
        debug!("generate_ideas: {params:?}");
        let date = resolve_date(&params)?;
        let ideas = self
            .agent
            .generate_ideas(date)
            .await
            .map_err(|e| to_mcp_error("Failed to generate ideas", &e))?;
        Ok(text(Ideas(ideas).to_string()))
    }

    pub async fn build_plan(&self, Parameters(params): Parameters<PlanDate>) -> McpResult {
        debug!("build_plan: {params:?}");
        let date = resolve_date(&params)?;
        let plan = self
            .agent
            .build_plan(date)
            .await
            .map_err(|e| to_mcp_error("Failed to build plan", &e))?;
        Ok(text(plan.to_string()))
    }

    pub async fn execute_plan(&self, Parameters(params): Parameters<PlanDate>) -> McpResult {
        debug!("execute_plan: {params:?}");
        let date = resolve_date(&params)?;
        let plan = self
            .agent
            .execute_plan(date)
            .await
            .map_err(|e| to_mcp_error("Failed to execute plan", &e))?;
        Ok(text(plan.to_string()))
    }

    pub async fn run_maintenance(&self) -> McpResult {
        let report = self
            .agent
            .run_maintenance()
            .await
            .map_err(|e| to_mcp_error("Maintenance failed", &e))?;
        Ok(text(report.to_string()))
    }

    pub async fn send_report(&self, Parameters(params): Parameters<PlanDate>) -> McpResult {
        debug!("send_report: {params:?}");
        let date = resolve_date(&params)?;
        let outcome = self
            .agent
            .report_status(date)
            .await
            .map_err(|e| to_mcp_error("Failed to send report", &e))?;
        Ok(text(outcome.to_string()))
    }

    pub async fn run_cycle(&self, Parameters(params): Parameters<PlanDate>) -> McpResult {
        debug!("run_cycle: {params:?}");
        let date = resolve_date(&params)?;
        let summary = self.agent.run_daily_cycle(date).await;
        Ok(text(summary.to_string()))
    }
}
