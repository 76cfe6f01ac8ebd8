//! MCP server exposing the agent's control operations as tools

use std::{future::Future, sync::Arc};

use anyhow::Result;
use foreman_core::Agent;
use log::{debug, error, info};
use rmcp::{
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ServerHandler,
};
use tokio::signal::unix::{signal, SignalKind};

pub mod errors;
pub mod handlers;

pub use handlers::{ListPlans, McpResult, PlanDate};

#[derive(Clone)]
pub struct ForemanMcpServer {
    agent: Arc<Agent>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ForemanMcpServer {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self {
            agent,
            tool_router: Self::tool_router(),
        }
    }

    fn handlers(&self) -> handlers::McpHandlers {
        handlers::McpHandlers::new(self.agent.clone())
    }

    #[tool(
        name = "status",
        description = "Show the organization counters, recent actions, the plan for a date (default today, UTC), known repositories and the latest ranked ideas. Read-only."
    )]
    async fn status(&self, params: Parameters<PlanDate>) -> McpResult {
        self.handlers().status(params).await
    }

    #[tool(
        name = "show_plan",
        description = "Show the daily plan for a date (YYYY-MM-DD, default today) with the status, reference, error and attempt count of every entry. Read-only."
    )]
    async fn show_plan(&self, params: Parameters<PlanDate>) -> McpResult {
        self.handlers().show_plan(params).await
    }

    #[tool(
        name = "list_plans",
        description = "List recent daily plans, newest first, with their status and how many entries succeeded. Read-only."
    )]
    async fn list_plans(&self, params: Parameters<ListPlans>) -> McpResult {
        self.handlers().list_plans(params).await
    }

    #[tool(
        name = "list_ideas",
        description = "Show the latest batch of ranked project ideas, best first. Read-only."
    )]
    async fn list_ideas(&self) -> McpResult {
        self.handlers().list_ideas().await
    }

    #[tool(
        name = "generate_ideas",
        description = "Generate and rank project ideas for a date. If a batch already exists for that date it is returned unchanged."
    )]
    async fn generate_ideas(&self, params: Parameters<PlanDate>) -> McpResult {
        self.handlers().generate_ideas(params).await
    }

    #[tool(
        name = "build_plan",
        description = "Build the plan of exactly N actions for a date from the ranked ideas, padded with maintenance triage. Returns the existing plan unchanged if one was already built."
    )]
    async fn build_plan(&self, params: Parameters<PlanDate>) -> McpResult {
        self.handlers().build_plan(params).await
    }

    #[tool(
        name = "execute_plan",
        description = "Execute the pending entries of the plan for a date against GitHub. Entries already resolved are never repeated; an executed plan is returned as is."
    )]
    async fn execute_plan(&self, params: Parameters<PlanDate>) -> McpResult {
        self.handlers().execute_plan(params).await
    }

    #[tool(
        name = "run_maintenance",
        description = "Sync the repository list from GitHub, close issues inactive for longer than the stale threshold and count open pull requests."
    )]
    async fn run_maintenance(&self) -> McpResult {
        self.handlers().run_maintenance().await
    }

    #[tool(
        name = "send_report",
        description = "Send the status digest for a date to every configured channel. A report is sent at most once per date."
    )]
    async fn send_report(&self, params: Parameters<PlanDate>) -> McpResult {
        self.handlers().send_report(params).await
    }

    #[tool(
        name = "run_cycle",
        description = "Run the whole daily cycle for a date: ideas, plan, execution, maintenance and report. Each step is idempotent."
    )]
    async fn run_cycle(&self, params: Parameters<PlanDate>) -> McpResult {
        self.handlers().run_cycle(params).await
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for ForemanMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "foreman".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(r#"Foreman runs a GitHub organization on a daily cycle.

## Daily cycle
1. `generate_ideas` proposes and ranks project ideas
2. `build_plan` turns the best ideas into exactly N actions (create a repository, open a feature branch) and pads with issue triage
3. `execute_plan` performs the pending actions with bounded retries
4. `run_maintenance` closes stale issues and counts open pull requests
5. `send_report` delivers the daily digest once

`run_cycle` does all of the above. Every tool is safe to call again: finished work is never repeated.

Use `status`, `show_plan`, `list_plans` and `list_ideas` to inspect state without side effects. Dates are YYYY-MM-DD in UTC and default to today."#.to_string()),
        }
    }
}

/// Runs the server on stdio until the client disconnects or a signal arrives.
pub async fn run_stdio_server(server: ForemanMcpServer) -> Result<()> {
    use rmcp::{transport::stdio, ServiceExt};

    info!("Starting Foreman MCP server on stdio");
    debug!(
        "Server created with {} tools",
        server.tool_router.list_all().len()
    );

    let agent = server.agent.clone();
    let service = server.serve(stdio()).await.inspect_err(|e| {
        error!("serving error: {e:?}");
    })?;

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        result = service.waiting() => {
            match result {
                Ok(_) => info!("MCP server stopped normally"),
                Err(e) => error!("MCP server error: {e:?}"),
            }
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }

    agent.request_shutdown();
    info!("MCP server shutdown complete");
    Ok(())
}
