//! Foreman CLI: one-shot commands, the scheduling daemon and the MCP server.

mod args;
mod cli;
mod mcp;
mod renderer;

use std::sync::Arc;

use anyhow::{Context, Result};
use args::{Args, Commands};
use clap::Parser;
use cli::{Cli, PlanDateArgs};
use foreman_core::{Agent, Collaborators, Config, StateStoreBuilder};
use log::info;
use mcp::{run_stdio_server, ForemanMcpServer};
use renderer::TerminalRenderer;
use Commands::*;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let Args {
        database_file,
        config,
        no_color,
        command,
    } = Args::parse();

    let config = Config::load(config.as_deref()).context("Failed to load configuration")?;
    let store = StateStoreBuilder::new()
        .with_database_path(database_file)
        .build()
        .await
        .context("Failed to initialize state store")?;
    let collaborators =
        Collaborators::from_config(&config).context("Failed to set up collaborators")?;

    let agent = Arc::new(Agent::new(config, store, collaborators));
    let cli = Cli::new(agent.clone(), TerminalRenderer::new(!no_color));

    info!("Foreman started");

    match command {
        Some(Ideas { command }) => cli.handle_idea_command(command).await,
        Some(Plan { command }) => cli.handle_plan_command(command).await,
        Some(Maintain) => cli.maintain().await,
        Some(Report(args)) => cli.report(args).await,
        Some(Status(args)) => cli.status(args).await,
        Some(Run(args)) => cli.run_cycle(args).await,
        Some(Daemon) => cli.daemon().await,
        Some(Serve) => {
            info!("Starting Foreman MCP server");
            run_stdio_server(ForemanMcpServer::new(agent))
                .await
                .context("MCP server failed")
        }
        None => cli.status(PlanDateArgs { date: None }).await,
    }
}
