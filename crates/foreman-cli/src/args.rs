use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::{IdeaCommands, PlanCommands, PlanDateArgs};

/// Foreman runs a GitHub organization on a daily cycle: it proposes project
/// ideas, plans a fixed number of actions per day, executes them, tidies the
/// existing repositories and sends one status report.
///
/// Every command can be repeated safely; work already done for a day is never
/// done twice.
#[derive(Parser)]
#[command(version, about, name = "foreman")]
pub struct Args {
    /// Path to the SQLite database file. Defaults to
    /// $XDG_DATA_HOME/foreman/foreman.db
    #[arg(long, global = true)]
    pub database_file: Option<PathBuf>,

    /// Path to the TOML configuration file. Defaults to
    /// $XDG_CONFIG_HOME/foreman/config.toml when present
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable colored output and use plain text
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate and inspect ranked project ideas
    #[command(alias = "i")]
    Ideas {
        #[command(subcommand)]
        command: IdeaCommands,
    },
    /// Build, execute and inspect daily plans
    #[command(alias = "p")]
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Sync repositories, close stale issues and count open pull requests
    Maintain,
    /// Send the daily status report unless it was already sent
    Report(PlanDateArgs),
    /// Show counters, the day's plan, repositories and ideas
    Status(PlanDateArgs),
    /// Run one full daily cycle now
    Run(PlanDateArgs),
    /// Run the daily cycle on schedule until interrupted
    Daemon,
    /// Start the MCP server on stdio
    Serve,
}
