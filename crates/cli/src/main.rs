// rpcdesk CLI entry point.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "rpcdesk", about = "Inspect rpcdesk sessions, history and request schemas")]
struct Cli {
    /// Database file to use instead of the configured one.
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Command,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let context = commands::Context { database: cli.database };
    commands::run(cli.command, &context)
}
