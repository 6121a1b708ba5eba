// `rpcdesk history`: list or delete recorded invocations.

use anyhow::bail;
use clap::{Args, Subcommand};
use rpcdesk_common::types::HistoryRecord;
use serde::Serialize;

use super::Context;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct HistoryArgs {
    #[command(subcommand)]
    command: HistoryCommand,
}

#[derive(Debug, Subcommand)]
enum HistoryCommand {
    /// List recent invocations, newest first
    List(ListArgs),
    /// Delete one history item
    Delete(DeleteArgs),
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Only show invocations against this server.
    #[arg(long)]
    server: Option<i64>,

    /// Maximum number of records.
    #[arg(long, default_value_t = 20)]
    limit: usize,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct DeleteArgs {
    id: i64,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize)]
struct ListResult {
    history: Vec<HistoryRecord>,
}

#[derive(Debug, Clone, Serialize)]
struct DeleteResult {
    deleted: i64,
}

pub fn run(args: HistoryArgs, context: &Context) -> anyhow::Result<()> {
    match args.command {
        HistoryCommand::List(args) => list(args, context),
        HistoryCommand::Delete(args) => delete(args, context),
    }
}

fn list(args: ListArgs, context: &Context) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = context
        .open_store()
        .and_then(|store| store.history(args.server, args.limit))
        .map(|history| ListResult { history });

    match result {
        Ok(result) => {
            output::print_output(format, &result, format_list)?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

fn delete(args: DeleteArgs, context: &Context) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = context.open_store().and_then(|store| {
        if !store.remove_history_item(args.id)? {
            bail!("history item {} not found", args.id);
        }
        Ok(DeleteResult { deleted: args.id })
    });

    match result {
        Ok(result) => {
            output::print_output(format, &result, |r| format!("Deleted history item {}.", r.deleted))?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

fn format_list(result: &ListResult) -> String {
    if result.history.is_empty() {
        return "No history.".into();
    }

    let mut lines = vec![format!("{} invocation(s)", result.history.len())];
    for record in &result.history {
        let outcome = match &record.error {
            Some(error) => format!("failed: {}", first_line(error)),
            None => "ok".to_string(),
        };
        lines.push(format!(
            "  #{:<5} {}/{}  {}ms  {}  {}",
            record.id,
            record.service,
            record.method,
            record.execution_time_ms,
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            outcome,
        ));
    }
    lines.join("\n")
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
