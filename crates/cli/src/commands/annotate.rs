// `rpcdesk annotate`: list the widgets the body editor would attach.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use rpcdesk_common::schema::SchemaIndex;
use rpcdesk_workbench::editor::{annotate, Annotation, WidgetKind};
use serde::Serialize;

use super::{read_schema, read_text};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct AnnotateArgs {
    /// Request message schema (reflection JSON).
    #[arg(long)]
    schema: PathBuf,

    /// Request body (JSON, comments allowed).
    #[arg(long)]
    body: PathBuf,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnotateResult {
    pub annotations: Vec<Annotation>,
}

pub fn run(args: AnnotateArgs) -> Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = annotations(&args);

    match result {
        Ok(result) => {
            output::print_output(format, &result, format_human)?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

fn annotations(args: &AnnotateArgs) -> Result<AnnotateResult> {
    let message = read_schema(&args.schema)?;
    let body = read_text(&args.body)?;
    let index = SchemaIndex::build(Some(&message));
    Ok(AnnotateResult { annotations: annotate(&body, &index) })
}

fn format_human(result: &AnnotateResult) -> String {
    if result.annotations.is_empty() {
        return "No widgets.".into();
    }

    let mut lines = vec![format!("{} widget(s)", result.annotations.len())];
    for annotation in &result.annotations {
        let kind = match annotation.kind {
            WidgetKind::Enum => "enum",
            WidgetKind::Timestamp => "timestamp",
            WidgetKind::Duration => "duration",
        };
        lines.push(format!("  @{:<6} {:<10} {}", annotation.offset, kind, annotation.field_path));
    }
    lines.join("\n")
}
