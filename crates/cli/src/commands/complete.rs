// `rpcdesk complete`: show completion candidates at a byte offset.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use rpcdesk_common::schema::SchemaIndex;
use rpcdesk_workbench::editor::{complete, CompletionContext, CompletionList};
use serde::Serialize;

use super::{read_schema, read_text};
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct CompleteArgs {
    /// Request message schema (reflection JSON).
    #[arg(long)]
    schema: PathBuf,

    /// Request body (JSON, comments allowed).
    #[arg(long)]
    body: PathBuf,

    /// Byte offset of the cursor in the body.
    #[arg(long)]
    cursor: usize,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompleteResult {
    pub completion: Option<CompletionList>,
}

pub fn run(args: CompleteArgs) -> Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = completion(&args);

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

fn completion(args: &CompleteArgs) -> Result<CompleteResult> {
    let message = read_schema(&args.schema)?;
    let body = read_text(&args.body)?;
    if args.cursor > body.len() {
        bail!("cursor {} is past the end of the body ({} bytes)", args.cursor, body.len());
    }
    let index = SchemaIndex::build(Some(&message));
    let context = CompletionContext { text: &body, cursor: args.cursor, explicit: true };
    Ok(CompleteResult { completion: complete(Some(&index), false, context) })
}

fn format_human(result: &CompleteResult) -> String {
    let Some(list) = &result.completion else {
        return "No completions.".into();
    };

    let mut lines = vec![format!("{} candidate(s) from offset {}", list.items.len(), list.from)];
    for item in &list.items {
        lines.push(format!("  {:<24} {}", item.label, item.detail));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use rpcdesk_workbench::editor::{CompletionItem, CompletionKind};

    use super::*;

    #[test]
    fn human_format_lists_candidates() {
        let result = CompleteResult {
            completion: Some(CompletionList {
                from: 10,
                items: vec![CompletionItem {
                    label: "HAPPY".into(),
                    kind: CompletionKind::EnumMember,
                    detail: "enum (1)".into(),
                }],
            }),
        };
        let text = format_human(&result);
        assert!(text.starts_with("1 candidate(s) from offset 10"));
        assert!(text.contains("HAPPY"));
        assert!(text.contains("enum (1)"));
    }

    #[test]
    fn human_format_without_candidates() {
        assert_eq!(format_human(&CompleteResult { completion: None }), "No completions.");
    }
}
