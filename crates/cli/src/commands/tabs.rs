// `rpcdesk tabs`: list the tabs saved by the last session.

use clap::Args;
use rpcdesk_common::types::TabStateRecord;
use rpcdesk_workbench::tabs::RequestWorkspace;
use serde::Serialize;

use super::Context;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct TabsArgs {
    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TabsResult {
    pub tabs: Vec<TabEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabEntry {
    pub tab_id: String,
    pub name: String,
    pub server_id: i64,
    pub service: String,
    pub method: String,
    pub active: bool,
    pub order: i64,
}

impl TabEntry {
    fn from_record(record: &TabStateRecord) -> Self {
        let workspace = RequestWorkspace::from_state(&record.state);
        Self {
            tab_id: record.tab_id.clone(),
            name: record.name.clone(),
            server_id: workspace.server_id,
            service: workspace.service_name,
            method: workspace.method_name,
            active: record.is_active,
            order: record.order,
        }
    }
}

pub fn run(args: TabsArgs, context: &Context) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = context.open_store().and_then(|store| store.tab_states()).map(|records| TabsResult {
        tabs: records.iter().map(TabEntry::from_record).collect(),
    });

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

fn format_human(result: &TabsResult) -> String {
    if result.tabs.is_empty() {
        return "No saved tabs.".into();
    }

    let mut lines = vec![format!("{} tab(s)", result.tabs.len())];
    for tab in &result.tabs {
        let marker = if tab.active { '*' } else { ' ' };
        lines.push(format!("{marker} {}  {}/{} (server {})", tab.name, tab.service, tab.method, tab.server_id));
    }
    lines.join("\n")
}
