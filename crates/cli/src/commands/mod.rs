// CLI subcommand dispatch and shared input helpers.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Subcommand;
use rpcdesk_common::schema::MessageInfo;
use rpcdesk_workbench::config::GlobalConfig;
use rpcdesk_workbench::store::SqliteStore;
use tracing::debug;

pub mod annotate;
pub mod complete;
pub mod example;
pub mod history;
pub mod tabs;

#[derive(Subcommand)]
pub enum Command {
    /// List persisted tabs
    Tabs(tabs::TabsArgs),
    /// List or delete invocation history
    History(history::HistoryArgs),
    /// Print an example request body for a message schema
    Example(example::ExampleArgs),
    /// Show where editing widgets would attach in a request body
    Annotate(annotate::AnnotateArgs),
    /// Show completion candidates at a cursor offset
    Complete(complete::CompleteArgs),
}

/// Options shared by every subcommand.
pub struct Context {
    pub database: Option<PathBuf>,
}

impl Context {
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database {
            Some(path) => Ok(path.clone()),
            None => GlobalConfig::load()
                .database_path()
                .context("could not determine home directory for the database"),
        }
    }

    pub fn open_store(&self) -> Result<SqliteStore> {
        let path = self.database_path()?;
        debug!(path = %path.display(), "opening database");
        SqliteStore::open(&path).with_context(|| format!("failed to open database {}", path.display()))
    }
}

pub fn run(cmd: Command, context: &Context) -> Result<()> {
    match cmd {
        Command::Tabs(args) => tabs::run(args, context),
        Command::History(args) => history::run(args, context),
        Command::Example(args) => example::run(args),
        Command::Annotate(args) => annotate::run(args),
        Command::Complete(args) => complete::run(args),
    }
}

pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Load a message schema in the reflection collaborator's JSON layout.
pub fn read_schema(path: &Path) -> Result<MessageInfo> {
    let text = read_text(path)?;
    MessageInfo::from_json(&text).with_context(|| format!("invalid schema in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn explicit_database_wins() {
        let context = Context { database: Some(PathBuf::from("/tmp/other.db")) };
        assert_eq!(context.database_path().unwrap(), PathBuf::from("/tmp/other.db"));
    }

    #[test]
    fn read_schema_reports_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(&path, "not json").unwrap();
        let err = read_schema(&path).unwrap_err();
        assert!(format!("{err:#}").contains("schema.json"));

        std::fs::write(&path, r#"{"name": "pkg.Empty", "fields": []}"#).unwrap();
        assert_eq!(read_schema(&path).unwrap().name, "pkg.Empty");
    }
}
