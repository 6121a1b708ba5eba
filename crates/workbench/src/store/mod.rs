// Persistence: SQLite-backed tab state and invocation history.

pub mod history;
pub mod meta_db;
pub mod tab_states;

use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use rpcdesk_common::types::{HistoryRecord, TabStateRecord};

pub use history::{HistoryTable, NewHistoryRecord, MAX_HISTORY_SIZE};
pub use meta_db::MetaDb;
pub use tab_states::TabStatesTable;

use crate::collab::{HistorySink, HistorySource, TabStateStore};

/// Storage collaborator over one SQLite database.
#[derive(Debug)]
pub struct SqliteStore {
    db: Mutex<MetaDb>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self { db: Mutex::new(MetaDb::open(path)?) })
    }

    pub fn tab_states(&self) -> Result<Vec<TabStateRecord>> {
        let db = self.db.lock().expect("database lock poisoned");
        TabStatesTable::list(db.connection())
    }

    pub fn replace_tab_states(&self, records: &[TabStateRecord]) -> Result<()> {
        let mut db = self.db.lock().expect("database lock poisoned");
        TabStatesTable::replace_all(db.connection_mut(), records)
    }

    pub fn remove_tab_state(&self, tab_id: &str) -> Result<bool> {
        let db = self.db.lock().expect("database lock poisoned");
        TabStatesTable::delete(db.connection(), tab_id)
    }

    pub fn history(&self, server_id: Option<i64>, limit: usize) -> Result<Vec<HistoryRecord>> {
        let db = self.db.lock().expect("database lock poisoned");
        HistoryTable::list(db.connection(), server_id, limit)
    }

    pub fn history_item(&self, id: i64) -> Result<Option<HistoryRecord>> {
        let db = self.db.lock().expect("database lock poisoned");
        HistoryTable::get(db.connection(), id)
    }

    pub fn append_history(&self, record: &NewHistoryRecord) -> Result<i64> {
        let mut db = self.db.lock().expect("database lock poisoned");
        HistoryTable::append(db.connection_mut(), record)
    }

    pub fn remove_history_item(&self, id: i64) -> Result<bool> {
        let db = self.db.lock().expect("database lock poisoned");
        HistoryTable::delete(db.connection(), id)
    }
}

#[async_trait]
impl TabStateStore for SqliteStore {
    async fn save_tab_states(&self, records: Vec<TabStateRecord>) -> Result<()> {
        self.replace_tab_states(&records)
    }

    async fn get_tab_states(&self) -> Result<Vec<TabStateRecord>> {
        self.tab_states()
    }

    async fn delete_tab_state(&self, tab_id: &str) -> Result<()> {
        self.remove_tab_state(tab_id).map(|_| ())
    }
}

#[async_trait]
impl HistorySource for SqliteStore {
    async fn list_history(&self, server_id: Option<i64>, limit: usize) -> Result<Vec<HistoryRecord>> {
        self.history(server_id, limit)
    }

    async fn delete_history_item(&self, id: i64) -> Result<()> {
        self.remove_history_item(id).map(|_| ())
    }
}

#[async_trait]
impl HistorySink for SqliteStore {
    async fn record_history(&self, record: NewHistoryRecord) -> Result<i64> {
        self.append_history(&record)
    }
}
