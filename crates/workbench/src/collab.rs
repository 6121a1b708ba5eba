// Collaborator seams: server catalog, invocation transport, history and tab
// state storage. Implementations live outside the workbench (the SQLite store
// in `store` covers the storage side).

use anyhow::Result;
use async_trait::async_trait;
use rpcdesk_common::types::{HistoryRecord, Server, ServerWithReflection, TabStateRecord, ValidationResult};
use serde::Serialize;
use thiserror::Error;

use crate::store::NewHistoryRecord;

/// Fields needed to register a server.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServerDraft {
    pub name: String,
    pub address: String,
    pub use_tls: bool,
    pub insecure: bool,
}

#[async_trait]
pub trait ServerCatalog: Send + Sync {
    async fn list_servers_with_reflection(&self) -> Result<Vec<ServerWithReflection>>;
    async fn get_server_with_reflection(&self, id: i64) -> Result<ServerWithReflection>;
    async fn create_server(&self, draft: ServerDraft) -> Result<i64>;
    async fn update_server(&self, server: Server) -> Result<()>;
    async fn delete_server(&self, id: i64) -> Result<()>;
    async fn toggle_favorite(&self, id: i64) -> Result<()>;
    async fn validate_server_address(&self, address: &str, use_tls: bool, insecure: bool) -> Result<ValidationResult>;
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InvokeRequest {
    pub server_id: i64,
    pub address: String,
    pub service: String,
    pub method: String,
    pub body: String,
    pub metadata: Vec<(String, String)>,
    pub context_values: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeResponse {
    pub body: String,
    pub elapsed_ms: i64,
}

/// A rejected invocation. The message may itself be a JSON document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct InvokeError {
    pub message: String,
}

impl InvokeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(&self, request: InvokeRequest) -> Result<InvokeResponse, InvokeError>;
}

#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Newest first. `server_id = None` lists every server.
    async fn list_history(&self, server_id: Option<i64>, limit: usize) -> Result<Vec<HistoryRecord>>;
    async fn delete_history_item(&self, id: i64) -> Result<()>;
}

/// Where invocation outcomes are written. Returns the new row id.
#[async_trait]
pub trait HistorySink: Send + Sync {
    async fn record_history(&self, record: NewHistoryRecord) -> Result<i64>;
}

#[async_trait]
pub trait TabStateStore: Send + Sync {
    async fn save_tab_states(&self, records: Vec<TabStateRecord>) -> Result<()>;
    async fn get_tab_states(&self) -> Result<Vec<TabStateRecord>>;
    async fn delete_tab_state(&self, tab_id: &str) -> Result<()>;
}
