// Application context: the stores and collaborators a running workbench
// needs, constructed once and shared as `Arc<Workbench>`.

use std::sync::{Arc, Mutex};

use rpcdesk_common::jsonc::strip_comments;
use rpcdesk_common::schema::{generate_example, MessageInfo};
use rpcdesk_common::types::{HistoryRecord, Server, ServerWithReflection};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::busy::BusyStore;
use crate::collab::{
    HistorySource, InvokeError, InvokeRequest, InvokeResponse, Invoker, ServerCatalog, ServerDraft,
    TabStateStore,
};
use crate::config::GlobalConfig;
use crate::error::WorkbenchError;
use crate::history_list::HistoryList;
use crate::invoke::format_invocation_error;
use crate::notifications::Notifications;
use crate::session::{Scheduler, SessionPersistence};
use crate::tabs::{OpenRequest, RequestWorkspace, Tab, TabStore, WorkspacePatch};

/// External services the workbench talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub servers: Arc<dyn ServerCatalog>,
    pub invoker: Arc<dyn Invoker>,
    pub history: Arc<dyn HistorySource>,
    pub tab_states: Arc<dyn TabStateStore>,
}

pub struct Workbench {
    collab: Collaborators,
    config: GlobalConfig,
    tabs: Arc<Mutex<TabStore>>,
    session: Arc<SessionPersistence>,
    busy: BusyStore,
    notifications: Notifications,
    history: Mutex<HistoryList>,
    observer: Mutex<Option<JoinHandle<()>>>,
}

impl Workbench {
    pub fn new(collab: Collaborators, scheduler: Arc<dyn Scheduler>, config: GlobalConfig) -> Self {
        let session =
            Arc::new(SessionPersistence::new(Arc::clone(&collab.tab_states), scheduler, config.quiet_period()));
        Self {
            collab,
            config,
            tabs: Arc::new(Mutex::new(TabStore::new())),
            session,
            busy: BusyStore::new(),
            notifications: Notifications::new(),
            history: Mutex::new(HistoryList::new()),
            observer: Mutex::new(None),
        }
    }

    /// Restore saved tabs, then start persisting mutations. Until this
    /// returns the tab store reports "not loaded".
    pub async fn start(&self) {
        let restored = self.session.restore().await;
        let events = {
            let mut tabs = self.tabs.lock().expect("tab store lock poisoned");
            let events = tabs.subscribe();
            tabs.hydrate(restored);
            info!(tabs = tabs.len(), "tab session restored");
            events
        };

        let handle = Arc::clone(&self.session).observe(Arc::downgrade(&self.tabs), events);
        if let Some(previous) = self.observer.lock().expect("observer lock poisoned").replace(handle) {
            previous.abort();
        }
        self.refresh_history().await;
    }

    /// Write the current tabs immediately.
    pub async fn shutdown(&self) {
        let snapshot = self.tabs.lock().expect("tab store lock poisoned").snapshot();
        self.session.flush_now(snapshot).await;
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    /// Shared handle to the tab store, for views that subscribe to it.
    pub fn tab_store(&self) -> Arc<Mutex<TabStore>> {
        Arc::clone(&self.tabs)
    }

    pub fn is_loaded(&self) -> bool {
        self.tabs.lock().expect("tab store lock poisoned").is_loaded()
    }

    pub fn tabs(&self) -> Vec<Tab> {
        self.tabs.lock().expect("tab store lock poisoned").tabs().to_vec()
    }

    pub fn tab(&self, id: &str) -> Option<Tab> {
        self.tabs.lock().expect("tab store lock poisoned").get(id).cloned()
    }

    // ── Tabs ───────────────────────────────────────────────────────

    /// Open a method in a tab seeded with an example body. The body falls
    /// back to `{}` when the server schema cannot be fetched.
    pub async fn open_method(&self, server_id: i64, service: &str, method: &str) -> String {
        let request = self.request_message(server_id, service, method).await;
        let example_body = generate_example(request.as_ref());
        let mut tabs = self.tabs.lock().expect("tab store lock poisoned");
        tabs.open(OpenRequest::Method {
            server_id,
            service: service.to_string(),
            method: method.to_string(),
            example_body,
        })
    }

    pub fn open_history(&self, record: HistoryRecord) -> String {
        self.tabs.lock().expect("tab store lock poisoned").open(OpenRequest::History(record))
    }

    pub fn activate(&self, id: &str) -> bool {
        self.tabs.lock().expect("tab store lock poisoned").activate(id)
    }

    pub fn close(&self, id: &str) -> bool {
        self.tabs.lock().expect("tab store lock poisoned").close(id)
    }

    pub fn close_others(&self, id: &str) -> bool {
        self.tabs.lock().expect("tab store lock poisoned").close_others(id)
    }

    pub fn close_all(&self) {
        self.tabs.lock().expect("tab store lock poisoned").close_all();
    }

    pub fn update_workspace(&self, id: &str, patch: WorkspacePatch) -> bool {
        self.tabs.lock().expect("tab store lock poisoned").update_workspace(id, patch)
    }

    /// Request message schema for the tab's method, for the body editor.
    pub async fn request_schema(&self, tab_id: &str) -> Option<MessageInfo> {
        let workspace = self.tab(tab_id)?.workspace;
        self.request_message(workspace.server_id, &workspace.service_name, &workspace.method_name).await
    }

    async fn request_message(&self, server_id: i64, service: &str, method: &str) -> Option<MessageInfo> {
        match self.collab.servers.get_server_with_reflection(server_id).await {
            Ok(server) => server.reflection.find_method(service, method).and_then(|m| m.request.clone()),
            Err(error) => {
                warn!(server_id, error = %error, "failed to load server schema");
                None
            }
        }
    }

    // ── Invocation ─────────────────────────────────────────────────

    pub fn is_loading(&self, tab_id: &str) -> bool {
        self.busy.is_busy(tab_id)
    }

    /// Send the tab's request. The response (or a commented error block)
    /// lands in the tab's response pane; a tab closed in the meantime gets
    /// nothing. History is reloaded either way.
    pub async fn send_request(&self, tab_id: &str) -> Result<(), WorkbenchError> {
        let workspace = {
            let mut tabs = self.tabs.lock().expect("tab store lock poisoned");
            let workspace = tabs
                .get(tab_id)
                .map(|tab| tab.workspace.clone())
                .ok_or_else(|| WorkbenchError::UnknownTab(tab_id.to_string()))?;
            tabs.update_workspace(tab_id, WorkspacePatch::response(String::new(), 0));
            workspace
        };
        self.busy.lock(tab_id, self.config.busy_minimum());

        let patch = match self.invoke(&workspace).await {
            Ok(response) => WorkspacePatch::response(response.body, response.elapsed_ms),
            Err(error) => {
                warn!(tab_id = %tab_id, error = %error, "invocation failed");
                self.notifications.error("Request failed", Some(error.message.clone()));
                WorkspacePatch::response(format_invocation_error(&error.message), 0)
            }
        };
        let delivered = self.tabs.lock().expect("tab store lock poisoned").update_workspace(tab_id, patch);
        if !delivered {
            debug!(tab_id = %tab_id, "dropping response for closed tab");
        }

        self.busy.unlock(tab_id).await;
        self.refresh_history().await;
        Ok(())
    }

    async fn invoke(&self, workspace: &RequestWorkspace) -> Result<InvokeResponse, InvokeError> {
        let server = self
            .collab
            .servers
            .get_server_with_reflection(workspace.server_id)
            .await
            .map_err(|error| InvokeError::new(error.to_string()))?;
        let request = InvokeRequest {
            server_id: workspace.server_id,
            address: server.server.address,
            service: workspace.service_name.clone(),
            method: workspace.method_name.clone(),
            body: strip_comments(&workspace.request_body_text),
            metadata: workspace.metadata(),
            context_values: workspace.context_values(),
        };
        self.collab.invoker.invoke(request).await
    }

    // ── History ────────────────────────────────────────────────────

    pub async fn refresh_history(&self) {
        self.history.lock().expect("history lock poisoned").begin_load();
        let loaded = self.collab.history.list_history(None, self.config.history_limit).await;
        let mut history = self.history.lock().expect("history lock poisoned");
        match loaded {
            Ok(records) => history.finish_load(records),
            Err(error) => {
                warn!(error = %error, "failed to load history");
                history.fail_load();
            }
        }
    }

    pub fn history(&self) -> Vec<HistoryRecord> {
        self.history.lock().expect("history lock poisoned").records().to_vec()
    }

    pub fn search_history(&self, query: &str) -> Vec<HistoryRecord> {
        self.history.lock().expect("history lock poisoned").search(query).into_iter().cloned().collect()
    }

    pub fn is_history_loading(&self) -> bool {
        self.history.lock().expect("history lock poisoned").is_loading()
    }

    pub async fn delete_history_item(&self, id: i64) -> Result<(), WorkbenchError> {
        match self.collab.history.delete_history_item(id).await {
            Ok(()) => {
                self.notifications.success("History item deleted", None);
                self.refresh_history().await;
                Ok(())
            }
            Err(error) => {
                self.notifications.error("Failed to delete history item", Some(error.to_string()));
                Err(error.into())
            }
        }
    }

    // ── Servers ────────────────────────────────────────────────────

    pub async fn servers(&self) -> Result<Vec<ServerWithReflection>, WorkbenchError> {
        Ok(self.collab.servers.list_servers_with_reflection().await?)
    }

    /// Validate the address, then register the server.
    pub async fn create_server(&self, draft: ServerDraft) -> Result<i64, WorkbenchError> {
        self.validate(&draft.address, draft.use_tls, draft.insecure).await?;
        let name = draft.name.clone();
        match self.collab.servers.create_server(draft).await {
            Ok(id) => {
                self.notifications.success("Server added", Some(name));
                Ok(id)
            }
            Err(error) => {
                self.notifications.error("Failed to add server", Some(error.to_string()));
                Err(error.into())
            }
        }
    }

    pub async fn update_server(&self, server: Server) -> Result<(), WorkbenchError> {
        self.validate(&server.address, server.use_tls, server.insecure).await?;
        let name = server.name.clone();
        match self.collab.servers.update_server(server).await {
            Ok(()) => {
                self.notifications.success("Server updated", Some(name));
                Ok(())
            }
            Err(error) => {
                self.notifications.error("Failed to update server", Some(error.to_string()));
                Err(error.into())
            }
        }
    }

    pub async fn delete_server(&self, id: i64) -> Result<(), WorkbenchError> {
        match self.collab.servers.delete_server(id).await {
            Ok(()) => {
                self.notifications.success("Server deleted", None);
                Ok(())
            }
            Err(error) => {
                self.notifications.error("Failed to delete server", Some(error.to_string()));
                Err(error.into())
            }
        }
    }

    pub async fn toggle_favorite(&self, id: i64) -> Result<(), WorkbenchError> {
        if let Err(error) = self.collab.servers.toggle_favorite(id).await {
            self.notifications.error("Failed to update favorite", Some(error.to_string()));
            return Err(error.into());
        }
        Ok(())
    }

    async fn validate(&self, address: &str, use_tls: bool, insecure: bool) -> Result<(), WorkbenchError> {
        let message = match self.collab.servers.validate_server_address(address, use_tls, insecure).await {
            Ok(result) if result.is_success() => return Ok(()),
            Ok(result) => result.message_or_default(),
            Err(error) => error.to_string(),
        };
        self.notifications.error("Validation failed", Some(message.clone()));
        Err(WorkbenchError::Validation(message))
    }
}
