// Open request tabs and the single-active-tab rule.
//
// The store is a plain struct shared as `Arc<Mutex<TabStore>>`; every mutation
// publishes a `TabEvent` so persistence and views can react.

pub mod workspace;

use rpcdesk_common::types::{HistoryRecord, TabStateRecord};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

pub use workspace::{KeyValuePair, RequestWorkspace, Subview, WorkspacePatch};

const EVENT_BUFFER_SIZE: usize = 256;

/// Component tag stored with request tabs.
pub const REQUEST_COMPONENT: &str = "request";

pub fn method_tab_id(server_id: i64, service: &str, method: &str) -> String {
    format!("request-{server_id}-{service}-{method}")
}

pub fn history_tab_id(history_id: i64) -> String {
    format!("request-history-{history_id}")
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TabKind {
    Request,
}

impl TabKind {
    pub fn component(self) -> &'static str {
        match self {
            Self::Request => REQUEST_COMPONENT,
        }
    }

    pub fn from_component(component: &str) -> Option<Self> {
        match component {
            REQUEST_COMPONENT => Some(Self::Request),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tab {
    pub id: String,
    pub name: String,
    pub kind: TabKind,
    pub is_active: bool,
    /// Preview tab; not restored as such after a restart.
    pub temporary: bool,
    pub workspace: RequestWorkspace,
}

impl Tab {
    /// Rebuild a tab from its durable record. Unknown components are skipped.
    pub fn from_record(record: &TabStateRecord) -> Option<Self> {
        let kind = TabKind::from_component(&record.component)?;
        Some(Self {
            id: record.tab_id.clone(),
            name: record.name.clone(),
            kind,
            is_active: record.is_active,
            temporary: false,
            workspace: RequestWorkspace::from_state(&record.state),
        })
    }

    pub fn to_record(&self, order: usize) -> TabStateRecord {
        TabStateRecord {
            tab_id: self.id.clone(),
            name: self.name.clone(),
            component: self.kind.component().to_string(),
            state: self.workspace.to_state(),
            is_active: self.is_active,
            order: order as i64,
        }
    }
}

/// What to open.
#[derive(Debug, Clone)]
pub enum OpenRequest {
    Method { server_id: i64, service: String, method: String, example_body: String },
    History(HistoryRecord),
}

impl OpenRequest {
    pub fn tab_id(&self) -> String {
        match self {
            Self::Method { server_id, service, method, .. } => method_tab_id(*server_id, service, method),
            Self::History(record) => history_tab_id(record.id),
        }
    }

    fn into_tab(self, id: String) -> Tab {
        let (name, workspace) = match self {
            Self::Method { server_id, service, method, example_body } => {
                (method.clone(), RequestWorkspace::for_method(server_id, service, method, example_body))
            }
            Self::History(record) => (record.method.clone(), RequestWorkspace::from_history(&record)),
        };
        Tab { id, name, kind: TabKind::Request, is_active: true, temporary: false, workspace }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabEvent {
    Hydrated { count: usize },
    Opened { id: String },
    Activated { id: String },
    Closed { ids: Vec<String> },
    Updated { id: String },
}

pub struct TabStore {
    tabs: Vec<Tab>,
    loaded: bool,
    events: broadcast::Sender<TabEvent>,
}

impl Default for TabStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TabStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self { tabs: Vec::new(), loaded: false, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TabEvent> {
        self.events.subscribe()
    }

    /// False until the persisted tabs have been installed. An empty store
    /// that is not loaded is "loading", not "no tabs open".
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Install restored tabs as the initial state and mark the store loaded.
    /// The last tab flagged active wins; with none flagged, the last tab is
    /// activated.
    pub fn hydrate(&mut self, tabs: Vec<Tab>) {
        self.tabs = tabs;
        let active = self
            .tabs
            .iter()
            .rposition(|tab| tab.is_active)
            .or_else(|| self.tabs.len().checked_sub(1));
        self.set_active(active);
        self.loaded = true;
        self.emit(TabEvent::Hydrated { count: self.tabs.len() });
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn get(&self, id: &str) -> Option<&Tab> {
        self.tabs.iter().find(|tab| tab.id == id)
    }

    pub fn active(&self) -> Option<&Tab> {
        self.tabs.iter().find(|tab| tab.is_active)
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Open a tab, or activate it when one with the same id is already open.
    /// Returns the tab id.
    pub fn open(&mut self, request: OpenRequest) -> String {
        let id = request.tab_id();
        if self.position(&id).is_some() {
            self.activate(&id);
            return id;
        }

        let tab = request.into_tab(id.clone());
        self.tabs.push(tab);
        self.set_active(Some(self.tabs.len() - 1));
        debug!(tab_id = %id, "tab opened");
        self.emit(TabEvent::Opened { id: id.clone() });
        id
    }

    pub fn activate(&mut self, id: &str) -> bool {
        let Some(position) = self.position(id) else {
            return false;
        };
        self.set_active(Some(position));
        debug!(tab_id = %id, "tab activated");
        self.emit(TabEvent::Activated { id: id.to_string() });
        true
    }

    /// Remove a tab. Closing the active tab activates the most recently
    /// added remaining one.
    pub fn close(&mut self, id: &str) -> bool {
        let Some(position) = self.position(id) else {
            return false;
        };
        let removed = self.tabs.remove(position);
        if removed.is_active {
            self.set_active(self.tabs.len().checked_sub(1));
        }
        debug!(tab_id = %id, remaining = self.tabs.len(), "tab closed");
        self.emit(TabEvent::Closed { ids: vec![removed.id] });
        true
    }

    /// Keep only `id`, which becomes active.
    pub fn close_others(&mut self, id: &str) -> bool {
        let Some(position) = self.position(id) else {
            return false;
        };
        let keep = self.tabs.remove(position);
        let closed: Vec<String> = self.tabs.drain(..).map(|tab| tab.id).collect();
        self.tabs.push(keep);
        self.set_active(Some(0));
        if !closed.is_empty() {
            self.emit(TabEvent::Closed { ids: closed });
        }
        true
    }

    pub fn close_all(&mut self) {
        let closed: Vec<String> = self.tabs.drain(..).map(|tab| tab.id).collect();
        if !closed.is_empty() {
            self.emit(TabEvent::Closed { ids: closed });
        }
    }

    /// Shallow-merge `patch` into the tab's workspace. No-op for unknown ids.
    pub fn update_workspace(&mut self, id: &str, patch: WorkspacePatch) -> bool {
        let Some(tab) = self.tabs.iter_mut().find(|tab| tab.id == id) else {
            return false;
        };
        patch.apply(&mut tab.workspace);
        self.emit(TabEvent::Updated { id: id.to_string() });
        true
    }

    /// Durable records for every tab, `order` taken from list position.
    pub fn snapshot(&self) -> Vec<TabStateRecord> {
        self.tabs.iter().enumerate().map(|(order, tab)| tab.to_record(order)).collect()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tabs.iter().position(|tab| tab.id == id)
    }

    fn set_active(&mut self, position: Option<usize>) {
        for (index, tab) in self.tabs.iter_mut().enumerate() {
            tab.is_active = Some(index) == position;
        }
    }

    fn emit(&self, event: TabEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn method(server_id: i64, service: &str, name: &str) -> OpenRequest {
        OpenRequest::Method {
            server_id,
            service: service.into(),
            method: name.into(),
            example_body: "{}".into(),
        }
    }

    fn active_count(store: &TabStore) -> usize {
        store.tabs().iter().filter(|tab| tab.is_active).count()
    }

    #[test]
    fn new_store_is_loading() {
        let store = TabStore::new();
        assert!(!store.is_loaded());
        assert!(store.is_empty());
    }

    #[test]
    fn open_creates_active_tab_with_deterministic_id() {
        let mut store = TabStore::new();
        let id = store.open(OpenRequest::Method {
            server_id: 1,
            service: "Greeter".into(),
            method: "SayHello".into(),
            example_body: r#"{"name":""}"#.into(),
        });
        assert_eq!(id, "request-1-Greeter-SayHello");
        let tab = store.get(&id).unwrap();
        assert!(tab.is_active);
        assert_eq!(tab.name, "SayHello");
        assert_eq!(tab.workspace.request_body_text, r#"{"name":""}"#);
    }

    #[test]
    fn reopening_activates_existing_tab() {
        let mut store = TabStore::new();
        store.open(method(1, "Greeter", "SayHello"));
        store.open(method(1, "Greeter", "SayBye"));
        store.update_workspace("request-1-Greeter-SayHello", WorkspacePatch::body("edited"));

        store.open(method(1, "Greeter", "SayHello"));
        assert_eq!(store.len(), 2);
        let active = store.active().unwrap();
        assert_eq!(active.id, "request-1-Greeter-SayHello");
        assert_eq!(active.workspace.request_body_text, "edited");
    }

    #[test]
    fn closing_active_tab_activates_last_remaining() {
        let mut store = TabStore::new();
        store.open(method(1, "S", "A"));
        store.open(method(1, "S", "B"));
        store.open(method(1, "S", "C"));
        store.activate("request-1-S-A");

        assert!(store.close("request-1-S-A"));
        assert_eq!(store.active().unwrap().id, "request-1-S-C");
    }

    #[test]
    fn closing_inactive_tab_keeps_active_one() {
        let mut store = TabStore::new();
        store.open(method(1, "S", "A"));
        store.open(method(1, "S", "B"));
        assert!(store.close("request-1-S-A"));
        assert_eq!(store.active().unwrap().id, "request-1-S-B");
        assert_eq!(active_count(&store), 1);
    }

    #[test]
    fn close_others_and_close_all() {
        let mut store = TabStore::new();
        store.open(method(1, "S", "A"));
        store.open(method(1, "S", "B"));
        store.open(method(1, "S", "C"));

        assert!(store.close_others("request-1-S-A"));
        assert_eq!(store.len(), 1);
        assert!(store.get("request-1-S-A").unwrap().is_active);

        store.close_all();
        assert!(store.is_empty());
        assert!(!store.close_others("request-1-S-A"));
    }

    #[test]
    fn update_unknown_tab_is_a_no_op() {
        let mut store = TabStore::new();
        assert!(!store.update_workspace("missing", WorkspacePatch::body("x")));
    }

    #[test]
    fn events_follow_mutations() {
        let mut store = TabStore::new();
        let mut events = store.subscribe();
        store.hydrate(Vec::new());
        store.open(method(1, "S", "A"));
        store.open(method(1, "S", "B"));
        store.activate("request-1-S-A");
        store.update_workspace("request-1-S-A", WorkspacePatch::body("x"));
        store.close_others("request-1-S-A");

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert_eq!(
            seen,
            vec![
                TabEvent::Hydrated { count: 0 },
                TabEvent::Opened { id: "request-1-S-A".into() },
                TabEvent::Opened { id: "request-1-S-B".into() },
                TabEvent::Activated { id: "request-1-S-A".into() },
                TabEvent::Updated { id: "request-1-S-A".into() },
                TabEvent::Closed { ids: vec!["request-1-S-B".into()] },
            ]
        );
    }

    #[test]
    fn hydrate_normalizes_active_flags() {
        let tab = |id: &str, is_active: bool| Tab {
            id: id.into(),
            name: id.into(),
            kind: TabKind::Request,
            is_active,
            temporary: false,
            workspace: RequestWorkspace::default(),
        };

        let mut store = TabStore::new();
        store.hydrate(vec![tab("a", true), tab("b", true), tab("c", false)]);
        assert!(store.is_loaded());
        assert_eq!(store.active().unwrap().id, "b");
        assert_eq!(active_count(&store), 1);

        store.hydrate(vec![tab("a", false), tab("b", false)]);
        assert_eq!(store.active().unwrap().id, "b");
    }

    #[test]
    fn history_tabs_use_history_identity() {
        let record = HistoryRecord {
            id: 9,
            server_id: 1,
            service: "Greeter".into(),
            method: "SayHello".into(),
            request: "{}".into(),
            response: String::new(),
            request_headers: String::new(),
            context_values: String::new(),
            status_code: 0,
            execution_time_ms: 0,
            error: None,
            created_at: chrono::Utc::now(),
        };
        let mut store = TabStore::new();
        let fresh = store.open(method(1, "Greeter", "SayHello"));
        let from_history = store.open(OpenRequest::History(record));
        assert_eq!(from_history, "request-history-9");
        assert_ne!(fresh, from_history);
        assert_eq!(store.len(), 2);
        assert_eq!(store.active().unwrap().workspace.source_history_id, Some(9));
    }

    #[test]
    fn snapshot_records_order_and_component() {
        let mut store = TabStore::new();
        store.open(method(1, "S", "A"));
        store.open(method(1, "S", "B"));
        let records = store.snapshot();
        assert_eq!(records.iter().map(|r| r.order).collect::<Vec<_>>(), vec![0, 1]);
        assert!(records.iter().all(|r| r.component == REQUEST_COMPONENT));
        assert!(records[1].is_active);
        assert_eq!(Tab::from_record(&records[0]).unwrap().workspace.method_name, "A");
    }

    #[derive(Debug, Clone)]
    enum Op {
        Open(u8),
        Activate(u8),
        Close(u8),
        CloseOthers(u8),
        CloseAll,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => (0u8..6).prop_map(Op::Open),
            2 => (0u8..6).prop_map(Op::Activate),
            3 => (0u8..6).prop_map(Op::Close),
            1 => (0u8..6).prop_map(Op::CloseOthers),
            1 => Just(Op::CloseAll),
        ]
    }

    proptest! {
        #[test]
        fn at_most_one_tab_is_active(ops in prop::collection::vec(op(), 0..40)) {
            let mut store = TabStore::new();
            let id = |n: u8| method_tab_id(1, "S", &format!("M{n}"));
            for op in ops {
                match op {
                    Op::Open(n) => { store.open(method(1, "S", &format!("M{n}"))); }
                    Op::Activate(n) => { store.activate(&id(n)); }
                    Op::Close(n) => { store.close(&id(n)); }
                    Op::CloseOthers(n) => { store.close_others(&id(n)); }
                    Op::CloseAll => store.close_all(),
                }
                let expected = usize::from(!store.is_empty());
                prop_assert_eq!(active_count(&store), expected);
                let mut ids: Vec<&str> = store.tabs().iter().map(|t| t.id.as_str()).collect();
                ids.sort_unstable();
                ids.dedup();
                prop_assert_eq!(ids.len(), store.len());
            }
        }
    }
}
