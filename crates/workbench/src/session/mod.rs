// Durable tab sessions: debounced saves and startup rehydration.
//
// Every tab mutation (re)starts the quiet-period timer with the latest
// snapshot; only the trailing edge writes. Writes are serialized through an
// async lock so a flush never overlaps another flush or a delete.

pub mod scheduler;

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use rpcdesk_common::types::TabStateRecord;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::collab::TabStateStore;
use crate::tabs::{Tab, TabEvent, TabStore};

pub use scheduler::{CancelToken, ManualScheduler, Scheduler, Task, TokioScheduler};

pub struct SessionPersistence {
    store: Arc<dyn TabStateStore>,
    scheduler: Arc<dyn Scheduler>,
    quiet_period: Duration,
    pending: Mutex<Option<CancelToken>>,
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl SessionPersistence {
    pub fn new(store: Arc<dyn TabStateStore>, scheduler: Arc<dyn Scheduler>, quiet_period: Duration) -> Self {
        Self {
            store,
            scheduler,
            quiet_period,
            pending: Mutex::new(None),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Persisted tabs in saved order. A failed read restores nothing.
    pub async fn restore(&self) -> Vec<Tab> {
        let mut records = match self.store.get_tab_states().await {
            Ok(records) => records,
            Err(error) => {
                warn!(error = %error, "failed to load saved tabs");
                return Vec::new();
            }
        };
        records.sort_by_key(|record| record.order);
        records.iter().filter_map(Tab::from_record).collect()
    }

    /// Cancel any pending flush and schedule one for `snapshot` after the
    /// quiet period.
    pub fn note_mutation(&self, snapshot: Vec<TabStateRecord>) {
        let store = Arc::clone(&self.store);
        let lock = Arc::clone(&self.write_lock);
        let task: Task = Box::pin(async move {
            let _guard = lock.lock().await;
            write_snapshot(store.as_ref(), snapshot).await;
        });

        let mut pending = self.pending.lock().expect("session pending lock poisoned");
        if let Some(previous) = pending.take() {
            previous.cancel();
        }
        *pending = Some(self.scheduler.schedule(self.quiet_period, task));
    }

    /// Delete the persisted counterpart of a closed tab as soon as possible.
    pub fn schedule_delete(&self, tab_id: String) {
        let store = Arc::clone(&self.store);
        let lock = Arc::clone(&self.write_lock);
        self.scheduler.schedule(
            Duration::ZERO,
            Box::pin(async move {
                let _guard = lock.lock().await;
                if let Err(error) = store.delete_tab_state(&tab_id).await {
                    warn!(tab_id = %tab_id, error = %error, "failed to delete saved tab");
                }
            }),
        );
    }

    /// Write `snapshot` now, dropping any pending flush.
    pub async fn flush_now(&self, snapshot: Vec<TabStateRecord>) {
        if let Some(previous) = self.pending.lock().expect("session pending lock poisoned").take() {
            previous.cancel();
        }
        let _guard = self.write_lock.lock().await;
        write_snapshot(self.store.as_ref(), snapshot).await;
    }

    /// React to one store event. `snapshot` is the store state after it.
    pub fn handle_event(&self, event: &TabEvent, snapshot: Vec<TabStateRecord>) {
        match event {
            TabEvent::Hydrated { .. } => {}
            TabEvent::Closed { ids } => {
                for id in ids {
                    self.schedule_delete(id.clone());
                }
                self.note_mutation(snapshot);
            }
            TabEvent::Opened { .. } | TabEvent::Activated { .. } | TabEvent::Updated { .. } => {
                self.note_mutation(snapshot);
            }
        }
    }

    /// Follow `events` until the store is dropped.
    pub fn observe(
        self: Arc<Self>,
        tabs: Weak<Mutex<TabStore>>,
        mut events: broadcast::Receiver<TabEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    // A save replaces the whole stored set, so a missed close
                    // is still covered by the next flush.
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "tab event observer lagged");
                        TabEvent::Updated { id: String::new() }
                    }
                    Err(RecvError::Closed) => break,
                };
                let Some(store) = tabs.upgrade() else {
                    break;
                };
                let snapshot = store.lock().expect("tab store lock poisoned").snapshot();
                self.handle_event(&event, snapshot);
            }
        })
    }
}

async fn write_snapshot(store: &dyn TabStateStore, snapshot: Vec<TabStateRecord>) {
    let count = snapshot.len();
    match store.save_tab_states(snapshot).await {
        Ok(()) => debug!(count, "tab state flushed"),
        Err(error) => warn!(error = %error, count, "failed to save tab state"),
    }
}
