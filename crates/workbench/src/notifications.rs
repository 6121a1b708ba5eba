// Transient user-facing notifications.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Notifications shown at once; older ones are evicted first.
pub const MAX_VISIBLE: usize = 3;
pub const DEFAULT_LIFETIME: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub title: String,
    pub message: Option<String>,
    /// Zero keeps the notification until dismissed.
    pub lifetime: Duration,
    pub created_at: Instant,
}

impl Notification {
    pub fn is_sticky(&self) -> bool {
        self.lifetime.is_zero()
    }

    fn expired_at(&self, now: Instant) -> bool {
        !self.is_sticky() && now.saturating_duration_since(self.created_at) >= self.lifetime
    }
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    visible: VecDeque<Notification>,
}

#[derive(Debug, Default)]
pub struct Notifications {
    state: Mutex<State>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&self, title: impl Into<String>, message: Option<String>) -> u64 {
        self.push(NotificationLevel::Success, title, message, DEFAULT_LIFETIME)
    }

    pub fn error(&self, title: impl Into<String>, message: Option<String>) -> u64 {
        self.push(NotificationLevel::Error, title, message, DEFAULT_LIFETIME)
    }

    pub fn push(
        &self,
        level: NotificationLevel,
        title: impl Into<String>,
        message: Option<String>,
        lifetime: Duration,
    ) -> u64 {
        let mut state = self.state.lock().expect("notifications lock poisoned");
        state.next_id += 1;
        let id = state.next_id;
        state.visible.push_back(Notification {
            id,
            level,
            title: title.into(),
            message,
            lifetime,
            created_at: Instant::now(),
        });
        while state.visible.len() > MAX_VISIBLE {
            state.visible.pop_front();
        }
        id
    }

    pub fn dismiss(&self, id: u64) -> bool {
        let mut state = self.state.lock().expect("notifications lock poisoned");
        let before = state.visible.len();
        state.visible.retain(|notification| notification.id != id);
        state.visible.len() != before
    }

    /// Drop every notification whose lifetime has elapsed at `now`.
    pub fn expire(&self, now: Instant) -> usize {
        let mut state = self.state.lock().expect("notifications lock poisoned");
        let before = state.visible.len();
        state.visible.retain(|notification| !notification.expired_at(now));
        before - state.visible.len()
    }

    /// Oldest first.
    pub fn visible(&self) -> Vec<Notification> {
        self.state.lock().expect("notifications lock poisoned").visible.iter().cloned().collect()
    }
}
