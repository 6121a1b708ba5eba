// Per-key loading flags with a minimum visible duration.
//
// Keys are tab ids. A flag raised with a minimum stays up at least that long
// after `lock`, so a fast response does not make the indicator flicker.
// Locks on the same key nest: the flag drops with the last matching `unlock`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Busy {
    since: Instant,
    minimum: Duration,
    outstanding: usize,
}

#[derive(Debug, Default)]
pub struct BusyStore {
    keys: Mutex<HashMap<String, Busy>>,
}

impl BusyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self, key: &str, minimum: Duration) {
        let mut keys = self.keys.lock().expect("busy store lock poisoned");
        let busy = keys.entry(key.to_string()).or_insert(Busy { since: Instant::now(), minimum, outstanding: 0 });
        busy.since = Instant::now();
        busy.minimum = minimum;
        busy.outstanding += 1;
    }

    /// Release one `lock` once its minimum duration has passed. The flag
    /// clears when no other lock on `key` is outstanding.
    pub async fn unlock(&self, key: &str) {
        let remaining = {
            let keys = self.keys.lock().expect("busy store lock poisoned");
            keys.get(key).map(|busy| busy.minimum.saturating_sub(busy.since.elapsed()))
        };
        let Some(remaining) = remaining else {
            return;
        };
        if !remaining.is_zero() {
            tokio::time::sleep(remaining).await;
        }
        let mut keys = self.keys.lock().expect("busy store lock poisoned");
        if let Some(busy) = keys.get_mut(key) {
            busy.outstanding = busy.outstanding.saturating_sub(1);
            if busy.outstanding == 0 {
                keys.remove(key);
            }
        }
    }

    pub fn is_busy(&self, key: &str) -> bool {
        self.keys.lock().expect("busy store lock poisoned").contains_key(key)
    }

    pub fn busy_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> =
            self.keys.lock().expect("busy store lock poisoned").keys().cloned().collect();
        keys.sort();
        keys
    }
}
