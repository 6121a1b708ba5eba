// Delayed task scheduling for debounced persistence.
//
// `TokioScheduler` runs tasks on the tokio runtime after a real delay.
// `ManualScheduler` keeps a virtual clock that only moves on `advance`, so
// quiet-period behavior can be driven step by step.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Handle to a scheduled task. Cancelling after the task started has no effect.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: Task) -> CancelToken;
}

// ── Tokio ──────────────────────────────────────────────────────────

/// Must be used from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> CancelToken {
        let token = CancelToken::default();
        let guard = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !guard.is_cancelled() {
                task.await;
            }
        });
        token
    }
}

// ── Virtual time ───────────────────────────────────────────────────

struct Scheduled {
    due: Duration,
    seq: u64,
    token: CancelToken,
    task: Task,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_seq: u64,
    queue: Vec<Scheduled>,
}

#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.state.lock().expect("manual scheduler lock poisoned").now
    }

    /// Scheduled tasks that are neither cancelled nor run yet.
    pub fn pending(&self) -> usize {
        let state = self.state.lock().expect("manual scheduler lock poisoned");
        state.queue.iter().filter(|scheduled| !scheduled.token.is_cancelled()).count()
    }

    /// Move the clock forward by `by`, running every task that falls due, in
    /// due order. Tasks scheduled while advancing run too if they fall due
    /// within the window.
    pub async fn advance(&self, by: Duration) {
        let target = self.now() + by;
        while let Some(task) = self.next_due(target) {
            task.await;
        }
        self.state.lock().expect("manual scheduler lock poisoned").now = target;
    }

    fn next_due(&self, target: Duration) -> Option<Task> {
        let mut state = self.state.lock().expect("manual scheduler lock poisoned");
        state.queue.retain(|scheduled| !scheduled.token.is_cancelled());
        let position = state
            .queue
            .iter()
            .enumerate()
            .filter(|(_, scheduled)| scheduled.due <= target)
            .min_by_key(|(_, scheduled)| (scheduled.due, scheduled.seq))
            .map(|(position, _)| position)?;
        let scheduled = state.queue.swap_remove(position);
        state.now = state.now.max(scheduled.due);
        Some(scheduled.task)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> CancelToken {
        let mut state = self.state.lock().expect("manual scheduler lock poisoned");
        let token = CancelToken::default();
        let seq = state.next_seq;
        state.next_seq += 1;
        let due = state.now + delay;
        state.queue.push(Scheduled { due, seq, token: token.clone(), task });
        token
    }
}
