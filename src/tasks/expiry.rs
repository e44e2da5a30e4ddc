//! Expiry Scheduler
//!
//! One background task polls a time-ordered queue of deadlines and hands every
//! due key to an [`ExpiryHandler`]. Arming a key again replaces its deadline;
//! cancelling removes it.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// Longest single wait. Longer TTLs fire at this bound and are re-armed by
/// the handler for the remainder.
pub const MAX_TIMER_DELAY: Duration = Duration::from_millis(2_147_483_647);

// == Expiry Handler ==
#[async_trait]
pub trait ExpiryHandler: Send + Sync {
    /// Called once per fired deadline. Must not fail; errors are the
    /// handler's to log.
    async fn on_expire(&self, key: String);
}

#[derive(Debug, Default)]
struct Timers {
    /// (deadline, sequence, key); sequence breaks ties between equal deadlines
    queue: BTreeSet<(Instant, u64, String)>,
    armed: HashMap<String, (Instant, u64)>,
    next_seq: u64,
}

impl Timers {
    fn arm(&mut self, key: &str, deadline: Instant) {
        self.cancel(key);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.insert((deadline, seq, key.to_string()));
        self.armed.insert(key.to_string(), (deadline, seq));
    }

    fn cancel(&mut self, key: &str) -> bool {
        match self.armed.remove(key) {
            Some((deadline, seq)) => {
                self.queue.remove(&(deadline, seq, key.to_string()));
                true
            }
            None => false,
        }
    }
}

// == Expiry Scheduler ==
#[derive(Debug, Default)]
pub struct ExpiryScheduler {
    timers: Mutex<Timers>,
    wakeup: Notify,
}

impl ExpiryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    // == Arm ==
    /// Schedules `key` to fire after `ttl_ms`, capped at [`MAX_TIMER_DELAY`].
    /// A non-positive TTL fires on the next poll.
    pub async fn arm(&self, key: &str, ttl_ms: i64) {
        let delay = Duration::from_millis(ttl_ms.max(0) as u64).min(MAX_TIMER_DELAY);
        self.timers.lock().await.arm(key, Instant::now() + delay);
        self.wakeup.notify_one();
    }

    // == Cancel ==
    /// Disarms `key`. Returns whether a deadline was pending.
    pub async fn cancel(&self, key: &str) -> bool {
        self.timers.lock().await.cancel(key)
    }

    /// Disarms every key in `keys` under one lock.
    pub async fn cancel_many(&self, keys: &[String]) {
        let mut timers = self.timers.lock().await;
        for key in keys {
            timers.cancel(key);
        }
    }

    pub async fn is_armed(&self, key: &str) -> bool {
        self.timers.lock().await.armed.contains_key(key)
    }

    /// Pops every key due at `now` and reports the next deadline, if any.
    async fn take_due(&self, now: Instant) -> (Vec<String>, Option<Instant>) {
        let mut timers = self.timers.lock().await;
        let mut due = Vec::new();

        loop {
            match timers.queue.first() {
                Some((deadline, _, _)) if *deadline <= now => {}
                _ => break,
            }
            if let Some((_, _, key)) = timers.queue.pop_first() {
                timers.armed.remove(&key);
                due.push(key);
            }
        }

        let next = timers.queue.first().map(|(deadline, _, _)| *deadline);
        (due, next)
    }
}

/// Spawns the task that fires deadlines.
///
/// The task holds only a weak reference to the handler and stops once the
/// handler is gone.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task.
pub fn spawn_expiry_task(
    scheduler: Arc<ExpiryScheduler>,
    handler: Weak<dyn ExpiryHandler>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!("Starting expiry task");

        loop {
            let (due, next) = scheduler.take_due(Instant::now()).await;

            if !due.is_empty() {
                let Some(handler) = handler.upgrade() else {
                    break;
                };
                debug!("Expiry: {} deadline(s) due", due.len());
                for key in due {
                    handler.on_expire(key).await;
                }
                continue;
            }

            match next {
                Some(deadline) => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(deadline) => {}
                        _ = scheduler.wakeup.notified() => {}
                    }
                }
                None => scheduler.wakeup.notified().await,
            }
        }

        info!("Expiry task stopped: cache dropped");
    })
}
