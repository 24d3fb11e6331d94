//! Rate-limited, de-duplicating work queue.
//!
//! Identity keys are coalesced: adding an identity that is already
//! queued is a no-op, and an identity added while a worker processes it
//! is re-queued once the worker calls [`WorkQueue::done`]. At most one
//! in-flight occurrence per identity exists, so workers need no
//! per-object locks. Coalescing means intermediate states between two
//! rapid updates of the same identity may never be individually
//! processed; consumers reconcile against the latest cached state, never
//! against the event payload.
//!
//! Failed items come back through [`WorkQueue::add_rate_limited`] with
//! per-item exponential backoff; success clears the backoff state via
//! [`WorkQueue::forget`]. There is no terminal failure state.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tokio::sync::Semaphore;
use tracing::trace;

/// Backoff configuration for the queue's rate limiter.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any retry delay.
    pub max_delay: Duration,
    /// Whether to add random jitter (up to half the computed delay).
    pub jitter: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_secs(1000),
            jitter: true,
        }
    }
}

struct QueueState<T> {
    queue: VecDeque<T>,
    dirty: HashSet<T>,
    processing: HashSet<T>,
    failures: HashMap<T, u32>,
    shutting_down: bool,
    adds: u64,
    retries: u64,
}

/// The shared work queue drained by a controller's worker tasks.
pub struct WorkQueue<T> {
    config: QueueConfig,
    semaphore: Semaphore,
    state: Mutex<QueueState<T>>,
}

impl<T> WorkQueue<T>
where
    T: Clone + Eq + Hash,
{
    /// Create an empty queue.
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            semaphore: Semaphore::new(0),
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                dirty: HashSet::new(),
                processing: HashSet::new(),
                failures: HashMap::new(),
                shutting_down: false,
                adds: 0,
                retries: 0,
            }),
        }
    }

    /// Mark an item for processing. No-op when the item is already
    /// queued; an item currently being processed is re-queued on `done`.
    pub fn add(&self, item: T) {
        let mut state = self.state.lock().expect("queue state poisoned");
        if state.shutting_down || state.dirty.contains(&item) {
            return;
        }
        state.dirty.insert(item.clone());
        state.adds += 1;
        if state.processing.contains(&item) {
            return;
        }
        state.queue.push_back(item);
        drop(state);
        self.semaphore.add_permits(1);
    }

    /// Block until an item is available, moving it to the processing set.
    /// Returns `None` once the queue is shut down.
    pub async fn get(&self) -> Option<T> {
        loop {
            let permit = self.semaphore.acquire().await.ok()?;
            permit.forget();
            let mut state = self.state.lock().expect("queue state poisoned");
            if let Some(item) = state.queue.pop_front() {
                state.dirty.remove(&item);
                state.processing.insert(item.clone());
                return Some(item);
            }
            // Permit raced with shutdown; check again.
        }
    }

    /// Signal that processing finished (successfully or not). Re-queues
    /// the item if it got dirty while in flight.
    pub fn done(&self, item: &T) {
        let mut state = self.state.lock().expect("queue state poisoned");
        state.processing.remove(item);
        if state.dirty.contains(item) && !state.shutting_down {
            state.queue.push_back(item.clone());
            drop(state);
            self.semaphore.add_permits(1);
        }
    }

    /// Clear the item's failure history after a successful attempt.
    pub fn forget(&self, item: &T) {
        let mut state = self.state.lock().expect("queue state poisoned");
        state.failures.remove(item);
    }

    /// Consecutive failures recorded for an item.
    pub fn failure_count(&self, item: &T) -> u32 {
        let state = self.state.lock().expect("queue state poisoned");
        state.failures.get(item).copied().unwrap_or(0)
    }

    /// Number of items waiting (excludes in-flight items).
    pub fn len(&self) -> usize {
        self.state.lock().expect("queue state poisoned").queue.len()
    }

    /// Whether no items are waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lifetime counters: (items accepted, retries scheduled).
    pub fn stats(&self) -> (u64, u64) {
        let state = self.state.lock().expect("queue state poisoned");
        (state.adds, state.retries)
    }

    /// Wake all waiting workers; subsequent `get` calls return `None`.
    /// Pending delayed re-adds become no-ops.
    pub fn shut_down(&self) {
        let mut state = self.state.lock().expect("queue state poisoned");
        state.shutting_down = true;
        drop(state);
        self.semaphore.close();
    }

    fn next_backoff(&self, item: &T) -> Option<Duration> {
        let mut state = self.state.lock().expect("queue state poisoned");
        if state.shutting_down {
            return None;
        }
        state.retries += 1;
        let failures = state.failures.entry(item.clone()).or_insert(0);
        let delay = backoff_delay(&self.config, *failures);
        *failures += 1;
        Some(delay)
    }
}

impl<T> WorkQueue<T>
where
    T: Clone + Eq + Hash + Send + Sync + 'static,
{
    /// Schedule a delayed re-add with exponential backoff, growing with
    /// the item's consecutive failure count.
    pub fn add_rate_limited(self: &Arc<Self>, item: T) {
        let Some(delay) = self.next_backoff(&item) else {
            return;
        };
        trace!(delay_ms = delay.as_millis() as u64, "scheduling retry");
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(item);
        });
    }
}

/// Exponential backoff for the given consecutive-failure count:
/// `base * 2^failures`, capped at `max_delay`, plus up to 50% jitter.
fn backoff_delay(config: &QueueConfig, failures: u32) -> Duration {
    let base_ms = config.base_delay.as_millis() as u64;
    let max_ms = config.max_delay.as_millis() as u64;
    let exp_ms = base_ms
        .saturating_mul(1u64.checked_shl(failures).unwrap_or(u64::MAX))
        .min(max_ms);
    if config.jitter && exp_ms > 0 {
        let jitter = rand::thread_rng().gen_range(0..=exp_ms / 2);
        Duration::from_millis(exp_ms.saturating_add(jitter))
    } else {
        Duration::from_millis(exp_ms)
    }
}
