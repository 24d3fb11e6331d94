//! Generic reconciliation scaffolding.
//!
//! A [`GenericController`] owns one watch cache and one work queue and
//! drives a [`Reconciler`] implementation: every add, update, or delete
//! of the watched kind enqueues the identity; workers look the identity
//! up in the cache and hand the latest object to the reconciler.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use hubsync_api::identity::{ResourceIdentity, ResourceKind};
use hubsync_api::object::Object;
use hubsync_cluster::{Cluster, WatchCache, WatchEvent};
use hubsync_syncer::queue::{QueueConfig, WorkQueue};

use crate::error::AggregateError;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Domain logic driven by a [`GenericController`].
pub trait Reconciler: Send + Sync + 'static {
    /// Controller name for logs.
    fn name(&self) -> &str;

    /// The resource kind this reconciler watches.
    fn kind(&self) -> ResourceKind;

    /// Converge state for one object. Retryable errors re-queue the
    /// identity with backoff.
    fn reconcile(
        &self,
        obj: Object,
    ) -> impl Future<Output = Result<(), AggregateError>> + Send;
}

/// A running controller for one reconciler.
pub struct GenericController<R> {
    reconciler: R,
    cache: Arc<WatchCache>,
    queue: Arc<WorkQueue<ResourceIdentity>>,
}

impl<R: Reconciler> GenericController<R> {
    /// Start the watch cache, classifier, and `workers` queue drainers.
    pub async fn start(
        cluster: Arc<Cluster>,
        reconciler: R,
        workers: usize,
        shutdown: watch::Receiver<bool>,
    ) -> Arc<GenericController<R>> {
        let kind = reconciler.kind();
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let cache = WatchCache::start(&cluster, kind, Some(tx), shutdown.clone()).await;

        let controller = Arc::new(GenericController {
            reconciler,
            cache,
            queue: Arc::new(WorkQueue::new(QueueConfig::default())),
        });

        {
            let queue = Arc::clone(&controller.queue);
            tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    queue.add(event.object().identity());
                }
            });
        }
        {
            let queue = Arc::clone(&controller.queue);
            let mut shutdown = shutdown.clone();
            tokio::spawn(async move {
                let _ = shutdown.changed().await;
                queue.shut_down();
            });
        }

        info!(controller = controller.reconciler.name(), workers, "starting controller");
        for _ in 0..workers {
            let worker = Arc::clone(&controller);
            tokio::spawn(async move { worker.run_worker().await });
        }

        controller
    }

    async fn run_worker(self: Arc<Self>) {
        while let Some(id) = self.queue.get().await {
            match self.process(&id).await {
                Ok(()) => {
                    self.queue.forget(&id);
                }
                Err(err) if err.is_retryable() => {
                    warn!(
                        controller = self.reconciler.name(),
                        identity = %id,
                        %err,
                        "reconcile failed; will retry"
                    );
                    self.queue.add_rate_limited(id.clone());
                }
                Err(err) => {
                    warn!(
                        controller = self.reconciler.name(),
                        identity = %id,
                        %err,
                        "reconcile failed; dropping"
                    );
                    self.queue.forget(&id);
                }
            }
            self.queue.done(&id);
        }
        debug!(controller = self.reconciler.name(), "worker stopped");
    }

    /// Reconcile one identity against the latest cached state. A
    /// vanished object is a no-op (deleted before we handled it).
    pub async fn process(&self, id: &ResourceIdentity) -> Result<(), AggregateError> {
        match self.cache.get(id) {
            None => {
                debug!(
                    controller = self.reconciler.name(),
                    identity = %id,
                    "object gone before processing"
                );
                Ok(())
            }
            Some(obj) => self.reconciler.reconcile(obj).await,
        }
    }

    /// Test hook: the controller's queue.
    pub fn queue(&self) -> &Arc<WorkQueue<ResourceIdentity>> {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubsync_api::identity::kinds;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Counting {
        seen: Arc<AtomicUsize>,
    }

    impl Reconciler for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn kind(&self) -> ResourceKind {
            kinds::policies()
        }

        async fn reconcile(&self, _obj: Object) -> Result<(), AggregateError> {
            self.seen.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    #[tokio::test]
    async fn drives_reconciler_for_each_change() {
        let cluster = Arc::new(Cluster::new("global"));
        let seen = Arc::new(AtomicUsize::new(0));
        let (_stop, shutdown) = watch::channel(false);
        let _controller = GenericController::start(
            Arc::clone(&cluster),
            Counting {
                seen: Arc::clone(&seen),
            },
            2,
            shutdown,
        )
        .await;

        cluster
            .create(Object::new(kinds::policies(), Some("ns"), "p"))
            .await
            .unwrap();

        for _ in 0..100 {
            if seen.load(Ordering::Relaxed) >= 1 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("reconciler never ran");
    }

    #[tokio::test]
    async fn vanished_object_is_noop() {
        let cluster = Arc::new(Cluster::new("global"));
        let seen = Arc::new(AtomicUsize::new(0));
        let (_stop, shutdown) = watch::channel(false);
        let controller = GenericController::start(
            Arc::clone(&cluster),
            Counting {
                seen: Arc::clone(&seen),
            },
            0,
            shutdown,
        )
        .await;

        let id = ResourceIdentity {
            kind: kinds::policies(),
            namespace: Some("ns".to_string()),
            name: "gone".to_string(),
        };
        controller.process(&id).await.unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), 0);
    }
}
