//! Worker pool — bounded, reusable execution slots for scale evaluations.
//!
//! At most `capacity` work items are in flight (queued or executing) at
//! any time; `submit()` waits for a free slot instead of dropping work.
//! Workers are spawned on demand up to `capacity` and exit after sitting
//! idle for `expiry`.
//!
//! # Architecture
//!
//! ```text
//! submit(item)
//!   ├── acquire slot (Semaphore, waits when saturated)
//!   ├── enqueue (mpsc, sized to capacity so it never waits)
//!   └── spawn a worker if idle workers < queued items
//!
//! worker
//!   ├── recv with idle timeout → expire
//!   ├── shutdown signalled?    → drop item
//!   ├── malformed item?        → log and drop
//!   └── handler(item).await    → slot freed
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use warpgrid_policy::{JobId, JobPolicies};

use crate::error::PoolError;

/// Future returned by a pool handler.
pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Callback the pool runs for every well-formed work item.
pub type EvaluateFn = Arc<dyn Fn(WorkItem) -> BoxFuture + Send + Sync>;

/// One job's worth of scale evaluation, dispatched once per pass.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub job_id: JobId,
    /// The job's group policies as read at the start of the pass.
    pub policies: Arc<JobPolicies>,
    /// Timestamp of the pass that produced this item.
    pub timestamp: SystemTime,
}

impl WorkItem {
    pub fn new(job_id: impl Into<JobId>, policies: Arc<JobPolicies>, timestamp: SystemTime) -> Self {
        Self {
            job_id: job_id.into(),
            policies,
            timestamp,
        }
    }

    /// Check that the item names a job and carries at least one group.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.job_id.is_empty() {
            return Err("work item has an empty job id");
        }
        if self.policies.is_empty() {
            return Err("work item carries no group policies");
        }
        Ok(())
    }
}

/// A queued item together with the slot it occupies.
struct Dispatch {
    item: WorkItem,
    _slot: OwnedSemaphorePermit,
}

/// State shared by every worker.
struct Shared {
    rx: tokio::sync::Mutex<mpsc::Receiver<Dispatch>>,
    /// Spawned workers that have not exited yet.
    live: Mutex<usize>,
    handler: EvaluateFn,
    expiry: Duration,
    shutdown: watch::Receiver<bool>,
}

impl Shared {
    fn live(&self) -> MutexGuard<'_, usize> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed-capacity pool running scale evaluations.
pub struct WorkerPool {
    capacity: usize,
    slots: Arc<Semaphore>,
    tx: Mutex<Option<mpsc::Sender<Dispatch>>>,
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Create a pool. No workers run until the first submission.
    ///
    /// Workers skip any item dequeued after `shutdown` carries `true`.
    pub fn new(
        capacity: usize,
        expiry: Duration,
        shutdown: watch::Receiver<bool>,
        handler: EvaluateFn,
    ) -> Result<Self, PoolError> {
        if capacity == 0 {
            return Err(PoolError::InvalidCapacity);
        }

        let (tx, rx) = mpsc::channel(capacity);
        Ok(Self {
            capacity,
            slots: Arc::new(Semaphore::new(capacity)),
            tx: Mutex::new(Some(tx)),
            shared: Arc::new(Shared {
                rx: tokio::sync::Mutex::new(rx),
                live: Mutex::new(0),
                handler,
                expiry,
                shutdown,
            }),
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Maximum number of concurrently executing items.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live workers (busy or idle).
    pub fn running(&self) -> usize {
        *self.shared.live()
    }

    /// Number of items queued or executing.
    pub fn in_flight(&self) -> usize {
        self.capacity
            .saturating_sub(self.slots.available_permits())
    }

    /// Enqueue an item, waiting for a free slot if the pool is saturated.
    pub async fn submit(&self, item: WorkItem) -> Result<(), PoolError> {
        let tx = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(PoolError::Released)?;

        let slot = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Released)?;

        tx.send(Dispatch { item, _slot: slot })
            .await
            .map_err(|_| PoolError::Released)?;

        self.spawn_if_needed();
        Ok(())
    }

    /// Close the pool and wait for every worker to exit.
    ///
    /// Items already queued are still dequeued; workers drop them without
    /// evaluation if shutdown has been signalled.
    pub async fn release(&self) {
        self.slots.close();
        drop(self.tx.lock().unwrap_or_else(PoisonError::into_inner).take());

        let handles = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let count = handles.len();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "autoscaler worker terminated abnormally");
            }
        }

        info!(workers = count, "autoscaler worker pool released");
    }

    /// Spawn a worker when queued items outnumber idle workers.
    fn spawn_if_needed(&self) {
        if self.slots.is_closed() {
            return;
        }
        let in_flight = self.in_flight();

        let mut live = self.shared.live();
        if *live >= in_flight || *live >= self.capacity {
            return;
        }
        *live += 1;

        let handle = tokio::spawn(worker_loop(self.shared.clone()));
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        workers.retain(|h| !h.is_finished());
        workers.push(handle);
        trace!(live = *live, in_flight, "autoscaler worker spawned");
    }
}

async fn worker_loop(shared: Arc<Shared>) {
    loop {
        // Waiting for the queue lock counts as idle time too, so every
        // idle worker expires `expiry` after its last item.
        let idle_deadline = tokio::time::Instant::now() + shared.expiry;
        let received = tokio::time::timeout_at(idle_deadline, async {
            shared.rx.lock().await.recv().await
        })
        .await;

        let dispatch = match received {
            Ok(Some(dispatch)) => dispatch,
            Ok(None) => {
                *shared.live() -= 1;
                trace!("autoscaler worker exiting, queue closed");
                return;
            }
            Err(_) => {
                // A submitter decides whether to spawn under the same
                // lock, so an item enqueued after this check is never
                // left without a worker. If another worker holds the
                // queue it is still receiving and picks the item up.
                let mut live = shared.live();
                let next = shared
                    .rx
                    .try_lock()
                    .ok()
                    .and_then(|mut rx| rx.try_recv().ok());
                match next {
                    Some(dispatch) => dispatch,
                    None => {
                        *live -= 1;
                        trace!("idle autoscaler worker expired");
                        return;
                    }
                }
            }
        };

        run_item(&shared, dispatch).await;
    }
}

async fn run_item(shared: &Shared, dispatch: Dispatch) {
    let Dispatch { item, _slot } = dispatch;

    let stopping = *shared.shutdown.borrow();
    if stopping {
        debug!(job = %item.job_id, "exiting autoscaling worker as a result of shutdown request");
        return;
    }

    if let Err(reason) = item.validate() {
        error!(job = %item.job_id, reason, "autoscaler worker pool received malformed work item");
        return;
    }

    let job = item.job_id.clone();
    // Run on its own task so a panicking evaluation cannot take the worker down.
    if let Err(e) = tokio::spawn((shared.handler)(item)).await {
        error!(%job, error = %e, "autoscaling evaluation panicked");
    }
}
