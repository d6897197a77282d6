//! Server: a simulated compute instance hosting concurrent processes.
//!
//! A server owns its active process set behind its own lock and nothing
//! else; controller-side collections are guarded separately. After every
//! add or remove the server reclassifies itself against its instance
//! profile and, when the bucket changed, notifies its owning controller
//! through the bucket-change callback. The callback is always invoked
//! after the server lock has been released, which keeps the lock ordering
//! between servers and controllers acyclic.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, trace};

use surge_core::catalog::InstanceProfile;
use surge_core::types::LoadBucket;

use crate::BoxFuture;
use crate::error::SimResult;
use crate::process::{CompletionCallback, Process};

/// Callback invoked when a server's load bucket changes.
///
/// The owning controller uses this to relocate the server between its
/// bucket collections and to apply scaling policy.
pub type BucketChangeCallback = Arc<dyn Fn(Arc<Server>, LoadBucket) -> BoxFuture + Send + Sync>;

static NEXT_SERVER_ID: AtomicU64 = AtomicU64::new(1);

/// State guarded by the server's lock: the active process set and the
/// bucket derived from it.
struct ServerInner {
    processes: HashMap<u64, Arc<Process>>,
    bucket: LoadBucket,
}

/// A simulated virtual server of one instance type.
pub struct Server {
    id: u64,
    profile: InstanceProfile,
    /// Simulated seconds per real second, for timer and lifetime math.
    time_scale: f64,
    created: Instant,
    inner: Mutex<ServerInner>,
    on_bucket_change: BucketChangeCallback,
}

impl Server {
    /// Create a server. New servers start in `Underloaded`, about to
    /// receive their first process.
    pub fn new(
        profile: InstanceProfile,
        time_scale: f64,
        on_bucket_change: BucketChangeCallback,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_SERVER_ID.fetch_add(1, Ordering::Relaxed),
            profile,
            time_scale,
            created: Instant::now(),
            inner: Mutex::new(ServerInner {
                processes: HashMap::new(),
                bucket: LoadBucket::Underloaded,
            }),
            on_bucket_change,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn instance_type(&self) -> &str {
        &self.profile.instance_type
    }

    pub fn profile(&self) -> &InstanceProfile {
        &self.profile
    }

    /// Elapsed lifetime in simulated seconds, for cost accounting at
    /// decommission time.
    pub fn sim_lifetime_secs(&self) -> f64 {
        self.created.elapsed().as_secs_f64() * self.time_scale
    }

    /// Current active process count.
    pub async fn active_count(&self) -> usize {
        self.inner.lock().await.processes.len()
    }

    /// The bucket from the most recent classification.
    pub async fn bucket(&self) -> LoadBucket {
        self.inner.lock().await.bucket
    }

    /// Launch a process on this server.
    ///
    /// Inserts into the active set under the server lock, reclassifies,
    /// and returns without waiting for the process to finish. There is no
    /// capacity check here: the controller's placement order never selects
    /// a saturated server, and that guarantee lives with the caller.
    pub async fn launch_process(self: &Arc<Self>, sim_duration_secs: f64) -> SimResult<()> {
        let owner = Arc::clone(self);
        let on_complete: CompletionCallback = Arc::new(move |process: Arc<Process>| {
            let owner = Arc::clone(&owner);
            Box::pin(async move {
                owner.remove_process(&process).await;
            })
        });

        let real_duration = Duration::from_secs_f64(sim_duration_secs / self.time_scale);

        let changed = {
            let mut inner = self.inner.lock().await;
            let process = Process::launch(sim_duration_secs, real_duration, on_complete)?;
            trace!(
                server = self.id,
                process = process.id(),
                "process launched"
            );
            inner.processes.insert(process.id(), process);
            Self::reclassify(&mut inner, &self.profile)
        };

        if let Some(bucket) = changed {
            (self.on_bucket_change)(Arc::clone(self), bucket).await;
        }
        Ok(())
    }

    /// Remove a completed process and reclassify.
    ///
    /// Removal is keyed by process id, so a process can never be removed
    /// twice: the second attempt finds nothing and returns.
    async fn remove_process(self: &Arc<Self>, process: &Process) {
        let changed = {
            let mut inner = self.inner.lock().await;
            if inner.processes.remove(&process.id()).is_none() {
                debug!(
                    server = self.id,
                    process = process.id(),
                    "process already removed, ignoring"
                );
                return;
            }
            trace!(
                server = self.id,
                process = process.id(),
                "process completed"
            );
            Self::reclassify(&mut inner, &self.profile)
        };

        if let Some(bucket) = changed {
            (self.on_bucket_change)(Arc::clone(self), bucket).await;
        }
    }

    /// Recompute the bucket from the current count. Returns the new bucket
    /// when it differs from the recorded one.
    fn reclassify(inner: &mut ServerInner, profile: &InstanceProfile) -> Option<LoadBucket> {
        let bucket = profile.classify(inner.processes.len() as u32);
        if bucket != inner.bucket {
            inner.bucket = bucket;
            Some(bucket)
        } else {
            None
        }
    }
}
