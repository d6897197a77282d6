//! Process: one simulated unit of application work.
//!
//! A process runs for a fixed simulated duration on a tokio timer and
//! signals completion exactly once through its callback. The timer task
//! holds a strong reference to the process for the whole callback window,
//! so a process stays alive even if its owner drops it concurrently.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::trace;

use crate::BoxFuture;
use crate::error::{SimError, SimResult};

/// Callback invoked when a process finishes.
///
/// The owning server provides this callback; it removes the process from
/// the server's active set and re-runs load classification.
pub type CompletionCallback = Arc<dyn Fn(Arc<Process>) -> BoxFuture + Send + Sync>;

static NEXT_PROCESS_ID: AtomicU64 = AtomicU64::new(1);

/// A running simulated process.
pub struct Process {
    id: u64,
    /// Execution duration in simulated seconds.
    sim_duration_secs: f64,
}

impl Process {
    /// Start a process: schedules the completion timer immediately.
    ///
    /// `real_duration` is the wall-clock sleep backing `sim_duration_secs`
    /// under the configured time scale. Fails only when no runtime is
    /// reachable to schedule the timer. The callback fires at most once,
    /// on the timer task's context, never the creator's.
    pub fn launch(
        sim_duration_secs: f64,
        real_duration: Duration,
        on_complete: CompletionCallback,
    ) -> SimResult<Arc<Self>> {
        let handle =
            tokio::runtime::Handle::try_current().map_err(|_| SimError::SchedulerUnavailable)?;

        let process = Arc::new(Self {
            id: NEXT_PROCESS_ID.fetch_add(1, Ordering::Relaxed),
            sim_duration_secs,
        });

        // The spawned task owns this clone until the callback returns,
        // which keeps the process alive through the completion window.
        let running = Arc::clone(&process);
        handle.spawn(async move {
            tokio::time::sleep(real_duration).await;
            trace!(process = running.id, "process timer elapsed");
            on_complete(Arc::clone(&running)).await;
        });

        Ok(process)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Execution duration in simulated seconds.
    pub fn sim_duration_secs(&self) -> f64 {
        self.sim_duration_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[tokio::test]
    async fn completion_callback_fires_exactly_once() {
        let fired = Arc::new(AtomicU32::new(0));
        let fired_in_cb = Arc::clone(&fired);

        let callback: CompletionCallback = Arc::new(move |_process| {
            let fired = Arc::clone(&fired_in_cb);
            Box::pin(async move {
                fired.fetch_add(1, Ordering::SeqCst);
            })
        });

        let process = Process::launch(60.0, Duration::from_millis(10), callback).unwrap();
        assert_eq!(process.sim_duration_secs(), 60.0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn process_outlives_dropped_owner_reference() {
        let fired = Arc::new(AtomicU32::new(0));
        let fired_in_cb = Arc::clone(&fired);

        let callback: CompletionCallback = Arc::new(move |_process| {
            let fired = Arc::clone(&fired_in_cb);
            Box::pin(async move {
                fired.fetch_add(1, Ordering::SeqCst);
            })
        });

        let process = Process::launch(1.0, Duration::from_millis(10), callback).unwrap();
        drop(process); // Owner drops its reference before the timer fires.

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn launch_outside_runtime_fails() {
        let callback: CompletionCallback = Arc::new(|_process| Box::pin(async {}));
        let result = Process::launch(60.0, Duration::from_millis(1), callback);
        assert!(matches!(result, Err(SimError::SchedulerUnavailable)));
    }

    #[tokio::test]
    async fn process_ids_are_unique() {
        let callback: CompletionCallback = Arc::new(|_process| Box::pin(async {}));
        let a = Process::launch(1.0, Duration::from_millis(5), callback.clone()).unwrap();
        let b = Process::launch(1.0, Duration::from_millis(5), callback).unwrap();
        assert_ne!(a.id(), b.id());
    }
}
