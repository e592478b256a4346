//! Cancellable delayed task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Runs at most one scheduled task, `delay` after the most recent
/// [`schedule`](Debouncer::schedule) call.
///
/// Scheduling while a task is pending cancels it and restarts the timer, so
/// of a burst of calls only the last task runs. Dropping the debouncer
/// cancels any pending task.
///
/// The timer and [`cancel`](Debouncer::cancel) race for a per-task claim, so a
/// task that has started running is never reported as cancelled.
///
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<Pending>,
}

#[derive(Debug)]
struct Pending {
    handle: JoinHandle<()>,
    claimed: Arc<AtomicBool>,
}

impl Pending {
    /// Take the task away from the timer. False if it already started.
    fn claim(&self) -> bool {
        !self.claimed.swap(true, Ordering::AcqRel)
    }

    fn is_waiting(&self) -> bool {
        !self.handle.is_finished() && !self.claimed.load(Ordering::Acquire)
    }
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any pending task with `task`, to run after the delay.
    pub fn schedule<F>(&mut self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let replaced = self.cancel();
        let delay = self.delay;
        debug!(delay_ms = delay.as_millis() as u64, replaced, "Debounce scheduled");
        let claimed = Arc::new(AtomicBool::new(false));
        let claim = Arc::clone(&claimed);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !claim.swap(true, Ordering::AcqRel) {
                task();
            }
        });
        self.pending = Some(Pending { handle, claimed });
    }

    /// Cancel the pending task. Returns true if it was still waiting, in
    /// which case it will never run.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                let cancelled = pending.claim();
                pending.handle.abort();
                if cancelled {
                    debug!("Debounce cancelled");
                }
                cancelled
            }
            None => false,
        }
    }

    /// Returns true if a task is waiting to run.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(Pending::is_waiting)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.claim();
            pending.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test(start_paused = true)]
    async fn test_runs_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        let counter = fired.clone();
        debouncer.schedule(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_runs_only_last() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        for n in 0..5 {
            let seen = seen.clone();
            debouncer.schedule(move || seen.lock().unwrap().push(n));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(seen.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(*seen.lock().unwrap(), vec![4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(50));
        assert!(!debouncer.cancel());

        let counter = fired.clone();
        debouncer.schedule(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(debouncer.cancel());
        assert!(!debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let fired = Arc::new(AtomicUsize::new(0));
        {
            let mut debouncer = Debouncer::new(Duration::from_millis(50));
            let counter = fired.clone();
            debouncer.schedule(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_after_task_started_reports_nothing_pending() {
        let fired = Arc::new(AtomicUsize::new(0));
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let mut debouncer = Debouncer::new(Duration::from_millis(10));

        let counter = fired.clone();
        debouncer.schedule(move || {
            started_tx.send(()).unwrap();
            let _ = release_rx.recv_timeout(Duration::from_secs(5));
            counter.fetch_add(1, Ordering::SeqCst);
        });
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // the task is mid-run: nothing is left to cancel
        assert!(!debouncer.is_pending());
        assert!(!debouncer.cancel());

        release_tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
