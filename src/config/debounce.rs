use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Delay-coalescing timer.
///
/// [`reset_timer`](Self::reset_timer) cancels whatever action is pending and
/// schedules the new one, so a burst of calls runs only the last action, once,
/// after the burst has been quiet for the full delay. Actions run on the tokio
/// blocking pool, never on the caller's thread.
pub struct Debouncer {
    runtime: Handle,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            pending: None,
        }
    }

    /// Cancel any pending action and run `action` after `delay` of quiet.
    pub fn reset_timer<F>(&mut self, delay: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(previous) = self.pending.take() {
            previous.abort();
        }

        self.pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = tokio::task::spawn_blocking(action).await {
                tracing::warn!("Debounced action failed: {}", e);
            }
        }));
    }

    /// Drop the pending action, if any.
    ///
    /// Returns true if an action was still waiting for its delay.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                was_pending
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_burst_runs_last_action_once() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut debouncer = Debouncer::new(rt.handle().clone());
        let runs = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(AtomicUsize::new(0));

        for i in 1..=5 {
            let runs = runs.clone();
            let last = last.clone();
            debouncer.reset_timer(Duration::from_millis(80), move || {
                runs.fetch_add(1, Ordering::SeqCst);
                last.store(i, Ordering::SeqCst);
            });
            std::thread::sleep(Duration::from_millis(5));
        }

        std::thread::sleep(Duration::from_millis(400));

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(last.load(Ordering::SeqCst), 5);
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_cancel_prevents_action() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut debouncer = Debouncer::new(rt.handle().clone());
        let runs = Arc::new(AtomicUsize::new(0));

        let runs_clone = runs.clone();
        debouncer.reset_timer(Duration::from_millis(50), move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert!(debouncer.is_pending());
        assert!(debouncer.cancel());

        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(!debouncer.cancel());
    }
}
