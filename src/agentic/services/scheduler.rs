use std::future::Future;

use tokio::task::JoinHandle;

/// Handle to a spawned timer-driven task.
///
/// Dropping the handle aborts the task, so whoever owns the handle owns the
/// timer.
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Spawn `future` on the current runtime.
    pub fn schedule<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(future),
        }
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn delayed_hit(hits: &Arc<AtomicUsize>, delay_ms: u64) -> ScheduledTask {
        let counter = hits.clone();
        ScheduledTask::schedule(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_while_held() {
        let hits = Arc::new(AtomicUsize::new(0));
        let _task = delayed_hit(&hits, 200);

        tokio::time::sleep(Duration::from_millis(199)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts() {
        let hits = Arc::new(AtomicUsize::new(0));
        let task = delayed_hit(&hits, 100);
        drop(task);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
