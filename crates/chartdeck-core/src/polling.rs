// ── Fixed-interval re-fetch loop ──
//
// One timer per mounted view. The tick runs once immediately and then every
// `interval`. Ticks may overlap: each one runs as its own task, so a slow
// request never delays the timer. Overlap is harmless because a tick only
// ever replaces the snapshot. Stopping (or dropping) the loop aborts every
// tick still in flight, so nothing writes into an unmounted view.

use std::future::Future;
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Guard for a running poll timer. Dropping it stops the timer.
#[derive(Debug)]
pub struct PollingLoop {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PollingLoop {
    /// Start calling `tick` now and then every `interval`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<F, Fut>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let period = interval.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut in_flight: JoinSet<()> = JoinSet::new();

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        in_flight.spawn(tick());
                    }
                    Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
                }
            }

            in_flight.abort_all();
            debug!("poll loop stopped");
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Cancel the timer and any tick still in flight.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Stop and wait for the loop task to wind down.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for PollingLoop {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() -> std::future::Ready<()> + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let tick = move || {
            c.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        };
        (count, tick)
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_immediately_then_on_interval() {
        let (count, tick) = counter();
        let poll = PollingLoop::start(Duration::from_secs(2), tick);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(count.load(Ordering::SeqCst), 4);

        poll.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_ticks() {
        let (count, tick) = counter();
        let poll = PollingLoop::start(Duration::from_secs(2), tick);
        tokio::time::sleep(Duration::from_millis(10)).await;

        poll.stop();
        assert!(!poll.is_running());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_stops_loop() {
        let (count, tick) = counter();
        {
            let _poll = PollingLoop::start(Duration::from_secs(1), tick);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_ticks_overlap() {
        let started = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&started);
        let poll = PollingLoop::start(Duration::from_secs(1), move || {
            s.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(5))
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(started.load(Ordering::SeqCst), 4);
        poll.shutdown().await;
    }
}
