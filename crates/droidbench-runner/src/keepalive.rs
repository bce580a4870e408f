//! Overlay keepalive.
//!
//! The portal re-draws its visual overlay whenever the accessibility service
//! restarts, and the overlay corrupts the agent's screen perception. While a
//! task attempt is running, a background task re-issues the hide-overlay
//! command at a fixed cadence.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use droidbench_device::OverlayToggle;

/// Default cadence between hide-overlay commands.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Default bound on how long `stop` waits for the background task to exit.
pub const DEFAULT_STOP_WAIT: Duration = Duration::from_secs(10);

struct KeepaliveWorker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Periodically suppresses the device overlay for the duration of one task
/// attempt.
///
/// At most one background task runs at a time: starting while already
/// running logs a warning and does nothing, stopping while not running is a
/// no-op. `stop` waits a bounded time for the task to exit; a task that
/// outlives the bound is logged and abandoned rather than blocking the
/// attempt's teardown.
pub struct OverlayKeepalive {
    device: Arc<dyn OverlayToggle>,
    interval: Duration,
    stop_wait: Duration,
    worker: Mutex<Option<KeepaliveWorker>>,
}

impl OverlayKeepalive {
    /// Create a keepalive for one device with the default cadence.
    pub fn new(device: Arc<dyn OverlayToggle>) -> Self {
        Self {
            device,
            interval: DEFAULT_INTERVAL,
            stop_wait: DEFAULT_STOP_WAIT,
            worker: Mutex::new(None),
        }
    }

    /// Builder method to set the command cadence.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Builder method to bound the wait inside `stop`.
    pub fn with_stop_wait(mut self, stop_wait: Duration) -> Self {
        self.stop_wait = stop_wait;
        self
    }

    /// True while a background task is live.
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }

    /// Spawn the background task. A warning no-op if one is already running.
    pub fn start(&self) {
        let mut slot = self.worker.lock().unwrap();
        if slot.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            warn!("overlay keepalive is already running");
            return;
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(disable_loop(
            Arc::clone(&self.device),
            self.interval,
            token.clone(),
        ));
        *slot = Some(KeepaliveWorker { token, handle });

        info!(interval_secs = self.interval.as_secs_f64(), "started overlay keepalive");
    }

    /// Signal the background task to exit and wait for it, up to the bound.
    /// A no-op that returns immediately if nothing is running.
    pub async fn stop(&self) {
        let worker = self.worker.lock().unwrap().take();
        let Some(worker) = worker else {
            debug!("no overlay keepalive to stop");
            return;
        };

        info!("stopping overlay keepalive");
        worker.token.cancel();

        match tokio::time::timeout(self.stop_wait, worker.handle).await {
            Ok(Ok(())) => info!("overlay keepalive stopped"),
            Ok(Err(e)) => warn!(error = %e, "overlay keepalive task failed"),
            Err(_) => warn!(
                wait_secs = self.stop_wait.as_secs(),
                "overlay keepalive did not stop in time; abandoning it"
            ),
        }
    }
}

async fn disable_loop(device: Arc<dyn OverlayToggle>, interval: Duration, token: CancellationToken) {
    loop {
        // Fire-and-forget: a failed toggle never terminates the loop.
        if let Err(e) = device.disable_overlay().await {
            warn!(error = %e, "failed to disable overlay");
        }

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        // A cancel that raced the sleep is honored before the next command.
        if token.is_cancelled() {
            break;
        }
    }
    debug!("overlay keepalive loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use droidbench_device::DeviceError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingToggle {
        commands: AtomicUsize,
    }

    impl CountingToggle {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                commands: AtomicUsize::new(0),
            })
        }

        fn count(&self) -> usize {
            self.commands.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OverlayToggle for CountingToggle {
        async fn disable_overlay(&self) -> Result<(), DeviceError> {
            self.commands.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn keepalive(device: Arc<CountingToggle>) -> OverlayKeepalive {
        OverlayKeepalive::new(device).with_interval(Duration::from_millis(20))
    }

    #[tokio::test]
    async fn test_issues_commands_at_interval() {
        let device = CountingToggle::new();
        let keepalive = keepalive(Arc::clone(&device));

        keepalive.start();
        tokio::time::sleep(Duration::from_millis(70)).await;
        keepalive.stop().await;

        assert!(device.count() >= 2, "expected repeated commands, got {}", device.count());
    }

    #[tokio::test]
    async fn test_start_twice_keeps_one_worker() {
        let device = CountingToggle::new();
        let keepalive = OverlayKeepalive::new(device.clone())
            .with_interval(Duration::from_millis(50));

        keepalive.start();
        keepalive.start();
        assert!(keepalive.is_running());

        tokio::time::sleep(Duration::from_millis(120)).await;
        keepalive.stop().await;
        assert!(!keepalive.is_running());

        // A single loop fires roughly every 50ms; two would double the rate.
        assert!(
            device.count() <= 4,
            "two background units appear to be running: {} commands",
            device.count()
        );
    }

    #[tokio::test]
    async fn test_stop_without_start_is_a_no_op() {
        let device = CountingToggle::new();
        let keepalive = keepalive(Arc::clone(&device));

        keepalive.stop().await;

        assert!(!keepalive.is_running());
        assert_eq!(device.count(), 0);
    }

    #[tokio::test]
    async fn test_no_commands_after_stop_returns() {
        let device = CountingToggle::new();
        let keepalive = keepalive(Arc::clone(&device));

        keepalive.start();
        tokio::time::sleep(Duration::from_millis(30)).await;
        keepalive.stop().await;

        let after_stop = device.count();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(device.count(), after_stop);
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let device = CountingToggle::new();
        let keepalive = keepalive(Arc::clone(&device));

        keepalive.start();
        keepalive.stop().await;
        keepalive.start();
        assert!(keepalive.is_running());
        keepalive.stop().await;
    }
}
