//! Alarm signaler: repeating play action while the alarm level is active
//!
//! Translates the monitor's `alarm_active` level into sink calls: one
//! immediate `play` on activation, a repeat every `repeat_interval` while
//! sounding, and a `stop` on deactivation. The repeat runs on its own task
//! and is cancelled through a `CancellationToken`, so deactivation can
//! never leak a trigger that fires afterwards.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// External playback collaborator (audio, buzzer, notification, ...)
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait AlarmSink: Send + Sync {
    /// Trigger the alarm sound once
    async fn play(&self) -> crate::Result<()>;

    /// Stop playback and rewind
    async fn stop(&self) -> crate::Result<()>;
}

/// Production sink that reports alarm activity through the log
#[derive(Debug, Default)]
pub struct TracingAlarmSink;

#[async_trait]
impl AlarmSink for TracingAlarmSink {
    async fn play(&self) -> crate::Result<()> {
        tracing::warn!("ALARM");
        Ok(())
    }

    async fn stop(&self) -> crate::Result<()> {
        tracing::info!("Alarm silenced");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalerState {
    Idle,
    Sounding,
}

/// Drives an [`AlarmSink`] from alarm level changes
pub struct AlarmSignaler {
    sink: Arc<dyn AlarmSink>,
    repeat_interval: Duration,
    repeat_task: Option<(CancellationToken, JoinHandle<()>)>,
}

impl std::fmt::Debug for AlarmSignaler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlarmSignaler")
            .field("repeat_interval", &self.repeat_interval)
            .field("state", &self.state())
            .finish()
    }
}

impl AlarmSignaler {
    pub fn new(sink: Arc<dyn AlarmSink>, repeat_interval: Duration) -> Self {
        Self {
            sink,
            repeat_interval,
            repeat_task: None,
        }
    }

    pub fn state(&self) -> SignalerState {
        if self.repeat_task.is_some() {
            SignalerState::Sounding
        } else {
            SignalerState::Idle
        }
    }

    /// Apply a new alarm level
    pub async fn set_active(&mut self, active: bool) {
        if active {
            self.start().await;
        } else {
            self.stop().await;
        }
    }

    /// Cancel any pending repeat and stop playback. Called on deactivation
    /// and when the owning engine shuts down.
    pub async fn shutdown(&mut self) {
        self.stop().await;
    }

    async fn start(&mut self) {
        // At most one repeat timer per signaler
        self.cancel_repeat().await;

        if let Err(e) = self.sink.play().await {
            tracing::warn!("Alarm play failed: {}", e);
        }

        let cancel = CancellationToken::new();
        let sink = Arc::clone(&self.sink);
        let interval = self.repeat_interval;
        let cancel_for_task = cancel.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        if let Err(e) = sink.play().await {
                            tracing::warn!("Alarm play failed: {}", e);
                        }
                    }
                    _ = cancel_for_task.cancelled() => {
                        tracing::debug!("Alarm repeat cancelled");
                        break;
                    }
                }
            }
        });
        self.repeat_task = Some((cancel, handle));
    }

    async fn stop(&mut self) {
        let was_sounding = self.repeat_task.is_some();
        self.cancel_repeat().await;
        // Stop even if no repeat had fired yet
        if was_sounding {
            if let Err(e) = self.sink.stop().await {
                tracing::warn!("Alarm stop failed: {}", e);
            }
        }
    }

    async fn cancel_repeat(&mut self) {
        if let Some((cancel, handle)) = self.repeat_task.take() {
            cancel.cancel();
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Counting sink for timing tests
    #[derive(Debug, Default)]
    struct CountingSink {
        plays: AtomicU32,
        stops: AtomicU32,
    }

    impl CountingSink {
        fn plays(&self) -> u32 {
            self.plays.load(Ordering::SeqCst)
        }

        fn stops(&self) -> u32 {
            self.stops.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AlarmSink for CountingSink {
        async fn play(&self) -> crate::Result<()> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) -> crate::Result<()> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    const REPEAT: Duration = Duration::from_millis(2000);

    #[tokio::test(start_paused = true)]
    async fn activation_plays_immediately() {
        let sink = Arc::new(CountingSink::default());
        let mut signaler = AlarmSignaler::new(Arc::clone(&sink) as Arc<dyn AlarmSink>, REPEAT);

        signaler.set_active(true).await;
        assert_eq!(sink.plays(), 1);
        assert_eq!(signaler.state(), SignalerState::Sounding);
    }

    #[tokio::test(start_paused = true)]
    async fn repeat_fires_every_interval_while_sounding() {
        let sink = Arc::new(CountingSink::default());
        let mut signaler = AlarmSignaler::new(Arc::clone(&sink) as Arc<dyn AlarmSink>, REPEAT);

        signaler.set_active(true).await;
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(sink.plays(), 2);
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(sink.plays(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn deactivation_stops_and_cancels_repeat() {
        let sink = Arc::new(CountingSink::default());
        let mut signaler = AlarmSignaler::new(Arc::clone(&sink) as Arc<dyn AlarmSink>, REPEAT);

        signaler.set_active(true).await;
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(sink.plays(), 2);

        signaler.set_active(false).await;
        assert_eq!(sink.stops(), 1);
        assert_eq!(signaler.state(), SignalerState::Idle);

        // No further plays after deactivation
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(sink.plays(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn deactivation_before_first_repeat_still_stops() {
        let sink = Arc::new(CountingSink::default());
        let mut signaler = AlarmSignaler::new(Arc::clone(&sink) as Arc<dyn AlarmSink>, REPEAT);

        signaler.set_active(true).await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        signaler.set_active(false).await;

        assert_eq!(sink.plays(), 1);
        assert_eq!(sink.stops(), 1);
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(sink.plays(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deactivation_while_idle_is_a_no_op() {
        let sink = Arc::new(CountingSink::default());
        let mut signaler = AlarmSignaler::new(Arc::clone(&sink) as Arc<dyn AlarmSink>, REPEAT);

        signaler.set_active(false).await;
        assert_eq!(sink.plays(), 0);
        assert_eq!(sink.stops(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reactivation_replaces_the_timer() {
        let sink = Arc::new(CountingSink::default());
        let mut signaler = AlarmSignaler::new(Arc::clone(&sink) as Arc<dyn AlarmSink>, REPEAT);

        signaler.set_active(true).await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        // Restart: old timer is cancelled, play fires again, repeat rebased
        signaler.set_active(true).await;
        assert_eq!(sink.plays(), 2);

        // 1500 ms after restart the old timer would have fired; it must not
        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert_eq!(sink.plays(), 2);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(sink.plays(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_repeat() {
        let sink = Arc::new(CountingSink::default());
        let mut signaler = AlarmSignaler::new(Arc::clone(&sink) as Arc<dyn AlarmSink>, REPEAT);

        signaler.set_active(true).await;
        signaler.shutdown().await;
        assert_eq!(signaler.state(), SignalerState::Idle);
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(sink.plays(), 1);
        assert_eq!(sink.stops(), 1);
    }

    #[tokio::test]
    async fn sink_failures_are_swallowed() {
        let mut mock = MockAlarmSink::new();
        mock.expect_play().returning(|| {
            Box::pin(async { Err(crate::GeofenceError::Signaler("device busy".to_string())) })
        });
        mock.expect_stop().returning(|| {
            Box::pin(async { Err(crate::GeofenceError::Signaler("device busy".to_string())) })
        });

        let mut signaler = AlarmSignaler::new(Arc::new(mock), REPEAT);
        signaler.set_active(true).await;
        signaler.set_active(false).await;
        assert_eq!(signaler.state(), SignalerState::Idle);
    }
}
