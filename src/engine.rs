//! Engine: applies external events to the monitor and fans out the results
//!
//! All monitor mutations happen on the engine task, so the edge-triggering
//! invariant holds without locking the monitor itself. Collaborators feed
//! events in through an [`EngineHandle`]; evaluation results and alarm
//! level changes go out through [`StatusSink`]s and the alarm signaler.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::fence::{PlaceInfo, TriggerCondition};
use crate::geo::Coordinate;
use crate::monitor::{Evaluation, GeofenceMonitor};
use crate::signaler::{AlarmSignaler, AlarmSink};
use crate::state::StateHandle;

/// Queue depth for inbound events. Position streams are unbounded in time
/// but each event is O(1) to apply, so a small buffer suffices.
const EVENT_QUEUE_DEPTH: usize = 64;

/// An external event driving the monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// New position sample from the location collaborator
    Position {
        #[serde(flatten)]
        position: Coordinate,
    },
    /// Fence center designated by map click or place selection
    DesignateCenter {
        #[serde(flatten)]
        center: Coordinate,
        #[serde(default)]
        place: Option<PlaceInfo>,
    },
    /// Raw radius edit, normalized before it reaches the fence
    SetRadius { radius_meters: f64 },
    /// Change which crossing direction raises the alarm
    SetTrigger { trigger: TriggerCondition },
    /// Explicit alarm acknowledgment
    Acknowledge,
}

/// Consumer of evaluation results and alarm level changes
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn evaluation_updated(&self, evaluation: Evaluation);
    async fn alarm_state_changed(&self, active: bool);
}

/// Production sink that reports status through the log
#[derive(Debug, Default)]
pub struct TracingStatusSink;

#[async_trait]
impl StatusSink for TracingStatusSink {
    async fn evaluation_updated(&self, evaluation: Evaluation) {
        tracing::info!(
            "Distance {:.0} m, {}",
            evaluation.distance_meters,
            if evaluation.is_inside {
                "inside the area"
            } else {
                "outside the area"
            }
        );
    }

    async fn alarm_state_changed(&self, active: bool) {
        if active {
            tracing::warn!("Alarm raised");
        } else {
            tracing::info!("Alarm cleared");
        }
    }
}

/// Sending side of the engine's event queue
#[derive(Debug, Clone)]
pub struct EngineHandle {
    events: mpsc::Sender<Event>,
}

impl EngineHandle {
    pub async fn position_update(&self, position: Coordinate) -> crate::Result<()> {
        self.send(Event::Position { position }).await
    }

    pub async fn designate_center(
        &self,
        center: Coordinate,
        place: Option<PlaceInfo>,
    ) -> crate::Result<()> {
        self.send(Event::DesignateCenter { center, place }).await
    }

    pub async fn set_radius(&self, radius_meters: f64) -> crate::Result<()> {
        self.send(Event::SetRadius { radius_meters }).await
    }

    pub async fn set_trigger(&self, trigger: TriggerCondition) -> crate::Result<()> {
        self.send(Event::SetTrigger { trigger }).await
    }

    pub async fn acknowledge(&self) -> crate::Result<()> {
        self.send(Event::Acknowledge).await
    }

    pub async fn send(&self, event: Event) -> crate::Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| crate::GeofenceError::Engine("event queue closed".to_string()))
    }
}

/// The engine owns the monitor and serializes all mutations
pub struct Engine {
    monitor: GeofenceMonitor,
    signaler: AlarmSignaler,
    sinks: Vec<Arc<dyn StatusSink>>,
    state: StateHandle,
    events: mpsc::Receiver<Event>,
    cancel: CancellationToken,
}

impl Engine {
    pub fn new(
        config: &Config,
        alarm_sink: Arc<dyn AlarmSink>,
        sinks: Vec<Arc<dyn StatusSink>>,
        state: StateHandle,
        cancel: CancellationToken,
    ) -> (Self, EngineHandle) {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let monitor = GeofenceMonitor::new(config.fence.to_fence(), config.trigger);
        let signaler = AlarmSignaler::new(
            alarm_sink,
            Duration::from_millis(config.alarm.repeat_interval_ms),
        );

        let engine = Self {
            monitor,
            signaler,
            sinks,
            state,
            events: rx,
            cancel,
        };
        (engine, EngineHandle { events: tx })
    }

    /// Process events until cancelled or all handles are dropped, then
    /// release the signaler's timer and playback.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Engine cancelled");
                    break;
                }
                event = self.events.recv() => match event {
                    Some(event) => self.apply(event).await,
                    None => {
                        tracing::debug!("Event queue closed");
                        break;
                    }
                }
            }
        }
        self.signaler.shutdown().await;
    }

    async fn apply(&mut self, event: Event) {
        tracing::debug!("Applying {:?}", event);
        let outcome = match event {
            Event::Position { position } => self.monitor.update_position(position),
            Event::DesignateCenter { center, place } => {
                self.monitor.designate_center(center, place)
            }
            Event::SetRadius { radius_meters } => self.monitor.set_radius(radius_meters),
            Event::SetTrigger { trigger } => self.monitor.set_trigger(trigger),
            Event::Acknowledge => self.monitor.acknowledge(),
        };
        let now_ms = current_epoch_ms();

        {
            let mut state = self.state.write().await;
            state.snapshot.fence = self.monitor.fence();
            state.snapshot.trigger = self.monitor.trigger();
            state.snapshot.last_position = self.monitor.last_position();
            state.snapshot.place_info = self.monitor.place_info().cloned();
            if let Some(evaluation) = outcome.evaluation {
                state.update_evaluation(evaluation, now_ms);
            }
            if let Some(active) = outcome.alarm_changed {
                state.record_alarm_change(active, now_ms);
            }
        }

        if let Some(evaluation) = outcome.evaluation {
            tracing::debug!(
                "Evaluation: distance={:.1} m, inside={}",
                evaluation.distance_meters,
                evaluation.is_inside
            );
            for sink in &self.sinks {
                sink.evaluation_updated(evaluation).await;
            }
        }

        if let Some(active) = outcome.alarm_changed {
            tracing::info!("Alarm {}", if active { "active" } else { "inactive" });
            self.signaler.set_active(active).await;
            for sink in &self.sinks {
                sink.alarm_state_changed(active).await;
            }
        }
    }
}

fn current_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
