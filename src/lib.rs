//! Geofence - position monitoring and alarm service
//!
//! Watches a stream of position samples against a single circular fence,
//! detects directional boundary crossings, and drives a repeating alarm
//! until acknowledged.

pub mod config;
pub mod engine;
pub mod error;
pub mod fence;
pub mod geo;
pub mod io;
pub mod monitor;
pub mod signaler;
pub mod state;

pub use config::{load_config, Config};
pub use engine::{Engine, EngineHandle, Event, StatusSink, TracingStatusSink};
pub use error::{GeofenceError, Result};
pub use fence::{normalize_radius, Fence, PlaceInfo, TriggerCondition};
pub use geo::{distance_meters, Coordinate};
pub use monitor::{Evaluation, GeofenceMonitor, Outcome};
pub use signaler::{AlarmSignaler, AlarmSink, SignalerState, TracingAlarmSink};
pub use state::{new_state_handle, SharedState, StateHandle};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::io::{EventSource, JsonLinesEventSource};

/// Run the geofence service with the given configuration.
///
/// Events are read from stdin as JSON lines; alarm and status output goes
/// to the log. Returns after ctrl-c or when the event stream ends.
pub async fn run(config: Config) -> Result<()> {
    let cancel = CancellationToken::new();

    let alarm_sink: Arc<dyn AlarmSink> = Arc::new(TracingAlarmSink);
    let sinks: Vec<Arc<dyn StatusSink>> = vec![Arc::new(TracingStatusSink)];
    let state = new_state_handle(
        config.fence.to_fence(),
        config.trigger,
        config.history_size,
    );

    let (engine, handle) = Engine::new(&config, alarm_sink, sinks, state, cancel.clone());

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl-c");
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    // Feed stdin events into the engine. Dropping the handle on stream end
    // closes the queue, which lets the engine drain and exit.
    let cancel_for_source = cancel.clone();
    tokio::spawn(async move {
        let mut source = JsonLinesEventSource::stdin();
        loop {
            tokio::select! {
                _ = cancel_for_source.cancelled() => break,
                event = source.next_event() => match event {
                    Ok(Some(event)) => {
                        if handle.send(event).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        tracing::info!("Event stream ended");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("Event stream error: {}", e);
                        break;
                    }
                }
            }
        }
    });

    tracing::info!("Geofence engine started");
    engine.run().await;
    tracing::info!("Geofence engine stopped");

    Ok(())
}
