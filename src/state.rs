//! Shared state for the current fence status and alarm history

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::fence::{Fence, PlaceInfo, TriggerCondition};
use crate::geo::Coordinate;
use crate::monitor::Evaluation;

/// Point-in-time view of the monitor, for status displays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub fence: Fence,
    pub trigger: TriggerCondition,
    pub place_info: Option<PlaceInfo>,
    pub last_position: Option<Coordinate>,
    pub last_evaluation: Option<Evaluation>,
    pub last_evaluation_epoch_ms: Option<u64>,
    pub alarm_active: bool,
}

/// One alarm level change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmRecord {
    pub active: bool,
    pub timestamp_epoch_ms: u64,
}

/// Shared state accessible by the engine and status consumers
#[derive(Debug)]
pub struct SharedState {
    pub snapshot: MonitorSnapshot,
    pub history: VecDeque<AlarmRecord>,
    pub history_max_size: usize,
    pub started_at: Instant,
}

impl SharedState {
    pub fn new(fence: Fence, trigger: TriggerCondition, history_max_size: usize) -> Self {
        Self {
            snapshot: MonitorSnapshot {
                fence,
                trigger,
                place_info: None,
                last_position: None,
                last_evaluation: None,
                last_evaluation_epoch_ms: None,
                alarm_active: false,
            },
            history: VecDeque::with_capacity(history_max_size),
            history_max_size,
            started_at: Instant::now(),
        }
    }

    /// Record an evaluation result
    pub fn update_evaluation(&mut self, evaluation: Evaluation, now_ms: u64) {
        self.snapshot.last_evaluation = Some(evaluation);
        self.snapshot.last_evaluation_epoch_ms = Some(now_ms);
    }

    /// Record an alarm level change in the bounded history
    pub fn record_alarm_change(&mut self, active: bool, now_ms: u64) {
        self.snapshot.alarm_active = active;
        if self.history.len() >= self.history_max_size {
            self.history.pop_front();
        }
        self.history.push_back(AlarmRecord {
            active,
            timestamp_epoch_ms: now_ms,
        });
    }
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<SharedState>>;

pub fn new_state_handle(
    fence: Fence,
    trigger: TriggerCondition,
    history_max_size: usize,
) -> StateHandle {
    Arc::new(RwLock::new(SharedState::new(
        fence,
        trigger,
        history_max_size,
    )))
}
