//! Stage types and traits for the dispatch pipeline
//!
//! This module defines the core types and traits for dispatch interception.

use chrono::{DateTime, Utc};
use pending_requests_types::Action;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::pipeline::Next;
use crate::store::StoreView;

/// Outcome of a dispatch call
///
/// `Suppressed` is the sentinel returned when a stage dropped the action. The
/// reducer never saw it and the state is unchanged.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchResult {
    /// The action went through every stage and was committed by the reducer
    Forwarded(Action),
    /// A stage stopped the action
    Suppressed,
}

impl DispatchResult {
    pub fn is_forwarded(&self) -> bool {
        matches!(self, DispatchResult::Forwarded(_))
    }

    pub fn is_suppressed(&self) -> bool {
        matches!(self, DispatchResult::Suppressed)
    }

    /// The committed action, if any
    pub fn action(&self) -> Option<&Action> {
        match self {
            DispatchResult::Forwarded(action) => Some(action),
            DispatchResult::Suppressed => None,
        }
    }

    pub fn into_action(self) -> Option<Action> {
        match self {
            DispatchResult::Forwarded(action) => Some(action),
            DispatchResult::Suppressed => None,
        }
    }
}

/// Priority levels for stage order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagePriority {
    /// Runs first
    Critical = 0,
    /// Runs early (e.g., request gating)
    High = 100,
    /// Normal order
    Normal = 500,
    /// Runs later
    Low = 900,
    /// Runs last, closest to the reducer (e.g., logging)
    Lowest = 1000,
}

impl Default for StagePriority {
    fn default() -> Self {
        StagePriority::Normal
    }
}

/// One link in the dispatch pipeline
///
/// A stage either forwards the (possibly rewritten) action with
/// `next.run(action)` or returns [`DispatchResult::Suppressed`] to stop it.
/// Stages run while the store's dispatch lock is held and must not dispatch
/// into the same store.
pub trait Stage<S>: Send + Sync {
    /// Unique identifier for this stage
    fn id(&self) -> &str;

    /// Human-readable name for this stage
    fn name(&self) -> &str;

    /// Description of what this stage does
    fn description(&self) -> &str {
        ""
    }

    /// Position in the pipeline (lower = earlier)
    fn priority(&self) -> StagePriority {
        StagePriority::Normal
    }

    /// Whether this stage is enabled
    fn enabled(&self) -> bool {
        true
    }

    /// Handle one dispatched action
    fn handle(&self, action: Action, store: StoreView<'_, S>, next: Next<'_, S>) -> DispatchResult;
}

/// Configuration override for a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Stage ID
    pub id: String,
    /// Whether this stage is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Priority override
    #[serde(default)]
    pub priority: Option<StagePriority>,
}

fn default_enabled() -> bool {
    true
}

/// Statistics for a stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageStats {
    /// Total number of actions handled
    pub executions: u64,
    /// Actions that came back forwarded
    pub forwarded: u64,
    /// Actions suppressed here or further down the pipeline
    pub suppressed: u64,
    /// Average handling time in microseconds, downstream stages included
    pub avg_handle_us: f64,
    /// Maximum handling time in microseconds
    pub max_handle_us: u64,
    /// When the stage last handled an action
    pub last_executed_at: Option<DateTime<Utc>>,
}

impl StageStats {
    pub fn record_execution(&mut self, elapsed: Duration, result: &DispatchResult) {
        let elapsed_us = elapsed.as_micros() as u64;
        self.executions += 1;

        let total = self.avg_handle_us * (self.executions - 1) as f64;
        self.avg_handle_us = (total + elapsed_us as f64) / self.executions as f64;

        if elapsed_us > self.max_handle_us {
            self.max_handle_us = elapsed_us;
        }

        match result {
            DispatchResult::Forwarded(_) => self.forwarded += 1,
            DispatchResult::Suppressed => self.suppressed += 1,
        }

        self.last_executed_at = Some(Utc::now());
    }
}

/// A boxed stage for storage in collections
pub type BoxedStage<S> = Arc<dyn Stage<S>>;
