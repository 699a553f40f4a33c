//! Dispatch log
//!
//! Sits last in the pipeline, right before the reducer commit, so it only sees
//! actions the gate let through. Suppressed begins are logged by the gate.

use pending_requests_types::Action;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::lifecycle::REQUEST_ABANDONED;
use crate::middleware::pipeline::Next;
use crate::middleware::types::{DispatchResult, Stage, StagePriority};
use crate::store::StoreView;

/// Which committed actions the dispatch log reports, and at what level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Terminal actions that carry an `error` or were abandoned, at `error!`.
    /// Everything else is silent.
    Error,
    /// The same failed terminal actions as `Error`, at `warn!`
    Warn,
    /// Every committed action type at `info!`, without request details
    Info,
    /// Every committed action at `debug!`, with `url`, `done` and `error`
    Debug,
    /// The whole action record at `trace!`
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("Unknown log level: {}", other)),
        }
    }
}

/// Stage that logs dispatched actions
pub struct LoggingStage {
    /// Log level
    level: LogLevel,
    /// Whether to include request details
    include_context: bool,
}

impl LoggingStage {
    /// Create a new logging stage with default settings
    pub fn new() -> Self {
        Self {
            level: LogLevel::Info,
            include_context: false,
        }
    }

    /// Create with a specific log level
    pub fn with_level(level: LogLevel) -> Self {
        Self {
            level,
            include_context: matches!(level, LogLevel::Debug | LogLevel::Trace),
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    fn format_context(&self, action: &Action) -> String {
        if !self.include_context {
            return String::new();
        }

        let mut parts = Vec::new();

        if let Some(tag) = action.request_tag() {
            parts.push(format!("url={}", tag.url));
            parts.push(format!("done={}", tag.done));
        }
        if let Some(error) = action.field("error") {
            parts.push(format!("error={}", error));
        }

        if parts.is_empty() {
            String::new()
        } else {
            format!(" [{}]", parts.join(", "))
        }
    }
}

impl Default for LoggingStage {
    fn default() -> Self {
        Self::new()
    }
}

/// A terminal action carrying an `error` field, or an abandoned request.
fn is_failure(action: &Action) -> bool {
    action.is_request_done()
        && (action.field("error").is_some() || action.kind == REQUEST_ABANDONED)
}

impl<S> Stage<S> for LoggingStage {
    fn id(&self) -> &str {
        "builtin.logging"
    }

    fn name(&self) -> &str {
        "Logging Stage"
    }

    fn description(&self) -> &str {
        "Logs dispatched actions for debugging and auditing"
    }

    fn priority(&self) -> StagePriority {
        // Closest to the reducer so only committed actions are logged
        StagePriority::Lowest
    }

    fn handle(&self, action: Action, _store: StoreView<'_, S>, next: Next<'_, S>) -> DispatchResult {
        let kind = action.kind.clone();
        let ctx_str = self.format_context(&action);
        let failed = is_failure(&action);

        match self.level {
            LogLevel::Error => {
                if failed {
                    log::error!("[DISPATCH] {}{}", kind, ctx_str);
                }
            }
            LogLevel::Warn => {
                if failed {
                    log::warn!("[DISPATCH] {}{}", kind, ctx_str);
                }
            }
            LogLevel::Info => {
                log::info!("[DISPATCH] {}{}", kind, ctx_str);
            }
            LogLevel::Debug => {
                log::debug!("[DISPATCH] {}{}", kind, ctx_str);
            }
            LogLevel::Trace => {
                log::trace!("[DISPATCH] {} - action: {:?}", kind, action);
            }
        }

        next.run(action)
    }
}
