//! Built-in stages
//!
//! - Request gate - At most one in-flight request per URL
//! - Logging - Dispatch recording and debugging

mod logging_stage;
mod request_gate;

pub use logging_stage::{LogLevel, LoggingStage};
pub use request_gate::{GateDecision, RequestGate, Selector};
