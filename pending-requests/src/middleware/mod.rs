//! Dispatch pipeline for intercepting actions before they reach the reducer
//!
//! Stages run in priority order. Each one receives the action, a read-only
//! view of the store and the rest of the chain, and either forwards the action
//! or suppresses it. Only actions that make it through every stage are
//! committed.
//!
//! # Example
//!
//! ```rust,ignore
//! use pending_requests::middleware::builtin::{LoggingStage, RequestGate};
//! use pending_requests::store::{AppState, CombinedReducer, Store};
//!
//! let store = Store::new(AppState::default(), CombinedReducer::new());
//! store.pipeline().register(Arc::new(RequestGate::new()));
//! store.pipeline().register(Arc::new(LoggingStage::new()));
//!
//! if store.dispatch(action).is_suppressed() {
//!     // A request for this URL is already in flight
//! }
//! ```

pub mod builtin;
mod pipeline;
mod types;

pub use pipeline::{Next, Pipeline};
pub use types::{BoxedStage, DispatchResult, Stage, StageConfig, StagePriority, StageStats};
