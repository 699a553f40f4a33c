//! In-flight request tracking for action-dispatching state containers
//!
//! Prevents duplicate concurrent requests for the same URL:
//!
//! - [`store::requests_reducer`] keeps the set of URLs with a pending request
//! - [`middleware::builtin::RequestGate`] drops begin actions for URLs already
//!   in that set
//! - [`lifecycle`] wraps one request in tagged begin / success / failure
//!   actions and skips the transport when the begin action was dropped

pub mod config;
pub mod lifecycle;
pub mod middleware;
pub mod store;

pub use pending_requests_types::{Action, RequestTag, REQUEST_META_KEY};
