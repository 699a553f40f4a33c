//! State container and the pending request reducer
//!
//! - `pending` holds the pending URL set and its pure transition function
//! - `container` holds the `Store`, which runs actions through the stage
//!   pipeline and commits forwarded ones with the root reducer
//! - `state` holds the default root state and reducer composition

mod container;
mod pending;
mod state;


pub use container::{Reducer, Store, StoreView};
pub use pending::{requests_reducer, PendingSet};
pub use state::{select_requests, AppState, CombinedReducer, SliceReducer, REQUESTS_SLICE};
