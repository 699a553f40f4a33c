//! Root application state and reducer composition

use pending_requests_types::Action;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::container::Reducer;
use super::pending::{requests_reducer, PendingSet};

/// Slice name the request gate reads by default.
pub const REQUESTS_SLICE: &str = "requests";

/// Default root state: the pending request set plus named application slices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default)]
    pub requests: PendingSet,
    #[serde(flatten)]
    pub slices: Map<String, Value>,
}

impl AppState {
    pub fn slice(&self, name: &str) -> Option<&Value> {
        self.slices.get(name)
    }
}

/// Default selector: the `requests` slice of [`AppState`]
pub fn select_requests(state: &AppState) -> &PendingSet {
    &state.requests
}

/// Reducer for one application slice. A slice that does not exist yet starts
/// out as `null`.
pub type SliceReducer = Box<dyn Fn(&Value, &Action) -> Value + Send + Sync>;

/// Routes every action through the requests reducer and each registered
/// slice reducer
#[derive(Default)]
pub struct CombinedReducer {
    slices: Vec<(String, SliceReducer)>,
}

impl CombinedReducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a slice reducer. The `requests` slice is reserved.
    pub fn with_slice<F>(mut self, name: impl Into<String>, reducer: F) -> Self
    where
        F: Fn(&Value, &Action) -> Value + Send + Sync + 'static,
    {
        let name = name.into();
        if name == REQUESTS_SLICE {
            log::warn!("[STORE] Ignoring slice reducer for reserved slice '{}'", name);
            return self;
        }
        self.slices.retain(|(existing, _)| *existing != name);
        self.slices.push((name, Box::new(reducer)));
        self
    }

    pub fn slice_names(&self) -> impl Iterator<Item = &str> {
        self.slices.iter().map(|(name, _)| name.as_str())
    }
}

impl Reducer<AppState> for CombinedReducer {
    fn reduce(&self, state: &AppState, action: &Action) -> AppState {
        let mut slices = state.slices.clone();
        for (name, reducer) in &self.slices {
            let current = state.slices.get(name).unwrap_or(&Value::Null);
            slices.insert(name.clone(), reducer(current, action));
        }

        AppState {
            requests: requests_reducer(&state.requests, action),
            slices,
        }
    }
}
