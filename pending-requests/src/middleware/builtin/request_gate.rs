//! Request gate - Drops begin actions for URLs that already have a request in flight
//!
//! Completions always pass. A begin action is checked against the pending set
//! as currently committed in the store, read through the configured selector.

use pending_requests_types::Action;
use std::sync::Arc;

use crate::middleware::pipeline::Next;
use crate::middleware::types::{DispatchResult, Stage, StagePriority};
use crate::store::{select_requests, AppState, PendingSet, StoreView};

/// Locates the pending set inside the root state
pub type Selector<S> = Arc<dyn Fn(&S) -> &PendingSet + Send + Sync>;

/// What the gate decided for one action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Forward the action unchanged
    PassThrough,
    /// Drop the action; a request for its URL is pending
    Suppressed,
}

/// Stage that enforces at most one in-flight request per URL
pub struct RequestGate<S> {
    selector: Selector<S>,
}

impl RequestGate<AppState> {
    /// Gate reading the `requests` slice of [`AppState`]
    pub fn new() -> Self {
        Self::with_selector(select_requests)
    }
}

impl Default for RequestGate<AppState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> RequestGate<S> {
    /// Gate reading the pending set wherever `selector` finds it
    pub fn with_selector<F>(selector: F) -> Self
    where
        F: Fn(&S) -> &PendingSet + Send + Sync + 'static,
    {
        Self {
            selector: Arc::new(selector),
        }
    }

    /// Decide whether `action` may proceed
    ///
    /// The store is only read for begin actions, and only at call time.
    pub fn intercept(&self, action: &Action, store: StoreView<'_, S>) -> GateDecision {
        let Some(tag) = action.request_tag() else {
            return GateDecision::PassThrough;
        };
        if tag.done {
            return GateDecision::PassThrough;
        }

        let state = store.get_state();
        if (self.selector)(&*state).contains(&tag.url) {
            GateDecision::Suppressed
        } else {
            GateDecision::PassThrough
        }
    }
}

impl<S> Stage<S> for RequestGate<S> {
    fn id(&self) -> &str {
        "builtin.request_gate"
    }

    fn name(&self) -> &str {
        "Request Gate"
    }

    fn description(&self) -> &str {
        "Suppresses begin actions for URLs that already have a pending request"
    }

    fn priority(&self) -> StagePriority {
        StagePriority::High
    }

    fn handle(&self, action: Action, store: StoreView<'_, S>, next: Next<'_, S>) -> DispatchResult {
        match self.intercept(&action, store) {
            GateDecision::PassThrough => next.run(action),
            GateDecision::Suppressed => {
                log::debug!(
                    "[GATE] Suppressed {}: request already in flight for {}",
                    action.kind,
                    action.request_tag().map(|t| t.url).unwrap_or_default()
                );
                DispatchResult::Suppressed
            }
        }
    }
}
