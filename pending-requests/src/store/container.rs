//! State container
//!
//! Owns the application state, the root reducer and the stage pipeline.
//! Dispatch is serialized: the dispatch lock is held from the first stage
//! through the reducer commit, so every stage decides against the most
//! recently committed state.

use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use pending_requests_types::Action;

use crate::middleware::{DispatchResult, Pipeline};

/// Pure state transition: `(state, action) -> state`
pub trait Reducer<S>: Send + Sync {
    fn reduce(&self, state: &S, action: &Action) -> S;
}

impl<S, F> Reducer<S> for F
where
    F: Fn(&S, &Action) -> S + Send + Sync,
{
    fn reduce(&self, state: &S, action: &Action) -> S {
        self(state, action)
    }
}

/// Read access to a store's committed state, handed to each stage
pub struct StoreView<'a, S> {
    state: &'a RwLock<S>,
}

impl<'a, S> StoreView<'a, S> {
    pub fn new(state: &'a RwLock<S>) -> Self {
        Self { state }
    }

    /// Current committed state. Drop the guard before forwarding the action.
    pub fn get_state(&self) -> RwLockReadGuard<'a, S> {
        self.state.read()
    }
}

impl<S> Clone for StoreView<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for StoreView<'_, S> {}

/// An explicit, shareable state container
pub struct Store<S> {
    state: RwLock<S>,
    reducer: Box<dyn Reducer<S>>,
    pipeline: Pipeline<S>,
    dispatch_lock: Mutex<()>,
}

impl<S> Store<S> {
    /// Create a store with an empty pipeline
    pub fn new(initial: S, reducer: impl Reducer<S> + 'static) -> Self {
        Self::with_pipeline(initial, reducer, Pipeline::new())
    }

    pub fn with_pipeline(initial: S, reducer: impl Reducer<S> + 'static, pipeline: Pipeline<S>) -> Self {
        Self {
            state: RwLock::new(initial),
            reducer: Box::new(reducer),
            pipeline,
            dispatch_lock: Mutex::new(()),
        }
    }

    /// The stage pipeline, for registering and configuring stages
    pub fn pipeline(&self) -> &Pipeline<S> {
        &self.pipeline
    }

    pub fn get_state(&self) -> RwLockReadGuard<'_, S> {
        self.state.read()
    }

    pub fn view(&self) -> StoreView<'_, S> {
        StoreView::new(&self.state)
    }

    /// Run `action` through the pipeline and commit it if no stage stopped it
    pub fn dispatch(&self, action: Action) -> DispatchResult {
        let _serial = self.dispatch_lock.lock();

        let commit = |action: Action| {
            let mut state = self.state.write();
            let next = self.reducer.reduce(&state, &action);
            *state = next;
            action
        };

        self.pipeline.run(action, self.view(), &commit)
    }
}

impl<S: Clone> Store<S> {
    /// Owned copy of the current state
    pub fn snapshot(&self) -> S {
        self.state.read().clone()
    }
}
