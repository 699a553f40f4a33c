//! Request lifecycle helpers
//!
//! Wraps one asynchronous request in its begin / success / failure actions,
//! tagging each with `meta.httpRequest` so the request gate and the pending
//! request reducer can track it.
//!
//! ## Flow
//! 1. The begin action is tagged `{url, done: false}` and dispatched
//! 2. If the dispatch was suppressed the request is already in flight: stop
//! 3. Otherwise the request runs, and exactly one of success or failure is
//!    dispatched tagged `{url, done: true}`
//!
//! Transport errors never escape; they become the failure action. A lifecycle
//! dropped between begin and terminal (its future cancelled, or `perform`
//! panicking) dispatches a [`REQUEST_ABANDONED`] action tagged done so the url
//! does not stay pending.

use async_trait::async_trait;
use pending_requests_types::{Action, RequestTag};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::middleware::DispatchResult;
use crate::store::Store;

/// Type of the terminal action dispatched for a lifecycle dropped before it
/// finished
pub const REQUEST_ABANDONED: &str = "REQUEST_ABANDONED";

/// Anything that accepts an action and reports what happened to it
pub trait Dispatch {
    fn dispatch(&self, action: Action) -> DispatchResult;
}

impl<S> Dispatch for Store<S> {
    fn dispatch(&self, action: Action) -> DispatchResult {
        Store::dispatch(self, action)
    }
}

impl<F> Dispatch for F
where
    F: Fn(Action) -> DispatchResult,
{
    fn dispatch(&self, action: Action) -> DispatchResult {
        self(action)
    }
}

/// Builds the three actions of one request lifecycle
///
/// Builders return plain actions; the request tag is attached afterwards.
pub trait RequestActions {
    type Response;
    type Error;

    fn begin(&self) -> Action;

    fn success(&self, response: Self::Response) -> Action;

    fn failure(&self, error: Self::Error) -> Action;
}

/// [`RequestActions`] from three closures
pub struct ActionBuilders<B, Su, F, R, E> {
    begin: B,
    success: Su,
    failure: F,
    _types: PhantomData<fn(R, E)>,
}

impl<B, Su, F, R, E> ActionBuilders<B, Su, F, R, E>
where
    B: Fn() -> Action,
    Su: Fn(R) -> Action,
    F: Fn(E) -> Action,
{
    pub fn new(begin: B, success: Su, failure: F) -> Self {
        Self {
            begin,
            success,
            failure,
            _types: PhantomData,
        }
    }
}

impl<B, Su, F, R, E> RequestActions for ActionBuilders<B, Su, F, R, E>
where
    B: Fn() -> Action,
    Su: Fn(R) -> Action,
    F: Fn(E) -> Action,
{
    type Response = R;
    type Error = E;

    fn begin(&self) -> Action {
        (self.begin)()
    }

    fn success(&self, response: R) -> Action {
        (self.success)(response)
    }

    fn failure(&self, error: E) -> Action {
        (self.failure)(error)
    }
}

/// A transport that fetches the tracked url itself
#[async_trait]
pub trait RequestTransport: Send + Sync {
    type Response: Send + 'static;
    type Error: Send + 'static;

    async fn perform(&self, url: &str) -> Result<Self::Response, Self::Error>;
}

/// A request whose begin action was accepted and whose terminal action is
/// still owed
#[must_use = "an in-flight request stays pending until finished"]
#[derive(Debug)]
pub struct InFlightRequest {
    url: String,
}

impl InFlightRequest {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Dispatch the success or failure action for `outcome`
    pub fn finish<A, D>(
        self,
        outcome: Result<A::Response, A::Error>,
        actions: &A,
        dispatch: &D,
    ) -> DispatchResult
    where
        A: RequestActions + ?Sized,
        D: Dispatch + ?Sized,
    {
        let (action, label) = match outcome {
            Ok(response) => (actions.success(response), "success"),
            Err(error) => (actions.failure(error), "failure"),
        };

        let result = dispatch.dispatch(action.with_request_tag(RequestTag::done(&self.url)));
        if result.is_suppressed() {
            log::warn!("[REQUEST] Terminal {} action for {} was suppressed", label, self.url);
        } else {
            log::debug!("[REQUEST] Finished {} ({})", self.url, label);
        }
        result
    }

    /// Dispatch a bare [`REQUEST_ABANDONED`] terminal action, releasing the url
    /// without a success or failure
    pub fn abandon<D>(self, dispatch: &D) -> DispatchResult
    where
        D: Dispatch + ?Sized,
    {
        log::warn!("[REQUEST] Abandoned {} before it finished", self.url);
        dispatch.dispatch(Action::new(REQUEST_ABANDONED).with_request_tag(RequestTag::done(&self.url)))
    }
}

/// Abandons the request if dropped while still holding it
struct AbandonGuard<'a, D: Dispatch + ?Sized> {
    request: Option<InFlightRequest>,
    dispatch: &'a D,
}

impl<D: Dispatch + ?Sized> Drop for AbandonGuard<'_, D> {
    fn drop(&mut self) {
        if let Some(request) = self.request.take() {
            let _ = request.abandon(self.dispatch);
        }
    }
}

/// Run `perform` for an accepted request and dispatch its terminal action
async fn complete<A, D, F, Fut>(request: InFlightRequest, actions: &A, perform: F, dispatch: &D)
where
    A: RequestActions + ?Sized,
    D: Dispatch + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<A::Response, A::Error>>,
{
    let mut guard = AbandonGuard {
        request: Some(request),
        dispatch,
    };

    let outcome = perform().await;
    if let Some(request) = guard.request.take() {
        let _ = request.finish(outcome, actions, dispatch);
    }
}

/// Dispatch the begin action for `url`
///
/// Returns `None` when the dispatch was suppressed, meaning a request for
/// `url` is already in flight and this one must not be issued.
pub fn begin_request<A, D>(url: &str, actions: &A, dispatch: &D) -> Option<InFlightRequest>
where
    A: RequestActions + ?Sized,
    D: Dispatch + ?Sized,
{
    let begin = actions.begin().with_request_tag(RequestTag::begin(url));
    if dispatch.dispatch(begin).is_suppressed() {
        log::debug!("[REQUEST] Skipped {}: already in flight", url);
        return None;
    }

    log::debug!("[REQUEST] Started {}", url);
    Some(InFlightRequest {
        url: url.to_string(),
    })
}

/// Run one request lifecycle to completion
///
/// The begin action is dispatched when this future is first polled. If it is
/// suppressed, `perform` is never called. Dropping the future after the begin
/// was accepted dispatches [`REQUEST_ABANDONED`] for `url`.
pub async fn attempt_request<A, D, F, Fut>(url: &str, actions: &A, perform: F, dispatch: &D)
where
    A: RequestActions + ?Sized,
    D: Dispatch + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<A::Response, A::Error>>,
{
    let Some(request) = begin_request(url, actions, dispatch) else {
        return;
    };

    complete(request, actions, perform, dispatch).await;
}

/// Fire-and-forget variant of [`attempt_request`]
///
/// The begin action is dispatched before this function returns, so a second
/// call for the same url right after it is already suppressed. The rest of
/// the lifecycle runs on a spawned tokio task. Returns `None` when the begin
/// was suppressed; the handle is only needed by callers that want to wait.
///
/// Outside a tokio runtime nothing is dispatched and `None` is returned.
pub fn spawn_request<A, D, F, Fut>(
    url: impl Into<String>,
    actions: Arc<A>,
    perform: F,
    dispatch: Arc<D>,
) -> Option<JoinHandle<()>>
where
    A: RequestActions + Send + Sync + 'static,
    A::Response: Send + 'static,
    A::Error: Send + 'static,
    D: Dispatch + Send + Sync + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<A::Response, A::Error>> + Send + 'static,
{
    let url = url.into();
    let runtime = match Handle::try_current() {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("[REQUEST] Cannot start {}: {}", url, e);
            return None;
        }
    };

    let request = begin_request(&url, actions.as_ref(), dispatch.as_ref())?;

    Some(runtime.spawn(async move {
        complete(request, actions.as_ref(), perform, dispatch.as_ref()).await;
    }))
}

/// [`spawn_request`] with a transport that fetches `url` itself
pub fn spawn_transport_request<A, T, D>(
    url: impl Into<String>,
    actions: Arc<A>,
    transport: Arc<T>,
    dispatch: Arc<D>,
) -> Option<JoinHandle<()>>
where
    A: RequestActions<Response = T::Response, Error = T::Error> + Send + Sync + 'static,
    T: RequestTransport + 'static,
    D: Dispatch + Send + Sync + 'static,
{
    let url = url.into();
    let target = url.clone();
    spawn_request(
        url,
        actions,
        move || async move { transport.perform(&target).await },
        dispatch,
    )
}
