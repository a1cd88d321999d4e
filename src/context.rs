//! Request-scoped correlation context.
//!
//! Every request gets a [`Context`] carrying its [`RequestId`]. The context
//! lives in a tokio task-local slot, so any code running inside
//! [`scope`] can read it with [`current`] without the id being threaded
//! through function signatures.
//!
//! # How the scope follows a request
//!
//! ```text
//! scope(ctx, fut)                 ← ctx visible across every .await in fut
//!   ├─ nested scope(inner, ..)    ← shadows ctx, restored on exit
//!   ├─ context::spawn(task)       ← new task, inherits ctx explicitly
//!   └─ lifecycle.on_finish(bind(cb))
//!                                 ← cb re-enters ctx whenever it fires,
//!                                   on whichever task or thread
//! ```
//!
//! Task-locals belong to the future, not the thread. Two requests polled in
//! turn on the same worker thread each see their own value, and a request
//! whose future migrates between worker threads keeps its value.
//!
//! A plain `tokio::spawn` does **not** inherit the context. Work that must
//! stay correlated goes through [`spawn`], [`bind_future`] or [`bind`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use uuid::Uuid;

tokio::task_local! {
    static CURRENT: Option<Context>;
}

// ── RequestId ─────────────────────────────────────────────────────────────────

/// Correlation identifier of a single request.
///
/// Generated once from a random UUID v4 and never mutated afterwards.
/// Cloning is one atomic increment.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(Arc<str>);

// Serialized as the bare id string.
impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl RequestId {
    /// A fresh, random identifier (122 bits of entropy).
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string().into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

// ── Context ───────────────────────────────────────────────────────────────────

/// The value bound to a correlation scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Context {
    request_id: RequestId,
}

impl Context {
    pub fn new(request_id: RequestId) -> Self {
        Self { request_id }
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }
}

// ── Scopes ────────────────────────────────────────────────────────────────────

/// Runs `fut` with `ctx` as the current context, across all of its
/// suspension points.
pub async fn scope<F>(ctx: Context, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT.scope(Some(ctx), fut).await
}

/// Runs the closure `f` synchronously with `ctx` as the current context.
pub fn sync_scope<R>(ctx: Context, f: impl FnOnce() -> R) -> R {
    CURRENT.sync_scope(Some(ctx), f)
}

/// The context of the scope the caller is running in, if any.
///
/// Never panics: outside any scope, or inside a task spawned without
/// inheriting one, this is `None`.
pub fn current() -> Option<Context> {
    CURRENT.try_with(Option::clone).ok().flatten()
}

/// Shorthand for `current().map(|c| c.request_id().clone())`.
pub fn current_request_id() -> Option<RequestId> {
    CURRENT
        .try_with(|c| c.as_ref().map(|c| c.request_id.clone()))
        .ok()
        .flatten()
}

// ── Continuation binding ──────────────────────────────────────────────────────

/// Captures the current scope and returns a closure that re-enters it.
///
/// Use this for callbacks registered now and invoked later from somewhere
/// that knows nothing about the request, such as response lifecycle
/// observers. A closure bound outside any scope runs outside any scope,
/// even when invoked from inside one.
pub fn bind<A, R, F>(f: F) -> impl FnOnce(A) -> R + Send + 'static
where
    A: 'static,
    R: 'static,
    F: FnOnce(A) -> R + Send + 'static,
{
    let captured = current();
    move |arg| CURRENT.sync_scope(captured, || f(arg))
}

/// Captures the current scope and attaches it to `fut`.
pub fn bind_future<F>(fut: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    CURRENT.scope(current(), fut)
}

/// `tokio::spawn`, except the new task inherits the caller's scope.
pub fn spawn<F>(fut: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(bind_future(fut))
}
