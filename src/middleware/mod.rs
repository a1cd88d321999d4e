//! Middleware layer.
//!
//! Middleware wraps every request on its way to the routed handler and is
//! the place for cross-cutting concerns. Stages run in registration order:
//!
//! ```text
//! Router::new()
//!     .with(SetRequestId::new(logger.clone()))   ← runs first, opens the scope
//!     .with(AccessLog::new(logger.clone()))      ← runs inside that scope
//!     .on(Method::GET, "/", root)                ← end of the chain
//! ```
//!
//! A stage either hands the request on with [`Next::run`] or short-circuits
//! by returning a [`Response`] of its own.
//!
//! Built-in middleware:
//! - [`SetRequestId`]: fresh correlation id per request, bound to a
//!   [`context`](crate::context) scope around the rest of the chain
//! - [`AccessLog`]: `req:start` / `req:end` / `req:error` records with
//!   method, url, status and latency

use std::future::Future;
use std::sync::Arc;

use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

mod access_log;
mod request_id;

pub use access_log::AccessLog;
pub use request_id::SetRequestId;

/// A stage in the request chain.
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, req: Request, next: Next) -> BoxFuture;
}

pub(crate) type BoxedMiddleware = Arc<dyn Middleware>;

/// The remainder of the chain after the current stage.
pub struct Next {
    router: Arc<Router>,
    index: usize,
}

impl Next {
    pub(crate) fn new(router: Arc<Router>) -> Self {
        Self { router, index: 0 }
    }

    /// Runs the next stage, or the routed handler once the chain is
    /// exhausted.
    ///
    /// The next stage's `call` executes immediately, in the caller's
    /// context; only the returned future is deferred.
    pub fn run(self, req: Request) -> BoxFuture {
        let Self { router, index } = self;
        match router.middleware_at(index) {
            Some(stage) => stage.call(req, Next { router, index: index + 1 }),
            None => router.route(req),
        }
    }
}

/// Middleware built from an async closure.
///
/// ```rust
/// use corral::middleware::{from_fn, Next};
/// use corral::{Request, Response, Router};
/// use http::StatusCode;
///
/// let app = Router::new().with(from_fn(|req: Request, next: Next| async move {
///     if req.header("authorization").is_none() {
///         return Response::status(StatusCode::UNAUTHORIZED);
///     }
///     next.run(req).await
/// }));
/// ```
pub fn from_fn<F, Fut>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    FromFn(f)
}

/// See [`from_fn`].
pub struct FromFn<F>(F);

impl<F, Fut> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        Box::pin((self.0)(req, next))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http::{Method, StatusCode, Uri};

    use super::*;

    fn get(path: &'static str) -> Request {
        Request::new(Method::GET, Uri::from_static(path))
    }

    fn tag(order: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> impl Middleware {
        let order = Arc::clone(order);
        from_fn(move |req, next: Next| {
            order.lock().unwrap().push(name);
            next.run(req)
        })
    }

    #[tokio::test]
    async fn stages_run_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let handler_order = Arc::clone(&order);
        let app = Arc::new(
            Router::new()
                .with(tag(&order, "first"))
                .with(tag(&order, "second"))
                .on(Method::GET, "/", move |_req: Request| {
                    handler_order.lock().unwrap().push("handler");
                    async { "ok" }
                }),
        );

        let res = app.call(get("/")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "handler"]);
    }

    #[tokio::test]
    async fn stage_can_short_circuit() {
        let app = Arc::new(
            Router::new()
                .with(from_fn(|_req, _next| async { Response::status(StatusCode::FORBIDDEN) }))
                .on(Method::GET, "/", |_req: Request| async { "unreachable" }),
        );

        let res = app.call(get("/")).await;
        assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unmatched_route_still_runs_the_chain() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let app = Arc::new(Router::new().with(tag(&order, "seen")));

        let res = app.call(get("/missing")).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(*order.lock().unwrap(), vec!["seen"]);
    }
}
