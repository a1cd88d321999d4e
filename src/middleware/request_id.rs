use crate::context::{self, Context, RequestId};
use crate::handler::BoxFuture;
use crate::logger::Logger;
use crate::request::Request;

use super::{Middleware, Next};

/// Assigns every request a fresh [`RequestId`] and runs the rest of the
/// chain inside a [`context`] scope bound to it.
///
/// Register it before any stage that logs or reads the id. Everything
/// downstream, across all of its `.await` points, sees the id through
/// [`context::current`]. Work that outlives the chain (lifecycle
/// observers, spawned tasks) must capture the scope with
/// [`context::bind`] or [`context::spawn`].
#[derive(Clone, Debug)]
pub struct SetRequestId {
    logger: Logger,
}

impl SetRequestId {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl Middleware for SetRequestId {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let logger = self.logger.clone();
        let ctx = Context::new(RequestId::new());

        Box::pin(context::scope(ctx, async move {
            logger.debug("generate requestId");
            next.run(req).await
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::{Method, Uri};

    use super::*;
    use crate::response::Json;
    use crate::router::Router;
    use crate::sink::MemorySink;

    #[tokio::test]
    async fn handler_sees_the_id_that_was_logged() {
        let sink = MemorySink::new();
        let app = Arc::new(
            Router::new()
                .with(SetRequestId::new(Logger::new(sink.clone())))
                .on(Method::GET, "/", |_req: Request| async {
                    Json(context::current_request_id())
                }),
        );

        let res = app.call(Request::new(Method::GET, Uri::from_static("/"))).await;
        let body: Option<String> = serde_json::from_slice(res.body()).unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["level"], "DEBUG");
        assert_eq!(records[0]["message"], "generate requestId");
        assert_eq!(records[0]["requestId"].as_str(), body.as_deref());
        assert!(body.is_some());
    }

    #[tokio::test]
    async fn scope_ends_with_the_chain() {
        let app = Arc::new(
            Router::new()
                .with(SetRequestId::new(Logger::new(MemorySink::new())))
                .on(Method::GET, "/", |_req: Request| async { "ok" }),
        );

        app.call(Request::new(Method::GET, Uri::from_static("/"))).await;
        assert!(context::current().is_none());
    }
}
