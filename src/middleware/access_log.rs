use std::time::Instant;

use serde::Serialize;

use crate::context;
use crate::handler::BoxFuture;
use crate::lifecycle::{Failure, Finished};
use crate::logger::Logger;
use crate::request::Request;

use super::{Middleware, Next};

#[derive(Serialize)]
struct StartMeta<'a> {
    req: ReqMeta<'a>,
}

#[derive(Serialize)]
struct ReqMeta<'a> {
    method: &'a str,
    url: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EndMeta {
    res: ResMeta,
    response_time: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResMeta {
    status_code: u16,
}

#[derive(Serialize)]
struct ErrorMeta<'a> {
    error: &'a str,
}

/// Access log: one record when a request arrives and one when its response
/// finishes or fails.
///
/// | message | level | meta |
/// |---|---|---|
/// | `req:start` | INFO | `{"req":{"method","url"}}` |
/// | `req:end` | INFO | `{"res":{"statusCode"},"responseTime":<ms>}` |
/// | `req:error` | ERROR | `{"error":"<reason>"}` |
///
/// The terminal records come from lifecycle observers, which fire after the
/// chain has returned. They are bound to the scope active when the request
/// arrived, so they carry the same `requestId` as `req:start`.
#[derive(Clone, Debug)]
pub struct AccessLog {
    logger: Logger,
}

impl AccessLog {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl Middleware for AccessLog {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let started = Instant::now();

        self.logger.info_with(
            "req:start",
            &StartMeta { req: ReqMeta { method: req.method().as_str(), url: req.url() } },
        );

        let logger = self.logger.clone();
        req.lifecycle().on_finish(context::bind(move |finished: Finished| {
            let response_time = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            logger.info_with(
                "req:end",
                &EndMeta { res: ResMeta { status_code: finished.status.as_u16() }, response_time },
            );
        }));

        let logger = self.logger.clone();
        req.lifecycle().on_error(context::bind(move |failure: Failure| {
            logger.error_with("req:error", &ErrorMeta { error: &failure.reason });
        }));

        next.run(req)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::{Method, StatusCode, Uri};
    use serde_json::json;

    use super::*;
    use crate::context::{Context, RequestId};
    use crate::router::Router;
    use crate::sink::MemorySink;

    fn app(sink: &MemorySink) -> Arc<Router> {
        Arc::new(
            Router::new()
                .with(AccessLog::new(Logger::new(sink.clone())))
                .on(Method::POST, "/items", |_req: Request| async { StatusCode::CREATED }),
        )
    }

    #[tokio::test]
    async fn start_is_logged_before_the_response_and_end_on_finish() {
        let sink = MemorySink::new();
        let req = Request::new(Method::POST, Uri::from_static("/items?draft=1"));
        let lifecycle = req.lifecycle().clone();

        let res = app(&sink).call(req).await;
        assert_eq!(res.status_code(), StatusCode::CREATED);
        assert_eq!(
            sink.records(),
            vec![json!({
                "requestId": null,
                "level": "INFO",
                "message": "req:start",
                "meta": {"req": {"method": "POST", "url": "/items?draft=1"}},
            })]
        );

        lifecycle.emit_finish(Finished { status: res.status_code() });
        let end = &sink.records()[1];
        assert_eq!(end["message"], "req:end");
        assert_eq!(end["meta"]["res"]["statusCode"], 201);
        assert!(end["meta"]["responseTime"].as_u64().is_some());
    }

    #[tokio::test]
    async fn observers_log_with_the_registering_scope() {
        let sink = MemorySink::new();
        let req = Request::new(Method::POST, Uri::from_static("/items"));
        let lifecycle = req.lifecycle().clone();

        let ctx = Context::new(RequestId::from("req-1"));
        let app = app(&sink);
        context::scope(ctx, async move { app.call(req).await }).await;

        // Fired from outside any scope, as the connection task would.
        lifecycle.emit_error(Failure::new("connection reset"));

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["requestId"], "req-1");
        assert_eq!(records[1]["level"], "ERROR");
        assert_eq!(records[1]["message"], "req:error");
        assert_eq!(records[1]["meta"], json!({"error": "connection reset"}));
    }
}
