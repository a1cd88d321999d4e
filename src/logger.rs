//! Structured JSON-line logger with correlation ids.
//!
//! Every call produces exactly one line on the configured [`Sink`]:
//!
//! ```text
//! {"requestId":"0b5c…","level":"INFO","message":"req:start","meta":{…}}
//! ```
//!
//! `requestId` is read from the ambient [`context`](crate::context) and is
//! always present: `null` when logging outside a request scope. `meta` is
//! omitted when the caller passes none.
//!
//! Logging is a side channel. Nothing here can fail the caller: a `meta`
//! value that refuses to serialize produces a degraded record carrying a
//! `metaError` field instead.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::context::{self, RequestId};
use crate::sink::{Sink, StdoutSink};

/// Severity of a log record.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Debug,
    Info,
    Error,
}

#[derive(Serialize)]
struct Record<'a> {
    #[serde(rename = "requestId")]
    request_id: Option<&'a RequestId>,
    level: Level,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<Value>,
    #[serde(rename = "metaError", skip_serializing_if = "Option::is_none")]
    meta_error: Option<String>,
}

/// Handle to the structured logger. Cheap to clone; clones share the sink.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn Sink>,
}

impl Logger {
    pub fn new(sink: impl Sink) -> Self {
        Self { sink: Arc::new(sink) }
    }

    /// Logger writing to standard output.
    pub fn stdout() -> Self {
        Self::new(StdoutSink)
    }

    pub fn log(&self, level: Level, message: &str) {
        self.emit(level, message, None);
    }

    pub fn log_with<M>(&self, level: Level, message: &str, meta: &M)
    where
        M: Serialize + ?Sized,
    {
        self.emit(level, message, Some(serde_json::to_value(meta)));
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    pub fn info_with<M: Serialize + ?Sized>(&self, message: &str, meta: &M) {
        self.log_with(Level::Info, message, meta);
    }

    pub fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }

    pub fn error_with<M: Serialize + ?Sized>(&self, message: &str, meta: &M) {
        self.log_with(Level::Error, message, meta);
    }

    fn emit(&self, level: Level, message: &str, meta: Option<serde_json::Result<Value>>) {
        let request_id = context::current_request_id();

        let (meta, meta_error) = match meta {
            None => (None, None),
            Some(Ok(value)) => (Some(value), None),
            Some(Err(e)) => {
                tracing::warn!(log_message = message, "log meta not serializable: {e}");
                (None, Some(e.to_string()))
            }
        };

        let record = Record {
            request_id: request_id.as_ref(),
            level,
            message,
            meta,
            meta_error,
        };

        let line = serde_json::to_string(&record).unwrap_or_else(|e| {
            tracing::warn!(log_message = message, "log record not serializable: {e}");
            format!(
                r#"{{"requestId":{},"level":{},"message":{}}}"#,
                serde_json::to_string(&record.request_id).unwrap_or_else(|_| "null".into()),
                serde_json::to_string(&level).unwrap_or_else(|_| r#""ERROR""#.into()),
                serde_json::to_string(message).unwrap_or_else(|_| r#""""#.into()),
            )
        });

        self.sink.write_line(&line);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::stdout()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde::ser::Error as _;
    use serde_json::json;

    use super::*;
    use crate::context::Context;
    use crate::sink::MemorySink;

    fn logger() -> (Logger, MemorySink) {
        let sink = MemorySink::new();
        (Logger::new(sink.clone()), sink)
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cannot serialize this"))
        }
    }

    #[test]
    fn outside_scope_request_id_is_null() {
        let (logger, sink) = logger();
        logger.info("hello");

        assert_eq!(sink.lines(), vec![r#"{"requestId":null,"level":"INFO","message":"hello"}"#]);
    }

    #[test]
    fn inside_scope_request_id_is_injected() {
        let (logger, sink) = logger();
        let ctx = Context::new(RequestId::from("abc"));
        context::sync_scope(ctx, || logger.debug("generate requestId"));

        assert_eq!(
            sink.records(),
            vec![json!({"requestId": "abc", "level": "DEBUG", "message": "generate requestId"})]
        );
    }

    #[test]
    fn meta_is_merged_as_top_level_field() {
        let (logger, sink) = logger();
        logger.log_with(Level::Error, "req:error", &json!({"error": "reset"}));

        let record = &sink.records()[0];
        assert_eq!(record["level"], "ERROR");
        assert_eq!(record["meta"], json!({"error": "reset"}));
        assert!(record.get("metaError").is_none());
    }

    #[test]
    fn unserializable_meta_degrades_instead_of_failing() {
        let (logger, sink) = logger();
        logger.info_with("still logged", &Unserializable);

        let record = &sink.records()[0];
        assert_eq!(record["message"], "still logged");
        assert!(record.get("meta").is_none());
        assert_eq!(record["metaError"], "cannot serialize this");
    }

    #[test]
    fn one_line_per_call_even_with_newlines_in_message() {
        let (logger, sink) = logger();
        logger.info("two\nlines");

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(!lines[0].contains('\n'));
    }
}
