//! # corral
//!
//! Request correlation ids and structured access logging for a minimal
//! hyper-based HTTP framework.
//!
//! Every request gets a fresh id. Every log line written while that request
//! is being handled carries it, without the id being passed around: the id
//! lives in a task-local [`context`] scope that follows the request across
//! `.await` points, and lifecycle observers that fire after the handler has
//! returned are explicitly bound back into it.
//!
//! ```text
//! request ─▶ SetRequestId ─▶ AccessLog ─▶ handler
//!            opens scope      req:start     reads context::current()
//!            "generate        registers
//!             requestId"      observers ─────────▶ req:end / req:error
//!                                                  (fired by the connection,
//!                                                   logged inside the scope)
//! ```
//!
//! Log records are JSON lines on stdout:
//!
//! ```text
//! {"requestId":"6f1c…","level":"DEBUG","message":"generate requestId"}
//! {"requestId":"6f1c…","level":"INFO","message":"req:start","meta":{"req":{"method":"GET","url":"/"}}}
//! {"requestId":"6f1c…","level":"INFO","message":"req:end","meta":{"res":{"statusCode":200},"responseTime":0}}
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use corral::middleware::{AccessLog, SetRequestId};
//! use corral::{context, Json, Logger, Request, Router, Server};
//! use serde_json::{json, Value};
//!
//! #[tokio::main]
//! async fn main() {
//!     let logger = Logger::stdout();
//!
//!     let app = Router::new()
//!         .with(SetRequestId::new(logger.clone()))
//!         .with(AccessLog::new(logger.clone()))
//!         .get("/", root);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn root(_req: Request) -> Json<Value> {
//!     Json(json!({ "requestId": context::current_request_id() }))
//! }
//! ```

mod error;
mod handler;
mod lifecycle;
mod logger;
mod request;
mod response;
mod router;
mod server;
mod sink;

pub mod context;
pub mod middleware;

pub use error::Error;
pub use handler::{BoxFuture, Handler};
pub use lifecycle::{Failure, Finished, Lifecycle};
pub use logger::{Level, Logger};
pub use request::Request;
pub use response::{IntoResponse, Json, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use sink::{MemorySink, Sink, StdoutSink};
