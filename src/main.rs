//! corral demo server.
//!
//! Run with:
//!   RUST_LOG=info cargo run
//!
//! Try:
//!   curl http://localhost:3000/
//!
//! Access log records go to stdout as JSON lines; server diagnostics go to
//! stderr through `tracing`.

use std::process::ExitCode;

use clap::Parser;
use corral::middleware::{AccessLog, SetRequestId};
use corral::{Json, Logger, Request, Router, Server, context};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "corral", version, about = "Correlated access-logging demo server")]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "CORRAL_ADDR", default_value = "0.0.0.0:3000")]
    addr: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let logger = Logger::stdout();

    let root_logger = logger.clone();
    let app = Router::new()
        .with(SetRequestId::new(logger.clone()))
        .with(AccessLog::new(logger))
        .get("/", move |req: Request| root(root_logger.clone(), req));

    match Server::bind(cli.addr).serve(app).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("server failed: {e}");
            ExitCode::FAILURE
        }
    }
}

// GET / → {"requestId": "<uuid>"}
async fn root(logger: Logger, _req: Request) -> Json<Value> {
    let request_id = context::current_request_id();
    logger.info("got request with /");
    Json(json!({ "requestId": request_id }))
}
