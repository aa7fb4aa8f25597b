//! # tagstore - Tag Resolution Server
//!
//! Maps tags to content digests through a local cache and a durable
//! backend, propagating new tags to the backend after a delay.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 apps/tagstore (THE BINARY)                │
//! │                                                          │
//! │  ┌─────────────┐   ┌─────────────┐   ┌────────────────┐  │
//! │  │    CLI      │   │  HTTP API   │   │ Write-back     │  │
//! │  │   (clap)    │   │   (axum)    │   │ worker (tokio) │  │
//! │  └──────┬──────┘   └──────┬──────┘   └───────┬────────┘  │
//! │         └─────────────────┼──────────────────┘           │
//! │                           ▼                              │
//! │                  ┌─────────────────┐                     │
//! │                  │  tagstore-core  │                     │
//! │                  │   (THE LOGIC)   │                     │
//! │                  └─────────────────┘                     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! tagstore server --port 8080
//! tagstore put library/ubuntu:22.04 sha256:<hex> --delay-secs 30
//! tagstore get library/ubuntu:22.04
//! tagstore flush --force
//! ```

use clap::Parser;
use tagstore::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // TAGSTORE_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("TAGSTORE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tagstore=info,tagstore_core=info,tower_http=debug".into());

    // Logs go to stderr so command output stays parseable.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
