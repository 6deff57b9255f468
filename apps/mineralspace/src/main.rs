//! # MineralSpace - mineral reference catalog
//!
//! The main binary for MineralSpace.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                 apps/mineralspace (THE BINARY)             │
//! │                                                            │
//! │   ┌─────────┐   ┌──────────┐   ┌─────────────────────┐     │
//! │   │   CLI   │   │ HTTP API │   │  Wikidata client    │     │
//! │   │ (clap)  │   │  (axum)  │   │     (reqwest)       │     │
//! │   └────┬────┘   └────┬─────┘   └──────────┬──────────┘     │
//! │        └─────────────┼────────────────────┘                │
//! │                      ▼                                     │
//! │              ReferenceResolver                             │
//! │                      ▼                                     │
//! │             ┌──────────────────┐                           │
//! │             │ mineralspace-core│                           │
//! │             │   (THE LOGIC)    │                           │
//! │             └──────────────────┘                           │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! mineralspace serve --host 0.0.0.0 --port 8080
//! mineralspace resolve wikidata:Q43010
//! mineralspace seed -f curated.json
//! mineralspace status
//! ```

use clap::Parser;
use mineralspace::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // MINERALSPACE_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("MINERALSPACE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mineralspace=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  MineralSpace v{}
  mineral reference catalog
"#,
        env!("CARGO_PKG_VERSION")
    );
}
