//! Prisma AI chat server
//!
//! Entry point: loads configuration, initializes logging and serves the UI.

use std::sync::Arc;

use dotenvy::dotenv;
use mimalloc::MiMalloc;

use prisma_chat::config::AppConfig;
use prisma_chat::{server, telemetry};

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    telemetry::init(config.logging.json);

    server::start_server(Arc::new(config)).await
}
