//! File Upload Manager - Entry Point
//!
//! Serves a small web file repository backed by a single directory.

use log::{error, info};

use upload_manager::Server;
use upload_manager::config::ServerConfig;
use upload_manager::error::ServerError;

#[tokio::main]
async fn main() {
    // RUST_LOG overrides the default level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Launching File Upload Manager...");

    if let Err(e) = run().await {
        error!("Server startup failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    let config = ServerConfig::load()?;
    let server = Server::new(config).await?;
    server.start().await
}
