use log::{error, info};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::protocol::routes;
use crate::storage::StorageManager;

pub struct Server {
    listener: TcpListener,
    storage: Arc<StorageManager>,
}

impl Server {
    /// Prepares the storage directory and binds the listener.
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let storage =
            StorageManager::open(config.storage_dir_path(), config.max_file_size_bytes()).await?;

        let socket = config.socket_addr();
        let listener = match TcpListener::bind(&socket).await {
            Ok(listener) => {
                info!("Server bound to {}", socket);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", socket, e);
                return Err(e.into());
            }
        };

        Ok(Self {
            listener,
            storage: Arc::new(storage),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn storage(&self) -> &Arc<StorageManager> {
        &self.storage
    }

    /// Serves requests until Ctrl-C.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr = self.local_addr()?;
        info!("File Upload Manager running on http://{}", addr);

        let router = routes(Arc::clone(&self.storage));
        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
