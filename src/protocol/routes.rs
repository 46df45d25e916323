//! Route table

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};

use crate::middleware::logging::log_request;
use crate::protocol::handlers::{
    handle_delete, handle_download, handle_index, handle_upload, handle_view,
};
use crate::storage::StorageManager;

/// Builds the application router around a shared storage manager.
pub fn routes(storage: Arc<StorageManager>) -> Router {
    Router::new()
        .route("/", get(handle_index))
        // Size is enforced by the storage manager while streaming.
        .route(
            "/upload",
            post(handle_upload).layer(DefaultBodyLimit::disable()),
        )
        .route("/download/:filename", get(handle_download))
        .route("/uploads/:filename", get(handle_view))
        .route("/delete/:filename", get(handle_delete).post(handle_delete))
        .layer(middleware::from_fn(log_request))
        .with_state(storage)
}
