//! Error handlers
//!
//! Turns storage errors into HTML responses at the request boundary.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use log::{debug, error};

use crate::error::types::StorageError;
use crate::protocol::responses::{message_page, not_found_page};

/// Log a storage error at a level matching its cause
pub fn handle_error(err: &StorageError) {
    match err {
        StorageError::Io(_) => error!("Storage failure: {}", err),
        _ => debug!("Request rejected: {}", err),
    }
}

/// Convert a storage error to its HTTP status code
pub fn error_to_status(err: &StorageError) -> StatusCode {
    StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Response for a failed upload: the error message under its status code.
pub fn upload_error_response(err: StorageError) -> Response {
    handle_error(&err);
    let message = match &err {
        StorageError::Io(_) => "Upload failed, please try again.".to_string(),
        other => other.to_string(),
    };
    (error_to_status(&err), Html(message_page(&message))).into_response()
}

/// Response for a failed download or delete.
///
/// Unknown and invalid names both render the not-found page.
pub fn lookup_error_response(err: StorageError) -> Response {
    handle_error(&err);
    match err {
        StorageError::NotFound(_) | StorageError::InvalidName(_) => {
            (StatusCode::NOT_FOUND, Html(not_found_page())).into_response()
        }
        other => (
            error_to_status(&other),
            Html(message_page("Something went wrong reading the file.")),
        )
            .into_response(),
    }
}
