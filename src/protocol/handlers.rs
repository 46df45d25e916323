//! Request handlers
//!
//! Each handler calls exactly one storage operation and renders the result.
//! Names from the URL are passed to the storage manager unchecked; it owns
//! validation.

use std::io;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use futures_util::TryStreamExt;
use log::warn;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::error::handlers::{handle_error, lookup_error_response, upload_error_response};
use crate::protocol::responses::{index_page, message_page};
use crate::storage::StorageManager;

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "file";

/// GET / — upload form and listing.
pub async fn handle_index(State(storage): State<Arc<StorageManager>>) -> Response {
    match storage.entries().await {
        Ok(files) => Html(index_page(&files)).into_response(),
        Err(e) => {
            handle_error(&e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(message_page("Could not read the file list.")),
            )
                .into_response()
        }
    }
}

/// POST /upload — stores the first `file` field, then back to the listing.
pub async fn handle_upload(
    State(storage): State<Arc<StorageManager>>,
    mut multipart: Multipart,
) -> Response {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Malformed upload: {}", e);
                return bad_request(&e.body_text());
            }
        };

        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        // Browsers send an empty file name when nothing was picked.
        let original_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => break,
        };

        let reader = StreamReader::new(field.map_err(io::Error::other));
        return match storage.accept(reader, &original_name).await {
            Ok(_) => Redirect::to("/").into_response(),
            Err(e) => upload_error_response(e),
        };
    }

    bad_request("No file provided")
}

/// GET /download/:filename — stream as an attachment.
pub async fn handle_download(
    State(storage): State<Arc<StorageManager>>,
    Path(filename): Path<String>,
) -> Response {
    serve_file(&storage, &filename, "attachment").await
}

/// GET /uploads/:filename — stream for display in the browser.
pub async fn handle_view(
    State(storage): State<Arc<StorageManager>>,
    Path(filename): Path<String>,
) -> Response {
    serve_file(&storage, &filename, "inline").await
}

/// GET|POST /delete/:filename — remove, then back to the listing.
pub async fn handle_delete(
    State(storage): State<Arc<StorageManager>>,
    Path(filename): Path<String>,
) -> Response {
    match storage.remove(&filename).await {
        Ok(()) => Redirect::to("/").into_response(),
        Err(e) => lookup_error_response(e),
    }
}

async fn serve_file(storage: &StorageManager, name: &str, disposition: &str) -> Response {
    let (file, stored) = match storage.open_file(name).await {
        Ok(opened) => opened,
        Err(e) => return lookup_error_response(e),
    };

    let mime = mime_guess::from_path(&stored.name).first_or_octet_stream();
    let headers = [
        (header::CONTENT_TYPE, mime.essence_str().to_string()),
        (header::CONTENT_LENGTH, stored.size.to_string()),
        (
            header::CONTENT_DISPOSITION,
            content_disposition(disposition, &stored.name),
        ),
    ];

    (headers, Body::from_stream(ReaderStream::new(file))).into_response()
}

/// `Content-Disposition` value with an ASCII fallback and an RFC 5987
/// encoded UTF-8 file name.
pub fn content_disposition(disposition: &str, name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "{disposition}; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(name)
    )
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Html(message_page(message))).into_response()
}
