//! Stored name generation
//!
//! Turns a client-supplied original name into the on-disk stored name:
//! `<token>-<sanitized original name>`.

use std::path::Path;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

use regex::Regex;

use crate::error::StorageError;
use crate::storage::validation::validate_stored_name;

/// Extensions accepted by `accept()`, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: [&str; 7] = ["pdf", "png", "jpg", "jpeg", "gif", "docx", "txt"];

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static DOT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.{2,}").unwrap());

/// Returns the lowercase extension of `original_name` if it is allow-listed.
///
/// The extension is the text after the last `.` of the final path component.
/// A name whose only dot is the leading one (`.txt`) has no extension.
pub fn allowed_extension(original_name: &str) -> Result<String, StorageError> {
    let ext = Path::new(base_name(original_name))
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(StorageError::UnsupportedType(if ext.is_empty() {
            original_name.to_string()
        } else {
            ext
        }))
    }
}

/// Sanitizes an original name so it can be embedded in a stored name.
///
/// Keeps the final path component, replaces each whitespace run with `_`
/// and collapses dot runs to a single `.`.
pub fn sanitize_original_name(original_name: &str) -> String {
    let base = base_name(original_name);
    let underscored = WHITESPACE_RUN.replace_all(base, "_");
    DOT_RUN.replace_all(&underscored, ".").into_owned()
}

/// Builds the stored name for `original_name` using `token` as prefix.
pub fn stored_name(token: u64, original_name: &str) -> Result<String, StorageError> {
    let name = format!("{}-{}", token, sanitize_original_name(original_name));
    validate_stored_name(&name)?;
    Ok(name)
}

// Browsers on some platforms send the full client path.
fn base_name(original_name: &str) -> &str {
    original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name)
}

/// Millisecond timestamps that never repeat within one source.
///
/// If the clock has not advanced (or went backwards) since the last token,
/// the previous token plus one is handed out instead.
#[derive(Debug, Default)]
pub struct TokenSource {
    last: AtomicU64,
}

impl TokenSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
        let previous = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }
}
