//! HTML responses
//!
//! Inline page templates for the listing, not-found and upload error pages.

use crate::storage::{ALLOWED_EXTENSIONS, StoredFile};

/// Listing page with the upload form and one row per stored file.
pub fn index_page(files: &[StoredFile]) -> String {
    let rows = if files.is_empty() {
        "<p>No files uploaded yet.</p>".to_string()
    } else {
        files.iter().map(file_row).collect::<Vec<_>>().join("\n")
    };

    let accept = ALLOWED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(",");

    page(
        "File Upload Manager",
        &format!(
            r#"<h1>File Upload Manager</h1>
        <form action="/upload" method="post" enctype="multipart/form-data">
            <input type="file" name="file" accept="{accept}" required>
            <button class="btn" type="submit">Upload</button>
        </form>
        <div class="file-list">
            <h3>Uploaded Files</h3>
            {rows}
        </div>"#
        ),
    )
}

/// Page shown for unknown or invalid stored names.
pub fn not_found_page() -> String {
    message_page("File not found!")
}

/// Minimal page carrying a single message and a link back to the listing.
pub fn message_page(message: &str) -> String {
    page(
        "File Upload Manager",
        &format!(
            r#"<h3>{}</h3>
        <a class="btn" href="/">Go Back</a>"#,
            html_escape(message)
        ),
    )
}

fn file_row(file: &StoredFile) -> String {
    let link = urlencoding::encode(&file.name);
    format!(
        r#"<div class="file-item">
                <span><a href="/uploads/{link}">{name}</a> <small>{size}</small></span>
                <span>
                    <a class="btn" href="/download/{link}">Download</a>
                    <a class="btn" href="/delete/{link}">Delete</a>
                </span>
            </div>"#,
        name = html_escape(&file.name),
        size = format_size(file.size),
    )
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{CSS_STYLES}</style>
</head>
<body>
    <div class="container">
        {body}
    </div>
</body>
</html>"#
    )
}

/// Human readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

const CSS_STYLES: &str = r#"
body {
    font-family: Arial, sans-serif;
    background-color: #f2f2f2;
    padding: 40px;
}
.container {
    background: white;
    border-radius: 10px;
    padding: 20px;
    max-width: 600px;
    margin: auto;
    box-shadow: 0 0 10px rgba(0,0,0,0.1);
}
h1 { text-align: center; color: #333; }
form { text-align: center; margin-top: 20px; }
.btn {
    background-color: #007bff;
    color: white;
    padding: 8px 15px;
    border: none;
    border-radius: 5px;
    text-decoration: none;
    cursor: pointer;
}
.btn:hover { background-color: #0056b3; }
.file-list { margin-top: 30px; }
.file-item {
    display: flex;
    justify-content: space-between;
    align-items: center;
    margin-bottom: 10px;
    background-color: #fafafa;
    padding: 8px 10px;
    border-radius: 6px;
}
.file-item span { word-break: break-all; }
small { color: #888; }
"#;
