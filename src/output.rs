//! Artifact download and file naming.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Client;

use crate::encode::{decode_base64, split_data_uri};
use crate::error::AppError;
use crate::ports::Artifact;

/// Generate an output filename from a label and extension.
///
/// Sanitizes the first 50 characters of the label to kebab-case,
/// appends a unix timestamp, and adds the extension.
#[must_use]
pub fn auto_filename(label: &str, ext: &str) -> String {
    let sanitized = sanitize_for_filename(label, 50);
    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    format!("{sanitized}-{timestamp}.{ext}")
}

/// Sanitize a string for use in a filename.
///
/// Converts to lowercase, replaces non-alphanumeric chars with hyphens,
/// collapses consecutive hyphens, and trims to max length.
#[must_use]
pub fn sanitize_for_filename(input: &str, max_len: usize) -> String {
    let mut result = String::with_capacity(max_len);
    let mut last_was_hyphen = true;

    for ch in input.chars() {
        if result.len() >= max_len {
            break;
        }
        if ch.is_ascii_alphanumeric() {
            result.push(ch.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            result.push('-');
            last_was_hyphen = true;
        }
    }

    while result.ends_with('-') {
        result.pop();
    }

    if result.is_empty() {
        "try-on".to_string()
    } else {
        result
    }
}

/// File extension for image bytes, defaulting to `png` when unrecognized.
#[must_use]
pub fn extension_for(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .ok()
        .and_then(|f| f.extensions_str().first().copied())
        .unwrap_or("png")
}

/// Insert `-{index}` before the extension: `out.png` → `out-2.png`.
#[must_use]
pub fn with_index(path: &Path, index: usize) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    match path.extension() {
        Some(ext) => path.with_file_name(format!("{stem}-{index}.{}", ext.to_string_lossy())),
        None => path.with_file_name(format!("{stem}-{index}")),
    }
}

/// Short form of a `data:` URI for terminal output: `data:image/png;base64,… (1234 bytes)`.
#[must_use]
pub fn summarize_data_uri(uri: &str) -> String {
    match split_data_uri(uri) {
        Some((mime, payload)) => format!("data:{mime};base64,… ({} bytes)", payload.len()),
        None => uri.to_string(),
    }
}

/// Fetch the bytes behind an artifact URL.
///
/// # Errors
///
/// Returns an error for malformed `data:` URIs, unsupported schemes, or
/// failed downloads.
pub async fn fetch_artifact(client: &Client, url: &str) -> Result<Vec<u8>, AppError> {
    if split_data_uri(url).is_some() {
        return decode_base64(url).map_err(AppError::Output);
    }
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(AppError::Output(format!("unsupported artifact URL: {url}")));
    }
    log::debug!("downloading {url}");
    let bytes = client.get(url).send().await?.error_for_status()?.bytes().await?;
    Ok(bytes.to_vec())
}

/// Download every artifact URL and write it to disk.
///
/// With an explicit path and several URLs, files are numbered
/// (`out-1.png`, `out-2.png`). Without one, names are generated from `label`.
///
/// # Errors
///
/// Returns an error if a download or write fails.
pub async fn save_artifact(
    client: &Client,
    artifact: &Artifact,
    explicit: Option<&str>,
    label: &str,
) -> Result<Vec<PathBuf>, AppError> {
    let many = artifact.urls.len() > 1;
    let mut saved = Vec::with_capacity(artifact.urls.len());

    for (i, url) in artifact.urls.iter().enumerate() {
        let bytes = fetch_artifact(client, url).await?;
        let base = match explicit {
            Some(p) => PathBuf::from(p),
            None => PathBuf::from(auto_filename(label, extension_for(&bytes))),
        };
        let path = if many { with_index(&base, i + 1) } else { base };

        std::fs::write(&path, &bytes)
            .map_err(|e| AppError::Output(format!("failed to write {}: {e}", path.display())))?;
        saved.push(path);
    }
    Ok(saved)
}
