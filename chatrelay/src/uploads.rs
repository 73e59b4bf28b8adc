//! Temporary on-disk storage for uploaded files.
//!
//! An upload is streamed into a uniquely named file inside the configured upload directory and
//! handed back as a [`StoredUpload`]. Handlers delete it with [`StoredUpload::remove`]; if a
//! request ends early the file is instead removed when the `StoredUpload` is dropped, so every
//! exit path of a request (success, provider failure, size-limit rejection, client
//! disconnect) leaves the directory as it found it.

use crate::config::UploadConfig;
use crate::errors::{Error, Result};
use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use scopeguard::ScopeGuard;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

type Artifact = ScopeGuard<PathBuf, fn(PathBuf)>;

/// An uploaded file on disk. Dropping it deletes the file.
#[derive(Debug)]
pub struct StoredUpload {
    path: Artifact,
    original_name: String,
    size: u64,
}

impl StoredUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name supplied by the client
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read the whole file as text. Invalid UTF-8 sequences become U+FFFD.
    pub async fn read_text(&self) -> Result<String> {
        let bytes = fs::read(self.path()).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Delete the file now instead of at drop.
    pub async fn remove(self) {
        let path = ScopeGuard::into_inner(self.path);
        log_removal(&path, fs::remove_file(&path).await);
    }
}

// Drop fallback for early returns and cancelled requests. A single unlink, so it runs inline on
// the worker thread.
fn remove_artifact(path: PathBuf) {
    log_removal(&path, std::fs::remove_file(&path));
}

fn log_removal(path: &Path, result: std::io::Result<()>) {
    match result {
        Ok(()) => debug!(path = %path.display(), "Removed upload artifact"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove upload artifact"),
    }
}

/// Map a multipart read failure, keeping the 413 axum reports when the body limit is hit.
pub fn multipart_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge { message: e.body_text() }
    } else {
        Error::bad_request(format!("Failed to parse multipart data: {}", e.body_text()))
    }
}

/// Stream one multipart file field to disk, enforcing `config.max_file_size`.
pub async fn store_field(mut field: Field<'_>, original_name: String, config: &UploadConfig) -> Result<StoredUpload> {
    fs::create_dir_all(&config.dir).await?;

    let path = config.dir.join(format!("{}.upload", Uuid::new_v4()));
    let mut file = fs::File::create(&path).await?;
    // Armed from here on: any early return below removes the partial file.
    let path: Artifact = scopeguard::guard(path, remove_artifact as fn(PathBuf));

    debug!(path = %path.display(), file_name = %original_name, "Storing upload");

    let mut size = 0u64;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        size += chunk.len() as u64;
        if size > config.max_file_size {
            warn!(
                file_name = %original_name,
                size = size,
                max_file_size = config.max_file_size,
                "File size limit exceeded, aborting upload"
            );
            return Err(Error::PayloadTooLarge {
                message: format!("File size exceeds maximum allowed size of {} bytes", config.max_file_size),
            });
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    Ok(StoredUpload {
        path,
        original_name,
        size,
    })
}
