// src/services/storage.rs
use crate::error::{AppError, AppResult};
use axum::extract::multipart::Field;
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

/// A file written to the upload directory.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub path: PathBuf,
    pub size: u64,
}

/// Uploads live in one directory per owner: `<root>/<user id>/`.
pub fn user_dir(root: &Path, user_id: i64) -> PathBuf {
    root.join(user_id.to_string())
}

/// Streams a multipart field to `<root>/<user id>/<uuid>.<ext>`.
///
/// Stops and removes the partial file if the body breaks or grows past `max_bytes`.
pub async fn save_field(field: Field<'_>, root: &Path, user_id: i64, extension: &str, max_bytes: usize) -> AppResult<StoredFile> {
    let dir = user_dir(root, user_id);
    fs::create_dir_all(&dir).await?;
    let path = dir.join(format!("{}.{}", Uuid::new_v4(), extension));

    match write_field(field, &path, max_bytes as u64).await {
        Ok(size) => {
            tracing::debug!("Stored upload at {} ({} bytes)", path.display(), size);
            Ok(StoredFile { path, size })
        }
        Err(e) => {
            remove_file(&path).await;
            Err(e)
        }
    }
}

async fn write_field(mut field: Field<'_>, path: &Path, max_bytes: u64) -> AppResult<u64> {
    let mut file = fs::File::create(path).await?;
    let mut size = 0u64;

    while let Some(chunk) = field.chunk().await? {
        size += chunk.len() as u64;
        if size > max_bytes {
            tracing::warn!("Upload exceeded {} bytes, aborting", max_bytes);
            return Err(AppError::validation(format!(
                "File exceeds the maximum size of {}",
                human_size(max_bytes)
            )));
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    Ok(size)
}

/// Largest whole unit that represents `bytes` exactly.
fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    match bytes {
        b if b >= MB && b % MB == 0 => format!("{} MB", b / MB),
        b if b >= KB && b % KB == 0 => format!("{} KB", b / KB),
        b => format!("{} bytes", b),
    }
}

/// Best-effort delete: a missing file is fine, other failures are only logged.
pub async fn remove_file(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("File {} already gone", path.display());
        }
        Err(e) => tracing::warn!("Could not remove file {}: {}", path.display(), e),
    }
}
