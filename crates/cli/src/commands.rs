use crate::render::{self, RecordView};
use album_core::models::Upload;
use album_core::pipeline::{Album, BatchReport};
use anyhow::Result;
use std::path::PathBuf;
use tracing::warn;

/// Reads the files to upload. Unreadable paths are reported and left out so
/// the rest of the batch still goes through.
pub async fn read_uploads(paths: &[PathBuf]) -> Vec<Upload> {
    let mut uploads = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(filename) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            warn!(path = %path.display(), "not a file path, skipping");
            continue;
        };
        match tokio::fs::read(path).await {
            Ok(bytes) => uploads.push(Upload::new(filename, bytes)),
            Err(e) => warn!(path = %path.display(), error = %e, "could not read file, skipping"),
        }
    }
    uploads
}

pub async fn upload(album: &Album, paths: &[PathBuf]) -> Result<BatchReport> {
    let uploads = read_uploads(paths).await;
    Ok(album.ingest_batch(uploads).await?)
}

pub async fn search(album: &Album, query: &str) -> Result<Vec<RecordView>> {
    let records = album.search(query).await?;
    Ok(render::views(records, album.images()))
}

pub async fn list(album: &Album) -> Result<Vec<RecordView>> {
    let records = album.list().await?;
    Ok(render::views(records, album.images()))
}

pub async fn clear(album: &Album) -> Result<u64> {
    Ok(album.clear().await?)
}
