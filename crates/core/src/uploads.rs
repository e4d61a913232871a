//! Upload validation and on-disk image storage.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Used when neither the content nor the extension identifies the image.
const FALLBACK_MIME: &str = "image/png";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("filename {0:?} has no usable characters")]
    InvalidFilename(String),
    #[error("could not write image {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// True when `filename` has an extension in `allowed` (compared lowercase).
pub fn allowed_file(filename: &str, allowed: &[String]) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_lowercase();
            allowed.iter().any(|a| a.to_lowercase() == ext)
        }
        None => false,
    }
}

/// Reduces a client-supplied name to a safe flat filename.
///
/// Directory components are dropped, whitespace becomes `_`, anything other
/// than ASCII alphanumerics and `._-` is removed, and leading `.`/`_` are
/// stripped. Returns `None` when nothing is left.
pub fn secure_filename(filename: &str) -> Option<String> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let cleaned = cleaned.trim_start_matches(['.', '_']).to_string();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// MIME type for the data URL: sniffed from content, then the extension.
pub fn guess_mime(bytes: &[u8], filename: &str) -> String {
    if let Some(kind) = infer::get(bytes) {
        if kind.mime_type().starts_with("image/") {
            return kind.mime_type().to_string();
        }
    }
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "bmp" => "image/bmp",
            _ => FALLBACK_MIME,
        })
        .unwrap_or(FALLBACK_MIME)
        .to_string()
}

/// Directory holding uploaded images. Stored names are relative to it.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Writes `bytes` under the sanitised `filename` and returns the stored
    /// name. An existing file is never replaced: on a clash the name gets a
    /// content-hash suffix, then a counter.
    pub async fn save(&self, filename: &str, bytes: &[u8]) -> Result<String, UploadError> {
        let name = secure_filename(filename)
            .ok_or_else(|| UploadError::InvalidFilename(filename.to_string()))?;
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| UploadError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{ext}")),
            _ => (name.clone(), String::new()),
        };
        let digest = blake3::hash(bytes).to_hex();
        let short = &digest.as_str()[..8];

        let mut candidate = name.clone();
        let mut clash = 0usize;
        loop {
            let path = self.path_of(&candidate);
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => {
                    write_or_remove(file, &path, bytes).await?;
                    debug!(stored = %candidate, size = bytes.len(), "saved upload");
                    return Ok(candidate);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    clash += 1;
                    candidate = if clash == 1 {
                        format!("{stem}-{short}{ext}")
                    } else {
                        format!("{stem}-{short}-{clash}{ext}")
                    };
                }
                Err(source) => return Err(UploadError::Io { path, source }),
            }
        }
    }

    /// Best-effort removal of an image that never made it into the catalog.
    pub async fn discard(&self, name: &str) {
        if let Err(e) = fs::remove_file(self.path_of(name)).await {
            warn!(name, error = %e, "failed to remove discarded upload");
        }
    }
}

/// Writes `bytes` to a freshly created file, removing `path` again if the
/// write does not complete.
async fn write_or_remove<W>(mut file: W, path: &Path, bytes: &[u8]) -> Result<(), UploadError>
where
    W: AsyncWrite + Unpin,
{
    let written = match file.write_all(bytes).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    if let Err(source) = written {
        drop(file);
        if let Err(e) = fs::remove_file(path).await {
            warn!(path = %path.display(), error = %e, "failed to remove partial upload");
        }
        return Err(UploadError::Io {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}
