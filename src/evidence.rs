//! Evidence file storage.
//!
//! The plan core only keeps an opaque reference per row; where the bytes live
//! is up to the backend.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::AppError;
use crate::model::EvidenceUpload;

#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Stores the upload and returns the reference to record on the row.
    async fn put(&self, upload: &EvidenceUpload) -> Result<String, AppError>;

    /// Deletes a reference previously returned by `put`.
    async fn remove(&self, reference: &str) -> Result<(), AppError>;
}

/// Copies evidence files into a directory on local disk.
#[derive(Clone, Debug)]
pub struct LocalEvidenceStore {
    root: PathBuf,
    max_bytes: u64,
}

impl LocalEvidenceStore {
    pub fn new(root: PathBuf, max_bytes: u64) -> Self {
        Self { root, max_bytes }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[async_trait]
impl EvidenceStore for LocalEvidenceStore {
    async fn put(&self, upload: &EvidenceUpload) -> Result<String, AppError> {
        let size = check_source(upload, self.max_bytes).await?;

        fs::create_dir_all(&self.root).await.map_err(|err| {
            AppError::Storage(format!("cannot create {}: {err}", self.root.display()))
        })?;
        let name = stored_name(upload);
        let target = self.root.join(&name);
        fs::copy(&upload.source, &target).await.map_err(|err| {
            AppError::Storage(format!(
                "cannot write evidence for row {} to {}: {err}",
                upload.row_no,
                target.display()
            ))
        })?;
        tracing::debug!(row_no = upload.row_no, size, reference = %name, "stored evidence file");
        Ok(name)
    }

    async fn remove(&self, reference: &str) -> Result<(), AppError> {
        let Some(name) = std::path::Path::new(reference).file_name() else {
            return Ok(());
        };
        match fs::remove_file(self.root.join(name)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AppError::Storage(format!("cannot remove {reference}: {err}"))),
        }
    }
}

/// Keeps evidence bytes in memory; references use a `mem://` scheme.
#[derive(Debug, Default)]
pub struct MemoryEvidenceStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
    max_bytes: Option<u64>,
}

impl MemoryEvidenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(max_bytes: u64) -> Self {
        Self {
            files: Mutex::default(),
            max_bytes: Some(max_bytes),
        }
    }

    pub async fn contains(&self, reference: &str) -> bool {
        self.files.lock().await.contains_key(reference)
    }

    pub async fn len(&self) -> usize {
        self.files.lock().await.len()
    }
}

#[async_trait]
impl EvidenceStore for MemoryEvidenceStore {
    async fn put(&self, upload: &EvidenceUpload) -> Result<String, AppError> {
        check_source(upload, self.max_bytes.unwrap_or(u64::MAX)).await?;
        let bytes = fs::read(&upload.source).await.map_err(|err| {
            AppError::Storage(format!("cannot read evidence for row {}: {err}", upload.row_no))
        })?;
        let reference = format!("mem://{}", stored_name(upload));
        self.files.lock().await.insert(reference.clone(), bytes);
        Ok(reference)
    }

    async fn remove(&self, reference: &str) -> Result<(), AppError> {
        self.files.lock().await.remove(reference);
        Ok(())
    }
}

async fn check_source(upload: &EvidenceUpload, max_bytes: u64) -> Result<u64, AppError> {
    let metadata = fs::metadata(&upload.source).await.map_err(|err| {
        AppError::InvalidInput(format!(
            "evidence file for row {} is not readable: {} ({err})",
            upload.row_no,
            upload.source.display()
        ))
    })?;
    if !metadata.is_file() {
        return Err(AppError::InvalidInput(format!(
            "evidence for row {} is not a file: {}",
            upload.row_no,
            upload.source.display()
        )));
    }
    if metadata.len() > max_bytes {
        return Err(AppError::InvalidInput(format!(
            "evidence file for row {} exceeds {max_bytes} bytes",
            upload.row_no
        )));
    }
    Ok(metadata.len())
}

// <unix millis>-<random><original extension>
fn stored_name(upload: &EvidenceUpload) -> String {
    let ext = upload
        .source
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    format!(
        "{}-{}{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        ext
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_source(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).expect("write source");
        path
    }

    #[tokio::test]
    async fn local_store_copies_file_and_keeps_extension() {
        let dir = TempDir::new().expect("temp dir");
        let source = write_source(&dir, "receipt.pdf", b"pdf bytes");
        let store = LocalEvidenceStore::new(dir.path().join("uploads"), 1024);

        let reference = store
            .put(&EvidenceUpload { row_no: 1, source })
            .await
            .expect("put");
        assert!(reference.ends_with(".pdf"));
        let stored = std::fs::read(store.root().join(&reference)).expect("stored file");
        assert_eq!(stored, b"pdf bytes");

        store.remove(&reference).await.expect("remove");
        assert!(!store.root().join(&reference).exists());
        store.remove(&reference).await.expect("remove twice");
    }

    #[tokio::test]
    async fn local_store_rejects_oversized_file() {
        let dir = TempDir::new().expect("temp dir");
        let source = write_source(&dir, "big.png", &[0u8; 32]);
        let store = LocalEvidenceStore::new(dir.path().join("uploads"), 16);

        let err = store
            .put(&EvidenceUpload { row_no: 2, source })
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("exceeds 16 bytes"));
    }

    #[tokio::test]
    async fn missing_source_is_invalid_input() {
        let dir = TempDir::new().expect("temp dir");
        let store = LocalEvidenceStore::new(dir.path().join("uploads"), 1024);
        let err = store
            .put(&EvidenceUpload {
                row_no: 3,
                source: dir.path().join("absent.png"),
            })
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn memory_store_tracks_references() {
        let dir = TempDir::new().expect("temp dir");
        let source = write_source(&dir, "photo.jpg", b"jpg");
        let store = MemoryEvidenceStore::new();
        let reference = store
            .put(&EvidenceUpload { row_no: 1, source })
            .await
            .expect("put");
        assert!(reference.starts_with("mem://"));
        assert!(store.contains(&reference).await);
        store.remove(&reference).await.expect("remove");
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn memory_store_honours_limit() {
        let dir = TempDir::new().expect("temp dir");
        let source = write_source(&dir, "scan.tiff", &[1u8; 8]);
        let store = MemoryEvidenceStore::with_limit(4);
        let err = store
            .put(&EvidenceUpload { row_no: 1, source })
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(store.len().await, 0);
    }
}
