//! Local Media Store
//!
//! Writes uploaded files to a directory on disk. Each file gets a uuid name
//! with its original extension; the directory itself is served at `/media`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::MediaSettings;
use crate::domain::{Attachment, MediaStore, UploadedFile};
use crate::shared::error::AppError;

/// URL path prefix the storage directory is mounted under.
pub const MEDIA_ROUTE: &str = "/media";

/// Filesystem-backed [`MediaStore`].
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    base_path: PathBuf,
    public_base_url: String,
    max_file_size: usize,
}

impl LocalMediaStore {
    /// Create the storage directory if needed.
    pub async fn new(settings: &MediaSettings) -> Result<Self, AppError> {
        fs::create_dir_all(&settings.storage_path).await.map_err(|e| {
            AppError::Internal(format!(
                "Failed to create media directory '{}': {}",
                settings.storage_path.display(),
                e
            ))
        })?;

        info!(path = %settings.storage_path.display(), "Media store initialized");

        Ok(Self {
            base_path: settings.storage_path.clone(),
            public_base_url: settings.public_base_url.trim_end_matches('/').to_string(),
            max_file_size: settings.max_file_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn url_for(&self, public_id: &str) -> String {
        format!("{}{}/{}", self.public_base_url, MEDIA_ROUTE, public_id)
    }

    /// Resolve a public ID to a path inside the storage directory.
    ///
    /// IDs are generated by this store, so anything carrying a separator or
    /// traversal component is rejected.
    fn path_for(&self, public_id: &str) -> Option<PathBuf> {
        let valid = !public_id.is_empty()
            && !public_id.contains("..")
            && public_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
        valid.then(|| self.base_path.join(public_id))
    }

    fn check_size(&self, file: &UploadedFile) -> Result<(), AppError> {
        if file.bytes.is_empty() {
            return Err(AppError::BadRequest("Empty file".into()));
        }
        if file.bytes.len() > self.max_file_size {
            return Err(AppError::BadRequest(format!(
                "File exceeds the maximum size of {} bytes",
                self.max_file_size
            )));
        }
        Ok(())
    }

    async fn remove_quietly(&self, public_ids: &[String]) {
        for public_id in public_ids {
            if let Some(path) = self.path_for(public_id) {
                if let Err(e) = fs::remove_file(&path).await {
                    warn!(public_id = %public_id, error = %e, "Failed to remove media file");
                }
            }
        }
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    /// All-or-nothing: a failed write removes the files already stored.
    async fn upload(&self, files: Vec<UploadedFile>) -> Result<Vec<Attachment>, AppError> {
        for file in &files {
            self.check_size(file)?;
        }

        let mut stored: Vec<Attachment> = Vec::with_capacity(files.len());
        for file in files {
            let public_id = match file.extension() {
                Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
                None => Uuid::new_v4().to_string(),
            };
            let path = self.base_path.join(&public_id);

            if let Err(e) = fs::write(&path, &file.bytes).await {
                let written: Vec<String> = stored.into_iter().map(|a| a.public_id).collect();
                self.remove_quietly(&written).await;
                return Err(AppError::Internal(format!(
                    "Failed to write media file {}: {}",
                    public_id, e
                )));
            }

            debug!(public_id = %public_id, size = file.bytes.len(), "Stored media file");
            stored.push(Attachment {
                url: self.url_for(&public_id),
                public_id,
            });
        }

        Ok(stored)
    }

    async fn delete(&self, public_ids: Vec<String>) -> Result<(), AppError> {
        for public_id in &public_ids {
            let Some(path) = self.path_for(public_id) else {
                warn!(public_id = %public_id, "Refusing to delete media with invalid id");
                continue;
            };

            match fs::remove_file(&path).await {
                Ok(()) => debug!(public_id = %public_id, "Deleted media file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(AppError::Internal(format!(
                        "Failed to delete media file {}: {}",
                        public_id, e
                    )))
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_store(max_file_size: usize) -> (LocalMediaStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let settings = MediaSettings {
            storage_path: dir.path().to_path_buf(),
            public_base_url: "http://localhost:3000/".into(),
            max_file_size,
        };
        let store = LocalMediaStore::new(&settings).await.unwrap();
        (store, dir)
    }

    fn file(name: &str, bytes: &[u8]) -> UploadedFile {
        UploadedFile {
            file_name: Some(name.into()),
            content_type: None,
            bytes: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_upload_writes_files_and_builds_urls() {
        let (store, _dir) = test_store(1024).await;

        let stored = store
            .upload(vec![file("cat.PNG", b"png"), file("notes", b"txt")])
            .await
            .unwrap();

        assert_eq!(stored.len(), 2);
        assert!(stored[0].public_id.ends_with(".png"));
        assert!(!stored[1].public_id.contains('.'));
        assert_eq!(
            stored[0].url,
            format!("http://localhost:3000/media/{}", stored[0].public_id)
        );
        let on_disk = fs::read(store.base_path().join(&stored[0].public_id)).await.unwrap();
        assert_eq!(on_disk, b"png");
    }

    #[tokio::test]
    async fn test_oversized_file_rejected_before_writing() {
        let (store, dir) = test_store(4).await;

        let err = store
            .upload(vec![file("a.txt", b"ok"), file("b.txt", b"too large")])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_empty_file_rejected() {
        let (store, _dir) = test_store(4).await;
        let err = store.upload(vec![file("a.txt", b"")]).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_and_ignores_unknown() {
        let (store, _dir) = test_store(1024).await;
        let stored = store.upload(vec![file("a.txt", b"data")]).await.unwrap();
        let public_id = stored[0].public_id.clone();

        store
            .delete(vec![public_id.clone(), "missing.txt".into(), "../etc/passwd".into()])
            .await
            .unwrap();

        assert!(!store.base_path().join(&public_id).exists());
    }

    #[test]
    fn test_path_for_rejects_traversal() {
        let store = LocalMediaStore {
            base_path: PathBuf::from("/tmp/media"),
            public_base_url: String::new(),
            max_file_size: 1,
        };
        assert!(store.path_for("../secret").is_none());
        assert!(store.path_for("a/b").is_none());
        assert!(store.path_for("").is_none());
        assert!(store.path_for("0b4c-1.png").is_some());
    }
}
