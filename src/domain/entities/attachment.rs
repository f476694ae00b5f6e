//! Attachment value and media store trait.
//!
//! Attachments are stored inline on messages (JSONB) and as user avatars;
//! the bytes themselves live wherever the [`MediaStore`] puts them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Maximum number of files accepted in a single message.
pub const MAX_ATTACHMENTS_PER_MESSAGE: usize = 5;

/// A stored file reference returned by the media store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Store-assigned identifier, used for deletion
    pub public_id: String,

    /// Publicly reachable URL
    pub url: String,
}

/// A file received from a client, not yet stored.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied file name (used only for its extension)
    pub file_name: Option<String>,

    /// MIME type if the client sent one
    pub content_type: Option<String>,

    /// Raw file contents
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Lower-cased file extension, limited to alphanumerics.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name.as_deref()?;
        let (_, ext) = name.rsplit_once('.')?;
        if ext.is_empty() || ext.len() > 10 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// Storage backend for uploaded files.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store every file, returning one attachment per file in input order.
    async fn upload(&self, files: Vec<UploadedFile>) -> Result<Vec<Attachment>, AppError>;

    /// Remove stored files. Unknown IDs are ignored.
    async fn delete(&self, public_ids: Vec<String>) -> Result<(), AppError>;
}
