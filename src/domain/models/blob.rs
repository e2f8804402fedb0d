use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry in the container listing: the object name plus the description
/// held in its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobEntry {
    pub name: String,
    pub description: String,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Downloaded object bytes with their content type.
#[derive(Debug, Clone)]
pub struct BlobContent {
    pub content: Vec<u8>,
    pub content_type: String,
}

/// A file submitted for upload, carried from the multipart form into the
/// workflow layer.
#[derive(Debug, Clone)]
pub struct UploadData {
    pub file_name: String,
    pub content: Vec<u8>,
    pub content_type: String,
    pub description: String,
}

impl UploadData {
    pub fn new(
        file_name: String,
        content: Vec<u8>,
        content_type: String,
        description: String,
    ) -> Self {
        Self {
            file_name,
            content,
            content_type,
            description,
        }
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    /// File extension without the dot, lowercased.
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }
}

/// Backend-reported state of a server-side copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStatus {
    Pending,
    Success,
    Failed,
}

/// Outcome of a rename, reported as a value instead of an error path.
#[derive(Debug, Clone, Serialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
}

impl OperationResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
