use async_trait::async_trait;
use thiserror::Error;

use crate::{
    application::error::ApplicationError,
    domain::models::blob::{BlobContent, BlobEntry, OperationResult, UploadData},
};

/// Why an upload was not performed. Validation variants carry the exact
/// user-facing reason; storage trouble collapses to the generic
/// `StorageFailed` with the cause logged, never surfaced.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("Select a file before uploading.")]
    EmptyFile,

    #[error("The file is not a valid image.")]
    NotAnImage,

    #[error("The file exceeds the 5 MiB size limit.")]
    TooLarge,

    #[error("Only .jpg or .jpeg files are accepted.")]
    UnsupportedExtension,

    #[error("A description is required.")]
    MissingDescription,

    #[error("The file could not be stored. Try again later.")]
    StorageFailed,
}

/// Workflow layer over the blob container. The only layer that turns
/// storage errors into user-facing values; none of these operations panic
/// or leak backend error types.
#[async_trait]
pub trait BlobService: Send + Sync {
    async fn list_files(&self) -> Result<Vec<BlobEntry>, ApplicationError>;

    /// Case-insensitive substring match on object names.
    async fn search_files(&self, term: &str) -> Result<Vec<BlobEntry>, ApplicationError>;

    async fn upload_file(&self, upload: UploadData) -> Result<(), UploadError>;

    /// `None` when the object does not exist.
    async fn download_file(&self, file_name: &str)
        -> Result<Option<BlobContent>, ApplicationError>;

    /// `true` iff an object was removed. Missing objects and storage
    /// failures both report `false`; the failure cause is logged.
    async fn delete_file(&self, file_name: &str) -> bool;

    /// Overwrite the description metadata of an existing object. `false`
    /// when the object is missing or the write fails.
    async fn edit_description(&self, file_name: &str, new_description: &str) -> bool;

    /// The copy-then-poll-then-delete rename. Never fails with an error
    /// value; every outcome is an [`OperationResult`].
    async fn rename_file(&self, file_name: &str, new_file_name: &str) -> OperationResult;

    /// One-hour read-only URL for an existing object; `None` for a missing
    /// object or on any storage failure.
    async fn signed_image_url(&self, file_name: &str) -> Option<String>;
}
