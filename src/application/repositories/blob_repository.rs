use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;

use crate::{
    domain::models::blob::{BlobContent, BlobEntry, CopyStatus},
    services::StorageError,
};

/// Metadata key holding the user-supplied description.
pub const DESCRIPTION_KEY: &str = "description";

/// Description shown for objects that carry no description metadata.
pub const NO_DESCRIPTION: &str = "No description";

/// Access layer over one storage container. Implementations are thin
/// adapters: backend errors propagate as [`StorageError`] and are only
/// converted into user-facing values by the workflow layer.
#[async_trait]
pub trait BlobRepository: Send + Sync {
    /// Enumerate every object in the container together with its
    /// description metadata. Each call re-queries the backend.
    async fn list_blobs(&self) -> Result<Vec<BlobEntry>, StorageError>;

    /// Write object bytes under `name` (overwriting any existing object),
    /// then set its description metadata. The two steps are not atomic.
    async fn upload_blob(
        &self,
        name: &str,
        content: Vec<u8>,
        content_type: &str,
        description: &str,
    ) -> Result<(), StorageError>;

    /// Fetch object bytes. `None` when the object does not exist.
    async fn download_blob(&self, name: &str) -> Result<Option<BlobContent>, StorageError>;

    async fn blob_exists(&self, name: &str) -> Result<bool, StorageError>;

    /// Remove the object. `true` iff an object was actually removed;
    /// a missing object is a normal `false`, not an error.
    async fn delete_blob(&self, name: &str) -> Result<bool, StorageError>;

    async fn blob_metadata(&self, name: &str) -> Result<HashMap<String, String>, StorageError>;

    /// Replace the whole metadata map of the object.
    async fn set_blob_metadata(
        &self,
        name: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), StorageError>;

    /// Issue a read-only capability URL scoped to exactly this object,
    /// valid for `expires_in`. Callers check existence first; the URL
    /// grants no write, delete, or list capability.
    async fn signed_read_url(
        &self,
        name: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError>;

    /// Initiate a server-side copy of `source` into `destination`. The
    /// destination is created by the backend; progress is observed through
    /// [`copy_status`](Self::copy_status).
    async fn start_copy(&self, source: &str, destination: &str) -> Result<(), StorageError>;

    /// Report the state of the copy targeting `destination`.
    async fn copy_status(&self, destination: &str) -> Result<CopyStatus, StorageError>;
}
