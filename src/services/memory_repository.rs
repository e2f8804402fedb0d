use std::{
    collections::{BTreeMap, HashMap},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    application::repositories::blob_repository::{BlobRepository, DESCRIPTION_KEY, NO_DESCRIPTION},
    domain::models::blob::{BlobContent, BlobEntry, CopyStatus},
    services::error::StorageError,
};

#[derive(Clone)]
struct StoredBlob {
    content: Vec<u8>,
    content_type: String,
    metadata: HashMap<String, String>,
    last_modified: DateTime<Utc>,
}

struct PendingCopy {
    blob: StoredBlob,
    polls_remaining: u32,
}

/// In-process backend satisfying the full [`BlobRepository`] contract.
/// Server-side copies can be held in the pending state for a configurable
/// number of status polls, and copy or delete failures can be injected,
/// so the rename sequencing is exercisable without a real backend.
pub struct MemoryBlobRepository {
    blobs: Mutex<BTreeMap<String, StoredBlob>>,
    pending_copies: Mutex<HashMap<String, PendingCopy>>,
    copy_delay_polls: u32,
    fail_copies: bool,
    fail_deletes: bool,
}

impl MemoryBlobRepository {
    pub fn new() -> Self {
        Self {
            blobs: Mutex::new(BTreeMap::new()),
            pending_copies: Mutex::new(HashMap::new()),
            copy_delay_polls: 0,
            fail_copies: false,
            fail_deletes: false,
        }
    }

    /// Copies stay pending for `polls` status checks before completing.
    pub fn with_copy_delay(polls: u32) -> Self {
        Self {
            copy_delay_polls: polls,
            ..Self::new()
        }
    }

    /// Every copy reaches the failed state instead of completing.
    pub fn with_failing_copies() -> Self {
        Self {
            fail_copies: true,
            ..Self::new()
        }
    }

    /// Every delete reports a provider error.
    pub fn with_failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::new()
        }
    }
}

impl Default for MemoryBlobRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobRepository for MemoryBlobRepository {
    async fn list_blobs(&self) -> Result<Vec<BlobEntry>, StorageError> {
        let blobs = self.blobs.lock().unwrap();
        Ok(blobs
            .iter()
            .map(|(name, blob)| BlobEntry {
                name: name.clone(),
                description: blob
                    .metadata
                    .get(DESCRIPTION_KEY)
                    .cloned()
                    .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
                last_modified: Some(blob.last_modified),
            })
            .collect())
    }

    async fn upload_blob(
        &self,
        name: &str,
        content: Vec<u8>,
        content_type: &str,
        description: &str,
    ) -> Result<(), StorageError> {
        let mut blobs = self.blobs.lock().unwrap();
        let mut metadata = HashMap::new();
        metadata.insert(DESCRIPTION_KEY.to_string(), description.to_string());
        blobs.insert(
            name.to_string(),
            StoredBlob {
                content,
                content_type: content_type.to_string(),
                metadata,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn download_blob(&self, name: &str) -> Result<Option<BlobContent>, StorageError> {
        let blobs = self.blobs.lock().unwrap();
        Ok(blobs.get(name).map(|blob| BlobContent {
            content: blob.content.clone(),
            content_type: blob.content_type.clone(),
        }))
    }

    async fn blob_exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.blobs.lock().unwrap().contains_key(name))
    }

    async fn delete_blob(&self, name: &str) -> Result<bool, StorageError> {
        if self.fail_deletes {
            return Err(StorageError::ProviderError(format!(
                "delete of '{}' refused",
                name
            )));
        }
        Ok(self.blobs.lock().unwrap().remove(name).is_some())
    }

    async fn blob_metadata(&self, name: &str) -> Result<HashMap<String, String>, StorageError> {
        let blobs = self.blobs.lock().unwrap();
        blobs
            .get(name)
            .map(|blob| blob.metadata.clone())
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    async fn set_blob_metadata(
        &self,
        name: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), StorageError> {
        let mut blobs = self.blobs.lock().unwrap();
        let blob = blobs
            .get_mut(name)
            .ok_or_else(|| StorageError::NotFound(name.to_string()))?;
        blob.metadata = metadata;
        Ok(())
    }

    async fn signed_read_url(
        &self,
        name: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let blobs = self.blobs.lock().unwrap();
        if !blobs.contains_key(name) {
            return Err(StorageError::NotFound(name.to_string()));
        }
        let expires_at = Utc::now() + chrono::Duration::from_std(expires_in).unwrap_or_default();
        Ok(format!(
            "memory:///{}?sig=read-only&expires={}",
            name,
            expires_at.timestamp()
        ))
    }

    async fn start_copy(&self, source: &str, destination: &str) -> Result<(), StorageError> {
        let snapshot = {
            let blobs = self.blobs.lock().unwrap();
            blobs
                .get(source)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(source.to_string()))?
        };
        self.pending_copies.lock().unwrap().insert(
            destination.to_string(),
            PendingCopy {
                blob: snapshot,
                polls_remaining: self.copy_delay_polls,
            },
        );
        Ok(())
    }

    async fn copy_status(&self, destination: &str) -> Result<CopyStatus, StorageError> {
        let mut pending = self.pending_copies.lock().unwrap();
        if let Some(copy) = pending.get_mut(destination) {
            if copy.polls_remaining > 0 {
                copy.polls_remaining -= 1;
                return Ok(CopyStatus::Pending);
            }
            let copy = pending.remove(destination).unwrap();
            if self.fail_copies {
                return Ok(CopyStatus::Failed);
            }
            let mut blob = copy.blob;
            blob.last_modified = Utc::now();
            self.blobs
                .lock()
                .unwrap()
                .insert(destination.to_string(), blob);
            return Ok(CopyStatus::Success);
        }

        if self.blobs.lock().unwrap().contains_key(destination) {
            Ok(CopyStatus::Success)
        } else {
            Ok(CopyStatus::Failed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listing_defaults_missing_description() {
        let repository = MemoryBlobRepository::new();
        repository
            .upload_blob("a.jpg", vec![1], "image/jpeg", "described")
            .await
            .unwrap();
        repository
            .set_blob_metadata("a.jpg", HashMap::new())
            .await
            .unwrap();

        let entries = repository.list_blobs().await.unwrap();
        assert_eq!(entries[0].description, NO_DESCRIPTION);
    }

    #[tokio::test]
    async fn delete_of_missing_blob_is_false_not_an_error() {
        let repository = MemoryBlobRepository::new();
        assert!(!repository.delete_blob("nope.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn metadata_of_missing_blob_is_not_found() {
        let repository = MemoryBlobRepository::new();
        let err = repository.blob_metadata("nope.jpg").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn copy_holds_pending_for_configured_polls() {
        let repository = MemoryBlobRepository::with_copy_delay(2);
        repository
            .upload_blob("src.jpg", vec![7], "image/jpeg", "d")
            .await
            .unwrap();

        repository.start_copy("src.jpg", "dst.jpg").await.unwrap();
        assert_eq!(
            repository.copy_status("dst.jpg").await.unwrap(),
            CopyStatus::Pending
        );
        assert_eq!(
            repository.copy_status("dst.jpg").await.unwrap(),
            CopyStatus::Pending
        );
        assert_eq!(
            repository.copy_status("dst.jpg").await.unwrap(),
            CopyStatus::Success
        );
        assert!(repository.blob_exists("dst.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn copy_of_missing_source_is_not_found() {
        let repository = MemoryBlobRepository::new();
        let err = repository
            .start_copy("nope.jpg", "dst.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn signed_url_requires_existing_blob() {
        let repository = MemoryBlobRepository::new();
        let err = repository
            .signed_read_url("nope.jpg", Duration::from_secs(3600))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
