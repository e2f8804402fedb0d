use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::{error, warn};

use crate::{
    application::{
        error::ApplicationError,
        repositories::blob_repository::{BlobRepository, DESCRIPTION_KEY},
        services::blob_service::{BlobService, UploadError},
    },
    domain::models::blob::{BlobContent, BlobEntry, CopyStatus, OperationResult, UploadData},
    services::StorageError,
};

/// Upload ceiling for image files.
const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Interval between copy-status polls during a rename.
const COPY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Overall bound on the rename poll loop. A copy still pending past this
/// deadline is reported as timed out, distinct from a failed copy.
const COPY_TIMEOUT: Duration = Duration::from_secs(60);

/// Lifetime of signed read URLs.
const SIGNED_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// Terminal states of the copy-then-delete sequence.
enum CopyOutcome {
    /// Destination written, source removed.
    Completed,
    /// Destination written but the source object could not be removed.
    SourceRetained,
    /// The backend reported the copy as failed.
    CopyFailed,
    /// The copy never left the pending state before the deadline.
    TimedOut,
}

/// Concrete workflow layer. Composes [`BlobRepository`] calls into the
/// upload-validation, description-edit, and rename-via-copy workflows; the
/// remaining operations are thin pass-throughs.
pub struct BlobWorkflows {
    repository: Arc<dyn BlobRepository>,
}

impl BlobWorkflows {
    pub fn new(repository: Arc<dyn BlobRepository>) -> Self {
        Self { repository }
    }

    /// Copy `source` onto `destination`, wait for the copy to reach a
    /// terminal state, then remove the source. The backend creates the
    /// destination; this loop only observes its status.
    async fn copy_then_delete(
        &self,
        source: &str,
        destination: &str,
    ) -> Result<CopyOutcome, StorageError> {
        self.repository.start_copy(source, destination).await?;

        let deadline = tokio::time::Instant::now() + COPY_TIMEOUT;
        loop {
            tokio::time::sleep(COPY_POLL_INTERVAL).await;
            match self.repository.copy_status(destination).await? {
                CopyStatus::Success => break,
                CopyStatus::Failed => return Ok(CopyOutcome::CopyFailed),
                CopyStatus::Pending => {
                    if tokio::time::Instant::now() >= deadline {
                        return Ok(CopyOutcome::TimedOut);
                    }
                }
            }
        }

        match self.repository.delete_blob(source).await {
            // A `false` here means the source vanished on its own; nothing
            // is left behind, so the rename is complete either way.
            Ok(_) => Ok(CopyOutcome::Completed),
            Err(err) => {
                warn!(source, error = %err, "source delete after copy failed");
                Ok(CopyOutcome::SourceRetained)
            }
        }
    }

    async fn try_edit_description(
        &self,
        file_name: &str,
        new_description: &str,
    ) -> Result<bool, StorageError> {
        if !self.repository.blob_exists(file_name).await? {
            return Ok(false);
        }

        let description = strip_non_ascii(new_description);

        let mut metadata = self.repository.blob_metadata(file_name).await?;
        metadata.insert(DESCRIPTION_KEY.to_string(), description);
        self.repository.set_blob_metadata(file_name, metadata).await?;

        Ok(true)
    }
}

#[async_trait]
impl BlobService for BlobWorkflows {
    async fn list_files(&self) -> Result<Vec<BlobEntry>, ApplicationError> {
        Ok(self.repository.list_blobs().await?)
    }

    async fn search_files(&self, term: &str) -> Result<Vec<BlobEntry>, ApplicationError> {
        let term = term.to_lowercase();
        let entries = self.repository.list_blobs().await?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.name.to_lowercase().contains(&term))
            .collect())
    }

    async fn upload_file(&self, upload: UploadData) -> Result<(), UploadError> {
        if upload.content.is_empty() {
            return Err(UploadError::EmptyFile);
        }

        if image::load_from_memory(&upload.content).is_err() {
            return Err(UploadError::NotAnImage);
        }

        if upload.size() > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge);
        }

        match upload.extension().as_deref() {
            Some("jpg") | Some("jpeg") => {}
            _ => return Err(UploadError::UnsupportedExtension),
        }

        if upload.description.trim().is_empty() {
            return Err(UploadError::MissingDescription);
        }

        let description = strip_non_ascii(&upload.description);
        self.repository
            .upload_blob(
                &upload.file_name,
                upload.content,
                &upload.content_type,
                &description,
            )
            .await
            .map_err(|err| {
                error!(file = %upload.file_name, error = %err, "upload failed");
                UploadError::StorageFailed
            })
    }

    async fn download_file(
        &self,
        file_name: &str,
    ) -> Result<Option<BlobContent>, ApplicationError> {
        Ok(self.repository.download_blob(file_name).await?)
    }

    async fn delete_file(&self, file_name: &str) -> bool {
        match self.repository.delete_blob(file_name).await {
            Ok(removed) => removed,
            Err(err) => {
                error!(file = %file_name, error = %err, "delete failed");
                false
            }
        }
    }

    async fn edit_description(&self, file_name: &str, new_description: &str) -> bool {
        match self.try_edit_description(file_name, new_description).await {
            Ok(done) => done,
            Err(err) => {
                error!(file = %file_name, error = %err, "description edit failed");
                false
            }
        }
    }

    async fn rename_file(&self, file_name: &str, new_file_name: &str) -> OperationResult {
        if file_name.to_lowercase() == new_file_name.to_lowercase() {
            return OperationResult::fail("The file already has this name.");
        }

        match self.repository.blob_exists(new_file_name).await {
            Ok(true) => {
                return OperationResult::fail(format!(
                    "A file named '{}' already exists. Choose another name.",
                    new_file_name
                ))
            }
            Ok(false) => {}
            Err(err) => return OperationResult::fail(format!("Could not rename: {}", err)),
        }

        match self.repository.blob_exists(file_name).await {
            Ok(true) => {}
            Ok(false) => {
                return OperationResult::fail(format!("File '{}' not found.", file_name))
            }
            Err(err) => return OperationResult::fail(format!("Could not rename: {}", err)),
        }

        match self.copy_then_delete(file_name, new_file_name).await {
            Ok(CopyOutcome::Completed) => OperationResult::ok(format!(
                "File '{}' renamed to '{}'.",
                file_name, new_file_name
            )),
            Ok(CopyOutcome::SourceRetained) => OperationResult::ok(format!(
                "File renamed to '{}', but the old copy '{}' could not be removed.",
                new_file_name, file_name
            )),
            Ok(CopyOutcome::CopyFailed) => OperationResult::fail(format!(
                "Could not rename '{}': the copy did not complete.",
                file_name
            )),
            Ok(CopyOutcome::TimedOut) => OperationResult::fail(format!(
                "Renaming '{}' timed out while waiting for the copy to finish.",
                file_name
            )),
            Err(err) => {
                OperationResult::fail(format!("Could not rename '{}': {}", file_name, err))
            }
        }
    }

    async fn signed_image_url(&self, file_name: &str) -> Option<String> {
        match self.repository.blob_exists(file_name).await {
            Ok(true) => {}
            Ok(false) => return None,
            Err(err) => {
                warn!(file = %file_name, error = %err, "existence check failed");
                return None;
            }
        }

        match self
            .repository
            .signed_read_url(file_name, SIGNED_URL_TTL)
            .await
        {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(file = %file_name, error = %err, "signed URL issuance failed");
                None
            }
        }
    }
}

/// Drop every codepoint above 127. Descriptions are ASCII-only by policy;
/// offending characters are dropped silently rather than rejected.
fn strip_non_ascii(input: &str) -> String {
    input.chars().filter(|c| (*c as u32) <= 127).collect()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::services::MemoryBlobRepository;

    fn workflows(repository: MemoryBlobRepository) -> BlobWorkflows {
        BlobWorkflows::new(Arc::new(repository))
    }

    fn jpeg_bytes() -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(4, 4));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Jpeg)
            .expect("encode jpeg fixture");
        buf.into_inner()
    }

    /// An uncompressed BMP comfortably past the 5 MiB ceiling.
    fn oversized_image_bytes() -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(1400, 1400));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Bmp)
            .expect("encode bmp fixture");
        buf.into_inner()
    }

    fn upload(name: &str, content: Vec<u8>, description: &str) -> UploadData {
        UploadData::new(
            name.to_string(),
            content,
            "image/jpeg".to_string(),
            description.to_string(),
        )
    }

    async fn seed(service: &BlobWorkflows, name: &str, description: &str) {
        service
            .upload_file(upload(name, jpeg_bytes(), description))
            .await
            .expect("seed upload");
    }

    #[tokio::test]
    async fn upload_then_list_returns_exact_description() {
        let service = workflows(MemoryBlobRepository::new());
        seed(&service, "cat.jpg", "a cat").await;

        let entries = service.list_files().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "cat.jpg");
        assert_eq!(entries[0].description, "a cat");
    }

    #[tokio::test]
    async fn upload_strips_non_ascii_from_description() {
        let service = workflows(MemoryBlobRepository::new());
        seed(&service, "cat.jpg", "a cát").await;

        let entries = service.list_files().await.unwrap();
        assert_eq!(entries[0].description, "a ct");
    }

    #[tokio::test]
    async fn upload_rejects_empty_file() {
        let service = workflows(MemoryBlobRepository::new());
        let result = service.upload_file(upload("cat.jpg", Vec::new(), "a cat")).await;
        assert_eq!(result, Err(UploadError::EmptyFile));
    }

    #[tokio::test]
    async fn upload_rejects_undecodable_content() {
        let service = workflows(MemoryBlobRepository::new());
        let result = service
            .upload_file(upload("cat.jpg", b"not an image".to_vec(), "a cat"))
            .await;
        assert_eq!(result, Err(UploadError::NotAnImage));
    }

    #[tokio::test]
    async fn upload_rejects_oversized_file() {
        let service = workflows(MemoryBlobRepository::new());
        let result = service
            .upload_file(upload("big.jpg", oversized_image_bytes(), "too big"))
            .await;
        assert_eq!(result, Err(UploadError::TooLarge));
    }

    #[tokio::test]
    async fn upload_rejects_non_jpeg_extension() {
        let service = workflows(MemoryBlobRepository::new());
        let result = service
            .upload_file(upload("cat.png", jpeg_bytes(), "a cat"))
            .await;
        assert_eq!(result, Err(UploadError::UnsupportedExtension));
    }

    #[tokio::test]
    async fn upload_rejects_blank_description() {
        let service = workflows(MemoryBlobRepository::new());
        let result = service.upload_file(upload("cat.jpg", jpeg_bytes(), "   ")).await;
        assert_eq!(result, Err(UploadError::MissingDescription));
    }

    #[tokio::test]
    async fn upload_accepts_uppercase_jpeg_extension() {
        let service = workflows(MemoryBlobRepository::new());
        service
            .upload_file(upload("CAT.JPEG", jpeg_bytes(), "a cat"))
            .await
            .expect("upload");
    }

    #[tokio::test]
    async fn rename_to_same_name_fails_and_touches_nothing() {
        let repository = MemoryBlobRepository::new();
        let service = workflows(repository);
        seed(&service, "photo.jpg", "a photo").await;

        let result = service.rename_file("photo.jpg", "PHOTO.JPG").await;
        assert!(!result.success);
        assert!(service.download_file("photo.jpg").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rename_to_existing_name_fails_and_leaves_both() {
        let service = workflows(MemoryBlobRepository::new());
        seed(&service, "a.jpg", "first").await;
        seed(&service, "b.jpg", "second").await;

        let result = service.rename_file("a.jpg", "b.jpg").await;
        assert!(!result.success);

        let a = service.download_file("a.jpg").await.unwrap().unwrap();
        let b = service.download_file("b.jpg").await.unwrap().unwrap();
        assert_eq!(a.content, jpeg_bytes());
        assert_eq!(b.content, jpeg_bytes());
    }

    #[tokio::test]
    async fn rename_of_missing_source_fails_without_creating_destination() {
        let service = workflows(MemoryBlobRepository::new());

        let result = service.rename_file("ghost.jpg", "real.jpg").await;
        assert!(!result.success);
        assert!(service.download_file("real.jpg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn successful_rename_moves_bytes_and_metadata() {
        let service = workflows(MemoryBlobRepository::new());
        seed(&service, "old.jpg", "the photo").await;

        let result = service.rename_file("old.jpg", "new.jpg").await;
        assert!(result.success, "{}", result.message);

        assert!(service.download_file("old.jpg").await.unwrap().is_none());
        let moved = service.download_file("new.jpg").await.unwrap().unwrap();
        assert_eq!(moved.content, jpeg_bytes());

        let entries = service.list_files().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].description, "the photo");
    }

    #[tokio::test(start_paused = true)]
    async fn rename_survives_a_slow_copy() {
        let service = workflows(MemoryBlobRepository::with_copy_delay(5));
        seed(&service, "slow.jpg", "slow copy").await;

        let result = service.rename_file("slow.jpg", "done.jpg").await;
        assert!(result.success, "{}", result.message);
        assert!(service.download_file("done.jpg").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn rename_times_out_when_copy_never_completes() {
        // 500 pending polls at 500 ms is far past the 60 s deadline.
        let service = workflows(MemoryBlobRepository::with_copy_delay(500));
        seed(&service, "stuck.jpg", "stuck copy").await;

        let result = service.rename_file("stuck.jpg", "never.jpg").await;
        assert!(!result.success);
        assert!(result.message.contains("timed out"), "{}", result.message);
        assert!(service.download_file("stuck.jpg").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rename_reports_failure_when_copy_fails() {
        let service = workflows(MemoryBlobRepository::with_failing_copies());
        seed(&service, "bad.jpg", "bad copy").await;

        let result = service.rename_file("bad.jpg", "other.jpg").await;
        assert!(!result.success);
        assert!(
            result.message.contains("did not complete"),
            "{}",
            result.message
        );
        assert!(service.download_file("bad.jpg").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rename_reports_partial_success_when_source_delete_fails() {
        let service = workflows(MemoryBlobRepository::with_failing_deletes());
        seed(&service, "sticky.jpg", "sticky").await;

        let result = service.rename_file("sticky.jpg", "moved.jpg").await;
        assert!(result.success);
        assert!(
            result.message.contains("could not be removed"),
            "{}",
            result.message
        );
        assert!(service.download_file("moved.jpg").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let service = workflows(MemoryBlobRepository::new());
        seed(&service, "gone.jpg", "soon gone").await;

        assert!(service.delete_file("gone.jpg").await);
        assert!(!service.delete_file("gone.jpg").await);
        assert!(!service.delete_file("never-existed.jpg").await);
    }

    #[tokio::test]
    async fn edit_description_of_missing_object_is_a_noop() {
        let service = workflows(MemoryBlobRepository::new());
        assert!(!service.edit_description("ghost.jpg", "anything").await);
    }

    #[tokio::test]
    async fn edit_description_strips_non_ascii_and_persists() {
        let service = workflows(MemoryBlobRepository::new());
        seed(&service, "cat.jpg", "old").await;

        assert!(service.edit_description("cat.jpg", "caté☃").await);

        let entries = service.list_files().await.unwrap();
        assert_eq!(entries[0].description, "cat");
    }

    #[tokio::test]
    async fn signed_url_refused_for_missing_object() {
        let service = workflows(MemoryBlobRepository::new());
        assert!(service.signed_image_url("ghost.jpg").await.is_none());
    }

    #[tokio::test]
    async fn signed_url_issued_for_existing_object() {
        let service = workflows(MemoryBlobRepository::new());
        seed(&service, "cat.jpg", "a cat").await;

        let url = service.signed_image_url("cat.jpg").await.expect("url");
        assert!(url.contains("cat.jpg"));
    }

    #[tokio::test]
    async fn search_matches_case_insensitive_substring() {
        let service = workflows(MemoryBlobRepository::new());
        seed(&service, "Holiday.jpg", "beach").await;
        seed(&service, "work.jpg", "office").await;

        let hits = service.search_files("holi").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Holiday.jpg");

        assert!(service.search_files("nothing").await.unwrap().is_empty());
    }

    #[test]
    fn strip_non_ascii_drops_only_high_codepoints() {
        assert_eq!(strip_non_ascii("plain text"), "plain text");
        assert_eq!(strip_non_ascii("café ☕"), "caf ");
        assert_eq!(strip_non_ascii("日本語"), "");
    }
}
