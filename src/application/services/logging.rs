use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use tracing::{error, info};

use crate::{
    application::{
        error::ApplicationError,
        services::blob_service::{BlobService, UploadError},
    },
    domain::models::blob::{BlobContent, BlobEntry, OperationResult, UploadData},
};

/// Timing/logging interceptor over the workflow layer. Wraps any
/// [`BlobService`] at construction time; every operation is delegated
/// unchanged with its elapsed time logged.
pub struct LoggingBlobService {
    inner: Arc<dyn BlobService>,
}

impl LoggingBlobService {
    pub fn new(inner: Arc<dyn BlobService>) -> Self {
        Self { inner }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[async_trait]
impl BlobService for LoggingBlobService {
    async fn list_files(&self) -> Result<Vec<BlobEntry>, ApplicationError> {
        let started = Instant::now();
        let result = self.inner.list_files().await;
        match &result {
            Ok(entries) => {
                info!(count = entries.len(), elapsed_ms = elapsed_ms(started), "list_files completed")
            }
            Err(err) => error!(error = ?err, elapsed_ms = elapsed_ms(started), "list_files failed"),
        }
        result
    }

    async fn search_files(&self, term: &str) -> Result<Vec<BlobEntry>, ApplicationError> {
        let started = Instant::now();
        let result = self.inner.search_files(term).await;
        match &result {
            Ok(entries) => info!(
                term,
                count = entries.len(),
                elapsed_ms = elapsed_ms(started),
                "search_files completed"
            ),
            Err(err) => error!(term, error = ?err, elapsed_ms = elapsed_ms(started), "search_files failed"),
        }
        result
    }

    async fn upload_file(&self, upload: UploadData) -> Result<(), UploadError> {
        let started = Instant::now();
        let file_name = upload.file_name.clone();
        let result = self.inner.upload_file(upload).await;
        match &result {
            Ok(()) => info!(file = %file_name, elapsed_ms = elapsed_ms(started), "upload_file completed"),
            Err(err) => {
                info!(file = %file_name, reason = %err, elapsed_ms = elapsed_ms(started), "upload_file rejected")
            }
        }
        result
    }

    async fn download_file(
        &self,
        file_name: &str,
    ) -> Result<Option<BlobContent>, ApplicationError> {
        let started = Instant::now();
        let result = self.inner.download_file(file_name).await;
        match &result {
            Ok(found) => info!(
                file = %file_name,
                found = found.is_some(),
                elapsed_ms = elapsed_ms(started),
                "download_file completed"
            ),
            Err(err) => {
                error!(file = %file_name, error = ?err, elapsed_ms = elapsed_ms(started), "download_file failed")
            }
        }
        result
    }

    async fn delete_file(&self, file_name: &str) -> bool {
        let started = Instant::now();
        let removed = self.inner.delete_file(file_name).await;
        info!(file = %file_name, removed, elapsed_ms = elapsed_ms(started), "delete_file completed");
        removed
    }

    async fn edit_description(&self, file_name: &str, new_description: &str) -> bool {
        let started = Instant::now();
        let updated = self.inner.edit_description(file_name, new_description).await;
        info!(file = %file_name, updated, elapsed_ms = elapsed_ms(started), "edit_description completed");
        updated
    }

    async fn rename_file(&self, file_name: &str, new_file_name: &str) -> OperationResult {
        let started = Instant::now();
        let result = self.inner.rename_file(file_name, new_file_name).await;
        info!(
            from = %file_name,
            to = %new_file_name,
            success = result.success,
            elapsed_ms = elapsed_ms(started),
            "rename_file completed"
        );
        result
    }

    async fn signed_image_url(&self, file_name: &str) -> Option<String> {
        let started = Instant::now();
        let url = self.inner.signed_image_url(file_name).await;
        info!(
            file = %file_name,
            issued = url.is_some(),
            elapsed_ms = elapsed_ms(started),
            "signed_image_url completed"
        );
        url
    }
}
