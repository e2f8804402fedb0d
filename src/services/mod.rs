mod error;
mod memory_repository;
mod s3_repository;

pub use error::StorageError;
pub use memory_repository::MemoryBlobRepository;
pub use s3_repository::S3BlobRepository;

use std::sync::Arc;

use crate::{
    application::repositories::blob_repository::BlobRepository,
    domain::config::{AppConfig, Provider},
};

pub async fn create_blob_repository(config: &AppConfig) -> Arc<dyn BlobRepository> {
    match config.provider {
        Provider::S3 => Arc::new(S3BlobRepository::new(config).await),
        Provider::Memory => Arc::new(MemoryBlobRepository::new()),
    }
}
