mod blob_service;
mod blob_workflows;
mod logging;

pub use blob_service::{BlobService, UploadError};
pub use blob_workflows::BlobWorkflows;
pub use logging::LoggingBlobService;
