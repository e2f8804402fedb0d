use std::sync::Arc;

use crate::{application::services::BlobService, domain::config::Provider};

#[derive(Clone)]
pub struct AppState {
    pub blob_service: Arc<dyn BlobService>,
    pub provider: Provider,
    pub container: String,
}
