use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum Provider {
    #[serde(rename = "s3")]
    S3,
    #[serde(rename = "memory")]
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: Provider,
    pub bucket: String,
    pub endpoint_url: Option<String>,
    pub region: String,
    pub port: u16,
}

impl AppConfig {
    /// Build the configuration from environment variables. Missing values
    /// fall back to defaults instead of aborting startup.
    pub fn from_env() -> Self {
        let provider = match std::env::var("STORAGE_PROVIDER").as_deref() {
            Ok("memory") => Provider::Memory,
            _ => Provider::S3,
        };

        let bucket =
            std::env::var("STORAGE_BUCKET").unwrap_or_else(|_| "blob-gallery".to_string());

        let endpoint_url = std::env::var("S3_ENDPOINT_URL").ok();

        let region = std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .expect("PORT must be a valid u16");

        Self {
            provider,
            bucket,
            endpoint_url,
            region,
            port,
        }
    }
}
