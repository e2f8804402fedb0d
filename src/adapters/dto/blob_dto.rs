use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::blob::BlobEntry;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BlobResponse {
    pub name: String,
    pub description: String,
    #[serde(rename = "lastModified")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl From<BlobEntry> for BlobResponse {
    fn from(entry: BlobEntry) -> Self {
        Self {
            name: entry.name,
            description: entry.description,
            last_modified: entry.last_modified,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "newFileName")]
    pub new_file_name: String,
}

#[derive(Debug, Deserialize)]
pub struct EditDescriptionRequest {
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub description: String,
}
