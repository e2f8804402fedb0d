use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::Region, error::SdkError, presigning::PresigningConfig, primitives::ByteStream,
    types::MetadataDirective, Client,
};
use percent_encoding::utf8_percent_encode;
use tracing::debug;

use crate::{
    application::repositories::blob_repository::{BlobRepository, DESCRIPTION_KEY, NO_DESCRIPTION},
    domain::{
        config::AppConfig,
        models::blob::{BlobContent, BlobEntry, CopyStatus},
    },
    services::error::StorageError,
};

/// Characters escaped when a key is embedded in a CopySource header.
const COPY_SOURCE_ENCODE_SET: percent_encoding::AsciiSet = percent_encoding::NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// S3-compatible backend bound to one bucket.
pub struct S3BlobRepository {
    client: Client,
    bucket: String,
}

impl S3BlobRepository {
    pub async fn new(config: &AppConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        // Path-style addressing so custom endpoints (minio and friends)
        // resolve without per-bucket DNS.
        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if config.endpoint_url.is_some() {
            builder = builder.force_path_style(true);
        }

        debug!(bucket = %config.bucket, "created S3 blob repository");

        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        }
    }

    /// Create the bucket when it does not exist yet; an already-existing
    /// bucket is a normal outcome, not an error.
    async fn ensure_bucket(&self) -> Result<(), StorageError> {
        match self.client.create_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(()),
            Err(err) => match err.as_service_error() {
                Some(service_error)
                    if service_error.is_bucket_already_owned_by_you()
                        || service_error.is_bucket_already_exists() =>
                {
                    Ok(())
                }
                _ => Err(request_error("create_bucket", &err)),
            },
        }
    }

    fn copy_source(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.bucket,
            utf8_percent_encode(key, &COPY_SOURCE_ENCODE_SET)
        )
    }
}

#[async_trait]
impl BlobRepository for S3BlobRepository {
    async fn list_blobs(&self) -> Result<Vec<BlobEntry>, StorageError> {
        let mut entries = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self.client.list_objects_v2().bucket(&self.bucket);
            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }
            let response = request
                .send()
                .await
                .map_err(|err| request_error("list_objects_v2", &err))?;

            if let Some(contents) = response.contents {
                for object in contents {
                    let Some(name) = object.key else { continue };
                    let last_modified = object.last_modified.and_then(|modified| {
                        chrono::DateTime::from_timestamp(
                            modified.secs(),
                            modified.subsec_nanos(),
                        )
                    });
                    let metadata = self.blob_metadata(&name).await?;
                    let description = metadata
                        .get(DESCRIPTION_KEY)
                        .cloned()
                        .unwrap_or_else(|| NO_DESCRIPTION.to_string());
                    entries.push(BlobEntry {
                        name,
                        description,
                        last_modified,
                    });
                }
            }

            continuation_token = response.next_continuation_token;
            if continuation_token.is_none() {
                break;
            }
        }

        Ok(entries)
    }

    async fn upload_blob(
        &self,
        name: &str,
        content: Vec<u8>,
        content_type: &str,
        description: &str,
    ) -> Result<(), StorageError> {
        self.ensure_bucket().await?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .content_type(content_type)
            .body(ByteStream::from(content))
            .send()
            .await
            .map_err(|err| request_error("put_object", &err))?;

        // Metadata lands in a second request; a failure here leaves the
        // object stored without a description.
        let mut metadata = HashMap::new();
        metadata.insert(DESCRIPTION_KEY.to_string(), description.to_string());
        self.set_blob_metadata(name, metadata).await
    }

    async fn download_blob(&self, name: &str) -> Result<Option<BlobContent>, StorageError> {
        match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
        {
            Ok(output) => {
                let content_type = output
                    .content_type
                    .clone()
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let content = output
                    .body
                    .collect()
                    .await
                    .map_err(|err| StorageError::NetworkError(format!("read body: {}", err)))?
                    .into_bytes()
                    .to_vec();
                Ok(Some(BlobContent {
                    content,
                    content_type,
                }))
            }
            Err(err) => match err.as_service_error() {
                Some(service_error) if service_error.is_no_such_key() => Ok(None),
                _ => Err(request_error("get_object", &err)),
            },
        }
    }

    async fn blob_exists(&self, name: &str) -> Result<bool, StorageError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => match err.as_service_error() {
                Some(service_error) if service_error.is_not_found() => Ok(false),
                _ => Err(request_error("head_object", &err)),
            },
        }
    }

    async fn delete_blob(&self, name: &str) -> Result<bool, StorageError> {
        // DeleteObject reports success for missing keys; the existence
        // check supplies the removed/not-found distinction.
        if !self.blob_exists(name).await? {
            return Ok(false);
        }

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
            .map_err(|err| request_error("delete_object", &err))?;

        Ok(true)
    }

    async fn blob_metadata(&self, name: &str) -> Result<HashMap<String, String>, StorageError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
        {
            Ok(output) => Ok(output.metadata.unwrap_or_default()),
            Err(err) => match err.as_service_error() {
                Some(service_error) if service_error.is_not_found() => {
                    Err(StorageError::NotFound(name.to_string()))
                }
                _ => Err(request_error("head_object", &err)),
            },
        }
    }

    async fn set_blob_metadata(
        &self,
        name: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), StorageError> {
        // S3 has no metadata-only write; the idiom is a self-copy with a
        // replaced metadata map.
        let mut request = self
            .client
            .copy_object()
            .copy_source(self.copy_source(name))
            .bucket(&self.bucket)
            .key(name)
            .metadata_directive(MetadataDirective::Replace);
        for (key, value) in &metadata {
            request = request.metadata(key, value);
        }
        request
            .send()
            .await
            .map_err(|err| request_error("copy_object", &err))?;
        Ok(())
    }

    async fn signed_read_url(
        &self,
        name: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let presigning_config = PresigningConfig::expires_in(expires_in)
            .map_err(|err| StorageError::InternalError(format!("presigning config: {}", err)))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(name)
            .presigned(presigning_config)
            .await
            .map_err(|err| request_error("presign get_object", &err))?;

        Ok(presigned.uri().to_string())
    }

    async fn start_copy(&self, source: &str, destination: &str) -> Result<(), StorageError> {
        self.client
            .copy_object()
            .copy_source(self.copy_source(source))
            .bucket(&self.bucket)
            .key(destination)
            .send()
            .await
            .map_err(|err| request_error("copy_object", &err))?;
        Ok(())
    }

    async fn copy_status(&self, destination: &str) -> Result<CopyStatus, StorageError> {
        // CopyObject only returns after the copy has completed, so the
        // status is terminal by the first poll: a present destination is a
        // finished copy, an absent one means the copy did not materialize.
        if self.blob_exists(destination).await? {
            Ok(CopyStatus::Success)
        } else {
            Ok(CopyStatus::Failed)
        }
    }
}

fn request_error<E, R>(operation: &str, err: &SdkError<E, R>) -> StorageError
where
    E: std::error::Error,
{
    let detail = match err.as_service_error() {
        Some(service_error) => service_error.to_string(),
        None => err.to_string(),
    };
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            StorageError::NetworkError(format!("{}: {}", operation, detail))
        }
        _ => StorageError::ProviderError(format!("{}: {}", operation, detail)),
    }
}
