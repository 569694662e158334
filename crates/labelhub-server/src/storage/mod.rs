use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::{
    config::{timeout::TimeoutConfig, Credentials, Region},
    error::{DisplayErrorContext, SdkError},
    primitives::ByteStream,
    Client,
};
use tracing::{debug, info, instrument};

use crate::deletion::{ObjectStore, StoreError};

pub mod config;

/// S3-compatible storage holding uploaded dataset files
#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
}

impl Storage {
    pub async fn new(config: config::StorageConfig) -> Result<Self> {
        debug!(
            endpoint = ?config.endpoint,
            region = %config.region,
            bucket = %config.bucket,
            path_style = config.path_style,
            operation_timeout_secs = config.operation_timeout_secs,
            "Initializing storage"
        );

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "labelhub-storage",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style)
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(config.operation_timeout())
                    .build(),
            );

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        info!("Storage client initialized for bucket: {}", config.bucket);

        Ok(Self {
            client,
            bucket: config.bucket,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    #[instrument(skip(self, data))]
    pub async fn upload(&self, key: &str, data: Vec<u8>, content_type: Option<&str>) -> Result<()> {
        debug!("Uploading {} bytes to s3://{}/{}", data.len(), self.bucket, key);

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data));

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        request.send().await.context("Failed to upload to S3")?;

        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn exists(&self, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if status_code(&e) == Some(404) => Ok(false),
            Err(e) => Err(anyhow!(
                "Failed to check S3 object existence: {}",
                DisplayErrorContext(&e)
            )),
        }
    }
}

fn status_code<E>(err: &SdkError<E>) -> Option<u16> {
    err.raw_response().map(|response| response.status().as_u16())
}

/// Map an SDK failure onto the deletion protocol's store errors.
///
/// Returns `None` for a missing key, which deletion treats as success.
fn classify_delete_error<E>(err: SdkError<E>) -> Option<StoreError>
where
    E: std::error::Error + Send + Sync + 'static,
{
    match status_code(&err) {
        Some(404) => return None,
        Some(status) if status >= 500 => {
            return Some(StoreError::Unavailable(DisplayErrorContext(&err).to_string()))
        },
        _ => {},
    }

    Some(match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            StoreError::Unavailable(DisplayErrorContext(&err).to_string())
        },
        other => StoreError::Rejected(DisplayErrorContext(&other).to_string()),
    })
}

#[async_trait]
impl ObjectStore for Storage {
    #[instrument(skip(self))]
    async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
        debug!("Deleting s3://{}/{}", self.bucket, key);

        match self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => match classify_delete_error(e) {
                None => {
                    debug!(key, "Object already absent");
                    Ok(())
                },
                Some(err) => Err(err),
            },
        }
    }
}
