//! Object store settings for uploaded dataset files

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// Bucket the upload flow writes dataset files to.
pub const DEFAULT_UPLOAD_BUCKET: &str = "labelhub-uploads";

/// Upper bound on a single S3 call, retries included.
pub const DEFAULT_S3_OPERATION_TIMEOUT_SECS: u64 = 10;

const LOCAL_CREDENTIAL: &str = "minioadmin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Custom endpoint (MinIO); `None` means AWS
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub path_style: bool,
    pub operation_timeout_secs: u64,
}

impl StorageConfig {
    /// Read `S3_*` variables, falling back to `AWS_*` for credentials
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup.
    ///
    /// With a custom endpoint, path-style addressing and the local MinIO
    /// credentials are the defaults. Against AWS, credentials must be set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let endpoint = lookup("S3_ENDPOINT").filter(|v| !v.trim().is_empty());
        let local = endpoint.is_some();

        let credential = |primary: &str, fallback: &str| -> Result<String> {
            match lookup(primary).or_else(|| lookup(fallback)) {
                Some(value) => Ok(value),
                None if local => Ok(LOCAL_CREDENTIAL.to_string()),
                None => bail!("{} or {} must be set when S3_ENDPOINT is not", primary, fallback),
            }
        };

        let config = Self {
            region: lookup("S3_REGION").unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
            bucket: lookup("S3_BUCKET").unwrap_or_else(|| DEFAULT_UPLOAD_BUCKET.to_string()),
            access_key: credential("S3_ACCESS_KEY", "AWS_ACCESS_KEY_ID")?,
            secret_key: credential("S3_SECRET_KEY", "AWS_SECRET_ACCESS_KEY")?,
            path_style: lookup("S3_PATH_STYLE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(local),
            operation_timeout_secs: lookup("S3_OPERATION_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_S3_OPERATION_TIMEOUT_SECS),
            endpoint,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bucket.trim().is_empty() {
            bail!("S3 bucket cannot be empty");
        }
        if self.operation_timeout_secs == 0 {
            bail!("S3 operation timeout must be greater than 0");
        }
        Ok(())
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}
