//! AWS S3 storage implementation.
//!
//! Every key is stored as its own small object under
//! `{bucket}/{prefix}/state/{key}`, so concurrent feeds never rewrite each
//! other's data.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;

use crate::error::{AppError, Result};
use crate::storage::KvStore;

/// S3-backed key/value store for cursors and delivery flags.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3Storage {
    /// Create a new S3 storage instance.
    pub fn new(client: Client, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    /// Create S3 storage from environment configuration.
    ///
    /// - `S3_BUCKET` (default: `feedcast-state`)
    /// - `S3_PREFIX` (default: `feedcast`)
    pub async fn from_env() -> Result<Self> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = Client::new(&config);

        let bucket = std::env::var("S3_BUCKET").unwrap_or_else(|_| "feedcast-state".to_string());
        let prefix = std::env::var("S3_PREFIX").unwrap_or_else(|_| "feedcast".to_string());

        Ok(Self::new(client, bucket, prefix))
    }

    fn object_key(&self, key: &str) -> String {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("state/{key}")
        } else {
            format!("{prefix}/state/{key}")
        }
    }
}

#[async_trait]
impl KvStore for S3Storage {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        let object_key = self.object_key(key);
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| AppError::Storage(e.to_string()))?;
                let value = String::from_utf8(bytes.into_bytes().to_vec()).map_err(|e| {
                    AppError::Storage(format!("s3://{}/{} is not UTF-8: {e}", self.bucket, object_key))
                })?;
                Ok(Some(value))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    log::debug!("No value at s3://{}/{}", self.bucket, object_key);
                    Ok(None)
                } else {
                    Err(AppError::Storage(service_err.to_string()))
                }
            }
        }
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        let object_key = self.object_key(key);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .body(ByteStream::from(value.as_bytes().to_vec()))
            .content_type("text/plain")
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        log::debug!("Wrote s3://{}/{}", self.bucket, object_key);
        Ok(())
    }
}
