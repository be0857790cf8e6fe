//! Object storage backends.
//!
//! Uploaded files are written here before their metadata row is inserted.
//! Production uses an S3-compatible bucket (Cloudflare R2); tests plug in an
//! in-memory backend through the same trait.

use std::{io, path::Path};

use async_trait::async_trait;
use aws_sdk_s3::{
    config::{BehaviorVersion, Credentials, Region},
    error::{DisplayErrorContext, SdkError},
    operation::put_object::PutObjectError,
    primitives::{ByteStream, ByteStreamError},
    types::ObjectCannedAcl,
};
use log::{debug, info};

use crate::config::StorageConfig;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to read object body: {0}")]
    Body(#[source] ByteStreamError),

    #[error("put object failed: {}", DisplayErrorContext(.0))]
    Put(#[source] Box<SdkError<PutObjectError>>),

    #[error("object storage i/o failed: {0}")]
    Io(#[from] io::Error),
}

/// Write side of an object store.
///
/// Objects written through this trait are always publicly readable, their
/// public URL is derived from the key by the caller.
#[async_trait]
pub trait ObjectStorage: Send + Sync + 'static {
    /// Streams the file at `body` into `key`, replacing any existing object.
    async fn put(&self, key: &str, body: &Path, content_type: &str)
        -> Result<(), StorageError>;
}

/// S3 client pointed at an R2 (or any S3-compatible) endpoint.
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.as_str(),
            config.secret_key.as_str(),
            None,
            None,
            "imgupper",
        );

        // R2 ignores the region but the signer needs one
        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new("auto"))
            .endpoint_url(config.endpoint.as_str())
            .force_path_style(true)
            .build();

        info!(
            "object storage ready: bucket {} at {}",
            config.bucket, config.endpoint
        );

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put(
        &self,
        key: &str,
        body: &Path,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let stream = ByteStream::from_path(body)
            .await
            .map_err(StorageError::Body)?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(stream)
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|x| StorageError::Put(Box::new(x)))?;

        debug!("stored {key} in {}", self.bucket);

        Ok(())
    }
}
