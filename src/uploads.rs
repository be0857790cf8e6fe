use std::sync::Arc;

use bytesize::ByteSize;
use log::{info, warn};
use time::OffsetDateTime;

use crate::{
    auth::Identity,
    db::{FileStore, UserStore},
    error::ApiError,
    model::{NewUpload, StoredObject},
    storage::ObjectStorage,
    util,
};

/// Puts uploaded files into object storage and records them in the database.
///
/// The two writes are not atomic. The object is written first so a metadata
/// row never points at a missing object; if the row insert then fails the
/// object stays behind without a row and is only reported in the log.
#[derive(Clone)]
pub struct UploadService {
    users: UserStore,
    files: FileStore,
    storage: Arc<dyn ObjectStorage>,
    public_url: String,
}

impl UploadService {
    pub fn new(
        users: UserStore,
        files: FileStore,
        storage: Arc<dyn ObjectStorage>,
        public_url: String,
    ) -> Self {
        Self {
            users,
            files,
            storage,
            public_url,
        }
    }

    pub async fn upload(&self, user_id: i64, upload: NewUpload) -> Result<StoredObject, ApiError> {
        if !self.users.exists_by_id(user_id).await? {
            return Err(ApiError::NotFound("user not found"));
        }

        let key = util::storage_key(user_id, &upload.filename, OffsetDateTime::now_utc());

        self.storage
            .put(&key, upload.body.path(), &upload.content_type)
            .await?;

        let bucket_url = util::public_url(&self.public_url, &key);

        let record = self
            .files
            .create(
                user_id,
                &upload.filename,
                upload.size,
                &upload.content_type,
                &bucket_url,
            )
            .await
            .map_err(|x| {
                warn!("object {key} was stored but its metadata insert failed, it is now orphaned");
                ApiError::Persistence(x)
            })?;

        info!(
            "user {} uploaded {} ({}, {}) as file {}",
            user_id,
            record.filename,
            record.mime_type,
            ByteSize::b(record.filesize.max(0) as u64),
            record.id
        );

        Ok(record)
    }

    pub async fn fetch_mine(&self, identity: &Identity) -> Result<Vec<StoredObject>, ApiError> {
        Ok(self.files.get_by_user_id(identity.user_id).await?)
    }

    pub async fn fetch_by_id(&self, id: i64) -> Result<StoredObject, ApiError> {
        self.files
            .get_by_id(id)
            .await?
            .ok_or(ApiError::NotFound("file not found"))
    }
}
