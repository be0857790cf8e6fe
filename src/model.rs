use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tempfile::NamedTempFile;
use time::OffsetDateTime;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Metadata row of an uploaded file. The bytes themselves live in object
/// storage at `bucket_url`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StoredObject {
    pub id: i64,
    pub user_id: i64,
    pub filename: String,
    pub filesize: i64,
    pub mime_type: String,
    pub bucket_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub user: User,
}

/// A file received from a client and spooled to disk, not yet in object
/// storage. The spool file is removed when this is dropped.
#[derive(Debug)]
pub struct NewUpload {
    pub filename: String,
    pub size: i64,
    pub content_type: String,
    pub body: NamedTempFile,
}
