//! Fixtures shared by the unit tests.

use std::{
    collections::HashMap,
    io::{self, Write},
    path::Path,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use bytesize::ByteSize;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tempfile::NamedTempFile;
use time::Duration;

use crate::{
    accounts::AccountService,
    auth::TokenCodec,
    db::{FileStore, UserStore},
    model::{RegisterRequest, User},
    storage::{ObjectStorage, StorageError},
    uploads::UploadService,
};

pub const UPLOAD_LIMIT: ByteSize = ByteSize::kib(64);

/// Fresh migrated in-memory database. A single connection, since every
/// `:memory:` connection is its own database.
pub async fn pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    pool
}

/// Spools `data` to a temp file, the way the upload endpoint does.
pub fn spooled(data: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(data).unwrap();
    file.flush().unwrap();
    file
}

pub struct StoredBlob {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Object storage that keeps everything in a map and counts write attempts.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, StoredBlob>>,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `put` fail.
    pub fn fail_writes(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|x| x.content_type.clone())
    }

    pub fn data(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).map(|x| x.data.clone())
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put(
        &self,
        key: &str,
        body: &Path,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(io::Error::other("bucket unavailable").into());
        }

        let data = tokio::fs::read(body).await?;

        self.objects.lock().unwrap().insert(
            key.to_owned(),
            StoredBlob {
                data,
                content_type: content_type.to_owned(),
            },
        );

        Ok(())
    }
}

/// Everything an app under test is wired with, kept around so tests can
/// inspect it.
pub struct TestState {
    pub pool: SqlitePool,
    pub tokens: Arc<TokenCodec>,
    pub storage: Arc<MemoryStorage>,
    pub accounts: AccountService,
    pub uploads: UploadService,
}

pub async fn state() -> TestState {
    let pool = pool().await;
    let tokens = Arc::new(TokenCodec::with_ttl(b"test-secret", Duration::hours(24)));
    let storage = Arc::new(MemoryStorage::new());

    let accounts = AccountService::new(UserStore::new(pool.clone()), tokens.clone());
    let uploads = UploadService::new(
        UserStore::new(pool.clone()),
        FileStore::new(pool.clone()),
        storage.clone(),
        "https://cdn.test".into(),
    );

    TestState {
        pool,
        tokens,
        storage,
        accounts,
        uploads,
    }
}

/// Registers a user and returns it with a ready-made `Authorization` value.
pub async fn signed_up(state: &TestState, name: &str, email: &str) -> (User, String) {
    let resp = state
        .accounts
        .register(RegisterRequest {
            name: name.into(),
            email: email.into(),
            password: "secretpw".into(),
        })
        .await
        .unwrap();

    (resp.user, format!("Bearer {}", resp.token))
}

/// Initialises the full API around a [`TestState`].
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($state.pool.clone()))
                .app_data(actix_web::web::Data::from($state.tokens.clone()))
                .app_data(actix_web::web::Data::new($state.accounts.clone()))
                .app_data(actix_web::web::Data::new($state.uploads.clone()))
                .app_data(actix_web::web::Data::new(crate::media::UploadLimit(
                    crate::testing::UPLOAD_LIMIT,
                )))
                .configure(crate::api),
        )
        .await
    };
}

pub(crate) use test_app;
