//! src/services/blob_store.rs
//!
//! Blob store client for the data lake storage account. The `BlobStore`
//! trait is the boundary the ingestion workflow and the health probe depend
//! on; `LocalBlobStore` is the emulator-grade implementation backed by
//! SQLite for container/blob bookkeeping and local disk for payloads,
//! sharded beneath `base_path/{account}/{container}/{shard}/{shard}/{name}`.

use crate::models::blob::{Blob, Container};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use std::{
    collections::HashMap,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("container `{0}` not found")]
    ContainerNotFound(String),
    #[error("container `{name}` invalid: {reason}")]
    InvalidContainerName { name: String, reason: String },
    #[error("blob `{name}` already exists in container `{container}`")]
    BlobAlreadyExists { container: String, name: String },
    #[error("blob `{name}` not found in container `{container}`")]
    BlobNotFound { container: String, name: String },
    #[error("invalid blob name")]
    InvalidBlobName,
    #[error("storage call exceeded {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type BlobStoreResult<T> = Result<T, BlobStoreError>;

/// Storage account details reported by the health probe.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub account_name: String,
    pub account_kind: String,
    pub sku_name: String,
    pub container_count: i64,
}

/// Operations the data hub needs from the storage account.
///
/// Kept deliberately small: existence/creation of containers, create-if-absent
/// blob upload, and full-replace metadata tagging. No retries and no partial
/// upload resume; callers see storage faults as-is.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Live reachability probe against the account.
    async fn account_info(&self) -> BlobStoreResult<AccountInfo>;

    async fn container_exists(&self, name: &str) -> BlobStoreResult<bool>;

    /// Create a container. Creating one that already exists is a no-op.
    async fn create_container(&self, name: &str) -> BlobStoreResult<()>;

    /// Upload a blob. When `overwrite` is false and a blob of that name is
    /// already present, fails with [`BlobStoreError::BlobAlreadyExists`]; the
    /// store's uniqueness check is atomic, so concurrent uploads of the same
    /// name resolve to exactly one winner.
    async fn upload_blob(
        &self,
        container: &str,
        name: &str,
        payload: Bytes,
        overwrite: bool,
    ) -> BlobStoreResult<()>;

    /// Fetch the full metadata set attached to a blob.
    async fn get_blob_metadata(
        &self,
        container: &str,
        name: &str,
    ) -> BlobStoreResult<HashMap<String, String>>;

    /// Replace the full metadata set attached to a blob. Callers that want to
    /// keep existing keys must read-modify-write.
    async fn set_blob_metadata(
        &self,
        container: &str,
        name: &str,
        metadata: HashMap<String, String>,
    ) -> BlobStoreResult<()>;
}

const MAX_BLOB_NAME_LEN: usize = 1024;
const CONTAINER_NAME_MIN_LEN: usize = 3;
const CONTAINER_NAME_MAX_LEN: usize = 63;

/// Emulator-grade blob store: SQLite rows for containers, blobs, and their
/// metadata tags; payload bytes on disk. Stands in for the remote storage
/// account when running against the development connection string.
#[derive(Clone)]
pub struct LocalBlobStore {
    /// Shared SQLite connection pool used for bookkeeping.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where blob payloads are stored.
    pub base_path: PathBuf,

    /// Storage account name, parsed from the connection string.
    pub account: String,
}

impl LocalBlobStore {
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>, account: impl Into<String>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
            account: account.into(),
        }
    }

    /// Basic name validation to avoid trivial path traversal vectors.
    ///
    /// Rejects names that begin with `/` or contain `..`, control bytes, or
    /// backslashes.
    fn ensure_blob_name_safe(&self, name: &str) -> BlobStoreResult<()> {
        if name.is_empty() || name.len() > MAX_BLOB_NAME_LEN {
            return Err(BlobStoreError::InvalidBlobName);
        }
        if name.starts_with('/') || name.contains("..") {
            return Err(BlobStoreError::InvalidBlobName);
        }
        if name
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(BlobStoreError::InvalidBlobName);
        }
        Ok(())
    }

    /// Validate container name format: 3-63 characters, lowercase letters,
    /// digits, and hyphens, starting and ending with a letter or digit.
    fn ensure_container_name_safe(&self, name: &str) -> BlobStoreResult<()> {
        let len = name.len();
        if len < CONTAINER_NAME_MIN_LEN || len > CONTAINER_NAME_MAX_LEN {
            return Err(BlobStoreError::InvalidContainerName {
                name: name.to_string(),
                reason: "must be between 3 and 63 characters".into(),
            });
        }
        if !name
            .chars()
            .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '-'))
        {
            return Err(BlobStoreError::InvalidContainerName {
                name: name.to_string(),
                reason: "allowed characters are lowercase letters, digits, and hyphens".into(),
            });
        }
        if name.starts_with('-') || name.ends_with('-') {
            return Err(BlobStoreError::InvalidContainerName {
                name: name.to_string(),
                reason: "must start and end with a lowercase letter or digit".into(),
            });
        }
        Ok(())
    }

    /// Physical base folder for a container. Does not check existence.
    fn container_root(&self, container_name: &str) -> PathBuf {
        let mut path = self.base_path.clone();
        path.push(&self.account);
        path.push(container_name);
        path
    }

    /// Two-level shard identifiers for a blob name.
    ///
    /// Uses MD5(container/name) and returns the first two bytes as lowercase
    /// hexadecimal strings (00-ff). Reduces file count per directory.
    fn blob_shards(container_name: &str, name: &str) -> (String, String) {
        let digest = md5::compute(format!("{}/{}", container_name, name));
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Fully-qualified payload path. Parent directories may not exist yet.
    fn blob_path(&self, container_name: &str, name: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::blob_shards(container_name, name);
        let mut path = self.container_root(container_name);
        path.push(shard_a);
        path.push(shard_b);
        path.push(name);
        path
    }

    /// Fetch a container row, validating its name first.
    ///
    /// Returns ContainerNotFound if missing.
    async fn fetch_container(&self, container: &str) -> BlobStoreResult<Container> {
        self.ensure_container_name_safe(container)?;
        sqlx::query_as::<_, Container>(
            "SELECT id, account, name, created_at
             FROM containers WHERE account = ? AND name = ?",
        )
        .bind(&self.account)
        .bind(container)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => BlobStoreError::ContainerNotFound(container.to_string()),
            other => BlobStoreError::Sqlx(other),
        })
    }

    /// Fetch a blob row by container and name.
    async fn fetch_blob(&self, container: &Container, name: &str) -> BlobStoreResult<Blob> {
        sqlx::query_as::<_, Blob>(
            "SELECT id, container_id, name, size_bytes, etag, created_at, last_modified
             FROM blobs WHERE container_id = ? AND name = ?",
        )
        .bind(container.id)
        .bind(name)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => BlobStoreError::BlobNotFound {
                container: container.name.clone(),
                name: name.to_string(),
            },
            other => BlobStoreError::Sqlx(other),
        })
    }

    /// Write payload bytes to disk via a temp file and atomic rename.
    async fn write_payload(&self, file_path: &Path, payload: &Bytes) -> BlobStoreResult<()> {
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            BlobStoreError::Io(io::Error::new(
                ErrorKind::Other,
                "blob path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        if let Err(err) = file.write_all(payload).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(BlobStoreError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(BlobStoreError::Io(err));
        }
        if let Err(err) = fs::rename(&tmp_path, file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(BlobStoreError::Io(err));
        }
        Ok(())
    }

    /// Read a blob's payload back from disk. Used by integrity checks and
    /// tests; not part of the `BlobStore` contract.
    pub async fn read_blob(&self, container: &str, name: &str) -> BlobStoreResult<Bytes> {
        self.ensure_blob_name_safe(name)?;
        let container_rec = self.fetch_container(container).await?;
        let blob = self.fetch_blob(&container_rec, name).await?;
        let file_path = self.blob_path(&container_rec.name, &blob.name);
        let bytes = fs::read(&file_path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                BlobStoreError::BlobNotFound {
                    container: container.to_string(),
                    name: name.to_string(),
                }
            } else {
                BlobStoreError::Io(err)
            }
        })?;
        Ok(Bytes::from(bytes))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn account_info(&self) -> BlobStoreResult<AccountInfo> {
        let container_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM containers WHERE account = ?")
                .bind(&self.account)
                .fetch_one(&*self.db)
                .await?;

        Ok(AccountInfo {
            account_name: self.account.clone(),
            account_kind: "StorageV2".into(),
            sku_name: "Standard_LRS".into(),
            container_count,
        })
    }

    async fn container_exists(&self, name: &str) -> BlobStoreResult<bool> {
        self.ensure_container_name_safe(name)?;
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM containers WHERE account = ? AND name = ?",
        )
        .bind(&self.account)
        .bind(name)
        .fetch_one(&*self.db)
        .await?;
        Ok(count > 0)
    }

    async fn create_container(&self, name: &str) -> BlobStoreResult<()> {
        self.ensure_container_name_safe(name)?;
        let container_root = self.container_root(name);
        fs::create_dir_all(&container_root).await?;

        match sqlx::query(
            "INSERT INTO containers (id, account, name, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(&self.account)
        .bind(name)
        .bind(Utc::now())
        .execute(&*self.db)
        .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                debug!("container {} already exists, ignoring", name);
                Ok(())
            }
            Err(err) => Err(BlobStoreError::Sqlx(err)),
        }
    }

    async fn upload_blob(
        &self,
        container: &str,
        name: &str,
        payload: Bytes,
        overwrite: bool,
    ) -> BlobStoreResult<()> {
        self.ensure_blob_name_safe(name)?;
        let container_rec = self.fetch_container(container).await?;

        let now = Utc::now();
        let etag = format!("{:x}", md5::compute(&payload));
        let size_bytes = payload.len() as i64;

        // An overwrite may update a pre-existing row; capture it so a failed
        // disk write can put the record back instead of erasing it.
        let prior = if overwrite {
            match self.fetch_blob(&container_rec, name).await {
                Ok(blob) => Some(blob),
                Err(BlobStoreError::BlobNotFound { .. }) => None,
                Err(err) => return Err(err),
            }
        } else {
            None
        };

        // The row insert is the uniqueness check: it must win before any
        // bytes land on disk, so a losing concurrent upload never clobbers
        // the winner's payload.
        let insert_result = if overwrite {
            sqlx::query(
                r#"
                INSERT INTO blobs (id, container_id, name, size_bytes, etag, created_at, last_modified)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(container_id, name) DO UPDATE SET
                    size_bytes = excluded.size_bytes,
                    etag = excluded.etag,
                    last_modified = excluded.last_modified
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(container_rec.id)
            .bind(name)
            .bind(size_bytes)
            .bind(&etag)
            .bind(now)
            .bind(now)
            .execute(&*self.db)
            .await
        } else {
            sqlx::query(
                "INSERT INTO blobs (id, container_id, name, size_bytes, etag, created_at, last_modified)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4())
            .bind(container_rec.id)
            .bind(name)
            .bind(size_bytes)
            .bind(&etag)
            .bind(now)
            .bind(now)
            .execute(&*self.db)
            .await
        };

        match insert_result {
            Ok(_) => {}
            Err(err) if !overwrite && is_unique_violation(&err) => {
                return Err(BlobStoreError::BlobAlreadyExists {
                    container: container.to_string(),
                    name: name.to_string(),
                });
            }
            Err(err) => return Err(BlobStoreError::Sqlx(err)),
        }

        let file_path = self.blob_path(&container_rec.name, name);
        if let Err(err) = self.write_payload(&file_path, &payload).await {
            // Roll the row back so a failed write does not leave a phantom
            // blob: delete a fresh insert, restore an overwritten record
            // (the upsert keeps the row id, and the old payload is still on
            // disk untouched).
            match prior {
                Some(prev) => {
                    let _ = sqlx::query(
                        "UPDATE blobs SET size_bytes = ?, etag = ?, last_modified = ? WHERE id = ?",
                    )
                    .bind(prev.size_bytes)
                    .bind(&prev.etag)
                    .bind(prev.last_modified)
                    .bind(prev.id)
                    .execute(&*self.db)
                    .await;
                }
                None => {
                    let _ = sqlx::query("DELETE FROM blobs WHERE container_id = ? AND name = ?")
                        .bind(container_rec.id)
                        .bind(name)
                        .execute(&*self.db)
                        .await;
                }
            }
            return Err(err);
        }

        debug!(
            "stored blob {}/{} ({} bytes, etag {})",
            container, name, size_bytes, etag
        );
        Ok(())
    }

    async fn get_blob_metadata(
        &self,
        container: &str,
        name: &str,
    ) -> BlobStoreResult<HashMap<String, String>> {
        self.ensure_blob_name_safe(name)?;
        let container_rec = self.fetch_container(container).await?;
        let blob = self.fetch_blob(&container_rec, name).await?;

        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT key, value FROM blob_metadata WHERE blob_id = ?",
        )
        .bind(blob.id)
        .fetch_all(&*self.db)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn set_blob_metadata(
        &self,
        container: &str,
        name: &str,
        metadata: HashMap<String, String>,
    ) -> BlobStoreResult<()> {
        self.ensure_blob_name_safe(name)?;
        let container_rec = self.fetch_container(container).await?;
        let blob = self.fetch_blob(&container_rec, name).await?;

        // Full-replace semantics: drop the old set, insert the new one.
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM blob_metadata WHERE blob_id = ?")
            .bind(blob.id)
            .execute(&mut *tx)
            .await?;
        for (key, value) in &metadata {
            sqlx::query("INSERT INTO blob_metadata (id, blob_id, key, value) VALUES (?, ?, ?, ?)")
                .bind(Uuid::new_v4())
                .bind(blob.id)
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query("UPDATE blobs SET last_modified = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(blob.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

#[cfg(test)]
pub(crate) mod testing {
    use super::LocalBlobStore;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::{path::Path, sync::Arc};

    /// Store backed by a single-connection in-memory SQLite database with
    /// the schema applied, payloads rooted at `base`.
    pub(crate) async fn sqlite_store(base: &Path) -> LocalBlobStore {
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        for stmt in include_str!("../../migrations/0001_init.sql")
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            sqlx::query(stmt).execute(&db).await.unwrap();
        }
        LocalBlobStore::new(Arc::new(db), base, "devstoreaccount1")
    }
}
