//! Rows backing the storage account: containers and the blobs inside them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A named grouping of blobs within the storage account.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Container {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Storage account the container belongs to.
    pub account: String,

    /// Container name, unique within the account.
    pub name: String,

    /// When this container was created.
    pub created_at: DateTime<Utc>,
}

/// One named byte object within a container.
///
/// The row stores bookkeeping only; payload bytes live on disk and the
/// governance tags live in `blob_metadata`.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Blob {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Foreign key linking to the parent container.
    pub container_id: Uuid,

    /// Blob name, unique within the container.
    pub name: String,

    /// Payload size in bytes.
    pub size_bytes: i64,

    /// MD5 digest of the payload, for integrity checks.
    pub etag: String,

    /// Timestamp when the blob was created.
    pub created_at: DateTime<Utc>,

    /// Timestamp when the blob or its metadata last changed.
    pub last_modified: DateTime<Utc>,
}
