//! Ingestion workflow: persist a dataset + metadata-file pair into the
//! validated-data container and tag both blobs with governance metadata.
//!
//! The two upload+tag sequences are independent and non-atomic: if the
//! dataset lands but the metadata file collides (or the reverse), nothing is
//! rolled back. That matches the platform's behaviour to date; downstream
//! review tooling reconciles orphaned halves.

use crate::services::blob_store::{BlobStore, BlobStoreError, BlobStoreResult};
use bytes::Bytes;
use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};
use tracing::{info, warn};

pub const CLASSIFICATION_KEY: &str = "data_security_classification";
pub const CATEGORY_KEY: &str = "data_category";
pub const DICTIONARY_FILENAME_KEY: &str = "data_dictionary_filename";
pub const APPROVAL_KEY: &str = "data_approval";

const CLASSIFICATION_INTERNAL: &str = "INTERNAL";
const APPROVAL_PENDING: &str = "PENDING";

/// Result of one import attempt. A name collision is an expected, user-facing
/// outcome, not an error; storage faults travel on the `Err` side instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    Created { dataset_name: String },
    Duplicate { conflicting_name: String },
}

impl IngestOutcome {
    /// Human-readable outcome string surfaced by the import endpoint.
    pub fn message(&self) -> String {
        match self {
            IngestOutcome::Created { dataset_name } => {
                format!("{} successfully uploaded", dataset_name)
            }
            IngestOutcome::Duplicate { conflicting_name } => {
                format!("{} already exists", conflicting_name)
            }
        }
    }
}

/// Orchestrates dataset persistence against an injected blob store.
#[derive(Clone)]
pub struct IngestionService {
    store: Arc<dyn BlobStore>,
    validated_container: String,
    op_timeout: Duration,
}

impl IngestionService {
    pub fn new(
        store: Arc<dyn BlobStore>,
        validated_container: impl Into<String>,
        op_timeout: Duration,
    ) -> Self {
        Self {
            store,
            validated_container: validated_container.into(),
            op_timeout,
        }
    }

    /// Bound a single storage call with the configured timeout.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = BlobStoreResult<T>>,
    ) -> BlobStoreResult<T> {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(BlobStoreError::Timeout(self.op_timeout)),
        }
    }

    /// Merge governance fields into a blob's existing metadata and write the
    /// merged set back. Read-modify-write, so prior keys survive.
    async fn tag_blob(
        &self,
        name: &str,
        fields: &[(&str, &str)],
    ) -> BlobStoreResult<()> {
        let mut metadata: HashMap<String, String> = self
            .bounded(self.store.get_blob_metadata(&self.validated_container, name))
            .await?;
        for (key, value) in fields {
            metadata.insert((*key).to_string(), (*value).to_string());
        }
        self.bounded(
            self.store
                .set_blob_metadata(&self.validated_container, name, metadata),
        )
        .await
    }

    /// Persist a dataset and its metadata file into the validated container.
    ///
    /// Uploads are create-if-absent; the first name collision stops the
    /// workflow and is reported as [`IngestOutcome::Duplicate`] naming the
    /// conflicting blob. Anything already uploaded by then stays put.
    pub async fn persist_dataset(
        &self,
        dataset: Bytes,
        dataset_name: &str,
        metadata: Bytes,
        metadata_name: &str,
        category: &str,
    ) -> BlobStoreResult<IngestOutcome> {
        info!("persisting {}", dataset_name);

        if !self
            .bounded(self.store.container_exists(&self.validated_container))
            .await?
        {
            self.bounded(self.store.create_container(&self.validated_container))
                .await?;
        }

        match self
            .bounded(
                self.store
                    .upload_blob(&self.validated_container, dataset_name, dataset, false),
            )
            .await
        {
            Ok(()) => {}
            Err(BlobStoreError::BlobAlreadyExists { name, .. }) => {
                warn!("DUPLICATE -> {} has previously been uploaded", name);
                return Ok(IngestOutcome::Duplicate {
                    conflicting_name: name,
                });
            }
            Err(err) => return Err(err),
        }
        self.tag_blob(
            dataset_name,
            &[
                (CLASSIFICATION_KEY, CLASSIFICATION_INTERNAL),
                (CATEGORY_KEY, category),
                (DICTIONARY_FILENAME_KEY, metadata_name),
                (APPROVAL_KEY, APPROVAL_PENDING),
            ],
        )
        .await?;

        match self
            .bounded(
                self.store
                    .upload_blob(&self.validated_container, metadata_name, metadata, false),
            )
            .await
        {
            Ok(()) => {}
            Err(BlobStoreError::BlobAlreadyExists { name, .. }) => {
                warn!("DUPLICATE -> {} has previously been uploaded", name);
                return Ok(IngestOutcome::Duplicate {
                    conflicting_name: name,
                });
            }
            Err(err) => return Err(err),
        }
        // The dictionary-filename tag only makes sense on the dataset blob.
        self.tag_blob(
            metadata_name,
            &[
                (CLASSIFICATION_KEY, CLASSIFICATION_INTERNAL),
                (CATEGORY_KEY, category),
                (APPROVAL_KEY, APPROVAL_PENDING),
            ],
        )
        .await?;

        Ok(IngestOutcome::Created {
            dataset_name: dataset_name.to_string(),
        })
    }
}
