//! Shared application state handed to every handler.
//!
//! Both collaborators sit behind traits so the HTTP layer never names a
//! concrete storage backend or catalog implementation.

use crate::services::{blob_store::BlobStore, catalog::AssetCatalog, ingestion::IngestionService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub blob_store: Arc<dyn BlobStore>,
    pub ingestion: IngestionService,
    pub catalog: Arc<dyn AssetCatalog>,
}
