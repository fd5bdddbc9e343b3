pub mod blob_store;
pub mod catalog;
pub mod ingestion;
