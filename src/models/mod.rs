//! Core data models for the data hub API.
//!
//! These entities describe catalogued data-asset submissions and serialize
//! as JSON via `serde` using the wire names the public API has always used.

pub mod asset;
pub mod blob;
