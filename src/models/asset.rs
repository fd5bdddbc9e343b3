//! Represents a governed data asset in the import catalog.

use serde::{Deserialize, Serialize};

/// Integrity checksum recorded for an uploaded dataset.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Checksum {
    /// Digest algorithm name (e.g. "SHA256").
    pub algorithm: String,

    /// Hex-encoded digest of the dataset payload.
    pub hash: String,
}

/// Provenance and shape of one uploaded dataset.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetaData {
    /// Where the data came from (institution, feed, counterparty).
    pub origin: String,

    /// Date the asset was imported, `YYYY-MM-DD`.
    pub import_date: String,

    /// File format of the dataset (e.g. "csv").
    pub data_asset_type: String,

    /// Filename of the dataset as submitted.
    pub data_asset_name: String,

    /// Payload size in bytes. The wire format has always carried this as a
    /// string, so it round-trips through a string while staying numeric here.
    #[serde(with = "size_as_string")]
    pub data_asset_size: u64,

    /// Free-text description of what the dataset contains.
    pub data_context: String,

    pub checksum: Checksum,
}

/// The party that submitted an asset.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Owner {
    pub name: String,
    pub organisation: String,
    pub location: String,
}

/// Workflow state of an asset. Transitions happen in an external review
/// process; this service only reports the current value.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetStatus {
    #[serde(rename = "UNDER_REVIEW")]
    UnderReview,
    #[serde(rename = "REJECTED")]
    Rejected,
    #[serde(rename = "APPROVED")]
    Approved,
}

/// One catalogued data-asset submission: owner, review status, and the
/// metadata describing the uploaded dataset.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DataAsset {
    /// Unique identifier within the catalog.
    pub id: String,

    pub owner: Owner,

    pub asset_status: AssetStatus,

    pub meta_data: MetaData,
}

/// Ordered sequence of every known asset. The only ordering guarantee is
/// that the catalog's insertion order is preserved; ids are unique.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct DataImportHistory(pub Vec<DataAsset>);

/// `dataAssetSize` is a stringified integer on the wire.
mod size_as_string {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.trim().parse().map_err(D::Error::custom)
    }
}
