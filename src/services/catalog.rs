//! Asset catalog: lookup and listing of known data-asset imports.
//!
//! The catalog sits behind a trait so the seeded in-memory version can be
//! swapped for a persistent store without touching the HTTP layer.

use crate::models::asset::{
    AssetStatus, Checksum, DataAsset, DataImportHistory, MetaData, Owner,
};
use chrono::Utc;

/// Read side of the catalog. The catalog is the sole owner of `DataAsset`
/// records; listing preserves insertion order and ids are unique.
pub trait AssetCatalog: Send + Sync {
    fn get_by_id(&self, id: &str) -> Option<DataAsset>;
    fn list_all(&self) -> DataImportHistory;
}

/// Fixed two-entry catalog standing in for the real data platform catalog.
pub struct MockAssetCatalog {
    assets: Vec<DataAsset>,
}

impl MockAssetCatalog {
    pub fn new() -> Self {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let assets = vec![
            DataAsset {
                id: "1".into(),
                owner: Owner {
                    name: "Olarinde Ajai".into(),
                    organisation: "Koweg".into(),
                    location: "London UK".into(),
                },
                asset_status: AssetStatus::Approved,
                meta_data: MetaData {
                    origin: "Interactive Investor, UK".into(),
                    import_date: today.clone(),
                    data_asset_type: "csv".into(),
                    data_asset_name:
                        "sipp-snapshot-00-13-05-02-2026-87a8528f-5971-4fdf-80ee-9d995697f13f.csv"
                            .into(),
                    data_asset_size: 108_970,
                    data_context: "SIPP Account Snapshot".into(),
                    checksum: Checksum {
                        algorithm: "SHA256".into(),
                        hash: "2839af5a8e59f605f610e201a5c3c150fed1d0f41c8e7b9a0e5f2c8d9b4e5a"
                            .into(),
                    },
                },
            },
            DataAsset {
                id: "2".into(),
                owner: Owner {
                    name: "Max Mustermann".into(),
                    organisation: "Mustermann AG".into(),
                    location: "Frankfurt, DE".into(),
                },
                asset_status: AssetStatus::UnderReview,
                meta_data: MetaData {
                    origin: "Charles Schwab".into(),
                    import_date: today,
                    data_asset_type: "csv".into(),
                    data_asset_name: "trading_portfolio.csv".into(),
                    data_asset_size: 108_977,
                    data_context: "Trade Portfolio Summary".into(),
                    checksum: Checksum {
                        algorithm: "SHA256".into(),
                        hash: "afa1588df1c975bd3491a5c649fbceeab7e747f2217252420e212efaedfa561e"
                            .into(),
                    },
                },
            },
        ];
        Self { assets }
    }
}

impl Default for MockAssetCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetCatalog for MockAssetCatalog {
    fn get_by_id(&self, id: &str) -> Option<DataAsset> {
        self.assets.iter().find(|asset| asset.id == id).cloned()
    }

    fn list_all(&self) -> DataImportHistory {
        DataImportHistory(self.assets.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_catalog_lists_both_assets_in_order() {
        let catalog = MockAssetCatalog::new();
        let history = catalog.list_all();
        assert_eq!(history.0.len(), 2);
        assert_eq!(history.0[0].id, "1");
        assert_eq!(history.0[1].id, "2");
    }

    #[test]
    fn get_by_id_returns_the_matching_asset() {
        let catalog = MockAssetCatalog::new();
        let asset = catalog.get_by_id("2").unwrap();
        assert_eq!(asset.id, "2");
        assert_eq!(asset.asset_status, AssetStatus::UnderReview);
    }

    #[test]
    fn unknown_id_is_none() {
        let catalog = MockAssetCatalog::new();
        assert!(catalog.get_by_id("does-not-exist").is_none());
    }
}
