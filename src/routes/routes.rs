//! Defines routes for the public data hub API.
//!
//! - `GET  /api/datahub/health`       — storage reachability probe
//! - `GET  /api/datahub/assets`       — data asset import history
//! - `POST /api/datahub/assets`       — import a dataset + metadata pair
//! - `GET  /api/datahub/assets/{id}`  — one asset by id

use crate::{
    handlers::{
        asset_handlers::{get_asset, import_asset, list_assets},
        health_handlers::health,
    },
    state::AppState,
};
use axum::{Router, routing::get};

/// Build and return the router for all data hub routes.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/datahub/health", get(health))
        .route("/api/datahub/assets", get(list_assets).post(import_asset))
        .route("/api/datahub/assets/{id}", get(get_asset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        blob_store::{BlobStore, testing::sqlite_store},
        catalog::MockAssetCatalog,
        ingestion::{APPROVAL_KEY, CATEGORY_KEY, CLASSIFICATION_KEY, IngestionService},
    };
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::Value;
    use std::{sync::Arc, time::Duration};
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn test_app() -> (Router, Arc<crate::services::blob_store::LocalBlobStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(sqlite_store(dir.path()).await);
        let state = AppState {
            blob_store: store.clone(),
            ingestion: IngestionService::new(store.clone(), "raw", Duration::from_secs(5)),
            catalog: Arc::new(MockAssetCatalog::new()),
        };
        (routes().with_state(state), store, dir)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const BOUNDARY: &str = "datahub-test-boundary";

    fn file_part(name: &str, filename: &str, payload: &[u8]) -> Vec<u8> {
        let mut part = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        part.extend_from_slice(payload);
        part.extend_from_slice(b"\r\n");
        part
    }

    fn text_part(name: &str, value: &str) -> Vec<u8> {
        format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
            .into_bytes()
    }

    fn import_request(parts: Vec<Vec<u8>>) -> Request<Body> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(&part);
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/datahub/assets")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn standard_import() -> Request<Body> {
        import_request(vec![
            file_part("asset", "portfolio.csv", b"a,b\n1,2\n"),
            file_part("assetMetadata", "portfolio.csv.meta", b"{\"fields\": 2}"),
            text_part("assetCategorisation", "trading"),
        ])
    }

    #[tokio::test]
    async fn health_reports_ok_with_storage_details() {
        let (app, _store, _dir) = test_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/datahub/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "OK");
        assert_eq!(body["storageStatus"]["accountName"], "devstoreaccount1");
        assert!(body["time"].is_string());
    }

    #[tokio::test]
    async fn health_fails_when_storage_is_unreachable() {
        let (app, store, _dir) = test_app().await;
        store.db.close().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/datahub/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        // Generic detail only; the cause stays in the logs.
        assert_eq!(body["detail"], "storage backend error");
    }

    #[tokio::test]
    async fn list_assets_returns_the_seeded_history_in_order() {
        let (app, _store, _dir) = test_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/datahub/assets")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let assets = body.as_array().unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0]["id"], "1");
        assert_eq!(assets[1]["id"], "2");
        assert_eq!(assets[1]["metaData"]["dataAssetSize"], "108977");
    }

    #[tokio::test]
    async fn get_asset_returns_the_requested_id() {
        let (app, _store, _dir) = test_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/datahub/assets/2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["id"], "2");
        assert_eq!(body["assetStatus"], "UNDER_REVIEW");
    }

    #[tokio::test]
    async fn unknown_asset_id_is_a_404_with_detail() {
        let (app, _store, _dir) = test_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/datahub/assets/99")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["detail"], "invalid identifier");
    }

    #[tokio::test]
    async fn import_accepts_and_tags_the_dataset() {
        let (app, store, _dir) = test_app().await;
        let response = app.oneshot(standard_import()).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let body = body_json(response).await;
        assert_eq!(body["status"], "202");
        assert_eq!(body["message"], "portfolio.csv successfully uploaded");

        let tags = store.get_blob_metadata("raw", "portfolio.csv").await.unwrap();
        assert_eq!(tags[CLASSIFICATION_KEY], "INTERNAL");
        assert_eq!(tags[CATEGORY_KEY], "trading");
        assert_eq!(tags[APPROVAL_KEY], "PENDING");

        let stored = store.read_blob("raw", "portfolio.csv").await.unwrap();
        assert_eq!(&stored[..], b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn duplicate_import_is_reported_as_a_soft_202() {
        let (app, _store, _dir) = test_app().await;
        let first = app.clone().oneshot(standard_import()).await.unwrap();
        assert_eq!(first.status(), StatusCode::ACCEPTED);

        let second = app.oneshot(standard_import()).await.unwrap();
        assert_eq!(second.status(), StatusCode::ACCEPTED);

        let body = body_json(second).await;
        assert_eq!(body["message"], "portfolio.csv already exists");
    }

    #[tokio::test]
    async fn import_without_categorisation_is_unprocessable() {
        let (app, _store, _dir) = test_app().await;
        let request = import_request(vec![
            file_part("asset", "portfolio.csv", b"x"),
            file_part("assetMetadata", "portfolio.csv.meta", b"y"),
        ]);
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["detail"], "missing field `assetCategorisation`");
    }

    #[tokio::test]
    async fn import_without_dataset_file_is_unprocessable() {
        let (app, _store, _dir) = test_app().await;
        let request = import_request(vec![
            file_part("assetMetadata", "portfolio.csv.meta", b"y"),
            text_part("assetCategorisation", "trading"),
        ]);
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["detail"], "missing field `asset`");
    }
}
