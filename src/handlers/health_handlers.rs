//! Health handler.
//!
//! `GET /api/datahub/health` doubles as a storage reachability probe: it
//! performs a live account-info call and only reports "OK" when that call
//! succeeds. A storage failure surfaces as an error response, never a
//! false OK.

use crate::{errors::AppError, services::blob_store::AccountInfo, state::AppState};
use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    time: String,
    #[serde(rename = "storageStatus")]
    storage_status: AccountInfo,
}

pub async fn health(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let storage_status = state.blob_store.account_info().await?;

    Ok(Json(HealthResponse {
        status: "OK".into(),
        time: Utc::now().format("%Y-%m-%d, %H:%M:%S").to_string(),
        storage_status,
    }))
}
