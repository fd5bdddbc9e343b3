//! HTTP handlers for the asset catalog and import endpoints.
//! Request validation happens here; everything else is delegated to the
//! catalog and the ingestion workflow.

use crate::{errors::AppError, models::asset::{DataAsset, DataImportHistory}, state::AppState};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::warn;

/// Response envelope for `POST /api/datahub/assets`.
#[derive(Serialize)]
pub struct ImportResponse {
    pub status: String,
    pub message: String,
}

/// `GET /api/datahub/assets` — the full import history, in catalog order.
pub async fn list_assets(State(state): State<AppState>) -> Json<DataImportHistory> {
    Json(state.catalog.list_all())
}

/// `GET /api/datahub/assets/{id}`
pub async fn get_asset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DataAsset>, AppError> {
    state.catalog.get_by_id(&id).map(Json).ok_or_else(|| {
        warn!("{} is an invalid identifier", id);
        AppError::not_found("invalid identifier")
    })
}

/// One uploaded file part: original filename plus payload bytes.
struct FilePart {
    filename: String,
    payload: Bytes,
}

/// `POST /api/datahub/assets`
///
/// Multipart fields: `asset` (dataset file), `assetMetadata` (metadata
/// file), `assetCategorisation` (text). Returns 202 with a human-readable
/// outcome message; a duplicate submission is also a 202, with the message
/// naming the conflicting blob.
pub async fn import_asset(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut asset: Option<FilePart> = None;
    let mut asset_metadata: Option<FilePart> = None;
    let mut categorisation: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::unprocessable(format!("malformed multipart body: {}", err)))?
    {
        // Field accessors consume the field, so copy the part name out first.
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("asset") | Some("assetMetadata") => {
                let target = if name.as_deref() == Some("asset") {
                    &mut asset
                } else {
                    &mut asset_metadata
                };
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| AppError::unprocessable("file field is missing a filename"))?;
                let payload = field.bytes().await.map_err(|err| {
                    AppError::unprocessable(format!("failed reading upload: {}", err))
                })?;
                *target = Some(FilePart { filename, payload });
            }
            Some("assetCategorisation") => {
                let text = field.text().await.map_err(|err| {
                    AppError::unprocessable(format!("failed reading categorisation: {}", err))
                })?;
                categorisation = Some(text);
            }
            // Unknown parts are ignored rather than rejected.
            _ => {}
        }
    }

    let asset = asset.ok_or_else(|| AppError::unprocessable("missing field `asset`"))?;
    let asset_metadata =
        asset_metadata.ok_or_else(|| AppError::unprocessable("missing field `assetMetadata`"))?;
    let categorisation = categorisation
        .ok_or_else(|| AppError::unprocessable("missing field `assetCategorisation`"))?;

    let outcome = state
        .ingestion
        .persist_dataset(
            asset.payload,
            &asset.filename,
            asset_metadata.payload,
            &asset_metadata.filename,
            &categorisation,
        )
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ImportResponse {
            status: StatusCode::ACCEPTED.as_u16().to_string(),
            message: outcome.message(),
        }),
    ))
}
