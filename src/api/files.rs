//! Uploaded file download

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};

use crate::{error::AppResult, services::storage::content_type_for};

use super::ApiKey;

/// Download an uploaded ID image or signature
#[utoipa::path(
    get,
    path = "/files/{filename}",
    tag = "files",
    security(("api_key" = [])),
    params(("filename" = String, Path, description = "Stored filename")),
    responses(
        (status = 200, description = "File contents"),
        (status = 404, description = "File not found")
    )
)]
pub async fn get_file(
    State(state): State<crate::AppState>,
    _: ApiKey,
    Path(filename): Path<String>,
) -> AppResult<impl IntoResponse> {
    let bytes = state.services.storage.fetch(&filename).await?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&filename))], bytes))
}
