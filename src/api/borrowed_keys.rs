//! Borrow and return endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        page_bounds, BorrowedKey, BorrowedKeyDetails, BorrowedKeyQuery, Borrower, Files, Key,
    },
};

use super::{non_empty, parse_id, ApiKey};

/// Borrow form, as submitted by the checkout desk
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BorrowKeyRequest {
    pub building_id: String,
    #[validate(length(min = 1, message = "Borrower name is required"))]
    pub borrower_name: String,
    pub borrower_company: Option<String>,
    #[validate(length(min = 1, message = "Borrower type is required"))]
    pub borrower_type: String,
    pub borrower_email: Option<String>,
    pub borrower_phone: Option<String>,
    #[validate(length(min = 1, message = "Room number is required"))]
    pub key_room_number: String,
    #[validate(length(min = 1, message = "Key type is required"))]
    pub key_type: String,
    /// ID image as a `data:` URL
    pub image_base64: String,
    /// Signature as a `data:` URL
    pub signature_base64: String,
    /// Reservation collected by this borrow
    pub reservation_id: Option<String>,
}

/// Response wrapping a single borrow event
#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    pub message: String,
    pub data: BorrowedKey,
}

/// Paginated borrow events response
#[derive(Serialize, ToSchema)]
pub struct BorrowedKeysListResponse {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub data: Vec<BorrowedKeyDetails>,
}

#[derive(Serialize, ToSchema)]
pub struct KeyStatusResponse {
    pub key_id: String,
    pub borrowed: bool,
}

fn parse_optional_id(field: &str, value: Option<String>) -> AppResult<Option<Uuid>> {
    non_empty(value).map(|v| parse_id(field, &v)).transpose()
}

/// Borrow a key
#[utoipa::path(
    post,
    path = "/borrowed-keys",
    tag = "borrowed-keys",
    security(("api_key" = [])),
    request_body(content = BorrowKeyRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Key borrowed", body = BorrowResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Key already borrowed")
    )
)]
pub async fn borrow_key(
    State(state): State<crate::AppState>,
    _: ApiKey,
    Form(request): Form<BorrowKeyRequest>,
) -> AppResult<(StatusCode, Json<BorrowResponse>)> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let building_id = parse_id("building_id", &request.building_id)?;
    let reservation_id = parse_optional_id("reservation_id", request.reservation_id)?;
    let key = Key::new(building_id, request.key_room_number, request.key_type);

    // Refuse before uploading anything
    if state.services.borrowed_keys.is_borrowed(&key.id).await? {
        return Err(AppError::AlreadyBorrowed(format!("Key {} is already borrowed", key.id)));
    }

    let borrower = Borrower::new(
        request.borrower_name,
        request.borrower_type,
        non_empty(request.borrower_company),
        non_empty(request.borrower_email),
        non_empty(request.borrower_phone),
    );
    borrower.require_contact()?;

    let files = Files {
        image_filename: state.services.storage.store_data_url(&request.image_base64).await?,
        signature_filename: state.services.storage.store_data_url(&request.signature_base64).await?,
    };

    let borrowed_key = state
        .services
        .borrowed_keys
        .borrow(&key, &borrower, files, reservation_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BorrowResponse {
            message: "Borrowed key successfully".to_string(),
            data: borrowed_key,
        }),
    ))
}

/// Return a borrowed key
#[utoipa::path(
    post,
    path = "/borrowed-keys/return/{id}",
    tag = "borrowed-keys",
    security(("api_key" = [])),
    params(("id" = Uuid, Path, description = "Borrow event ID")),
    responses(
        (status = 200, description = "Key returned", body = BorrowResponse),
        (status = 404, description = "Borrow event not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_key(
    State(state): State<crate::AppState>,
    _: ApiKey,
    Path(id): Path<String>,
) -> AppResult<Json<BorrowResponse>> {
    let id = parse_id("id", &id)?;
    let borrowed_key = state.services.borrowed_keys.return_key(id).await?;
    Ok(Json(BorrowResponse {
        message: "Key returned".to_string(),
        data: borrowed_key,
    }))
}

/// List borrow events, newest first
#[utoipa::path(
    get,
    path = "/borrowed-keys",
    tag = "borrowed-keys",
    security(("api_key" = [])),
    params(BorrowedKeyQuery),
    responses(
        (status = 200, description = "Borrow events", body = BorrowedKeysListResponse)
    )
)]
pub async fn list_borrowed_keys(
    State(state): State<crate::AppState>,
    _: ApiKey,
    Query(query): Query<BorrowedKeyQuery>,
) -> AppResult<Json<BorrowedKeysListResponse>> {
    let (limit, offset) = page_bounds(query.limit, query.offset);
    let (data, total) = state.services.borrowed_keys.list(&query).await?;
    Ok(Json(BorrowedKeysListResponse {
        total,
        limit,
        offset,
        data,
    }))
}

/// Get a borrow event with its key and borrower
#[utoipa::path(
    get,
    path = "/borrowed-keys/{id}",
    tag = "borrowed-keys",
    security(("api_key" = [])),
    params(("id" = Uuid, Path, description = "Borrow event ID")),
    responses(
        (status = 200, description = "Borrow event", body = BorrowedKeyDetails),
        (status = 404, description = "Borrow event not found")
    )
)]
pub async fn get_borrowed_key(
    State(state): State<crate::AppState>,
    _: ApiKey,
    Path(id): Path<String>,
) -> AppResult<Json<BorrowedKeyDetails>> {
    let id = parse_id("id", &id)?;
    let details = state.services.borrowed_keys.get(id).await?;
    Ok(Json(details))
}

/// Whether a key is currently out
#[utoipa::path(
    get,
    path = "/borrowed-keys/status/{key_id}",
    tag = "borrowed-keys",
    security(("api_key" = [])),
    params(("key_id" = String, Path, description = "Key ID")),
    responses(
        (status = 200, description = "Key status", body = KeyStatusResponse)
    )
)]
pub async fn key_status(
    State(state): State<crate::AppState>,
    _: ApiKey,
    Path(key_id): Path<String>,
) -> AppResult<Json<KeyStatusResponse>> {
    let borrowed = state.services.borrowed_keys.is_borrowed(&key_id).await?;
    Ok(Json(KeyStatusResponse { key_id, borrowed }))
}
