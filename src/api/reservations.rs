//! Reservation endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Form, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        page_bounds, Borrower, Key, NewReservation, Reservation, ReservationDetails,
        ReservationQuery,
    },
};

use super::{non_empty, parse_id, ApiKey};

/// Reservation form
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReservationRequest {
    pub building_id: String,
    #[validate(length(min = 1, message = "Room number is required"))]
    pub key_room_number: String,
    #[validate(length(min = 1, message = "Key type is required"))]
    pub key_type: String,
    pub description: String,
    /// Without a name the reservation carries no borrower
    pub borrower_name: Option<String>,
    pub borrower_company: Option<String>,
    pub borrower_type: Option<String>,
    pub borrower_email: Option<String>,
    pub borrower_phone: Option<String>,
    /// RFC 3339 timestamp
    pub collection_at: String,
    #[validate(length(min = 1, message = "reservation_by is required"))]
    pub reservation_by: String,
    /// RFC 3339 timestamp
    pub return_at: Option<String>,
}

/// Response wrapping a single reservation
#[derive(Serialize, ToSchema)]
pub struct ReservationResponse {
    pub message: String,
    pub data: Reservation,
}

/// Paginated reservations response
#[derive(Serialize, ToSchema)]
pub struct ReservationsListResponse {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub data: Vec<ReservationDetails>,
}

fn parse_timestamp(field: &str, value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::Validation(format!("{} must be an RFC 3339 timestamp", field)))
}

/// Create a reservation
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    security(("api_key" = [])),
    request_body(content = CreateReservationRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Reservation created", body = ReservationResponse),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn create_reservation(
    State(state): State<crate::AppState>,
    _: ApiKey,
    Form(request): Form<CreateReservationRequest>,
) -> AppResult<(StatusCode, Json<ReservationResponse>)> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let data = NewReservation {
        description: request.description,
        collection_at: parse_timestamp("collection_at", &request.collection_at)?,
        reservation_by: request.reservation_by,
        return_at: non_empty(request.return_at)
            .map(|v| parse_timestamp("return_at", &v))
            .transpose()?,
    };

    let building_id = parse_id("building_id", &request.building_id)?;
    let key = Key::new(building_id, request.key_room_number, request.key_type);
    let borrower = non_empty(request.borrower_name).map(|name| {
        Borrower::new(
            name,
            non_empty(request.borrower_type).unwrap_or_default(),
            non_empty(request.borrower_company),
            non_empty(request.borrower_email),
            non_empty(request.borrower_phone),
        )
    });

    let reservation = state
        .services
        .reservations
        .create(&key, borrower.as_ref(), data)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ReservationResponse {
            message: "Reservation created successfully".to_string(),
            data: reservation,
        }),
    ))
}

/// List reservations, newest first
#[utoipa::path(
    get,
    path = "/reservations",
    tag = "reservations",
    security(("api_key" = [])),
    params(ReservationQuery),
    responses(
        (status = 200, description = "Reservations", body = ReservationsListResponse)
    )
)]
pub async fn list_reservations(
    State(state): State<crate::AppState>,
    _: ApiKey,
    Query(query): Query<ReservationQuery>,
) -> AppResult<Json<ReservationsListResponse>> {
    let (limit, offset) = page_bounds(query.limit, query.offset);
    let (data, total) = state.services.reservations.list(&query).await?;
    Ok(Json(ReservationsListResponse {
        total,
        limit,
        offset,
        data,
    }))
}

/// Delete a reservation
#[utoipa::path(
    delete,
    path = "/reservations/{id}",
    tag = "reservations",
    security(("api_key" = [])),
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation deleted", body = ReservationResponse),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn delete_reservation(
    State(state): State<crate::AppState>,
    _: ApiKey,
    Path(id): Path<String>,
) -> AppResult<Json<ReservationResponse>> {
    let id = parse_id("id", &id)?;
    let reservation = state.services.reservations.delete(id).await?;
    Ok(Json(ReservationResponse {
        message: "Reservation deleted".to_string(),
        data: reservation,
    }))
}

/// Earliest uncollected reservation for a key
#[utoipa::path(
    get,
    path = "/reservations/open/{key_id}",
    tag = "reservations",
    security(("api_key" = [])),
    params(("key_id" = String, Path, description = "Key ID")),
    responses(
        (status = 200, description = "Open reservation", body = Reservation),
        (status = 404, description = "No open reservation")
    )
)]
pub async fn open_reservation(
    State(state): State<crate::AppState>,
    _: ApiKey,
    Path(key_id): Path<String>,
) -> AppResult<Json<Reservation>> {
    state
        .services
        .reservations
        .open_for_key(&key_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No open reservation for key {}", key_id)))
}
