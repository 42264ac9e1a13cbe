//! Building endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Form, Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        building::{Building, BuildingQuery, CreateBuilding},
        page_bounds,
    },
};

use super::ApiKey;

/// Paginated buildings response
#[derive(Serialize, ToSchema)]
pub struct BuildingsListResponse {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub data: Vec<Building>,
}

/// List buildings
#[utoipa::path(
    get,
    path = "/buildings",
    tag = "buildings",
    security(("api_key" = [])),
    params(BuildingQuery),
    responses(
        (status = 200, description = "Buildings list", body = BuildingsListResponse)
    )
)]
pub async fn list_buildings(
    State(state): State<crate::AppState>,
    _: ApiKey,
    Query(query): Query<BuildingQuery>,
) -> AppResult<Json<BuildingsListResponse>> {
    let (limit, offset) = page_bounds(query.limit, query.offset);
    let (data, total) = state.services.buildings.list(&query).await?;
    Ok(Json(BuildingsListResponse {
        total,
        limit,
        offset,
        data,
    }))
}

/// Create a building
#[utoipa::path(
    post,
    path = "/buildings",
    tag = "buildings",
    security(("api_key" = [])),
    request_body(content = CreateBuilding, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Building created", body = Building),
        (status = 409, description = "Building already exists")
    )
)]
pub async fn create_building(
    State(state): State<crate::AppState>,
    _: ApiKey,
    Form(request): Form<CreateBuilding>,
) -> AppResult<(StatusCode, Json<Building>)> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let building = state.services.buildings.create(request.name.trim()).await?;
    Ok((StatusCode::CREATED, Json(building)))
}
