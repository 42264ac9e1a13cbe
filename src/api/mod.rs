//! API handlers for Kapi REST endpoints

pub mod borrowed_keys;
pub mod buildings;
pub mod files;
pub mod health;
pub mod openapi;
pub mod reservations;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    AppState,
};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Extractor guarding a route with the configured API key
pub struct ApiKey;

#[async_trait]
impl FromRequestParts<AppState> for ApiKey {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing X-API-KEY header".to_string()))?;

        if provided != state.config.auth.api_key {
            return Err(AppError::Authentication("Invalid API key".to_string()));
        }

        Ok(ApiKey)
    }
}

/// Treat empty form fields as absent
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse an id taken from a form field or path segment
pub(crate) fn parse_id(field: &str, value: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|_| AppError::Validation(format!("{} is not a valid id", field)))
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Buildings
        .route("/buildings", get(buildings::list_buildings))
        .route("/buildings", post(buildings::create_building))
        // Borrowed keys
        .route("/borrowed-keys", get(borrowed_keys::list_borrowed_keys))
        .route("/borrowed-keys", post(borrowed_keys::borrow_key))
        .route("/borrowed-keys/:id", get(borrowed_keys::get_borrowed_key))
        .route("/borrowed-keys/return/:id", post(borrowed_keys::return_key))
        .route("/borrowed-keys/status/:key_id", get(borrowed_keys::key_status))
        // Reservations
        .route("/reservations", get(reservations::list_reservations))
        .route("/reservations", post(reservations::create_reservation))
        .route("/reservations/:id", delete(reservations::delete_reservation))
        .route("/reservations/open/:key_id", get(reservations::open_reservation))
        // Uploaded files
        .route("/files/:filename", get(files::get_file))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
