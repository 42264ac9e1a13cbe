//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{borrowed_keys, buildings, files, health, reservations};

/// Registers the `X-API-KEY` header scheme referenced by the paths
struct ApiKeySecurity;

impl Modify for ApiKeySecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-KEY"))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Kapi API",
        version = "0.2.0",
        description = "Key lending and reservation tracking REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        // Buildings
        buildings::list_buildings,
        buildings::create_building,
        // Borrowed keys
        borrowed_keys::borrow_key,
        borrowed_keys::return_key,
        borrowed_keys::list_borrowed_keys,
        borrowed_keys::get_borrowed_key,
        borrowed_keys::key_status,
        // Reservations
        reservations::create_reservation,
        reservations::list_reservations,
        reservations::delete_reservation,
        reservations::open_reservation,
        // Files
        files::get_file,
    ),
    components(
        schemas(
            // Buildings
            crate::models::building::Building,
            crate::models::building::CreateBuilding,
            crate::models::building::BuildingQuery,
            buildings::BuildingsListResponse,
            // Borrowed keys
            crate::models::key::Key,
            crate::models::borrower::Borrower,
            crate::models::borrowed_key::BorrowedKey,
            crate::models::borrowed_key::BorrowedKeyDetails,
            crate::models::borrowed_key::BorrowedKeyQuery,
            borrowed_keys::BorrowKeyRequest,
            borrowed_keys::BorrowResponse,
            borrowed_keys::BorrowedKeysListResponse,
            borrowed_keys::KeyStatusResponse,
            // Reservations
            crate::models::reservation::Reservation,
            crate::models::reservation::ReservationDetails,
            crate::models::reservation::ReservationQuery,
            reservations::CreateReservationRequest,
            reservations::ReservationResponse,
            reservations::ReservationsListResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&ApiKeySecurity),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "buildings", description = "Building management"),
        (name = "borrowed-keys", description = "Key borrow and return"),
        (name = "reservations", description = "Key reservations"),
        (name = "files", description = "Uploaded ID images and signatures")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
