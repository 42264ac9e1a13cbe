//! Building model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::ids;

/// Building record. Created on first reference, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Building {
    /// UUID v5 of the name
    pub id: Uuid,
    pub name: String,
}

impl Building {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: ids::building_id(&name),
            name,
        }
    }
}

/// Create building request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBuilding {
    #[validate(length(min = 1, message = "Building name must not be empty"))]
    pub name: String,
}

/// Query parameters for buildings
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BuildingQuery {
    /// Case-insensitive substring of the name
    #[serde(alias = "search")]
    pub name_contains: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
