//! Physical key model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::ids;

/// A physical key, identified by building, room and key type.
///
/// A "master" key and a "room" key for the same room are distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Key {
    /// `{building_id}-{room_number}-{type}`
    pub id: String,
    pub building_id: Uuid,
    pub room_number: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub key_type: String,
}

/// Filters for listing keys
#[derive(Debug, Default, Deserialize)]
pub struct KeyQuery {
    pub building_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Key {
    pub fn new(building_id: Uuid, room_number: impl Into<String>, key_type: impl Into<String>) -> Self {
        let room_number = room_number.into();
        let key_type = key_type.into();
        Self {
            id: ids::key_id(&building_id, &room_number, &key_type),
            building_id,
            room_number,
            key_type,
        }
    }
}
