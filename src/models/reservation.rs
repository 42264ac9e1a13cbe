//! Key reservation model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{borrower::Borrower, key::Key};

/// Planned pickup of a key, stored in `key_reservations`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: Uuid,
    pub key_id: String,
    pub borrower_id: Option<Uuid>,
    pub building_id: Uuid,
    pub description: String,
    pub collection_at: DateTime<Utc>,
    /// Who placed the reservation
    pub reservation_by: String,
    pub return_at: Option<DateTime<Utc>>,
    /// Fulfilled by a borrow event
    pub collected: bool,
    /// The linked borrow event was returned
    pub returned: bool,
    /// Set once, when a borrow event collects this reservation
    pub borrowed_key_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Reservation data supplied by the caller
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub description: String,
    pub collection_at: DateTime<Utc>,
    pub reservation_by: String,
    pub return_at: Option<DateTime<Utc>>,
}

impl Reservation {
    pub fn open(key: &Key, borrower: Option<&Borrower>, data: NewReservation) -> Self {
        Self {
            id: Uuid::new_v4(),
            key_id: key.id.clone(),
            borrower_id: borrower.map(|b| b.id),
            building_id: key.building_id,
            description: data.description,
            collection_at: data.collection_at,
            reservation_by: data.reservation_by,
            return_at: data.return_at,
            collected: false,
            returned: false,
            borrowed_key_id: None,
            created_at: Utc::now(),
        }
    }
}

/// Reservation with its key and optional borrower
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationDetails {
    pub id: Uuid,
    pub key: Key,
    pub borrower: Option<Borrower>,
    pub building_id: Uuid,
    pub description: String,
    pub collection_at: DateTime<Utc>,
    pub reservation_by: String,
    pub return_at: Option<DateTime<Utc>>,
    pub collected: bool,
    pub returned: bool,
    pub borrowed_key_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl ReservationDetails {
    pub fn new(reservation: Reservation, key: Key, borrower: Option<Borrower>) -> Self {
        Self {
            id: reservation.id,
            key,
            borrower,
            building_id: reservation.building_id,
            description: reservation.description,
            collection_at: reservation.collection_at,
            reservation_by: reservation.reservation_by,
            return_at: reservation.return_at,
            collected: reservation.collected,
            returned: reservation.returned,
            borrowed_key_id: reservation.borrowed_key_id,
            created_at: reservation.created_at,
        }
    }
}

/// Query parameters for reservations
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ReservationQuery {
    pub collected: Option<bool>,
    pub returned: Option<bool>,
    pub building_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
