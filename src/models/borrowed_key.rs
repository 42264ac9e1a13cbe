//! Borrow event model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{borrower::Borrower, key::Key};

/// Stored filenames of the proof captured at checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Files {
    pub image_filename: String,
    pub signature_filename: String,
}

/// One checkout of a key, as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowedKey {
    pub id: Uuid,
    pub key_id: String,
    pub borrower_id: Uuid,
    pub building_id: Uuid,
    pub image_filename: String,
    pub signature_filename: String,
    /// True while the key is out
    pub borrowed: bool,
    pub borrowed_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl BorrowedKey {
    /// New active borrow event stamped with the current time
    pub fn checkout(key: &Key, borrower: &Borrower, files: Files) -> Self {
        Self {
            id: Uuid::new_v4(),
            key_id: key.id.clone(),
            borrower_id: borrower.id,
            building_id: key.building_id,
            image_filename: files.image_filename,
            signature_filename: files.signature_filename,
            borrowed: true,
            borrowed_at: Utc::now(),
            returned_at: None,
        }
    }
}

/// Borrow event with its key and borrower
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowedKeyDetails {
    pub id: Uuid,
    pub key: Key,
    pub borrower: Borrower,
    pub building_id: Uuid,
    pub image_filename: String,
    pub signature_filename: String,
    pub borrowed: bool,
    pub borrowed_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl BorrowedKeyDetails {
    pub fn new(borrowed_key: BorrowedKey, key: Key, borrower: Borrower) -> Self {
        Self {
            id: borrowed_key.id,
            key,
            borrower,
            building_id: borrowed_key.building_id,
            image_filename: borrowed_key.image_filename,
            signature_filename: borrowed_key.signature_filename,
            borrowed: borrowed_key.borrowed,
            borrowed_at: borrowed_key.borrowed_at,
            returned_at: borrowed_key.returned_at,
        }
    }
}

/// Query parameters for borrow events
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BorrowedKeyQuery {
    /// Only active (true) or only returned (false) borrows
    pub borrowed: Option<bool>,
    pub building_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
