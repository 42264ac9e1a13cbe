//! Borrower model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    ids,
};

/// Person or company borrowing keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrower {
    /// UUID v5 over the identifying fields of this borrower type
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub borrower_type: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Filters for listing borrowers
#[derive(Debug, Default, Deserialize)]
pub struct BorrowerQuery {
    pub borrower_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Borrower {
    pub fn new(
        name: impl Into<String>,
        borrower_type: impl Into<String>,
        company: Option<String>,
        email: Option<String>,
        phone: Option<String>,
    ) -> Self {
        let name = name.into();
        let borrower_type = borrower_type.into();
        let id = ids::borrower_id(
            &borrower_type,
            &name,
            company.as_deref(),
            email.as_deref(),
            phone.as_deref(),
        );
        Self {
            id,
            name,
            borrower_type,
            company,
            email,
            phone,
        }
    }

    /// A borrower taking a key must be reachable by email or phone
    pub fn require_contact(&self) -> AppResult<()> {
        if self.email.is_none() && self.phone.is_none() {
            return Err(AppError::Validation(
                "Borrower must have either an email or phone number".to_string(),
            ));
        }
        Ok(())
    }
}
