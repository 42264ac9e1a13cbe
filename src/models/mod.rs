//! Data models for Kapi

pub mod borrowed_key;
pub mod borrower;
pub mod building;
pub mod key;
pub mod reservation;

// Re-export commonly used types
pub use borrowed_key::{BorrowedKey, BorrowedKeyDetails, BorrowedKeyQuery, Files};
pub use borrower::{Borrower, BorrowerQuery};
pub use building::{Building, BuildingQuery};
pub use key::{Key, KeyQuery};
pub use reservation::{NewReservation, Reservation, ReservationDetails, ReservationQuery};

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Resolve optional limit/offset query values into bounds usable by a store
pub fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(0, MAX_LIMIT);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}
