//! Repository layer for store operations
//!
//! Each entity is reached through a store trait so services can run against
//! Postgres in production and against [`memory::MemoryStore`] in tests. No
//! state is cached here: every call goes to the backing store.

pub mod borrowed_keys;
pub mod borrowers;
pub mod buildings;
pub mod keys;
pub mod memory;
pub mod reservations;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        BorrowedKey, BorrowedKeyDetails, BorrowedKeyQuery, Borrower, BorrowerQuery, Building,
        BuildingQuery, Key, KeyQuery, Reservation, ReservationDetails, ReservationQuery,
    },
};

#[async_trait]
pub trait BuildingStore: Send + Sync {
    async fn exists(&self, id: Uuid) -> AppResult<bool>;
    async fn exists_by_name(&self, name: &str) -> AppResult<bool>;
    /// Fails with `Conflict` on a duplicate id
    async fn add(&self, building: &Building) -> AppResult<Building>;
    async fn get(&self, id: Uuid) -> AppResult<Building>;
    async fn list(&self, query: &BuildingQuery) -> AppResult<(Vec<Building>, i64)>;
}

#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn exists(&self, id: &str) -> AppResult<bool>;
    async fn add(&self, key: &Key) -> AppResult<Key>;
    async fn get(&self, id: &str) -> AppResult<Key>;
    /// Ordered by room number, then key type
    async fn list(&self, query: &KeyQuery) -> AppResult<(Vec<Key>, i64)>;
}

#[async_trait]
pub trait BorrowerStore: Send + Sync {
    async fn exists(&self, id: Uuid) -> AppResult<bool>;
    async fn add(&self, borrower: &Borrower) -> AppResult<Borrower>;
    async fn get(&self, id: Uuid) -> AppResult<Borrower>;
    /// Ordered by name
    async fn list(&self, query: &BorrowerQuery) -> AppResult<(Vec<Borrower>, i64)>;
}

#[async_trait]
pub trait BorrowedKeyStore: Send + Sync {
    async fn exists(&self, id: Uuid) -> AppResult<bool>;
    /// Fails with `AlreadyBorrowed` if the store already holds an active
    /// borrow for the same key
    async fn add(&self, borrowed_key: &BorrowedKey) -> AppResult<BorrowedKey>;
    async fn get(&self, id: Uuid) -> AppResult<BorrowedKey>;
    async fn get_details(&self, id: Uuid) -> AppResult<BorrowedKeyDetails>;
    /// Newest borrow first
    async fn list(&self, query: &BorrowedKeyQuery) -> AppResult<(Vec<BorrowedKeyDetails>, i64)>;
    async fn is_borrowed(&self, key_id: &str) -> AppResult<bool>;
    /// Closes an active borrow. Fails with `AlreadyReturned` if the borrow is
    /// no longer active when the update runs.
    async fn mark_returned(&self, id: Uuid, returned_at: DateTime<Utc>) -> AppResult<BorrowedKey>;
}

#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn exists(&self, id: Uuid) -> AppResult<bool>;
    async fn add(&self, reservation: &Reservation) -> AppResult<Reservation>;
    async fn get(&self, id: Uuid) -> AppResult<Reservation>;
    /// Newest reservation first
    async fn list(&self, query: &ReservationQuery) -> AppResult<(Vec<ReservationDetails>, i64)>;
    async fn find_by_borrowed_key(&self, borrowed_key_id: Uuid) -> AppResult<Option<Reservation>>;
    async fn find_open_for_key(&self, key_id: &str) -> AppResult<Option<Reservation>>;
    async fn mark_collected(&self, id: Uuid, borrowed_key_id: Uuid) -> AppResult<Reservation>;
    async fn mark_returned(&self, id: Uuid) -> AppResult<Reservation>;
    async fn delete(&self, id: Uuid) -> AppResult<Reservation>;
}

/// Main repository struct holding one store per entity
#[derive(Clone)]
pub struct Repository {
    pub buildings: Arc<dyn BuildingStore>,
    pub keys: Arc<dyn KeyStore>,
    pub borrowers: Arc<dyn BorrowerStore>,
    pub borrowed_keys: Arc<dyn BorrowedKeyStore>,
    pub reservations: Arc<dyn ReservationStore>,
}

impl Repository {
    /// Create a repository backed by the given Postgres pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            buildings: Arc::new(buildings::BuildingsRepository::new(pool.clone())),
            keys: Arc::new(keys::KeysRepository::new(pool.clone())),
            borrowers: Arc::new(borrowers::BorrowersRepository::new(pool.clone())),
            borrowed_keys: Arc::new(borrowed_keys::BorrowedKeysRepository::new(pool.clone())),
            reservations: Arc::new(reservations::ReservationsRepository::new(pool)),
        }
    }

    /// Create a repository backed by process memory
    pub fn in_memory() -> Self {
        let store = memory::MemoryStore::default();
        Self {
            buildings: Arc::new(store.clone()),
            keys: Arc::new(store.clone()),
            borrowers: Arc::new(store.clone()),
            borrowed_keys: Arc::new(store.clone()),
            reservations: Arc::new(store),
        }
    }

    /// Store the key unless one with the same id exists
    pub async fn ensure_key(&self, key: &Key) -> AppResult<()> {
        if !self.keys.exists(&key.id).await? {
            tracing::debug!("Adding key {}", key.id);
            self.keys.add(key).await?;
        }
        Ok(())
    }

    /// Store the borrower unless one with the same id exists
    pub async fn ensure_borrower(&self, borrower: &Borrower) -> AppResult<()> {
        if !self.borrowers.exists(borrower.id).await? {
            tracing::debug!("Adding borrower {}", borrower.id);
            self.borrowers.add(borrower).await?;
        }
        Ok(())
    }
}
