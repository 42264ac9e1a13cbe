//! In-memory store implementing every entity store trait
//!
//! Mirrors the Postgres schema, including the one-active-borrow-per-key
//! constraint, so services behave the same against either backend.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{BorrowedKeyStore, BorrowerStore, BuildingStore, KeyStore, ReservationStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        page_bounds, BorrowedKey, BorrowedKeyDetails, BorrowedKeyQuery, Borrower, BorrowerQuery,
        Building, BuildingQuery, Key, KeyQuery, Reservation, ReservationDetails, ReservationQuery,
    },
};

#[derive(Default)]
struct Tables {
    buildings: HashMap<Uuid, Building>,
    keys: HashMap<String, Key>,
    borrowers: HashMap<Uuid, Borrower>,
    borrowed_keys: HashMap<Uuid, BorrowedKey>,
    reservations: HashMap<Uuid, Reservation>,
}

impl Tables {
    fn key(&self, id: &str) -> AppResult<Key> {
        self.keys
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::Internal(format!("Dangling reference to key {}", id)))
    }

    fn borrower(&self, id: Uuid) -> AppResult<Borrower> {
        self.borrowers
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::Internal(format!("Dangling reference to borrower {}", id)))
    }

    fn borrowed_key_details(&self, borrowed_key: &BorrowedKey) -> AppResult<BorrowedKeyDetails> {
        Ok(BorrowedKeyDetails::new(
            borrowed_key.clone(),
            self.key(&borrowed_key.key_id)?,
            self.borrower(borrowed_key.borrower_id)?,
        ))
    }

    fn reservation_details(&self, reservation: &Reservation) -> AppResult<ReservationDetails> {
        let borrower = match reservation.borrower_id {
            Some(id) => Some(self.borrower(id)?),
            None => None,
        };
        Ok(ReservationDetails::new(
            reservation.clone(),
            self.key(&reservation.key_id)?,
            borrower,
        ))
    }
}

/// Slice a filtered, ordered set the way `LIMIT/OFFSET` would
fn paginate<T>(rows: Vec<T>, limit: Option<i64>, offset: Option<i64>) -> (Vec<T>, i64) {
    let (limit, offset) = page_bounds(limit, offset);
    let total = rows.len() as i64;
    let page = rows
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect();
    (page, total)
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    fn lock(&self) -> AppResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal("In-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl BuildingStore for MemoryStore {
    async fn exists(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.lock()?.buildings.contains_key(&id))
    }

    async fn exists_by_name(&self, name: &str) -> AppResult<bool> {
        Ok(self.lock()?.buildings.values().any(|b| b.name == name))
    }

    async fn add(&self, building: &Building) -> AppResult<Building> {
        let mut tables = self.lock()?;
        if tables.buildings.contains_key(&building.id)
            || tables.buildings.values().any(|b| b.name == building.name)
        {
            return Err(AppError::Conflict(format!("Building {} already exists", building.name)));
        }
        tables.buildings.insert(building.id, building.clone());
        Ok(building.clone())
    }

    async fn get(&self, id: Uuid) -> AppResult<Building> {
        self.lock()?
            .buildings
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Building {} not found", id)))
    }

    async fn list(&self, query: &BuildingQuery) -> AppResult<(Vec<Building>, i64)> {
        let needle = query.name_contains.as_ref().map(|s| s.to_lowercase());
        let mut rows: Vec<Building> = self
            .lock()?
            .buildings
            .values()
            .filter(|b| match &needle {
                Some(n) => b.name.to_lowercase().contains(n),
                None => true,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(paginate(rows, query.limit, query.offset))
    }
}

#[async_trait]
impl KeyStore for MemoryStore {
    async fn exists(&self, id: &str) -> AppResult<bool> {
        Ok(self.lock()?.keys.contains_key(id))
    }

    async fn add(&self, key: &Key) -> AppResult<Key> {
        let mut tables = self.lock()?;
        if tables.keys.contains_key(&key.id) {
            return Err(AppError::Conflict(format!("Key {} already exists", key.id)));
        }
        tables.keys.insert(key.id.clone(), key.clone());
        Ok(key.clone())
    }

    async fn get(&self, id: &str) -> AppResult<Key> {
        self.lock()?
            .keys
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Key {} not found", id)))
    }

    async fn list(&self, query: &KeyQuery) -> AppResult<(Vec<Key>, i64)> {
        let mut rows: Vec<Key> = self
            .lock()?
            .keys
            .values()
            .filter(|k| query.building_id.map_or(true, |id| k.building_id == id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            (&a.room_number, &a.key_type).cmp(&(&b.room_number, &b.key_type))
        });
        Ok(paginate(rows, query.limit, query.offset))
    }
}

#[async_trait]
impl BorrowerStore for MemoryStore {
    async fn exists(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.lock()?.borrowers.contains_key(&id))
    }

    async fn add(&self, borrower: &Borrower) -> AppResult<Borrower> {
        let mut tables = self.lock()?;
        if tables.borrowers.contains_key(&borrower.id) {
            return Err(AppError::Conflict(format!("Borrower {} already exists", borrower.id)));
        }
        tables.borrowers.insert(borrower.id, borrower.clone());
        Ok(borrower.clone())
    }

    async fn get(&self, id: Uuid) -> AppResult<Borrower> {
        self.lock()?
            .borrowers
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Borrower {} not found", id)))
    }

    async fn list(&self, query: &BorrowerQuery) -> AppResult<(Vec<Borrower>, i64)> {
        let mut rows: Vec<Borrower> = self
            .lock()?
            .borrowers
            .values()
            .filter(|b| {
                query
                    .borrower_type
                    .as_ref()
                    .map_or(true, |t| &b.borrower_type == t)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));
        Ok(paginate(rows, query.limit, query.offset))
    }
}

#[async_trait]
impl BorrowedKeyStore for MemoryStore {
    async fn exists(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.lock()?.borrowed_keys.contains_key(&id))
    }

    async fn add(&self, borrowed_key: &BorrowedKey) -> AppResult<BorrowedKey> {
        let mut tables = self.lock()?;
        if tables.borrowed_keys.contains_key(&borrowed_key.id) {
            return Err(AppError::Conflict(format!(
                "Borrowed key {} already exists",
                borrowed_key.id
            )));
        }
        let active = borrowed_key.borrowed
            && tables
                .borrowed_keys
                .values()
                .any(|bk| bk.borrowed && bk.key_id == borrowed_key.key_id);
        if active {
            return Err(AppError::AlreadyBorrowed(format!(
                "Key {} is already borrowed",
                borrowed_key.key_id
            )));
        }
        tables.borrowed_keys.insert(borrowed_key.id, borrowed_key.clone());
        Ok(borrowed_key.clone())
    }

    async fn get(&self, id: Uuid) -> AppResult<BorrowedKey> {
        self.lock()?
            .borrowed_keys
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Borrowed key {} not found", id)))
    }

    async fn get_details(&self, id: Uuid) -> AppResult<BorrowedKeyDetails> {
        let tables = self.lock()?;
        let borrowed_key = tables
            .borrowed_keys
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Borrowed key {} not found", id)))?;
        tables.borrowed_key_details(borrowed_key)
    }

    async fn list(&self, query: &BorrowedKeyQuery) -> AppResult<(Vec<BorrowedKeyDetails>, i64)> {
        let tables = self.lock()?;
        let mut rows: Vec<&BorrowedKey> = tables
            .borrowed_keys
            .values()
            .filter(|bk| query.borrowed.map_or(true, |b| bk.borrowed == b))
            .filter(|bk| query.building_id.map_or(true, |id| bk.building_id == id))
            .collect();
        rows.sort_by(|a, b| b.borrowed_at.cmp(&a.borrowed_at));

        let (page, total) = paginate(rows, query.limit, query.offset);
        let details = page
            .into_iter()
            .map(|bk| tables.borrowed_key_details(bk))
            .collect::<AppResult<Vec<_>>>()?;
        Ok((details, total))
    }

    async fn is_borrowed(&self, key_id: &str) -> AppResult<bool> {
        Ok(self
            .lock()?
            .borrowed_keys
            .values()
            .any(|bk| bk.borrowed && bk.key_id == key_id))
    }

    async fn mark_returned(&self, id: Uuid, returned_at: DateTime<Utc>) -> AppResult<BorrowedKey> {
        let mut tables = self.lock()?;
        let borrowed_key = tables
            .borrowed_keys
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Borrowed key {} not found", id)))?;
        if !borrowed_key.borrowed {
            return Err(AppError::AlreadyReturned(format!("Borrow {} was already returned", id)));
        }
        borrowed_key.borrowed = false;
        borrowed_key.returned_at = Some(returned_at);
        Ok(borrowed_key.clone())
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn exists(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.lock()?.reservations.contains_key(&id))
    }

    async fn add(&self, reservation: &Reservation) -> AppResult<Reservation> {
        let mut tables = self.lock()?;
        if tables.reservations.contains_key(&reservation.id) {
            return Err(AppError::Conflict(format!(
                "Reservation {} already exists",
                reservation.id
            )));
        }
        tables.reservations.insert(reservation.id, reservation.clone());
        Ok(reservation.clone())
    }

    async fn get(&self, id: Uuid) -> AppResult<Reservation> {
        self.lock()?
            .reservations
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))
    }

    async fn list(&self, query: &ReservationQuery) -> AppResult<(Vec<ReservationDetails>, i64)> {
        let tables = self.lock()?;
        let mut rows: Vec<&Reservation> = tables
            .reservations
            .values()
            .filter(|r| query.collected.map_or(true, |c| r.collected == c))
            .filter(|r| query.returned.map_or(true, |ret| r.returned == ret))
            .filter(|r| query.building_id.map_or(true, |id| r.building_id == id))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let (page, total) = paginate(rows, query.limit, query.offset);
        let details = page
            .into_iter()
            .map(|r| tables.reservation_details(r))
            .collect::<AppResult<Vec<_>>>()?;
        Ok((details, total))
    }

    async fn find_by_borrowed_key(&self, borrowed_key_id: Uuid) -> AppResult<Option<Reservation>> {
        Ok(self
            .lock()?
            .reservations
            .values()
            .find(|r| r.borrowed_key_id == Some(borrowed_key_id))
            .cloned())
    }

    async fn find_open_for_key(&self, key_id: &str) -> AppResult<Option<Reservation>> {
        Ok(self
            .lock()?
            .reservations
            .values()
            .filter(|r| r.key_id == key_id && !r.collected)
            .min_by_key(|r| r.collection_at)
            .cloned())
    }

    async fn mark_collected(&self, id: Uuid, borrowed_key_id: Uuid) -> AppResult<Reservation> {
        let mut tables = self.lock()?;
        let reservation = tables
            .reservations
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))?;
        reservation.collected = true;
        reservation.borrowed_key_id = Some(borrowed_key_id);
        Ok(reservation.clone())
    }

    async fn mark_returned(&self, id: Uuid) -> AppResult<Reservation> {
        let mut tables = self.lock()?;
        let reservation = tables
            .reservations
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))?;
        reservation.returned = true;
        Ok(reservation.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<Reservation> {
        self.lock()?
            .reservations
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))
    }
}
