//! Key reservation service

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Borrower, Key, NewReservation, Reservation, ReservationDetails, ReservationQuery},
    repository::Repository,
};

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
}

impl ReservationsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Reserve a key, storing the key and borrower first if needed
    pub async fn create(
        &self,
        key: &Key,
        borrower: Option<&Borrower>,
        data: NewReservation,
    ) -> AppResult<Reservation> {
        self.repository.ensure_key(key).await?;
        if let Some(borrower) = borrower {
            self.repository.ensure_borrower(borrower).await?;
        }

        let reservation = self
            .repository
            .reservations
            .add(&Reservation::open(key, borrower, data))
            .await?;

        tracing::info!("Created reservation {} for key {}", reservation.id, key.id);
        Ok(reservation)
    }

    pub async fn list(&self, query: &ReservationQuery) -> AppResult<(Vec<ReservationDetails>, i64)> {
        self.repository.reservations.list(query).await
    }

    /// Delete a reservation. A borrow it was linked to is left as is.
    pub async fn delete(&self, id: Uuid) -> AppResult<Reservation> {
        let deleted = self.repository.reservations.delete(id).await?;
        tracing::info!("Deleted reservation {}", id);
        Ok(deleted)
    }

    /// Earliest uncollected reservation for a key
    pub async fn open_for_key(&self, key_id: &str) -> AppResult<Option<Reservation>> {
        self.repository.reservations.find_open_for_key(key_id).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::{error::AppError, ids, models::BorrowedKey, models::Files};

    fn new_reservation(hours: i64) -> NewReservation {
        NewReservation {
            description: "Cleaning crew".to_string(),
            collection_at: Utc::now() + Duration::hours(hours),
            reservation_by: "Front desk".to_string(),
            return_at: Some(Utc::now() + Duration::hours(hours + 2)),
        }
    }

    #[tokio::test]
    async fn test_create_without_borrower() {
        let repository = Repository::in_memory();
        let service = ReservationsService::new(repository.clone());
        let key = Key::new(ids::building_id("Hall A"), "101", "room");

        let reservation = service.create(&key, None, new_reservation(1)).await.unwrap();
        assert!(!reservation.collected);
        assert!(!reservation.returned);
        assert!(reservation.borrower_id.is_none());
        assert!(reservation.borrowed_key_id.is_none());
        assert!(repository.keys.exists(&key.id).await.unwrap());

        let (rows, total) = service.list(&ReservationQuery::default()).await.unwrap();
        assert_eq!(total, 1);
        assert!(rows[0].borrower.is_none());
        assert_eq!(rows[0].key, key);
    }

    #[tokio::test]
    async fn test_create_with_borrower_stores_borrower() {
        let repository = Repository::in_memory();
        let service = ReservationsService::new(repository.clone());
        let key = Key::new(ids::building_id("Hall A"), "101", "room");
        let borrower = Borrower::new("Bob", "contractor", Some("ACME".into()), None, None);

        let reservation = service
            .create(&key, Some(&borrower), new_reservation(1))
            .await
            .unwrap();
        assert_eq!(reservation.borrower_id, Some(borrower.id));
        assert!(repository.borrowers.exists(borrower.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let service = ReservationsService::new(Repository::in_memory());
        let hall_a = ids::building_id("Hall A");
        let hall_b = ids::building_id("Hall B");

        let first = service
            .create(&Key::new(hall_a, "101", "room"), None, new_reservation(1))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = service
            .create(&Key::new(hall_a, "102", "room"), None, new_reservation(2))
            .await
            .unwrap();
        service
            .create(&Key::new(hall_b, "1", "room"), None, new_reservation(3))
            .await
            .unwrap();

        let query = ReservationQuery {
            building_id: Some(hall_a),
            collected: Some(false),
            ..Default::default()
        };
        let (rows, total) = service.list(&query).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows[0].id, second.id);
        assert_eq!(rows[1].id, first.id);

        let paged = ReservationQuery {
            limit: Some(1),
            offset: Some(1),
            ..Default::default()
        };
        let (rows, total) = service.list(&paged).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let repository = Repository::in_memory();
        let service = ReservationsService::new(repository.clone());
        let key = Key::new(ids::building_id("Hall A"), "101", "room");
        let reservation = service.create(&key, None, new_reservation(1)).await.unwrap();

        let deleted = service.delete(reservation.id).await.unwrap();
        assert_eq!(deleted.id, reservation.id);
        assert!(!repository.reservations.exists(reservation.id).await.unwrap());

        let err = service.delete(reservation.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_leaves_linked_borrow() {
        let repository = Repository::in_memory();
        let service = ReservationsService::new(repository.clone());
        let key = Key::new(ids::building_id("Hall A"), "101", "room");
        let borrower = Borrower::new("Jane", "employee", None, None, None);
        let reservation = service.create(&key, None, new_reservation(1)).await.unwrap();

        repository.ensure_borrower(&borrower).await.unwrap();
        let borrow = BorrowedKey::checkout(
            &key,
            &borrower,
            Files {
                image_filename: "a.png".into(),
                signature_filename: "b.png".into(),
            },
        );
        repository.borrowed_keys.add(&borrow).await.unwrap();
        repository
            .reservations
            .mark_collected(reservation.id, borrow.id)
            .await
            .unwrap();

        service.delete(reservation.id).await.unwrap();
        assert!(repository.borrowed_keys.get(borrow.id).await.unwrap().borrowed);
    }

    #[tokio::test]
    async fn test_open_for_key() {
        let service = ReservationsService::new(Repository::in_memory());
        let key = Key::new(ids::building_id("Hall A"), "101", "room");

        assert!(service.open_for_key(&key.id).await.unwrap().is_none());

        let later = service.create(&key, None, new_reservation(5)).await.unwrap();
        let sooner = service.create(&key, None, new_reservation(1)).await.unwrap();

        let open = service.open_for_key(&key.id).await.unwrap().unwrap();
        assert_eq!(open.id, sooner.id);
        assert_ne!(open.id, later.id);
    }
}
