//! Key borrow/return service
//!
//! A key is AVAILABLE while no active borrow event exists for it and
//! BORROWED while one does. `borrow` and `return_key` are the only
//! transitions.
//!
//! The availability check in `borrow` is read-then-write. Two concurrent
//! borrows of one key can both pass it; the store's unique index on active
//! borrows turns the loser's insert into `AlreadyBorrowed`. Returns are
//! guarded the same way: the store only closes a borrow that is still active.

use chrono::Utc;
use uuid::Uuid;

use super::notifications::NotificationService;
use crate::{
    error::{AppError, AppResult},
    models::{BorrowedKey, BorrowedKeyDetails, BorrowedKeyQuery, Borrower, Files, Key},
    repository::Repository,
};

#[derive(Clone)]
pub struct BorrowedKeysService {
    repository: Repository,
    notifications: NotificationService,
}

impl BorrowedKeysService {
    pub fn new(repository: Repository, notifications: NotificationService) -> Self {
        Self {
            repository,
            notifications,
        }
    }

    /// Check a key out to a borrower, optionally collecting a reservation
    pub async fn borrow(
        &self,
        key: &Key,
        borrower: &Borrower,
        files: Files,
        reservation_id: Option<Uuid>,
    ) -> AppResult<BorrowedKey> {
        if self.repository.borrowed_keys.is_borrowed(&key.id).await? {
            return Err(AppError::AlreadyBorrowed(format!("Key {} is already borrowed", key.id)));
        }

        self.repository.ensure_key(key).await?;
        self.repository.ensure_borrower(borrower).await?;

        let borrowed_key = self
            .repository
            .borrowed_keys
            .add(&BorrowedKey::checkout(key, borrower, files))
            .await?;

        tracing::info!(
            "Key {} borrowed by {} (borrow {})",
            key.id,
            borrower.id,
            borrowed_key.id
        );

        if let Some(reservation_id) = reservation_id {
            if let Err(e) = self.link_reservation(reservation_id, borrowed_key.id).await {
                tracing::warn!(
                    "Failed to link reservation {} to borrow {}: {}",
                    reservation_id,
                    borrowed_key.id,
                    e
                );
            }
        }

        self.notifications.dispatch(format!(
            "{} key {} borrowed by {}",
            key.key_type, key.room_number, borrower.name
        ));

        Ok(borrowed_key)
    }

    /// Mark the reservation collected by this borrow. A missing or already
    /// collected reservation leaves the borrow untouched.
    async fn link_reservation(&self, reservation_id: Uuid, borrowed_key_id: Uuid) -> AppResult<()> {
        if !self.repository.reservations.exists(reservation_id).await? {
            tracing::warn!("Reservation {} does not exist", reservation_id);
            return Ok(());
        }

        let reservation = self.repository.reservations.get(reservation_id).await?;
        if let Some(existing) = reservation.borrowed_key_id {
            tracing::warn!(
                "Reservation {} already collected by borrow {}",
                reservation_id,
                existing
            );
            return Ok(());
        }

        tracing::info!("Linking reservation {} to borrow {}", reservation_id, borrowed_key_id);
        self.repository
            .reservations
            .mark_collected(reservation_id, borrowed_key_id)
            .await?;
        Ok(())
    }

    /// Return a borrowed key, closing any reservation it collected
    pub async fn return_key(&self, borrow_id: Uuid) -> AppResult<BorrowedKey> {
        let borrowed_key = self.repository.borrowed_keys.get(borrow_id).await?;
        if !borrowed_key.borrowed {
            return Err(AppError::AlreadyReturned(format!(
                "Borrow {} was already returned",
                borrow_id
            )));
        }

        let returned = self
            .repository
            .borrowed_keys
            .mark_returned(borrow_id, Utc::now())
            .await?;

        if let Some(reservation) = self
            .repository
            .reservations
            .find_by_borrowed_key(borrow_id)
            .await?
        {
            self.repository.reservations.mark_returned(reservation.id).await?;
            tracing::info!("Reservation {} marked returned", reservation.id);
        }

        tracing::info!("Returned borrow {} (key {})", borrow_id, returned.key_id);
        Ok(returned)
    }

    /// True iff an active borrow exists for the key
    pub async fn is_borrowed(&self, key_id: &str) -> AppResult<bool> {
        self.repository.borrowed_keys.is_borrowed(key_id).await
    }

    pub async fn get(&self, borrow_id: Uuid) -> AppResult<BorrowedKeyDetails> {
        self.repository.borrowed_keys.get_details(borrow_id).await
    }

    pub async fn list(&self, query: &BorrowedKeyQuery) -> AppResult<(Vec<BorrowedKeyDetails>, i64)> {
        self.repository.borrowed_keys.list(query).await
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::{
        ids,
        models::{NewReservation, Reservation},
        services::notifications::{NoopNotifier, Notifier},
    };

    fn service(repository: Repository) -> BorrowedKeysService {
        let notifications = NotificationService::new(Arc::new(NoopNotifier), Duration::from_secs(3600));
        BorrowedKeysService::new(repository, notifications)
    }

    fn files() -> Files {
        Files {
            image_filename: "id.png".to_string(),
            signature_filename: "signature.png".to_string(),
        }
    }

    fn jane() -> Borrower {
        Borrower::new("Jane", "employee", None, None, None)
    }

    fn room_101() -> Key {
        Key::new(ids::building_id("Hall A"), "101", "room")
    }

    async fn reservation(repository: &Repository, key: &Key) -> Reservation {
        repository.ensure_key(key).await.unwrap();
        let reservation = Reservation::open(
            key,
            None,
            NewReservation {
                description: "Maintenance".to_string(),
                collection_at: Utc::now() + ChronoDuration::hours(1),
                reservation_by: "Facilities".to_string(),
                return_at: None,
            },
        );
        repository.reservations.add(&reservation).await.unwrap()
    }

    #[tokio::test]
    async fn test_borrow_return_lifecycle() {
        let repository = Repository::in_memory();
        let service = service(repository.clone());
        let key = room_101();

        let borrow = service.borrow(&key, &jane(), files(), None).await.unwrap();
        assert!(borrow.borrowed);
        assert!(borrow.returned_at.is_none());
        assert!(service.is_borrowed(&key.id).await.unwrap());

        let err = service.borrow(&key, &jane(), files(), None).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyBorrowed(_)));

        let returned = service.return_key(borrow.id).await.unwrap();
        assert!(!returned.borrowed);
        assert!(returned.returned_at.is_some());
        assert!(!service.is_borrowed(&key.id).await.unwrap());

        let err = service.return_key(borrow.id).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyReturned(_)));

        let (rows, total) = service.list(&BorrowedKeyQuery::default()).await.unwrap();
        assert_eq!(total, 1);
        assert!(!rows[0].borrowed);
    }

    #[tokio::test]
    async fn test_checkout_desk_scenario() {
        let repository = Repository::in_memory();
        let buildings = crate::services::buildings::BuildingsService::new(repository.clone());
        let service = service(repository.clone());

        let hall = buildings.create("Hall A").await.unwrap();
        let key = Key::new(hall.id, "101", "room");

        let borrow = service.borrow(&key, &jane(), files(), None).await.unwrap();
        assert!(service.is_borrowed(&key.id).await.unwrap());
        assert!(matches!(
            service.borrow(&key, &jane(), files(), None).await,
            Err(AppError::AlreadyBorrowed(_))
        ));

        let returned = service.return_key(borrow.id).await.unwrap();
        assert!(!returned.borrowed);
        assert!(returned.returned_at.is_some());
        assert!(matches!(
            service.return_key(borrow.id).await,
            Err(AppError::AlreadyReturned(_))
        ));

        let details = service.get(borrow.id).await.unwrap();
        assert_eq!(details.key, key);
        assert_eq!(details.borrower.name, "Jane");
    }

    #[tokio::test]
    async fn test_borrow_creates_key_and_borrower() {
        let repository = Repository::in_memory();
        let service = service(repository.clone());
        let key = room_101();
        let borrower = jane();

        service.borrow(&key, &borrower, files(), None).await.unwrap();

        assert_eq!(repository.keys.get(&key.id).await.unwrap(), key);
        assert_eq!(repository.borrowers.get(borrower.id).await.unwrap(), borrower);
    }

    #[tokio::test]
    async fn test_key_can_be_borrowed_again_after_return() {
        let service = service(Repository::in_memory());
        let key = room_101();

        let first = service.borrow(&key, &jane(), files(), None).await.unwrap();
        service.return_key(first.id).await.unwrap();
        let second = service.borrow(&key, &jane(), files(), None).await.unwrap();

        assert_ne!(first.id, second.id);
        assert!(service.is_borrowed(&key.id).await.unwrap());

        let query = BorrowedKeyQuery {
            borrowed: Some(true),
            ..Default::default()
        };
        let (rows, total) = service.list(&query).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].id, second.id);
    }

    #[tokio::test]
    async fn test_master_and_room_keys_are_independent() {
        let service = service(Repository::in_memory());
        let building = ids::building_id("Hall A");

        service
            .borrow(&Key::new(building, "101", "room"), &jane(), files(), None)
            .await
            .unwrap();
        service
            .borrow(&Key::new(building, "101", "master"), &jane(), files(), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_return_unknown_borrow() {
        let service = service(Repository::in_memory());
        let err = service.return_key(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_reservation_collected_and_returned() {
        let repository = Repository::in_memory();
        let service = service(repository.clone());
        let key = room_101();
        let reserved = reservation(&repository, &key).await;

        let borrow = service
            .borrow(&key, &jane(), files(), Some(reserved.id))
            .await
            .unwrap();

        let collected = repository.reservations.get(reserved.id).await.unwrap();
        assert!(collected.collected);
        assert!(!collected.returned);
        assert_eq!(collected.borrowed_key_id, Some(borrow.id));

        service.return_key(borrow.id).await.unwrap();

        let returned = repository.reservations.get(reserved.id).await.unwrap();
        assert!(returned.returned);
    }

    #[tokio::test]
    async fn test_unknown_reservation_does_not_fail_borrow() {
        let service = service(Repository::in_memory());
        let key = room_101();

        let borrow = service
            .borrow(&key, &jane(), files(), Some(Uuid::new_v4()))
            .await
            .unwrap();
        assert!(borrow.borrowed);
    }

    #[tokio::test]
    async fn test_collected_reservation_is_not_relinked() {
        let repository = Repository::in_memory();
        let service = service(repository.clone());
        let building = ids::building_id("Hall A");
        let room = Key::new(building, "101", "room");
        let master = Key::new(building, "101", "master");
        let reserved = reservation(&repository, &room).await;

        let first = service.borrow(&room, &jane(), files(), Some(reserved.id)).await.unwrap();
        service.borrow(&master, &jane(), files(), Some(reserved.id)).await.unwrap();

        let stored = repository.reservations.get(reserved.id).await.unwrap();
        assert_eq!(stored.borrowed_key_id, Some(first.id));
    }

    #[tokio::test]
    async fn test_notifies_on_borrow() {
        use crate::services::notifications::MockNotifier;

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(1).returning(move |message| {
            let _ = tx.send(message.to_string());
        });
        let notifications = NotificationService::new(Arc::new(notifier), Duration::from_secs(3600));
        let service = BorrowedKeysService::new(Repository::in_memory(), notifications);

        service.borrow(&room_101(), &jane(), files(), None).await.unwrap();

        let message = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap();
        assert_eq!(message.as_deref(), Some("room key 101 borrowed by Jane"));
    }

    /// Push endpoint that never answers
    struct StalledNotifier;

    #[async_trait::async_trait]
    impl Notifier for StalledNotifier {
        async fn notify(&self, _message: &str) {
            std::future::pending::<()>().await;
        }
    }

    #[tokio::test]
    async fn test_borrow_does_not_wait_for_notification() {
        let repository = Repository::in_memory();
        let notifications = NotificationService::new(Arc::new(StalledNotifier), Duration::from_secs(3600));
        let service = BorrowedKeysService::new(repository.clone(), notifications);
        let key = room_101();

        let borrow = tokio::time::timeout(
            Duration::from_secs(2),
            service.borrow(&key, &jane(), files(), None),
        )
        .await
        .expect("borrow waited on the notifier")
        .unwrap();

        assert!(repository.borrowed_keys.exists(borrow.id).await.unwrap());
        assert!(service.is_borrowed(&key.id).await.unwrap());
    }
}
