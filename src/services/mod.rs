//! Business logic services

pub mod borrowed_keys;
pub mod buildings;
pub mod notifications;
pub mod reservations;
pub mod storage;

use std::{sync::Arc, time::Duration};

use crate::{config::NotificationsConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub buildings: buildings::BuildingsService,
    pub borrowed_keys: borrowed_keys::BorrowedKeysService,
    pub reservations: reservations::ReservationsService,
    pub storage: storage::StorageService,
    pub notifications: notifications::NotificationService,
}

impl Services {
    /// Create all services over the given repository and collaborators
    pub fn new(
        repository: Repository,
        blobs: Arc<dyn storage::BlobStore>,
        notifier: Arc<dyn notifications::Notifier>,
        notifications_config: &NotificationsConfig,
    ) -> Self {
        let notifications = notifications::NotificationService::new(
            notifier,
            Duration::from_secs(notifications_config.heartbeat_interval_secs),
        );

        Self {
            buildings: buildings::BuildingsService::new(repository.clone()),
            borrowed_keys: borrowed_keys::BorrowedKeysService::new(
                repository.clone(),
                notifications.clone(),
            ),
            reservations: reservations::ReservationsService::new(repository),
            storage: storage::StorageService::new(blobs),
            notifications,
        }
    }
}
