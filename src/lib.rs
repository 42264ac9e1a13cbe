//! Kapi Key Lending Tracker
//!
//! Records which physical key is checked out, by whom, with an ID image and
//! signature as proof, and tracks reservations for future pickup.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod ids;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
