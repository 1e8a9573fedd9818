//! Shelfmark Library Circulation Server
//!
//! A Rust implementation of a library circulation tracker, providing a REST
//! JSON API for managing book inventory, user accounts, and the borrow/return
//! lifecycle with overdue-fine computation.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
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
