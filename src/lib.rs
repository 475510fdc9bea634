//! Inter-library loan eligibility service
//!
//! Decides whether a bibliographic record can be ordered via inter-library
//! loan and which cooperating libraries already hold a usable copy. The
//! eligibility engine runs a configurable, ordered list of checks; some of
//! them consult the search index through the holdings locator.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
