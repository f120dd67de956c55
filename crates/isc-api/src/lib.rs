//! Axum HTTP API server for the ISC video catalog.
//!
//! This crate provides:
//! - Public read endpoints and admin mutation endpoints over `isc_store::Catalog`
//! - YouTube Data API and Gemini/Groq clients feeding the normalizer
//! - Admin JWT authentication, rate limiting and security headers
//! - Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::{ApiConfig, ProvidersConfig, StorageBackend};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::Ingestor;
pub use state::AppState;
