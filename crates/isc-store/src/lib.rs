//! Catalog persistence for the ISC video catalog.
//!
//! This crate provides:
//! - The `CatalogRepository` seam and the `Catalog` mutation service
//! - In-memory and flat JSON file backends
//! - A Supabase (PostgREST) backend with retry and metrics

pub mod catalog;
pub mod document;
pub mod error;
pub mod json_file;
pub mod memory;
pub mod metrics;
pub mod repository;
pub mod retry;
pub mod supabase;

pub use catalog::{Catalog, Registration};
pub use error::{CatalogError, CatalogResult, StoreError, StoreResult};
pub use json_file::JsonFileRepository;
pub use memory::MemoryRepository;
pub use repository::CatalogRepository;
pub use retry::RetryConfig;
pub use supabase::{SupabaseConfig, SupabaseRepository};
