//! Application state.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use isc_store::{Catalog, CatalogRepository, JsonFileRepository, MemoryRepository, SupabaseConfig, SupabaseRepository};

use crate::auth::JwtKeys;
use crate::config::{ApiConfig, StorageBackend};
use crate::services::Ingestor;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub catalog: Arc<Catalog>,
    pub ingest: Arc<Ingestor>,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    /// Open the configured catalog backend and provider clients.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let repo: Arc<dyn CatalogRepository> = match config.storage_backend {
            StorageBackend::Memory => Arc::new(MemoryRepository::new()),
            StorageBackend::File => Arc::new(
                JsonFileRepository::open(&config.data_dir)
                    .await
                    .with_context(|| format!("opening catalog in {}", config.data_dir.display()))?,
            ),
            StorageBackend::Supabase => {
                let supabase_config = SupabaseConfig::from_env().context("reading Supabase config")?;
                Arc::new(SupabaseRepository::new(supabase_config).context("building Supabase client")?)
            }
        };
        info!(backend = repo.backend(), "Catalog backend ready");

        let ingest = Ingestor::from_config(&config.providers).context("building provider clients")?;

        Ok(Self::with_parts(config, Catalog::new(repo), ingest))
    }

    /// Assemble state from prebuilt parts.
    pub fn with_parts(config: ApiConfig, catalog: Catalog, ingest: Ingestor) -> Self {
        let jwt = JwtKeys::new(&config.jwt_secret, config.jwt_ttl);
        Self {
            config,
            catalog: Arc::new(catalog),
            ingest: Arc::new(ingest),
            jwt: Arc::new(jwt),
        }
    }

    /// In-memory catalog, no providers.
    pub fn in_memory(config: ApiConfig) -> Self {
        Self::with_parts(config, Catalog::in_memory(), Ingestor::offline())
    }
}
