//! API configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::auth::is_password_hash;

/// Which catalog backend to open at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    File,
    Supabase,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" | "json" => Ok(Self::File),
            "supabase" => Ok(Self::Supabase),
            other => Err(format!("unknown storage backend: {other}")),
        }
    }
}

/// Metadata and AI provider settings.
#[derive(Debug, Clone)]
pub struct ProvidersConfig {
    pub youtube_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    /// `gemini` or `groq`; when unset the first configured provider wins
    pub ai_provider: Option<String>,
    /// Upper bound for a single provider call
    pub timeout: Duration,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            youtube_api_key: None,
            gemini_api_key: None,
            gemini_model: "gemini-2.0-flash".to_string(),
            groq_api_key: None,
            groq_model: "llama-3.1-8b-instant".to_string(),
            ai_provider: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl ProvidersConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            youtube_api_key: non_empty_var("YOUTUBE_API_KEY"),
            gemini_api_key: non_empty_var("GEMINI_API_KEY"),
            gemini_model: non_empty_var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            groq_api_key: non_empty_var("GROQ_API_KEY"),
            groq_model: non_empty_var("GROQ_MODEL").unwrap_or(defaults.groq_model),
            ai_provider: non_empty_var("AI_PROVIDER").map(|s| s.to_lowercase()),
            timeout: Duration::from_secs(
                std::env::var("PROVIDER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second, per client IP
    pub rate_limit_rps: u32,
    /// Request timeout
    pub request_timeout: Duration,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Argon2 PHC hash of the admin password; login is refused when unset
    pub admin_password_hash: Option<String>,
    /// HS256 signing secret for admin tokens
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    pub storage_backend: StorageBackend,
    /// Directory holding `db.json` for the file backend
    pub data_dir: PathBuf,
    /// Frontend assets served as the router fallback
    pub static_dir: PathBuf,
    pub providers: ProvidersConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            request_timeout: Duration::from_secs(30),
            max_body_size: 10 * 1024 * 1024, // 10MB
            environment: "development".to_string(),
            admin_password_hash: None,
            jwt_secret: uuid::Uuid::new_v4().to_string(),
            jwt_ttl: Duration::from_secs(24 * 3600),
            storage_backend: StorageBackend::File,
            data_dir: PathBuf::from("./data"),
            static_dir: PathBuf::from("public"),
            providers: ProvidersConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let jwt_secret = non_empty_var("JWT_SECRET")
            .or_else(|| non_empty_var("SUPABASE_SECRET"))
            .unwrap_or_else(|| {
                warn!("JWT_SECRET not set, using an ephemeral secret (tokens won't survive a restart)");
                defaults.jwt_secret.clone()
            });

        let admin_password_hash = non_empty_var("ADMIN_PASSWORD_HASH").filter(|hash| {
            let valid = is_password_hash(hash);
            if !valid {
                warn!("ADMIN_PASSWORD_HASH is not a PHC hash string, admin login is disabled");
            }
            valid
        });

        let storage_backend = match std::env::var("STORAGE_BACKEND") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("{e}, falling back to file");
                StorageBackend::File
            }),
            Err(_) => StorageBackend::File,
        };

        let data_dir = non_empty_var("DATA_DIR")
            .or_else(|| non_empty_var("RENDER_DISK_MOUNT_PATH"))
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .or_else(|_| std::env::var("PORT"))
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            request_timeout: Duration::from_secs(
                std::env::var("REQUEST_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10 * 1024 * 1024),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            admin_password_hash,
            jwt_secret,
            jwt_ttl: Duration::from_secs(
                std::env::var("JWT_TTL_HOURS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(24)
                    * 3600,
            ),
            storage_backend,
            data_dir,
            static_dir: non_empty_var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            providers: ProvidersConfig::from_env(),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
