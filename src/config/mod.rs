use std::env;

/// Runtime configuration for the WOPI host
#[derive(Debug, Clone)]
pub struct WopiConfig {
    /// Secret used to sign WOPI access tokens (Required in production)
    pub jwt_secret: String,

    /// Access token lifetime in seconds (default: 3600 = 1 hour)
    pub token_ttl_secs: i64,

    /// Lock lifetime in seconds (default: 1800 = 30 minutes)
    pub lock_ttl_secs: i64,

    /// Storage backend: "local" or "s3" (default: "local")
    pub storage_backend: String,

    /// Directory holding documents for the local backend (default: "./content")
    pub content_dir: String,

    /// Maximum accepted PutFile body in bytes (default: 64 MB)
    pub max_file_size: usize,

    /// Externally visible base URL, used for PostMessageOrigin / FileUrl
    pub public_base_url: String,

    /// Value reported in X-WOPI-MachineName
    pub machine_name: String,

    /// Breadcrumb brand shown by the editor chrome
    pub brand_name: String,
}

impl Default for WopiConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "secret".to_string(),
            token_ttl_secs: 3600,
            lock_ttl_secs: 30 * 60,
            storage_backend: "local".to_string(),
            content_dir: "./content".to_string(),
            max_file_size: 64 * 1024 * 1024, // 64 MB
            public_base_url: "http://localhost:3000".to_string(),
            machine_name: "wopi-host".to_string(),
            brand_name: "WOPI Host".to_string(),
        }
    }
}

impl WopiConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            jwt_secret: env::var("WOPI_JWT_SECRET").unwrap_or(default.jwt_secret), // Fallback for dev convenience

            token_ttl_secs: env::var("WOPI_TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.token_ttl_secs),

            lock_ttl_secs: env::var("WOPI_LOCK_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.lock_ttl_secs),

            storage_backend: env::var("STORAGE_BACKEND").unwrap_or(default.storage_backend),

            content_dir: env::var("WOPI_CONTENT_DIR").unwrap_or(default.content_dir),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            public_base_url: env::var("WOPI_PUBLIC_BASE_URL").unwrap_or(default.public_base_url),

            machine_name: env::var("WOPI_MACHINE_NAME").unwrap_or(default.machine_name),

            brand_name: env::var("WOPI_BRAND_NAME").unwrap_or(default.brand_name),
        }
    }

    /// Create config for development and tests
    pub fn development() -> Self {
        Self {
            jwt_secret: "dev-secret".to_string(),
            ..Self::default()
        }
    }
}
