/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 5000)
/// - `APP_ENV`: `development` or `production` (default: development)
/// - `CORS_ORIGINS` / `FRONTEND_URL`: Comma-separated allowed origins
/// - `DATABASE_URL`: PostgreSQL connection string, or `memory` (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Secret key for JWT signing (optional; protected routes fail without it)
/// - `JWT_EXPIRES_IN`: Token lifetime such as `7d` or `12h` (default: 7d)
/// - `GOOGLE_CLIENT_ID`: Enables Google login
/// - `GOOGLE_TOKENINFO_URL`: Google token validation endpoint
/// - `EXPOSE_VERIFIER_ERRORS`: Include verifier detail in 401 bodies (default: false)
/// - `ALLOW_ADMIN_SIGNUP`: Allow `role: admin` on registration (default: false)
/// - `TASK_PAGE_MAX_LIMIT`: Upper bound for `limit` on task listings (default: 100)
/// - `REDIS_URL`: Enables the Redis relay for live events
/// - `WS_HEARTBEAT_SECS`: WebSocket ping interval (default: 30)
///
/// # Example
///
/// ```no_run
/// use taskboard_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use taskboard_shared::auth::identity::GOOGLE_TOKENINFO_URL;
use taskboard_shared::auth::jwt::parse_lifetime;

/// Value of `DATABASE_URL` that selects the in-process store
pub const MEMORY_DATABASE_URL: &str = "memory";

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Token and account configuration
    pub auth: AuthConfig,

    /// Task listing limits
    pub tasks: TaskConfig,

    /// Live update configuration
    pub realtime: RealtimeConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Environment name reported by the health endpoint
    pub environment: String,

    /// Production mode (HSTS, strict CORS)
    pub production: bool,

    /// Allowed CORS origins (`*` allows any)
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL, or `memory`
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url == MEMORY_DATABASE_URL
    }
}

/// Token and account configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT signing
    ///
    /// When absent the server still starts, but every protected route
    /// answers 500.
    #[serde(skip_serializing)]
    pub jwt_secret: Option<String>,

    /// Token lifetime in seconds
    pub token_lifetime_secs: i64,

    /// Google OAuth client ID; Google login is disabled without it
    pub google_client_id: Option<String>,

    /// Google token validation endpoint
    pub google_tokeninfo_url: String,

    /// Include verifier error detail in responses
    pub expose_verifier_errors: bool,

    /// Allow self-registration with the admin role
    pub allow_admin_signup: bool,
}

/// Task listing limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Upper bound for the `limit` query parameter
    pub page_max_limit: i64,
}

/// Live update configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Redis URL for multi-process fan-out
    pub redis_url: Option<String>,

    /// Interval between WebSocket pings
    pub heartbeat_secs: u64,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// Reads a `.env` file first if one is present.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` is missing
    /// - A numeric or duration variable has an invalid value
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let environment = var("APP_ENV").unwrap_or_else(|| "development".to_string());
        let production = environment.eq_ignore_ascii_case("production");

        let api_port = var("API_PORT")
            .unwrap_or_else(|| "5000".to_string())
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("Invalid API_PORT: {}", e))?;

        let cors_origins = match var("CORS_ORIGINS").or_else(|| var("FRONTEND_URL")) {
            Some(list) => split_list(&list),
            None if production => Vec::new(),
            None => vec!["*".to_string()],
        };

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("Invalid DATABASE_MAX_CONNECTIONS: {}", e))?;

        let lifetime = parse_lifetime(&var("JWT_EXPIRES_IN").unwrap_or_else(|| "7d".to_string()))
            .map_err(|e| anyhow::anyhow!("Invalid JWT_EXPIRES_IN: {}", e))?;

        let page_max_limit = var("TASK_PAGE_MAX_LIMIT")
            .unwrap_or_else(|| "100".to_string())
            .parse::<i64>()
            .map_err(|e| anyhow::anyhow!("Invalid TASK_PAGE_MAX_LIMIT: {}", e))?;
        if page_max_limit < 1 {
            anyhow::bail!("TASK_PAGE_MAX_LIMIT must be at least 1");
        }

        let heartbeat_secs = var("WS_HEARTBEAT_SECS")
            .unwrap_or_else(|| "30".to_string())
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("Invalid WS_HEARTBEAT_SECS: {}", e))?;

        Ok(Self {
            api: ApiConfig {
                host: var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: api_port,
                environment,
                production,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            auth: AuthConfig {
                jwt_secret: var("JWT_SECRET"),
                token_lifetime_secs: lifetime.num_seconds(),
                google_client_id: var("GOOGLE_CLIENT_ID"),
                google_tokeninfo_url: var("GOOGLE_TOKENINFO_URL")
                    .unwrap_or_else(|| GOOGLE_TOKENINFO_URL.to_string()),
                expose_verifier_errors: flag(var("EXPOSE_VERIFIER_ERRORS")),
                allow_admin_signup: flag(var("ALLOW_ADMIN_SIGNUP")),
            },
            tasks: TaskConfig { page_max_limit },
            realtime: RealtimeConfig {
                redis_url: var("REDIS_URL"),
                heartbeat_secs: heartbeat_secs.max(1),
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn flag(value: Option<String>) -> bool {
    matches!(
        value.as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}
