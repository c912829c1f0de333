//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string (not needed with `SHOPKEEP_STORE=memory`)
//! - `JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `SHOPKEEP_HOST` - Bind address (default: 127.0.0.1)
//! - `SHOPKEEP_PORT` - Listen port (default: 8080)
//! - `SHOPKEEP_STORE` - `postgres` (default) or `memory`
//! - `RUN_MIGRATIONS` - Apply migrations on startup (default: false)
//! - `JWT_TTL_HOURS` - Token lifetime in hours (default: 24)
//! - `STORE_TIMEOUT_SECS` - Deadline for every storage call (default: 10)
//! - `TRACKING_PREFIX` - Two uppercase letters prefixed to tracking codes (default: TH)
//! - `PUBLIC_ORDER_NOTE` - Note placed on new orders (default: "In progress")
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//!
//! ## Optional (TLS)
//! - `SHOPKEEP_TLS_CERT` - PEM-encoded certificate chain
//! - `SHOPKEEP_TLS_KEY` - PEM-encoded private key

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_ORDER_NOTE: &str = "In progress";

/// Substrings that mark a copied sample value (matched case-insensitively).
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "changeme",
    "placeholder",
    "example",
    "secret",
    "password",
    "your-",
    "xxx",
    "todo",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Which store backs the API
    pub store: StoreConfig,
    /// Token signing configuration
    pub jwt: JwtConfig,
    /// Order placement settings
    pub orders: OrderConfig,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
}

/// Storage backend selection.
#[derive(Debug, Clone)]
pub enum StoreConfig {
    Postgres {
        /// `PostgreSQL` database connection URL (contains password)
        database_url: SecretString,
        /// Apply pending migrations before serving
        run_migrations: bool,
    },
    /// Process-local store, lost on restart.
    Memory,
}

/// Token signing configuration.
///
/// Implements `Debug` manually to redact the secret.
#[derive(Clone)]
pub struct JwtConfig {
    /// HS256 signing secret
    pub secret: SecretString,
    /// How long issued tokens stay valid
    pub ttl: Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Order placement settings.
#[derive(Debug, Clone)]
pub struct OrderConfig {
    /// Prefix of generated tracking codes
    pub tracking_prefix: String,
    /// Note placed on every new order
    pub default_note: String,
    /// Deadline applied to each storage call
    pub store_timeout: Duration,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            tracking_prefix: "TH".to_string(),
            default_note: DEFAULT_ORDER_NOTE.to_string(),
            store_timeout: Duration::from_secs(10),
        }
    }
}

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl TlsConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        match (env_var("SHOPKEEP_TLS_CERT"), env_var("SHOPKEEP_TLS_KEY")) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "SHOPKEEP_TLS_*".to_string(),
                "Both SHOPKEEP_TLS_CERT and SHOPKEEP_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            host: parse_env::<IpAddr>("SHOPKEEP_HOST", "127.0.0.1")?,
            port: parse_env("SHOPKEEP_PORT", "8080")?,
            store: StoreConfig::from_env()?,
            jwt: JwtConfig::from_env()?,
            orders: OrderConfig::from_env()?,
            json_logs: env_var("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            sentry_dsn: env_var("SENTRY_DSN"),
            sentry_environment: env_var("SENTRY_ENVIRONMENT"),
            tls: TlsConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl StoreConfig {
    fn from_env() -> Result<Self, ConfigError> {
        match env_or("SHOPKEEP_STORE", "postgres").as_str() {
            "postgres" => Ok(Self::Postgres {
                database_url: require_env("DATABASE_URL").map(SecretString::from)?,
                run_migrations: parse_env("RUN_MIGRATIONS", "false")?,
            }),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::InvalidEnvVar(
                "SHOPKEEP_STORE".to_string(),
                format!("expected 'postgres' or 'memory', got '{other}'"),
            )),
        }
    }
}

impl JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret = require_env("JWT_SECRET")?;
        check_signing_secret("JWT_SECRET", &secret)?;

        Ok(Self {
            secret: SecretString::from(secret),
            ttl: positive_secs("JWT_TTL_HOURS", "24", 3600)?,
        })
    }
}

impl OrderConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let tracking_prefix = env_or("TRACKING_PREFIX", "TH");
        validate_tracking_prefix(&tracking_prefix)?;

        Ok(Self {
            tracking_prefix,
            default_note: env_or("PUBLIC_ORDER_NOTE", DEFAULT_ORDER_NOTE),
            store_timeout: positive_secs("STORE_TIMEOUT_SECS", "10", 1)?,
        })
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    env_var(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn env_or(key: &str, default: &str) -> String {
    env_var(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_or(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn positive_secs(key: &str, default: &str, unit: u64) -> Result<Duration, ConfigError> {
    match parse_env::<u64>(key, default)? {
        0 => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be at least 1".to_string(),
        )),
        n => Ok(Duration::from_secs(n.saturating_mul(unit))),
    }
}

fn validate_tracking_prefix(prefix: &str) -> Result<(), ConfigError> {
    if prefix.len() == 2 && prefix.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(
            "TRACKING_PREFIX".to_string(),
            format!("must be two uppercase ASCII letters, got '{prefix}'"),
        ))
    }
}

/// Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    let mut freq: HashMap<char, u32> = HashMap::new();
    let mut len = 0_u32;
    for c in s.chars() {
        *freq.entry(c).or_default() += 1;
        len += 1;
    }
    if len == 0 {
        return 0.0;
    }

    let len = f64::from(len);
    freq.values()
        .map(|&count| {
            let p = f64::from(count) / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject short, placeholder-looking or low-entropy signing secrets.
fn check_signing_secret(key: &str, secret: &str) -> Result<(), ConfigError> {
    let insecure = |reason: String| Err(ConfigError::InsecureSecret(key.to_string(), reason));

    let length = secret.chars().count();
    if length < MIN_JWT_SECRET_LENGTH {
        return insecure(format!(
            "must be at least {MIN_JWT_SECRET_LENGTH} characters (got {length})"
        ));
    }

    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return insecure(format!("appears to be a placeholder (contains '{pattern}')"));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return insecure(format!(
            "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
        ));
    }
    Ok(())
}
