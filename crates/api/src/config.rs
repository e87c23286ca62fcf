//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CARMART_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `CARMART_JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `CARMART_HOST` - Bind address (default: 127.0.0.1)
//! - `CARMART_PORT` - Listen port (default: 5000)
//! - `CARMART_BASE_URL` - Public URL of the API (default: `http://localhost:<port>`)
//! - `CARMART_CORS_ORIGIN` - Frontend origin allowed to send credentials
//!   (default: `http://localhost:3000`)
//! - `CARMART_UPLOAD_DIR` - Directory for listing photos (default: `uploads`)
//! - `CARMART_RATE_LIMIT` - `false` disables the auth rate limiter (default: true)
//! - `GEMINI_API_KEY` - Enables listing descriptions and search-by-image
//! - `GEMINI_MODEL` - Gemini model name (default: `gemini-1.5-flash`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0 to 1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Trace sample rate, 0.0 to 1.0 (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use axum::http::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Fragments of copy-pasted sample values, matched case-insensitively.
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
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

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the API; `https` enables `Secure` cookies
    pub base_url: String,
    /// Frontend origin allowed by CORS (with credentials)
    pub cors_origin: HeaderValue,
    /// Token signing secret
    pub jwt_secret: SecretString,
    /// Directory where listing photos are written
    pub upload_dir: PathBuf,
    /// Whether the auth endpoints are rate limited
    pub rate_limit: bool,
    /// Gemini configuration; `None` disables AI features
    pub gemini: Option<GeminiConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Gemini API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key
    pub api_key: SecretString,
    /// Model name (e.g., gemini-1.5-flash)
    pub model: String,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env is normal outside development.
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("CARMART_DATABASE_URL")?;
        let host = get_env_or_default("CARMART_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("CARMART_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("CARMART_PORT", "5000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("CARMART_PORT".to_string(), e.to_string()))?;
        let base_url = get_optional_env("CARMART_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{port}"));
        let cors_origin = get_env_or_default("CARMART_CORS_ORIGIN", "http://localhost:3000");
        let cors_origin = HeaderValue::from_str(&cors_origin).map_err(|e| {
            ConfigError::InvalidEnvVar("CARMART_CORS_ORIGIN".to_string(), e.to_string())
        })?;
        let jwt_secret = get_validated_secret("CARMART_JWT_SECRET")?;
        validate_jwt_secret(&jwt_secret, "CARMART_JWT_SECRET")?;
        let upload_dir = PathBuf::from(get_env_or_default("CARMART_UPLOAD_DIR", "uploads"));
        let rate_limit = parse_bool("CARMART_RATE_LIMIT", true)?;

        let gemini = GeminiConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            cors_origin,
            jwt_secret,
            upload_dir,
            rate_limit,
            gemini,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_rate("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: parse_rate("SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl GeminiConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(api_key) = get_optional_env("GEMINI_API_KEY").filter(|k| !k.trim().is_empty())
        else {
            return Ok(None);
        };
        validate_secret_strength(&api_key, "GEMINI_API_KEY")?;

        Ok(Some(Self {
            api_key: SecretString::from(api_key),
            model: get_env_or_default("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
        }))
    }
}

/// Read a variable, treating unset and non-UTF-8 values alike.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_owned())
}

/// `primary_key`, else the conventional `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    get_optional_env(primary_key)
        .or_else(|| get_optional_env("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_owned()))
}

/// Parse a boolean flag (`true`/`false`/`1`/`0`).
fn parse_bool(key: &str, default: bool) -> Result<bool, ConfigError> {
    match get_optional_env(key).as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected true or false, got {other:?}"),
        )),
    }
}

/// Parse a sample rate between 0.0 and 1.0.
fn parse_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    let rate = raw
        .trim()
        .parse::<f32>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be between 0.0 and 1.0".to_string(),
        ));
    }
    Ok(rate)
}

fn validate_jwt_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let length = secret.expose_secret().chars().count();
    if length < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_owned(),
            format!("needs {MIN_JWT_SECRET_LENGTH} or more characters, has {length}"),
        ));
    }
    Ok(())
}

/// Bits of information per character, from character frequencies.
fn bits_per_char(s: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    let mut total = 0_u32;
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = f64::from(total);
    counts
        .into_values()
        .map(|n| f64::from(n) / total)
        .map(|p| -p * p.log2())
        .sum()
}

/// Reject placeholder values and secrets typed by hand.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let insecure = |reason: String| -> Result<(), ConfigError> {
        Err(ConfigError::InsecureSecret(var_name.to_owned(), reason))
    };

    let lowered = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lowered.contains(*p)) {
        return insecure(format!("looks like a placeholder ({pattern:?})"));
    }

    let bits = bits_per_char(secret);
    if bits < MIN_ENTROPY_BITS_PER_CHAR {
        return insecure(format!(
            "{bits:.2} bits of entropy per character is below {MIN_ENTROPY_BITS_PER_CHAR}; \
             generate it with a password manager or `openssl rand -base64 48`"
        ));
    }
    Ok(())
}

fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value =
        get_optional_env(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_owned()))?;
    validate_secret_strength(&value, key)?;
    Ok(value.into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> ApiConfig {
        ApiConfig {
            database_url: SecretString::from("postgres://localhost/carmart"),
            host: "127.0.0.1".parse().unwrap(),
            port: 5000,
            base_url: base_url.to_string(),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            jwt_secret: SecretString::from("q7Lw2pX9vR4tZ8mN1bC6yH3kJ5dF0gS2"),
            upload_dir: PathBuf::from("uploads"),
            rate_limit: true,
            gemini: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    #[test]
    fn test_bits_per_char() {
        assert!(bits_per_char("").abs() < f64::EPSILON);
        assert!(bits_per_char("zzzz").abs() < f64::EPSILON);
        assert!((bits_per_char("abab") - 1.0).abs() < 1e-9);
        assert!((bits_per_char("abcd") - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_secret_strength() {
        assert!(matches!(
            validate_secret_strength("changeme-before-deploying-carmart", "CARMART_JWT_SECRET"),
            Err(ConfigError::InsecureSecret(_, _))
        ));
        assert!(validate_secret_strength(&"ab".repeat(20), "CARMART_JWT_SECRET").is_err());
        assert!(
            validate_secret_strength("q7Lw2pX9vR4tZ8mN1bC6yH3kJ5dF0gS2", "CARMART_JWT_SECRET")
                .is_ok()
        );
    }

    #[test]
    fn test_validate_jwt_secret_length() {
        assert!(validate_jwt_secret(&SecretString::from("short"), "JWT").is_err());
        assert!(validate_jwt_secret(&SecretString::from("k".repeat(32)), "JWT").is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let addr = config("http://localhost:5000").socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 5000);
    }

    #[test]
    fn test_secure_cookies_follow_scheme() {
        assert!(!config("http://localhost:5000").secure_cookies());
        assert!(config("https://api.carmart.example").secure_cookies());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut cfg = config("http://localhost:5000");
        cfg.gemini = Some(GeminiConfig {
            api_key: SecretString::from("AIzaSy-super-private-key"),
            model: DEFAULT_GEMINI_MODEL.to_string(),
        });
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("super-private-key"));
        assert!(!debug.contains("q7Lw2pX9"));
        assert!(debug.contains("gemini-1.5-flash"));
    }
}
