//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SUPABASE_ANON_KEY` - Anonymous API key for the hosted data store
//!   (fallback: `NEXT_PUBLIC_SUPABASE_ANON_KEY`)
//!
//! ## Optional
//! - `SUPABASE_URL` - Hosted data store project URL
//!   (fallback: `NEXT_PUBLIC_SUPABASE_URL`, default: local development stack)
//! - `DEFAULT_REGION` - Country code used when no hint matches (default: cl)
//! - `STOREFRONT_DATABASE_URL` - Direct `PostgreSQL` connection string
//!   (fallback: `DATABASE_URL`). When set, queries bypass the REST interface.
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 8000)
//! - `BACKEND_TIMEOUT_SECS` - Data store request timeout (default: 10)
//! - `REGION_REFRESH_TIMEOUT_SECS` - Region refresh attempt timeout (default: 5)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use kruuse_core::CountryCode;
use secrecy::SecretString;
use thiserror::Error;

/// Local development stack started by the hosted store's CLI.
pub const DEFAULT_SUPABASE_URL: &str = "http://127.0.0.1:54321";
pub const DEFAULT_REGION: &str = "cl";

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
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

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Hosted data store connection
    pub supabase: SupabaseConfig,
    /// Direct `PostgreSQL` connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// Region resolution settings
    pub region: RegionConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of error events sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions sent to Sentry
    pub sentry_traces_sample_rate: f32,
}

/// Hosted data store connection settings.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project URL, without the `/rest/v1` suffix
    pub url: String,
    /// Anonymous API key, sent as both `apikey` and bearer token
    pub anon_key: SecretString,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Region resolution settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionConfig {
    /// Country code preferred when neither path nor geo header match
    pub default_region: CountryCode,
    /// Upper bound for a single region refresh attempt
    pub refresh_timeout: Duration,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("STOREFRONT_PORT", "8000")?;

        let supabase = SupabaseConfig::from_env()?;
        let database_url = get_database_url("STOREFRONT_DATABASE_URL");
        let region = RegionConfig::from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = parse_env_or_default::<f32>("SENTRY_SAMPLE_RATE", "1.0")?;
        let sentry_traces_sample_rate =
            parse_env_or_default::<f32>("SENTRY_TRACES_SAMPLE_RATE", "0.0")?;

        Ok(Self {
            host,
            port,
            supabase,
            database_url,
            region,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl SupabaseConfig {
    /// Load the hosted store settings on their own (used by the CLI).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the API key is missing or insecure.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = get_env_with_fallback("SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL")
            .unwrap_or_else(|| DEFAULT_SUPABASE_URL.to_string());
        url::Url::parse(&url)
            .map_err(|e| ConfigError::InvalidEnvVar("SUPABASE_URL".to_string(), e.to_string()))?;

        let anon_key = get_env_with_fallback("SUPABASE_ANON_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("SUPABASE_ANON_KEY".to_string()))?;
        validate_secret_strength(&anon_key, "SUPABASE_ANON_KEY")?;

        let timeout =
            Duration::from_secs(parse_env_or_default::<u64>("BACKEND_TIMEOUT_SECS", "10")?);

        Ok(Self {
            url,
            anon_key: SecretString::from(anon_key),
            timeout,
        })
    }
}

impl RegionConfig {
    /// Settings with the given default country and a 5 second refresh bound.
    #[must_use]
    pub const fn new(default_region: CountryCode) -> Self {
        Self {
            default_region,
            refresh_timeout: Duration::from_secs(5),
        }
    }

    fn from_env() -> Result<Self, ConfigError> {
        let default_region = get_env_with_fallback("DEFAULT_REGION", "NEXT_PUBLIC_DEFAULT_REGION")
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let default_region = CountryCode::parse(&default_region)
            .map_err(|e| ConfigError::InvalidEnvVar("DEFAULT_REGION".to_string(), e.to_string()))?;
        let refresh_timeout = Duration::from_secs(parse_env_or_default::<u64>(
            "REGION_REFRESH_TIMEOUT_SECS",
            "5",
        )?);

        Ok(Self {
            default_region,
            refresh_timeout,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a direct database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    get_env_with_fallback(primary_key, "DATABASE_URL").map(SecretString::from)
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Get an environment variable, trying a legacy name when the primary is unset.
fn get_env_with_fallback(primary_key: &str, fallback_key: &str) -> Option<String> {
    get_optional_env(primary_key).or_else(|| get_optional_env(fallback_key))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
pub(crate) fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Real API keys (JWTs, random tokens) have high entropy
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued for the project."
            ),
        ));
    }

    Ok(())
}
