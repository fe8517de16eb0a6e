//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPNOW_BACKEND_URL` - Base URL of the document store REST API
//! - `SHOPNOW_API_KEY` - API key for the document store (high entropy)
//!
//! ## Optional
//! - `SHOPNOW_PRODUCTS_COLLECTION` - Catalog collection name (default: products)
//! - `SHOPNOW_CARTS_COLLECTION` - Cart collection name (default: carts)
//! - `SHOPNOW_PAGE_SIZE` - Products per page, 1-100 (default: 10)
//! - `SHOPNOW_CART_SYNC_DEBOUNCE_MS` - Quiet period before a cart write (default: 1000)
//! - `SHOPNOW_LOAD_MORE_THRESHOLD` - Viewports remaining that trigger load-more (default: 0.5)
//! - `SHOPNOW_NAME_MAX_CHARS` - Product name length before truncation (default: 18)
//! - `SHOPNOW_CURRENCY` - Currency shown next to prices (default: EGP)
//! - `SHOPNOW_CACHE_TTL_SECS` - Product page cache TTL (default: 300)
//! - `SHOPNOW_HTTP_TIMEOUT_SECS` - HTTP request timeout (default: 15)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Sentry error sample rate (default: 1.0)

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use shopnow_core::CurrencyCode;
use thiserror::Error;
use url::Url;

const MIN_API_KEY_LENGTH: usize = 20;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const MAX_PAGE_SIZE: usize = 100;

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

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Remote document store connection
    pub backend: BackendConfig,
    /// Product list behaviour
    pub list: ListSettings,
    /// Sentry error tracking
    pub sentry: SentryConfig,
}

/// Document store connection settings.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL of the REST API
    pub base_url: Url,
    /// API key sent as a bearer token
    pub api_key: SecretString,
    /// Collection holding catalog products
    pub products_collection: String,
    /// Collection holding per-user cart documents
    pub carts_collection: String,
    /// How long fetched product pages stay cached
    pub cache_ttl: Duration,
    /// Timeout applied to every HTTP request
    pub http_timeout: Duration,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("products_collection", &self.products_collection)
            .field("carts_collection", &self.carts_collection)
            .field("cache_ttl", &self.cache_ttl)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

/// Product list behaviour.
///
/// Defaults match the shop screen: pages of 10, a 1 second cart sync quiet
/// period, load-more at half a viewport from the end, 18 character names.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSettings {
    /// Products requested per page
    pub page_size: usize,
    /// Quiet period before the cart is written to the remote store
    pub cart_sync_debounce: Duration,
    /// Fraction of a viewport remaining that triggers load-more
    pub load_more_threshold: f64,
    /// Names longer than this are truncated with `...`
    pub name_max_chars: usize,
    /// Currency shown next to prices
    pub currency: CurrencyCode,
}

impl Default for ListSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            cart_sync_debounce: Duration::from_millis(1000),
            load_more_threshold: 0.5,
            name_max_chars: 18,
            currency: CurrencyCode::EGP,
        }
    }
}

/// Sentry error tracking settings.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    /// Sentry DSN; tracking is disabled when absent
    pub dsn: Option<String>,
    /// Environment tag (e.g. production, staging)
    pub environment: Option<String>,
    /// Error event sample rate
    pub sample_rate: f32,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            backend: BackendConfig::from_env()?,
            list: ListSettings::from_env()?,
            sentry: SentryConfig::from_env()?,
        })
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = get_required_env("SHOPNOW_BACKEND_URL")?;
        let base_url = Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("SHOPNOW_BACKEND_URL".to_string(), e.to_string())
        })?;

        Ok(Self {
            base_url,
            api_key: get_validated_secret("SHOPNOW_API_KEY")?,
            products_collection: get_env_or_default("SHOPNOW_PRODUCTS_COLLECTION", "products"),
            carts_collection: get_env_or_default("SHOPNOW_CARTS_COLLECTION", "carts"),
            cache_ttl: Duration::from_secs(parse_env_or("SHOPNOW_CACHE_TTL_SECS", 300)?),
            http_timeout: Duration::from_secs(parse_env_or("SHOPNOW_HTTP_TIMEOUT_SECS", 15)?),
        })
    }
}

impl ListSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let settings = Self {
            page_size: parse_env_or("SHOPNOW_PAGE_SIZE", defaults.page_size)?,
            cart_sync_debounce: Duration::from_millis(parse_env_or(
                "SHOPNOW_CART_SYNC_DEBOUNCE_MS",
                1000,
            )?),
            load_more_threshold: parse_env_or(
                "SHOPNOW_LOAD_MORE_THRESHOLD",
                defaults.load_more_threshold,
            )?,
            name_max_chars: parse_env_or("SHOPNOW_NAME_MAX_CHARS", defaults.name_max_chars)?,
            currency: parse_env_or("SHOPNOW_CURRENCY", defaults.currency)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Check that the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` naming the offending variable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPNOW_PAGE_SIZE".to_string(),
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }
        if !self.load_more_threshold.is_finite() || self.load_more_threshold < 0.0 {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPNOW_LOAD_MORE_THRESHOLD".to_string(),
                "must be a non-negative number".to_string(),
            ));
        }
        if self.name_max_chars == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPNOW_NAME_MAX_CHARS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env_or("SENTRY_SAMPLE_RATE", 1.0)?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an optional environment variable, falling back to `default` when unset.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
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
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is long enough, not a placeholder, and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    if secret.len() < MIN_API_KEY_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_API_KEY_LENGTH,
                secret.len()
            ),
        ));
    }

    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated key."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_shannon_entropy_counts_chars_not_bytes() {
        // Two distinct multi-byte chars, equally frequent: exactly one bit
        assert!((shannon_entropy("éüéü") - 1.0).abs() < 0.001);
        assert!((shannon_entropy("ab") - shannon_entropy("éü")).abs() < 0.001);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-goes-right-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_too_short() {
        let result = validate_secret_strength("aB3$xY9!", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_list_settings_defaults() {
        let settings = ListSettings::default();
        assert_eq!(settings.page_size, 10);
        assert_eq!(settings.cart_sync_debounce, Duration::from_secs(1));
        assert_eq!(settings.name_max_chars, 18);
        assert_eq!(settings.currency, CurrencyCode::EGP);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_list_settings_rejects_zero_page_size() {
        let settings = ListSettings {
            page_size: 0,
            ..ListSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidEnvVar(var, _)) if var == "SHOPNOW_PAGE_SIZE"
        ));
    }

    #[test]
    fn test_list_settings_rejects_negative_threshold() {
        let settings = ListSettings {
            load_more_threshold: -1.0,
            ..ListSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_backend_config_debug_redacts_api_key() {
        let config = BackendConfig {
            base_url: Url::parse("https://store.example.test").unwrap(),
            api_key: SecretString::from("super_secret_api_key_value"),
            products_collection: "products".to_string(),
            carts_collection: "carts".to_string(),
            cache_ttl: Duration::from_secs(300),
            http_timeout: Duration::from_secs(15),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("store.example.test"));
        assert!(debug_output.contains("products"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_api_key_value"));
    }
}
