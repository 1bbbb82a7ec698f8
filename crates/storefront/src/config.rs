//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BACKEND_URL` - Base URL of the hosted backend (e.g. `https://abc.supabase.co`)
//! - `BACKEND_ANON_KEY` - Public (anon) API key of the backend project
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL (default: `http://{host}:{port}`)
//! - `BACKEND_IMAGE_BUCKET` - Storage bucket for product images (default: product-images)
//! - `BACKEND_TIMEOUT_SECS` - Per-request timeout for backend calls (default: 10)
//! - `CATALOG_CACHE_TTL_SECS` - Product listing cache lifetime (default: 60)
//! - `STOREFRONT_TRUST_PROXY` - Key rate limits on `X-Forwarded-For` set by a
//!   reverse proxy instead of the peer address (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Values shipped in the sample `.env` file.
const SAMPLE_VALUES: &[&str] = &["your_supabase_url_here", "your_supabase_anon_key_here"];

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your_",
    "your-",
    "tu-proyecto",
    "tu-clave",
    "changeme",
    "replace",
    "placeholder",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Setup steps printed when required configuration is missing.
pub const SETUP_HELP: &str = "\
Backend configuration is incomplete:
  1. Create a project on your backend provider and run the table setup script
  2. Copy the project URL and the anon/public key from the API settings
  3. Put them in .env:
       BACKEND_URL=https://your-project.supabase.co
       BACKEND_ANON_KEY=<anon key>";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Environment variable {0} still holds a placeholder value ({1})")]
    Placeholder(String, String),
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
    /// Public base URL for the storefront
    pub base_url: String,
    /// Hosted backend configuration
    pub backend: BackendConfig,
    /// How long the product listing stays cached
    pub catalog_cache_ttl: Duration,
    /// Whether client IPs come from proxy headers
    pub trust_proxy_headers: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Hosted backend (REST + storage) configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct BackendConfig {
    /// Project base URL
    pub url: Url,
    /// Anon/public API key
    pub anon_key: SecretString,
    /// Storage bucket for product images
    pub image_bucket: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field("image_bucket", &self.image_bucket)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// still hold placeholder values.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let host = vars
            .or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string()))?;
        let port = vars.parse_or("STOREFRONT_PORT", 3000_u16)?;
        let base_url = vars
            .optional("STOREFRONT_BASE_URL")
            .unwrap_or_else(|| format!("http://{host}:{port}"));

        let backend = BackendConfig::from_vars(&vars)?;
        let catalog_cache_ttl = Duration::from_secs(vars.parse_or("CATALOG_CACHE_TTL_SECS", 60_u64)?);
        let trust_proxy_headers = vars.parse_or("STOREFRONT_TRUST_PROXY", false)?;

        Ok(Self {
            host,
            port,
            base_url,
            backend,
            catalog_cache_ttl,
            trust_proxy_headers,
            sentry_dsn: vars.optional("SENTRY_DSN"),
            sentry_environment: vars.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the public URL is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl BackendConfig {
    fn from_vars<F>(vars: &Vars<F>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = vars.required("BACKEND_URL")?;
        reject_placeholder(&raw_url, "BACKEND_URL")?;
        let url = parse_backend_url(&raw_url)?;

        let anon_key = vars.required("BACKEND_ANON_KEY")?;
        reject_placeholder(&anon_key, "BACKEND_ANON_KEY")?;
        validate_secret_strength(&anon_key, "BACKEND_ANON_KEY")?;

        Ok(Self {
            url,
            anon_key: SecretString::from(anon_key),
            image_bucket: vars.or_default("BACKEND_IMAGE_BUCKET", "product-images"),
            timeout: Duration::from_secs(vars.parse_or("BACKEND_TIMEOUT_SECS", 10_u64)?),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup with the required/optional/default helpers.
struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get a required variable; blank counts as missing.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable; blank counts as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to a default when unset.
    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |raw| {
            raw.parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }
}

/// Parse and check the backend URL.
fn parse_backend_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar("BACKEND_URL".to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "BACKEND_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            "BACKEND_URL".to_string(),
            "must have a host".to_string(),
        ));
    }

    Ok(url)
}

/// Reject sample values and generic placeholder patterns.
fn reject_placeholder(value: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = value.to_lowercase();

    if SAMPLE_VALUES.contains(&lower.as_str()) {
        return Err(ConfigError::Placeholder(
            var_name.to_string(),
            "sample value from the setup instructions".to_string(),
        ));
    }

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::Placeholder(
                var_name.to_string(),
                format!("contains '{pattern}'"),
            ));
        }
    }

    Ok(())
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

/// Validate that an API key looks like a generated secret.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Copy the key from the backend's API settings."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const KEY: &str = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.eyJyb2xlIjoiYW5vbiJ9.q8Xv3kLm9";

    fn load(pairs: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = load(&[
            ("BACKEND_URL", "https://abc.supabase.co"),
            ("BACKEND_ANON_KEY", KEY),
        ])
        .unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.base_url, "http://127.0.0.1:3000");
        assert_eq!(config.backend.image_bucket, "product-images");
        assert_eq!(config.backend.timeout, Duration::from_secs(10));
        assert_eq!(config.catalog_cache_ttl, Duration::from_secs(60));
        assert!(!config.trust_proxy_headers);
        assert!(!config.is_secure());
    }

    #[test]
    fn test_missing_url() {
        let err = load(&[("BACKEND_ANON_KEY", KEY)]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "BACKEND_URL"));
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let err = load(&[("BACKEND_URL", "https://abc.supabase.co"), ("BACKEND_ANON_KEY", "  ")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "BACKEND_ANON_KEY"));
    }

    #[test]
    fn test_sample_values_rejected() {
        let err = load(&[
            ("BACKEND_URL", "your_supabase_url_here"),
            ("BACKEND_ANON_KEY", KEY),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Placeholder(_, _)));

        let err = load(&[
            ("BACKEND_URL", "https://abc.supabase.co"),
            ("BACKEND_ANON_KEY", "your_supabase_anon_key_here"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Placeholder(_, _)));
    }

    #[test]
    fn test_placeholder_pattern_in_url() {
        let err = load(&[
            ("BACKEND_URL", "https://tu-proyecto.supabase.co"),
            ("BACKEND_ANON_KEY", KEY),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Placeholder(ref v, _) if v == "BACKEND_URL"));
    }

    #[test]
    fn test_url_scheme_checked() {
        let err = load(&[("BACKEND_URL", "ftp://abc.example.net"), ("BACKEND_ANON_KEY", KEY)])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_low_entropy_key_rejected() {
        let err = load(&[
            ("BACKEND_URL", "https://abc.supabase.co"),
            ("BACKEND_ANON_KEY", "aaaaaaaaaaaaaaaaaaaaaaaa"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_invalid_port() {
        let err = load(&[
            ("BACKEND_URL", "https://abc.supabase.co"),
            ("BACKEND_ANON_KEY", KEY),
            ("STOREFRONT_PORT", "http"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref v, _) if v == "STOREFRONT_PORT"));
    }

    #[test]
    fn test_trust_proxy_flag() {
        let config = load(&[
            ("BACKEND_URL", "https://abc.supabase.co"),
            ("BACKEND_ANON_KEY", KEY),
            ("STOREFRONT_TRUST_PROXY", "true"),
        ])
        .unwrap();
        assert!(config.trust_proxy_headers);

        let err = load(&[
            ("BACKEND_URL", "https://abc.supabase.co"),
            ("BACKEND_ANON_KEY", KEY),
            ("STOREFRONT_TRUST_PROXY", "sometimes"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref v, _) if v == "STOREFRONT_TRUST_PROXY"));
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_backend_config_debug_redacts_key() {
        let config = load(&[
            ("BACKEND_URL", "https://abc.supabase.co"),
            ("BACKEND_ANON_KEY", KEY),
        ])
        .unwrap();

        let debug_output = format!("{:?}", config.backend);
        assert!(debug_output.contains("abc.supabase.co"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains(KEY));
    }
}
