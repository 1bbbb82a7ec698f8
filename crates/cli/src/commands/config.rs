//! Configuration commands.

use tiendita_storefront::config::{ConfigError, StorefrontConfig};

/// Load the storefront configuration and log a redacted summary.
///
/// # Errors
///
/// Returns the first configuration problem found.
pub fn check() -> Result<StorefrontConfig, ConfigError> {
    let config = StorefrontConfig::from_env()?;

    tracing::info!("Configuration is valid");
    tracing::info!("  Listen address: {}", config.socket_addr());
    tracing::info!("  Public URL: {}", config.base_url);
    tracing::info!("  Backend: {}", config.backend.url);
    tracing::info!("  API key: [REDACTED]");
    tracing::info!("  Image bucket: {}", config.backend.image_bucket);
    tracing::info!("  Request timeout: {:?}", config.backend.timeout);
    tracing::info!("  Catalog cache TTL: {:?}", config.catalog_cache_ttl);
    tracing::info!(
        "  Sentry: {}",
        if config.sentry_dsn.is_some() { "enabled" } else { "disabled" }
    );

    Ok(config)
}
