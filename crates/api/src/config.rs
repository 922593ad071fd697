//! Application configuration

use multihost_shared::SiteId;
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Redis (optional - falls back to the in-process domain cache)
    pub redis_url: Option<String>,

    // Site resolution
    pub resolver: ResolverSettings,
    pub site_cache_ttl: Duration,

    // Request binding
    pub redirect_on_no_match: bool,
    pub redirect_url: Option<String>,
    pub trust_forwarded_host: bool,

    // Logging
    pub log_format: LogFormat,
}

/// Settings consumed by the host resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Retry an unmatched host with `www.` added or removed
    pub auto_www: bool,
    /// Site returned when nothing matches; `None` makes unmatched hosts resolve to NotFound
    pub default_site_id: Option<SiteId>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            auto_www: true,
            default_site_id: None,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let default_site_id = env::var("DEFAULT_SITE_ID")
            .map_err(|_| ConfigError::Missing("DEFAULT_SITE_ID"))?
            .parse::<SiteId>()
            .map_err(|_| ConfigError::Invalid("DEFAULT_SITE_ID must be an integer site id"))?;

        let redirect_on_no_match = parse_bool("MULTIHOST_REDIRECT_ON_NO_MATCH", true);
        let redirect_url = env::var("MULTIHOST_REDIRECT_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        // A rejected request has nowhere to go without a redirect target
        if redirect_on_no_match && redirect_url.is_none() {
            return Err(ConfigError::Missing("MULTIHOST_REDIRECT_URL"));
        }

        Ok(Self {
            // Server
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),

            // Database
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),

            // Redis
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),

            // Site resolution
            resolver: ResolverSettings {
                auto_www: parse_bool("MULTIHOST_AUTO_WWW", true),
                default_site_id: Some(default_site_id),
            },
            site_cache_ttl: Duration::from_secs(
                env::var("SITE_CACHE_TTL_SECS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .unwrap_or(300),
            ),

            // Request binding
            redirect_on_no_match,
            redirect_url,
            trust_forwarded_host: parse_bool("MULTIHOST_TRUST_FORWARDED_HOST", false),

            // Logging
            log_format: match env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        })
    }
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|value| match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure config tests run serially (they modify shared env vars)
    static CONFIG_TEST_MUTEX: Mutex<()> = Mutex::new(());

    /// Helper to set required env vars for testing
    fn setup_minimal_config() {
        env::set_var("DATABASE_URL", "postgres://test");
        env::set_var("DEFAULT_SITE_ID", "1");
        env::set_var("MULTIHOST_REDIRECT_URL", "https://example.com/");
    }

    /// Helper to clear env vars after tests
    fn cleanup_config() {
        for key in [
            "DATABASE_URL",
            "DEFAULT_SITE_ID",
            "MULTIHOST_REDIRECT_URL",
            "MULTIHOST_REDIRECT_ON_NO_MATCH",
            "MULTIHOST_AUTO_WWW",
            "MULTIHOST_TRUST_FORWARDED_HOST",
            "REDIS_URL",
            "SITE_CACHE_TTL_SECS",
            "LOG_FORMAT",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_defaults() {
        let _lock = CONFIG_TEST_MUTEX.lock().unwrap();
        cleanup_config();
        setup_minimal_config();

        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:3000");
        assert!(config.resolver.auto_www);
        assert_eq!(config.resolver.default_site_id, Some(SiteId(1)));
        assert!(config.redirect_on_no_match);
        assert!(!config.trust_forwarded_host);
        assert!(config.redis_url.is_none());
        assert_eq!(config.site_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.log_format, LogFormat::Pretty);

        cleanup_config();
    }

    /// Combined default-site validation tests - runs serially to avoid env var race conditions
    #[test]
    fn test_default_site_validation() {
        let _lock = CONFIG_TEST_MUTEX.lock().unwrap();
        cleanup_config();

        // === Test 1: Missing default site ===
        setup_minimal_config();
        env::remove_var("DEFAULT_SITE_ID");
        match Config::from_env() {
            Err(ConfigError::Missing("DEFAULT_SITE_ID")) => {}
            other => panic!("Expected Missing error for DEFAULT_SITE_ID, got: {:?}", other),
        }

        // === Test 2: Non-numeric default site ===
        env::set_var("DEFAULT_SITE_ID", "main");
        assert!(matches!(Config::from_env(), Err(ConfigError::Invalid(_))));

        // === Test 3: Valid default site ===
        env::set_var("DEFAULT_SITE_ID", "7");
        let config = Config::from_env().unwrap();
        assert_eq!(config.resolver.default_site_id, Some(SiteId(7)));

        cleanup_config();
    }

    #[test]
    fn test_redirect_url_required_when_redirecting() {
        let _lock = CONFIG_TEST_MUTEX.lock().unwrap();
        cleanup_config();
        setup_minimal_config();
        env::remove_var("MULTIHOST_REDIRECT_URL");

        match Config::from_env() {
            Err(ConfigError::Missing("MULTIHOST_REDIRECT_URL")) => {}
            other => panic!("Expected Missing error for MULTIHOST_REDIRECT_URL, got: {:?}", other),
        }

        // Not redirecting: no target needed
        env::set_var("MULTIHOST_REDIRECT_ON_NO_MATCH", "false");
        let config = Config::from_env().unwrap();
        assert!(!config.redirect_on_no_match);
        assert!(config.redirect_url.is_none());

        cleanup_config();
    }

    #[test]
    fn test_flag_overrides() {
        let _lock = CONFIG_TEST_MUTEX.lock().unwrap();
        cleanup_config();
        setup_minimal_config();
        env::set_var("MULTIHOST_AUTO_WWW", "off");
        env::set_var("MULTIHOST_TRUST_FORWARDED_HOST", "1");
        env::set_var("REDIS_URL", "redis://localhost:6379");
        env::set_var("SITE_CACHE_TTL_SECS", "30");
        env::set_var("LOG_FORMAT", "json");

        let config = Config::from_env().unwrap();
        assert!(!config.resolver.auto_www);
        assert!(config.trust_forwarded_host);
        assert_eq!(config.redis_url.as_deref(), Some("redis://localhost:6379"));
        assert_eq!(config.site_cache_ttl, Duration::from_secs(30));
        assert_eq!(config.log_format, LogFormat::Json);

        cleanup_config();
    }
}
