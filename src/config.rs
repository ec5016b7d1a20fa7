//! # Runtime Configuration
//!
//! Settings for the attestation verifier's certificate retrieval, loaded from
//! the environment.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `CORS_PROXY_URL` | Prefix prepended to VCEK URLs for the first fetch attempt; empty disables the proxy | `https://cors.litgateway.com/` |
//! | `VCEK_FETCH_TIMEOUT_SECS` | Timeout of each certificate request, in seconds | `10` |
//! | `VCEK_CACHE_PATH` | redb file for persisting fetched certificates | in-memory cache |
use std::{path::PathBuf, time::Duration};

use tracing::warn;

/// Environment variable name for the CORS proxy prefix.
pub const CORS_PROXY_URL_ENV: &str = "CORS_PROXY_URL";

/// Environment variable name for the certificate request timeout.
pub const FETCH_TIMEOUT_ENV: &str = "VCEK_FETCH_TIMEOUT_SECS";

/// Environment variable name for the persistent certificate cache.
pub const CACHE_PATH_ENV: &str = "VCEK_CACHE_PATH";

pub const DEFAULT_CORS_PROXY_URL: &str = "https://cors.litgateway.com/";

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Prefix for the proxied fetch. `None` fetches directly.
    pub cors_proxy_url: Option<String>,
    pub fetch_timeout: Duration,
    /// Where to persist certificates. `None` keeps them in memory.
    pub cert_cache_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cors_proxy_url: Some(DEFAULT_CORS_PROXY_URL.to_string()),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            cert_cache_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let cors_proxy_url = match lookup(CORS_PROXY_URL_ENV) {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(v.trim().to_string()),
            None => defaults.cors_proxy_url,
        };

        let fetch_timeout = match lookup(FETCH_TIMEOUT_ENV) {
            Some(v) => match v.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    warn!(value = %v, "ignoring invalid {FETCH_TIMEOUT_ENV}");
                    defaults.fetch_timeout
                }
            },
            None => defaults.fetch_timeout,
        };

        let cert_cache_path = lookup(CACHE_PATH_ENV)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            cors_proxy_url,
            fetch_timeout,
            cert_cache_path,
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config, Config::default());
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.cors_proxy_url.as_deref(), Some(DEFAULT_CORS_PROXY_URL));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            (CORS_PROXY_URL_ENV, ""),
            (FETCH_TIMEOUT_ENV, "3"),
            (CACHE_PATH_ENV, "/tmp/vcek.redb"),
        ]);
        assert_eq!(config.cors_proxy_url, None);
        assert_eq!(config.fetch_timeout, Duration::from_secs(3));
        assert_eq!(config.cert_cache_path, Some(PathBuf::from("/tmp/vcek.redb")));
    }

    #[test]
    fn test_invalid_timeout_falls_back() {
        let config = config_from(&[(FETCH_TIMEOUT_ENV, "soon")]);
        assert_eq!(config.fetch_timeout, DEFAULT_FETCH_TIMEOUT);
        let config = config_from(&[(FETCH_TIMEOUT_ENV, "0")]);
        assert_eq!(config.fetch_timeout, DEFAULT_FETCH_TIMEOUT);
    }
}
