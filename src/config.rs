use std::{env, fmt::Display, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_STORAGE_URL: &str = "https://placeholder.supabase.co/storage/v1/object/public";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Public storage base; image URLs are `{storage_url}/{bucket}/{name}`.
    pub storage_url: String,
    pub gateway_buffer: usize,
    /// Enables the privileged handle used by the users page.
    pub service_key: Option<String>,
    pub admin_email: String,
    pub admin_password: String,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            storage_url: try_load(&lookup, "OTOCAP_STORAGE_URL", DEFAULT_STORAGE_URL)?,
            gateway_buffer: try_load(&lookup, "OTOCAP_GATEWAY_BUFFER", "32")?,
            service_key: var(&lookup, "OTOCAP_SERVICE_KEY"),
            admin_email: try_load(&lookup, "OTOCAP_ADMIN_EMAIL", "admin@otocap.local")?,
            admin_password: try_load(&lookup, "OTOCAP_ADMIN_PASSWORD", "admin")?,
        })
    }
}

fn var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    let value = lookup(key).filter(|v| !v.trim().is_empty());
    if value.is_none() {
        warn!("Environment variable {key} not found");
    }
    value
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = var(lookup, key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.storage_url, DEFAULT_STORAGE_URL);
        assert_eq!(config.gateway_buffer, 32);
        assert_eq!(config.service_key, None);
        assert_eq!(config.admin_email, "admin@otocap.local");
    }

    #[test]
    fn values_are_read_and_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("OTOCAP_GATEWAY_BUFFER", " 8 "),
            ("OTOCAP_SERVICE_KEY", "service-secret"),
            ("OTOCAP_STORAGE_URL", "https://cdn.test/public"),
        ]))
        .unwrap();
        assert_eq!(config.gateway_buffer, 8);
        assert_eq!(config.service_key.as_deref(), Some("service-secret"));
        assert_eq!(config.storage_url, "https://cdn.test/public");
    }

    #[test]
    fn unparsable_values_are_errors() {
        let err = Config::from_lookup(lookup(&[("OTOCAP_GATEWAY_BUFFER", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "OTOCAP_GATEWAY_BUFFER", .. }));
    }
}
