//! Database and mapper configuration.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_MAX_CONNECTIONS: &str = "GHOSTMAP_MAX_CONNECTIONS";
pub const ENV_ACQUIRE_TIMEOUT_SECS: &str = "GHOSTMAP_ACQUIRE_TIMEOUT_SECS";
pub const ENV_STATEMENT_TIMEOUT_MS: &str = "GHOSTMAP_STATEMENT_TIMEOUT_MS";
pub const ENV_LOAD_TIMEOUT_MS: &str = "GHOSTMAP_LOAD_TIMEOUT_MS";

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOAD_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("database url is not configured (set DATABASE_URL)")]
    MissingUrl,

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

/// Connection and timeout settings.
///
/// Deserializable (missing fields take the defaults) or read from the
/// environment with [`DatabaseConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Applied to mapper statements whose context has no timeout of its own.
    pub statement_timeout_ms: Option<u64>,
    /// Bound on a ghost load.
    pub load_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
            statement_timeout_ms: None,
            load_timeout_ms: DEFAULT_LOAD_TIMEOUT_MS,
        }
    }
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Read settings from the process environment.
    ///
    /// Unset variables keep their defaults; unparsable ones are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`DatabaseConfig::from_env`], with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_DATABASE_URL) {
            config.url = url;
        }
        if let Some(v) = parse_var(&lookup, ENV_MAX_CONNECTIONS) {
            config.max_connections = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_ACQUIRE_TIMEOUT_SECS) {
            config.acquire_timeout_secs = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_STATEMENT_TIMEOUT_MS) {
            config.statement_timeout_ms = Some(v);
        }
        if let Some(v) = parse_var(&lookup, ENV_LOAD_TIMEOUT_MS) {
            config.load_timeout_ms = v;
        }

        config
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout_ms = Some(duration_ms(timeout));
        self
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn statement_timeout(&self) -> Option<Duration> {
        self.statement_timeout_ms.map(Duration::from_millis)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    /// Checks needed before opening a pool.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                key: ENV_MAX_CONNECTIONS,
                message: "must be at least 1".into(),
            });
        }
        if self.load_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: ENV_LOAD_TIMEOUT_MS,
                message: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "ignoring unparsable setting");
            None
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Per-mapper behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapperSettings {
    /// `find` on a miss returns a ghost instead of querying.
    pub lazy_loading: bool,
    pub load_timeout: Duration,
    pub statement_timeout: Option<Duration>,
}

impl Default for MapperSettings {
    fn default() -> Self {
        Self {
            lazy_loading: false,
            load_timeout: Duration::from_millis(DEFAULT_LOAD_TIMEOUT_MS),
            statement_timeout: None,
        }
    }
}

impl MapperSettings {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            lazy_loading: false,
            load_timeout: config.load_timeout(),
            statement_timeout: config.statement_timeout(),
        }
    }

    pub fn lazy() -> Self {
        Self::default().with_lazy_loading(true)
    }

    pub fn with_lazy_loading(mut self, lazy: bool) -> Self {
        self.lazy_loading = lazy;
        self
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = DatabaseConfig::from_lookup(lookup(&[]));
        assert_eq!(config, DatabaseConfig::default());
        assert_eq!(config.load_timeout(), Duration::from_secs(5));
        assert_eq!(config.acquire_timeout(), Duration::from_secs(30));
        assert_eq!(config.validate(), Err(ConfigError::MissingUrl));
    }

    #[test]
    fn environment_overrides_and_bad_values_are_ignored() {
        let config = DatabaseConfig::from_lookup(lookup(&[
            (ENV_DATABASE_URL, "postgres://localhost/ghostmap"),
            (ENV_MAX_CONNECTIONS, "four"),
            (ENV_STATEMENT_TIMEOUT_MS, "250"),
            (ENV_LOAD_TIMEOUT_MS, " 1500 "),
        ]));

        assert_eq!(config.url, "postgres://localhost/ghostmap");
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.statement_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.load_timeout(), Duration::from_millis(1500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserializes_with_partial_fields() {
        let config: DatabaseConfig =
            serde_json::from_str(r#"{"url":"postgres://db/app","max_connections":2}"#).unwrap();
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.load_timeout_ms, DEFAULT_LOAD_TIMEOUT_MS);
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let config = DatabaseConfig::new("postgres://db/app").with_max_connections(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key: ENV_MAX_CONNECTIONS, .. })
        ));
    }

    #[test]
    fn mapper_settings_follow_config() {
        let config = DatabaseConfig::new("postgres://db/app")
            .with_load_timeout(Duration::from_secs(2))
            .with_statement_timeout(Duration::from_millis(300));
        let settings = MapperSettings::from_config(&config).with_lazy_loading(true);

        assert!(settings.lazy_loading);
        assert_eq!(settings.load_timeout, Duration::from_secs(2));
        assert_eq!(settings.statement_timeout, Some(Duration::from_millis(300)));
    }
}
