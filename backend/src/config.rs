//! Application settings loaded via OrthoConfig.
//!
//! Values come from CLI flags, `WORKSHOP_*` environment variables, and an
//! optional configuration file, in that order of precedence.

use std::net::SocketAddr;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::outbound::persistence::PoolConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_POOL_MAX_SIZE: u32 = 10;

/// Console log rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line, including the active span.
    #[default]
    Json,
    /// Human-readable multi-line output for local development.
    Pretty,
}

/// Settings that failed validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("bind address {value:?} is not a socket address: {reason}")]
    BindAddr { value: String, reason: String },
    #[error("search sink uri {value:?} is not a valid URL: {reason}")]
    SearchSinkUri { value: String, reason: String },
    #[error("log format {0:?} is not one of json, pretty")]
    LogFormat(String),
    #[error("pool max size must be greater than zero")]
    PoolMaxSize,
}

/// Runtime settings for the users service.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "WORKSHOP")]
pub struct AppConfig {
    /// PostgreSQL connection string. Without it users are kept in memory.
    pub database_url: Option<String>,
    /// Socket address the HTTP server listens on.
    pub bind_addr: Option<String>,
    /// Base URL of the search cluster receiving log documents.
    pub search_sink_uri: Option<String>,
    /// `json` or `pretty`.
    pub log_format: Option<String>,
    /// Upper bound on pooled database connections.
    pub pool_max_size: Option<u32>,
    /// Leave the schema untouched at startup. Migrations run unless set.
    #[ortho_config(default = false)]
    pub skip_migrations: bool,
}

impl AppConfig {
    /// Whether migrations run at startup.
    pub fn run_migrations(&self) -> bool {
        !self.skip_migrations
    }

    /// Parsed listen address, defaulting to `0.0.0.0:8080`.
    ///
    /// # Errors
    /// Returns [`ConfigError::BindAddr`] when the value is not `host:port`.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|err: std::net::AddrParseError| ConfigError::BindAddr {
            value: raw.to_owned(),
            reason: err.to_string(),
        })
    }

    /// Parsed search sink endpoint, if configured.
    ///
    /// # Errors
    /// Returns [`ConfigError::SearchSinkUri`] for malformed or non-HTTP URLs.
    pub fn search_sink_uri(&self) -> Result<Option<Url>, ConfigError> {
        let Some(raw) = self.search_sink_uri.as_deref().filter(|raw| !raw.trim().is_empty())
        else {
            return Ok(None);
        };
        let invalid = |reason: String| ConfigError::SearchSinkUri {
            value: raw.to_owned(),
            reason,
        };
        let url = Url::parse(raw).map_err(|err| invalid(err.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(Some(url)),
            other => Err(invalid(format!("unsupported scheme {other}"))),
        }
    }

    /// Selected console format, defaulting to JSON.
    ///
    /// # Errors
    /// Returns [`ConfigError::LogFormat`] for unknown values.
    pub fn log_format(&self) -> Result<LogFormat, ConfigError> {
        match self.log_format.as_deref().map(str::trim) {
            None => Ok(LogFormat::default()),
            Some(value) if value.eq_ignore_ascii_case("json") => Ok(LogFormat::Json),
            Some(value) if value.eq_ignore_ascii_case("pretty") => Ok(LogFormat::Pretty),
            Some(other) => Err(ConfigError::LogFormat(other.to_owned())),
        }
    }

    /// Pool settings for the configured database, if any.
    ///
    /// # Errors
    /// Returns [`ConfigError::PoolMaxSize`] when the pool size is zero.
    pub fn pool_config(&self) -> Result<Option<PoolConfig>, ConfigError> {
        let max_size = self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE);
        if max_size == 0 {
            return Err(ConfigError::PoolMaxSize);
        }
        Ok(self
            .database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .map(|url| PoolConfig::new(url).with_max_size(max_size)))
    }

    /// Validate every derived setting up front so startup fails fast.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        self.search_sink_uri()?;
        self.log_format()?;
        self.pool_config()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing and validation.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::{fixture, rstest};

    const KEYS: [&str; 6] = [
        "WORKSHOP_DATABASE_URL",
        "WORKSHOP_BIND_ADDR",
        "WORKSHOP_SEARCH_SINK_URI",
        "WORKSHOP_LOG_FORMAT",
        "WORKSHOP_POOL_MAX_SIZE",
        "WORKSHOP_SKIP_MIGRATIONS",
    ];

    fn load_from_empty_args() -> AppConfig {
        AppConfig::load_from_iter([OsString::from("workshop")]).expect("config should load")
    }

    fn env_with(overrides: &[(&'static str, &str)]) -> Vec<(&'static str, Option<String>)> {
        KEYS.iter()
            .map(|key| {
                let value = overrides
                    .iter()
                    .find(|(name, _)| name == key)
                    .map(|(_, value)| (*value).to_owned());
                (*key, value)
            })
            .collect()
    }

    #[fixture]
    fn empty() -> AppConfig {
        AppConfig {
            database_url: None,
            bind_addr: None,
            search_sink_uri: None,
            log_format: None,
            pool_max_size: None,
            skip_migrations: false,
        }
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(env_with(&[]));

        let config = load_from_empty_args();
        assert!(config.database_url.is_none());
        assert!(!config.skip_migrations);
        assert!(config.run_migrations());
        assert_eq!(
            config.bind_addr().expect("default bind address"),
            SocketAddr::from(([0, 0, 0, 0], 8080))
        );
        assert_eq!(config.log_format(), Ok(LogFormat::Json));
        assert_eq!(config.search_sink_uri(), Ok(None));
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env(env_with(&[
            ("WORKSHOP_DATABASE_URL", "postgres://localhost/users"),
            ("WORKSHOP_BIND_ADDR", "127.0.0.1:9000"),
            ("WORKSHOP_SEARCH_SINK_URI", "http://search:9200"),
            ("WORKSHOP_LOG_FORMAT", "pretty"),
            ("WORKSHOP_POOL_MAX_SIZE", "3"),
            ("WORKSHOP_SKIP_MIGRATIONS", "false"),
        ]));

        let config = load_from_empty_args();
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/users")
        );
        assert!(!config.run_migrations());
        assert_eq!(
            config.bind_addr().expect("bind address"),
            SocketAddr::from(([127, 0, 0, 1], 9000))
        );
        assert_eq!(config.log_format(), Ok(LogFormat::Pretty));
        assert_eq!(
            config
                .search_sink_uri()
                .expect("sink uri")
                .map(|url| url.to_string()),
            Some("http://search:9200/".to_owned())
        );
        assert_eq!(config.pool_max_size, Some(3));
    }

    #[rstest]
    #[case("localhost")]
    #[case("0.0.0.0")]
    #[case("host:port")]
    fn malformed_bind_addr_is_rejected(mut empty: AppConfig, #[case] raw: &str) {
        empty.bind_addr = Some(raw.to_owned());
        assert!(matches!(
            empty.validate(),
            Err(ConfigError::BindAddr { .. })
        ));
    }

    #[rstest]
    #[case("not a url")]
    #[case("ftp://search:21")]
    fn malformed_sink_uri_is_rejected(mut empty: AppConfig, #[case] raw: &str) {
        empty.search_sink_uri = Some(raw.to_owned());
        assert!(matches!(
            empty.validate(),
            Err(ConfigError::SearchSinkUri { .. })
        ));
    }

    #[rstest]
    fn unknown_log_format_is_rejected(mut empty: AppConfig) {
        empty.log_format = Some("xml".to_owned());
        assert_eq!(empty.validate(), Err(ConfigError::LogFormat("xml".to_owned())));
    }

    #[rstest]
    fn pool_config_requires_database_url(mut empty: AppConfig) {
        assert!(empty.pool_config().expect("valid").is_none());

        empty.database_url = Some("postgres://localhost/users".to_owned());
        let pool = empty.pool_config().expect("valid").expect("pool configured");
        assert_eq!(pool.database_url(), "postgres://localhost/users");
    }

    #[rstest]
    fn zero_pool_size_is_rejected(mut empty: AppConfig) {
        empty.pool_max_size = Some(0);
        assert_eq!(empty.validate(), Err(ConfigError::PoolMaxSize));
    }

    #[rstest]
    #[case(None, true)]
    #[case(Some("false"), true)]
    #[case(Some("true"), false)]
    fn migrations_run_unless_skipped(#[case] skip: Option<&str>, #[case] expected: bool) {
        let overrides: Vec<(&'static str, &str)> = skip
            .map(|value| vec![("WORKSHOP_SKIP_MIGRATIONS", value)])
            .unwrap_or_default();
        let _guard = lock_env(env_with(&overrides));

        assert_eq!(load_from_empty_args().run_migrations(), expected);
    }

    #[rstest]
    fn skip_migrations_flag_disables_migrations() {
        let _guard = lock_env(env_with(&[]));

        let config = AppConfig::load_from_iter([
            OsString::from("workshop"),
            OsString::from("--skip-migrations"),
        ])
        .expect("config should load");
        assert!(!config.run_migrations());
    }
}
