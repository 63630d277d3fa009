//! The configuration structs used to build the AppConfig, and their impls.
use std::{str::FromStr, time::Duration};

use lazy_regex::regex_captures;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sqlx::{
    postgres::{PgConnectOptions, PgSslMode},
    ConnectOptions,
};
use strum_macros::AsRefStr;

use crate::config::{ConfigError, ConfigResult};

const DEFAULT_PG_PORT: u16 = 5432;

// ###################################
// ->   STRUCTS
// ###################################
#[derive(AsRefStr, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

#[derive(Deserialize, Clone, Debug)]
pub struct AppConfig {
    pub net_config: NetConfig,
    pub db_config: DbConfig,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NetConfig {
    pub host: [u8; 4],
    pub app_port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DbConfig {
    /// postgres://{username}:{password}@{hostname}:{port}?sslmode={mode}
    /// Any database in the path is replaced by `db_name`. Only `sslmode` is read from the options.
    pub uri: Option<SecretString>,
    #[serde(default = "DbConfig::default_db_name")]
    pub db_name: String,
    #[serde(default = "DbConfig::default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "DbConfig::default_acquire_timeout_millis")]
    pub acquire_timeout_millis: u64,
}

// ###################################
// ->   IMPLs
// ###################################
impl DbConfig {
    fn default_db_name() -> String {
        "slyos".to_string()
    }
    fn default_max_connections() -> u32 {
        3
    }
    fn default_acquire_timeout_millis() -> u64 {
        30_000
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_millis)
    }

    pub fn connection_options(&self) -> ConfigResult<PgConnectOptions> {
        Ok(self.connection_options_without_db()?.database(&self.db_name))
    }

    pub fn connection_options_without_db(&self) -> ConfigResult<PgConnectOptions> {
        let uri = self.uri.as_ref().ok_or(ConfigError::MissingStorageUri)?;

        // postgres://{username}[:{password}]@{hostname}[:{port}][/{database}][?{options}]
        // Don't echo the URI in any error, it contains the password.
        let (_whole, username, password, host, port, _db_name, options) = regex_captures!(
            r#"^postgres(?:ql)?://([^:@/\s]+)(?::([^@\s]*))?@([^:/?\s]+)(?::(\d+))?(?:/([^\s/?]*))?(\?\S*)?$"#,
            uri.expose_secret()
        )
        .ok_or_else(|| {
            ConfigError::InvalidStorageUri(
                "expected 'postgres://{username}:{password}@{hostname}:{port}'".to_string(),
            )
        })?;

        let port = match port {
            "" => DEFAULT_PG_PORT,
            port => port
                .parse()
                .map_err(|_| ConfigError::InvalidStorageUri(format!("invalid port '{port}'")))?,
        };

        let mut ssl_mode = PgSslMode::default();
        if let Some(options) = options.strip_prefix('?') {
            for option in options.split('&') {
                if let Some(("sslmode", val)) = option.split_once('=') {
                    ssl_mode = PgSslMode::from_str(val).map_err(|_| {
                        ConfigError::InvalidStorageUri(format!("unknown sslmode '{val}'"))
                    })?;
                }
            }
        }

        // Create new PgConnectOptions struct but don't try to use the '$HOME/.pgpass' file.
        // Host, port, user and sslmode are always set so the ambient PG* defaults never apply.
        let mut opts = PgConnectOptions::new_without_pgpass()
            .host(host)
            .port(port)
            .username(username)
            .ssl_mode(ssl_mode);
        if !password.is_empty() {
            opts = opts.password(password);
        }

        Ok(opts.log_statements(tracing::log::LevelFilter::Trace))
    }
}

// ###################################
// ->   TRY FROMs
// ###################################

impl TryFrom<String> for Environment {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            _ => Err(Self::Error::StringToEnvironmentFail),
        }
    }
}

// ###################################
// ->   TESTS
// ###################################
