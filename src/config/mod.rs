//! Tries to create an `AppConfig` from config files and the environment.
//! The configuration is layered with `figment`:
//! `base.toml` -> `{environment}.toml` -> `APP_*` env variables -> `DATABASE_URL`.
//! It is loaded once in `main` and then moved into the `App`.

mod error;
mod types;

use std::path::Path;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use tracing::info;

// Re-export config structs
pub use error::{ConfigError, ConfigResult};
pub use types::{AppConfig, DbConfig, Environment, NetConfig};

impl AppConfig {
    /// Loads the configuration from the `config` directory inside of the current DIR.
    /// The environment is read from `APP_ENVIRONMENT` and defaults to `local`.
    pub fn load() -> ConfigResult<Self> {
        let config_dir = std::env::current_dir()?.join("config");

        let environment: Environment = std::env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "local".into())
            .try_into()?;

        Self::load_from_dir(config_dir, environment)
    }

    /// Builds the configuration from the files in `config_dir` for the provided `environment`.
    /// Fails if the storage URI ends up missing from every source.
    pub fn load_from_dir(config_dir: impl AsRef<Path>, environment: Environment) -> ConfigResult<Self> {
        info!(
            "{:<20} - Initializing the configuration for: {}",
            "load_config",
            environment.as_ref()
        );
        let config_dir = config_dir.as_ref();
        let environment_filename = format!("{}.toml", environment.as_ref().to_lowercase());

        let config: AppConfig = Figment::new()
            .merge(Toml::file(config_dir.join("base.toml")))
            .merge(Toml::file(config_dir.join(environment_filename)))
            .merge(Env::prefixed("APP_").split("__"))
            .merge(
                Env::raw()
                    .only(&["DATABASE_URL"])
                    .map(|_| "db_config.uri".into()),
            )
            .extract()?;

        config.validate()?;

        Ok(config)
    }

    /// Fails fast on everything we can check before touching the network.
    fn validate(&self) -> ConfigResult<()> {
        self.db_config.connection_options()?;
        Ok(())
    }
}
