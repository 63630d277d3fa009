pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to build the 'Environment' from the provided string.")]
    StringToEnvironmentFail,
    #[error("missing storage URI: set 'db_config.uri' or the DATABASE_URL env variable")]
    MissingStorageUri,
    #[error("failed to parse the storage URI: {0}")]
    InvalidStorageUri(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("figment error: {0}")]
    Figment(#[from] figment::Error),
}
