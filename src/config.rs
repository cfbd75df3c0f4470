use serde::Deserialize;
use std::env;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the docpipe service.
///
/// Loaded once at startup and handed to component constructors explicitly;
/// there is no process-wide configuration singleton.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the REST persistence layer (documents and chunks).
    pub database_url: String,
    /// Service credential sent with every persistence request.
    pub database_api_key: String,
    /// Base URL of the embedding provider API.
    pub embedding_api_url: String,
    /// Optional bearer credential for the embedding provider.
    pub embedding_api_key: Option<String>,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Shared secret required by the job trigger endpoints.
    pub worker_secret: String,
    /// Optional override for the chunk window size (characters).
    pub chunk_size: Option<usize>,
    /// Optional override for the chunk overlap (characters).
    pub chunk_overlap: Option<usize>,
    /// Language hint handed to the OCR engine for image documents.
    pub ocr_language: Option<String>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Optional log file path; defaults to `logs/docpipe.log` when unset.
    pub log_file: Option<String>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: load_env("DATABASE_URL")?,
            database_api_key: load_env("DATABASE_API_KEY")?,
            embedding_api_url: load_env("EMBEDDING_API_URL")?,
            embedding_api_key: load_env_optional("EMBEDDING_API_KEY"),
            embedding_model: load_env("EMBEDDING_MODEL")?,
            embedding_dimension: load_env("EMBEDDING_DIMENSION")?
                .parse()
                .map_err(|_| ConfigError::InvalidValue("EMBEDDING_DIMENSION".to_string()))?,
            worker_secret: load_env("WORKER_SECRET")?,
            chunk_size: parse_optional("CHUNK_SIZE")?,
            chunk_overlap: parse_optional("CHUNK_OVERLAP")?,
            ocr_language: load_env_optional("OCR_LANGUAGE"),
            server_port: parse_optional("SERVER_PORT")?,
            log_file: load_env_optional("DOCPIPE_LOG_FILE"),
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Load `.env` (when present) and build the configuration, logging a summary.
pub fn init_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        database_url = %config.database_url,
        embedding_api_url = %config.embedding_api_url,
        embedding_model = %config.embedding_model,
        embedding_dimension = config.embedding_dimension,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_optional_rejects_garbage() {
        // SAFETY: test-local env mutation.
        unsafe { env::set_var("DOCPIPE_TEST_PORT_GARBAGE", "not-a-number") };
        let result: Result<Option<u16>, _> = parse_optional("DOCPIPE_TEST_PORT_GARBAGE");
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn load_env_optional_filters_blank() {
        unsafe { env::set_var("DOCPIPE_TEST_BLANK", "   ") };
        assert!(load_env_optional("DOCPIPE_TEST_BLANK").is_none());
    }
}
