#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

/// Process-wide configuration, read from the environment once at startup and
/// passed by reference into each component constructor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub embeddings: EmbeddingsConfig,
    pub vector_store: VectorStoreConfig,
    /// Path of the SQLite metadata database holding chunk status records.
    pub metadata_db_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingsConfig {
    /// Base URL of the OpenAI-compatible embedding service.
    pub endpoint: Url,
    pub api_key: String,
    /// Deployment/model name passed in each embedding request.
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorStoreConfig {
    /// PostgreSQL connection URL (user and password included).
    pub url: String,
    /// Table receiving one row per embedded chunk.
    pub table_name: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid embedding endpoint URL: {0}")]
    InvalidEndpoint(String),
    #[error("Invalid API key (cannot be empty)")]
    InvalidApiKey,
    #[error("Invalid model name (cannot be empty)")]
    InvalidModel,
    #[error("Invalid table name: {0} (letters, digits and underscores only)")]
    InvalidTableName(String),
    #[error("Home directory not found or could not be determined")]
    DirectoryError,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

const ENV_EMBEDDINGS_ENDPOINT: &str = "EMBEDDINGS_ENDPOINT";
const ENV_EMBEDDINGS_API_KEY: &str = "EMBEDDINGS_API_KEY";
const ENV_EMBEDDINGS_MODEL: &str = "EMBEDDINGS_MODEL";
const ENV_VECTOR_DB_URL: &str = "VECTOR_DB_URL";
const ENV_VECTOR_DB_TABLE: &str = "VECTOR_DB_TABLE";
const ENV_METADATA_DB_PATH: &str = "METADATA_DB_PATH";

const DEFAULT_VECTOR_TABLE: &str = "embeddings";

impl Config {
    /// Read and validate configuration from the environment.
    #[inline]
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint_raw = require_var(ENV_EMBEDDINGS_ENDPOINT)?;
        let endpoint =
            Url::parse(&endpoint_raw).map_err(|_| ConfigError::InvalidEndpoint(endpoint_raw))?;

        let api_key = require_var(ENV_EMBEDDINGS_API_KEY)?;
        if api_key.trim().is_empty() {
            return Err(ConfigError::InvalidApiKey);
        }

        let model = require_var(ENV_EMBEDDINGS_MODEL)?;
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel);
        }

        let vector_url = require_var(ENV_VECTOR_DB_URL)?;

        let table_name = env::var(ENV_VECTOR_DB_TABLE)
            .unwrap_or_else(|_| DEFAULT_VECTOR_TABLE.to_string());
        validate_table_name(&table_name)?;

        let metadata_db_path = match env::var(ENV_METADATA_DB_PATH) {
            Ok(path) => PathBuf::from(path),
            Err(_) => Self::default_metadata_db_path()?,
        };

        Ok(Self {
            embeddings: EmbeddingsConfig {
                endpoint,
                api_key,
                model,
            },
            vector_store: VectorStoreConfig {
                url: vector_url,
                table_name,
            },
            metadata_db_path,
        })
    }

    /// Default location of the metadata database, under the user's home
    /// directory.
    #[inline]
    pub fn default_metadata_db_path() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".pdf-ingest").join("metadata.db"))
            .ok_or(ConfigError::DirectoryError)
    }
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

fn validate_table_name(name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidTableName(name.to_string()))
    }
}
