use thiserror::Error;

/// All the ways a scan can go wrong.
///
/// thiserror generates the boilerplate; note that most read-path errors
/// never reach callers at all - the classifier absorbs them and falls
/// open to a conservative status instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Catalog request failed: {0}")]
    Api(String),

    #[error("Cache operation failed: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sign-in required for this operation")]
    AuthRequired,

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn validation(field: &str, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<sovscan_api::CatalogError> for Error {
    fn from(err: sovscan_api::CatalogError) -> Self {
        match err {
            sovscan_api::CatalogError::AuthRequired => Error::AuthRequired,
            other => Error::Api(other.to_string()),
        }
    }
}

impl From<sovscan_cache::CacheError> for Error {
    fn from(err: sovscan_cache::CacheError) -> Self {
        Error::Cache(err.to_string())
    }
}
