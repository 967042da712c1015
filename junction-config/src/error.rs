// Error types for route manifests

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A route entry was rejected by the dispatcher's registration rules
    #[error(transparent)]
    Route(#[from] junction_core::Error),
}

impl ConfigError {
    /// The underlying route error, if this is one
    pub fn route_error(&self) -> Option<&junction_core::Error> {
        match self {
            ConfigError::Route(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
