//! Service error types.

use crate::config::ConfigurationError;
use crate::provider::{ProviderError, ProviderFactoryError};
use std::fmt;

/// Errors that end a hindcast before or instead of any group running.
///
/// Group-level and cell-level failures never surface here; they are part of
/// the [`RunReport`](crate::pipeline::RunReport).
#[derive(Debug)]
pub enum ServiceError {
    /// Invalid or incomplete configuration
    ConfigError(ConfigurationError),
    /// Authentication or catalog search failed
    ProviderError(ProviderError),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError(e) => write!(f, "Configuration error: {}", e),
            Self::ProviderError(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConfigError(e) => Some(e),
            Self::ProviderError(e) => Some(e),
        }
    }
}

impl From<ConfigurationError> for ServiceError {
    fn from(e: ConfigurationError) -> Self {
        Self::ConfigError(e)
    }
}

impl From<ProviderError> for ServiceError {
    fn from(e: ProviderError) -> Self {
        Self::ProviderError(e)
    }
}

impl From<ProviderFactoryError> for ServiceError {
    fn from(e: ProviderFactoryError) -> Self {
        match e {
            ProviderFactoryError::Configuration(e) => Self::ConfigError(e),
            ProviderFactoryError::Client(e) => Self::ProviderError(e),
        }
    }
}
