//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use sencast::config::{config_file_path, ConfigurationError};
use sencast::provider::ProviderError;
use sencast::service::ServiceError;
use std::fmt;
use std::process;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration could not be loaded
    Config(ConfigurationError),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// Configuration loaded but rejected while wiring the service
    ServiceCreation(ServiceError),
    /// Authentication or catalog search failed during `search`
    Search(ServiceError),
    /// Authentication or catalog search failed during `run`
    Run(ServiceError),
    /// The run finished but some groups were aborted
    GroupsFailed { failed: usize, total: usize },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Config(ConfigurationError::NotFound(_)) => {
                eprintln!();
                eprintln!("Create a configuration file at:");
                eprintln!("  {}", config_file_path().display());
                eprintln!("or pass one explicitly with --config <PATH>.");
            }
            CliError::Search(e) | CliError::Run(e) if is_authentication(e) => {
                eprintln!();
                eprintln!("Check the [provider] section of your configuration:");
                eprintln!("  1. username and password (or api_key) are set");
                eprintln!("  2. the account is registered with the selected provider");
            }
            CliError::GroupsFailed { .. } => {
                eprintln!();
                eprintln!("Re-running with the same configuration retries only what is missing.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "{}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::ServiceCreation(e) => write!(f, "Invalid hindcast setup: {}", e),
            CliError::Search(e) => write!(f, "Catalog search failed: {}", e),
            CliError::Run(e) => write!(f, "Hindcast run failed: {}", e),
            CliError::GroupsFailed { failed, total } => {
                write!(f, "{} of {} group(s) failed", failed, total)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::ServiceCreation(e) => Some(e),
            CliError::Search(e) | CliError::Run(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigurationError> for CliError {
    fn from(e: ConfigurationError) -> Self {
        CliError::Config(e)
    }
}

fn is_authentication(error: &ServiceError) -> bool {
    matches!(
        error,
        ServiceError::ProviderError(ProviderError::Authentication(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_failure_is_not_labelled_as_search() {
        let error = CliError::Run(ServiceError::ProviderError(ProviderError::Authentication(
            "bad password".into(),
        )));

        let message = error.to_string();
        assert!(message.starts_with("Hindcast run failed"));
        assert!(message.contains("bad password"));
        assert!(!message.contains("search"));
    }

    #[test]
    fn test_authentication_is_detected_for_run_and_search() {
        let auth = || ServiceError::ProviderError(ProviderError::Authentication("denied".into()));
        let http = ServiceError::ProviderError(ProviderError::Http("HTTP 503".into()));

        assert!(is_authentication(&auth()));
        assert!(!is_authentication(&http));
        assert!(CliError::Search(auth()).to_string().starts_with("Catalog search failed"));
    }
}
