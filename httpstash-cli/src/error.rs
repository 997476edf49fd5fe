//! CLI error type.

use std::fmt;
use std::io;

use httpstash::cache::StoreError;
use httpstash::{ConfigError, FetchError};

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded or is invalid.
    Config(String),
    /// A request or download failed.
    Fetch(FetchError),
    /// The response store failed.
    Store(StoreError),
    /// Writing output failed.
    Output(io::Error),
    /// Bad command-line input.
    Usage(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Fetch(e) => write!(f, "{}", e),
            CliError::Store(e) => write!(f, "Cache error: {}", e),
            CliError::Output(e) => write!(f, "Failed to write output: {}", e),
            CliError::Usage(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Fetch(e) => Some(e),
            CliError::Store(e) => Some(e),
            CliError::Output(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FetchError> for CliError {
    fn from(e: FetchError) -> Self {
        CliError::Fetch(e)
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        CliError::Store(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Output(e)
    }
}
