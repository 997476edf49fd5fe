//! CLI command implementations.

pub mod cache;
pub mod download;
pub mod get;

use std::path::{Path, PathBuf};

use httpstash::{Client, ClientConfig};

use crate::error::CliError;

const CONFIG_FILE: &str = "config.ini";

/// Default configuration file location.
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("httpstash").join(CONFIG_FILE))
}

/// Load the configuration: explicit file, else the default file if present,
/// else built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<ClientConfig, CliError> {
    if let Some(path) = explicit {
        return Ok(ClientConfig::from_ini_file(path)?);
    }
    match default_config_path() {
        Some(path) if path.is_file() => Ok(ClientConfig::from_ini_file(&path)?),
        _ => Ok(ClientConfig::default()),
    }
}

/// Cancel every in-flight call on Ctrl+C.
pub fn install_interrupt_handler(client: &Client) -> Result<(), CliError> {
    let client = client.clone();
    ctrlc::set_handler(move || {
        let cancelled = client.cancel_all();
        eprintln!();
        eprintln!("Interrupted, cancelled {} call(s)", cancelled);
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))
}

/// Split a `Name: value` header argument.
pub fn parse_header(raw: &str) -> Result<(String, String), CliError> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| CliError::Usage(format!("Invalid header '{}', expected 'Name: value'", raw)))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::Usage(format!("Invalid header '{}': empty name", raw)));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
