//! httpstash CLI - Command-line interface
//!
//! Fetch URLs through the persistent response cache, run resumable
//! downloads and manage the cache directory.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::style;

use commands::cache::CacheAction;
use commands::download::DownloadArgs;
use commands::get::GetArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "httpstash", version, about = "Cached HTTP fetches and resumable downloads")]
struct Cli {
    /// Configuration file (INI). Defaults to <config dir>/httpstash/config.ini
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch a URL through the response cache
    Get(GetArgs),
    /// Download a URL to a file, with resume and digest checks
    Download(DownloadArgs),
    /// Inspect or manage the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match httpstash::logging::init(cli.verbose, cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} {}", style("Warning:").yellow(), e);
            None
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = commands::load_config(cli.config.as_deref())?;
    tracing::debug!(
        cache_dir = %config.cache_dir.display(),
        mode = %config.default_cache_mode,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Get(args) => commands::get::run(config, args),
        Commands::Download(args) => commands::download::run(config, args),
        Commands::Cache { action } => commands::cache::run(config, action),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_download_flags() {
        let cli = Cli::parse_from([
            "httpstash",
            "--verbose",
            "download",
            "https://example.com/a.iso",
            "--dir",
            "/tmp",
            "--resume",
            "--sha256",
            "abc",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Download(args) => {
                assert!(args.resume);
                assert_eq!(args.sha256.as_deref(), Some("abc"));
                assert_eq!(args.dir, PathBuf::from("/tmp"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_get_mode() {
        let cli = Cli::parse_from([
            "httpstash",
            "get",
            "https://example.com/",
            "--mode",
            "cache-else-network",
            "--ttl",
            "10m",
            "-H",
            "Accept: text/plain",
        ]);
        match cli.command {
            Commands::Get(args) => {
                assert_eq!(args.mode, Some(httpstash::CacheMode::CacheElseNetwork));
                assert_eq!(args.headers, vec!["Accept: text/plain".to_string()]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
