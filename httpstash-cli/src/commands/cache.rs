//! Cache management CLI commands.

use clap::Subcommand;
use indicatif::HumanBytes;
use httpstash::cache::ResponseStore;
use httpstash::ClientConfig;

use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show cache location, entry count and size
    Info,
    /// Delete one entry by cache key
    Delete {
        /// Cache key (explicit key or request fingerprint)
        key: String,
    },
    /// Remove every cached response
    Clear,
}

/// Run a cache subcommand.
pub fn run(config: ClientConfig, action: CacheAction) -> Result<(), CliError> {
    let store = ResponseStore::open(&config.cache_dir, config.cache_max_bytes)?;

    match action {
        CacheAction::Info => {
            println!("Response cache: {}", store.root().display());
            println!("  Entries: {}", store.entry_count());
            println!(
                "  Size:    {} of {}",
                HumanBytes(store.size_bytes()),
                HumanBytes(store.max_size_bytes())
            );
        }
        CacheAction::Delete { key } => {
            if store.delete(&key)? {
                println!("Deleted cache entry {}", key);
            } else {
                println!("No cache entry for {}", key);
            }
        }
        CacheAction::Clear => {
            let entries = store.entry_count();
            let bytes = store.size_bytes();
            store.clear()?;
            println!("Cleared {} entries, freed {}", entries, HumanBytes(bytes));
        }
    }
    Ok(())
}
