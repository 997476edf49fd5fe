//! Cache policy selection.

use std::fmt;
use std::str::FromStr;

/// How a request chooses between the response store and the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CacheMode {
    /// Serve from the store only; a miss is an error.
    OnlyCache,
    /// Always go to the network and write successful responses through.
    #[default]
    OnlyNetwork,
    /// Serve from the store when fresh, otherwise go to the network.
    CacheElseNetwork,
    /// Go to the network first, fall back to the store on any failure.
    NetworkElseCache,
}

impl CacheMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheMode::OnlyCache => "only-cache",
            CacheMode::OnlyNetwork => "only-network",
            CacheMode::CacheElseNetwork => "cache-else-network",
            CacheMode::NetworkElseCache => "network-else-cache",
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheMode {
    type Err = String;

    /// Accepts `only-cache`, `only_cache` and `ONLY_CACHE` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "only-cache" => Ok(CacheMode::OnlyCache),
            "only-network" => Ok(CacheMode::OnlyNetwork),
            "cache-else-network" => Ok(CacheMode::CacheElseNetwork),
            "network-else-cache" => Ok(CacheMode::NetworkElseCache),
            _ => Err(format!(
                "unknown cache mode '{}' (expected only-cache, only-network, cache-else-network or network-else-cache)",
                s
            )),
        }
    }
}
