//! RPC endpoint configuration
//!
//! Resolution order:
//! 1. `FLARE_RPC_URL` / `COSTON2_RPC_URL` - per-chain URLs
//! 2. Public RPC fallbacks - rate limited, for testing only
//!
//! ```bash
//! export FLARE_RPC_URL="https://flare-api.flare.network/ext/C/rpc"
//! ```

use std::collections::HashMap;

/// RPC configuration for the supported chains
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// RPC URLs indexed by chain ID
    urls: HashMap<u64, String>,
}

/// Chain ID constants
pub mod chains {
    pub const FLARE: u64 = 14;
    pub const COSTON2: u64 = 114;
}

/// Environment variable names
mod env_vars {
    pub const FLARE_RPC_URL: &str = "FLARE_RPC_URL";
    pub const COSTON2_RPC_URL: &str = "COSTON2_RPC_URL";
}

/// Public RPC endpoints (rate limited, for testing only)
mod public_rpcs {
    pub const FLARE: &str = "https://flare-api.flare.network/ext/C/rpc";
    pub const COSTON2: &str = "https://coston2-api.flare.network/ext/C/rpc";
}

impl RpcConfig {
    /// Create RPC config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create RPC config from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut urls = HashMap::new();

        if let Some(url) = lookup(env_vars::FLARE_RPC_URL) {
            tracing::debug!("Using FLARE_RPC_URL for Flare");
            urls.insert(chains::FLARE, url);
        }
        if let Some(url) = lookup(env_vars::COSTON2_RPC_URL) {
            tracing::debug!("Using COSTON2_RPC_URL for Coston2");
            urls.insert(chains::COSTON2, url);
        }

        if !urls.contains_key(&chains::FLARE) {
            tracing::warn!("No RPC configured for Flare, using public RPC (rate limited)");
        }
        urls.entry(chains::FLARE)
            .or_insert_with(|| public_rpcs::FLARE.to_string());
        urls.entry(chains::COSTON2)
            .or_insert_with(|| public_rpcs::COSTON2.to_string());

        Self { urls }
    }

    /// Create with explicit RPC URLs
    pub fn with_urls(urls: HashMap<u64, String>) -> Self {
        Self { urls }
    }

    /// Get RPC URL for a chain
    pub fn get(&self, chain_id: u64) -> Option<&str> {
        self.urls.get(&chain_id).map(|s| s.as_str())
    }

    /// Check if a chain is configured
    pub fn has_chain(&self, chain_id: u64) -> bool {
        self.urls.contains_key(&chain_id)
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_url() {
        let mut urls = HashMap::new();
        urls.insert(chains::FLARE, "https://custom.rpc".to_string());
        let config = RpcConfig::with_urls(urls);

        assert_eq!(config.get(chains::FLARE), Some("https://custom.rpc"));
        assert_eq!(config.get(999), None);
        assert!(!config.has_chain(chains::COSTON2));
    }

    #[test]
    fn test_from_env_covers_all_chains() {
        let config = RpcConfig::from_env();

        assert!(config.has_chain(chains::FLARE));
        assert!(config.has_chain(chains::COSTON2));
    }

    #[test]
    fn test_public_rpc_fallback() {
        let config = RpcConfig::from_lookup(|_| None);

        assert_eq!(config.get(chains::FLARE), Some(public_rpcs::FLARE));
        assert_eq!(config.get(chains::COSTON2), Some(public_rpcs::COSTON2));
    }

    #[test]
    fn test_configured_url_overrides_fallback() {
        let config = RpcConfig::from_lookup(|name| {
            (name == env_vars::COSTON2_RPC_URL).then(|| "https://coston2.custom".to_string())
        });

        assert_eq!(config.get(chains::COSTON2), Some("https://coston2.custom"));
        assert_eq!(config.get(chains::FLARE), Some(public_rpcs::FLARE));
    }
}
