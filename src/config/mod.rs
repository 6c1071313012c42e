//! Configuration for the Kinetic client
//!
//! A [`ClientConfig`] is built once and handed to the client constructor.
//! Nothing here reads global state except [`RpcConfig::from_env`], which the
//! binary calls explicitly.

pub mod rpc;

use crate::tokens::addresses;
use crate::{Error, Result};
use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

// Re-export RPC config
pub use rpc::RpcConfig;

/// How much to approve when the current allowance is too small
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalPolicy {
    /// Approve exactly the amount the action needs
    #[default]
    Exact,
    /// Approve `U256::MAX` so later actions skip the approval
    Unlimited,
}

impl ApprovalPolicy {
    /// Allowance to request for an action needing `required` base units
    pub fn approval_amount(&self, required: U256) -> U256 {
        match self {
            ApprovalPolicy::Exact => required,
            ApprovalPolicy::Unlimited => U256::MAX,
        }
    }
}

/// Deployed protocol version the client is talking to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    #[default]
    V1,
    V2,
}

impl ProtocolVersion {
    pub fn number(&self) -> u32 {
        match self {
            ProtocolVersion::V1 => 1,
            ProtocolVersion::V2 => 2,
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.number())
    }
}

/// Gas ceilings used when `eth_estimateGas` fails
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasLimits {
    pub approve: u64,
    pub mint: u64,
    pub redeem: u64,
    pub borrow: u64,
    pub repay: u64,
    pub market_membership: u64,
}

impl Default for GasLimits {
    fn default() -> Self {
        Self {
            approve: 100_000,
            mint: 500_000,
            redeem: 300_000,
            borrow: 300_000,
            repay: 300_000,
            market_membership: 200_000,
        }
    }
}

/// Token and comptroller addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBook {
    /// Comptroller (or its Unitroller proxy)
    pub comptroller: Address,
    /// Every token by symbol, kTokens included
    pub tokens: BTreeMap<String, Address>,
    /// Static decimals; symbols missing here are read from the contract
    #[serde(default)]
    pub decimals: BTreeMap<String, u8>,
}

impl Default for AddressBook {
    fn default() -> Self {
        use addresses::*;

        let tokens = [
            ("sFLR", SFLR),
            ("USDC.e", USDC_E),
            ("USDT", USDT),
            ("wETH", WETH),
            ("flETH", FLETH),
            ("rFLR", RFLR),
            ("ksFLR", KSFLR),
            ("kUSDC.e", KUSDC_E),
            ("kUSDT", KUSDT),
            ("kwETH", KWETH),
            ("kflETH", KFLETH),
        ]
        .into_iter()
        .map(|(symbol, address)| (symbol.to_string(), address))
        .collect();

        // kTokens are left out on purpose: their decimals come from the contract
        let decimals = [
            ("sFLR", 18),
            ("USDC.e", 6),
            ("USDT", 6),
            ("wETH", 18),
            ("flETH", 18),
            ("rFLR", 18),
        ]
        .into_iter()
        .map(|(symbol, decimals)| (symbol.to_string(), decimals))
        .collect();

        Self {
            comptroller: UNITROLLER,
            tokens,
            decimals,
        }
    }
}

/// Main client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub address_book: AddressBook,
    #[serde(default)]
    pub approval_policy: ApprovalPolicy,
    #[serde(default)]
    pub protocol_version: ProtocolVersion,
    /// Check the caller's balance before supply/repay
    #[serde(default = "default_true")]
    pub preflight_balance_check: bool,
    #[serde(default)]
    pub gas: GasLimits,
    /// Overrides the RPC URL resolved by [`RpcConfig`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address_book: AddressBook::default(),
            approval_policy: ApprovalPolicy::default(),
            protocol_version: ProtocolVersion::default(),
            preflight_balance_check: true,
            gas: GasLimits::default(),
            rpc_url: None,
        }
    }
}

impl ClientConfig {
    /// Load a JSON config file; omitted sections take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_approval_policy(mut self, policy: ApprovalPolicy) -> Self {
        self.approval_policy = policy;
        self
    }

    pub fn with_protocol_version(mut self, version: ProtocolVersion) -> Self {
        self.protocol_version = version;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_book_pairs_markets() {
        let book = AddressBook::default();
        assert_eq!(book.comptroller, addresses::UNITROLLER);
        assert_eq!(book.tokens.get("kUSDC.e"), Some(&addresses::KUSDC_E));
        assert_eq!(book.decimals.get("USDC.e"), Some(&6));
        assert!(!book.decimals.contains_key("kUSDC.e"));
    }

    #[test]
    fn test_approval_amount() {
        let required = U256::from(10_000u64);
        assert_eq!(ApprovalPolicy::Exact.approval_amount(required), required);
        assert_eq!(ApprovalPolicy::Unlimited.approval_amount(required), U256::MAX);
    }

    #[test]
    fn config_deserialize_defaults() {
        let parsed: ClientConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(parsed.approval_policy, ApprovalPolicy::Exact);
        assert_eq!(parsed.protocol_version, ProtocolVersion::V1);
        assert!(parsed.preflight_balance_check);
        assert_eq!(parsed.gas.mint, 500_000);
        assert_eq!(parsed.address_book, AddressBook::default());
        assert!(parsed.rpc_url.is_none());
    }

    #[test]
    fn config_deserialize_explicit() {
        let value = serde_json::json!({
            "approval_policy": "unlimited",
            "protocol_version": "v2",
            "preflight_balance_check": false,
            "address_book": {
                "comptroller": "0x8041680fb73e1fe5f851e76233dcdfa0f2d2d7c8",
                "tokens": {
                    "USDC.e": "0xfbda5f676cb37624f28265a144a48b0d6e87d3b6",
                    "kUSDC.e": "0xdeebabe05bda7e8c1740873abf715f16164c29b8"
                }
            }
        });
        let parsed: ClientConfig = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.approval_policy, ApprovalPolicy::Unlimited);
        assert_eq!(parsed.protocol_version, ProtocolVersion::V2);
        assert!(!parsed.preflight_balance_check);
        assert_eq!(parsed.address_book.tokens.len(), 2);
        assert!(parsed.address_book.decimals.is_empty());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "approval_policy": "unlimited" }}"#).unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.approval_policy, ApprovalPolicy::Unlimited);
    }

    #[test]
    fn test_from_missing_file() {
        let err = ClientConfig::from_file(Path::new("/nonexistent/kinetic.json")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
