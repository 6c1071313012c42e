//! Token registry
//!
//! Resolves symbols to underlying tokens and their paired kTokens. The
//! registry is built once from an [`AddressBook`] and never mutated; decimals
//! missing from the static table are read live on each lookup.

use crate::config::AddressBook;
use crate::contracts::IERC20;
use crate::gateway::{CallRequest, ChainGateway};
use crate::{Error, Result};
use alloy::primitives::Address;
use alloy::sol_types::SolCall;
use serde::Serialize;
use std::collections::HashMap;

/// Decimals assumed when neither the static table nor the contract answers
pub const DEFAULT_DECIMALS: u8 = 18;

/// Prefix that turns an underlying symbol into its kToken symbol
pub const KTOKEN_PREFIX: &str = "k";

/// Flare mainnet Kinetic deployment
pub mod addresses {
    use alloy::primitives::{address, Address};

    /// Unitroller proxy; all comptroller calls go through it
    pub const UNITROLLER: Address = address!("8041680fb73e1fe5f851e76233dcdfa0f2d2d7c8");

    // === Underlying tokens ===
    pub const SFLR: Address = address!("12e605bc104e93b45e1ad99f9e555f659051c2bb");
    pub const USDC_E: Address = address!("fbda5f676cb37624f28265a144a48b0d6e87d3b6");
    pub const USDT: Address = address!("0b38e83b86d491735feaa0a791f65c2b99535396");
    pub const WETH: Address = address!("1502fa4be69d526124d453619276faccab275d3d");
    pub const FLETH: Address = address!("26a1fab310bd080542dc864647d05985360b16a5");
    pub const RFLR: Address = address!("26d460c3cf931fb2014fa436a49e3af08619810e");

    // === kTokens ===
    pub const KSFLR: Address = address!("291487bec339c2fe5d83dd45f0a15efc9ac45656");
    pub const KUSDC_E: Address = address!("deebabe05bda7e8c1740873abf715f16164c29b8");
    pub const KUSDT: Address = address!("1e5bbc19e0b17d7d38f318c79401b3d16f2b93bb");
    pub const KWETH: Address = address!("5c2400019017ae61f811d517d088df732642dbd0");
    pub const KFLETH: Address = address!("40ee5dfe1d4a957ca8ac4dd4adaf8a8fa76b1c16");
}

/// An underlying (or any registered) token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub symbol: String,
    pub address: Address,
    /// Static decimals; `None` means "ask the contract"
    pub decimals: Option<u8>,
}

/// Interest-bearing market token paired with an underlying token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KToken {
    pub symbol: String,
    pub address: Address,
    pub decimals: Option<u8>,
    pub underlying_symbol: String,
}

impl KToken {
    pub fn as_token(&self) -> Token {
        Token {
            symbol: self.symbol.clone(),
            address: self.address,
            decimals: self.decimals,
        }
    }
}

/// Symbol lookups over an immutable address book
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    /// Every registered symbol, kTokens included
    tokens: HashMap<String, Token>,
    /// kTokens by k-symbol
    ktokens: HashMap<String, KToken>,
}

impl TokenRegistry {
    pub fn new(book: &AddressBook) -> Self {
        let tokens: HashMap<String, Token> = book
            .tokens
            .iter()
            .map(|(symbol, address)| {
                let token = Token {
                    symbol: symbol.clone(),
                    address: *address,
                    decimals: book.decimals.get(symbol).copied(),
                };
                (symbol.clone(), token)
            })
            .collect();

        // A symbol is a kToken when stripping the prefix leaves a registered symbol
        let ktokens = tokens
            .values()
            .filter_map(|token| {
                let underlying = token.symbol.strip_prefix(KTOKEN_PREFIX)?;
                tokens.contains_key(underlying).then(|| KToken {
                    symbol: token.symbol.clone(),
                    address: token.address,
                    decimals: token.decimals,
                    underlying_symbol: underlying.to_string(),
                })
            })
            .map(|ktoken| (ktoken.symbol.clone(), ktoken))
            .collect();

        Self { tokens, ktokens }
    }

    /// Look up any registered symbol
    pub fn resolve_token(&self, symbol: &str) -> Result<Token> {
        self.tokens
            .get(symbol)
            .cloned()
            .ok_or_else(|| Error::TokenNotFound(symbol.to_string()))
    }

    /// Resolve the kToken for an underlying symbol, or a k-symbol directly
    pub fn resolve_ktoken(&self, symbol: &str) -> Result<KToken> {
        if let Some(ktoken) = self.ktokens.get(symbol) {
            return Ok(ktoken.clone());
        }

        self.ktokens
            .get(&format!("{}{}", KTOKEN_PREFIX, symbol))
            .cloned()
            .ok_or_else(|| Error::KTokenNotFound(symbol.to_string()))
    }

    pub fn is_ktoken(&self, symbol: &str) -> bool {
        self.ktokens.contains_key(symbol)
    }

    /// Underlying token of a kToken symbol
    pub fn underlying_of(&self, ktoken_symbol: &str) -> Result<Token> {
        let ktoken = self
            .ktokens
            .get(ktoken_symbol)
            .ok_or_else(|| Error::KTokenNotFound(ktoken_symbol.to_string()))?;
        self.resolve_token(&ktoken.underlying_symbol)
    }

    /// Resolve the (underlying, kToken) pair a market operation acts on
    pub fn resolve_market(&self, symbol: &str) -> Result<(Token, KToken)> {
        let ktoken = self.resolve_ktoken(symbol)?;
        let token = self.resolve_token(&ktoken.underlying_symbol)?;
        Ok((token, ktoken))
    }

    /// Registered symbol for an address, if any
    pub fn symbol_for(&self, address: &Address) -> Option<&str> {
        self.tokens
            .values()
            .find(|token| token.address == *address)
            .map(|token| token.symbol.as_str())
    }

    /// Decimals for `symbol`: static table, then a live `decimals()` read, then 18
    pub async fn decimals_of<G>(&self, symbol: &str, gateway: &G) -> Result<u8>
    where
        G: ChainGateway + ?Sized,
    {
        let token = self.resolve_token(symbol)?;
        if let Some(decimals) = token.decimals {
            return Ok(decimals);
        }

        let request = CallRequest::new(token.address, IERC20::decimalsCall {}.abi_encode());
        let live = match gateway.call(&request, None).await {
            Ok(data) => IERC20::decimalsCall::abi_decode_returns(&data).ok(),
            Err(e) => {
                tracing::debug!(symbol, error = %e, "decimals() read failed");
                None
            }
        };

        Ok(live.unwrap_or_else(|| {
            tracing::debug!(symbol, "Falling back to {} decimals", DEFAULT_DECIMALS);
            DEFAULT_DECIMALS
        }))
    }
}
