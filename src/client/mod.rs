//! Kinetic market client
//!
//! [`MarketClient`] composes the token registry, unit conversion, the chain
//! gateway and the transaction orchestrator into the public lending
//! operations. Operations are split by contract into [`MarketOperations`]
//! (kToken markets) and [`ComptrollerOperations`] (risk engine).

mod comptroller;
mod market;
pub mod versioned;

pub use versioned::{Operation, SupportTable, VersionGated};

use crate::config::ClientConfig;
use crate::contracts::IERC20;
use crate::gateway::{CallRequest, ChainGateway, Receipt};
use crate::orchestrator::TransactionOrchestrator;
use crate::protocol_error::{self, ErrorName};
use crate::tokens::{Token, TokenRegistry};
use crate::units;
use crate::wallet::SecureWallet;
use crate::{Error, Result};
use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

/// How a redeem amount is denominated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedeemMode {
    /// Amount of underlying to withdraw (`redeemUnderlying`)
    #[default]
    Underlying,
    /// Amount of kTokens to burn (`redeem`)
    KToken,
}

/// Outcome of one market in an enter/exit call
///
/// `code` is `None` when neither the simulated return value nor a receipt
/// event settles the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketResult {
    pub symbol: String,
    pub market: Address,
    pub code: Option<u64>,
    pub name: Option<ErrorName>,
}

impl MarketResult {
    pub fn new(symbol: impl Into<String>, market: Address, code: Option<u64>) -> Self {
        Self {
            symbol: symbol.into(),
            market,
            code,
            name: code.map(protocol_error::decode),
        }
    }

    pub fn is_success(&self) -> bool {
        self.name.is_some_and(|name| name.is_success())
    }

    pub fn is_confirmed(&self) -> bool {
        self.code.is_some()
    }

    /// `SUCCESS` for code 0, `UNCONFIRMED` without a code, otherwise the error name
    pub fn label(&self) -> String {
        match self.name {
            Some(name) if name.is_success() => "SUCCESS".to_string(),
            Some(name) => name.to_string(),
            None => "UNCONFIRMED".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketEntry {
    pub receipt: Receipt,
    /// One result per requested symbol, in request order
    pub results: Vec<MarketResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketExit {
    pub receipt: Receipt,
    pub result: MarketResult,
}

/// Account liquidity as reported by the comptroller (USD, 18 decimals)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Liquidity {
    pub liquidity: Decimal,
    pub shortfall: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketStatus {
    pub symbol: String,
    pub ktoken: Address,
    pub is_listed: bool,
    pub collateral_factor: Decimal,
    pub mint_paused: bool,
}

/// Operations on individual kToken markets
#[async_trait]
pub trait MarketOperations: Send + Sync {
    /// Supply `amount` of the underlying token, minting kTokens
    async fn supply(&self, symbol: &str, amount: Decimal) -> Result<Receipt>;

    async fn redeem(&self, symbol: &str, amount: Decimal, mode: RedeemMode) -> Result<Receipt>;

    async fn borrow(&self, symbol: &str, amount: Decimal) -> Result<Receipt>;

    /// Repay a borrow; a `borrower` other than the wallet is repaid on behalf
    async fn repay_borrow(
        &self,
        symbol: &str,
        amount: Decimal,
        borrower: Option<Address>,
    ) -> Result<Receipt>;

    /// Stored exchange rate scaled down by 1e18
    async fn get_exchange_rate(&self, symbol: &str) -> Result<Decimal>;

    /// Balance of a registered token
    async fn get_balance(&self, symbol: &str, address: Option<Address>) -> Result<Decimal>;

    /// kToken balance for the market of `symbol`
    async fn get_ktoken_balance(&self, symbol: &str, address: Option<Address>)
        -> Result<Decimal>;
}

/// Operations on the comptroller
#[async_trait]
pub trait ComptrollerOperations: Send + Sync {
    async fn enter_markets(&self, symbols: &[&str]) -> Result<MarketEntry>;

    async fn exit_market(&self, symbol: &str) -> Result<MarketExit>;

    async fn get_account_liquidity(&self, address: Option<Address>) -> Result<Liquidity>;

    async fn get_all_markets(&self) -> Result<Vec<Address>>;

    async fn market_status(&self, symbol: &str) -> Result<MarketStatus>;
}

/// Client for a Kinetic deployment
pub struct MarketClient<G: ChainGateway> {
    gateway: Arc<G>,
    registry: TokenRegistry,
    config: ClientConfig,
    wallet: Option<SecureWallet>,
}

impl<G: ChainGateway> MarketClient<G> {
    /// Read-only client; attach a wallet with [`MarketClient::with_wallet`]
    pub fn new(gateway: Arc<G>, config: ClientConfig) -> Self {
        let registry = TokenRegistry::new(&config.address_book);
        Self {
            gateway,
            registry,
            config,
            wallet: None,
        }
    }

    pub fn with_wallet(mut self, wallet: SecureWallet) -> Self {
        self.wallet = Some(wallet);
        self
    }

    /// Wrap the client so operations are checked against its protocol version
    pub fn gated(self) -> VersionGated<Self> {
        let version = self.config.protocol_version;
        VersionGated::new(self, version)
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn wallet_address(&self) -> Option<Address> {
        self.wallet.as_ref().map(SecureWallet::address)
    }

    fn signer(&self, operation: &'static str) -> Result<&SecureWallet> {
        self.wallet.as_ref().ok_or(Error::SignerRequired(operation))
    }

    fn orchestrator<'a>(&'a self, wallet: &'a SecureWallet) -> TransactionOrchestrator<'a, G> {
        TransactionOrchestrator::new(
            self.gateway.as_ref(),
            wallet,
            self.config.approval_policy,
            &self.config.gas,
        )
    }

    /// Explicit address, else the wallet's
    fn account(&self, address: Option<Address>) -> Result<Address> {
        address.or_else(|| self.wallet_address()).ok_or_else(|| {
            Error::InvalidArgument("no address given and no wallet configured".to_string())
        })
    }

    async fn read<C>(&self, to: Address, call: C) -> Result<C::Return>
    where
        C: SolCall + Send,
    {
        let data = self
            .gateway
            .call(&CallRequest::new(to, call.abi_encode()), None)
            .await?;
        C::abi_decode_returns(&data).map_err(|e| {
            Error::Gateway(format!("Failed to decode {} result: {}", C::SIGNATURE, e))
        })
    }

    /// Convert `amount` of `symbol` to base units; zero amounts are rejected
    async fn base_amount(&self, symbol: &str, amount: Decimal) -> Result<U256> {
        let decimals = self.registry.decimals_of(symbol, self.gateway.as_ref()).await?;
        let amount_base = units::to_base_units(amount, decimals)?;
        if amount_base.is_zero() {
            return Err(Error::InvalidArgument(format!(
                "{} {} is zero in base units ({} decimals)",
                amount, symbol, decimals
            )));
        }
        Ok(amount_base)
    }

    async fn check_balance(&self, owner: Address, token: &Token, amount_base: U256) -> Result<()> {
        if !self.config.preflight_balance_check {
            return Ok(());
        }

        let available = self
            .read(token.address, IERC20::balanceOfCall { owner })
            .await?;
        if available >= amount_base {
            return Ok(());
        }

        let decimals = self
            .registry
            .decimals_of(&token.symbol, self.gateway.as_ref())
            .await?;
        Err(Error::InsufficientBalance {
            symbol: token.symbol.clone(),
            required: units::from_base_units(amount_base, decimals)?.to_string(),
            available: units::from_base_units(available, decimals)?.to_string(),
        })
    }
}
