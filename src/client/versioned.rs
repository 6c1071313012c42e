//! Protocol version gating
//!
//! [`VersionGated`] wraps any client and refuses operations the configured
//! protocol version does not support, before anything reaches the network.

use super::{
    ComptrollerOperations, Liquidity, MarketEntry, MarketExit, MarketOperations, MarketStatus,
    RedeemMode,
};
use crate::config::ProtocolVersion;
use crate::gateway::Receipt;
use crate::{Error, Result};
use alloy::primitives::Address;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Supply,
    Redeem,
    Borrow,
    RepayBorrow,
    GetExchangeRate,
    GetBalance,
    GetKTokenBalance,
    EnterMarkets,
    ExitMarket,
    GetAccountLiquidity,
    GetAllMarkets,
    MarketStatus,
}

impl Operation {
    pub const ALL: [Operation; 12] = [
        Operation::Supply,
        Operation::Redeem,
        Operation::Borrow,
        Operation::RepayBorrow,
        Operation::GetExchangeRate,
        Operation::GetBalance,
        Operation::GetKTokenBalance,
        Operation::EnterMarkets,
        Operation::ExitMarket,
        Operation::GetAccountLiquidity,
        Operation::GetAllMarkets,
        Operation::MarketStatus,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Supply => "supply",
            Operation::Redeem => "redeem",
            Operation::Borrow => "borrow",
            Operation::RepayBorrow => "repay_borrow",
            Operation::GetExchangeRate => "get_exchange_rate",
            Operation::GetBalance => "get_balance",
            Operation::GetKTokenBalance => "get_ktoken_balance",
            Operation::EnterMarkets => "enter_markets",
            Operation::ExitMarket => "exit_market",
            Operation::GetAccountLiquidity => "get_account_liquidity",
            Operation::GetAllMarkets => "get_all_markets",
            Operation::MarketStatus => "market_status",
        }
    }
}

/// Which operations each protocol version supports
#[derive(Debug, Clone, Default)]
pub struct SupportTable {
    supported: HashMap<ProtocolVersion, HashSet<Operation>>,
}

impl SupportTable {
    /// Every operation on every known version
    pub fn standard() -> Self {
        let all: HashSet<Operation> = Operation::ALL.into_iter().collect();
        let supported = [ProtocolVersion::V1, ProtocolVersion::V2]
            .into_iter()
            .map(|version| (version, all.clone()))
            .collect();
        Self { supported }
    }

    pub fn allow(mut self, version: ProtocolVersion, operation: Operation) -> Self {
        self.supported.entry(version).or_default().insert(operation);
        self
    }

    pub fn deny(mut self, version: ProtocolVersion, operation: Operation) -> Self {
        if let Some(operations) = self.supported.get_mut(&version) {
            operations.remove(&operation);
        }
        self
    }

    pub fn supports(&self, version: ProtocolVersion, operation: Operation) -> bool {
        self.supported
            .get(&version)
            .is_some_and(|operations| operations.contains(&operation))
    }
}

/// Client wrapper that checks every call against a [`SupportTable`]
pub struct VersionGated<C> {
    inner: C,
    version: ProtocolVersion,
    table: SupportTable,
}

impl<C> VersionGated<C> {
    pub fn new(inner: C, version: ProtocolVersion) -> Self {
        Self {
            inner,
            version,
            table: SupportTable::standard(),
        }
    }

    pub fn with_table(mut self, table: SupportTable) -> Self {
        self.table = table;
        self
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    fn check(&self, operation: Operation) -> Result<()> {
        if self.table.supports(self.version, operation) {
            Ok(())
        } else {
            tracing::debug!(operation = operation.name(), version = %self.version, "Operation gated");
            Err(Error::UnsupportedVersion {
                operation: operation.name(),
                version: self.version.number(),
            })
        }
    }
}

#[async_trait]
impl<C: MarketOperations> MarketOperations for VersionGated<C> {
    async fn supply(&self, symbol: &str, amount: Decimal) -> Result<Receipt> {
        self.check(Operation::Supply)?;
        self.inner.supply(symbol, amount).await
    }

    async fn redeem(&self, symbol: &str, amount: Decimal, mode: RedeemMode) -> Result<Receipt> {
        self.check(Operation::Redeem)?;
        self.inner.redeem(symbol, amount, mode).await
    }

    async fn borrow(&self, symbol: &str, amount: Decimal) -> Result<Receipt> {
        self.check(Operation::Borrow)?;
        self.inner.borrow(symbol, amount).await
    }

    async fn repay_borrow(
        &self,
        symbol: &str,
        amount: Decimal,
        borrower: Option<Address>,
    ) -> Result<Receipt> {
        self.check(Operation::RepayBorrow)?;
        self.inner.repay_borrow(symbol, amount, borrower).await
    }

    async fn get_exchange_rate(&self, symbol: &str) -> Result<Decimal> {
        self.check(Operation::GetExchangeRate)?;
        self.inner.get_exchange_rate(symbol).await
    }

    async fn get_balance(&self, symbol: &str, address: Option<Address>) -> Result<Decimal> {
        self.check(Operation::GetBalance)?;
        self.inner.get_balance(symbol, address).await
    }

    async fn get_ktoken_balance(
        &self,
        symbol: &str,
        address: Option<Address>,
    ) -> Result<Decimal> {
        self.check(Operation::GetKTokenBalance)?;
        self.inner.get_ktoken_balance(symbol, address).await
    }
}

#[async_trait]
impl<C: ComptrollerOperations> ComptrollerOperations for VersionGated<C> {
    async fn enter_markets(&self, symbols: &[&str]) -> Result<MarketEntry> {
        self.check(Operation::EnterMarkets)?;
        self.inner.enter_markets(symbols).await
    }

    async fn exit_market(&self, symbol: &str) -> Result<MarketExit> {
        self.check(Operation::ExitMarket)?;
        self.inner.exit_market(symbol).await
    }

    async fn get_account_liquidity(&self, address: Option<Address>) -> Result<Liquidity> {
        self.check(Operation::GetAccountLiquidity)?;
        self.inner.get_account_liquidity(address).await
    }

    async fn get_all_markets(&self) -> Result<Vec<Address>> {
        self.check(Operation::GetAllMarkets)?;
        self.inner.get_all_markets().await
    }

    async fn market_status(&self, symbol: &str) -> Result<MarketStatus> {
        self.check(Operation::MarketStatus)?;
        self.inner.market_status(symbol).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::client;
    use crate::tokens::addresses;
    use alloy::primitives::U256;
    use rust_decimal_macros::dec;

    #[test]
    fn test_standard_table_supports_everything() {
        let table = SupportTable::standard();
        for operation in Operation::ALL {
            assert!(table.supports(ProtocolVersion::V1, operation));
            assert!(table.supports(ProtocolVersion::V2, operation));
        }
    }

    #[test]
    fn test_allow_and_deny() {
        let table = SupportTable::default().allow(ProtocolVersion::V2, Operation::Supply);
        assert!(table.supports(ProtocolVersion::V2, Operation::Supply));
        assert!(!table.supports(ProtocolVersion::V1, Operation::Supply));

        let table = table.deny(ProtocolVersion::V2, Operation::Supply);
        assert!(!table.supports(ProtocolVersion::V2, Operation::Supply));
    }

    #[tokio::test]
    async fn test_gated_operation_never_reaches_gateway() {
        let (gateway, client) = client();
        let gated = VersionGated::new(client, ProtocolVersion::V2)
            .with_table(SupportTable::standard().deny(ProtocolVersion::V2, Operation::Borrow));

        let err = gated.borrow("USDC.e", dec!(1)).await.unwrap_err();

        match err {
            Error::UnsupportedVersion { operation, version } => {
                assert_eq!(operation, "borrow");
                assert_eq!(version, 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_supported_operation_is_forwarded() {
        let (gateway, client) = client();
        gateway.set_exchange_rate(addresses::KSFLR, U256::from(1_000_000_000_000_000_000u64));
        let gated = client.gated();

        assert_eq!(gated.version(), ProtocolVersion::V1);
        assert_eq!(gated.get_exchange_rate("sFLR").await.unwrap(), dec!(1));
    }
}
