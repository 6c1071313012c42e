use super::{
    ComptrollerOperations, Liquidity, MarketClient, MarketEntry, MarketExit, MarketResult,
    MarketStatus,
};
use crate::contracts::IComptroller;
use crate::gateway::{ChainGateway, Receipt};
use crate::orchestrator::{Action, TransactionOrchestrator};
use crate::protocol_error::ProtocolError;
use crate::units;
use crate::{Error, Result};
use alloy::primitives::{Address, U256};
use alloy::sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use std::collections::HashSet;

fn code_of(value: U256) -> u64 {
    value.saturating_to::<u64>()
}

/// Markets named in `E` events emitted by the comptroller for `account`
fn confirmed_markets<E, F>(
    receipt: &Receipt,
    comptroller: Address,
    account: Address,
    fields: F,
) -> HashSet<Address>
where
    E: SolEvent,
    F: Fn(&E) -> (Address, Address),
{
    receipt
        .logs
        .iter()
        .filter(|log| log.address == comptroller)
        .filter_map(|log| E::decode_log_data(&log.data).ok())
        .map(|event| fields(&event))
        .filter(|(_, who)| *who == account)
        .map(|(market, _)| market)
        .collect()
}

/// Result codes `action` would return against the current state
///
/// A failed simulation is not fatal: the submission still goes ahead and its
/// receipt decides the outcome.
async fn simulate_codes<G, C>(
    orchestrator: &TransactionOrchestrator<'_, G>,
    action: &Action,
) -> Option<C::Return>
where
    G: ChainGateway + ?Sized,
    C: SolCall,
{
    match orchestrator.simulate(action).await {
        Ok(data) => C::abi_decode_returns(&data).ok(),
        Err(e) => {
            tracing::debug!(action = action.label, error = %e, "Simulation failed");
            None
        }
    }
}

#[async_trait]
impl<G: ChainGateway> ComptrollerOperations for MarketClient<G> {
    async fn enter_markets(&self, symbols: &[&str]) -> Result<MarketEntry> {
        let wallet = self.signer("enter_markets")?;
        if symbols.is_empty() {
            return Err(Error::InvalidArgument(
                "enter_markets needs at least one symbol".to_string(),
            ));
        }

        let ktokens = symbols
            .iter()
            .map(|symbol| self.registry.resolve_ktoken(symbol))
            .collect::<Result<Vec<_>>>()?;
        let comptroller = self.config.address_book.comptroller;

        let action = Action::new(
            "enterMarkets",
            comptroller,
            IComptroller::enterMarketsCall {
                cTokens: ktokens.iter().map(|k| k.address).collect(),
            },
            self.config.gas.market_membership,
        );

        let orchestrator = self.orchestrator(wallet);
        let simulated = simulate_codes::<G, IComptroller::enterMarketsCall>(&orchestrator, &action)
            .await
            .unwrap_or_default();

        tracing::info!(markets = ?symbols, "Entering markets");
        let receipt = orchestrator.submit(action).await?;

        let entered = confirmed_markets::<IComptroller::MarketEntered, _>(
            &receipt,
            comptroller,
            wallet.address(),
            |e| (e.cToken, e.account),
        );

        let results = ktokens
            .iter()
            .enumerate()
            .map(|(i, ktoken)| {
                let code = if entered.contains(&ktoken.address) {
                    Some(0)
                } else {
                    simulated.get(i).copied().map(code_of)
                };
                MarketResult::new(ktoken.underlying_symbol.clone(), ktoken.address, code)
            })
            .collect::<Vec<_>>();

        for result in results.iter().filter(|r| !r.is_success()) {
            tracing::warn!(symbol = %result.symbol, outcome = %result.label(), "Market not entered");
        }

        Ok(MarketEntry { receipt, results })
    }

    async fn exit_market(&self, symbol: &str) -> Result<MarketExit> {
        let wallet = self.signer("exit_market")?;
        let ktoken = self.registry.resolve_ktoken(symbol)?;
        let comptroller = self.config.address_book.comptroller;

        let action = Action::new(
            "exitMarket",
            comptroller,
            IComptroller::exitMarketCall {
                cTokenAddress: ktoken.address,
            },
            self.config.gas.market_membership,
        );

        let orchestrator = self.orchestrator(wallet);
        let simulated =
            simulate_codes::<G, IComptroller::exitMarketCall>(&orchestrator, &action).await;

        tracing::info!(symbol = %ktoken.underlying_symbol, "Exiting market");
        let receipt = orchestrator.submit(action).await?;

        let exited = confirmed_markets::<IComptroller::MarketExited, _>(
            &receipt,
            comptroller,
            wallet.address(),
            |e| (e.cToken, e.account),
        );
        let code = if exited.contains(&ktoken.address) {
            Some(0)
        } else {
            simulated.map(code_of)
        };

        let result = MarketResult::new(ktoken.underlying_symbol, ktoken.address, code);
        if !result.is_success() {
            tracing::warn!(symbol = %result.symbol, outcome = %result.label(), "Market not exited");
        }
        Ok(MarketExit { receipt, result })
    }

    async fn get_account_liquidity(&self, address: Option<Address>) -> Result<Liquidity> {
        let account = self.account(address)?;
        let reply = self
            .read(
                self.config.address_book.comptroller,
                IComptroller::getAccountLiquidityCall { account },
            )
            .await?;

        if !reply.error.is_zero() {
            let code = code_of(reply.error);
            return Err(Error::Protocol(ProtocolError::from_code(
                code,
                format!("getAccountLiquidity returned error {}", code),
            )));
        }

        let liquidity = Liquidity {
            liquidity: units::from_mantissa(reply.liquidity)?,
            shortfall: units::from_mantissa(reply.shortfall)?,
        };
        tracing::debug!(
            %account,
            liquidity = %liquidity.liquidity,
            shortfall = %liquidity.shortfall,
            "Read account liquidity"
        );
        Ok(liquidity)
    }

    async fn get_all_markets(&self) -> Result<Vec<Address>> {
        self.read(
            self.config.address_book.comptroller,
            IComptroller::getAllMarketsCall {},
        )
        .await
    }

    async fn market_status(&self, symbol: &str) -> Result<MarketStatus> {
        let ktoken = self.registry.resolve_ktoken(symbol)?;
        let comptroller = self.config.address_book.comptroller;

        let market = self
            .read(
                comptroller,
                IComptroller::marketsCall {
                    cToken: ktoken.address,
                },
            )
            .await?;
        let mint_paused = self
            .read(
                comptroller,
                IComptroller::mintGuardianPausedCall {
                    cToken: ktoken.address,
                },
            )
            .await?;

        Ok(MarketStatus {
            symbol: ktoken.underlying_symbol,
            ktoken: ktoken.address,
            is_listed: market.isListed,
            collateral_factor: units::from_mantissa(market.collateralFactorMantissa)?,
            mint_paused,
        })
    }
}
