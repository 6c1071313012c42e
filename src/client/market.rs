use super::{MarketClient, MarketOperations, RedeemMode};
use crate::contracts::{IERC20, IKToken};
use crate::gateway::{ChainGateway, Receipt};
use crate::orchestrator::Action;
use crate::units;
use crate::Result;
use alloy::primitives::Address;
use async_trait::async_trait;
use rust_decimal::Decimal;

#[async_trait]
impl<G: ChainGateway> MarketOperations for MarketClient<G> {
    async fn supply(&self, symbol: &str, amount: Decimal) -> Result<Receipt> {
        let wallet = self.signer("supply")?;
        let (token, ktoken) = self.registry.resolve_market(symbol)?;
        let amount_base = self.base_amount(&token.symbol, amount).await?;
        self.check_balance(wallet.address(), &token, amount_base)
            .await?;

        tracing::info!(symbol = %token.symbol, %amount, %amount_base, "Supplying");
        let action = Action::new(
            "mint",
            ktoken.address,
            IKToken::mintCall {
                mintAmount: amount_base,
            },
            self.config.gas.mint,
        );
        self.orchestrator(wallet)
            .submit_with_approval(token.address, ktoken.address, amount_base, action)
            .await
    }

    async fn redeem(&self, symbol: &str, amount: Decimal, mode: RedeemMode) -> Result<Receipt> {
        let wallet = self.signer("redeem")?;
        let (token, ktoken) = self.registry.resolve_market(symbol)?;

        let action = match mode {
            RedeemMode::Underlying => {
                let amount_base = self.base_amount(&token.symbol, amount).await?;
                tracing::info!(symbol = %token.symbol, %amount, %amount_base, "Redeeming underlying");
                Action::new(
                    "redeemUnderlying",
                    ktoken.address,
                    IKToken::redeemUnderlyingCall {
                        redeemAmount: amount_base,
                    },
                    self.config.gas.redeem,
                )
            }
            RedeemMode::KToken => {
                let amount_base = self.base_amount(&ktoken.symbol, amount).await?;
                tracing::info!(symbol = %ktoken.symbol, %amount, %amount_base, "Redeeming kTokens");
                Action::new(
                    "redeem",
                    ktoken.address,
                    IKToken::redeemCall {
                        redeemTokens: amount_base,
                    },
                    self.config.gas.redeem,
                )
            }
        };

        // Burning the caller's own kTokens needs no approval
        self.orchestrator(wallet).submit(action).await
    }

    async fn borrow(&self, symbol: &str, amount: Decimal) -> Result<Receipt> {
        let wallet = self.signer("borrow")?;
        let (token, ktoken) = self.registry.resolve_market(symbol)?;
        let amount_base = self.base_amount(&token.symbol, amount).await?;

        tracing::info!(symbol = %token.symbol, %amount, %amount_base, "Borrowing");
        let action = Action::new(
            "borrow",
            ktoken.address,
            IKToken::borrowCall {
                borrowAmount: amount_base,
            },
            self.config.gas.borrow,
        );
        self.orchestrator(wallet).submit(action).await
    }

    async fn repay_borrow(
        &self,
        symbol: &str,
        amount: Decimal,
        borrower: Option<Address>,
    ) -> Result<Receipt> {
        let wallet = self.signer("repay_borrow")?;
        let (token, ktoken) = self.registry.resolve_market(symbol)?;
        let amount_base = self.base_amount(&token.symbol, amount).await?;
        self.check_balance(wallet.address(), &token, amount_base)
            .await?;

        let action = match borrower.filter(|b| *b != wallet.address()) {
            Some(borrower) => {
                tracing::info!(symbol = %token.symbol, %amount, %amount_base, %borrower, "Repaying on behalf");
                Action::new(
                    "repayBorrowBehalf",
                    ktoken.address,
                    IKToken::repayBorrowBehalfCall {
                        borrower,
                        repayAmount: amount_base,
                    },
                    self.config.gas.repay,
                )
            }
            None => {
                tracing::info!(symbol = %token.symbol, %amount, %amount_base, "Repaying borrow");
                Action::new(
                    "repayBorrow",
                    ktoken.address,
                    IKToken::repayBorrowCall {
                        repayAmount: amount_base,
                    },
                    self.config.gas.repay,
                )
            }
        };

        self.orchestrator(wallet)
            .submit_with_approval(token.address, ktoken.address, amount_base, action)
            .await
    }

    async fn get_exchange_rate(&self, symbol: &str) -> Result<Decimal> {
        let ktoken = self.registry.resolve_ktoken(symbol)?;
        let mantissa = self
            .read(ktoken.address, IKToken::exchangeRateStoredCall {})
            .await?;
        tracing::debug!(symbol = %ktoken.symbol, %mantissa, "Read exchange rate");
        units::from_mantissa(mantissa)
    }

    async fn get_balance(&self, symbol: &str, address: Option<Address>) -> Result<Decimal> {
        let owner = self.account(address)?;
        let token = self.registry.resolve_token(symbol)?;
        let raw = self
            .read(token.address, IERC20::balanceOfCall { owner })
            .await?;
        let decimals = self
            .registry
            .decimals_of(&token.symbol, self.gateway.as_ref())
            .await?;
        units::from_base_units(raw, decimals)
    }

    async fn get_ktoken_balance(
        &self,
        symbol: &str,
        address: Option<Address>,
    ) -> Result<Decimal> {
        let ktoken = self.registry.resolve_ktoken(symbol)?;
        self.get_balance(&ktoken.symbol, address).await
    }
}
