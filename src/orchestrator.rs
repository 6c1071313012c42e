//! Transaction orchestration
//!
//! Builds, signs and submits transactions for one wallet, approving the
//! spender first when an action pulls tokens. Every submission waits for its
//! receipt; failed receipts are replayed to recover the protocol error code.

use crate::config::{ApprovalPolicy, GasLimits};
use crate::contracts::{IERC20, IKToken};
use crate::gateway::{CallRequest, ChainGateway, Receipt, TxParams};
use crate::protocol_error::ProtocolError;
use crate::wallet::SecureWallet;
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::{SolCall, SolEvent};

/// A contract call to submit as a transaction
#[derive(Debug, Clone)]
pub struct Action {
    /// Short name used in logs and error messages
    pub label: &'static str,
    pub to: Address,
    pub data: Bytes,
    /// Gas limit used when estimation fails
    pub fallback_gas: u64,
}

impl Action {
    pub fn new(label: &'static str, to: Address, call: impl SolCall, fallback_gas: u64) -> Self {
        Self {
            label,
            to,
            data: call.abi_encode().into(),
            fallback_gas,
        }
    }
}

/// Submits transactions on behalf of one wallet
pub struct TransactionOrchestrator<'a, G: ChainGateway + ?Sized> {
    gateway: &'a G,
    wallet: &'a SecureWallet,
    policy: ApprovalPolicy,
    gas: &'a GasLimits,
}

impl<'a, G: ChainGateway + ?Sized> TransactionOrchestrator<'a, G> {
    pub fn new(
        gateway: &'a G,
        wallet: &'a SecureWallet,
        policy: ApprovalPolicy,
        gas: &'a GasLimits,
    ) -> Self {
        Self {
            gateway,
            wallet,
            policy,
            gas,
        }
    }

    /// Current `allowance(wallet, spender)` on `token`
    pub async fn allowance(&self, token: Address, spender: Address) -> Result<U256> {
        let call = IERC20::allowanceCall {
            owner: self.wallet.address(),
            spender,
        };
        let data = self
            .gateway
            .call(&CallRequest::new(token, call.abi_encode()), None)
            .await?;
        IERC20::allowanceCall::abi_decode_returns(&data)
            .map_err(|e| Error::Gateway(format!("Failed to decode allowance: {}", e)))
    }

    /// Approve `spender` when the allowance is below `amount_base`
    ///
    /// Returns the approval receipt, or `None` when no approval was needed.
    pub async fn ensure_allowance(
        &self,
        token: Address,
        spender: Address,
        amount_base: U256,
    ) -> Result<Option<Receipt>> {
        let current = self.allowance(token, spender).await?;
        if current >= amount_base {
            tracing::debug!(%token, %spender, %current, "Allowance sufficient");
            return Ok(None);
        }

        let approve_amount = self.policy.approval_amount(amount_base);
        tracing::info!(
            %token,
            %spender,
            %current,
            amount_base = %approve_amount,
            "Approving spender"
        );

        let action = Action::new(
            "approve",
            token,
            IERC20::approveCall {
                spender,
                amount: approve_amount,
            },
            self.gas.approve,
        );
        let receipt = self.send(&action).await?;
        if !receipt.status {
            tracing::warn!(tx_hash = %receipt.transaction_hash, "Approval reverted");
            return Err(Error::Approval(format!(
                "approve transaction {} reverted",
                receipt.transaction_hash
            )));
        }

        let confirmed = self.allowance(token, spender).await?;
        if confirmed < amount_base {
            return Err(Error::Approval(format!(
                "allowance is {} after approval, need {}",
                confirmed, amount_base
            )));
        }

        Ok(Some(receipt))
    }

    /// Approve if needed, then submit `action`
    pub async fn submit_with_approval(
        &self,
        token: Address,
        spender: Address,
        amount_base: U256,
        action: Action,
    ) -> Result<Receipt> {
        self.ensure_allowance(token, spender, amount_base).await?;
        self.submit(action).await
    }

    /// Submit `action` and check its receipt for protocol failures
    pub async fn submit(&self, action: Action) -> Result<Receipt> {
        let receipt = self.send(&action).await?;
        self.check_receipt(&action, receipt).await
    }

    /// Run `action` as an `eth_call` from the wallet against current state
    pub async fn simulate(&self, action: &Action) -> Result<Bytes> {
        self.gateway.call(&self.request(action), None).await
    }

    fn request(&self, action: &Action) -> CallRequest {
        CallRequest::new(action.to, action.data.clone()).from(self.wallet.address())
    }

    async fn build(&self, action: &Action) -> Result<TxParams> {
        let from = self.wallet.address();

        let gas_limit = match self.gateway.estimate_gas(&self.request(action)).await {
            Ok(gas) => gas,
            Err(e) => {
                tracing::debug!(
                    action = action.label,
                    error = %e,
                    fallback = action.fallback_gas,
                    "Gas estimation failed, using fallback limit"
                );
                action.fallback_gas
            }
        };

        Ok(TxParams {
            from,
            to: action.to,
            data: action.data.clone(),
            value: U256::ZERO,
            nonce: self.gateway.transaction_count(from).await?,
            gas_limit,
            gas_price: self.gateway.gas_price().await?,
            chain_id: self.gateway.chain_id().await?,
        })
    }

    async fn send(&self, action: &Action) -> Result<Receipt> {
        let tx = self.build(action).await?;
        let raw = self.gateway.sign(&tx, self.wallet).await?;
        let hash = self.gateway.broadcast(raw).await?;
        tracing::info!(
            action = action.label,
            to = %action.to,
            tx_hash = %hash,
            nonce = tx.nonce,
            "Transaction submitted"
        );

        let receipt = self.gateway.wait_for_receipt(hash).await?;
        tracing::info!(
            action = action.label,
            tx_hash = %hash,
            status = receipt.status,
            block = ?receipt.block_number,
            gas_used = receipt.gas_used,
            "Transaction mined"
        );
        Ok(receipt)
    }

    async fn check_receipt(&self, action: &Action, receipt: Receipt) -> Result<Receipt> {
        if !receipt.status {
            tracing::warn!(action = action.label, tx_hash = %receipt.transaction_hash, "Transaction reverted");
            return Err(self.explain_revert(action, &receipt).await);
        }

        if let Some(failure) = failure_event(action.to, &receipt) {
            tracing::warn!(
                action = action.label,
                tx_hash = %receipt.transaction_hash,
                error = %failure,
                "Transaction emitted a protocol failure"
            );
            return Err(Error::Transaction {
                message: format!(
                    "{} transaction {} failed: {}",
                    action.label, receipt.transaction_hash, failure
                ),
                protocol: Some(failure),
            });
        }

        Ok(receipt)
    }

    /// Replay a reverted call at its block to recover the revert reason
    async fn explain_revert(&self, action: &Action, receipt: &Receipt) -> Error {
        let replay = self
            .gateway
            .call(&self.request(action), receipt.block_number)
            .await;

        match replay {
            Err(e) => {
                let text = e.to_string();
                let protocol = ProtocolError::from_text(&text);
                let message = match &protocol {
                    Some(decoded) => format!(
                        "{} transaction {} reverted: {}",
                        action.label, receipt.transaction_hash, decoded
                    ),
                    None => format!(
                        "{} transaction {} reverted: {}",
                        action.label, receipt.transaction_hash, text
                    ),
                };
                Error::Transaction { message, protocol }
            }
            Ok(_) => Error::Transaction {
                message: format!(
                    "{} transaction {} reverted (status 0)",
                    action.label, receipt.transaction_hash
                ),
                protocol: None,
            },
        }
    }
}

/// First `Failure(error, info, detail)` event emitted by `target`
fn failure_event(target: Address, receipt: &Receipt) -> Option<ProtocolError> {
    receipt
        .logs
        .iter()
        .filter(|log| log.address == target)
        .filter_map(|log| IKToken::Failure::decode_log_data(&log.data).ok())
        .find(|failure| !failure.error.is_zero())
        .map(|failure| {
            let raw = format!(
                "Failure(error={}, info={}, detail={})",
                failure.error, failure.info, failure.detail
            );
            ProtocolError::from_code(failure.error.saturating_to::<u64>(), raw)
        })
}
