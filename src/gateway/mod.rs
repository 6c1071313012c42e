//! Chain gateway
//!
//! Everything that touches the network goes through [`ChainGateway`]: reads,
//! gas estimation, signing, broadcast and receipt polling. The client and the
//! orchestrator never build providers themselves, which keeps them testable
//! against a scripted gateway.

mod alloy_gateway;
#[cfg(test)]
pub(crate) mod mock;

pub use alloy_gateway::AlloyGateway;

use crate::wallet::SecureWallet;
use crate::Result;
use alloy::primitives::{Address, Bytes, Log, TxHash, U256};
use async_trait::async_trait;
use serde::Serialize;

/// A read-only contract call (`eth_call` / `eth_estimateGas`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
}

impl CallRequest {
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            from: None,
            to,
            data: data.into(),
        }
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// 4-byte function selector, if the calldata carries one
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.data.get(..4).and_then(|s| s.try_into().ok())
    }
}

/// Fully specified legacy transaction, ready for signing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxParams {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub chain_id: u64,
}

impl TxParams {
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.data.get(..4).and_then(|s| s.try_into().ok())
    }
}

/// Terminal state of a mined transaction
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub transaction_hash: TxHash,
    /// `true` when the transaction executed without reverting
    pub status: bool,
    pub gas_used: u64,
    pub block_number: Option<u64>,
    pub logs: Vec<Log>,
}

#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Execute a read-only call, optionally against historical state
    async fn call(&self, request: &CallRequest, block: Option<u64>) -> Result<Bytes>;

    /// Estimate gas for `request` sent from `request.from`
    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64>;

    async fn gas_price(&self) -> Result<u128>;

    async fn transaction_count(&self, address: Address) -> Result<u64>;

    async fn chain_id(&self) -> Result<u64>;

    async fn block_number(&self) -> Result<u64>;

    /// Sign a transaction with the wallet's key
    ///
    /// The key never leaves the wallet; implementations only see the
    /// signed bytes.
    async fn sign(&self, tx: &TxParams, wallet: &SecureWallet) -> Result<Bytes> {
        wallet.sign_transaction(tx)
    }

    /// Submit a signed transaction and return its hash
    async fn broadcast(&self, raw: Bytes) -> Result<TxHash>;

    /// Block until the transaction is mined
    ///
    /// There is no timeout: callers needing bounded latency must wrap the
    /// call themselves.
    async fn wait_for_receipt(&self, hash: TxHash) -> Result<Receipt>;
}
