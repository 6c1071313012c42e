//! JSON-RPC gateway backed by an alloy HTTP provider

use super::{CallRequest, ChainGateway, Receipt};
use crate::{Error, Result};
use alloy::eips::BlockId;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::time::Duration;

/// Default interval between receipt polls
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Gateway that talks to a node over HTTP
pub struct AlloyGateway {
    provider: DynProvider,
    poll_interval: Duration,
}

impl AlloyGateway {
    /// Build a gateway for `rpc_url` without touching the network
    pub fn new(rpc_url: &str) -> Result<Self> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e| Error::Config(format!("Invalid RPC URL {}: {}", rpc_url, e)))?;

        let provider = ProviderBuilder::new().connect_http(url).erased();

        Ok(Self {
            provider,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Build a gateway and check the node answers
    pub async fn connect(rpc_url: &str) -> Result<Self> {
        let gateway = Self::new(rpc_url)?;
        let block = gateway.block_number().await?;
        tracing::debug!(rpc_url = %rpc_url, block, "Connected to RPC endpoint");
        Ok(gateway)
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn to_request(request: &CallRequest) -> TransactionRequest {
        let tx = TransactionRequest::default()
            .to(request.to)
            .input(request.data.clone().into());
        match request.from {
            Some(from) => tx.from(from),
            None => tx,
        }
    }
}

#[async_trait]
impl ChainGateway for AlloyGateway {
    async fn call(&self, request: &CallRequest, block: Option<u64>) -> Result<Bytes> {
        let call = self.provider.call(Self::to_request(request));
        let result = match block {
            Some(number) => call.block(BlockId::number(number)).await,
            None => call.await,
        };
        result.map_err(|e| Error::Gateway(e.to_string()))
    }

    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64> {
        self.provider
            .estimate_gas(Self::to_request(request))
            .await
            .map_err(|e| Error::Gateway(e.to_string()))
    }

    async fn gas_price(&self) -> Result<u128> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| Error::Connection(e.to_string()))
    }

    async fn transaction_count(&self, address: Address) -> Result<u64> {
        self.provider
            .get_transaction_count(address)
            .await
            .map_err(|e| Error::Connection(e.to_string()))
    }

    async fn chain_id(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| Error::Connection(e.to_string()))
    }

    async fn block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| Error::Connection(format!("Failed to reach RPC endpoint: {}", e)))
    }

    async fn broadcast(&self, raw: Bytes) -> Result<TxHash> {
        let pending = self
            .provider
            .send_raw_transaction(&raw)
            .await
            .map_err(|e| Error::Gateway(format!("Broadcast failed: {}", e)))?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<Receipt> {
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(hash)
                .await
                .map_err(|e| Error::Connection(e.to_string()))?;

            if let Some(receipt) = receipt {
                return Ok(Receipt {
                    transaction_hash: receipt.transaction_hash,
                    status: receipt.status(),
                    gas_used: receipt.gas_used,
                    block_number: receipt.block_number,
                    logs: receipt
                        .inner
                        .logs()
                        .iter()
                        .map(|log| log.inner.clone())
                        .collect(),
                });
            }

            tracing::debug!(tx_hash = %hash, "Transaction not mined yet");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_rejects_invalid_url() {
        let err = AlloyGateway::new("not a url").err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_request_carries_sender() {
        let to = address!("deebabe05bda7e8c1740873abf715f16164c29b8");
        let from = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
        let request = CallRequest::new(to, vec![1u8, 2, 3, 4]).from(from);

        let tx = AlloyGateway::to_request(&request);
        assert_eq!(tx.from, Some(from));
        assert_eq!(tx.input.input().map(|b| b.to_vec()), Some(vec![1, 2, 3, 4]));
    }
}
