//! Scripted in-memory gateway for tests
//!
//! Answers reads by function selector, records every signed transaction in
//! submission order, and applies `approve` transactions to its allowance
//! table so follow-up reads see the new value.

use super::{CallRequest, ChainGateway, Receipt, TxParams};
use crate::contracts::{IComptroller, IERC20, IKToken};
use crate::wallet::SecureWallet;
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, Log, TxHash, B256, U256};
use alloy::sol_types::{SolCall, SolEvent, SolValue};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Block number reported for every mined mock transaction
pub const MOCK_BLOCK: u64 = 1_000;

/// Well-known development key (DO NOT use in production!)
pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub fn test_wallet() -> SecureWallet {
    SecureWallet::from_hex(TEST_KEY).unwrap()
}

/// Observable gateway activity, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    AllowanceRead { token: Address, value: U256 },
    Sent { to: Address, selector: [u8; 4] },
}

#[derive(Default)]
struct MockState {
    allowances: HashMap<(Address, Address), U256>,
    balances: HashMap<Address, U256>,
    decimals: HashMap<Address, u8>,
    exchange_rates: HashMap<Address, U256>,
    liquidity: (U256, U256, U256),
    enter_codes: Vec<U256>,
    exit_code: U256,
    all_markets: Vec<Address>,
    markets: HashMap<Address, (bool, U256)>,
    mint_paused: HashSet<Address>,
    /// Selectors whose transactions are mined with a failed status
    reverting: HashSet<[u8; 4]>,
    /// Error text returned when a reverting selector is replayed
    revert_text: HashMap<[u8; 4], String>,
    /// Extra logs attached to receipts by selector
    extra_logs: HashMap<[u8; 4], Vec<Log>>,
    estimate_fails: bool,
    /// Selectors whose pre-submission `eth_call` fails
    failing_simulations: HashSet<[u8; 4]>,
    /// Node unreachable for gas price reads
    disconnected: bool,
    /// Mine approvals without touching the allowance table
    ignore_approvals: bool,
    sent: Vec<TxParams>,
    events: Vec<MockEvent>,
}

pub struct MockGateway {
    state: Mutex<MockState>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MockState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn set_allowance(&self, token: Address, spender: Address, value: U256) {
        self.with_state(|s| s.allowances.insert((token, spender), value));
    }

    pub fn set_balance(&self, token: Address, value: U256) {
        self.with_state(|s| s.balances.insert(token, value));
    }

    pub fn set_decimals(&self, token: Address, decimals: u8) {
        self.with_state(|s| s.decimals.insert(token, decimals));
    }

    pub fn set_exchange_rate(&self, ktoken: Address, mantissa: U256) {
        self.with_state(|s| s.exchange_rates.insert(ktoken, mantissa));
    }

    pub fn set_liquidity(&self, error: U256, liquidity: U256, shortfall: U256) {
        self.with_state(|s| s.liquidity = (error, liquidity, shortfall));
    }

    pub fn set_enter_codes(&self, codes: Vec<u64>) {
        self.with_state(|s| s.enter_codes = codes.into_iter().map(U256::from).collect());
    }

    pub fn set_exit_code(&self, code: u64) {
        self.with_state(|s| s.exit_code = U256::from(code));
    }

    pub fn set_all_markets(&self, markets: Vec<Address>) {
        self.with_state(|s| s.all_markets = markets);
    }

    pub fn set_market(&self, ktoken: Address, listed: bool, collateral_factor: U256) {
        self.with_state(|s| s.markets.insert(ktoken, (listed, collateral_factor)));
    }

    pub fn pause_mint(&self, ktoken: Address) {
        self.with_state(|s| s.mint_paused.insert(ktoken));
    }

    /// Mine transactions with `selector` as reverted; replays fail with `text`
    pub fn revert_on(&self, selector: [u8; 4], text: Option<&str>) {
        self.with_state(|s| {
            s.reverting.insert(selector);
            if let Some(text) = text {
                s.revert_text.insert(selector, text.to_string());
            }
        });
    }

    pub fn attach_log(&self, selector: [u8; 4], log: Log) {
        self.with_state(|s| s.extra_logs.entry(selector).or_default().push(log));
    }

    pub fn ignore_approvals(&self) {
        self.with_state(|s| s.ignore_approvals = true);
    }

    pub fn fail_estimates(&self) {
        self.with_state(|s| s.estimate_fails = true);
    }

    pub fn fail_simulation(&self, selector: [u8; 4]) {
        self.with_state(|s| s.failing_simulations.insert(selector));
    }

    pub fn disconnect(&self) {
        self.with_state(|s| s.disconnected = true);
    }

    /// Signed transactions in submission order
    pub fn sent(&self) -> Vec<TxParams> {
        self.with_state(|s| s.sent.clone())
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.with_state(|s| s.events.clone())
    }

    fn answer(state: &mut MockState, request: &CallRequest) -> Result<Vec<u8>> {
        let selector = request
            .selector()
            .ok_or_else(|| Error::Gateway("empty calldata".to_string()))?;
        let data = &request.data;

        let encoded = match selector {
            IERC20::allowanceCall::SELECTOR => {
                let call = IERC20::allowanceCall::abi_decode(data)
                    .map_err(|e| Error::Gateway(e.to_string()))?;
                let value = state
                    .allowances
                    .get(&(request.to, call.spender))
                    .copied()
                    .unwrap_or_default();
                state.events.push(MockEvent::AllowanceRead {
                    token: request.to,
                    value,
                });
                value.abi_encode()
            }
            IERC20::balanceOfCall::SELECTOR => state
                .balances
                .get(&request.to)
                .copied()
                .unwrap_or_default()
                .abi_encode(),
            IERC20::decimalsCall::SELECTOR => match state.decimals.get(&request.to) {
                Some(decimals) => U256::from(*decimals).abi_encode(),
                None => return Err(Error::Gateway("execution reverted".to_string())),
            },
            IKToken::exchangeRateStoredCall::SELECTOR => state
                .exchange_rates
                .get(&request.to)
                .copied()
                .unwrap_or_default()
                .abi_encode(),
            IComptroller::getAccountLiquidityCall::SELECTOR => state.liquidity.abi_encode_params(),
            IComptroller::enterMarketsCall::SELECTOR => {
                (state.enter_codes.clone(),).abi_encode_params()
            }
            IComptroller::exitMarketCall::SELECTOR => state.exit_code.abi_encode(),
            IComptroller::getAllMarketsCall::SELECTOR => {
                (state.all_markets.clone(),).abi_encode_params()
            }
            IComptroller::marketsCall::SELECTOR => {
                let call = IComptroller::marketsCall::abi_decode(data)
                    .map_err(|e| Error::Gateway(e.to_string()))?;
                let (listed, factor) = state
                    .markets
                    .get(&call.cToken)
                    .copied()
                    .unwrap_or_default();
                (listed, factor, false).abi_encode_params()
            }
            IComptroller::mintGuardianPausedCall::SELECTOR => {
                let call = IComptroller::mintGuardianPausedCall::abi_decode(data)
                    .map_err(|e| Error::Gateway(e.to_string()))?;
                state.mint_paused.contains(&call.cToken).abi_encode()
            }
            _ => U256::ZERO.abi_encode(),
        };
        Ok(encoded)
    }

    /// Effects of a mined transaction on the mock state, plus emitted logs
    fn apply(state: &mut MockState, tx: &TxParams) -> Vec<Log> {
        let Some(selector) = tx.selector() else {
            return Vec::new();
        };

        let mut logs = Vec::new();
        if selector == IERC20::approveCall::SELECTOR && !state.ignore_approvals {
            if let Ok(call) = IERC20::approveCall::abi_decode(&tx.data) {
                state.allowances.insert((tx.to, call.spender), call.amount);
            }
        } else if selector == IComptroller::enterMarketsCall::SELECTOR {
            if let Ok(call) = IComptroller::enterMarketsCall::abi_decode(&tx.data) {
                for (market, code) in call.cTokens.iter().zip(state.enter_codes.iter()) {
                    if code.is_zero() {
                        let event = IComptroller::MarketEntered {
                            cToken: *market,
                            account: tx.from,
                        };
                        logs.push(Log {
                            address: tx.to,
                            data: event.encode_log_data(),
                        });
                    }
                }
            }
        }

        logs.extend(state.extra_logs.get(&selector).cloned().unwrap_or_default());
        logs
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn hash_for(index: usize) -> TxHash {
    B256::from(U256::from(index + 1).to_be_bytes::<32>())
}

fn index_for(hash: TxHash) -> usize {
    U256::from_be_bytes(hash.0).to::<usize>() - 1
}

#[async_trait]
impl ChainGateway for MockGateway {
    async fn call(&self, request: &CallRequest, block: Option<u64>) -> Result<Bytes> {
        self.with_state(|state| {
            let selector = request.selector();
            if block.is_some() {
                if let Some(text) = selector.and_then(|s| state.revert_text.get(&s)) {
                    return Err(Error::Gateway(text.clone()));
                }
            } else if selector.is_some_and(|s| state.failing_simulations.contains(&s)) {
                return Err(Error::Gateway("header not found".to_string()));
            }
            Self::answer(state, request).map(Bytes::from)
        })
    }

    async fn estimate_gas(&self, _request: &CallRequest) -> Result<u64> {
        self.with_state(|state| {
            if state.estimate_fails {
                Err(Error::Gateway("gas required exceeds allowance".to_string()))
            } else {
                Ok(90_000)
            }
        })
    }

    async fn gas_price(&self) -> Result<u128> {
        self.with_state(|state| {
            if state.disconnected {
                Err(Error::Connection("connection refused".to_string()))
            } else {
                Ok(25_000_000_000)
            }
        })
    }

    async fn transaction_count(&self, _address: Address) -> Result<u64> {
        Ok(self.with_state(|s| s.sent.len() as u64))
    }

    async fn chain_id(&self) -> Result<u64> {
        Ok(14)
    }

    async fn block_number(&self) -> Result<u64> {
        Ok(MOCK_BLOCK)
    }

    async fn sign(&self, tx: &TxParams, _wallet: &SecureWallet) -> Result<Bytes> {
        self.with_state(|state| {
            state.sent.push(tx.clone());
            Ok(Bytes::from(hash_for(state.sent.len() - 1).to_vec()))
        })
    }

    async fn broadcast(&self, raw: Bytes) -> Result<TxHash> {
        let hash = B256::from_slice(&raw);
        self.with_state(|state| {
            let tx = &state.sent[index_for(hash)];
            let selector = tx.selector().unwrap_or_default();
            let event = MockEvent::Sent {
                to: tx.to,
                selector,
            };
            state.events.push(event);
        });
        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<Receipt> {
        self.with_state(|state| {
            let tx = state.sent[index_for(hash)].clone();
            let reverted = tx
                .selector()
                .map(|s| state.reverting.contains(&s))
                .unwrap_or(false);
            let logs = if reverted {
                Vec::new()
            } else {
                Self::apply(state, &tx)
            };

            Ok(Receipt {
                transaction_hash: hash,
                status: !reverted,
                gas_used: 90_000,
                block_number: Some(MOCK_BLOCK),
                logs,
            })
        })
    }
}
