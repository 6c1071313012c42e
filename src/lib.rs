//! Kinetic money-market client
//!
//! Typed access to the Kinetic lending protocol (a Compound v2 fork on
//! Flare):
//! - Supply, redeem, borrow and repay against kToken markets
//! - Enter and exit collateral markets, query account liquidity
//! - Exact decimal <-> base-unit conversion
//! - Approve-before-transfer for every action that pulls tokens
//! - Numeric protocol error codes decoded into named failures
//!
//! # Security Model
//!
//! - Private keys never leave the wallet module
//! - Every write waits for its receipt before returning
//! - Nothing is retried automatically

pub mod client;
pub mod config;
pub mod contracts;
pub mod gateway;
pub mod orchestrator;
pub mod protocol_error;
pub mod tokens;
pub mod units;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use client::{
    ComptrollerOperations, Liquidity, MarketClient, MarketEntry, MarketExit, MarketOperations,
    MarketResult, MarketStatus, RedeemMode, VersionGated,
};
pub use config::{ApprovalPolicy, ClientConfig, ProtocolVersion, RpcConfig};
pub use error::{Error, Result};
pub use gateway::{AlloyGateway, ChainGateway, Receipt};
pub use protocol_error::{ErrorName, ProtocolError};
pub use tokens::TokenRegistry;
