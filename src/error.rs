//! Error types for the Kinetic client

use crate::protocol_error::ProtocolError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Token not found: {0}")]
    TokenNotFound(String),

    #[error("No kToken found for {0}")]
    KTokenNotFound(String),

    #[error("Approval failed: {0}")]
    Approval(String),

    #[error("Transaction failed: {message}")]
    Transaction {
        message: String,
        protocol: Option<ProtocolError>,
    },

    #[error("Insufficient {symbol} balance: need {required}, have {available}")]
    InsufficientBalance {
        symbol: String,
        required: String,
        available: String,
    },

    #[error("Protocol error: {0}")]
    Protocol(ProtocolError),

    #[error("A signing wallet is required for {0}")]
    SignerRequired(&'static str),

    #[error("{operation} is not supported by protocol version {version}")]
    UnsupportedVersion {
        operation: &'static str,
        version: u32,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Decoded protocol error carried by this failure, if any
    pub fn protocol_error(&self) -> Option<&ProtocolError> {
        match self {
            Error::Transaction { protocol, .. } => protocol.as_ref(),
            Error::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
