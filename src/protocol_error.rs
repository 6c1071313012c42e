//! Compound-style protocol error codes
//!
//! Kinetic markets report most failures as numeric codes rather than revert
//! strings. This module maps those codes to names and recovers them from RPC
//! error text such as `execution reverted: Error(14)`.

use serde::{Serialize, Serializer};
use std::fmt;

/// Semantic name of a protocol error code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorName {
    NoError,
    Unauthorized,
    ComptrollerMismatch,
    InsufficientLiquidity,
    InsufficientBalance,
    ComptrollerRejection,
    ComptrollerCalculationError,
    InterestRateModelError,
    InvalidAccountPair,
    InvalidCloseAmountRequested,
    InvalidCollateralFactor,
    MathError,
    MarketNotFresh,
    MarketNotListed,
    TokenInsufficientAllowance,
    TokenInsufficientBalance,
    TokenInsufficientCash,
    TokenTransferInFailed,
    TokenTransferOutFailed,
    Unknown(u64),
}

impl ErrorName {
    /// Numeric code this name was decoded from
    pub fn code(&self) -> u64 {
        match self {
            ErrorName::NoError => 0,
            ErrorName::Unauthorized => 1,
            ErrorName::ComptrollerMismatch => 2,
            ErrorName::InsufficientLiquidity => 3,
            ErrorName::InsufficientBalance => 4,
            ErrorName::ComptrollerRejection => 5,
            ErrorName::ComptrollerCalculationError => 6,
            ErrorName::InterestRateModelError => 7,
            ErrorName::InvalidAccountPair => 8,
            ErrorName::InvalidCloseAmountRequested => 9,
            ErrorName::InvalidCollateralFactor => 10,
            ErrorName::MathError => 11,
            ErrorName::MarketNotFresh => 12,
            ErrorName::MarketNotListed => 13,
            ErrorName::TokenInsufficientAllowance => 14,
            ErrorName::TokenInsufficientBalance => 15,
            ErrorName::TokenInsufficientCash => 16,
            ErrorName::TokenTransferInFailed => 17,
            ErrorName::TokenTransferOutFailed => 18,
            ErrorName::Unknown(code) => *code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ErrorName::NoError)
    }
}

impl fmt::Display for ErrorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorName::NoError => "NO_ERROR",
            ErrorName::Unauthorized => "UNAUTHORIZED",
            ErrorName::ComptrollerMismatch => "COMPTROLLER_MISMATCH",
            ErrorName::InsufficientLiquidity => "INSUFFICIENT_LIQUIDITY",
            ErrorName::InsufficientBalance => "INSUFFICIENT_BALANCE",
            ErrorName::ComptrollerRejection => "COMPTROLLER_REJECTION",
            ErrorName::ComptrollerCalculationError => "COMPTROLLER_CALCULATION_ERROR",
            ErrorName::InterestRateModelError => "INTEREST_RATE_MODEL_ERROR",
            ErrorName::InvalidAccountPair => "INVALID_ACCOUNT_PAIR",
            ErrorName::InvalidCloseAmountRequested => "INVALID_CLOSE_AMOUNT_REQUESTED",
            ErrorName::InvalidCollateralFactor => "INVALID_COLLATERAL_FACTOR",
            ErrorName::MathError => "MATH_ERROR",
            ErrorName::MarketNotFresh => "MARKET_NOT_FRESH",
            ErrorName::MarketNotListed => "MARKET_NOT_LISTED",
            ErrorName::TokenInsufficientAllowance => "TOKEN_INSUFFICIENT_ALLOWANCE",
            ErrorName::TokenInsufficientBalance => "TOKEN_INSUFFICIENT_BALANCE",
            ErrorName::TokenInsufficientCash => "TOKEN_INSUFFICIENT_CASH",
            ErrorName::TokenTransferInFailed => "TOKEN_TRANSFER_IN_FAILED",
            ErrorName::TokenTransferOutFailed => "TOKEN_TRANSFER_OUT_FAILED",
            ErrorName::Unknown(code) => return write!(f, "UNKNOWN_ERROR_{}", code),
        };
        f.write_str(name)
    }
}

impl Serialize for ErrorName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Map a numeric protocol code to its name
pub fn decode(code: u64) -> ErrorName {
    match code {
        0 => ErrorName::NoError,
        1 => ErrorName::Unauthorized,
        2 => ErrorName::ComptrollerMismatch,
        3 => ErrorName::InsufficientLiquidity,
        4 => ErrorName::InsufficientBalance,
        5 => ErrorName::ComptrollerRejection,
        6 => ErrorName::ComptrollerCalculationError,
        7 => ErrorName::InterestRateModelError,
        8 => ErrorName::InvalidAccountPair,
        9 => ErrorName::InvalidCloseAmountRequested,
        10 => ErrorName::InvalidCollateralFactor,
        11 => ErrorName::MathError,
        12 => ErrorName::MarketNotFresh,
        13 => ErrorName::MarketNotListed,
        14 => ErrorName::TokenInsufficientAllowance,
        15 => ErrorName::TokenInsufficientBalance,
        16 => ErrorName::TokenInsufficientCash,
        17 => ErrorName::TokenTransferInFailed,
        18 => ErrorName::TokenTransferOutFailed,
        other => ErrorName::Unknown(other),
    }
}

/// Extract an embedded error code from exception text
///
/// Recognizes `Error(<digits>)` and the older `Error code: <digits>` form.
/// Returns `None` when neither pattern is present; callers should surface the
/// raw text instead of guessing.
pub fn parse(text: &str) -> Option<ErrorName> {
    find_code_after(text, "Error(", |rest| rest.starts_with(')'))
        .or_else(|| find_code_after(text, "Error code: ", |_| true))
        .map(decode)
}

/// Scan every occurrence of `marker` for a run of digits accepted by `terminated`
fn find_code_after(text: &str, marker: &str, terminated: impl Fn(&str) -> bool) -> Option<u64> {
    let mut search = text;
    while let Some(start) = search.find(marker) {
        let rest = &search[start + marker.len()..];
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_end > 0 && terminated(&rest[digits_end..]) {
            if let Ok(code) = rest[..digits_end].parse() {
                return Some(code);
            }
        }
        search = rest;
    }
    None
}

/// A decoded protocol failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocolError {
    pub code: u64,
    pub name: ErrorName,
    pub raw_message: String,
}

impl ProtocolError {
    pub fn from_code(code: u64, raw_message: impl Into<String>) -> Self {
        Self {
            code,
            name: decode(code),
            raw_message: raw_message.into(),
        }
    }

    /// Build from exception text if it carries a recognizable code
    pub fn from_text(text: &str) -> Option<Self> {
        parse(text).map(|name| Self {
            code: name.code(),
            name,
            raw_message: text.to_string(),
        })
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.name, self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_codes() {
        assert_eq!(decode(0), ErrorName::NoError);
        assert_eq!(decode(5), ErrorName::ComptrollerRejection);
        assert_eq!(decode(5).to_string(), "COMPTROLLER_REJECTION");
        assert_eq!(decode(13).to_string(), "MARKET_NOT_LISTED");
        assert_eq!(decode(18).to_string(), "TOKEN_TRANSFER_OUT_FAILED");
    }

    #[test]
    fn test_decode_unknown_code() {
        assert_eq!(decode(999), ErrorName::Unknown(999));
        assert_eq!(decode(999).to_string(), "UNKNOWN_ERROR_999");
        assert_eq!(decode(999).code(), 999);
    }

    #[test]
    fn test_code_roundtrip_for_table() {
        for code in 0..=18 {
            assert_eq!(decode(code).code(), code);
            assert!(!matches!(decode(code), ErrorName::Unknown(_)));
        }
    }

    #[test]
    fn test_parse_revert_text() {
        assert_eq!(
            parse("execution reverted: Error(14)"),
            Some(ErrorName::TokenInsufficientAllowance)
        );
        assert_eq!(
            parse("Mint failed: Error code: 3"),
            Some(ErrorName::InsufficientLiquidity)
        );
    }

    #[test]
    fn test_parse_skips_non_numeric_matches() {
        // Solidity's Error(string) selector text must not be mistaken for a code
        let text = "revert Error(string) then Error(16)";
        assert_eq!(parse(text), Some(ErrorName::TokenInsufficientCash));
        assert_eq!(parse("Error(abc)"), None);
        assert_eq!(parse("Error(12"), None);
    }

    #[test]
    fn test_parse_without_pattern_returns_none() {
        assert_eq!(parse("execution reverted"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn test_protocol_error_from_text() {
        let err = ProtocolError::from_text("execution reverted: Error(13)").unwrap();
        assert_eq!(err.code, 13);
        assert_eq!(err.name, ErrorName::MarketNotListed);
        assert_eq!(err.raw_message, "execution reverted: Error(13)");
        assert_eq!(err.to_string(), "MARKET_NOT_LISTED (code 13)");
    }

    #[test]
    fn test_serializes_as_name() {
        let json = serde_json::to_string(&decode(4)).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_BALANCE\"");
    }
}
