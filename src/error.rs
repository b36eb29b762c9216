//! Error types for the engine.
//!
//! Routine market outcomes (not enough funds, unknown cancel id, an unfilled
//! fill-or-kill) are reported through these values and never escalate past
//! the [`OrderBook`](crate::OrderBook) boundary.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{OrderId, Side};

/// Account mutation failures. The account is untouched whenever one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    #[error("insufficient shares: required {required}, available {available}")]
    InsufficientShares { required: u64, available: u64 },

    #[error("amount must be non-negative, got {0}")]
    NegativeAmount(Decimal),

    #[error("balance overflow")]
    Overflow,
}

/// Order construction contract violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("invalid side: {0:?}")]
    InvalidSide(String),

    #[error("order volume must be positive")]
    ZeroVolume,

    #[error("limit price must be positive, got {0}")]
    NonPositivePrice(Decimal),
}

/// Why a submission was rejected. No book or account mutation has happened.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    #[error("insufficient shares: required {required}, available {available}")]
    InsufficientShares { required: u64, available: u64 },

    #[error("{got:?} order sent to the {expected:?} entry point")]
    WrongSide { expected: Side, got: Side },

    #[error("market and fill-or-kill orders cannot rest on the book")]
    NotALimitOrder,

    #[error("reference price must be positive, got {0}")]
    InvalidReferencePrice(Decimal),

    #[error("price {0} is not representable after rounding")]
    UnpriceableOrder(Decimal),

    #[error("order {0} is already resting on the book")]
    DuplicateOrderId(OrderId),

    #[error("fill-or-kill not filled: requested {requested}, executable {available}")]
    FillOrKillUnfilled { requested: u64, available: u64 },

    #[error(transparent)]
    Order(#[from] OrderError),
}

impl From<AccountError> for SubmitError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InsufficientFunds { required, available } => {
                SubmitError::InsufficientFunds { required, available }
            }
            AccountError::InsufficientShares { required, available } => {
                SubmitError::InsufficientShares { required, available }
            }
            AccountError::NegativeAmount(amount) => {
                SubmitError::Order(OrderError::NonPositivePrice(amount))
            }
            AccountError::Overflow => SubmitError::UnpriceableOrder(Decimal::MAX),
        }
    }
}

/// A configuration value outside its allowed range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid config field `{field}`: {reason}")]
pub struct InvalidConfig {
    pub field: &'static str,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_error_from_account_error() {
        let err: SubmitError = AccountError::InsufficientFunds {
            required: Decimal::from(100),
            available: Decimal::from(90),
        }
        .into();
        assert_eq!(
            err,
            SubmitError::InsufficientFunds {
                required: Decimal::from(100),
                available: Decimal::from(90),
            }
        );
    }

    #[test]
    fn test_error_display() {
        let err = AccountError::InsufficientShares { required: 10, available: 3 };
        assert_eq!(err.to_string(), "insufficient shares: required 10, available 3");

        let err = OrderError::InvalidSide("hold".to_string());
        assert!(err.to_string().contains("hold"));
    }
}
