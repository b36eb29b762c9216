//! Participant balances and reservation semantics.
//!
//! A reservation ("freeze") is a direct debit from the available balance taken
//! when a resting order is submitted. There is no separate escrow field: funds
//! and shares committed to resting orders live on the book until the order
//! fills or is cancelled, at which point the book credits them back or on.
//!
//! Every mutation either applies in full or returns an error leaving the
//! account untouched. Nothing here clamps to zero.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AccountError;

/// Available funds and share inventory of one participant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Account {
    available_funds: Decimal,
    shares_held: u64,
}

impl Account {
    /// Open an account with a starting balance.
    pub fn new(funds: Decimal, shares: u64) -> Result<Self, AccountError> {
        if funds.is_sign_negative() {
            return Err(AccountError::NegativeAmount(funds));
        }
        Ok(Self {
            available_funds: funds,
            shares_held: shares,
        })
    }

    #[inline]
    pub fn available_funds(&self) -> Decimal {
        self.available_funds
    }

    #[inline]
    pub fn shares_held(&self) -> u64 {
        self.shares_held
    }

    /// Reserve funds for a resting buy order.
    ///
    /// Returns `false` without touching the balance if `amount` is negative or
    /// exceeds the available funds.
    pub fn freeze_funds(&mut self, amount: Decimal) -> bool {
        self.decrease_funds(amount).is_ok()
    }

    /// Reserve shares for a resting sell order.
    pub fn freeze_shares(&mut self, volume: u64) -> bool {
        self.decrease_shares(volume).is_ok()
    }

    pub fn increase_funds(&mut self, amount: Decimal) -> Result<(), AccountError> {
        if amount.is_sign_negative() {
            return Err(AccountError::NegativeAmount(amount));
        }
        self.available_funds = self
            .available_funds
            .checked_add(amount)
            .ok_or(AccountError::Overflow)?;
        Ok(())
    }

    pub fn decrease_funds(&mut self, amount: Decimal) -> Result<(), AccountError> {
        if amount.is_sign_negative() {
            return Err(AccountError::NegativeAmount(amount));
        }
        if amount > self.available_funds {
            return Err(AccountError::InsufficientFunds {
                required: amount,
                available: self.available_funds,
            });
        }
        self.available_funds -= amount;
        Ok(())
    }

    pub fn increase_shares(&mut self, volume: u64) -> Result<(), AccountError> {
        self.shares_held = self
            .shares_held
            .checked_add(volume)
            .ok_or(AccountError::Overflow)?;
        Ok(())
    }

    pub fn decrease_shares(&mut self, volume: u64) -> Result<(), AccountError> {
        if volume > self.shares_held {
            return Err(AccountError::InsufficientShares {
                required: volume,
                available: self.shares_held,
            });
        }
        self.shares_held -= volume;
        Ok(())
    }
}
