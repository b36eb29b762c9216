//! Account transfers for a single execution.
//!
//! Resting orders already hold their reservation (funds for bids, shares for
//! asks), so settling against one only credits. Market and fill-or-kill takers
//! have no reservation and are debited here, atomically per call.

use rust_decimal::Decimal;
use tracing::warn;

use crate::account::Account;
use crate::error::AccountError;
use crate::participant::Participant;

/// Debit `cost` and credit `volume` shares, or change nothing.
pub(crate) fn buy_shares(account: &mut Account, cost: Decimal, volume: u64) -> Result<(), AccountError> {
    if account.shares_held().checked_add(volume).is_none() {
        return Err(AccountError::Overflow);
    }
    account.decrease_funds(cost)?;
    account.increase_shares(volume)
}

/// Debit `volume` shares and credit `proceeds`, or change nothing.
pub(crate) fn sell_shares(account: &mut Account, volume: u64, proceeds: Decimal) -> Result<(), AccountError> {
    if account.available_funds().checked_add(proceeds).is_none() {
        return Err(AccountError::Overflow);
    }
    account.decrease_shares(volume)?;
    account.increase_funds(proceeds)
}

/// Credit funds to a participant whose side of the trade is already reserved.
pub(crate) fn credit_funds(participant: &dyn Participant, amount: Decimal) {
    if amount <= Decimal::ZERO {
        return;
    }
    if let Err(err) = participant.account().lock().increase_funds(amount) {
        warn!(owner = %participant.id(), %amount, %err, "failed to credit funds");
    }
}

/// Credit shares to a participant whose side of the trade is already reserved.
pub(crate) fn credit_shares(participant: &dyn Participant, volume: u64) {
    if volume == 0 {
        return;
    }
    if let Err(err) = participant.account().lock().increase_shares(volume) {
        warn!(owner = %participant.id(), volume, %err, "failed to credit shares");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buy_shares() {
        let mut account = Account::new(Decimal::from(100), 0).unwrap();

        buy_shares(&mut account, Decimal::from(60), 6).unwrap();
        assert_eq!(account.available_funds(), Decimal::from(40));
        assert_eq!(account.shares_held(), 6);

        let err = buy_shares(&mut account, Decimal::from(50), 5).unwrap_err();
        assert!(matches!(err, AccountError::InsufficientFunds { .. }));
        assert_eq!(account.available_funds(), Decimal::from(40));
        assert_eq!(account.shares_held(), 6);
    }

    #[test]
    fn test_buy_shares_overflow_changes_nothing() {
        let mut account = Account::new(Decimal::from(100), u64::MAX).unwrap();

        assert_eq!(buy_shares(&mut account, Decimal::from(1), 1), Err(AccountError::Overflow));
        assert_eq!(account.available_funds(), Decimal::from(100));
    }

    #[test]
    fn test_sell_shares() {
        let mut account = Account::new(Decimal::ZERO, 10).unwrap();

        sell_shares(&mut account, 4, Decimal::from(44)).unwrap();
        assert_eq!(account.shares_held(), 6);
        assert_eq!(account.available_funds(), Decimal::from(44));

        let err = sell_shares(&mut account, 7, Decimal::from(77)).unwrap_err();
        assert_eq!(err, AccountError::InsufficientShares { required: 7, available: 6 });
        assert_eq!(account.available_funds(), Decimal::from(44));
    }
}
