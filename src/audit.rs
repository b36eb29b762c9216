//! Conservation audit.
//!
//! Because a reservation is a direct debit, a participant's balance excludes
//! whatever its resting orders hold. Totals here add the book's reservations
//! back so they can be compared before and after any sequence of operations.
//!
//! The reads are not atomic across traders and the book; call these only
//! while no other thread is trading.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::orderbook::OrderBook;
use crate::participant::Trader;

/// Funds held by `traders` plus funds reserved by resting bids, or `None`
/// if the total leaves the `Decimal` range.
pub fn total_funds(traders: &[Arc<Trader>], book: &OrderBook) -> Option<Decimal> {
    let held = traders
        .iter()
        .try_fold(Decimal::ZERO, |total, t| total.checked_add(t.funds()))?;
    held.checked_add(book.reserved_funds()?)
}

/// Shares held by `traders` plus shares reserved by resting asks.
pub fn total_shares(traders: &[Arc<Trader>], book: &OrderBook) -> u64 {
    let held: u64 = traders.iter().map(|t| t.shares()).sum();
    held + book.reserved_shares()
}
