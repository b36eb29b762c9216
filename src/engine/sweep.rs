//! Market sweeps and fill-or-kill execution.
//!
//! Takers settle directly against their account: nothing is frozen first and
//! nothing rests afterwards. The taker's own resting orders are skipped.

use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::engine::settle::{buy_shares, credit_funds, credit_shares, sell_shares};
use crate::engine::{Execution, Outcome};
use crate::error::{OrderError, SubmitError};
use crate::orderbook::BookState;
use crate::participant::{Participant, ParticipantId};
use crate::types::price::notional;
use crate::types::Side;

/// Slab keys of the opposite side in priority order, minus the taker's own orders.
fn counter_orders(state: &BookState, taker_side: Side, taker: ParticipantId) -> Vec<usize> {
    state
        .side_in_priority(taker_side.opposite())
        .filter(|(_, order)| order.owner_id() != taker)
        .map(|(key, _)| key)
        .collect()
}

/// Buy up to `quantity` from the asks at their resting prices.
///
/// Each fill is capped by what the taker can afford at that price; the sweep
/// stops once quantity or funds run out.
pub fn market_buy(state: &mut BookState, taker: &Arc<dyn Participant>, quantity: u64) -> Outcome {
    let mut outcome = Outcome::default();
    let mut remaining = quantity;

    for key in counter_orders(state, Side::Buy, taker.id()) {
        if remaining == 0 {
            break;
        }
        let Some(ask) = state.get(key) else {
            continue;
        };
        let price = ask.price();
        let affordable = {
            let funds = taker.account().lock().available_funds();
            funds
                .checked_div(price)
                .and_then(|shares| shares.floor().to_u64())
                .unwrap_or(0)
        };
        let volume = ask.volume().min(remaining).min(affordable);
        if volume == 0 {
            break;
        }
        let Some(cost) = notional(price, volume) else {
            break;
        };
        let seller = ask.owner().clone();
        let ask_id = ask.id();

        if let Err(err) = buy_shares(&mut taker.account().lock(), cost, volume) {
            warn!(owner = %taker.id(), %cost, volume, %err, "market buy settlement failed");
            break;
        }
        credit_funds(seller.as_ref(), cost);
        state.fill(key, volume);
        remaining -= volume;

        outcome.record(
            state,
            Execution {
                buyer: taker.clone(),
                seller,
                bid_order_id: None,
                ask_order_id: Some(ask_id),
                price,
                volume,
            },
        );
    }

    outcome.taker_volume = quantity - remaining;
    debug!(owner = %taker.id(), requested = quantity, filled = outcome.taker_volume, "market buy swept");
    outcome
}

/// Sell up to `quantity` into the bids at their resting prices.
///
/// Fills are capped by the taker's share inventory.
pub fn market_sell(state: &mut BookState, taker: &Arc<dyn Participant>, quantity: u64) -> Outcome {
    let mut outcome = Outcome::default();
    let mut remaining = quantity;

    for key in counter_orders(state, Side::Sell, taker.id()) {
        if remaining == 0 {
            break;
        }
        let Some(bid) = state.get(key) else {
            continue;
        };
        let price = bid.price();
        let held = taker.account().lock().shares_held();
        let volume = bid.volume().min(remaining).min(held);
        if volume == 0 {
            break;
        }
        let Some(proceeds) = notional(price, volume) else {
            break;
        };
        let buyer = bid.owner().clone();
        let bid_id = bid.id();

        if let Err(err) = sell_shares(&mut taker.account().lock(), volume, proceeds) {
            warn!(owner = %taker.id(), %proceeds, volume, %err, "market sell settlement failed");
            break;
        }
        // The bid reserved exactly `price × volume` for this fill.
        credit_shares(buyer.as_ref(), volume);
        state.fill(key, volume);
        remaining -= volume;

        outcome.record(
            state,
            Execution {
                buyer,
                seller: taker.clone(),
                bid_order_id: Some(bid_id),
                ask_order_id: None,
                price,
                volume,
            },
        );
    }

    outcome.taker_volume = quantity - remaining;
    debug!(owner = %taker.id(), requested = quantity, filled = outcome.taker_volume, "market sell swept");
    outcome
}

/// Execute `quantity` in full against liquidity at or better than
/// `limit_price`, or change nothing.
///
/// The full plan, its cost and the taker's balance are checked before the
/// first mutation.
pub fn fill_or_kill(
    state: &mut BookState,
    side: Side,
    taker: &Arc<dyn Participant>,
    limit_price: Decimal,
    quantity: u64,
) -> Result<Outcome, SubmitError> {
    if quantity == 0 {
        return Err(OrderError::ZeroVolume.into());
    }
    if limit_price <= Decimal::ZERO {
        return Err(OrderError::NonPositivePrice(limit_price).into());
    }

    // (key, price, volume) per counter order, in priority order
    let mut plan = Vec::new();
    let mut available = 0u64;
    let mut needed = quantity;
    for key in counter_orders(state, side, taker.id()) {
        let Some(order) = state.get(key) else {
            continue;
        };
        let within_limit = match side {
            Side::Buy => order.price() <= limit_price,
            Side::Sell => order.price() >= limit_price,
        };
        if !within_limit {
            break;
        }
        available = available.saturating_add(order.volume());
        if needed > 0 {
            let take = order.volume().min(needed);
            plan.push((key, order.price(), take));
            needed -= take;
        }
    }

    if needed > 0 {
        debug!(owner = %taker.id(), %side, %limit_price, quantity, available, "fill-or-kill killed");
        return Err(SubmitError::FillOrKillUnfilled {
            requested: quantity,
            available,
        });
    }

    let mut total = Decimal::ZERO;
    for &(_, price, volume) in &plan {
        total = notional(price, volume)
            .and_then(|n| total.checked_add(n))
            .ok_or(SubmitError::UnpriceableOrder(price))?;
    }

    {
        let mut account = taker.account().lock();
        match side {
            Side::Buy => buy_shares(&mut account, total, quantity)?,
            Side::Sell => sell_shares(&mut account, quantity, total)?,
        }
    }

    let mut outcome = Outcome::default();
    for (key, price, volume) in plan {
        let Some(counter) = state.get(key) else {
            continue;
        };
        let counterparty = counter.owner().clone();
        let counter_id = Some(counter.id());

        let execution = match side {
            Side::Buy => {
                if let Some(proceeds) = notional(price, volume) {
                    credit_funds(counterparty.as_ref(), proceeds);
                }
                Execution {
                    buyer: taker.clone(),
                    seller: counterparty,
                    bid_order_id: None,
                    ask_order_id: counter_id,
                    price,
                    volume,
                }
            }
            Side::Sell => {
                credit_shares(counterparty.as_ref(), volume);
                Execution {
                    buyer: counterparty,
                    seller: taker.clone(),
                    bid_order_id: counter_id,
                    ask_order_id: None,
                    price,
                    volume,
                }
            }
        };
        state.fill(key, volume);
        outcome.record(state, execution);
    }

    outcome.taker_volume = quantity;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::account::Account;
    use crate::participant::{ParticipantKind, Trader};
    use crate::types::{Order, Stock};

    fn d(value: i64) -> Decimal {
        Decimal::from(value)
    }

    fn trader(funds: i64, shares: u64) -> Arc<Trader> {
        Arc::new(Trader::new(
            ParticipantKind::Value,
            Account::new(d(funds), shares).unwrap(),
        ))
    }

    fn dyn_of(trader: &Arc<Trader>) -> Arc<dyn Participant> {
        trader.clone()
    }

    fn state() -> BookState {
        BookState::with_capacity(Stock::new("TEST", d(10)).unwrap(), 64)
    }

    fn rest(state: &mut BookState, owner: &Arc<Trader>, side: Side, price: Decimal, volume: u64) {
        {
            let mut account = owner.account().lock();
            match side {
                Side::Buy => assert!(account.freeze_funds(price * Decimal::from(volume))),
                Side::Sell => assert!(account.freeze_shares(volume)),
            }
        }
        state.insert(Order::limit(side, price, volume, dyn_of(owner)).unwrap());
    }

    #[test]
    fn test_market_buy_sweeps_levels() {
        let mut book = state();
        let seller = trader(0, 100);
        let buyer = trader(1_000, 0);
        rest(&mut book, &seller, Side::Sell, d(10), 30);
        rest(&mut book, &seller, Side::Sell, d(11), 30);

        let outcome = market_buy(&mut book, &dyn_of(&buyer), 50);

        assert_eq!(outcome.taker_volume, 50);
        assert_eq!(outcome.trades.len(), 2);
        assert_eq!(buyer.shares(), 50);
        assert_eq!(buyer.funds(), d(1_000 - 300 - 220));
        assert_eq!(seller.funds(), d(520));
        assert_eq!(book.depth(Side::Sell, 5), vec![(d(11), 10)]);
        assert_eq!(book.last_price(), d(11));
    }

    #[test]
    fn test_market_buy_capped_by_funds() {
        let mut book = state();
        let seller = trader(0, 100);
        let buyer = trader(95, 0);
        rest(&mut book, &seller, Side::Sell, d(10), 50);

        let outcome = market_buy(&mut book, &dyn_of(&buyer), 50);

        assert_eq!(outcome.taker_volume, 9);
        assert_eq!(buyer.funds(), d(5));
        assert_eq!(book.depth(Side::Sell, 1), vec![(d(10), 41)]);
    }

    #[test]
    fn test_market_buy_skips_own_orders() {
        let mut book = state();
        let both = trader(1_000, 100);
        let other = trader(0, 100);
        rest(&mut book, &both, Side::Sell, d(9), 10);
        rest(&mut book, &other, Side::Sell, d(10), 10);

        let outcome = market_buy(&mut book, &dyn_of(&both), 20);

        assert_eq!(outcome.taker_volume, 10);
        assert_eq!(outcome.trades[0].seller, other.id());
        assert_eq!(book.ask_count(), 1);
    }

    #[test]
    fn test_market_sell_capped_by_inventory() {
        let mut book = state();
        let buyer = trader(1_000, 0);
        let seller = trader(0, 7);
        rest(&mut book, &buyer, Side::Buy, d(10), 20);

        let outcome = market_sell(&mut book, &dyn_of(&seller), 20);

        assert_eq!(outcome.taker_volume, 7);
        assert_eq!(seller.funds(), d(70));
        assert_eq!(seller.shares(), 0);
        assert_eq!(buyer.shares(), 7);
        assert_eq!(book.depth(Side::Buy, 1), vec![(d(10), 13)]);
    }

    #[test]
    fn test_market_order_on_empty_book() {
        let mut book = state();
        let buyer = trader(1_000, 0);

        let outcome = market_buy(&mut book, &dyn_of(&buyer), 10);
        assert_eq!(outcome.taker_volume, 0);
        assert!(outcome.is_empty());
        assert_eq!(buyer.funds(), d(1_000));
    }

    #[test]
    fn test_fok_buy_fills_across_orders() {
        let mut book = state();
        let seller = trader(0, 100);
        let buyer = trader(1_000, 0);
        rest(&mut book, &seller, Side::Sell, d(10), 30);
        rest(&mut book, &seller, Side::Sell, d(11), 30);
        rest(&mut book, &seller, Side::Sell, d(12), 30);

        let outcome = fill_or_kill(&mut book, Side::Buy, &dyn_of(&buyer), d(11), 40).unwrap();

        assert_eq!(outcome.taker_volume, 40);
        assert_eq!(buyer.shares(), 40);
        assert_eq!(buyer.funds(), d(1_000 - 300 - 110));
        assert_eq!(book.depth(Side::Sell, 5), vec![(d(11), 20), (d(12), 30)]);
    }

    #[test]
    fn test_fok_killed_leaves_everything() {
        let mut book = state();
        let seller = trader(0, 100);
        let buyer = trader(10_000, 0);
        rest(&mut book, &seller, Side::Sell, d(10), 40);
        let before = book.state_root();

        let err = fill_or_kill(&mut book, Side::Buy, &dyn_of(&buyer), d(10), 100).unwrap_err();

        assert_eq!(err, SubmitError::FillOrKillUnfilled { requested: 100, available: 40 });
        assert_eq!(book.state_root(), before);
        assert_eq!(buyer.funds(), d(10_000));
        assert_eq!(seller.funds(), d(0));
    }

    #[test]
    fn test_fok_unaffordable_leaves_everything() {
        let mut book = state();
        let seller = trader(0, 100);
        let buyer = trader(50, 0);
        rest(&mut book, &seller, Side::Sell, d(10), 40);
        let before = book.state_root();

        let err = fill_or_kill(&mut book, Side::Buy, &dyn_of(&buyer), d(10), 10).unwrap_err();

        assert!(matches!(err, SubmitError::InsufficientFunds { .. }));
        assert_eq!(book.state_root(), before);
        assert_eq!(buyer.funds(), d(50));
    }

    #[test]
    fn test_fok_sell_into_bids() {
        let mut book = state();
        let buyer = trader(1_000, 0);
        let seller = trader(0, 50);
        rest(&mut book, &buyer, Side::Buy, d(10), 20);
        rest(&mut book, &buyer, Side::Buy, d(9), 20);

        let outcome = fill_or_kill(&mut book, Side::Sell, &dyn_of(&seller), d(9), 30).unwrap();

        assert_eq!(outcome.trades.len(), 2);
        assert_eq!(seller.funds(), d(200 + 90));
        assert_eq!(seller.shares(), 20);
        assert_eq!(buyer.shares(), 30);
        assert_eq!(book.depth(Side::Buy, 1), vec![(d(9), 10)]);
    }

    #[test]
    fn test_fok_excludes_own_liquidity() {
        let mut book = state();
        let both = trader(1_000, 100);
        rest(&mut book, &both, Side::Sell, d(10), 50);

        let err = fill_or_kill(&mut book, Side::Buy, &dyn_of(&both), d(10), 10).unwrap_err();
        assert_eq!(err, SubmitError::FillOrKillUnfilled { requested: 10, available: 0 });
    }
}
