//! Resting order submission.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::SubmitError;
use crate::orderbook::BookState;
use crate::types::price::{adjust_to_band, notional};
use crate::types::{Order, OrderId, Side};

/// Reserve and rest a limit order.
///
/// The price is rounded to the tick grid and clamped into the band around
/// `reference_price` before anything is reserved, so the reservation equals
/// what a cancel later returns. An id that is already resting is refused.
/// A rejected order leaves the book and the owner's account untouched.
pub fn place_limit(
    state: &mut BookState,
    config: &EngineConfig,
    mut order: Order,
    reference_price: Decimal,
) -> Result<OrderId, SubmitError> {
    if !order.flags().is_limit() {
        return Err(SubmitError::NotALimitOrder);
    }
    if reference_price <= Decimal::ZERO {
        return Err(SubmitError::InvalidReferencePrice(reference_price));
    }
    if state.contains_order(order.id()) {
        warn!(order_id = %order.id(), "duplicate order id rejected");
        return Err(SubmitError::DuplicateOrderId(order.id()));
    }

    let grid = config.tick_grid();
    let price = adjust_to_band(order.price(), reference_price, config.price_band_ratio, &grid)
        .ok_or(SubmitError::UnpriceableOrder(order.price()))?;

    let owner = order.owner().clone();
    let volume = order.volume();
    {
        let mut account = owner.account().lock();
        match order.side() {
            Side::Buy => {
                let cost = notional(price, volume).ok_or(SubmitError::UnpriceableOrder(price))?;
                if !account.freeze_funds(cost) {
                    let err = SubmitError::InsufficientFunds {
                        required: cost,
                        available: account.available_funds(),
                    };
                    warn!(owner = %owner.id(), %price, volume, %err, "buy order rejected");
                    return Err(err);
                }
            }
            Side::Sell => {
                if !account.freeze_shares(volume) {
                    let err = SubmitError::InsufficientShares {
                        required: volume,
                        available: account.shares_held(),
                    };
                    warn!(owner = %owner.id(), %price, volume, %err, "sell order rejected");
                    return Err(err);
                }
            }
        }
    }

    order.set_book_price(price);
    let order_id = order.id();
    let side = order.side();
    state.insert(order);

    debug!(order_id = %order_id, %side, %price, volume, owner = %owner.id(), "order rested");
    Ok(order_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::sync::Arc;

    use crate::account::Account;
    use crate::participant::{ParticipantKind, Trader};
    use crate::types::Stock;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn state() -> BookState {
        BookState::with_capacity(Stock::new("TEST", d("10")).unwrap(), 16)
    }

    fn trader(funds: &str, shares: u64) -> Arc<Trader> {
        Arc::new(Trader::new(ParticipantKind::Human, Account::new(d(funds), shares).unwrap()))
    }

    #[test]
    fn test_buy_reserves_adjusted_cost() {
        let mut book = state();
        let buyer = trader("1000", 0);
        let order = Order::limit(Side::Buy, d("10.04"), 10, buyer.clone()).unwrap();

        let id = place_limit(&mut book, &EngineConfig::default(), order, d("10")).unwrap();

        assert!(book.contains_order(id));
        assert_eq!(book.best_bid(), Some(d("10.0")));
        assert_eq!(buyer.funds(), d("900"));
    }

    #[test]
    fn test_price_clamped_into_band() {
        let mut book = state();
        let seller = trader("0", 10);
        let order = Order::limit(Side::Sell, d("30"), 10, seller.clone()).unwrap();

        place_limit(&mut book, &EngineConfig::default(), order, d("10")).unwrap();

        assert_eq!(book.best_ask(), Some(d("10.5")));
        assert_eq!(seller.shares(), 0);
    }

    #[test]
    fn test_insufficient_funds_rejected_without_mutation() {
        let mut book = state();
        let buyer = trader("90", 0);
        let order = Order::limit(Side::Buy, d("10"), 10, buyer.clone()).unwrap();

        let err = place_limit(&mut book, &EngineConfig::default(), order, d("10")).unwrap_err();

        assert_eq!(
            err,
            SubmitError::InsufficientFunds {
                required: d("100"),
                available: d("90"),
            }
        );
        assert!(book.is_empty());
        assert_eq!(buyer.funds(), d("90"));
    }

    #[test]
    fn test_insufficient_shares_rejected() {
        let mut book = state();
        let seller = trader("0", 5);
        let order = Order::limit(Side::Sell, d("10"), 6, seller.clone()).unwrap();

        let err = place_limit(&mut book, &EngineConfig::default(), order, d("10")).unwrap_err();

        assert!(matches!(err, SubmitError::InsufficientShares { required: 6, available: 5 }));
        assert_eq!(seller.shares(), 5);
    }

    #[test]
    fn test_market_order_cannot_rest() {
        let mut book = state();
        let order = Order::market(Side::Buy, 10, trader("1000", 0)).unwrap();

        let err = place_limit(&mut book, &EngineConfig::default(), order, d("10")).unwrap_err();
        assert_eq!(err, SubmitError::NotALimitOrder);
    }

    #[test]
    fn test_bad_reference_price() {
        let mut book = state();
        let order = Order::limit(Side::Buy, d("10"), 1, trader("1000", 0)).unwrap();

        let err = place_limit(&mut book, &EngineConfig::default(), order, Decimal::ZERO).unwrap_err();
        assert_eq!(err, SubmitError::InvalidReferencePrice(Decimal::ZERO));
    }

    #[test]
    fn test_resting_id_cannot_be_resubmitted() {
        let mut book = state();
        let buyer = trader("1000", 0);
        let config = EngineConfig::default();
        let first = Order::limit(Side::Buy, d("10"), 10, buyer.clone()).unwrap();
        let id = place_limit(&mut book, &config, first, d("10")).unwrap();

        let again = Order::limit(Side::Buy, d("10"), 10, buyer.clone()).unwrap().with_id(id);
        let err = place_limit(&mut book, &config, again, d("10")).unwrap_err();

        assert_eq!(err, SubmitError::DuplicateOrderId(id));
        assert_eq!(book.bid_count(), 1);
        assert_eq!(buyer.funds(), d("900"));

        let removed = book.remove_by_id(id).unwrap();
        assert_eq!(removed.volume(), 10);
        assert!(!book.contains_order(id));
    }

    #[test]
    fn test_extreme_prices_are_unpriceable() {
        let mut book = state();
        let buyer = trader("1000", 0);
        let config = EngineConfig::default();

        let order = Order::limit(Side::Buy, Decimal::MAX, 1, buyer.clone()).unwrap();
        let err = place_limit(&mut book, &config, order, d("10")).unwrap_err();
        assert_eq!(err, SubmitError::UnpriceableOrder(Decimal::MAX));

        let order = Order::limit(Side::Buy, d("10"), 1, buyer.clone()).unwrap();
        let err = place_limit(&mut book, &config, order, Decimal::MAX).unwrap_err();
        assert_eq!(err, SubmitError::UnpriceableOrder(d("10")));

        assert!(book.is_empty());
        assert_eq!(buyer.funds(), d("1000"));
    }
}
