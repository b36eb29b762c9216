//! Trading strategies.
//!
//! Each strategy owns an `Arc<Trader>` and talks to the book only through
//! [`OrderBook`]'s public operations. Order ids handed back by the book are
//! the only handle a strategy keeps on its resting orders.
//!
//! Offsets are expressed in basis points so that quoting stays in exact
//! decimal arithmetic.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::orderbook::OrderBook;
use crate::participant::{Participant, Trader};

mod human;
mod market_maker;
mod momentum;
mod noise;
mod value;

pub use human::{Command, CommandResult, Human, HumanDesk};
pub use market_maker::{MarketMaker, MarketMakerConfig};
pub use momentum::{Momentum, MomentumConfig};
pub use noise::{NoiseTrader, NoiseTraderConfig};
pub use value::{ValueConfig, ValueInvestor};

const BPS_PER_UNIT: i64 = 10_000;

/// `price × (1 + bps / 10_000)`
pub fn offset_bps(price: Decimal, bps: i64) -> Decimal {
    price * Decimal::from(BPS_PER_UNIT + bps) / Decimal::from(BPS_PER_UNIT)
}

/// Mid price when both sides are quoted, otherwise the last traded price.
pub fn reference_price(book: &OrderBook) -> Decimal {
    match (book.best_bid(), book.best_ask()) {
        (Some(bid), Some(ask)) if bid <= ask => (bid + ask) / Decimal::TWO,
        _ => book.last_price(),
    }
}

fn as_participant(trader: &Arc<Trader>) -> Arc<dyn Participant> {
    trader.clone()
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::types::Side;

    #[test]
    fn test_offset_bps() {
        assert_eq!(offset_bps(Decimal::from(100), 50), Decimal::new(1005, 1));
        assert_eq!(offset_bps(Decimal::from(100), -200), Decimal::from(98));
    }

    #[test]
    fn test_reference_price_prefers_mid() {
        let book = book(10);
        assert_eq!(reference_price(&book), Decimal::from(10));

        counterparty(&book, Side::Buy, Decimal::new(98, 1), 1);
        counterparty(&book, Side::Sell, Decimal::new(104, 1), 1);
        assert_eq!(reference_price(&book), Decimal::new(101, 1));
    }
}
