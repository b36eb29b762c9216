//! Market maker: two-sided quotes around the last price.
//!
//! Every `refresh_interval` ticks the maker cancels whatever is left of its
//! previous quotes and re-quotes both sides. It stops quoting the side that
//! would grow its inventory past `max_inventory`.

use std::sync::Arc;

use tracing::debug;

use crate::orderbook::OrderBook;
use crate::participant::strategies::{as_participant, offset_bps};
use crate::participant::{Agent, Trader};
use crate::types::{Order, OrderId, Side};

#[derive(Debug, Clone)]
pub struct MarketMakerConfig {
    /// Distance of each quote from the last price
    pub half_spread_bps: i64,
    pub quote_size: u64,
    pub refresh_interval: u64,
    /// Net position beyond which one side stops quoting
    pub max_inventory: i64,
}

impl Default for MarketMakerConfig {
    fn default() -> Self {
        Self {
            half_spread_bps: 40,
            quote_size: 20,
            refresh_interval: 5,
            max_inventory: 500,
        }
    }
}

pub struct MarketMaker {
    trader: Arc<Trader>,
    config: MarketMakerConfig,
    quotes: Vec<OrderId>,
    last_quote_tick: Option<u64>,
}

impl MarketMaker {
    pub fn new(trader: Arc<Trader>, config: MarketMakerConfig) -> Self {
        Self {
            trader,
            config,
            quotes: Vec::new(),
            last_quote_tick: None,
        }
    }

    /// Ids of the quotes placed on the last refresh.
    pub fn quotes(&self) -> &[OrderId] {
        &self.quotes
    }

    fn due(&self, tick: u64) -> bool {
        match self.last_quote_tick {
            None => true,
            Some(last) => tick.saturating_sub(last) >= self.config.refresh_interval,
        }
    }

    fn quote(&mut self, book: &OrderBook, side: Side) {
        let reference = book.last_price();
        let bps = match side {
            Side::Buy => -self.config.half_spread_bps,
            Side::Sell => self.config.half_spread_bps,
        };
        let price = offset_bps(reference, bps);
        let order = match Order::limit(side, price, self.config.quote_size, as_participant(&self.trader)) {
            Ok(order) => order,
            Err(err) => {
                debug!(%err, "market maker quote not constructible");
                return;
            }
        };
        let placed = match side {
            Side::Buy => book.submit_buy_order(order, reference),
            Side::Sell => book.submit_sell_order(order, reference),
        };
        match placed {
            Ok(id) => self.quotes.push(id),
            Err(err) => debug!(%side, %err, "market maker quote rejected"),
        }
    }
}

impl Agent for MarketMaker {
    fn trader(&self) -> &Arc<Trader> {
        &self.trader
    }

    fn on_tick(&mut self, book: &OrderBook, tick: u64) {
        if !self.due(tick) {
            return;
        }
        for id in self.quotes.drain(..) {
            book.cancel_order(id);
        }
        self.last_quote_tick = Some(tick);

        let position = self.trader.net_position();
        if position < self.config.max_inventory {
            self.quote(book, Side::Buy);
        }
        if position > -self.config.max_inventory {
            self.quote(book, Side::Sell);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    use crate::participant::strategies::test_support::{book, trader};
    use crate::participant::ParticipantKind;

    #[test]
    fn test_quotes_both_sides() {
        let book = book(100);
        let mm = trader(ParticipantKind::MarketMaker, 100_000, 1_000);
        let mut agent = MarketMaker::new(mm, MarketMakerConfig::default());

        agent.on_tick(&book, 0);

        assert_eq!(agent.quotes().len(), 2);
        assert_eq!(book.best_bid(), Some(Decimal::new(996, 1)));
        assert_eq!(book.best_ask(), Some(Decimal::new(1005, 1)));
    }

    #[test]
    fn test_refresh_cancels_stale_quotes() {
        let book = book(100);
        let mm = trader(ParticipantKind::MarketMaker, 100_000, 1_000);
        let mut agent = MarketMaker::new(mm.clone(), MarketMakerConfig::default());

        agent.on_tick(&book, 0);
        let first = agent.quotes().to_vec();
        agent.on_tick(&book, 1);
        assert_eq!(agent.quotes(), first.as_slice());

        agent.on_tick(&book, 5);
        assert!(first.iter().all(|id| !book.contains_order(*id)));
        assert_eq!(book.bid_count(), 1);
        assert_eq!(book.ask_count(), 1);
        // Only the live quotes hold reservations
        assert_eq!(mm.shares(), 1_000 - 20);
    }

    #[test]
    fn test_inventory_limit_stops_buy_side() {
        let book = book(100);
        let mm = trader(ParticipantKind::MarketMaker, 100_000, 1_000);
        let config = MarketMakerConfig {
            max_inventory: 0,
            ..MarketMakerConfig::default()
        };
        let mut agent = MarketMaker::new(mm, config);

        agent.on_tick(&book, 0);
        assert_eq!(book.bid_count(), 0);
        assert_eq!(book.ask_count(), 0);
    }
}
