//! Momentum trader: follows the recent trend in the last traded price.

use std::collections::VecDeque;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;

use crate::orderbook::OrderBook;
use crate::participant::strategies::as_participant;
use crate::participant::{Agent, Participant, Trader};

#[derive(Debug, Clone)]
pub struct MomentumConfig {
    /// Ticks between the two prices compared
    pub lookback: usize,
    /// Move, in basis points over the lookback, that triggers a trade
    pub threshold_bps: i64,
    pub order_size: u64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            lookback: 10,
            threshold_bps: 30,
            order_size: 10,
        }
    }
}

pub struct Momentum {
    trader: Arc<Trader>,
    config: MomentumConfig,
    prices: VecDeque<Decimal>,
}

impl Momentum {
    pub fn new(trader: Arc<Trader>, config: MomentumConfig) -> Self {
        let capacity = config.lookback + 1;
        Self {
            trader,
            config,
            prices: VecDeque::with_capacity(capacity),
        }
    }

    /// Change over the window in basis points, once the window is full.
    fn trend_bps(&self) -> Option<Decimal> {
        if self.prices.len() <= self.config.lookback {
            return None;
        }
        let first = *self.prices.front()?;
        let last = *self.prices.back()?;
        if first <= Decimal::ZERO {
            return None;
        }
        Some((last - first) / first * Decimal::from(10_000))
    }
}

impl Agent for Momentum {
    fn trader(&self) -> &Arc<Trader> {
        &self.trader
    }

    fn on_tick(&mut self, book: &OrderBook, _tick: u64) {
        self.prices.push_back(book.last_price());
        while self.prices.len() > self.config.lookback + 1 {
            self.prices.pop_front();
        }

        let Some(trend) = self.trend_bps() else {
            return;
        };
        let threshold = Decimal::from(self.config.threshold_bps);
        let filled = if trend >= threshold {
            book.market_buy(as_participant(&self.trader), self.config.order_size)
        } else if trend <= -threshold {
            book.market_sell(as_participant(&self.trader), self.config.order_size)
        } else {
            return;
        };
        debug!(owner = %self.trader.id(), %trend, filled, "momentum signal");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::participant::strategies::test_support::{book, counterparty, trader};
    use crate::participant::ParticipantKind;
    use crate::types::Side;

    fn config() -> MomentumConfig {
        MomentumConfig {
            lookback: 2,
            threshold_bps: 30,
            order_size: 5,
        }
    }

    #[test]
    fn test_waits_for_full_window() {
        let book = book(10);
        counterparty(&book, Side::Sell, Decimal::from(10), 100);
        let me = trader(ParticipantKind::Momentum, 1_000, 0);
        let mut agent = Momentum::new(me.clone(), config());

        agent.on_tick(&book, 0);
        agent.on_tick(&book, 1);
        assert_eq!(me.fill_count(), 0);
    }

    #[test]
    fn test_buys_rising_price() {
        let book = book(10);
        let me = trader(ParticipantKind::Momentum, 1_000, 0);
        let mut agent = Momentum::new(me.clone(), config());

        agent.on_tick(&book, 0);
        // A trade at 10.2 lifts the last price
        counterparty(&book, Side::Sell, Decimal::new(102, 1), 1);
        counterparty(&book, Side::Buy, Decimal::new(102, 1), 1);
        book.process_orders();
        agent.on_tick(&book, 1);

        counterparty(&book, Side::Sell, Decimal::new(103, 1), 50);
        agent.on_tick(&book, 2);

        assert_eq!(me.shares(), 5);
        assert_eq!(me.net_position(), 5);
    }

    #[test]
    fn test_flat_price_does_nothing() {
        let book = book(10);
        counterparty(&book, Side::Sell, Decimal::from(10), 100);
        let me = trader(ParticipantKind::Momentum, 1_000, 0);
        let mut agent = Momentum::new(me.clone(), config());

        for tick in 0..5 {
            agent.on_tick(&book, tick);
        }
        assert_eq!(me.fill_count(), 0);
    }
}
