//! Noise trader: random limit and market orders near the reference price.
//!
//! All randomness comes from a `ChaCha8Rng` seeded at construction, so a run
//! is reproducible given the seed and the book it trades against.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::orderbook::OrderBook;
use crate::participant::strategies::{as_participant, offset_bps, reference_price};
use crate::participant::{Agent, Trader};
use crate::types::{Order, OrderId, Side};

#[derive(Debug, Clone)]
pub struct NoiseTraderConfig {
    /// Chance, in percent, of acting on a tick
    pub order_probability_pct: u32,
    /// Chance, in percent, that an action is a market order
    pub market_order_pct: u32,
    /// Chance, in percent, of cancelling the oldest open order each tick
    pub cancel_pct: u32,
    /// Limit prices deviate from the reference by up to this many basis points
    pub max_offset_bps: i64,
    pub min_volume: u64,
    pub max_volume: u64,
}

impl Default for NoiseTraderConfig {
    fn default() -> Self {
        Self {
            order_probability_pct: 40,
            market_order_pct: 10,
            cancel_pct: 20,
            max_offset_bps: 200,
            min_volume: 1,
            max_volume: 20,
        }
    }
}

pub struct NoiseTrader {
    trader: Arc<Trader>,
    config: NoiseTraderConfig,
    rng: ChaCha8Rng,
    open_orders: Vec<OrderId>,
}

impl NoiseTrader {
    pub fn with_seed(trader: Arc<Trader>, config: NoiseTraderConfig, seed: u64) -> Self {
        Self {
            trader,
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            open_orders: Vec::new(),
        }
    }

    /// Orders this trader placed that may still rest on the book.
    pub fn open_orders(&self) -> &[OrderId] {
        &self.open_orders
    }

    fn roll(&mut self, pct: u32) -> bool {
        self.rng.gen_range(0..100) < pct
    }

    fn maybe_cancel(&mut self, book: &OrderBook) {
        self.open_orders.retain(|id| book.contains_order(*id));
        if self.open_orders.is_empty() || !self.roll(self.config.cancel_pct) {
            return;
        }
        let oldest = self.open_orders.remove(0);
        book.cancel_order(oldest);
    }

    fn act(&mut self, book: &OrderBook) {
        let side = if self.rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
        let low = self.config.min_volume.max(1);
        let volume = self.rng.gen_range(low..=self.config.max_volume.max(low));

        if self.roll(self.config.market_order_pct) {
            let participant = as_participant(&self.trader);
            let filled = match side {
                Side::Buy => book.market_buy(participant, volume),
                Side::Sell => book.market_sell(participant, volume),
            };
            debug!(%side, volume, filled, "noise market order");
            return;
        }

        let reference = reference_price(book);
        let max = self.config.max_offset_bps;
        let price = offset_bps(reference, self.rng.gen_range(-max..=max));
        let Ok(order) = Order::limit(side, price, volume, as_participant(&self.trader)) else {
            return;
        };
        let placed = match side {
            Side::Buy => book.submit_buy_order(order, book.last_price()),
            Side::Sell => book.submit_sell_order(order, book.last_price()),
        };
        match placed {
            Ok(id) => self.open_orders.push(id),
            Err(err) => debug!(%side, %price, volume, %err, "noise order rejected"),
        }
    }
}

impl Agent for NoiseTrader {
    fn trader(&self) -> &Arc<Trader> {
        &self.trader
    }

    fn on_tick(&mut self, book: &OrderBook, _tick: u64) {
        self.maybe_cancel(book);
        if self.roll(self.config.order_probability_pct) {
            self.act(book);
        }
    }
}
