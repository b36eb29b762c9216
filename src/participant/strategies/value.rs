//! Value investor: trades toward a fixed fundamental value.
//!
//! When the best ask sits far enough below fair value the investor tries to
//! take it with a fill-or-kill buy; when the best bid sits far enough above,
//! a fill-or-kill sell. If the fill-or-kill is killed it leaves a limit order
//! at the same price, which is cancelled on the next tick.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;

use crate::orderbook::OrderBook;
use crate::participant::strategies::{as_participant, offset_bps};
use crate::participant::{Agent, Participant, Trader};
use crate::types::{Order, OrderId, Side};

#[derive(Debug, Clone)]
pub struct ValueConfig {
    pub fair_value: Decimal,
    /// Required discount or premium to fair value
    pub margin_bps: i64,
    pub order_size: u64,
}

impl Default for ValueConfig {
    fn default() -> Self {
        Self {
            fair_value: Decimal::from(50),
            margin_bps: 100,
            order_size: 15,
        }
    }
}

pub struct ValueInvestor {
    trader: Arc<Trader>,
    config: ValueConfig,
    resting: Option<OrderId>,
}

impl ValueInvestor {
    pub fn new(trader: Arc<Trader>, config: ValueConfig) -> Self {
        Self {
            trader,
            config,
            resting: None,
        }
    }

    /// The fallback limit order left on the previous tick, if any.
    pub fn resting_order(&self) -> Option<OrderId> {
        self.resting
    }

    fn trade(&mut self, book: &OrderBook, side: Side, price: Decimal) {
        let size = self.config.order_size;
        let filled = match side {
            Side::Buy => book.submit_fok_buy_order(price, size, as_participant(&self.trader)),
            Side::Sell => book.submit_fok_sell_order(price, size, as_participant(&self.trader)),
        };
        if filled {
            debug!(owner = %self.trader.id(), %side, %price, size, "value fill-or-kill filled");
            return;
        }

        let Ok(order) = Order::limit(side, price, size, as_participant(&self.trader)) else {
            return;
        };
        let reference = book.last_price();
        let placed = match side {
            Side::Buy => book.submit_buy_order(order, reference),
            Side::Sell => book.submit_sell_order(order, reference),
        };
        self.resting = placed.ok();
    }
}

impl Agent for ValueInvestor {
    fn trader(&self) -> &Arc<Trader> {
        &self.trader
    }

    fn on_tick(&mut self, book: &OrderBook, _tick: u64) {
        if let Some(id) = self.resting.take() {
            book.cancel_order(id);
        }

        let cheap = offset_bps(self.config.fair_value, -self.config.margin_bps);
        let rich = offset_bps(self.config.fair_value, self.config.margin_bps);

        if let Some(ask) = book.best_ask().filter(|ask| *ask <= cheap) {
            self.trade(book, Side::Buy, ask);
        } else if let Some(bid) = book.best_bid().filter(|bid| *bid >= rich) {
            self.trade(book, Side::Sell, bid);
        }
    }
}
