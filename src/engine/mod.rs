//! Matching passes over an unlocked [`BookState`].
//!
//! ## Matching Rules
//!
//! - **Crossing loop** ([`process_orders`]): best bid against best ask from a
//!   different owner; executes at the ask price while the pair crosses within
//!   the max price-difference ratio
//! - **Market sweep** ([`market_buy`], [`market_sell`]): walks the opposite
//!   side at resting prices; unfilled volume is dropped
//! - **Fill-or-kill** ([`fill_or_kill`]): plans the whole fill first and
//!   mutates nothing unless the plan covers the full quantity
//! - **Submission** ([`place_limit`]): rounds, bands and reserves, then rests
//!
//! Every pass returns an [`Outcome`]. Callbacks and notifications are left to
//! the caller so they run after the book lock is released.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use bourse::config::EngineConfig;
//! use bourse::engine::{place_limit, process_orders};
//! use bourse::orderbook::BookState;
//! use bourse::types::Stock;
//! use bourse::{Account, Order, ParticipantKind, Side, Trader};
//! use rust_decimal::Decimal;
//!
//! let config = EngineConfig::default();
//! let mut state = BookState::with_capacity(Stock::new("ACME", Decimal::from(10)).unwrap(), 16);
//! let buyer = Arc::new(Trader::new(ParticipantKind::Human, Account::new(Decimal::from(1_000), 0).unwrap()));
//! let seller = Arc::new(Trader::new(ParticipantKind::Human, Account::new(Decimal::ZERO, 100).unwrap()));
//!
//! let bid = Order::limit(Side::Buy, Decimal::from(10), 100, buyer).unwrap();
//! let ask = Order::limit(Side::Sell, Decimal::from(10), 100, seller).unwrap();
//! place_limit(&mut state, &config, bid, Decimal::from(10)).unwrap();
//! place_limit(&mut state, &config, ask, Decimal::from(10)).unwrap();
//!
//! let outcome = process_orders(&mut state, &config);
//! assert_eq!(outcome.trades.len(), 1);
//! assert!(state.is_empty());
//! ```

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use crate::orderbook::BookState;
use crate::participant::{Fill, Participant};
use crate::types::{monotonic_nanos, OrderId, Side, Trade};

mod matcher;
mod settle;
mod submit;
mod sweep;

pub use matcher::{is_executable, process_orders};
pub(crate) use settle::{credit_funds, credit_shares};
pub use submit::place_limit;
pub use sweep::{fill_or_kill, market_buy, market_sell};

/// Everything a pass executed, in execution order.
#[derive(Default)]
pub struct Outcome {
    pub trades: Vec<Trade>,
    /// Fill callbacks owed to participants, delivered after unlock
    pub fills: Vec<(Arc<dyn Participant>, Fill)>,
    /// Volume filled for the taker of a market or fill-or-kill order
    pub taker_volume: u64,
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fills: Vec<_> = self.fills.iter().map(|(p, fill)| (p.id(), fill)).collect();
        f.debug_struct("Outcome")
            .field("trades", &self.trades)
            .field("fills", &fills)
            .field("taker_volume", &self.taker_volume)
            .finish()
    }
}

impl Outcome {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn volume(&self) -> u64 {
        self.trades.iter().map(|t| t.volume).sum()
    }

    /// Record a settled execution: stamp a trade, move the last price and
    /// queue both fill callbacks.
    pub(crate) fn record(&mut self, state: &mut BookState, execution: Execution) {
        let Execution {
            buyer,
            seller,
            bid_order_id,
            ask_order_id,
            price,
            volume,
        } = execution;

        state.record_trade(price);
        let trade = Trade {
            id: state.next_trade_id(),
            bid_order_id,
            ask_order_id,
            buyer: buyer.id(),
            seller: seller.id(),
            price,
            volume,
            timestamp: monotonic_nanos(),
        };
        info!(
            trade_id = trade.id,
            %price,
            volume,
            buyer = %trade.buyer,
            seller = %trade.seller,
            "trade executed"
        );

        self.fills.push((
            buyer,
            Fill {
                side: Side::Buy,
                volume,
                price,
                order_id: bid_order_id,
            },
        ));
        self.fills.push((
            seller,
            Fill {
                side: Side::Sell,
                volume,
                price,
                order_id: ask_order_id,
            },
        ));
        self.trades.push(trade);
    }
}

/// A settled fill between two participants.
pub(crate) struct Execution {
    pub buyer: Arc<dyn Participant>,
    pub seller: Arc<dyn Participant>,
    pub bid_order_id: Option<OrderId>,
    pub ask_order_id: Option<OrderId>,
    pub price: Decimal,
    pub volume: u64,
}
