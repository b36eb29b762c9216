//! The shared, locked order book.
//!
//! ## Concurrency
//!
//! One `parking_lot::Mutex` guards the whole [`BookState`]. Every submit,
//! cancel, sweep and match pass holds it for the full in-memory mutation and
//! nothing else. Participant accounts are locked strictly inside the book lock
//! (book first, then account).
//!
//! Fill callbacks and listener notifications are collected while the lock is
//! held and delivered after it is released, so observers only ever see fully
//! settled state and may call back into the book.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::EngineConfig;
use crate::engine::{self, Outcome};
use crate::error::SubmitError;
use crate::orderbook::BookState;
use crate::participant::{Participant, ParticipantId, ParticipantKind};
use crate::types::price::notional;
use crate::types::{MatchReceipt, Order, OrderId, Side, Stock, Trade};

/// Read-only snapshot of one resting order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderView {
    pub id: OrderId,
    pub side: Side,
    pub price: Decimal,
    pub volume: u64,
    pub owner: ParticipantId,
    pub kind: ParticipantKind,
    pub submitted_at: u64,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id(),
            side: order.side(),
            price: order.price(),
            volume: order.volume(),
            owner: order.owner_id(),
            kind: order.owner_kind(),
            submitted_at: order.submitted_at(),
        }
    }
}

/// Top-of-book summary carried by [`BookEvent::BookChanged`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookSummary {
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    pub last_price: Decimal,
    pub bid_count: usize,
    pub ask_count: usize,
}

impl BookSummary {
    fn of(state: &BookState) -> Self {
        Self {
            best_bid: state.best_bid(),
            best_ask: state.best_ask(),
            last_price: state.last_price(),
            bid_count: state.bid_count(),
            ask_count: state.ask_count(),
        }
    }
}

/// Change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookEvent {
    /// Fired after every successful submit or cancel and after every match pass
    BookChanged(BookSummary),
    /// Fired once per executed fill
    TradeExecuted {
        price: Decimal,
        volume: u64,
        trade: Trade,
    },
}

pub type Listener = Arc<dyn Fn(&BookEvent) + Send + Sync>;

/// Handle returned by [`OrderBook::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Result of a generic [`OrderBook::place`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// A limit order now resting under this id
    Resting(OrderId),
    /// A market or fill-or-kill order that executed this much volume
    Executed(u64),
}

/// Single-instrument order book.
///
/// ## Example
///
/// ```
/// use std::sync::Arc;
/// use bourse::{Account, Order, OrderBook, ParticipantKind, Side, Trader};
/// use bourse::config::EngineConfig;
/// use bourse::types::Stock;
/// use rust_decimal::Decimal;
///
/// let book = OrderBook::new(Stock::new("ACME", Decimal::from(10)).unwrap(), EngineConfig::default());
/// let p1 = Arc::new(Trader::new(ParticipantKind::Human, Account::new(Decimal::from(1_000), 0).unwrap()));
/// let p2 = Arc::new(Trader::new(ParticipantKind::Human, Account::new(Decimal::ZERO, 100).unwrap()));
///
/// let bid = Order::limit(Side::Buy, Decimal::from(10), 100, p1.clone()).unwrap();
/// book.submit_buy_order(bid, Decimal::from(10)).unwrap();
/// let ask = Order::limit(Side::Sell, Decimal::new(95, 1), 100, p2.clone()).unwrap();
/// book.submit_sell_order(ask, Decimal::from(10)).unwrap();
///
/// let receipt = book.process_orders();
/// assert_eq!(receipt.trades_executed, 1);
/// assert_eq!(p1.shares(), 100);
/// assert_eq!(p2.funds(), Decimal::from(950));
/// ```
pub struct OrderBook {
    state: Mutex<BookState>,
    config: EngineConfig,
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
    next_subscription: AtomicU64,
}

impl fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderBook")
            .field("state", &*self.state.lock())
            .field("config", &self.config)
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

impl OrderBook {
    pub fn new(stock: Stock, config: EngineConfig) -> Self {
        Self {
            state: Mutex::new(BookState::with_capacity(stock, config.order_capacity)),
            config,
            listeners: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&BookEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Returns true if the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(sub, _)| *sub != id);
        listeners.len() != before
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    fn emit(&self, events: &[BookEvent]) {
        if events.is_empty() {
            return;
        }
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for event in events {
            for listener in &listeners {
                listener(event);
            }
        }
    }

    /// Deliver fill callbacks and trade events, then a change summary.
    fn publish(&self, outcome: Outcome, summary: Option<BookSummary>) {
        for (participant, fill) in &outcome.fills {
            participant.on_filled(fill);
        }
        let mut events: Vec<BookEvent> = outcome
            .trades
            .into_iter()
            .map(|trade| BookEvent::TradeExecuted {
                price: trade.price,
                volume: trade.volume,
                trade,
            })
            .collect();
        events.extend(summary.map(BookEvent::BookChanged));
        self.emit(&events);
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Reserve funds for and rest a limit buy order.
    pub fn submit_buy_order(&self, order: Order, reference_price: Decimal) -> Result<OrderId, SubmitError> {
        self.submit_limit(Side::Buy, order, reference_price)
    }

    /// Reserve shares for and rest a limit sell order.
    pub fn submit_sell_order(&self, order: Order, reference_price: Decimal) -> Result<OrderId, SubmitError> {
        self.submit_limit(Side::Sell, order, reference_price)
    }

    fn submit_limit(&self, expected: Side, order: Order, reference_price: Decimal) -> Result<OrderId, SubmitError> {
        if order.side() != expected {
            return Err(SubmitError::WrongSide {
                expected,
                got: order.side(),
            });
        }
        let (order_id, summary) = {
            let mut state = self.state.lock();
            let order_id = engine::place_limit(&mut state, &self.config, order, reference_price)?;
            (order_id, BookSummary::of(&state))
        };
        self.emit(&[BookEvent::BookChanged(summary)]);
        Ok(order_id)
    }

    /// Route any order by its flags: limit orders rest, market orders sweep,
    /// fill-or-kill orders execute in full or fail.
    pub fn place(&self, order: Order, reference_price: Decimal) -> Result<Placement, SubmitError> {
        let flags = order.flags();
        if flags.market {
            let owner = order.owner().clone();
            let filled = match order.side() {
                Side::Buy => self.market_buy(owner, order.volume()),
                Side::Sell => self.market_sell(owner, order.volume()),
            };
            Ok(Placement::Executed(filled))
        } else if flags.fill_or_kill {
            let owner = order.owner().clone();
            self.try_fill_or_kill(order.side(), order.price(), order.volume(), owner)
                .map(Placement::Executed)
        } else {
            let side = order.side();
            self.submit_limit(side, order, reference_price).map(Placement::Resting)
        }
    }

    // ========================================================================
    // Market and fill-or-kill
    // ========================================================================

    /// Buy up to `quantity` at resting prices. Returns the filled volume.
    pub fn market_buy(&self, participant: Arc<dyn Participant>, quantity: u64) -> u64 {
        self.sweep(Side::Buy, &participant, quantity)
    }

    /// Sell up to `quantity` at resting prices. Returns the filled volume.
    pub fn market_sell(&self, participant: Arc<dyn Participant>, quantity: u64) -> u64 {
        self.sweep(Side::Sell, &participant, quantity)
    }

    fn sweep(&self, side: Side, participant: &Arc<dyn Participant>, quantity: u64) -> u64 {
        let (outcome, summary) = {
            let mut state = self.state.lock();
            let outcome = match side {
                Side::Buy => engine::market_buy(&mut state, participant, quantity),
                Side::Sell => engine::market_sell(&mut state, participant, quantity),
            };
            let summary = (!outcome.is_empty()).then(|| BookSummary::of(&state));
            (outcome, summary)
        };
        let filled = outcome.taker_volume;
        self.publish(outcome, summary);
        filled
    }

    pub fn submit_fok_buy_order(&self, price: Decimal, quantity: u64, participant: Arc<dyn Participant>) -> bool {
        self.try_fill_or_kill(Side::Buy, price, quantity, participant).is_ok()
    }

    pub fn submit_fok_sell_order(&self, price: Decimal, quantity: u64, participant: Arc<dyn Participant>) -> bool {
        self.try_fill_or_kill(Side::Sell, price, quantity, participant).is_ok()
    }

    /// Fill-or-kill with the rejection reason. On `Err` nothing changed.
    pub fn try_fill_or_kill(
        &self,
        side: Side,
        price: Decimal,
        quantity: u64,
        participant: Arc<dyn Participant>,
    ) -> Result<u64, SubmitError> {
        let (outcome, summary) = {
            let mut state = self.state.lock();
            let outcome = engine::fill_or_kill(&mut state, side, &participant, price, quantity)?;
            (outcome, BookSummary::of(&state))
        };
        let filled = outcome.taker_volume;
        self.publish(outcome, Some(summary));
        Ok(filled)
    }

    // ========================================================================
    // Cancellation
    // ========================================================================

    /// Cancel a resting order and release its reservation.
    ///
    /// Returns false if the order is not on the book, which includes orders
    /// that already filled or were cancelled before.
    pub fn cancel_order(&self, order_id: OrderId) -> bool {
        let summary = {
            let mut state = self.state.lock();
            let Some(order) = state.remove_by_id(order_id) else {
                debug!(order_id = %order_id, "cancel target not on book");
                return false;
            };
            let owner = order.owner();
            match order.side() {
                Side::Buy => {
                    if let Some(refund) = notional(order.price(), order.volume()) {
                        engine::credit_funds(owner.as_ref(), refund);
                    }
                }
                Side::Sell => engine::credit_shares(owner.as_ref(), order.volume()),
            }
            debug!(order_id = %order_id, side = %order.side(), volume = order.volume(), "order cancelled");
            BookSummary::of(&state)
        };
        self.emit(&[BookEvent::BookChanged(summary)]);
        true
    }

    // ========================================================================
    // Matching
    // ========================================================================

    /// Run the crossing loop to exhaustion.
    ///
    /// Always notifies a book change afterwards, even if nothing traded.
    pub fn process_orders(&self) -> MatchReceipt {
        let (outcome, receipt, summary) = {
            let mut state = self.state.lock();
            let outcome = engine::process_orders(&mut state, &self.config);
            let receipt = MatchReceipt::new(
                state.next_pass_id(),
                outcome.trades.len() as u64,
                outcome.volume(),
                state.state_root(),
            );
            (outcome, receipt, BookSummary::of(&state))
        };
        debug!(
            pass_id = receipt.pass_id,
            trades = receipt.trades_executed,
            volume = receipt.volume_executed,
            "match pass complete"
        );
        self.publish(outcome, Some(summary));
        receipt
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get_top_buy_orders(&self, n: usize) -> Vec<OrderView> {
        let state = self.state.lock();
        state.bids_in_priority().take(n).map(|(_, o)| o.into()).collect()
    }

    pub fn get_top_sell_orders(&self, n: usize) -> Vec<OrderView> {
        let state = self.state.lock();
        state.asks_in_priority().take(n).map(|(_, o)| o.into()).collect()
    }

    /// Bid volume a seller could hit at `price` or better (bids priced `>= price`).
    pub fn get_available_buy_volume(&self, price: Decimal) -> u64 {
        self.state.lock().bid_volume_at_or_above(price)
    }

    /// Ask volume a buyer could lift at `price` or better (asks priced `<= price`).
    pub fn get_available_sell_volume(&self, price: Decimal) -> u64 {
        self.state.lock().ask_volume_at_or_below(price)
    }

    pub fn get_buy_orders_by_type(&self, kind: ParticipantKind) -> Vec<OrderView> {
        let state = self.state.lock();
        state.orders_by_kind(Side::Buy, kind).into_iter().map(OrderView::from).collect()
    }

    pub fn get_sell_orders_by_type(&self, kind: ParticipantKind) -> Vec<OrderView> {
        let state = self.state.lock();
        state.orders_by_kind(Side::Sell, kind).into_iter().map(OrderView::from).collect()
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.state.lock().best_bid()
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.state.lock().best_ask()
    }

    pub fn spread(&self) -> Option<Decimal> {
        self.state.lock().spread()
    }

    pub fn last_price(&self) -> Decimal {
        self.state.lock().last_price()
    }

    pub fn symbol(&self) -> String {
        self.state.lock().stock().symbol().to_string()
    }

    /// `(price, volume)` for the best `n` levels of a side.
    pub fn depth(&self, side: Side, n: usize) -> Vec<(Decimal, u64)> {
        self.state.lock().depth(side, n)
    }

    pub fn bid_count(&self) -> usize {
        self.state.lock().bid_count()
    }

    pub fn ask_count(&self) -> usize {
        self.state.lock().ask_count()
    }

    pub fn contains_order(&self, order_id: OrderId) -> bool {
        self.state.lock().contains_order(order_id)
    }

    /// Funds frozen by resting bids, or `None` if the sum overflows.
    pub fn reserved_funds(&self) -> Option<Decimal> {
        self.state.lock().reserved_funds()
    }

    /// Shares frozen by resting asks.
    pub fn reserved_shares(&self) -> u64 {
        self.state.lock().reserved_shares()
    }

    pub fn summary(&self) -> BookSummary {
        BookSummary::of(&self.state.lock())
    }

    /// Digest of the resting orders and last price.
    pub fn state_root(&self) -> [u8; 32] {
        self.state.lock().state_root()
    }

    pub fn state_root_hex(&self) -> String {
        hex::encode(self.state_root())
    }
}
