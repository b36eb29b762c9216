//! Unlocked book state.
//!
//! ## Architecture
//!
//! - **Slab**: arena that owns every resting `Order`
//! - **BTreeMap**: one `PriceLevel` per price, sorted for best bid/ask lookup
//! - **HashMap**: order id to slab key for O(1) cancel
//!
//! ## Price Ordering
//!
//! - **Bids**: high-to-low, keyed by `Reverse(price)`
//! - **Asks**: low-to-high
//!
//! Within a level orders are FIFO, so walking a side yields strict
//! price-then-time priority.
//!
//! `BookState` has no lock of its own; [`OrderBook`](crate::OrderBook) wraps
//! it in one mutex and the engine passes operate on `&mut BookState`.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use slab::Slab;
use ssz_rs::prelude::*;
use tracing::warn;

use crate::orderbook::{OrderNode, PriceLevel};
use crate::participant::ParticipantKind;
use crate::types::price::{notional, to_fixed};
use crate::types::{MatchReceipt, Order, OrderId, Side, Stock};

/// Fixed-size digest record for one resting order.
///
/// Ids and timestamps are left out so that two books built from the same
/// decisions hash equal regardless of process-wide id counters.
#[derive(Debug, Clone, PartialEq, Eq, Default, SimpleSerialize)]
struct OrderRecord {
    side: u8,
    price: u64,
    volume: u64,
    flags: u8,
}

/// Book contents without synchronization.
#[derive(Debug)]
pub struct BookState {
    /// Arena order storage
    orders: Slab<OrderNode>,

    /// Bid price levels (sorted high to low)
    bids: BTreeMap<Reverse<Decimal>, PriceLevel>,

    /// Ask price levels (sorted low to high)
    asks: BTreeMap<Decimal, PriceLevel>,

    /// Order id to slab key mapping
    order_index: HashMap<OrderId, usize>,

    stock: Stock,

    next_trade_id: u64,

    next_pass_id: u64,

    bid_count: usize,

    ask_count: usize,
}

impl BookState {
    pub fn with_capacity(stock: Stock, order_capacity: usize) -> Self {
        Self {
            orders: Slab::with_capacity(order_capacity),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            order_index: HashMap::with_capacity(order_capacity),
            stock,
            next_trade_id: 1,
            next_pass_id: 1,
            bid_count: 0,
            ask_count: 0,
        }
    }

    // ========================================================================
    // Capacity and Size
    // ========================================================================

    #[inline]
    pub fn capacity(&self) -> usize {
        self.orders.capacity()
    }

    #[inline]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    #[inline]
    pub fn bid_count(&self) -> usize {
        self.bid_count
    }

    #[inline]
    pub fn ask_count(&self) -> usize {
        self.ask_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    #[inline]
    pub fn bid_levels(&self) -> usize {
        self.bids.len()
    }

    #[inline]
    pub fn ask_levels(&self) -> usize {
        self.asks.len()
    }

    // ========================================================================
    // Order Management
    // ========================================================================

    /// Rest an order on its side.
    ///
    /// An order at an occupied price joins the back of that level's queue.
    /// Returns the slab key. The id must not already be resting; the submit
    /// path checks this before anything is reserved.
    pub fn insert(&mut self, order: Order) -> usize {
        let order_id = order.id();
        let price = order.price();
        let side = order.side();
        debug_assert!(
            !self.order_index.contains_key(&order_id),
            "order {order_id} inserted twice"
        );

        let key = self.orders.insert(OrderNode::new(order));
        self.order_index.insert(order_id, key);

        match side {
            Side::Buy => {
                let level = self
                    .bids
                    .entry(Reverse(price))
                    .or_insert_with(|| PriceLevel::new(price));
                level.push_back(key, &mut self.orders);
                self.bid_count += 1;
            }
            Side::Sell => {
                let level = self
                    .asks
                    .entry(price)
                    .or_insert_with(|| PriceLevel::new(price));
                level.push_back(key, &mut self.orders);
                self.ask_count += 1;
            }
        }

        key
    }

    /// Take an order off the book by slab key.
    pub fn remove(&mut self, key: usize) -> Option<Order> {
        let node = self.orders.get(key)?;
        let order_id = node.order_id();
        let price = node.price();
        let side = node.order.side();

        match side {
            Side::Buy => {
                if let Some(level) = self.bids.get_mut(&Reverse(price)) {
                    level.remove(key, &mut self.orders);
                    self.bid_count = self.bid_count.saturating_sub(1);
                    if level.is_empty() {
                        self.bids.remove(&Reverse(price));
                    }
                }
            }
            Side::Sell => {
                if let Some(level) = self.asks.get_mut(&price) {
                    level.remove(key, &mut self.orders);
                    self.ask_count = self.ask_count.saturating_sub(1);
                    if level.is_empty() {
                        self.asks.remove(&price);
                    }
                }
            }
        }

        self.order_index.remove(&order_id);
        Some(self.orders.remove(key).order)
    }

    /// Take an order off the book by id.
    pub fn remove_by_id(&mut self, order_id: OrderId) -> Option<Order> {
        let key = *self.order_index.get(&order_id)?;
        self.remove(key)
    }

    /// Reduce a resting order by `volume`, removing it once it reaches zero.
    ///
    /// Returns the volume actually filled.
    pub fn fill(&mut self, key: usize, volume: u64) -> u64 {
        let Some(node) = self.orders.get_mut(key) else {
            return 0;
        };
        let filled = node.fill(volume);
        let (side, price, done) = (node.order.side(), node.price(), node.is_filled());

        let level = match side {
            Side::Buy => self.bids.get_mut(&Reverse(price)),
            Side::Sell => self.asks.get_mut(&price),
        };
        if let Some(level) = level {
            level.reduce_volume(filled);
        }

        if done {
            self.remove(key);
        }
        filled
    }

    #[inline]
    pub fn get(&self, key: usize) -> Option<&Order> {
        self.orders.get(key).map(|node| &node.order)
    }

    #[inline]
    pub fn key_of(&self, order_id: OrderId) -> Option<usize> {
        self.order_index.get(&order_id).copied()
    }

    #[inline]
    pub fn contains_order(&self, order_id: OrderId) -> bool {
        self.order_index.contains_key(&order_id)
    }

    // ========================================================================
    // Priority walks
    // ========================================================================

    /// Bids in priority order: price descending, then submission time.
    pub fn bids_in_priority(&self) -> impl Iterator<Item = (usize, &Order)> + '_ {
        self.bids
            .values()
            .flat_map(|level| level.iter(&self.orders))
            .map(|(key, node)| (key, &node.order))
    }

    /// Asks in priority order: price ascending, then submission time.
    pub fn asks_in_priority(&self) -> impl Iterator<Item = (usize, &Order)> + '_ {
        self.asks
            .values()
            .flat_map(|level| level.iter(&self.orders))
            .map(|(key, node)| (key, &node.order))
    }

    /// One side in priority order.
    pub fn side_in_priority(&self, side: Side) -> Box<dyn Iterator<Item = (usize, &Order)> + '_> {
        match side {
            Side::Buy => Box::new(self.bids_in_priority()),
            Side::Sell => Box::new(self.asks_in_priority()),
        }
    }

    /// Resting orders of one participant type, in priority order.
    pub fn orders_by_kind(&self, side: Side, kind: ParticipantKind) -> Vec<&Order> {
        self.side_in_priority(side)
            .filter(|(_, order)| order.owner_kind() == kind)
            .map(|(_, order)| order)
            .collect()
    }

    /// Per-level `(price, total volume)` for the best `n` levels of a side.
    pub fn depth(&self, side: Side, n: usize) -> Vec<(Decimal, u64)> {
        match side {
            Side::Buy => self
                .bids
                .values()
                .take(n)
                .map(|level| (level.price, level.total_volume))
                .collect(),
            Side::Sell => self
                .asks
                .values()
                .take(n)
                .map(|level| (level.price, level.total_volume))
                .collect(),
        }
    }

    /// Bid volume priced at or above `price`.
    pub fn bid_volume_at_or_above(&self, price: Decimal) -> u64 {
        self.bids
            .values()
            .take_while(|level| level.price >= price)
            .map(|level| level.total_volume)
            .sum()
    }

    /// Ask volume priced at or below `price`.
    pub fn ask_volume_at_or_below(&self, price: Decimal) -> u64 {
        self.asks
            .range(..=price)
            .map(|(_, level)| level.total_volume)
            .sum()
    }

    // ========================================================================
    // Best Bid/Ask
    // ========================================================================

    #[inline]
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next().map(|r| r.0)
    }

    #[inline]
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    /// `best_ask - best_bid`, or None if either side is empty
    pub fn spread(&self) -> Option<Decimal> {
        Some(self.best_ask()? - self.best_bid()?)
    }

    // ========================================================================
    // Instrument and counters
    // ========================================================================

    #[inline]
    pub fn last_price(&self) -> Decimal {
        self.stock.last_price()
    }

    #[inline]
    pub fn stock(&self) -> &Stock {
        &self.stock
    }

    /// Record an execution price on the instrument.
    pub fn record_trade(&mut self, price: Decimal) {
        self.stock.record_trade(price);
    }

    #[inline]
    pub fn next_trade_id(&mut self) -> u64 {
        let id = self.next_trade_id;
        self.next_trade_id += 1;
        id
    }

    #[inline]
    pub fn next_pass_id(&mut self) -> u64 {
        let id = self.next_pass_id;
        self.next_pass_id += 1;
        id
    }

    // ========================================================================
    // Reservations
    // ========================================================================

    /// Funds frozen by resting bids.
    pub fn reserved_funds(&self) -> Option<Decimal> {
        let total = self.bids_in_priority().try_fold(Decimal::ZERO, |total, (_, order)| {
            notional(order.price(), order.volume()).and_then(|cost| total.checked_add(cost))
        });
        if total.is_none() {
            warn!(bids = self.bid_count, "reserved funds overflow");
        }
        total
    }

    /// Shares frozen by resting asks.
    pub fn reserved_shares(&self) -> u64 {
        self.asks.values().map(|level| level.total_volume).sum()
    }

    // ========================================================================
    // State digest
    // ========================================================================

    /// SHA-256 over the SSZ encoding of every resting order in priority
    /// order (bids, then asks) followed by the last price.
    pub fn state_root(&self) -> [u8; 32] {
        let mut bytes = Vec::with_capacity(self.orders.len() * 18 + 8);

        for (_, order) in self.bids_in_priority().chain(self.asks_in_priority()) {
            let record = OrderRecord {
                side: order.side().to_u8(),
                price: to_fixed(order.price()).unwrap_or(u64::MAX),
                volume: order.volume(),
                flags: order.flags().to_u8(),
            };
            match ssz_rs::serialize(&record) {
                Ok(encoded) => bytes.extend_from_slice(&encoded),
                Err(err) => warn!(order_id = %order.id(), ?err, "failed to encode order for digest"),
            }
        }
        let last = to_fixed(self.last_price()).unwrap_or(u64::MAX);
        bytes.extend_from_slice(&last.to_le_bytes());

        MatchReceipt::compute_hash(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::account::Account;
    use crate::participant::{Participant, Trader};

    fn trader(kind: ParticipantKind) -> Arc<dyn Participant> {
        Arc::new(Trader::new(kind, Account::new(Decimal::from(100_000), 1_000).unwrap()))
    }

    fn state() -> BookState {
        BookState::with_capacity(Stock::new("TEST", Decimal::from(10)).unwrap(), 100)
    }

    fn buy(price: i64, volume: u64) -> Order {
        Order::limit(Side::Buy, Decimal::from(price), volume, trader(ParticipantKind::Noise)).unwrap()
    }

    fn sell(price: i64, volume: u64) -> Order {
        Order::limit(Side::Sell, Decimal::from(price), volume, trader(ParticipantKind::Value)).unwrap()
    }

    #[test]
    fn test_state_new() {
        let book = state();

        assert!(book.is_empty());
        assert!(book.capacity() >= 100);
        assert!(book.best_bid().is_none());
        assert!(book.best_ask().is_none());
        assert!(book.spread().is_none());
        assert_eq!(book.last_price(), Decimal::from(10));
    }

    #[test]
    fn test_bid_and_ask_priority() {
        let mut book = state();

        book.insert(buy(9, 10));
        book.insert(buy(11, 10));
        book.insert(buy(10, 10));
        book.insert(sell(14, 10));
        book.insert(sell(12, 10));

        assert_eq!(book.best_bid(), Some(Decimal::from(11)));
        assert_eq!(book.best_ask(), Some(Decimal::from(12)));
        assert_eq!(book.spread(), Some(Decimal::from(1)));
        assert_eq!(book.bid_levels(), 3);

        let prices: Vec<_> = book.bids_in_priority().map(|(_, o)| o.price()).collect();
        assert_eq!(prices, vec![Decimal::from(11), Decimal::from(10), Decimal::from(9)]);
    }

    #[test]
    fn test_same_price_shares_one_level() {
        let mut book = state();

        let first = buy(10, 100);
        let first_id = first.id();
        book.insert(first);
        book.insert(buy(10, 200));

        assert_eq!(book.bid_count(), 2);
        assert_eq!(book.bid_levels(), 1);
        assert_eq!(book.depth(Side::Buy, 5), vec![(Decimal::from(10), 300)]);

        // Earlier order keeps time priority
        let (_, head) = book.bids_in_priority().next().unwrap();
        assert_eq!(head.id(), first_id);
    }

    #[test]
    fn test_remove_by_id_cleans_level() {
        let mut book = state();

        let order = buy(10, 100);
        let id = order.id();
        book.insert(order);
        book.insert(buy(9, 100));

        assert!(book.contains_order(id));
        let removed = book.remove_by_id(id).unwrap();
        assert_eq!(removed.volume(), 100);
        assert!(!book.contains_order(id));
        assert_eq!(book.bid_levels(), 1);
        assert_eq!(book.best_bid(), Some(Decimal::from(9)));

        assert!(book.remove_by_id(id).is_none());
    }

    #[test]
    fn test_fill_partial_then_complete() {
        let mut book = state();

        let key = book.insert(sell(12, 100));

        assert_eq!(book.fill(key, 40), 40);
        assert_eq!(book.get(key).unwrap().volume(), 60);
        assert_eq!(book.depth(Side::Sell, 1), vec![(Decimal::from(12), 60)]);

        assert_eq!(book.fill(key, 100), 60);
        assert!(book.get(key).is_none());
        assert_eq!(book.ask_count(), 0);
        assert_eq!(book.ask_levels(), 0);
    }

    #[test]
    fn test_volume_queries() {
        let mut book = state();

        book.insert(buy(10, 5));
        book.insert(buy(9, 7));
        book.insert(sell(11, 3));
        book.insert(sell(12, 4));

        assert_eq!(book.bid_volume_at_or_above(Decimal::from(9)), 12);
        assert_eq!(book.bid_volume_at_or_above(Decimal::from(10)), 5);
        assert_eq!(book.ask_volume_at_or_below(Decimal::from(11)), 3);
        assert_eq!(book.ask_volume_at_or_below(Decimal::from(20)), 7);
    }

    #[test]
    fn test_reservations() {
        let mut book = state();

        book.insert(buy(10, 5));
        book.insert(buy(9, 2));
        book.insert(sell(11, 3));

        assert_eq!(book.reserved_funds(), Some(Decimal::from(68)));
        assert_eq!(book.reserved_shares(), 3);
    }

    #[test]
    fn test_reserved_funds_overflow_is_none() {
        let mut book = state();
        let owner = trader(ParticipantKind::Noise);

        book.insert(Order::limit(Side::Buy, Decimal::MAX, 1, owner.clone()).unwrap());
        assert_eq!(book.reserved_funds(), Some(Decimal::MAX));

        book.insert(Order::limit(Side::Buy, Decimal::MAX, 1, owner).unwrap());
        assert_eq!(book.reserved_funds(), None);
    }

    #[test]
    fn test_reserved_funds_single_order_overflow_is_none() {
        let mut book = state();

        book.insert(Order::limit(Side::Buy, Decimal::MAX, 2, trader(ParticipantKind::Noise)).unwrap());
        assert_eq!(book.reserved_funds(), None);
    }

    #[test]
    fn test_orders_by_kind() {
        let mut book = state();

        book.insert(buy(10, 5));
        book.insert(sell(11, 3));

        assert_eq!(book.orders_by_kind(Side::Buy, ParticipantKind::Noise).len(), 1);
        assert!(book.orders_by_kind(Side::Buy, ParticipantKind::Value).is_empty());
        assert_eq!(book.orders_by_kind(Side::Sell, ParticipantKind::Value).len(), 1);
    }

    #[test]
    fn test_state_root_ignores_ids() {
        let mut a = state();
        let mut b = state();

        a.insert(buy(10, 5));
        b.insert(buy(10, 5));
        assert_eq!(a.state_root(), b.state_root());

        b.insert(sell(11, 1));
        assert_ne!(a.state_root(), b.state_root());
    }

    #[test]
    fn test_state_root_tracks_last_price() {
        let mut book = state();
        let before = book.state_root();

        book.record_trade(Decimal::from(11));
        assert_ne!(book.state_root(), before);
    }

    #[test]
    fn test_counters() {
        let mut book = state();
        assert_eq!(book.next_trade_id(), 1);
        assert_eq!(book.next_trade_id(), 2);
        assert_eq!(book.next_pass_id(), 1);
    }
}
