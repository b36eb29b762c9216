//! Price level management for orders at the same price.
//!
//! ## Design
//!
//! A `PriceLevel` is the single node a side keeps for one price. Orders that
//! land on an occupied price join its FIFO queue instead of creating a new
//! entry, so the earlier order keeps time priority while every order keeps its
//! own id, owner and remaining volume.
//!
//! ## Queue Structure
//!
//! ```text
//! head (oldest) <-> order2 <-> order3 <-> tail (newest)
//! ```
//!
//! - New orders are appended at the tail
//! - Matching consumes orders from the head
//! - Any order can be removed in O(1) using the slab key

use rust_decimal::Decimal;
use slab::Slab;

use crate::orderbook::OrderNode;

/// A price level containing orders at a single price.
///
/// The order data lives in the slab; this struct only holds queue metadata.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    /// Price for this level
    pub price: Decimal,

    /// Total remaining volume at this level
    pub total_volume: u64,

    /// Head of the order queue (oldest order, slab key)
    pub head: Option<usize>,

    /// Tail of the order queue (newest order, slab key)
    pub tail: Option<usize>,

    /// Number of orders at this price level
    pub order_count: usize,
}

impl PriceLevel {
    pub fn new(price: Decimal) -> Self {
        Self {
            price,
            total_volume: 0,
            head: None,
            tail: None,
            order_count: 0,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order_count == 0
    }

    /// Append an order to the tail of the queue.
    ///
    /// Returns false, leaving the level untouched, if `key` is not in the slab.
    pub fn push_back(&mut self, key: usize, slab: &mut Slab<OrderNode>) -> bool {
        let tail = self.tail;
        let Some(node) = slab.get_mut(key) else {
            return false;
        };
        let volume = node.volume();
        node.prev = tail;
        node.next = None;

        match tail.and_then(|tail_key| slab.get_mut(tail_key)) {
            Some(tail_node) => tail_node.next = Some(key),
            None => self.head = Some(key),
        }

        self.tail = Some(key);
        self.order_count += 1;
        self.total_volume = self.total_volume.saturating_add(volume);
        true
    }

    /// Unlink an order from the queue by slab key.
    ///
    /// # Returns
    ///
    /// The remaining volume of the removed order, or `None` if `key` is unknown
    pub fn remove(&mut self, key: usize, slab: &mut Slab<OrderNode>) -> Option<u64> {
        let node = slab.get_mut(key)?;
        let volume = node.volume();
        let prev_key = node.prev.take();
        let next_key = node.next.take();

        match prev_key.and_then(|prev| slab.get_mut(prev)) {
            Some(prev_node) => prev_node.next = next_key,
            None => self.head = next_key,
        }

        match next_key.and_then(|next| slab.get_mut(next)) {
            Some(next_node) => next_node.prev = prev_key,
            None => self.tail = prev_key,
        }

        self.order_count = self.order_count.saturating_sub(1);
        self.total_volume = self.total_volume.saturating_sub(volume);

        Some(volume)
    }

    /// The head order's slab key, the first to be matched at this price.
    #[inline]
    pub fn peek_head(&self) -> Option<usize> {
        self.head
    }

    /// Update the total volume after a partial fill
    pub fn reduce_volume(&mut self, filled: u64) {
        self.total_volume = self.total_volume.saturating_sub(filled);
    }

    /// Walk the queue head to tail.
    pub fn iter<'a>(&self, slab: &'a Slab<OrderNode>) -> LevelIter<'a> {
        LevelIter {
            slab,
            cursor: self.head,
        }
    }
}

/// FIFO iterator over one level, yielding `(slab key, node)`.
pub struct LevelIter<'a> {
    slab: &'a Slab<OrderNode>,
    cursor: Option<usize>,
}

impl<'a> Iterator for LevelIter<'a> {
    type Item = (usize, &'a OrderNode);

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.cursor?;
        let node = self.slab.get(key)?;
        self.cursor = node.next;
        Some((key, node))
    }
}
