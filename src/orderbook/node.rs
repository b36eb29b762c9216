//! Order node for slab-based storage.
//!
//! ## Design
//!
//! `OrderNode` wraps an `Order` with doubly-linked list pointers so an order
//! can be unlinked from its price level in O(1) given its slab key.
//!
//! ## Linked List
//!
//! Orders at the same price level form a doubly-linked list:
//! - `next`: the next (newer) order in the price level
//! - `prev`: the previous (older) order in the price level

use rust_decimal::Decimal;

use crate::types::{Order, OrderId};

/// Order node stored in the slab.
///
/// The pointers are slab keys (`usize`), not references. Participants never
/// see a node; they hold only the [`OrderId`] returned at submission.
#[derive(Debug)]
pub struct OrderNode {
    /// The resting order
    pub order: Order,

    /// Next order in the price level queue (slab key)
    /// None if this is the tail (newest order)
    pub next: Option<usize>,

    /// Previous order in the price level queue (slab key)
    /// None if this is the head (oldest order)
    pub prev: Option<usize>,
}

impl OrderNode {
    /// Create a new, unlinked order node
    #[inline]
    pub fn new(order: Order) -> Self {
        Self {
            order,
            next: None,
            prev: None,
        }
    }

    /// Check if this node is unlinked (not part of any price level)
    #[inline]
    pub fn is_unlinked(&self) -> bool {
        self.next.is_none() && self.prev.is_none()
    }

    #[inline]
    pub fn order_id(&self) -> OrderId {
        self.order.id()
    }

    #[inline]
    pub fn price(&self) -> Decimal {
        self.order.price()
    }

    /// Remaining volume
    #[inline]
    pub fn volume(&self) -> u64 {
        self.order.volume()
    }

    /// Fill a portion of this order
    ///
    /// # Returns
    ///
    /// The volume actually filled (may be less than requested)
    #[inline]
    pub fn fill(&mut self, volume: u64) -> u64 {
        self.order.reduce_volume_by(volume)
    }

    #[inline]
    pub fn is_filled(&self) -> bool {
        self.order.is_filled()
    }
}
