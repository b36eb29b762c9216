//! Trade record for one executed fill.

use rust_decimal::Decimal;

use crate::participant::ParticipantId;
use crate::types::OrderId;

/// A single execution between a buyer and a seller.
///
/// ## Price
///
/// Crossing resting orders execute at the ask price. Market and fill-or-kill
/// takers execute at the resting order's price. A taker has no resting order,
/// so its side of the record carries `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    /// Engine-assigned trade identifier
    pub id: u64,

    /// Resting bid that filled, `None` if the buyer was a taker
    pub bid_order_id: Option<OrderId>,

    /// Resting ask that filled, `None` if the seller was a taker
    pub ask_order_id: Option<OrderId>,

    pub buyer: ParticipantId,
    pub seller: ParticipantId,

    /// Execution price
    pub price: Decimal,

    /// Executed volume
    pub volume: u64,

    /// Monotonic execution time in nanoseconds
    pub timestamp: u64,
}

impl Trade {
    /// Notional value of this trade (price × volume)
    pub fn notional(&self) -> Decimal {
        self.price * Decimal::from(self.volume)
    }
}
