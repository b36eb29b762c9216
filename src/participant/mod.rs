//! Market participants.
//!
//! ## Capability set
//!
//! The book needs exactly three things from whoever owns an order, expressed
//! by [`Participant`]:
//!
//! - an [`Account`] it can reserve from and settle into
//! - a fill callback ([`Participant::on_filled`])
//! - a type tag ([`ParticipantKind`]) for per-type queries
//!
//! [`Trader`] is the participant every strategy uses. The closed set of
//! strategies lives in [`strategies`]; each drives a `Trader` through the
//! book's public operations only and is scheduled by implementing [`Agent`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::account::Account;
use crate::orderbook::OrderBook;
use crate::types::{OrderId, Side};

mod trader;
pub mod strategies;

pub use trader::Trader;

static NEXT_PARTICIPANT_ID: AtomicU64 = AtomicU64::new(1);

/// Participant identifier, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(pub u64);

impl ParticipantId {
    pub fn next() -> Self {
        Self(NEXT_PARTICIPANT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Participant type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipantKind {
    MarketMaker,
    Momentum,
    Value,
    Noise,
    Human,
}

impl ParticipantKind {
    pub const ALL: [ParticipantKind; 5] = [
        ParticipantKind::MarketMaker,
        ParticipantKind::Momentum,
        ParticipantKind::Value,
        ParticipantKind::Noise,
        ParticipantKind::Human,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ParticipantKind::MarketMaker => "market_maker",
            ParticipantKind::Momentum => "momentum",
            ParticipantKind::Value => "value",
            ParticipantKind::Noise => "noise",
            ParticipantKind::Human => "human",
        }
    }
}

impl fmt::Display for ParticipantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fill notification delivered to an order's owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    pub side: Side,
    pub volume: u64,
    pub price: Decimal,
    /// The owner's resting order, `None` when the owner was the taker
    pub order_id: Option<OrderId>,
}

/// What the order book requires of an order owner.
///
/// The book locks [`Participant::account`] only while it mutates the
/// balance and never calls back into a participant while holding its own lock.
pub trait Participant: Send + Sync {
    fn id(&self) -> ParticipantId;

    fn kind(&self) -> ParticipantKind;

    fn account(&self) -> &Mutex<Account>;

    /// Called once per executed fill, after the book has settled.
    fn on_filled(&self, fill: &Fill);
}

/// Decision logic run by the driver once per tick.
///
/// Implementations talk to the book only through its public operations and
/// must not hold their account lock while calling into it.
pub trait Agent: Send {
    fn trader(&self) -> &Arc<Trader>;

    fn on_tick(&mut self, book: &OrderBook, tick: u64);

    fn kind(&self) -> ParticipantKind {
        self.trader().kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_ids_unique() {
        let a = ParticipantId::next();
        let b = ParticipantId::next();
        assert_ne!(a, b);
        assert_eq!(format!("{}", ParticipantId(7)), "P7");
    }

    #[test]
    fn test_kind_names() {
        let names: Vec<_> = ParticipantKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, ["market_maker", "momentum", "value", "noise", "human"]);
    }
}
