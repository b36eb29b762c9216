//! Order value type.
//!
//! An order is immutable after construction except for its remaining volume
//! (reduced as it fills) and its price, which the submit path rewrites once
//! to the book-adjusted price.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use rust_decimal::Decimal;

use crate::error::OrderError;
use crate::participant::{Participant, ParticipantId, ParticipantKind};

static NEXT_ORDER_ID: AtomicU64 = AtomicU64::new(1);
static CLOCK_EPOCH: OnceLock<Instant> = OnceLock::new();

/// Nanoseconds on a process-wide monotonic clock.
pub fn monotonic_nanos() -> u64 {
    let epoch = CLOCK_EPOCH.get_or_init(Instant::now);
    u64::try_from(epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

// ============================================================================
// Side enum
// ============================================================================

/// Order side: Buy or Sell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Side {
    /// Buy order (bid)
    #[default]
    Buy,
    /// Sell order (ask)
    Sell,
}

impl Side {
    /// Convert to u8 for serialization
    pub fn to_u8(self) -> u8 {
        match self {
            Side::Buy => 0,
            Side::Sell => 1,
        }
    }

    /// Convert from u8 for deserialization
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Side::Buy),
            1 => Some(Side::Sell),
            _ => None,
        }
    }

    /// Returns the opposite side
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl FromStr for Side {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "bid" => Ok(Side::Buy),
            "sell" | "ask" => Ok(Side::Sell),
            _ => Err(OrderError::InvalidSide(s.to_string())),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("buy"),
            Side::Sell => f.write_str("sell"),
        }
    }
}

// ============================================================================
// Identifiers and flags
// ============================================================================

/// Unique order identifier, assigned at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderId(pub u64);

impl OrderId {
    fn next() -> Self {
        Self(NEXT_ORDER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Execution style flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OrderFlags {
    /// Execute immediately against resting liquidity; never rests
    pub market: bool,
    /// Execute in full immediately or not at all
    pub fill_or_kill: bool,
}

impl OrderFlags {
    pub const LIMIT: Self = Self { market: false, fill_or_kill: false };
    pub const MARKET: Self = Self { market: true, fill_or_kill: false };
    pub const FILL_OR_KILL: Self = Self { market: false, fill_or_kill: true };

    #[inline]
    pub fn is_limit(self) -> bool {
        !self.market && !self.fill_or_kill
    }

    pub fn to_u8(self) -> u8 {
        u8::from(self.market) | (u8::from(self.fill_or_kill) << 1)
    }
}

// ============================================================================
// Order struct
// ============================================================================

/// One trading intent owned by a participant.
///
/// The owner is a shared reference; the order never owns its participant.
///
/// ## Example
///
/// ```
/// use std::sync::Arc;
/// use bourse::{Account, Order, ParticipantKind, Side, Trader};
/// use rust_decimal::Decimal;
///
/// let trader = Arc::new(Trader::new(
///     ParticipantKind::Human,
///     Account::new(Decimal::from(1_000), 0).unwrap(),
/// ));
/// let order = Order::limit(Side::Buy, Decimal::from(10), 100, trader).unwrap();
///
/// assert_eq!(order.side(), Side::Buy);
/// assert_eq!(order.volume(), 100);
/// ```
///
/// Orders are deliberately not `Clone`. Each one owns a process-unique id.
pub struct Order {
    id: OrderId,
    side: Side,
    price: Decimal,
    volume: u64,
    owner: Arc<dyn Participant>,
    submitted_at: u64,
    flags: OrderFlags,
}

impl Order {
    /// Create an order, validating the construction contract.
    ///
    /// Volume must be positive; limit and fill-or-kill prices must be positive.
    /// The price of a market order is ignored and stored as zero.
    pub fn new(
        side: Side,
        price: Decimal,
        volume: u64,
        owner: Arc<dyn Participant>,
        flags: OrderFlags,
    ) -> Result<Self, OrderError> {
        if volume == 0 {
            return Err(OrderError::ZeroVolume);
        }
        let price = if flags.market {
            Decimal::ZERO
        } else if price <= Decimal::ZERO {
            return Err(OrderError::NonPositivePrice(price));
        } else {
            price
        };

        Ok(Self {
            id: OrderId::next(),
            side,
            price,
            volume,
            owner,
            submitted_at: monotonic_nanos(),
            flags,
        })
    }

    /// Create an order from a textual side ("buy"/"sell").
    pub fn parse(
        side: &str,
        price: Decimal,
        volume: u64,
        owner: Arc<dyn Participant>,
        flags: OrderFlags,
    ) -> Result<Self, OrderError> {
        Self::new(side.parse()?, price, volume, owner, flags)
    }

    pub fn limit(
        side: Side,
        price: Decimal,
        volume: u64,
        owner: Arc<dyn Participant>,
    ) -> Result<Self, OrderError> {
        Self::new(side, price, volume, owner, OrderFlags::LIMIT)
    }

    pub fn market(side: Side, volume: u64, owner: Arc<dyn Participant>) -> Result<Self, OrderError> {
        Self::new(side, Decimal::ZERO, volume, owner, OrderFlags::MARKET)
    }

    pub fn fill_or_kill(
        side: Side,
        price: Decimal,
        volume: u64,
        owner: Arc<dyn Participant>,
    ) -> Result<Self, OrderError> {
        Self::new(side, price, volume, owner, OrderFlags::FILL_OR_KILL)
    }

    #[inline]
    pub fn id(&self) -> OrderId {
        self.id
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    #[inline]
    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Remaining volume
    #[inline]
    pub fn volume(&self) -> u64 {
        self.volume
    }

    #[inline]
    pub fn owner(&self) -> &Arc<dyn Participant> {
        &self.owner
    }

    #[inline]
    pub fn owner_id(&self) -> ParticipantId {
        self.owner.id()
    }

    #[inline]
    pub fn owner_kind(&self) -> ParticipantKind {
        self.owner.kind()
    }

    #[inline]
    pub fn submitted_at(&self) -> u64 {
        self.submitted_at
    }

    #[inline]
    pub fn flags(&self) -> OrderFlags {
        self.flags
    }

    #[inline]
    pub fn is_market_order(&self) -> bool {
        self.flags.market
    }

    #[inline]
    pub fn is_fill_or_kill(&self) -> bool {
        self.flags.fill_or_kill
    }

    #[inline]
    pub fn is_filled(&self) -> bool {
        self.volume == 0
    }

    /// Reduce remaining volume, flooring at zero.
    ///
    /// Returns the volume actually removed. The caller takes a filled order
    /// off the book.
    pub fn reduce_volume_by(&mut self, n: u64) -> u64 {
        let actual = n.min(self.volume);
        self.volume -= actual;
        actual
    }

    /// Rewrite the price to the book-adjusted price. Only the submit path calls this.
    pub(crate) fn set_book_price(&mut self, price: Decimal) {
        self.price = price;
    }

    /// Reuse another order's id. Lets tests build a colliding submission.
    #[cfg(test)]
    pub(crate) fn with_id(mut self, id: OrderId) -> Self {
        self.id = id;
        self
    }
}

impl fmt::Debug for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Order")
            .field("id", &self.id)
            .field("side", &self.side)
            .field("price", &self.price)
            .field("volume", &self.volume)
            .field("owner", &self.owner.id())
            .field("submitted_at", &self.submitted_at)
            .field("flags", &self.flags)
            .finish()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Account;
    use crate::participant::Trader;

    fn owner() -> Arc<dyn Participant> {
        Arc::new(Trader::new(
            ParticipantKind::Noise,
            Account::new(Decimal::from(1_000), 100).unwrap(),
        ))
    }

    #[test]
    fn test_side_conversion() {
        assert_eq!(Side::Buy.to_u8(), 0);
        assert_eq!(Side::Sell.to_u8(), 1);
        assert_eq!(Side::from_u8(0), Some(Side::Buy));
        assert_eq!(Side::from_u8(1), Some(Side::Sell));
        assert_eq!(Side::from_u8(2), None);
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn test_side_parse() {
        assert_eq!("buy".parse::<Side>(), Ok(Side::Buy));
        assert_eq!(" SELL ".parse::<Side>(), Ok(Side::Sell));
        assert_eq!(
            "hold".parse::<Side>(),
            Err(OrderError::InvalidSide("hold".to_string()))
        );
    }

    #[test]
    fn test_order_new() {
        let order = Order::limit(Side::Buy, Decimal::from(10), 100, owner()).unwrap();

        assert_eq!(order.side(), Side::Buy);
        assert_eq!(order.price(), Decimal::from(10));
        assert_eq!(order.volume(), 100);
        assert!(order.flags().is_limit());
        assert!(!order.is_filled());
    }

    #[test]
    fn test_order_ids_unique_and_increasing() {
        let a = Order::limit(Side::Buy, Decimal::ONE, 1, owner()).unwrap();
        let b = Order::limit(Side::Buy, Decimal::ONE, 1, owner()).unwrap();
        assert!(b.id() > a.id());
        assert!(b.submitted_at() >= a.submitted_at());
    }

    #[test]
    fn test_order_rejects_zero_volume() {
        let err = Order::limit(Side::Sell, Decimal::ONE, 0, owner()).unwrap_err();
        assert_eq!(err, OrderError::ZeroVolume);
    }

    #[test]
    fn test_order_rejects_non_positive_price() {
        let err = Order::limit(Side::Sell, Decimal::ZERO, 5, owner()).unwrap_err();
        assert_eq!(err, OrderError::NonPositivePrice(Decimal::ZERO));

        let err = Order::fill_or_kill(Side::Buy, Decimal::from(-3), 5, owner()).unwrap_err();
        assert_eq!(err, OrderError::NonPositivePrice(Decimal::from(-3)));
    }

    #[test]
    fn test_market_order_ignores_price() {
        let order = Order::market(Side::Buy, 10, owner()).unwrap();
        assert!(order.is_market_order());
        assert_eq!(order.price(), Decimal::ZERO);
    }

    #[test]
    fn test_order_parse_rejects_bad_side() {
        let err = Order::parse("short", Decimal::ONE, 1, owner(), OrderFlags::LIMIT).unwrap_err();
        assert!(matches!(err, OrderError::InvalidSide(_)));
    }

    #[test]
    fn test_reduce_volume_by() {
        let mut order = Order::limit(Side::Buy, Decimal::from(10), 100, owner()).unwrap();

        assert_eq!(order.reduce_volume_by(30), 30);
        assert_eq!(order.volume(), 70);

        // Overfill floors at zero
        assert_eq!(order.reduce_volume_by(200), 70);
        assert_eq!(order.volume(), 0);
        assert!(order.is_filled());
    }

    #[test]
    fn test_flags_encoding() {
        assert_eq!(OrderFlags::LIMIT.to_u8(), 0);
        assert_eq!(OrderFlags::MARKET.to_u8(), 1);
        assert_eq!(OrderFlags::FILL_OR_KILL.to_u8(), 2);
    }
}
