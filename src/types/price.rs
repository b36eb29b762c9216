//! Price grid, price band and fixed-point helpers.
//!
//! ## Tick grid
//!
//! The instrument trades on a two-tier grid: prices below a threshold move in
//! fine steps (0.1 by default), prices at or above it in coarse steps (0.5).
//! Submitted limit prices are rounded to the nearest grid point, halves away
//! from zero. Every grid and band helper returns `None` when the arithmetic
//! would leave the `Decimal` range.
//!
//! ## Price band
//!
//! A rounded price is then clamped into `reference × (1 ± ratio)`. A clamped
//! price is snapped back onto the grid *inside* the band.
//!
//! ## Fixed-point
//!
//! The book digest encodes prices as `u64` scaled by 10^8 so the encoding is
//! exact and platform independent.
//!
//! ```
//! use bourse::types::price::{TickGrid, to_fixed};
//! use rust_decimal::Decimal;
//!
//! let grid = TickGrid::default();
//! assert_eq!(grid.round(Decimal::new(1004, 2)), Some(Decimal::new(100, 1)));   // 10.04 -> 10.0
//! assert_eq!(grid.round(Decimal::new(10030, 2)), Some(Decimal::new(1005, 1))); // 100.30 -> 100.5
//! assert_eq!(grid.round(Decimal::MAX), None);
//! assert_eq!(to_fixed(Decimal::ONE), Some(100_000_000));
//! ```

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Scaling factor for fixed-point encoding: 10^8
pub const SCALE: u64 = 100_000_000;

// ============================================================================
// Tick grid
// ============================================================================

/// Two-tier price step rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickGrid {
    /// Prices at or above this use `coarse_tick`
    pub threshold: Decimal,
    /// Step below the threshold
    pub fine_tick: Decimal,
    /// Step at or above the threshold
    pub coarse_tick: Decimal,
}

impl Default for TickGrid {
    fn default() -> Self {
        Self {
            threshold: Decimal::from(100),
            fine_tick: Decimal::new(1, 1),
            coarse_tick: Decimal::new(5, 1),
        }
    }
}

impl TickGrid {
    /// Step size that applies at `price`.
    #[inline]
    pub fn tick_for(&self, price: Decimal) -> Decimal {
        if price < self.threshold {
            self.fine_tick
        } else {
            self.coarse_tick
        }
    }

    /// Round to the nearest grid point.
    pub fn round(&self, price: Decimal) -> Option<Decimal> {
        snap(price, self.tick_for(price), RoundingStrategy::MidpointAwayFromZero)
    }

    /// Largest grid point `<= price`.
    pub fn floor(&self, price: Decimal) -> Option<Decimal> {
        snap(price, self.tick_for(price), RoundingStrategy::ToNegativeInfinity)
    }

    /// Smallest grid point `>= price`.
    pub fn ceil(&self, price: Decimal) -> Option<Decimal> {
        snap(price, self.tick_for(price), RoundingStrategy::ToPositiveInfinity)
    }

    /// Whether `price` sits exactly on the grid.
    pub fn is_on_grid(&self, price: Decimal) -> bool {
        self.round(price) == Some(price)
    }
}

fn snap(price: Decimal, tick: Decimal, strategy: RoundingStrategy) -> Option<Decimal> {
    if tick <= Decimal::ZERO {
        return Some(price);
    }
    let steps = price.checked_div(tick)?.round_dp_with_strategy(0, strategy);
    Some(steps.checked_mul(tick)?.normalize())
}

// ============================================================================
// Price band
// ============================================================================

/// Inclusive `(low, high)` band around a reference price, or `None` if
/// either edge overflows.
pub fn band(reference: Decimal, ratio: Decimal) -> Option<(Decimal, Decimal)> {
    let width = reference.checked_mul(ratio)?;
    Some((reference.checked_sub(width)?, reference.checked_add(width)?))
}

/// Round `price` to the grid and clamp it into the band around `reference`.
///
/// Returns `None` when the band contains no positive grid point, or when the
/// price or band cannot be computed without overflow.
pub fn adjust_to_band(
    price: Decimal,
    reference: Decimal,
    ratio: Decimal,
    grid: &TickGrid,
) -> Option<Decimal> {
    let (low, high) = band(reference, ratio)?;
    let rounded = grid.round(price)?;

    let adjusted = if rounded < low {
        grid.ceil(low)?
    } else if rounded > high {
        grid.floor(high)?
    } else {
        rounded
    };

    (adjusted > Decimal::ZERO && adjusted >= low && adjusted <= high).then_some(adjusted)
}

/// `price × volume`, or `None` on overflow.
#[inline]
pub fn notional(price: Decimal, volume: u64) -> Option<Decimal> {
    price.checked_mul(Decimal::from(volume))
}

// ============================================================================
// Fixed-point conversion
// ============================================================================

/// Convert a non-negative Decimal to fixed-point u64 (10^8 scale).
pub fn to_fixed(d: Decimal) -> Option<u64> {
    if d.is_sign_negative() {
        return None;
    }
    let scaled = d.checked_mul(Decimal::from(SCALE))?;
    scaled.round_dp(0).to_u64()
}

/// Convert fixed-point u64 back to a Decimal.
pub fn from_fixed(value: u64) -> Decimal {
    Decimal::from(value) / Decimal::from(SCALE)
}

// ============================================================================
// Unit Tests
// ============================================================================
