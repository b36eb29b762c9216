//! # Bourse
//!
//! Single-instrument order matching engine for a simulated equity market.
//!
//! ## Architecture
//!
//! - **Types**: core values (Order, Trade, MatchReceipt, price helpers)
//! - **Account**: funds and shares with reservation by direct debit
//! - **OrderBook**: slab-backed book behind one lock, with change notifications
//! - **Engine**: crossing loop, market sweeps, fill-or-kill and settlement
//! - **Participant**: the owner capability trait and the trading strategies
//! - **Driver**: tick scheduler running agent decisions and match passes
//!
//! ## Design Principles
//!
//! 1. **Determinism**: identical inputs give identical books and state roots
//! 2. **No Floating Point**: prices and funds are exact decimals
//! 3. **Conservation**: funds and shares only move between participants
//! 4. **Arena Ownership**: the book owns every resting order; callers hold ids
//!
//! ## Example
//!
//! ```
//! use bourse::config::{DriverConfig, EngineConfig};
//! use bourse::Simulation;
//!
//! let driver = DriverConfig { ticks: 20, parallel_decisions: false, ..DriverConfig::default() };
//! let mut sim = Simulation::seeded(EngineConfig::default(), driver).unwrap();
//! let summary = sim.run();
//!
//! assert_eq!(summary.ticks, 20);
//! assert_eq!(summary.state_root_hex().len(), 64);
//! ```

// ============================================================================
// Module declarations
// ============================================================================

/// Core data types: Order, Trade, MatchReceipt
pub mod types;

/// Participant balances and reservations
pub mod account;

/// Order book: slab-backed storage behind one lock
pub mod orderbook;

/// Matching passes over the unlocked book state
pub mod engine;

/// Order owners and trading strategies
pub mod participant;

/// Tick scheduler and trade statistics
pub mod driver;

/// Conservation totals across traders and the book
pub mod audit;

/// Engine and driver configuration
pub mod config;

/// Error types
pub mod error;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use account::Account;
pub use driver::{MarketStats, RunSummary, Simulation};
pub use error::{AccountError, InvalidConfig, OrderError, SubmitError};
pub use orderbook::{BookEvent, OrderBook, OrderView, Placement};
pub use participant::{Agent, Fill, Participant, ParticipantId, ParticipantKind, Trader};
pub use types::{MatchReceipt, Order, OrderFlags, OrderId, Side, Stock, Trade};
