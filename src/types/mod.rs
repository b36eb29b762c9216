//! Core value types.
//!
//! ## Types
//!
//! - [`Order`]: one trading intent, owned by the book while it rests
//! - [`Side`] / [`OrderFlags`]: buy or sell; limit, market or fill-or-kill
//! - [`Trade`]: an executed fill
//! - [`MatchReceipt`]: summary of one matching pass
//! - [`Stock`]: the instrument and its last traded price
//!
//! Prices and funds are `rust_decimal::Decimal`; volumes are whole shares (`u64`).

mod instrument;
mod order;
mod receipt;
mod trade;
pub mod price;

pub use instrument::Stock;
pub use order::{monotonic_nanos, Order, OrderFlags, OrderId, Side};
pub use receipt::MatchReceipt;
pub use trade::Trade;
