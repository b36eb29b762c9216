//! Order book for a single instrument.
//!
//! ## Architecture
//!
//! - **Arena storage**: the book owns every resting `Order` in a slab;
//!   participants hold only the [`OrderId`](crate::types::OrderId) they got back
//! - **Price levels**: one node per price in a `BTreeMap`, FIFO inside
//! - **One lock**: [`OrderBook`] serializes all mutation behind a single mutex
//!
//! ## Components
//!
//! - [`OrderNode`]: `Order` plus linked-list pointers for its price level
//! - [`PriceLevel`]: the queue of orders at one price
//! - [`BookState`]: both sides, the id index and the instrument, unlocked
//! - [`OrderBook`]: the locked public surface with change notifications
//!
//! ## Performance
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | Submit | O(log n) |
//! | Cancel by id | O(log n) |
//! | Best bid/ask | O(log n) |
//! | Match pass | O(k·n) worst case for k fills over n resting orders |

pub mod book;
pub mod level;
pub mod node;
pub mod state;

pub use book::{BookEvent, BookSummary, Listener, OrderBook, OrderView, Placement, SubscriptionId};
pub use level::PriceLevel;
pub use node::OrderNode;
pub use state::BookState;
