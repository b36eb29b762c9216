//! Continuous crossing loop.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::engine::settle::{credit_funds, credit_shares};
use crate::engine::{Execution, Outcome};
use crate::orderbook::BookState;
use crate::types::price::notional;

/// Whether a resting bid and ask may trade.
///
/// The bid must reach the ask, and may exceed it by at most
/// `ask × max_price_diff_ratio`. A tolerance that overflows is not
/// executable.
#[inline]
pub fn is_executable(bid: Decimal, ask: Decimal, max_price_diff_ratio: Decimal) -> bool {
    bid >= ask
        && ask
            .checked_mul(max_price_diff_ratio)
            .is_some_and(|tolerance| bid - ask <= tolerance)
}

/// Match resting bids against resting asks until no eligible pair crosses.
///
/// The pair considered each round is the best bid together with the best ask
/// owned by someone else. A bid with no such ask is passed over for the next
/// bid. The first eligible pair that is not executable ends the pass, even
/// when a lower bid could still cross an ask that was skipped for the best
/// bid only because both belong to the same owner. Such a book stays crossed
/// until a later mutation moves the best bid.
///
/// Each fill rescans both sides for the next eligible pair, so a pass with
/// `k` fills over `n` resting orders costs `O(k·n)` in the worst case.
///
/// Trades execute at the ask price. The buyer reserved at its own bid price,
/// so the difference is refunded.
pub fn process_orders(state: &mut BookState, config: &EngineConfig) -> Outcome {
    let mut outcome = Outcome::default();

    while let Some((bid_key, ask_key)) = next_pair(state) {
        let (Some(bid), Some(ask)) = (state.get(bid_key), state.get(ask_key)) else {
            break;
        };
        let (bid_price, ask_price) = (bid.price(), ask.price());

        if !is_executable(bid_price, ask_price, config.max_price_diff_ratio) {
            debug!(%bid_price, %ask_price, "best eligible pair not executable");
            break;
        }

        let volume = bid.volume().min(ask.volume());
        let buyer = bid.owner().clone();
        let seller = ask.owner().clone();
        let (bid_id, ask_id) = (bid.id(), ask.id());

        let (Some(proceeds), Some(refund)) = (
            notional(ask_price, volume),
            notional(bid_price - ask_price, volume),
        ) else {
            warn!(bid_id = %bid_id, ask_id = %ask_id, volume, "trade notional overflows");
            break;
        };

        credit_shares(buyer.as_ref(), volume);
        credit_funds(buyer.as_ref(), refund);
        credit_funds(seller.as_ref(), proceeds);

        state.fill(bid_key, volume);
        state.fill(ask_key, volume);

        outcome.record(
            state,
            Execution {
                buyer,
                seller,
                bid_order_id: Some(bid_id),
                ask_order_id: Some(ask_id),
                price: ask_price,
                volume,
            },
        );
    }

    outcome
}

/// Best bid paired with the best ask from a different owner.
fn next_pair(state: &BookState) -> Option<(usize, usize)> {
    state.bids_in_priority().find_map(|(bid_key, bid)| {
        let owner = bid.owner_id();
        state
            .asks_in_priority()
            .find(|(_, ask)| ask.owner_id() != owner)
            .map(|(ask_key, _)| (bid_key, ask_key))
    })
}
