//! Summary of one matching pass.
//!
//! The receipt carries the book digest after the pass so a driver can record
//! or compare the settled state without walking the book.

use sha2::{Digest, Sha256};

/// Result of a single `process_orders` call.
///
/// ## Example
///
/// ```
/// use bourse::types::MatchReceipt;
///
/// let receipt = MatchReceipt::new(1, 3, 250, [0u8; 32]);
/// assert!(!receipt.is_empty());
/// assert_eq!(receipt.state_root_hex().len(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchReceipt {
    /// Sequence number of the pass
    pub pass_id: u64,

    /// Number of trades executed in this pass
    pub trades_executed: u64,

    /// Total volume executed in this pass
    pub volume_executed: u64,

    /// SHA-256 digest of the book after the pass
    pub state_root: [u8; 32],
}

impl MatchReceipt {
    pub fn new(pass_id: u64, trades_executed: u64, volume_executed: u64, state_root: [u8; 32]) -> Self {
        Self {
            pass_id,
            trades_executed,
            volume_executed,
            state_root,
        }
    }

    /// Compute SHA-256 hash of the given data
    pub fn compute_hash(data: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let result = hasher.finalize();

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&result);
        hash
    }

    /// Get the state root as a hex string
    pub fn state_root_hex(&self) -> String {
        hex::encode(self.state_root)
    }

    /// True if the pass executed nothing
    pub fn is_empty(&self) -> bool {
        self.trades_executed == 0
    }
}
