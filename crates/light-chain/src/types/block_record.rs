use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// Immutable summary of a single block, as derived by header validation.
///
/// Records reference their parent by hash only. Ancestry is resolved through explicit lookups
/// in the block record store, never through in-memory links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub header_hash: B256,
    pub prev_hash: B256,
    pub height: u32,
    /// Cumulative chain weight up to and including this block.
    pub weight: u128,
    /// Cumulative time-proof iterations up to and including this block.
    pub total_iters: u128,
    pub required_iters: u64,
    /// Sub-slot iterations in effect starting at this block.
    pub sub_slot_iters: u64,
    /// Difficulty in effect starting at this block.
    pub difficulty: u64,
    /// Present only on transaction blocks.
    pub timestamp: Option<u64>,
    pub is_transaction_block: bool,
}

impl BlockRecord {
    /// Returns the timestamp if this record is a transaction block.
    pub fn transaction_timestamp(&self) -> Option<u64> {
        if self.is_transaction_block {
            self.timestamp
        } else {
            None
        }
    }
}
