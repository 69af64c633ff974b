use alloy_primitives::B256;

use crate::{errors::ChainError, types::BlockRecord};

/// Read-only view of the tracked chain.
///
/// Handed to the header validator and used by fork resolution.
pub trait BlockchainInterface: Send + Sync {
    fn peak_height(&self) -> u32;

    fn contains_block(&self, header_hash: &B256) -> bool;

    fn contains_height(&self, height: u32) -> bool;

    /// Canonical block hash at `height`.
    fn height_to_hash(&self, height: u32) -> Result<B256, ChainError>;

    fn try_block_record(&self, header_hash: &B256) -> Option<&BlockRecord>;

    fn block_record(&self, header_hash: &B256) -> Result<&BlockRecord, ChainError> {
        self.try_block_record(header_hash)
            .ok_or(ChainError::BlockNotFound(*header_hash))
    }

    /// True if `header_hash` is the canonical block at its recorded height.
    fn contains_block_in_peak_chain(&self, header_hash: &B256) -> bool {
        match self.try_block_record(header_hash) {
            Some(record) => self
                .height_to_hash(record.height)
                .is_ok_and(|hash| hash == *header_hash),
            None => false,
        }
    }
}
