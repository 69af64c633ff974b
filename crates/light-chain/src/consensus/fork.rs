use tracing::debug;

use crate::{
    consensus::chain_view::BlockchainInterface,
    errors::ChainError,
    types::{BlockRecord, HeaderBlock},
};

/// Height at which the chain of `candidate` leaves the current canonical chain ending in `peak`.
///
/// The caller has already established that `candidate` outweighs `peak`.
pub fn fork_height(
    chain: &dyn BlockchainInterface,
    candidate: &BlockRecord,
    peak: &HeaderBlock,
) -> Result<u32, ChainError> {
    if candidate.prev_hash == peak.header_hash() {
        return Ok(peak.height());
    }

    if !chain.contains_block_in_peak_chain(&candidate.header_hash)
        && chain.contains_block_in_peak_chain(&candidate.prev_hash)
    {
        let height = candidate.height.saturating_sub(1);
        debug!(fork_height = height, "Candidate extends a canonical block below the peak");
        return Ok(height);
    }

    let peak_record = chain
        .try_block_record(&peak.header_hash())
        .ok_or_else(|| ChainError::ForkNotFound {
            missing: peak.header_hash(),
            height: peak.height(),
        })?;
    let height = find_fork_point(chain, candidate, peak_record)?;
    debug!(fork_height = height, "Resolved fork point by ancestor walk");
    Ok(height)
}

/// Walks both chains back through the block records until they meet.
///
/// Fails with `ForkNotFound` if an ancestor is no longer cached, or if the chains do not share
/// a genesis block.
pub fn find_fork_point(
    chain: &dyn BlockchainInterface,
    block_1: &BlockRecord,
    block_2: &BlockRecord,
) -> Result<u32, ChainError> {
    let parent = |record: &BlockRecord| {
        chain
            .try_block_record(&record.prev_hash)
            .ok_or(ChainError::ForkNotFound {
                missing: record.prev_hash,
                height: record.height.saturating_sub(1),
            })
    };

    let mut block_1 = block_1;
    let mut block_2 = block_2;
    while block_1.height > block_2.height {
        block_1 = parent(block_1)?;
    }
    while block_2.height > block_1.height {
        block_2 = parent(block_2)?;
    }

    loop {
        if block_1.header_hash == block_2.header_hash {
            return Ok(block_1.height);
        }
        if block_1.height == 0 {
            return Err(ChainError::ForkNotFound {
                missing: block_1.prev_hash,
                height: 0,
            });
        }
        block_1 = parent(block_1)?;
        block_2 = parent(block_2)?;
    }
}
