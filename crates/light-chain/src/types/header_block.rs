use alloy_primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};

use super::ErrorCode;

/// Challenge chain portion of a finished sub-slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeChainSubSlot {
    pub end_of_slot_vdf_hash: B256,
    pub subepoch_summary_hash: Option<B256>,
    pub new_sub_slot_iters: Option<u64>,
    pub new_difficulty: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndOfSubSlotBundle {
    pub challenge_chain: ChallengeChainSubSlot,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardChainBlock {
    pub weight: u128,
    pub height: u32,
    pub total_iters: u128,
    pub signage_point_index: u8,
    pub proof_of_space_hash: B256,
    pub is_transaction_block: bool,
}

impl RewardChainBlock {
    pub fn hash(&self) -> B256 {
        let mut preimage = Vec::with_capacity(16 + 4 + 16 + 1 + 32 + 1);
        preimage.extend_from_slice(&self.weight.to_be_bytes());
        preimage.extend_from_slice(&self.height.to_be_bytes());
        preimage.extend_from_slice(&self.total_iters.to_be_bytes());
        preimage.push(self.signage_point_index);
        preimage.extend_from_slice(self.proof_of_space_hash.as_slice());
        preimage.push(self.is_transaction_block as u8);
        keccak256(preimage)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoliageTransactionBlock {
    pub prev_transaction_block_hash: B256,
    pub timestamp: u64,
    pub filter_hash: B256,
}

impl FoliageTransactionBlock {
    pub fn hash(&self) -> B256 {
        let mut preimage = Vec::with_capacity(32 + 8 + 32);
        preimage.extend_from_slice(self.prev_transaction_block_hash.as_slice());
        preimage.extend_from_slice(&self.timestamp.to_be_bytes());
        preimage.extend_from_slice(self.filter_hash.as_slice());
        keccak256(preimage)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Foliage {
    pub prev_block_hash: B256,
    pub reward_block_hash: B256,
    pub foliage_transaction_block_hash: Option<B256>,
}

impl Foliage {
    pub fn hash(&self) -> B256 {
        let mut preimage = Vec::with_capacity(32 * 3);
        preimage.extend_from_slice(self.prev_block_hash.as_slice());
        preimage.extend_from_slice(self.reward_block_hash.as_slice());
        preimage.extend_from_slice(
            self.foliage_transaction_block_hash
                .unwrap_or_default()
                .as_slice(),
        );
        keccak256(preimage)
    }
}

/// Header-level representation of a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderBlock {
    pub finished_sub_slots: Vec<EndOfSubSlotBundle>,
    pub reward_chain_block: RewardChainBlock,
    pub foliage: Foliage,
    pub foliage_transaction_block: Option<FoliageTransactionBlock>,
}

impl HeaderBlock {
    /// The block hash is the hash of its foliage.
    pub fn header_hash(&self) -> B256 {
        self.foliage.hash()
    }

    pub fn prev_header_hash(&self) -> B256 {
        self.foliage.prev_block_hash
    }

    pub fn height(&self) -> u32 {
        self.reward_chain_block.height
    }

    pub fn weight(&self) -> u128 {
        self.reward_chain_block.weight
    }

    pub fn total_iters(&self) -> u128 {
        self.reward_chain_block.total_iters
    }

    pub fn is_transaction_block(&self) -> bool {
        self.reward_chain_block.is_transaction_block
    }

    pub fn timestamp(&self) -> Option<u64> {
        self.foliage_transaction_block
            .as_ref()
            .map(|block| block.timestamp)
    }

    /// Sub-slot iterations and difficulty announced by the first finished sub-slot, if any.
    ///
    /// Both values change together; a sub-slot carrying only one of them is malformed.
    pub fn new_sub_slot_params(&self) -> Result<Option<(u64, u64)>, ErrorCode> {
        let Some(sub_slot) = self.finished_sub_slots.first() else {
            return Ok(None);
        };
        let challenge_chain = &sub_slot.challenge_chain;
        match (challenge_chain.new_sub_slot_iters, challenge_chain.new_difficulty) {
            (Some(sub_slot_iters), Some(difficulty)) => Ok(Some((sub_slot_iters, difficulty))),
            (None, None) => Ok(None),
            (Some(_), None) => Err(ErrorCode::InvalidNewDifficulty),
            (None, Some(_)) => Err(ErrorCode::InvalidNewSubSlotIters),
        }
    }
}
