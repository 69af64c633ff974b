use alloy_primitives::{Bytes, B256};
use serde::{Deserialize, Serialize};

use super::HeaderBlock;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubEpochData {
    pub reward_chain_hash: B256,
    pub num_blocks_overflow: u8,
    pub new_sub_slot_iters: Option<u64>,
    pub new_difficulty: Option<u64>,
}

/// Summary of a sub-epoch as derived by the weight proof validator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubEpochSummary {
    pub prev_subepoch_summary_hash: B256,
    pub reward_chain_hash: B256,
    pub num_blocks_overflow: u8,
    pub new_difficulty: Option<u64>,
    pub new_sub_slot_iters: Option<u64>,
}

/// Succinct proof of a chain's cumulative weight.
///
/// Only `recent_chain_data` is interpreted here; sub-epoch data and challenge segments are
/// handed to the weight proof validator untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightProof {
    pub sub_epochs: Vec<SubEpochData>,
    pub sub_epoch_segments: Vec<Bytes>,
    pub recent_chain_data: Vec<HeaderBlock>,
}

impl WeightProof {
    /// The most recent block of the proof, which becomes the peak when the proof is applied.
    pub fn tip(&self) -> Option<&HeaderBlock> {
        self.recent_chain_data.last()
    }

    pub fn weight(&self) -> Option<u128> {
        self.tip().map(HeaderBlock::weight)
    }
}
