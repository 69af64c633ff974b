pub mod mock;

use anyhow::Result;
use async_trait::async_trait;

use crate::{
    config::ConsensusConstants,
    consensus::chain_view::BlockchainInterface,
    errors::ValidationError,
    types::{BlockRecord, HeaderBlock, SubEpochSummary, WeightProof},
};

/// Consensus validation of individual headers.
#[async_trait]
pub trait HeaderValidator: Send + Sync {
    /// Validates `block` against `chain` under the given difficulty and sub-slot iterations.
    ///
    /// Returns the required iterations of the block's proof of space, or `None` if they could
    /// not be derived.
    #[allow(clippy::too_many_arguments)]
    async fn validate_header_block(
        &self,
        constants: &ConsensusConstants,
        chain: &dyn BlockchainInterface,
        block: &HeaderBlock,
        relaxed_mode: bool,
        difficulty: u64,
        sub_slot_iters: u64,
        skip_time_check: bool,
    ) -> Result<Option<u64>, ValidationError>;

    /// Builds the record of an already validated block.
    fn block_to_block_record(
        &self,
        constants: &ConsensusConstants,
        chain: &dyn BlockchainInterface,
        required_iters: u64,
        block: &HeaderBlock,
        sub_slot_iters: u64,
        difficulty: u64,
    ) -> Result<BlockRecord, ValidationError>;
}

/// Outcome of weight proof validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeightProofValidation {
    pub valid: bool,
    pub fork_point: u32,
    pub summaries: Vec<SubEpochSummary>,
    /// Records of the proof's recent chain, when requested.
    pub records: Option<Vec<BlockRecord>>,
}

/// Verification of weight proofs received from peers.
#[async_trait]
pub trait WeightProofValidator: Send + Sync {
    async fn validate_weight_proof(
        &self,
        weight_proof: &WeightProof,
        want_records: bool,
    ) -> Result<WeightProofValidation>;
}
