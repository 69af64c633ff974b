use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicUsize, Ordering},
};

use alloy_primitives::B256;
use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;

use super::{HeaderValidator, WeightProofValidation, WeightProofValidator};
use crate::{
    config::ConsensusConstants,
    consensus::chain_view::BlockchainInterface,
    errors::ValidationError,
    types::{BlockRecord, ErrorCode, HeaderBlock, SubEpochSummary, WeightProof},
};

/// Required iterations reported for every accepted header.
pub const MOCK_REQUIRED_ITERS: u64 = 1_000;

/// Builds a record straight from the header fields.
pub fn record_from_header(
    block: &HeaderBlock,
    required_iters: u64,
    sub_slot_iters: u64,
    difficulty: u64,
) -> BlockRecord {
    BlockRecord {
        header_hash: block.header_hash(),
        prev_hash: block.prev_header_hash(),
        height: block.height(),
        weight: block.weight(),
        total_iters: block.total_iters(),
        required_iters,
        sub_slot_iters,
        difficulty,
        timestamp: block.timestamp().filter(|_| block.is_transaction_block()),
        is_transaction_block: block.is_transaction_block(),
    }
}

/// Parameters a header was validated with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderValidatorCall {
    pub header_hash: B256,
    pub difficulty: u64,
    pub sub_slot_iters: u64,
}

/// Accepts every header that is consistent with its parent, unless told otherwise.
#[derive(Debug, Default)]
pub struct MockHeaderValidator {
    rejections: Mutex<HashMap<B256, ErrorCode>>,
    withheld: Mutex<HashSet<B256>>,
    calls: Mutex<Vec<HeaderValidatorCall>>,
}

impl MockHeaderValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails validation of `header_hash` with `code`.
    pub fn reject(&self, header_hash: B256, code: ErrorCode) {
        self.rejections.lock().insert(header_hash, code);
    }

    /// Accepts `header_hash` without reporting its required iterations.
    pub fn withhold_required_iters(&self, header_hash: B256) {
        self.withheld.lock().insert(header_hash);
    }

    pub fn calls(&self) -> Vec<HeaderValidatorCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl HeaderValidator for MockHeaderValidator {
    async fn validate_header_block(
        &self,
        _constants: &ConsensusConstants,
        chain: &dyn BlockchainInterface,
        block: &HeaderBlock,
        _relaxed_mode: bool,
        difficulty: u64,
        sub_slot_iters: u64,
        _skip_time_check: bool,
    ) -> Result<Option<u64>, ValidationError> {
        let header_hash = block.header_hash();
        self.calls.lock().push(HeaderValidatorCall {
            header_hash,
            difficulty,
            sub_slot_iters,
        });

        if let Some(code) = self.rejections.lock().get(&header_hash) {
            return Err(ValidationError::new(*code, "rejected by mock validator"));
        }

        if block.height() > 0 {
            if let Some(parent) = chain.try_block_record(&block.prev_header_hash()) {
                if block.height() != parent.height + 1 {
                    return Err(ErrorCode::InvalidHeight.into());
                }
                if block.weight() <= parent.weight {
                    return Err(ErrorCode::InvalidWeight.into());
                }
                if block.total_iters() <= parent.total_iters {
                    return Err(ErrorCode::InvalidTotalIters.into());
                }
            }
        }

        if self.withheld.lock().contains(&header_hash) {
            return Ok(None);
        }
        Ok(Some(MOCK_REQUIRED_ITERS))
    }

    fn block_to_block_record(
        &self,
        _constants: &ConsensusConstants,
        _chain: &dyn BlockchainInterface,
        required_iters: u64,
        block: &HeaderBlock,
        sub_slot_iters: u64,
        difficulty: u64,
    ) -> Result<BlockRecord, ValidationError> {
        Ok(record_from_header(
            block,
            required_iters,
            sub_slot_iters,
            difficulty,
        ))
    }
}

#[derive(Debug, Clone)]
enum Behaviour {
    Derive,
    Reject,
    Records(Vec<BlockRecord>),
    Fail(String),
}

/// Derives records from the recent chain data of the proof it is given.
#[derive(Debug)]
pub struct MockWeightProofValidator {
    constants: ConsensusConstants,
    behaviour: Mutex<Behaviour>,
    validations: AtomicUsize,
}

impl MockWeightProofValidator {
    pub fn new(constants: ConsensusConstants) -> Self {
        Self {
            constants,
            behaviour: Mutex::new(Behaviour::Derive),
            validations: AtomicUsize::new(0),
        }
    }

    /// Reports every following proof as invalid.
    pub fn reject(&self) {
        *self.behaviour.lock() = Behaviour::Reject;
    }

    /// Reports every following proof as valid with `records` as its recent chain.
    pub fn return_records(&self, records: Vec<BlockRecord>) {
        *self.behaviour.lock() = Behaviour::Records(records);
    }

    /// Fails every following validation as if the validator were unreachable.
    pub fn fail(&self, message: &str) {
        *self.behaviour.lock() = Behaviour::Fail(message.to_string());
    }

    /// Number of proofs validated so far.
    pub fn validations(&self) -> usize {
        self.validations.load(Ordering::SeqCst)
    }

    fn derive_records(&self, weight_proof: &WeightProof) -> Vec<BlockRecord> {
        let mut sub_slot_iters = self.constants.sub_slot_iters_starting;
        let mut prev_weight: Option<u128> = None;
        weight_proof
            .recent_chain_data
            .iter()
            .map(|block| {
                if let Ok(Some((new_sub_slot_iters, _))) = block.new_sub_slot_params() {
                    sub_slot_iters = new_sub_slot_iters;
                }
                let difficulty = match prev_weight {
                    Some(prev_weight) => {
                        u64::try_from(block.weight().saturating_sub(prev_weight))
                            .unwrap_or(u64::MAX)
                    }
                    None => self.constants.difficulty_starting,
                };
                prev_weight = Some(block.weight());
                record_from_header(block, MOCK_REQUIRED_ITERS, sub_slot_iters, difficulty)
            })
            .collect()
    }
}

#[async_trait]
impl WeightProofValidator for MockWeightProofValidator {
    async fn validate_weight_proof(
        &self,
        weight_proof: &WeightProof,
        want_records: bool,
    ) -> Result<WeightProofValidation> {
        self.validations.fetch_add(1, Ordering::SeqCst);

        let behaviour = self.behaviour.lock().clone();
        let records = match behaviour {
            Behaviour::Derive => self.derive_records(weight_proof),
            Behaviour::Records(records) => records,
            Behaviour::Reject => return Ok(WeightProofValidation::default()),
            Behaviour::Fail(message) => bail!("weight proof validation failed: {message}"),
        };

        let summaries = weight_proof
            .sub_epochs
            .iter()
            .map(|sub_epoch| SubEpochSummary {
                prev_subepoch_summary_hash: B256::ZERO,
                reward_chain_hash: sub_epoch.reward_chain_hash,
                num_blocks_overflow: sub_epoch.num_blocks_overflow,
                new_difficulty: sub_epoch.new_difficulty,
                new_sub_slot_iters: sub_epoch.new_sub_slot_iters,
            })
            .collect();

        Ok(WeightProofValidation {
            valid: true,
            fork_point: records.first().map(|record| record.height).unwrap_or(0),
            summaries,
            records: want_records.then_some(records),
        })
    }
}
