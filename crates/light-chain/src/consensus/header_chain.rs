use std::sync::Arc;

use alloy_primitives::B256;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    consensus::{
        block_records::BlockRecordStore,
        chain_view::BlockchainInterface,
        constants::SYNCED_WEIGHT_PROOF_KEY,
        fork,
        height_index::HeightIndex,
        network_space::{network_space, FarmerPublicKey, StakingCoefficients},
        peak::PeakTracker,
        validator::{HeaderValidator, WeightProofValidator},
    },
    database::{get_object, set_object, ObjectStore},
    errors::ChainError,
    types::{BlockRecord, ErrorCode, HeaderBlock, ReceiveBlockResult, WeightProof},
};

/// Client-side view of the canonical chain.
///
/// Tracks the peak, a bounded window of block records around it and the canonical height
/// index. Every mutating method takes `&mut self`; concurrent callers must go through a single
/// writer such as [`crate::node::ChainNode`].
pub struct HeaderChain {
    config: Arc<Config>,
    store: Arc<dyn ObjectStore>,
    header_validator: Arc<dyn HeaderValidator>,
    weight_proof_validator: Arc<dyn WeightProofValidator>,
    synced_weight_proof: Option<WeightProof>,
    peak: PeakTracker,
    height_to_hash: HeightIndex,
    block_records: BlockRecordStore,
    sub_slot_iters: u64,
    difficulty: u64,
    staking: StakingCoefficients,
}

impl HeaderChain {
    /// Restores the chain from `store`.
    ///
    /// A stored weight proof is validated again and installed, which brings back the block
    /// records and the height index. The persisted peak is always loaded, and a peak heavier
    /// than the stored proof is kept without records until the next weight proof arrives.
    pub async fn create(
        store: Arc<dyn ObjectStore>,
        config: Arc<Config>,
        header_validator: Arc<dyn HeaderValidator>,
        weight_proof_validator: Arc<dyn WeightProofValidator>,
    ) -> Result<Self, ChainError> {
        let mut chain = Self {
            peak: PeakTracker::new(store.clone()),
            height_to_hash: HeightIndex::new(),
            block_records: BlockRecordStore::new(config.cache_size()),
            sub_slot_iters: config.constants.sub_slot_iters_starting,
            difficulty: config.constants.difficulty_starting,
            staking: StakingCoefficients::new(),
            synced_weight_proof: None,
            config,
            store,
            header_validator,
            weight_proof_validator,
        };

        chain.peak.current().await?;
        let synced_weight_proof: Option<WeightProof> =
            get_object(chain.store.as_ref(), SYNCED_WEIGHT_PROOF_KEY).await?;
        let Some(weight_proof) = synced_weight_proof else {
            return Ok(chain);
        };
        let peak_weight = chain.peak.peak().map(HeaderBlock::weight);
        match weight_proof.weight() {
            Some(proof_weight) if peak_weight.is_some_and(|weight| weight > proof_weight) => {
                info!(
                    peak_height = chain.peak.height(),
                    "Persisted peak is ahead of the stored weight proof, a new proof is needed"
                );
                chain.synced_weight_proof = Some(weight_proof);
            }
            _ => match chain.install_weight_proof(weight_proof, None).await {
                Ok(()) => {}
                Err(ChainError::InvalidWeightProof(reason)) => {
                    warn!(%reason, "Ignoring stored weight proof");
                }
                Err(err) => return Err(err),
            },
        }

        Ok(chain)
    }

    /// Leaps the chain forward to the tip of `weight_proof` if it is heavier than the peak.
    ///
    /// `records` skips validation when the caller already derived the proof's records.
    pub async fn new_weight_proof(
        &mut self,
        weight_proof: WeightProof,
        records: Option<Vec<BlockRecord>>,
    ) -> Result<(), ChainError> {
        let proof_weight = weight_proof.weight().ok_or_else(|| {
            ChainError::InvalidWeightProof("proof has no recent chain data".to_string())
        })?;
        if let Some(peak) = self.peak.current().await? {
            if proof_weight <= peak.weight() {
                debug!(
                    proof_weight = %proof_weight,
                    peak_weight = %peak.weight(),
                    "Weight proof is not heavier than the peak"
                );
                return Ok(());
            }
        }

        set_object(self.store.as_ref(), SYNCED_WEIGHT_PROOF_KEY, &weight_proof).await?;
        self.install_weight_proof(weight_proof, records).await
    }

    async fn install_weight_proof(
        &mut self,
        weight_proof: WeightProof,
        records: Option<Vec<BlockRecord>>,
    ) -> Result<(), ChainError> {
        let records = match records {
            Some(records) => records,
            None => {
                let validation = self
                    .weight_proof_validator
                    .validate_weight_proof(&weight_proof, true)
                    .await
                    .map_err(|err| ChainError::InvalidWeightProof(err.to_string()))?;
                if !validation.valid {
                    warn!("Weight proof rejected by validator");
                    return Err(ChainError::InvalidWeightProof(
                        "rejected by validator".to_string(),
                    ));
                }
                validation.records.unwrap_or_default()
            }
        };

        let [.., second_last, last] = records.as_slice() else {
            return Err(ChainError::InvalidWeightProof(format!(
                "expected at least 2 records, got {}",
                records.len()
            )));
        };
        let sub_slot_iters = last.sub_slot_iters;
        let difficulty = last
            .weight
            .checked_sub(second_last.weight)
            .and_then(|difficulty| u64::try_from(difficulty).ok())
            .ok_or_else(|| {
                ChainError::InvalidWeightProof("records do not increase in weight".to_string())
            })?;
        let Some(tip) = weight_proof.tip().cloned() else {
            return Err(ChainError::InvalidWeightProof(
                "proof has no recent chain data".to_string(),
            ));
        };

        let mut latest_timestamp = self.peak.latest_timestamp();
        for record in &records {
            if record.is_transaction_block {
                let Some(timestamp) = record.timestamp else {
                    return Err(ChainError::InvalidWeightProof(format!(
                        "transaction block {} has no timestamp",
                        record.header_hash
                    )));
                };
                latest_timestamp = latest_timestamp.max(timestamp);
            }
        }

        // Canonical entries survive only below a first record that extends the current chain.
        let keep_through = records.first().and_then(|first| {
            let parent_height = first.height.checked_sub(1)?;
            self.height_to_hash
                .is_canonical(parent_height, &first.prev_hash)
                .then_some(parent_height)
        });

        self.peak.set(tip, Some(latest_timestamp)).await?;
        match keep_through {
            Some(height) => self.height_to_hash.truncate_above(height),
            None => self.height_to_hash.clear(),
        }
        for record in records {
            self.height_to_hash.insert(record.height, record.header_hash);
            self.block_records.add(record);
        }
        self.sub_slot_iters = sub_slot_iters;
        self.difficulty = difficulty;
        self.synced_weight_proof = Some(weight_proof);
        self.clean_block_records();
        Ok(())
    }

    /// Classifies `block` and, if it is heavier than the peak, makes its chain canonical.
    pub async fn receive_block(
        &mut self,
        block: HeaderBlock,
    ) -> Result<(ReceiveBlockResult, Option<ErrorCode>), ChainError> {
        let header_hash = block.header_hash();
        if self.contains_block_in_peak_chain(&header_hash) {
            return Ok((ReceiveBlockResult::AlreadyHaveBlock, None));
        }
        if !self.contains_block(&block.prev_header_hash()) && block.height() > 0 {
            return Ok((ReceiveBlockResult::DisconnectedBlock, None));
        }

        let (sub_slot_iters, difficulty) = match block.new_sub_slot_params() {
            Ok(Some(params)) => params,
            Ok(None) => (self.sub_slot_iters, self.difficulty),
            Err(code) => {
                warn!(
                    %header_hash,
                    %code,
                    "Sub-slot announces only one of iterations and difficulty"
                );
                return Ok((ReceiveBlockResult::InvalidBlock, Some(code)));
            }
        };

        let validation = self
            .header_validator
            .validate_header_block(
                &self.config.constants,
                &*self,
                &block,
                false,
                difficulty,
                sub_slot_iters,
                false,
            )
            .await;
        let required_iters = match validation {
            Ok(Some(required_iters)) => required_iters,
            Ok(None) => {
                return Ok((
                    ReceiveBlockResult::InvalidBlock,
                    Some(ErrorCode::InvalidPospace),
                ))
            }
            Err(err) => {
                warn!(%header_hash, height = block.height(), error = %err, "Invalid block");
                return Ok((ReceiveBlockResult::InvalidBlock, Some(err.code)));
            }
        };

        let block_record = match self.header_validator.block_to_block_record(
            &self.config.constants,
            &*self,
            required_iters,
            &block,
            sub_slot_iters,
            difficulty,
        ) {
            Ok(block_record) => block_record,
            Err(err) => return Ok((ReceiveBlockResult::InvalidBlock, Some(err.code))),
        };
        let difficulty = match self.peak_difficulty(&block_record) {
            Ok(difficulty) => difficulty,
            Err(code) => return Ok((ReceiveBlockResult::InvalidBlock, Some(code))),
        };

        let Some(peak) = self.peak.peak().cloned() else {
            self.peak
                .set(block, block_record.transaction_timestamp())
                .await?;
            self.height_to_hash
                .insert(block_record.height, block_record.header_hash);
            self.sub_slot_iters = block_record.sub_slot_iters;
            self.difficulty = difficulty;
            self.block_records.add(block_record);
            self.clean_block_records();
            return Ok((ReceiveBlockResult::NewPeak, None));
        };

        if block_record.weight <= peak.weight() {
            debug!(%header_hash, height = block_record.height, "Added block as orphan");
            self.block_records.add(block_record);
            return Ok((ReceiveBlockResult::AddedAsOrphan, None));
        }

        let fork_height = fork::fork_height(&*self, &block_record, &peak)?;

        // Everything the new chain needs is collected before the first mutation.
        let mut latest_timestamp = self.peak.latest_timestamp();
        let mut new_entries = Vec::new();
        let mut curr = &block_record;
        while curr.height > fork_height {
            new_entries.push((curr.height, curr.header_hash));
            if let Some(timestamp) = curr.timestamp {
                latest_timestamp = latest_timestamp.max(timestamp);
            }
            if curr.height == 0 {
                break;
            }
            curr = self.block_record(&curr.prev_hash)?;
        }

        if fork_height < peak.height() {
            debug!(
                fork_height,
                old_peak_height = peak.height(),
                "Rolling back canonical chain"
            );
            self.peak.remove_persisted().await?;
        }
        self.peak.set(block, Some(latest_timestamp)).await?;

        self.height_to_hash.truncate_above(fork_height);
        for (height, hash) in new_entries {
            self.height_to_hash.insert(height, hash);
        }
        self.sub_slot_iters = block_record.sub_slot_iters;
        self.difficulty = difficulty;
        self.block_records.add(block_record);
        self.clean_block_records();
        Ok((ReceiveBlockResult::NewPeak, None))
    }

    /// Difficulty of `block_record` relative to its parent.
    fn peak_difficulty(&self, block_record: &BlockRecord) -> Result<u64, ErrorCode> {
        let parent_weight = if block_record.height == 0 {
            0
        } else {
            self.try_block_record(&block_record.prev_hash)
                .map(|parent| parent.weight)
                .ok_or(ErrorCode::InvalidPrevBlockHash)?
        };
        block_record
            .weight
            .checked_sub(parent_weight)
            .and_then(|difficulty| u64::try_from(difficulty).ok())
            .filter(|difficulty| *difficulty > 0)
            .ok_or(ErrorCode::InvalidWeight)
    }

    /// Drops block records that fell out of the window below the peak.
    fn clean_block_records(&mut self) {
        let height_limit = self.peak.height().saturating_sub(self.config.cache_size());
        let evicted = self.block_records.evict_below(height_limit);
        if evicted > 0 {
            debug!(evicted, height_limit, "Evicted block records");
        }
    }

    pub fn current_peak(&self) -> Option<&HeaderBlock> {
        self.peak.peak()
    }

    pub fn latest_timestamp(&self) -> u64 {
        self.peak.latest_timestamp()
    }

    pub fn sub_slot_iters(&self) -> u64 {
        self.sub_slot_iters
    }

    pub fn difficulty(&self) -> u64 {
        self.difficulty
    }

    pub fn synced_weight_proof(&self) -> Option<&WeightProof> {
        self.synced_weight_proof.as_ref()
    }

    pub fn height_index(&self) -> &HeightIndex {
        &self.height_to_hash
    }

    pub fn block_record_count(&self) -> usize {
        self.block_records.len()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Estimated plot space between two known blocks.
    pub fn network_space(&self, newer: &B256, older: &B256) -> Result<u128, ChainError> {
        network_space(self, &self.config.constants, newer, older)
    }

    /// Estimated plot space over the last `block_range` canonical blocks.
    pub fn peak_network_space(&self, block_range: u32) -> Result<u128, ChainError> {
        let Some(peak) = self.peak.peak() else {
            return Ok(0);
        };
        if peak.height() <= 1 {
            return Ok(0);
        }
        let older = self.height_to_hash(peak.height().saturating_sub(block_range).max(1))?;
        self.network_space(&peak.header_hash(), &older)
    }

    pub fn farmer_difficulty_coeff(&self, farmer: &FarmerPublicKey) -> u64 {
        self.staking.coefficient(farmer)
    }

    pub fn staking_mut(&mut self) -> &mut StakingCoefficients {
        &mut self.staking
    }
}

impl BlockchainInterface for HeaderChain {
    fn peak_height(&self) -> u32 {
        self.peak.height()
    }

    fn contains_block(&self, header_hash: &B256) -> bool {
        self.block_records.contains(header_hash)
    }

    fn contains_height(&self, height: u32) -> bool {
        self.height_to_hash.contains(height)
    }

    fn height_to_hash(&self, height: u32) -> Result<B256, ChainError> {
        self.height_to_hash
            .get(height)
            .ok_or(ChainError::HeightNotFound(height))
    }

    fn try_block_record(&self, header_hash: &B256) -> Option<&BlockRecord> {
        self.block_records.get(header_hash)
    }
}

impl std::fmt::Debug for HeaderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeaderChain")
            .field("peak", &self.peak)
            .field("canonical_blocks", &self.height_to_hash.len())
            .field("block_records", &self.block_records.len())
            .field("sub_slot_iters", &self.sub_slot_iters)
            .field("difficulty", &self.difficulty)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        consensus::{constants::PEAK_BLOCK_KEY, validator::mock::record_from_header},
        test_utils::{
            child_block, extend_chain, genesis_block, weight_proof_from, with_sub_slot, TestChain,
        },
    };

    async fn chain_with(blocks: &[HeaderBlock]) -> TestChain {
        let mut test_chain = TestChain::new().await.unwrap();
        for block in blocks {
            let (result, _) = test_chain
                .chain
                .receive_block(block.clone())
                .await
                .unwrap();
            assert_eq!(result, ReceiveBlockResult::NewPeak);
        }
        test_chain
    }

    fn canonical(chain: &HeaderChain) -> Vec<B256> {
        chain.height_index().iter().map(|(_, hash)| hash).collect()
    }

    #[test_log::test(tokio::test)]
    async fn genesis_becomes_peak() {
        let TestChain { mut chain, .. } = TestChain::new().await.unwrap();
        assert_eq!(chain.current_peak(), None);

        let genesis = genesis_block(10);
        let outcome = chain.receive_block(genesis.clone()).await.unwrap();
        assert_eq!(outcome, (ReceiveBlockResult::NewPeak, None));
        assert_eq!(chain.current_peak(), Some(&genesis));
        assert_eq!(chain.height_to_hash(0).unwrap(), genesis.header_hash());
        assert_eq!(chain.latest_timestamp(), genesis.timestamp().unwrap());
        assert_eq!(chain.difficulty(), 10);
        assert_eq!(
            chain.sub_slot_iters(),
            chain.config().constants.sub_slot_iters_starting
        );
    }

    #[test_log::test(tokio::test)]
    async fn extension_keeps_persisted_peak_in_place() {
        let genesis = genesis_block(10);
        let child = child_block(&genesis, 15, 0);
        let test_chain = chain_with(&[genesis.clone(), child.clone()]).await;
        let chain = &test_chain.chain;

        assert_eq!(chain.peak_height(), 1);
        assert_eq!(chain.difficulty(), 15);
        assert_eq!(chain.latest_timestamp(), child.timestamp().unwrap());
        assert_eq!(
            canonical(chain),
            vec![genesis.header_hash(), child.header_hash()]
        );
        assert_eq!(
            test_chain.store.operations(),
            vec!["set PEAK_BLOCK".to_string(), "set PEAK_BLOCK".to_string()]
        );
    }

    #[test_log::test(tokio::test)]
    async fn canonical_block_is_already_had() {
        let genesis = genesis_block(10);
        let child = child_block(&genesis, 10, 0);
        let mut test_chain = chain_with(&[genesis, child.clone()]).await;
        let calls = test_chain.header_validator.calls().len();

        let outcome = test_chain.chain.receive_block(child).await.unwrap();
        assert_eq!(outcome, (ReceiveBlockResult::AlreadyHaveBlock, None));
        assert_eq!(test_chain.header_validator.calls().len(), calls);
    }

    #[test_log::test(tokio::test)]
    async fn unknown_parent_is_disconnected() {
        let genesis = genesis_block(10);
        let blocks = extend_chain(&genesis, 2, 10, 0);
        let mut test_chain = chain_with(&[genesis]).await;

        let outcome = test_chain
            .chain
            .receive_block(blocks[1].clone())
            .await
            .unwrap();
        assert_eq!(outcome, (ReceiveBlockResult::DisconnectedBlock, None));
        assert!(!test_chain.chain.contains_block(&blocks[1].header_hash()));
        assert_eq!(test_chain.header_validator.calls().len(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn rejected_block_leaves_no_trace() {
        let genesis = genesis_block(10);
        let child = child_block(&genesis, 10, 0);
        let mut test_chain = chain_with(&[genesis.clone()]).await;
        test_chain
            .header_validator
            .reject(child.header_hash(), ErrorCode::InvalidPospace);

        let outcome = test_chain.chain.receive_block(child.clone()).await.unwrap();
        assert_eq!(
            outcome,
            (ReceiveBlockResult::InvalidBlock, Some(ErrorCode::InvalidPospace))
        );
        assert!(!test_chain.chain.contains_block(&child.header_hash()));
        assert_eq!(test_chain.chain.current_peak(), Some(&genesis));
    }

    #[test_log::test(tokio::test)]
    async fn missing_required_iters_is_invalid() {
        let genesis = genesis_block(10);
        let child = child_block(&genesis, 10, 0);
        let mut test_chain = chain_with(&[genesis]).await;
        test_chain
            .header_validator
            .withhold_required_iters(child.header_hash());

        let outcome = test_chain.chain.receive_block(child.clone()).await.unwrap();
        assert_eq!(
            outcome,
            (ReceiveBlockResult::InvalidBlock, Some(ErrorCode::InvalidPospace))
        );
        assert!(!test_chain.chain.contains_block(&child.header_hash()));
    }

    #[test_log::test(tokio::test)]
    async fn lone_sub_slot_parameter_is_invalid() {
        let genesis = genesis_block(10);
        let mut test_chain = chain_with(&[genesis.clone()]).await;
        let calls = test_chain.header_validator.calls().len();

        let child = with_sub_slot(child_block(&genesis, 10, 0), Some(2048), None);
        let outcome = test_chain.chain.receive_block(child).await.unwrap();
        assert_eq!(
            outcome,
            (
                ReceiveBlockResult::InvalidBlock,
                Some(ErrorCode::InvalidNewDifficulty)
            )
        );
        assert_eq!(test_chain.header_validator.calls().len(), calls);
    }

    #[test_log::test(tokio::test)]
    async fn sub_slot_parameters_are_used_and_carried() {
        let genesis = genesis_block(10);
        let mut test_chain = chain_with(&[genesis.clone()]).await;

        let first = with_sub_slot(child_block(&genesis, 20, 0), Some(2048), Some(20));
        let second = child_block(&first, 20, 0);
        for block in [first.clone(), second.clone()] {
            let (result, _) = test_chain.chain.receive_block(block).await.unwrap();
            assert_eq!(result, ReceiveBlockResult::NewPeak);
        }

        let calls = test_chain.header_validator.calls();
        let [.., first_call, second_call] = calls.as_slice() else {
            panic!("expected validator calls");
        };
        assert_eq!(first_call.header_hash, first.header_hash());
        assert_eq!((first_call.sub_slot_iters, first_call.difficulty), (2048, 20));
        assert_eq!((second_call.sub_slot_iters, second_call.difficulty), (2048, 20));
        assert_eq!(test_chain.chain.sub_slot_iters(), 2048);
        assert_eq!(test_chain.chain.difficulty(), 20);
        assert_eq!(
            test_chain
                .chain
                .block_record(&second.header_hash())
                .unwrap()
                .sub_slot_iters,
            2048
        );
    }

    #[test_log::test(tokio::test)]
    async fn equal_weight_sibling_is_orphaned() {
        let genesis = genesis_block(10);
        let child = child_block(&genesis, 10, 0);
        let mut test_chain = chain_with(&[genesis.clone(), child.clone()]).await;

        let sibling = child_block(&genesis, 10, 1);
        let outcome = test_chain.chain.receive_block(sibling.clone()).await.unwrap();
        assert_eq!(outcome, (ReceiveBlockResult::AddedAsOrphan, None));
        assert!(test_chain.chain.contains_block(&sibling.header_hash()));
        assert!(!test_chain
            .chain
            .contains_block_in_peak_chain(&sibling.header_hash()));
        assert_eq!(test_chain.chain.current_peak(), Some(&child));
    }

    #[test_log::test(tokio::test)]
    async fn heavier_sibling_rolls_back_peak() {
        let genesis = genesis_block(10);
        let child = child_block(&genesis, 10, 0);
        let mut test_chain = chain_with(&[genesis.clone(), child.clone()]).await;

        let sibling = child_block(&genesis, 11, 1);
        let outcome = test_chain.chain.receive_block(sibling.clone()).await.unwrap();
        assert_eq!(outcome, (ReceiveBlockResult::NewPeak, None));
        assert_eq!(test_chain.chain.current_peak(), Some(&sibling));
        assert_eq!(
            test_chain.chain.height_to_hash(1).unwrap(),
            sibling.header_hash()
        );
        assert_eq!(test_chain.chain.difficulty(), 11);
        assert!(test_chain.chain.contains_block(&child.header_hash()));

        let operations = test_chain.store.operations();
        assert_eq!(
            operations[operations.len() - 2..],
            ["remove PEAK_BLOCK".to_string(), "set PEAK_BLOCK".to_string()]
        );
    }

    #[test_log::test(tokio::test)]
    async fn deep_reorg_replaces_canonical_suffix() {
        let genesis = genesis_block(10);
        let main = extend_chain(&genesis, 6, 10, 0);
        let mut blocks = vec![genesis.clone()];
        blocks.extend(main.iter().cloned());
        let mut test_chain = chain_with(&blocks).await;

        // Forks off at height 2 with heavier blocks; the third one outweighs the main peak.
        let branch = extend_chain(&main[1], 3, 15, 7);
        let mut outcomes = Vec::new();
        for block in &branch {
            outcomes.push(test_chain.chain.receive_block(block.clone()).await.unwrap().0);
        }
        assert_eq!(
            outcomes,
            vec![
                ReceiveBlockResult::AddedAsOrphan,
                ReceiveBlockResult::AddedAsOrphan,
                ReceiveBlockResult::NewPeak
            ]
        );

        let chain = &test_chain.chain;
        assert_eq!(chain.peak_height(), 5);
        assert!(!chain.contains_height(6));
        let mut expected = vec![
            genesis.header_hash(),
            main[0].header_hash(),
            main[1].header_hash(),
        ];
        expected.extend(branch.iter().map(HeaderBlock::header_hash));
        assert_eq!(canonical(chain), expected);
        // The running maximum keeps the later timestamp of the abandoned peak.
        assert_eq!(chain.latest_timestamp(), main[5].timestamp().unwrap());
        assert!(!chain.contains_block_in_peak_chain(&main[5].header_hash()));
    }

    #[test_log::test(tokio::test)]
    async fn failed_peak_write_leaves_chain_unchanged() {
        let genesis = genesis_block(10);
        let child = child_block(&genesis, 10, 0);
        let mut test_chain = chain_with(&[genesis.clone()]).await;
        let index = test_chain.chain.height_index().clone();

        test_chain.store.fail_writes_to(PEAK_BLOCK_KEY);
        let err = test_chain
            .chain
            .receive_block(child.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Storage(_)));
        assert!(!test_chain.chain.contains_block(&child.header_hash()));
        assert_eq!(test_chain.chain.current_peak(), Some(&genesis));
        assert_eq!(test_chain.chain.height_index(), &index);
        assert_eq!(test_chain.chain.difficulty(), 10);

        test_chain.store.heal();
        let outcome = test_chain.chain.receive_block(child.clone()).await.unwrap();
        assert_eq!(outcome, (ReceiveBlockResult::NewPeak, None));
        assert_eq!(test_chain.chain.current_peak(), Some(&child));
    }

    #[test_log::test(tokio::test)]
    async fn records_below_window_are_evicted() {
        let genesis = genesis_block(10);
        let mut blocks = vec![genesis.clone()];
        blocks.extend(extend_chain(&genesis, 60, 10, 0));
        let test_chain = chain_with(&blocks).await;
        let chain = &test_chain.chain;

        let cache_size = chain.config().cache_size();
        assert_eq!(chain.block_record_count(), cache_size as usize + 1);
        assert!(!chain.contains_block(&genesis.header_hash()));
        assert!(chain.contains_block(&blocks[30].header_hash()));
        assert!(chain.contains_height(0));
    }

    #[test_log::test(tokio::test)]
    async fn weight_proof_sets_peak_and_difficulty() {
        let genesis = genesis_block(100);
        let tip = child_block(&genesis, 40, 0);
        let TestChain {
            mut chain, store, ..
        } = TestChain::new().await.unwrap();

        chain
            .new_weight_proof(weight_proof_from(&[genesis.clone(), tip.clone()]), None)
            .await
            .unwrap();
        assert_eq!(chain.current_peak(), Some(&tip));
        assert_eq!(chain.difficulty(), 40);
        assert_eq!(
            chain.sub_slot_iters(),
            chain.config().constants.sub_slot_iters_starting
        );
        assert_eq!(chain.latest_timestamp(), tip.timestamp().unwrap());
        assert_eq!(canonical(&chain), vec![genesis.header_hash(), tip.header_hash()]);
        assert!(chain.synced_weight_proof().is_some());
        assert!(store.contains(SYNCED_WEIGHT_PROOF_KEY));

        // Blocks on top of the proof connect to its records.
        let next = child_block(&tip, 40, 0);
        let outcome = chain.receive_block(next).await.unwrap();
        assert_eq!(outcome, (ReceiveBlockResult::NewPeak, None));
    }

    #[test_log::test(tokio::test)]
    async fn heavier_shorter_proof_replaces_height_index() {
        let genesis = genesis_block(10);
        let main = extend_chain(&genesis, 5, 10, 0);
        let mut blocks = vec![genesis];
        blocks.extend(main.iter().cloned());
        let mut test_chain = chain_with(&blocks).await;

        let proof_genesis = genesis_block(100);
        let proof_tip = child_block(&proof_genesis, 40, 0);
        test_chain
            .chain
            .new_weight_proof(
                weight_proof_from(&[proof_genesis.clone(), proof_tip.clone()]),
                None,
            )
            .await
            .unwrap();

        let chain = &mut test_chain.chain;
        assert_eq!(chain.peak_height(), 1);
        assert!(!chain.contains_height(5));
        assert_eq!(
            canonical(chain),
            vec![proof_genesis.header_hash(), proof_tip.header_hash()]
        );

        // The abandoned peak is no longer canonical and is only kept as an orphan.
        let outcome = chain.receive_block(main[4].clone()).await.unwrap();
        assert_eq!(outcome, (ReceiveBlockResult::AddedAsOrphan, None));
    }

    #[test_log::test(tokio::test)]
    async fn extending_proof_keeps_canonical_prefix() {
        let genesis = genesis_block(10);
        let main = extend_chain(&genesis, 3, 10, 0);
        let mut blocks = vec![genesis.clone()];
        blocks.extend(main.iter().cloned());
        let mut test_chain = chain_with(&blocks).await;

        let tip = child_block(&main[2], 40, 0);
        test_chain
            .chain
            .new_weight_proof(weight_proof_from(&[main[2].clone(), tip.clone()]), None)
            .await
            .unwrap();

        let mut expected = vec![genesis.header_hash()];
        expected.extend(main.iter().map(HeaderBlock::header_hash));
        expected.push(tip.header_hash());
        assert_eq!(canonical(&test_chain.chain), expected);
        assert_eq!(test_chain.chain.difficulty(), 40);
    }

    #[test_log::test(tokio::test)]
    async fn reapplying_weight_proof_changes_nothing() {
        let genesis = genesis_block(100);
        let proof = weight_proof_from(&[genesis.clone(), child_block(&genesis, 40, 0)]);
        let mut test_chain = TestChain::new().await.unwrap();

        test_chain
            .chain
            .new_weight_proof(proof.clone(), None)
            .await
            .unwrap();
        let chain = &test_chain.chain;
        let before = (
            chain.current_peak().cloned(),
            chain.difficulty(),
            chain.sub_slot_iters(),
            chain.latest_timestamp(),
            chain.height_index().clone(),
        );

        test_chain.chain.new_weight_proof(proof, None).await.unwrap();
        let chain = &test_chain.chain;
        let after = (
            chain.current_peak().cloned(),
            chain.difficulty(),
            chain.sub_slot_iters(),
            chain.latest_timestamp(),
            chain.height_index().clone(),
        );
        assert_eq!(before, after);
        assert_eq!(test_chain.weight_proof_validator.validations(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn precomputed_records_skip_validation() {
        let genesis = genesis_block(100);
        let tip = child_block(&genesis, 40, 0);
        let records = vec![
            record_from_header(&genesis, 1, 4096, 100),
            record_from_header(&tip, 1, 4096, 40),
        ];
        let mut test_chain = TestChain::new().await.unwrap();

        test_chain
            .chain
            .new_weight_proof(weight_proof_from(&[genesis, tip.clone()]), Some(records))
            .await
            .unwrap();
        assert_eq!(test_chain.weight_proof_validator.validations(), 0);
        assert_eq!(test_chain.chain.sub_slot_iters(), 4096);
        assert_eq!(test_chain.chain.current_peak(), Some(&tip));
    }

    #[test_log::test(tokio::test)]
    async fn lighter_weight_proof_is_ignored() {
        let genesis = genesis_block(10);
        let main = extend_chain(&genesis, 3, 50, 0);
        let mut blocks = vec![genesis.clone()];
        blocks.extend(main.iter().cloned());
        let mut test_chain = chain_with(&blocks).await;

        let proof = weight_proof_from(&[genesis.clone(), child_block(&genesis, 40, 9)]);
        test_chain.chain.new_weight_proof(proof, None).await.unwrap();
        assert_eq!(test_chain.weight_proof_validator.validations(), 0);
        assert!(!test_chain.store.contains(SYNCED_WEIGHT_PROOF_KEY));
        assert_eq!(test_chain.chain.current_peak(), main.last());
    }

    #[test_log::test(tokio::test)]
    async fn short_weight_proof_is_rejected() {
        let mut test_chain = TestChain::new().await.unwrap();
        let err = test_chain
            .chain
            .new_weight_proof(weight_proof_from(&[genesis_block(100)]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::InvalidWeightProof(_)));
        assert_eq!(test_chain.chain.current_peak(), None);
        assert!(test_chain.chain.height_index().is_empty());

        // The stored blob does not prevent a restart.
        let restarted = TestChain::with_store(test_chain.store.clone()).await.unwrap();
        assert_eq!(restarted.chain.current_peak(), None);
    }

    #[test_log::test(tokio::test)]
    async fn validator_rejection_and_failure_are_invalid_proofs() {
        let genesis = genesis_block(100);
        let proof = weight_proof_from(&[genesis.clone(), child_block(&genesis, 40, 0)]);
        let mut test_chain = TestChain::new().await.unwrap();

        test_chain.weight_proof_validator.reject();
        let err = test_chain
            .chain
            .new_weight_proof(proof.clone(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::InvalidWeightProof(_)));

        test_chain.weight_proof_validator.fail("connection reset");
        let err = test_chain
            .chain
            .new_weight_proof(proof, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ChainError::InvalidWeightProof(reason) if reason.contains("connection reset")
        ));
        assert_eq!(test_chain.chain.current_peak(), None);
        assert_eq!(test_chain.chain.block_record_count(), 0);
    }

    #[test_log::test(tokio::test)]
    async fn restart_restores_weight_proof_state() {
        let genesis = genesis_block(100);
        let tip = child_block(&genesis, 40, 0);
        let mut test_chain = TestChain::new().await.unwrap();
        test_chain
            .chain
            .new_weight_proof(weight_proof_from(&[genesis.clone(), tip.clone()]), None)
            .await
            .unwrap();

        let restarted = TestChain::with_store(test_chain.store.clone()).await.unwrap();
        assert_eq!(restarted.chain.current_peak(), Some(&tip));
        assert_eq!(restarted.chain.difficulty(), 40);
        assert!(restarted.chain.contains_block(&genesis.header_hash()));
        assert_eq!(restarted.chain.height_to_hash(1).unwrap(), tip.header_hash());
        assert_eq!(restarted.weight_proof_validator.validations(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn restart_keeps_peak_ahead_of_weight_proof() {
        let genesis = genesis_block(100);
        let tip = child_block(&genesis, 40, 0);
        let mut test_chain = TestChain::new().await.unwrap();
        test_chain
            .chain
            .new_weight_proof(weight_proof_from(&[genesis.clone(), tip.clone()]), None)
            .await
            .unwrap();
        let next = child_block(&tip, 40, 0);
        test_chain.chain.receive_block(next.clone()).await.unwrap();

        let restarted = TestChain::with_store(test_chain.store.clone()).await.unwrap();
        assert_eq!(restarted.chain.current_peak(), Some(&next));
        assert!(restarted.chain.synced_weight_proof().is_some());
        assert_eq!(restarted.weight_proof_validator.validations(), 0);
    }

    #[test_log::test(tokio::test)]
    async fn network_space_over_canonical_range() {
        let genesis = genesis_block(10);
        let main = extend_chain(&genesis, 5, 10, 0);
        let mut blocks = vec![genesis];
        blocks.extend(main.iter().cloned());
        let test_chain = chain_with(&blocks).await;
        let chain = &test_chain.chain;

        // 40 weight over 4000 iterations on the simulator constants.
        let space = chain
            .network_space(&main[4].header_hash(), &main[0].header_hash())
            .unwrap();
        assert_eq!(space, 40 * (1 << 14) * 2 * 762 / (4_000 * 1_000));
        assert_eq!(chain.peak_network_space(4).unwrap(), space);

        let err = chain
            .network_space(&main[0].header_hash(), &main[0].header_hash())
            .unwrap_err();
        assert!(matches!(err, ChainError::EmptyIterationRange));
    }

    #[test_log::test(tokio::test)]
    async fn staking_coefficients_default_to_twenty() {
        let mut test_chain = TestChain::new().await.unwrap();
        let farmer = FarmerPublicKey::repeat_byte(3);
        assert_eq!(test_chain.chain.farmer_difficulty_coeff(&farmer), 20);

        test_chain.chain.staking_mut().set(farmer, 5);
        assert_eq!(test_chain.chain.farmer_difficulty_coeff(&farmer), 5);
    }
}
