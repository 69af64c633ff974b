//! Block builders, stores and chain setup shared by unit and integration tests.

use std::{collections::HashSet, sync::Arc};

use alloy_primitives::B256;
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    config::{Config, Network},
    consensus::{
        validator::mock::{MockHeaderValidator, MockWeightProofValidator},
        HeaderChain,
    },
    database::{MemoryStore, ObjectStore},
    errors::{ChainError, StoreError},
    types::{
        ChallengeChainSubSlot, EndOfSubSlotBundle, Foliage, FoliageTransactionBlock, HeaderBlock,
        RewardChainBlock, WeightProof,
    },
};

pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;
pub const BLOCK_TIME: u64 = 10;
pub const ITERS_PER_BLOCK: u128 = 1_000;

pub fn simulator_config() -> Arc<Config> {
    Arc::new(Config::from(Network::Simulator))
}

fn build_block(
    prev_block_hash: B256,
    height: u32,
    weight: u128,
    total_iters: u128,
    timestamp: u64,
    nonce: u8,
) -> HeaderBlock {
    let reward_chain_block = RewardChainBlock {
        weight,
        height,
        total_iters,
        signage_point_index: 0,
        proof_of_space_hash: B256::repeat_byte(nonce),
        is_transaction_block: true,
    };
    let foliage_transaction_block = FoliageTransactionBlock {
        prev_transaction_block_hash: prev_block_hash,
        timestamp,
        filter_hash: B256::ZERO,
    };
    HeaderBlock {
        finished_sub_slots: vec![],
        foliage: Foliage {
            prev_block_hash,
            reward_block_hash: reward_chain_block.hash(),
            foliage_transaction_block_hash: Some(foliage_transaction_block.hash()),
        },
        reward_chain_block,
        foliage_transaction_block: Some(foliage_transaction_block),
    }
}

/// Transaction block at height 0.
pub fn genesis_block(weight: u128) -> HeaderBlock {
    build_block(B256::ZERO, 0, weight, ITERS_PER_BLOCK, GENESIS_TIMESTAMP, 0)
}

/// Transaction block on top of `parent`. Siblings differ by `nonce`.
pub fn child_block(parent: &HeaderBlock, weight_delta: u128, nonce: u8) -> HeaderBlock {
    build_block(
        parent.header_hash(),
        parent.height() + 1,
        parent.weight() + weight_delta,
        parent.total_iters() + ITERS_PER_BLOCK,
        parent.timestamp().unwrap_or(GENESIS_TIMESTAMP) + BLOCK_TIME,
        nonce,
    )
}

/// `count` blocks on top of `parent`, each `weight_delta` heavier than the last.
pub fn extend_chain(
    parent: &HeaderBlock,
    count: usize,
    weight_delta: u128,
    nonce: u8,
) -> Vec<HeaderBlock> {
    let mut blocks: Vec<HeaderBlock> = Vec::with_capacity(count);
    for _ in 0..count {
        let prev = blocks.last().unwrap_or(parent);
        let block = child_block(prev, weight_delta, nonce);
        blocks.push(block);
    }
    blocks
}

/// Prepends a finished sub-slot announcing the given parameters.
pub fn with_sub_slot(
    mut block: HeaderBlock,
    sub_slot_iters: Option<u64>,
    difficulty: Option<u64>,
) -> HeaderBlock {
    block.finished_sub_slots.insert(
        0,
        EndOfSubSlotBundle {
            challenge_chain: ChallengeChainSubSlot {
                new_sub_slot_iters: sub_slot_iters,
                new_difficulty: difficulty,
                ..Default::default()
            },
        },
    );
    block
}

pub fn weight_proof_from(blocks: &[HeaderBlock]) -> WeightProof {
    WeightProof {
        sub_epochs: vec![],
        sub_epoch_segments: vec![],
        recent_chain_data: blocks.to_vec(),
    }
}

/// In-memory store that records every mutation and can be told to fail writes to a key.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    failing_keys: Mutex<HashSet<String>>,
    operations: Mutex<Vec<String>>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every following write or removal of `key`.
    pub fn fail_writes_to(&self, key: &str) {
        self.failing_keys.lock().insert(key.to_string());
    }

    pub fn heal(&self) {
        self.failing_keys.lock().clear();
    }

    /// Successful mutations in order, as `"set KEY"` or `"remove KEY"`.
    pub fn operations(&self) -> Vec<String> {
        self.operations.lock().clone()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains(key)
    }

    fn check(&self, key: &str) -> Result<(), StoreError> {
        if self.failing_keys.lock().contains(key) {
            return Err(StoreError::Backend(format!("write to {key} refused")));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for FailingStore {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get_bytes(key).await
    }

    async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.check(key)?;
        self.inner.set_bytes(key, value).await?;
        self.operations.lock().push(format!("set {key}"));
        Ok(())
    }

    async fn remove_object(&self, key: &str) -> Result<(), StoreError> {
        self.check(key)?;
        self.inner.remove_object(key).await?;
        self.operations.lock().push(format!("remove {key}"));
        Ok(())
    }
}

/// A chain on the simulator network wired to mock validators.
pub struct TestChain {
    pub chain: HeaderChain,
    pub store: Arc<FailingStore>,
    pub header_validator: Arc<MockHeaderValidator>,
    pub weight_proof_validator: Arc<MockWeightProofValidator>,
}

impl TestChain {
    pub async fn new() -> Result<Self, ChainError> {
        Self::with_store(Arc::new(FailingStore::new())).await
    }

    /// Restores a chain from `store`, as on restart.
    pub async fn with_store(store: Arc<FailingStore>) -> Result<Self, ChainError> {
        let config = simulator_config();
        let header_validator = Arc::new(MockHeaderValidator::new());
        let weight_proof_validator =
            Arc::new(MockWeightProofValidator::new(config.constants.clone()));
        let chain = HeaderChain::create(
            store.clone(),
            config,
            header_validator.clone(),
            weight_proof_validator.clone(),
        )
        .await?;
        Ok(Self {
            chain,
            store,
            header_validator,
            weight_proof_validator,
        })
    }
}
