use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{
    config::Config,
    consensus::{
        validator::{HeaderValidator, WeightProofValidator},
        HeaderChain,
    },
    database::ObjectStore,
    errors::ChainError,
    types::{BlockRecord, ErrorCode, HeaderBlock, ReceiveBlockResult, WeightProof},
};

/// Shared handle to a [`HeaderChain`].
///
/// Writers are serialized behind a lock, so blocks and weight proofs may be fed from several
/// tasks at once.
#[derive(Clone, Debug)]
pub struct ChainNode {
    chain: Arc<RwLock<HeaderChain>>,
}

impl ChainNode {
    pub async fn new(
        store: Arc<dyn ObjectStore>,
        config: Arc<Config>,
        header_validator: Arc<dyn HeaderValidator>,
        weight_proof_validator: Arc<dyn WeightProofValidator>,
    ) -> Result<Self, ChainError> {
        let chain =
            HeaderChain::create(store, config, header_validator, weight_proof_validator).await?;
        Ok(Self::from_chain(chain))
    }

    pub fn from_chain(chain: HeaderChain) -> Self {
        Self {
            chain: Arc::new(RwLock::new(chain)),
        }
    }

    pub async fn receive_block(
        &self,
        block: HeaderBlock,
    ) -> Result<(ReceiveBlockResult, Option<ErrorCode>), ChainError> {
        self.chain.write().await.receive_block(block).await
    }

    pub async fn new_weight_proof(
        &self,
        weight_proof: WeightProof,
        records: Option<Vec<BlockRecord>>,
    ) -> Result<(), ChainError> {
        self.chain
            .write()
            .await
            .new_weight_proof(weight_proof, records)
            .await
    }

    /// Feeds `blocks` in order under one lock and returns how many became the peak.
    ///
    /// Stops at the first disconnected or invalid block.
    pub async fn add_blocks(&self, blocks: Vec<HeaderBlock>) -> Result<u32, ChainError> {
        let mut chain = self.chain.write().await;
        let mut new_peaks = 0;
        for block in blocks {
            let header_hash = block.header_hash();
            match chain.receive_block(block).await? {
                (ReceiveBlockResult::NewPeak, _) => new_peaks += 1,
                (ReceiveBlockResult::DisconnectedBlock, _) => {
                    warn!(%header_hash, "Batch contains a disconnected block");
                    return Err(ChainError::DisconnectedBlock(header_hash));
                }
                (ReceiveBlockResult::InvalidBlock, code) => {
                    return Err(ChainError::InvalidBlock {
                        hash: header_hash,
                        code: code.unwrap_or(ErrorCode::Unknown),
                    });
                }
                (ReceiveBlockResult::AddedAsOrphan | ReceiveBlockResult::AlreadyHaveBlock, _) => {}
            }
        }
        info!(
            new_peaks,
            peak_height = ?chain.current_peak().map(HeaderBlock::height),
            "Added blocks"
        );
        Ok(new_peaks)
    }

    pub async fn peak_height(&self) -> Option<u32> {
        self.chain.read().await.current_peak().map(HeaderBlock::height)
    }

    pub async fn current_peak(&self) -> Option<HeaderBlock> {
        self.chain.read().await.current_peak().cloned()
    }

    pub async fn latest_timestamp(&self) -> u64 {
        self.chain.read().await.latest_timestamp()
    }

    /// The chain behind the lock, for queries not mirrored here.
    pub fn chain(&self) -> Arc<RwLock<HeaderChain>> {
        self.chain.clone()
    }
}
