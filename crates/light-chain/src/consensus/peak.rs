use std::sync::Arc;

use tracing::info;

use crate::{
    consensus::constants::PEAK_BLOCK_KEY,
    database::{get_object, set_object, ObjectStore},
    errors::StoreError,
    types::HeaderBlock,
};

/// Holds the current tip and mirrors it in the object store.
///
/// Once loaded, the in-memory tip is authoritative.
pub struct PeakTracker {
    store: Arc<dyn ObjectStore>,
    peak: Option<HeaderBlock>,
    latest_timestamp: u64,
}

impl PeakTracker {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            peak: None,
            latest_timestamp: 0,
        }
    }

    /// Returns the tip, loading it from the object store if none is held in memory.
    pub async fn current(&mut self) -> Result<Option<HeaderBlock>, StoreError> {
        if self.peak.is_none() {
            self.peak = get_object(self.store.as_ref(), PEAK_BLOCK_KEY).await?;
        }
        Ok(self.peak.clone())
    }

    /// The in-memory tip.
    pub fn peak(&self) -> Option<&HeaderBlock> {
        self.peak.as_ref()
    }

    pub fn height(&self) -> u32 {
        self.peak.as_ref().map(HeaderBlock::height).unwrap_or(0)
    }

    pub fn latest_timestamp(&self) -> u64 {
        self.latest_timestamp
    }

    /// Persists `block` as the tip, then makes it the in-memory tip.
    ///
    /// The latest timestamp becomes `timestamp` if given, else the block's transaction timestamp
    /// if it has one, else stays unchanged. Nothing in memory changes if the write fails.
    pub async fn set(
        &mut self,
        block: HeaderBlock,
        timestamp: Option<u64>,
    ) -> Result<(), StoreError> {
        set_object(self.store.as_ref(), PEAK_BLOCK_KEY, &block).await?;

        if let Some(timestamp) = timestamp.or_else(|| block.timestamp()) {
            self.latest_timestamp = timestamp;
        }
        info!(
            height = block.height(),
            weight = %block.weight(),
            timestamp = self.latest_timestamp,
            "Peak set"
        );
        self.peak = Some(block);
        Ok(())
    }

    /// Removes the persisted tip. The in-memory tip is kept.
    pub async fn remove_persisted(&self) -> Result<(), StoreError> {
        self.store.remove_object(PEAK_BLOCK_KEY).await
    }
}

impl std::fmt::Debug for PeakTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeakTracker")
            .field("height", &self.height())
            .field("latest_timestamp", &self.latest_timestamp)
            .finish_non_exhaustive()
    }
}
