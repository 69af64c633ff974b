use std::collections::HashMap;

use alloy_primitives::B256;

use crate::types::BlockRecord;

/// Bounded window of block records keyed by header hash.
///
/// Records of every known fork are kept, not only the canonical chain, so that fork points can
/// be resolved later.
#[derive(Debug, Clone)]
pub struct BlockRecordStore {
    records: HashMap<B256, BlockRecord>,
    cache_size: u32,
}

impl BlockRecordStore {
    pub fn new(cache_size: u32) -> Self {
        Self {
            records: HashMap::new(),
            cache_size,
        }
    }

    /// Inserts `record`, replacing any record with the same hash.
    pub fn add(&mut self, record: BlockRecord) {
        self.records.insert(record.header_hash, record);
    }

    pub fn contains(&self, header_hash: &B256) -> bool {
        self.records.contains_key(header_hash)
    }

    pub fn get(&self, header_hash: &B256) -> Option<&BlockRecord> {
        self.records.get(header_hash)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn cache_size(&self) -> u32 {
        self.cache_size
    }

    /// Removes every record below `height_limit` and returns how many were removed.
    ///
    /// Nothing is removed while the store holds fewer than `cache_size` records.
    pub fn evict_below(&mut self, height_limit: u32) -> usize {
        if self.records.len() < self.cache_size as usize {
            return 0;
        }
        let before = self.records.len();
        self.records.retain(|_, record| record.height >= height_limit);
        before - self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(height: u32, nonce: u8) -> BlockRecord {
        BlockRecord {
            header_hash: B256::with_last_byte(nonce),
            prev_hash: B256::ZERO,
            height,
            weight: height as u128 * 10,
            total_iters: height as u128 * 100,
            required_iters: 1,
            sub_slot_iters: 1024,
            difficulty: 10,
            timestamp: None,
            is_transaction_block: false,
        }
    }

    #[test]
    fn add_is_idempotent() {
        let mut store = BlockRecordStore::new(10);
        store.add(record(3, 1));
        store.add(record(3, 1));
        assert_eq!(store.len(), 1);
        assert!(store.contains(&B256::with_last_byte(1)));
        assert_eq!(store.get(&B256::with_last_byte(1)), Some(&record(3, 1)));
        assert_eq!(store.get(&B256::with_last_byte(2)), None);
    }

    #[test]
    fn eviction_waits_for_a_full_cache() {
        let mut store = BlockRecordStore::new(5);
        for height in 0..4 {
            store.add(record(height, height as u8 + 1));
        }
        assert_eq!(store.evict_below(3), 0);
        assert_eq!(store.len(), 4);

        store.add(record(4, 5));
        assert_eq!(store.evict_below(3), 3);
        assert_eq!(store.len(), 2);
        assert!(!store.contains(&B256::with_last_byte(1)));
        assert!(store.contains(&B256::with_last_byte(4)));
    }
}
