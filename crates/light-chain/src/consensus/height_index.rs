use std::collections::BTreeMap;

use alloy_primitives::B256;

/// Height to header hash mapping of the canonical chain only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeightIndex {
    hashes: BTreeMap<u32, B256>,
}

impl HeightIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, height: u32, header_hash: B256) {
        self.hashes.insert(height, header_hash);
    }

    pub fn get(&self, height: u32) -> Option<B256> {
        self.hashes.get(&height).copied()
    }

    pub fn contains(&self, height: u32) -> bool {
        self.hashes.contains_key(&height)
    }

    /// True if `header_hash` is the canonical block at `height`.
    pub fn is_canonical(&self, height: u32, header_hash: &B256) -> bool {
        self.hashes.get(&height) == Some(header_hash)
    }

    /// Drops every entry above `height`.
    pub fn truncate_above(&mut self, height: u32) {
        if let Some(first_removed) = height.checked_add(1) {
            self.hashes.split_off(&first_removed);
        }
    }

    pub fn clear(&mut self) {
        self.hashes.clear();
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn max_height(&self) -> Option<u32> {
        self.hashes.keys().next_back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, B256)> + '_ {
        self.hashes.iter().map(|(height, hash)| (*height, *hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_fork_height() {
        let mut index = HeightIndex::new();
        for height in 0..6 {
            index.insert(height, B256::with_last_byte(height as u8));
        }
        index.truncate_above(2);
        assert_eq!(index.max_height(), Some(2));
        assert!(index.is_canonical(2, &B256::with_last_byte(2)));
        assert!(!index.contains(3));

        index.truncate_above(u32::MAX);
        assert_eq!(index.len(), 3);
    }
}
