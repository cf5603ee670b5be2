/* This file is part of DarkFi (https://dark.fi)
 *
 * Copyright (C) 2020-2024 Dyne.org foundation
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::collections::{BTreeMap, HashMap};

use crate::{crypto::MintEntryId, keystore::KeyId, wallet::models::MintPoolEntry};

/// Number of future mints kept derived ahead of need.
pub const MINT_POOL_CAPACITY: usize = 20;

/// The lookahead pool: future mint identities ordered by derivation
/// index, with an id lookup on the side. Entries are consumed from the
/// front (lowest index first) so a restored wallet replays coins in
/// the order they were originally handed out.
#[derive(Default)]
pub struct MintPool {
    by_index: BTreeMap<u32, MintPoolEntry>,
    by_id: HashMap<MintEntryId, u32>,
}

impl MintPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }

    pub fn contains(&self, id: &MintEntryId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn get(&self, id: &MintEntryId) -> Option<&MintPoolEntry> {
        self.by_id.get(id).and_then(|index| self.by_index.get(index))
    }

    /// Insert an entry. A duplicate index replaces the previous entry.
    pub fn insert(&mut self, entry: MintPoolEntry) {
        if let Some(old) = self.by_index.insert(entry.index, entry) {
            self.by_id.remove(&old.id);
        }
        self.by_id.insert(entry.id, entry.index);
    }

    /// The entry with the lowest derivation index
    pub fn first(&self) -> Option<&MintPoolEntry> {
        self.by_index.values().next()
    }

    /// Find the lowest-index entry derived from a given seed id
    pub fn find_by_seed(&self, seed_id: &KeyId) -> Option<&MintPoolEntry> {
        self.by_index.values().find(|entry| entry.seed_id == *seed_id)
    }

    /// Remove an entry by id. Returns whether it was present.
    pub fn remove(&mut self, id: &MintEntryId) -> bool {
        match self.by_id.remove(id) {
            Some(index) => {
                self.by_index.remove(&index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.by_index.clear();
        self.by_id.clear();
    }

    /// Entries in index order
    pub fn iter(&self) -> impl Iterator<Item = &MintPoolEntry> {
        self.by_index.values()
    }

    /// Snapshot of the entries in index order, for persistence
    pub fn entries(&self) -> Vec<MintPoolEntry> {
        self.by_index.values().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(index: u32) -> MintPoolEntry {
        MintPoolEntry {
            id: MintEntryId::from_bytes([index as u8; 32]),
            seed_id: KeyId::from_bytes([index as u8; 20]),
            index,
        }
    }

    #[test]
    fn entries_come_out_in_index_order() {
        let mut pool = MintPool::new();
        pool.insert(entry(5));
        pool.insert(entry(1));
        pool.insert(entry(3));

        assert_eq!(pool.len(), 3);
        assert_eq!(pool.first().unwrap().index, 1);
        let indices: Vec<_> = pool.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![1, 3, 5]);
    }

    #[test]
    fn remove_keeps_both_maps_in_sync() {
        let mut pool = MintPool::new();
        let e = entry(2);
        pool.insert(e);
        pool.insert(entry(4));

        assert!(pool.remove(&e.id));
        assert!(!pool.remove(&e.id));
        assert!(!pool.contains(&e.id));
        assert_eq!(pool.first().unwrap().index, 4);
    }

    #[test]
    fn find_by_seed_returns_the_lowest_index() {
        let mut pool = MintPool::new();
        let seed = KeyId::from_bytes([9u8; 20]);
        pool.insert(MintPoolEntry { id: MintEntryId::from_bytes([1u8; 32]), seed_id: seed, index: 7 });
        pool.insert(MintPoolEntry { id: MintEntryId::from_bytes([2u8; 32]), seed_id: seed, index: 3 });

        assert_eq!(pool.find_by_seed(&seed).unwrap().index, 3);
        assert!(pool.find_by_seed(&KeyId::from_bytes([0u8; 20])).is_none());
    }

    #[test]
    fn clear_empties_both_maps() {
        let mut pool = MintPool::new();
        for i in 0..5 {
            pool.insert(entry(i));
        }
        pool.clear();
        assert!(pool.is_empty());
        assert!(!pool.contains(&entry(2).id));
    }
}
