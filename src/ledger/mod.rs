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

//! Grouped anonymity-set ledger. Committed coins are appended to
//! bounded groups per property, spent serials are tracked to reject
//! double-spends, and every write records the block that caused it so
//! a reorg can roll the whole state back to a height.

use std::sync::{Arc, Mutex};

use darkfi_serial::{deserialize, serialize, SerialDecodable, SerialEncodable};
use log::{debug, info};
use pasta_curves::{group::ff::PrimeField, pallas};
use sled::{transaction::ConflictableTransactionError, Transactional};

use crate::{
    crypto::{MintEntryId, PublicCoin},
    event::{MintAdded, MintNotifier, MintRemoved},
    types::{PropertyId, TxId},
    Error, Result,
};

/// Composite tree key codec
pub mod keys;

pub const SLED_MINT_CONFIG_TREE: &[u8] = b"_mint_config";
pub const SLED_SPENT_SERIALS_TREE: &[u8] = b"_spent_serials";
pub const SLED_COINS_TREE: &[u8] = b"_coins";
pub const SLED_COIN_INDEX_TREE: &[u8] = b"_coin_index";
pub const SLED_TAG_INDEX_TREE: &[u8] = b"_tag_index";

const GROUP_CONFIG_KEY: &[u8] = b"group_config";

/// Maximum number of coins per anonymity group.
pub const DEFAULT_GROUP_SIZE: u32 = 65000;
/// Number of trailing coins copied into a freshly opened group.
pub const DEFAULT_START_GROUP_SIZE: u32 = 16000;

/// Group sizing parameters, pinned on first open. A database written
/// with one sizing cannot be reopened with another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, SerialEncodable, SerialDecodable)]
pub struct GroupConfig {
    pub group_size: u32,
    pub start_group_size: u32,
}

/// One stored coin. `block` is the height of the write that placed this
/// record, so carried-forward copies carry the height of the rollover,
/// not of the original mint.
#[derive(Debug, Clone, PartialEq, Eq, SerialEncodable, SerialDecodable)]
pub struct CoinRecord {
    pub coin: PublicCoin,
    pub id: MintEntryId,
    pub amount: u64,
    pub block: u32,
    /// Opaque caller payload carried alongside the coin
    pub aux: Vec<u8>,
}

/// Canonical position of a mint, recorded in the index trees. Only the
/// placement from the coin's first write is canonical; carried copies
/// are never indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, SerialEncodable, SerialDecodable)]
pub struct CoinPlacement {
    pub group: u32,
    pub index: u64,
    pub block: u32,
}

/// Record of a serial revealed by a spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, SerialEncodable, SerialDecodable)]
pub struct SpentSerialRecord {
    pub block: u32,
    pub spend_tx: TxId,
}

/// Structure holding all sled trees of the mint ledger.
pub struct MintLedger {
    db: sled::Db,
    serials: sled::Tree,
    coins: sled::Tree,
    coin_index: sled::Tree,
    tag_index: sled::Tree,
    group_size: u32,
    start_group_size: u32,
    notifier: Arc<MintNotifier>,
    // Serializes read-then-append sequences against each other
    write_lock: Mutex<()>,
}

impl MintLedger {
    /// Instantiate a new `MintLedger` over the given sled database.
    pub fn new(db: &sled::Db, group_size: u32, start_group_size: u32) -> Result<Self> {
        if start_group_size == 0 || start_group_size >= group_size {
            return Err(Error::InvalidGroupConfig)
        }

        let config = db.open_tree(SLED_MINT_CONFIG_TREE)?;
        let serials = db.open_tree(SLED_SPENT_SERIALS_TREE)?;
        let coins = db.open_tree(SLED_COINS_TREE)?;
        let coin_index = db.open_tree(SLED_COIN_INDEX_TREE)?;
        let tag_index = db.open_tree(SLED_TAG_INDEX_TREE)?;

        match config.get(GROUP_CONFIG_KEY)? {
            Some(bytes) => {
                let stored: GroupConfig =
                    deserialize(&bytes).map_err(|_| Error::DecodeError("group config"))?;
                if stored.group_size != group_size || stored.start_group_size != start_group_size
                {
                    return Err(Error::ConfigMismatch(
                        stored.group_size,
                        stored.start_group_size,
                        group_size,
                        start_group_size,
                    ))
                }
            }
            None => {
                config.insert(
                    GROUP_CONFIG_KEY,
                    serialize(&GroupConfig { group_size, start_group_size }),
                )?;
            }
        }

        info!(target: "ledger::mint", "Opened mint ledger (group_size={group_size}, start_group_size={start_group_size})");

        Ok(Self {
            db: db.clone(),
            serials,
            coins,
            coin_index,
            tag_index,
            group_size,
            start_group_size,
            notifier: Arc::new(MintNotifier::new()),
            write_lock: Mutex::new(()),
        })
    }

    /// Open a ledger with the default group sizing.
    pub fn open(db: &sled::Db) -> Result<Self> {
        Self::new(db, DEFAULT_GROUP_SIZE, DEFAULT_START_GROUP_SIZE)
    }

    /// Shared handle to the change notifier
    pub fn notifier(&self) -> Arc<MintNotifier> {
        self.notifier.clone()
    }

    /// Check whether a serial has already been revealed by a spend.
    pub fn has_serial(&self, property: PropertyId, serial: &pallas::Base) -> Result<bool> {
        Ok(self.serials.contains_key(keys::serial_key(property, &serial.to_repr()))?)
    }

    /// Look up the spend that revealed a serial.
    pub fn spend_tx(
        &self,
        property: PropertyId,
        serial: &pallas::Base,
    ) -> Result<Option<SpentSerialRecord>> {
        match self.serials.get(keys::serial_key(property, &serial.to_repr()))? {
            Some(bytes) => Ok(Some(
                deserialize(&bytes).map_err(|_| Error::DecodeError("spent serial record"))?,
            )),
            None => Ok(None),
        }
    }

    /// Mark a serial as spent. Rejects serials already marked.
    pub fn write_serial(
        &self,
        property: PropertyId,
        serial: &pallas::Base,
        block: u32,
        spend_tx: TxId,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();

        let key = keys::serial_key(property, &serial.to_repr());
        if self.serials.contains_key(key)? {
            return Err(Error::DuplicateSerial)
        }

        self.serials.insert(&key[..], serialize(&SpentSerialRecord { block, spend_tx }))?;
        Ok(())
    }

    /// Highest anonymity group holding any coin of the property.
    pub fn last_group(&self, property: PropertyId) -> Result<Option<u32>> {
        let probe = keys::coin_key(property, u32::MAX, u64::MAX);
        match self.coins.get_lt(probe)? {
            Some((key, _)) if key.starts_with(&keys::property_prefix(property)) => {
                let (_, group, _) = keys::decode_coin_key(&key)?;
                Ok(Some(group))
            }
            _ => Ok(None),
        }
    }

    /// Next free index within a group, recovered from the tree itself:
    /// seek to the highest existing key under the group prefix and step
    /// past it. Stays correct across restarts and rollbacks.
    pub fn next_sequence(&self, property: PropertyId, group: u32) -> Result<u64> {
        let prefix = keys::group_prefix(property, group);
        let probe = keys::coin_key(property, group, u64::MAX);
        match self.coins.get_lt(probe)? {
            Some((key, _)) if key.starts_with(&prefix) => {
                let (_, _, index) = keys::decode_coin_key(&key)?;
                Ok(index + 1)
            }
            _ => Ok(0),
        }
    }

    /// Append a committed coin to the property's newest group and index
    /// its canonical placement. When the group is full, the next group
    /// is opened and seeded with copies of the previous group's tail so
    /// consecutive anonymity sets overlap. Returns the placement.
    pub fn write_mint(
        &self,
        property: PropertyId,
        coin: &PublicCoin,
        id: &MintEntryId,
        amount: u64,
        block: u32,
        aux: &[u8],
    ) -> Result<(u32, u64)> {
        let _guard = self.write_lock.lock().unwrap();

        if self.tag_index.contains_key(keys::index_key(property, id.as_bytes()))? {
            return Err(Error::DuplicateMint)
        }

        let mut group = self.last_group(property)?.unwrap_or(0);
        let mut index = self.next_sequence(property, group)?;

        let mut staged: Vec<([u8; 16], Vec<u8>)> = vec![];

        if index >= u64::from(self.group_size) {
            let carry_from = u64::from(self.group_size - self.start_group_size);
            let lo = keys::coin_key(property, group, carry_from);
            let hi = keys::coin_key(property, group, u64::MAX);

            group += 1;
            index = 0;

            // Copies are stamped with the height of this write, so a
            // rollback past it drops the entire new group at once.
            for item in self.coins.range(lo..hi) {
                let (_, value) = item?;
                let mut rec: CoinRecord =
                    deserialize(&value).map_err(|_| Error::DecodeError("coin record"))?;
                rec.block = block;
                staged.push((keys::coin_key(property, group, index), serialize(&rec)));
                index += 1;
            }

            debug!(target: "ledger::mint", "Opened group {group} for property {property} with {index} carried coins");
        }

        let rec = CoinRecord { coin: *coin, id: *id, amount, block, aux: aux.to_vec() };
        staged.push((keys::coin_key(property, group, index), serialize(&rec)));

        let placement_bytes = serialize(&CoinPlacement { group, index, block });
        let coin_idx_key = keys::index_key(property, &coin.value_hash());
        let tag_idx_key = keys::index_key(property, id.as_bytes());

        (&self.coins, &self.coin_index, &self.tag_index)
            .transaction(|(coins, coin_index, tag_index)| {
                for (key, value) in &staged {
                    coins.insert(&key[..], value.clone())?;
                }
                coin_index.insert(&coin_idx_key[..], placement_bytes.clone())?;
                tag_index.insert(&tag_idx_key[..], placement_bytes.clone())?;
                Ok::<(), ConflictableTransactionError<()>>(())
            })
            .map_err(|e| Error::PersistenceError(format!("{e:?}")))?;

        debug!(target: "ledger::mint", "Wrote mint {id} at ({group}, {index}) for property {property}");

        self.notifier.notify_added(&MintAdded {
            property,
            id: *id,
            group,
            index,
            amount: Some(amount),
        });

        Ok((group, index))
    }

    /// Read up to `count` coins of an anonymity group, in index order.
    pub fn get_anonymity_group(
        &self,
        property: PropertyId,
        group: u32,
        count: usize,
    ) -> Result<Vec<PublicCoin>> {
        let mut coins = Vec::with_capacity(count);
        for item in self.coins.scan_prefix(keys::group_prefix(property, group)).take(count) {
            let (_, value) = item?;
            let rec: CoinRecord =
                deserialize(&value).map_err(|_| Error::DecodeError("coin record"))?;
            coins.push(rec.coin);
        }
        Ok(coins)
    }

    /// Check whether a committed coin is recorded for the property.
    pub fn has_mint(&self, property: PropertyId, coin: &PublicCoin) -> Result<bool> {
        Ok(self.coin_index.contains_key(keys::index_key(property, &coin.value_hash()))?)
    }

    /// Check whether a mint identity is recorded for the property.
    pub fn has_mint_id(&self, property: PropertyId, id: &MintEntryId) -> Result<bool> {
        Ok(self.tag_index.contains_key(keys::index_key(property, id.as_bytes()))?)
    }

    /// Canonical placement of a mint, if recorded.
    pub fn mint_placement(
        &self,
        property: PropertyId,
        id: &MintEntryId,
    ) -> Result<Option<CoinPlacement>> {
        match self.tag_index.get(keys::index_key(property, id.as_bytes()))? {
            Some(bytes) => {
                Ok(Some(deserialize(&bytes).map_err(|_| Error::DecodeError("coin placement"))?))
            }
            None => Ok(None),
        }
    }

    /// Remove every coin and spent serial written at or after
    /// `start_block`, across all properties, in one atomic sweep.
    /// Removal events fire only for mints whose canonical placement is
    /// among the removed records. Idempotent.
    pub fn delete_all(&self, start_block: u32) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();

        let mut coin_keys: Vec<Vec<u8>> = vec![];
        let mut coin_index_keys: Vec<Vec<u8>> = vec![];
        let mut tag_index_keys: Vec<Vec<u8>> = vec![];
        let mut removed_events: Vec<MintRemoved> = vec![];

        for item in self.coins.iter() {
            let (key, value) = item?;
            let rec: CoinRecord =
                deserialize(&value).map_err(|_| Error::DecodeError("coin record"))?;
            if rec.block < start_block {
                continue
            }

            let (property, group, index) = keys::decode_coin_key(&key)?;
            let tag_key = keys::index_key(property, rec.id.as_bytes());
            if let Some(pbytes) = self.tag_index.get(tag_key)? {
                let placement: CoinPlacement =
                    deserialize(&pbytes).map_err(|_| Error::DecodeError("coin placement"))?;
                if placement.group == group && placement.index == index {
                    coin_index_keys.push(keys::index_key(property, &rec.coin.value_hash()).to_vec());
                    tag_index_keys.push(tag_key.to_vec());
                    removed_events.push(MintRemoved { property, id: rec.id });
                }
            }

            coin_keys.push(key.to_vec());
        }

        let mut serial_keys: Vec<Vec<u8>> = vec![];
        for item in self.serials.iter() {
            let (key, value) = item?;
            let rec: SpentSerialRecord =
                deserialize(&value).map_err(|_| Error::DecodeError("spent serial record"))?;
            if rec.block >= start_block {
                serial_keys.push(key.to_vec());
            }
        }

        if coin_keys.is_empty() && serial_keys.is_empty() {
            return Ok(())
        }

        (&self.coins, &self.coin_index, &self.tag_index, &self.serials)
            .transaction(|(coins, coin_index, tag_index, serials)| {
                for key in &coin_keys {
                    coins.remove(key.clone())?;
                }
                for key in &coin_index_keys {
                    coin_index.remove(key.clone())?;
                }
                for key in &tag_index_keys {
                    tag_index.remove(key.clone())?;
                }
                for key in &serial_keys {
                    serials.remove(key.clone())?;
                }
                Ok::<(), ConflictableTransactionError<()>>(())
            })
            .map_err(|e| Error::PersistenceError(format!("{e:?}")))?;

        info!(
            target: "ledger::mint",
            "Rolled back to block {start_block}: removed {} coins, {} serials",
            coin_keys.len(),
            serial_keys.len()
        );

        for event in &removed_events {
            self.notifier.notify_removed(event);
        }

        Ok(())
    }

    /// Flush dirty tree buffers to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex as StdMutex};

    use super::*;
    use crate::keystore::KeyId;

    fn ledger(group_size: u32, start_group_size: u32) -> (sled::Db, MintLedger) {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let ledger = MintLedger::new(&db, group_size, start_group_size).unwrap();
        (db, ledger)
    }

    fn coin(n: u64) -> (PublicCoin, MintEntryId) {
        let serial = pallas::Base::from(n);
        let randomness = pallas::Base::from(n + 1000);
        let seed_id = KeyId::from_bytes([7u8; 20]);
        (PublicCoin::new(serial, 1, randomness), MintEntryId::new(serial, randomness, &seed_id))
    }

    #[test]
    fn sequence_starts_at_zero_and_increments() {
        let (_db, ledger) = ledger(10, 2);
        assert_eq!(ledger.next_sequence(1, 0).unwrap(), 0);
        assert_eq!(ledger.last_group(1).unwrap(), None);

        for n in 0..3 {
            let (c, id) = coin(n);
            let placement = ledger.write_mint(1, &c, &id, 100, 5, &[]).unwrap();
            assert_eq!(placement, (0, n));
        }

        assert_eq!(ledger.next_sequence(1, 0).unwrap(), 3);
        assert_eq!(ledger.last_group(1).unwrap(), Some(0));
        // Other properties are unaffected
        assert_eq!(ledger.next_sequence(2, 0).unwrap(), 0);
    }

    #[test]
    fn group_rollover_carries_the_tail_forward() {
        let (_db, ledger) = ledger(3, 1);

        let mut coins = vec![];
        for n in 0..3 {
            let (c, id) = coin(n);
            coins.push(c);
            assert_eq!(ledger.write_mint(1, &c, &id, 100, 5, &[]).unwrap(), (0, n));
        }

        // Group 0 is full. The fourth mint opens group 1, seeded with a
        // copy of the last coin of group 0.
        let (d, d_id) = coin(3);
        assert_eq!(ledger.write_mint(1, &d, &d_id, 100, 6, &[]).unwrap(), (1, 1));

        assert_eq!(ledger.get_anonymity_group(1, 0, 10).unwrap(), coins);
        assert_eq!(ledger.get_anonymity_group(1, 1, 10).unwrap(), vec![coins[2], d]);

        // The carried copy keeps its canonical placement in group 0
        let (c_last, c_last_id) = coin(2);
        assert!(ledger.has_mint(1, &c_last).unwrap());
        let placement = ledger.mint_placement(1, &c_last_id).unwrap().unwrap();
        assert_eq!((placement.group, placement.index), (0, 2));
    }

    #[test]
    fn duplicate_mint_and_serial_are_rejected() {
        let (_db, ledger) = ledger(10, 2);

        let (c, id) = coin(1);
        ledger.write_mint(1, &c, &id, 50, 5, &[]).unwrap();
        assert!(matches!(ledger.write_mint(1, &c, &id, 50, 5, &[]), Err(Error::DuplicateMint)));

        let serial = pallas::Base::from(77);
        ledger.write_serial(1, &serial, 5, TxId::NULL).unwrap();
        assert!(ledger.has_serial(1, &serial).unwrap());
        assert!(matches!(
            ledger.write_serial(1, &serial, 6, TxId::NULL),
            Err(Error::DuplicateSerial)
        ));
        // Same serial under another property is distinct
        assert!(!ledger.has_serial(2, &serial).unwrap());
    }

    #[test]
    fn rollback_removes_from_start_block_and_is_idempotent() {
        let (_db, ledger) = ledger(10, 2);

        let (a, a_id) = coin(1);
        let (b, b_id) = coin(2);
        ledger.write_mint(1, &a, &a_id, 10, 1, &[]).unwrap();
        ledger.write_mint(1, &b, &b_id, 20, 2, &[]).unwrap();
        let serial = pallas::Base::from(55);
        ledger.write_serial(1, &serial, 2, TxId::NULL).unwrap();

        ledger.delete_all(2).unwrap();

        assert!(ledger.has_mint(1, &a).unwrap());
        assert!(!ledger.has_mint(1, &b).unwrap());
        assert!(!ledger.has_mint_id(1, &b_id).unwrap());
        assert!(!ledger.has_serial(1, &serial).unwrap());

        // The sequence recovers from the tree itself
        assert_eq!(ledger.next_sequence(1, 0).unwrap(), 1);
        let (c, c_id) = coin(3);
        assert_eq!(ledger.write_mint(1, &c, &c_id, 30, 3, &[]).unwrap(), (0, 1));

        // Re-running the same rollback is a no-op
        ledger.delete_all(2).unwrap();
        assert!(!ledger.has_mint(1, &c).unwrap());
        assert!(ledger.has_mint(1, &a).unwrap());
    }

    #[test]
    fn rollback_fires_removal_for_canonical_placements_only() {
        let (_db, ledger) = ledger(3, 1);

        let removed = Arc::new(StdMutex::new(Vec::new()));
        let removed_log = removed.clone();
        ledger.notifier().on_mint_removed(move |ev| {
            removed_log.lock().unwrap().push(ev.id);
        });

        for n in 0..3 {
            let (c, id) = coin(n);
            ledger.write_mint(1, &c, &id, 100, 5, &[]).unwrap();
        }
        // Rollover at block 6 copies coin 2 into group 1
        let (d, d_id) = coin(3);
        ledger.write_mint(1, &d, &d_id, 100, 6, &[]).unwrap();

        ledger.delete_all(6).unwrap();

        // Only the new mint loses its canonical placement. The copy of
        // coin 2 is dropped silently; its original in group 0 remains.
        assert_eq!(*removed.lock().unwrap(), vec![d_id]);
        let (_, c2_id) = coin(2);
        assert!(ledger.has_mint_id(1, &c2_id).unwrap());
        assert_eq!(ledger.last_group(1).unwrap(), Some(0));
        assert_eq!(ledger.next_sequence(1, 0).unwrap(), 3);
    }

    #[test]
    fn group_config_is_pinned() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let ledger = MintLedger::new(&db, 10, 2).unwrap();
        let (c, id) = coin(1);
        ledger.write_mint(1, &c, &id, 10, 1, &[]).unwrap();
        drop(ledger);

        assert!(matches!(MintLedger::new(&db, 20, 2), Err(Error::ConfigMismatch(10, 2, 20, 2))));
        assert!(MintLedger::new(&db, 10, 2).is_ok());
    }

    #[test]
    fn group_sizes_are_validated() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        assert!(matches!(MintLedger::new(&db, 10, 0), Err(Error::InvalidGroupConfig)));
        assert!(matches!(MintLedger::new(&db, 10, 10), Err(Error::InvalidGroupConfig)));
    }
}
