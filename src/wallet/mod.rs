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

//! Deterministic mint-pool wallet. Coin secrets are derived from wallet
//! keys ahead of need and parked in a lookahead pool as public
//! identities only, so every mint ever made is recoverable from the
//! wallet seed alone.

use std::sync::Mutex;

use log::{debug, info};

use crate::{
    crypto::{derive_key, CoinSecretKey, MintEntryId, SerialId, MINT_KEY_CHANGE},
    keystore::{KeyId, KeyStore},
    types::{MintAmount, PropertyId, TxId},
    Error, Result,
};

/// Lookahead pool of future mint identities
pub mod mint_pool;
pub use mint_pool::{MintPool, MINT_POOL_CAPACITY};

/// Persisted wallet record types
pub mod models;
pub use models::{MintChainState, MintPoolEntry, MintRecord};

/// sled-backed wallet persistence
pub mod store;
pub use store::WalletStore;

/// A freshly generated mint: its identity, the derived secret the
/// caller needs to build the mint transaction, and the persisted
/// record.
#[derive(Debug, Clone)]
pub struct NewMint {
    pub id: MintEntryId,
    pub secret: CoinSecretKey,
    pub record: MintRecord,
}

struct WalletInner {
    keys: Box<dyn KeyStore + Send>,
    pool: MintPool,
    master_id: KeyId,
}

/// The mint wallet. Owns the key store, the lookahead pool and the
/// persisted mint records.
pub struct MintWallet {
    store: WalletStore,
    capacity: usize,
    inner: Mutex<WalletInner>,
}

impl MintWallet {
    /// Instantiate a `MintWallet` with the default pool capacity.
    pub fn new(db: &sled::Db, keys: Box<dyn KeyStore + Send>) -> Result<Self> {
        Self::with_capacity(db, keys, MINT_POOL_CAPACITY)
    }

    pub fn with_capacity(
        db: &sled::Db,
        keys: Box<dyn KeyStore + Send>,
        capacity: usize,
    ) -> Result<Self> {
        let store = WalletStore::new(db)?;
        let master_id = keys.master_id()?;
        let wallet =
            Self { store, capacity, inner: Mutex::new(WalletInner { keys, pool: MintPool::new(), master_id }) };
        wallet.reload_master_key()?;
        Ok(wallet)
    }

    /// Rebuild the pool for the current master key: load the persisted
    /// entries, drop any not derivable from this master, top up to
    /// capacity when the key store is unlocked, and persist the result.
    /// Call after unlocking or switching the master key.
    pub fn reload_master_key(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let master_id = inner.keys.master_id()?;
        inner.master_id = master_id;

        inner.pool.clear();
        for entry in self.store.read_pool()? {
            if let Ok(path) = inner.keys.key_path(&entry.seed_id) {
                if path.master == master_id &&
                    path.change == MINT_KEY_CHANGE &&
                    path.index == entry.index
                {
                    inner.pool.insert(entry);
                }
            }
        }

        if !inner.keys.is_locked() {
            self.fill_pool(&mut inner)?;
        }
        self.store.write_pool(&inner.pool.entries(), None)?;

        info!(target: "wallet::mint", "Loaded mint pool with {} entries", inner.pool.len());
        Ok(())
    }

    fn fill_pool(&self, inner: &mut WalletInner) -> Result<()> {
        while inner.pool.len() < self.capacity {
            let seed_id = inner.keys.generate_key(MINT_KEY_CHANGE)?;
            let path = inner.keys.key_path(&seed_id)?;
            let secret = derive_key(inner.keys.as_ref(), &seed_id, path.index)?;
            let id = secret.mint_id(&seed_id);

            debug!(target: "wallet::mint", "Pooled future mint {id} at index {}", path.index);
            inner.pool.insert(MintPoolEntry { id, seed_id, index: path.index });
        }
        Ok(())
    }

    /// Take a coin out of the lookahead pool and persist it as a new
    /// mint of `amount` under `property`. An explicit `seed_id` selects
    /// the pool entry derived from that key when one exists, otherwise
    /// the oldest entry is used. The record is written before the pool
    /// slot is consumed, so a crash in between leaves a stale pool
    /// entry rather than a lost mint.
    pub fn generate_mint(
        &self,
        property: PropertyId,
        amount: MintAmount,
        seed_id: Option<KeyId>,
    ) -> Result<NewMint> {
        let mut inner = self.inner.lock().unwrap();

        if inner.pool.is_empty() {
            if !inner.keys.is_locked() {
                self.fill_pool(&mut inner)?;
                self.store.write_pool(&inner.pool.entries(), None)?;
            }
            if inner.pool.is_empty() {
                return Err(Error::PoolExhausted)
            }
        }

        let entry = match seed_id {
            Some(seed) => inner.pool.find_by_seed(&seed).or_else(|| inner.pool.first()),
            None => inner.pool.first(),
        }
        .copied()
        .ok_or(Error::PoolExhausted)?;

        let secret = derive_key(inner.keys.as_ref(), &entry.seed_id, entry.index)?;
        let record = MintRecord::new(property, amount, entry.seed_id, secret.serial_id());

        let mut batch = sled::Batch::default();
        self.store.write_mint(&entry.id, &record, Some(&mut batch))?;
        self.store.write_mint_id(&record.serial_id, &entry.id, Some(&mut batch))?;
        self.store.apply(batch)?;

        inner.pool.remove(&entry.id);
        if !inner.keys.is_locked() {
            self.fill_pool(&mut inner)?;
        }
        self.store.write_pool(&inner.pool.entries(), None)?;

        info!(target: "wallet::mint", "Generated mint {} for property {property}", entry.id);
        Ok(NewMint { id: entry.id, secret, record })
    }

    fn update_mint<F: FnOnce(&mut MintRecord)>(&self, id: &MintEntryId, f: F) -> Result<()> {
        // Read-modify-write, so hold the wallet lock for the duration
        let _inner = self.inner.lock().unwrap();

        let mut record = self.store.read_mint(id)?.ok_or(Error::MintNotFound)?;
        f(&mut record);
        self.store.write_mint(id, &record, None)
    }

    /// Record the transaction that created a mint.
    pub fn update_mint_created_tx(&self, id: &MintEntryId, tx: TxId) -> Result<()> {
        self.update_mint(id, |record| record.created_tx = tx)
    }

    /// Record a mint's on-chain placement.
    pub fn update_mint_chain_state(
        &self,
        id: &MintEntryId,
        chain_state: MintChainState,
    ) -> Result<()> {
        self.update_mint(id, |record| record.chain_state = chain_state)
    }

    /// Record the transaction that spent a mint.
    pub fn update_mint_spend_tx(&self, id: &MintEntryId, tx: TxId) -> Result<()> {
        self.update_mint(id, |record| record.spend_tx = tx)
    }

    /// Reset every mint to the unconfirmed, unspent state, in one
    /// atomic batch. Used before a full chain rescan.
    pub fn clear_mints_chain_state(&self) -> Result<()> {
        let _inner = self.inner.lock().unwrap();

        let mut batch = sled::Batch::default();
        let mut count = 0;
        for item in self.store.mints() {
            let (id, mut record) = item?;
            record.chain_state.clear();
            record.spend_tx = TxId::NULL;
            self.store.write_mint(&id, &record, Some(&mut batch))?;
            count += 1;
        }
        self.store.apply(batch)?;

        info!(target: "wallet::mint", "Cleared chain state of {count} mints");
        Ok(())
    }

    /// Claim a mint seen on chain as ours, if it is. An id already in
    /// the wallet gets its chain data refreshed. An id matching a pool
    /// entry is derived, persisted with the given chain data, and its
    /// pool slot consumed. Returns whether the mint belongs to this
    /// wallet.
    pub fn try_recover_mint(
        &self,
        id: &MintEntryId,
        chain_state: MintChainState,
        spend_tx: Option<TxId>,
        property: PropertyId,
        amount: MintAmount,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(mut record) = self.store.read_mint(id)? {
            record.chain_state = chain_state;
            if let Some(tx) = spend_tx {
                record.spend_tx = tx;
            }
            self.store.write_mint(id, &record, None)?;
            return Ok(true)
        }

        if !inner.pool.contains(id) {
            if inner.keys.is_locked() {
                return Ok(false)
            }
            self.fill_pool(&mut inner)?;
            self.store.write_pool(&inner.pool.entries(), None)?;
        }
        let Some(entry) = inner.pool.get(id).copied() else { return Ok(false) };

        let secret = derive_key(inner.keys.as_ref(), &entry.seed_id, entry.index)?;
        let mut record = MintRecord::new(property, amount, entry.seed_id, secret.serial_id());
        record.chain_state = chain_state;
        if let Some(tx) = spend_tx {
            record.spend_tx = tx;
        }

        let mut batch = sled::Batch::default();
        self.store.write_mint(id, &record, Some(&mut batch))?;
        self.store.write_mint_id(&record.serial_id, id, Some(&mut batch))?;
        self.store.apply(batch)?;

        inner.pool.remove(id);
        if !inner.keys.is_locked() {
            self.fill_pool(&mut inner)?;
        }
        self.store.write_pool(&inner.pool.entries(), None)?;

        info!(target: "wallet::mint", "Recovered mint {id} for property {property}");
        Ok(true)
    }

    /// Delete a mint that never confirmed and return its slot to the
    /// pool, so the underlying key is not burned. Confirmed mints are
    /// refused.
    pub fn delete_unconfirmed_mint(&self, id: &MintEntryId) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();

        let record = self.store.read_mint(id)?.ok_or(Error::MintNotFound)?;
        if record.chain_state.is_on_chain() {
            return Err(Error::MintOnChain)
        }

        let mut batch = sled::Batch::default();
        self.store.erase_mint(id, Some(&mut batch))?;
        self.store.erase_mint_id(&record.serial_id, Some(&mut batch))?;
        self.store.apply(batch)?;

        if let Ok(path) = inner.keys.key_path(&record.seed_id) {
            if path.master == inner.master_id && path.change == MINT_KEY_CHANGE {
                inner.pool.insert(MintPoolEntry {
                    id: *id,
                    seed_id: record.seed_id,
                    index: path.index,
                });
                self.store.write_pool(&inner.pool.entries(), None)?;
            }
        }

        Ok(())
    }

    /// Re-derive the full coin secret for one of our seed ids.
    pub fn private_key(&self, seed_id: &KeyId) -> Result<CoinSecretKey> {
        let inner = self.inner.lock().unwrap();
        let path = inner.keys.key_path(seed_id)?;
        derive_key(inner.keys.as_ref(), seed_id, path.index)
    }

    pub fn has_mint(&self, id: &MintEntryId) -> Result<bool> {
        self.store.has_mint(id)
    }

    pub fn has_mint_serial(&self, serial_id: &SerialId) -> Result<bool> {
        Ok(self.store.read_mint_id(serial_id)?.is_some())
    }

    pub fn get_mint(&self, id: &MintEntryId) -> Result<MintRecord> {
        self.store.read_mint(id)?.ok_or(Error::MintNotFound)
    }

    pub fn get_mint_id(&self, serial_id: &SerialId) -> Result<MintEntryId> {
        self.store.read_mint_id(serial_id)?.ok_or(Error::MintNotFound)
    }

    /// Look up one of our mints by the digest of its serial, as seen in
    /// a spend on chain.
    pub fn get_mint_by_serial(&self, serial_id: &SerialId) -> Result<(MintEntryId, MintRecord)> {
        let id = self.get_mint_id(serial_id)?;
        Ok((id, self.get_mint(&id)?))
    }

    /// List stored mints, optionally filtered.
    pub fn list_mints(
        &self,
        unspent_only: bool,
        confirmed_only: bool,
    ) -> Result<Vec<(MintEntryId, MintRecord)>> {
        let mut mints = vec![];
        for item in self.store.mints() {
            let (id, record) = item?;
            if unspent_only && record.is_spent() {
                continue
            }
            if confirmed_only && !record.chain_state.is_on_chain() {
                continue
            }
            mints.push((id, record));
        }
        Ok(mints)
    }

    pub fn is_mint_in_pool(&self, id: &MintEntryId) -> bool {
        self.inner.lock().unwrap().pool.contains(id)
    }

    pub fn get_mint_pool_entry(&self, id: &MintEntryId) -> Option<MintPoolEntry> {
        self.inner.lock().unwrap().pool.get(id).copied()
    }

    /// Snapshot of the pool in derivation order
    pub fn pool_entries(&self) -> Vec<MintPoolEntry> {
        self.inner.lock().unwrap().pool.entries()
    }

    pub fn pool_len(&self) -> usize {
        self.inner.lock().unwrap().pool.len()
    }

    /// Flush dirty wallet buffers to disk.
    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }
}
