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

//! Persistence for the wallet's mint records, serial lookup index and
//! lookahead pool. Everything lives in one sled tree under distinct key
//! prefixes, so any combination of writes can go through a single
//! atomic batch.

use darkfi_serial::{deserialize, serialize};

use crate::{
    crypto::{MintEntryId, SerialId},
    wallet::models::{MintPoolEntry, MintRecord},
    Error, Result,
};

pub const SLED_MINT_WALLET_TREE: &[u8] = b"_mint_wallet";

const MINT_PREFIX: u8 = b'm';
const SERIAL_PREFIX: u8 = b's';
const POOL_KEY: &[u8] = b"_pool";

fn mint_key(id: &MintEntryId) -> [u8; 33] {
    let mut key = [0u8; 33];
    key[0] = MINT_PREFIX;
    key[1..].copy_from_slice(id.as_bytes());
    key
}

fn serial_key(serial_id: &SerialId) -> [u8; 21] {
    let mut key = [0u8; 21];
    key[0] = SERIAL_PREFIX;
    key[1..].copy_from_slice(serial_id.as_bytes());
    key
}

/// Structure holding the wallet's sled tree. Write methods optionally
/// stage into a caller-owned batch instead of writing directly, so a
/// mint record and its serial index entry land atomically.
pub struct WalletStore {
    tree: sled::Tree,
}

impl WalletStore {
    pub fn new(db: &sled::Db) -> Result<Self> {
        Ok(Self { tree: db.open_tree(SLED_MINT_WALLET_TREE)? })
    }

    fn put(&self, key: Vec<u8>, value: Vec<u8>, batch: Option<&mut sled::Batch>) -> Result<()> {
        match batch {
            Some(batch) => {
                batch.insert(key, value);
                Ok(())
            }
            None => {
                self.tree.insert(key, value)?;
                Ok(())
            }
        }
    }

    fn del(&self, key: Vec<u8>, batch: Option<&mut sled::Batch>) -> Result<()> {
        match batch {
            Some(batch) => {
                batch.remove(key);
                Ok(())
            }
            None => {
                self.tree.remove(key)?;
                Ok(())
            }
        }
    }

    /// Apply a staged batch atomically.
    pub fn apply(&self, batch: sled::Batch) -> Result<()> {
        self.tree.apply_batch(batch)?;
        Ok(())
    }

    pub fn write_mint(
        &self,
        id: &MintEntryId,
        record: &MintRecord,
        batch: Option<&mut sled::Batch>,
    ) -> Result<()> {
        self.put(mint_key(id).to_vec(), serialize(record), batch)
    }

    pub fn read_mint(&self, id: &MintEntryId) -> Result<Option<MintRecord>> {
        match self.tree.get(mint_key(id))? {
            Some(bytes) => {
                Ok(Some(deserialize(&bytes).map_err(|_| Error::DecodeError("mint record"))?))
            }
            None => Ok(None),
        }
    }

    pub fn has_mint(&self, id: &MintEntryId) -> Result<bool> {
        Ok(self.tree.contains_key(mint_key(id))?)
    }

    pub fn erase_mint(&self, id: &MintEntryId, batch: Option<&mut sled::Batch>) -> Result<()> {
        self.del(mint_key(id).to_vec(), batch)
    }

    pub fn write_mint_id(
        &self,
        serial_id: &SerialId,
        id: &MintEntryId,
        batch: Option<&mut sled::Batch>,
    ) -> Result<()> {
        self.put(serial_key(serial_id).to_vec(), serialize(id), batch)
    }

    pub fn read_mint_id(&self, serial_id: &SerialId) -> Result<Option<MintEntryId>> {
        match self.tree.get(serial_key(serial_id))? {
            Some(bytes) => {
                Ok(Some(deserialize(&bytes).map_err(|_| Error::DecodeError("mint id"))?))
            }
            None => Ok(None),
        }
    }

    pub fn erase_mint_id(
        &self,
        serial_id: &SerialId,
        batch: Option<&mut sled::Batch>,
    ) -> Result<()> {
        self.del(serial_key(serial_id).to_vec(), batch)
    }

    pub fn write_pool(
        &self,
        entries: &[MintPoolEntry],
        batch: Option<&mut sled::Batch>,
    ) -> Result<()> {
        self.put(POOL_KEY.to_vec(), serialize(&entries.to_vec()), batch)
    }

    pub fn read_pool(&self) -> Result<Vec<MintPoolEntry>> {
        match self.tree.get(POOL_KEY)? {
            Some(bytes) => {
                Ok(deserialize(&bytes).map_err(|_| Error::DecodeError("mint pool"))?)
            }
            None => Ok(vec![]),
        }
    }

    /// Iterate over all stored mint records.
    pub fn mints(&self) -> MintIter {
        MintIter { inner: self.tree.scan_prefix([MINT_PREFIX]) }
    }

    /// Flush dirty buffers to disk.
    pub fn flush(&self) -> Result<()> {
        self.tree.flush()?;
        Ok(())
    }
}

/// Iterator over the stored `(id, record)` pairs.
pub struct MintIter {
    inner: sled::Iter,
}

impl Iterator for MintIter {
    type Item = Result<(MintEntryId, MintRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next()?;
        Some(item.map_err(Error::from).and_then(|(key, value)| {
            if key.len() != 33 {
                return Err(Error::DecodeError("malformed mint record key"))
            }
            let mut id = [0u8; 32];
            id.copy_from_slice(&key[1..]);
            let record =
                deserialize(&value).map_err(|_| Error::DecodeError("mint record"))?;
            Ok((MintEntryId::from_bytes(id), record))
        }))
    }
}
