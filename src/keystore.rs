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

//! Wallet key retrieval. The mint wallet does not own key material, it
//! asks a [`KeyStore`] for the per-seed keys the derivation layer
//! expands into coin secrets. Key metadata (the derivation path) stays
//! readable while the store is locked, the key bytes do not.

use core::fmt;
use std::{
    collections::HashMap,
    io::{Read, Write},
};

use darkfi_serial::{Decodable, Encodable, ReadExt, WriteExt};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};

use crate::{Error, Result};

/// Identifier of a key held by a [`KeyStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyId([u8; 20]);

impl KeyId {
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Encodable for KeyId {
    fn encode<S: Write>(&self, s: &mut S) -> std::io::Result<usize> {
        s.write_slice(&self.0)?;
        Ok(20)
    }
}

impl Decodable for KeyId {
    fn decode<D: Read>(d: &mut D) -> std::io::Result<Self> {
        let mut bytes = [0u8; 20];
        d.read_slice(&mut bytes)?;
        Ok(Self(bytes))
    }
}

/// Derivation path metadata recorded for every generated key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPath {
    /// Change class the key was generated under
    pub change: u32,
    /// Position within the change class
    pub index: u32,
    /// Master key the path hangs off
    pub master: KeyId,
}

/// Key-retrieval collaborator. Implementations hand out per-seed key
/// bytes and record the derivation path of every key they generate.
pub trait KeyStore {
    /// Whether key material is currently retrievable
    fn is_locked(&self) -> bool;

    /// Identifier of the current master key
    fn master_id(&self) -> Result<KeyId>;

    /// Generate the next key under the given change class and return
    /// its id. Fails with `KeyUnavailable` while locked.
    fn generate_key(&mut self, change: u32) -> Result<KeyId>;

    /// Retrieve the raw key bytes for a previously generated key.
    /// Fails with `KeyUnavailable` while locked or for unknown ids.
    fn key(&self, id: &KeyId) -> Result<[u8; 32]>;

    /// Retrieve the recorded derivation path. Metadata stays available
    /// while locked; unknown ids fail with `KeyUnavailable`.
    fn key_path(&self, id: &KeyId) -> Result<KeyPath>;
}

struct StoredKey {
    secret: [u8; 32],
    path: KeyPath,
}

/// Deterministic in-memory key store expanded from a single master
/// seed. Restoring from the same seed regenerates identical key ids,
/// which the pool-based mint recovery path relies on.
pub struct MemoryKeyStore {
    master_seed: [u8; 32],
    master_id: KeyId,
    locked: bool,
    keys: HashMap<KeyId, StoredKey>,
    next_index: HashMap<u32, u32>,
}

impl MemoryKeyStore {
    pub fn new(master_seed: [u8; 32]) -> Self {
        let digest: [u8; 32] = {
            let mut hasher = Sha256::new();
            hasher.update(b"master");
            hasher.update(master_seed);
            hasher.finalize().into()
        };
        let mut id = [0u8; 20];
        id.copy_from_slice(&digest[..20]);

        Self {
            master_seed,
            master_id: KeyId(id),
            locked: false,
            keys: HashMap::new(),
            next_index: HashMap::new(),
        }
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    fn expand(&self, change: u32, index: u32) -> ([u8; 32], KeyId) {
        let mut mac = Hmac::<Sha512>::new_from_slice(&self.master_seed)
            .expect("HMAC-SHA512 accepts any key length");
        mac.update(&change.to_le_bytes());
        mac.update(&index.to_le_bytes());
        let out = mac.finalize().into_bytes();

        let mut secret = [0u8; 32];
        secret.copy_from_slice(&out[..32]);

        // The key id is a truncated hash of the derived bytes, playing
        // the role of the original hash160 key fingerprint.
        let digest: [u8; 32] = Sha256::digest(secret).into();
        let mut id = [0u8; 20];
        id.copy_from_slice(&digest[..20]);

        (secret, KeyId(id))
    }
}

impl KeyStore for MemoryKeyStore {
    fn is_locked(&self) -> bool {
        self.locked
    }

    fn master_id(&self) -> Result<KeyId> {
        Ok(self.master_id)
    }

    fn generate_key(&mut self, change: u32) -> Result<KeyId> {
        if self.locked {
            return Err(Error::KeyUnavailable("key store is locked"))
        }

        let index = *self.next_index.get(&change).unwrap_or(&0);
        let (secret, id) = self.expand(change, index);

        let path = KeyPath { change, index, master: self.master_id };
        self.keys.insert(id, StoredKey { secret, path });
        self.next_index.insert(change, index + 1);

        Ok(id)
    }

    fn key(&self, id: &KeyId) -> Result<[u8; 32]> {
        if self.locked {
            return Err(Error::KeyUnavailable("key store is locked"))
        }

        match self.keys.get(id) {
            Some(stored) => Ok(stored.secret),
            None => Err(Error::KeyUnavailable("unknown key id")),
        }
    }

    fn key_path(&self, id: &KeyId) -> Result<KeyPath> {
        match self.keys.get(id) {
            Some(stored) => Ok(stored.path),
            None => Err(Error::KeyUnavailable("unknown key id")),
        }
    }
}
