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

use core::fmt;
use std::io::{Read, Write};

use darkfi_serial::{Decodable, Encodable, ReadExt, WriteExt};
use pasta_curves::{
    group::{ff::PrimeField, GroupEncoding},
    pallas,
};
use sha2::{Digest, Sha256};

use super::commit::commit_tag;
use crate::keystore::KeyId;

/// Stable, non-invertible handle of a mint: the hash of the coin's tag
/// commitment hash concatenated with the seed id that derived it.
/// Reveals neither serial nor randomness, so the persisted lookahead
/// pool never leaks spendable secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MintEntryId([u8; 32]);

impl MintEntryId {
    pub fn new(serial: pallas::Base, randomness: pallas::Base, seed_id: &KeyId) -> Self {
        let tag = commit_tag(serial, randomness);
        let tag_hash: [u8; 32] = Sha256::digest(tag.to_bytes()).into();

        let mut hasher = Sha256::new();
        hasher.update(tag_hash);
        hasher.update(seed_id.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for MintEntryId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Encodable for MintEntryId {
    fn encode<S: Write>(&self, s: &mut S) -> std::io::Result<usize> {
        s.write_slice(&self.0)?;
        Ok(32)
    }
}

impl Decodable for MintEntryId {
    fn decode<D: Read>(d: &mut D) -> std::io::Result<Self> {
        let mut bytes = [0u8; 32];
        d.read_slice(&mut bytes)?;
        Ok(Self(bytes))
    }
}

/// Short digest of the serial alone, the secondary index used to find a
/// wallet's own mint once its serial shows up on-chain, without a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SerialId([u8; 20]);

impl SerialId {
    pub fn new(serial: &pallas::Base) -> Self {
        let digest: [u8; 32] = Sha256::digest(serial.to_repr()).into();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for SerialId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Encodable for SerialId {
    fn encode<S: Write>(&self, s: &mut S) -> std::io::Result<usize> {
        s.write_slice(&self.0)?;
        Ok(20)
    }
}

impl Decodable for SerialId {
    fn decode<D: Read>(d: &mut D) -> std::io::Result<Self> {
        let mut bytes = [0u8; 20];
        d.read_slice(&mut bytes)?;
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_id_binds_seed_id() {
        let s = pallas::Base::from(1);
        let r = pallas::Base::from(2);
        let seed_a = KeyId::from_bytes([1u8; 20]);
        let seed_b = KeyId::from_bytes([2u8; 20]);

        assert_eq!(MintEntryId::new(s, r, &seed_a), MintEntryId::new(s, r, &seed_a));
        assert_ne!(MintEntryId::new(s, r, &seed_a), MintEntryId::new(s, r, &seed_b));
    }

    #[test]
    fn serial_id_is_stable() {
        let serial = pallas::Base::from(99);
        assert_eq!(SerialId::new(&serial), SerialId::new(&serial));
        assert_ne!(SerialId::new(&serial), SerialId::new(&pallas::Base::from(100)));
    }
}
