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
use pasta_curves::{arithmetic::CurveExt, group::GroupEncoding, pallas};
use sha2::{Digest, Sha256};

use super::util::mod_r_p;

/// Domain of the fixed commitment generators.
const COMMIT_PERSONALIZATION: &str = "lelantus-mint:commit";
const COMMIT_G_BYTES: &[u8] = b"serial";
const COMMIT_H_BYTES: &[u8] = b"randomness";
const COMMIT_V_BYTES: &[u8] = b"value";

/// Commitment to a coin's serial and randomness only. This is the tag
/// the mint identity binds to: it is computable in the lookahead pool,
/// before the minted amount is known.
#[allow(non_snake_case)]
pub fn commit_tag(serial: pallas::Base, randomness: pallas::Base) -> pallas::Point {
    let hasher = pallas::Point::hash_to_curve(COMMIT_PERSONALIZATION);
    let G = hasher(COMMIT_G_BYTES);
    let H = hasher(COMMIT_H_BYTES);

    G * mod_r_p(serial) + H * mod_r_p(randomness)
}

/// Full coin commitment over serial, amount and randomness.
#[allow(non_snake_case)]
pub fn commit(serial: pallas::Base, amount: u64, randomness: pallas::Base) -> pallas::Point {
    let hasher = pallas::Point::hash_to_curve(COMMIT_PERSONALIZATION);
    let V = hasher(COMMIT_V_BYTES);

    commit_tag(serial, randomness) + V * mod_r_p(pallas::Base::from(amount))
}

/// A committed public coin, the only coin representation the ledger
/// ever stores. The secret scalars never travel with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicCoin(pallas::Point);

impl PublicCoin {
    pub fn new(serial: pallas::Base, amount: u64, randomness: pallas::Base) -> Self {
        Self(commit(serial, amount, randomness))
    }

    /// Reference the raw inner curve point
    pub fn inner(&self) -> pallas::Point {
        self.0
    }

    /// Try to create a `PublicCoin` from a 32-byte group encoding.
    pub fn from_bytes(bytes: [u8; 32]) -> Option<Self> {
        let p = pallas::Point::from_bytes(&bytes);
        match bool::from(p.is_some()) {
            true => Some(Self(p.unwrap())),
            false => None,
        }
    }

    /// Convert the `PublicCoin` into its 32-byte group encoding
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// SHA-256 digest of the coin encoding, used as a lookup key so the
    /// full point never has to be decoded for existence checks.
    pub fn value_hash(&self) -> [u8; 32] {
        Sha256::digest(self.to_bytes()).into()
    }
}

impl From<pallas::Point> for PublicCoin {
    fn from(x: pallas::Point) -> Self {
        Self(x)
    }
}

impl fmt::Display for PublicCoin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

impl Encodable for PublicCoin {
    fn encode<S: Write>(&self, s: &mut S) -> std::io::Result<usize> {
        s.write_slice(&self.to_bytes())?;
        Ok(32)
    }
}

impl Decodable for PublicCoin {
    fn decode<D: Read>(d: &mut D) -> std::io::Result<Self> {
        let mut bytes = [0u8; 32];
        d.read_slice(&mut bytes)?;
        Self::from_bytes(bytes).ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, "Invalid bytes for PublicCoin")
        })
    }
}
