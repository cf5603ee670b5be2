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

//! Composite tree keys. All integers are big-endian so the trees'
//! lexicographic byte order matches numeric order, which the
//! last-group and next-sequence probes depend on.

use crate::{types::PropertyId, Error, Result};

/// Key into the spent-serials tree: property || serial bytes.
pub fn serial_key(property: PropertyId, serial: &[u8; 32]) -> [u8; 36] {
    let mut key = [0u8; 36];
    key[..4].copy_from_slice(&property.to_be_bytes());
    key[4..].copy_from_slice(serial);
    key
}

/// Key into the coins tree: property || group || index.
pub fn coin_key(property: PropertyId, group: u32, index: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..4].copy_from_slice(&property.to_be_bytes());
    key[4..8].copy_from_slice(&group.to_be_bytes());
    key[8..].copy_from_slice(&index.to_be_bytes());
    key
}

/// Prefix of all coin keys within one anonymity group.
pub fn group_prefix(property: PropertyId, group: u32) -> [u8; 8] {
    let mut prefix = [0u8; 8];
    prefix[..4].copy_from_slice(&property.to_be_bytes());
    prefix[4..].copy_from_slice(&group.to_be_bytes());
    prefix
}

/// Prefix of all keys belonging to one property.
pub fn property_prefix(property: PropertyId) -> [u8; 4] {
    property.to_be_bytes()
}

/// Key into the coin and tag index trees: property || 32-byte digest.
pub fn index_key(property: PropertyId, digest: &[u8; 32]) -> [u8; 36] {
    let mut key = [0u8; 36];
    key[..4].copy_from_slice(&property.to_be_bytes());
    key[4..].copy_from_slice(digest);
    key
}

/// Split a coins-tree key back into (property, group, index).
pub fn decode_coin_key(key: &[u8]) -> Result<(PropertyId, u32, u64)> {
    if key.len() != 16 {
        return Err(Error::DecodeError("malformed coin key"))
    }
    let property = u32::from_be_bytes(key[..4].try_into().unwrap());
    let group = u32::from_be_bytes(key[4..8].try_into().unwrap());
    let index = u64::from_be_bytes(key[8..].try_into().unwrap());
    Ok((property, group, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coin_key_roundtrip() {
        let key = coin_key(7, 3, 42);
        assert_eq!(decode_coin_key(&key).unwrap(), (7, 3, 42));
        assert!(decode_coin_key(&key[..12]).is_err());
    }

    #[test]
    fn coin_keys_sort_numerically() {
        assert!(coin_key(1, 0, 255) < coin_key(1, 0, 256));
        assert!(coin_key(1, 0, u64::MAX) < coin_key(1, 1, 0));
        assert!(coin_key(1, u32::MAX, u64::MAX) < coin_key(2, 0, 0));
    }

    #[test]
    fn group_prefix_covers_its_coins_only() {
        let prefix = group_prefix(5, 9);
        assert!(coin_key(5, 9, 0).starts_with(&prefix));
        assert!(coin_key(5, 9, u64::MAX).starts_with(&prefix));
        assert!(!coin_key(5, 10, 0).starts_with(&prefix));
        assert!(!coin_key(6, 9, 0).starts_with(&prefix));
    }
}
