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

//! Deterministic coin secret derivation. A 64-byte mint seed expands
//! into the full coin secret (signing key, serial, randomness), so any
//! coin is recoverable from the wallet's key material alone.

use hmac::{Hmac, Mac};
use pasta_curves::pallas;
use sha2::{Digest, Sha256, Sha512};

use super::{
    commit::{commit_tag, PublicCoin},
    keypair::SecretKey,
    mint_id::{MintEntryId, SerialId},
    util::hash_to_base,
};
use crate::{
    keystore::{KeyId, KeyStore},
    Error, Result,
};

/// Change class reserved for mint seed keys in the key store.
pub const MINT_KEY_CHANGE: u32 = 2;

const SERIAL_PERSONALIZATION: &[u8] = b"lelantus:serial";
const RANDOM_PERSONALIZATION: &[u8] = b"lelantus:random";

/// Full secret material of a single coin, expanded from a mint seed.
#[derive(Debug, Clone, Copy)]
pub struct CoinSecretKey {
    /// Signing key, rejection-sampled from the first seed half
    pub signing_key: SecretKey,
    /// Serial, derived from the signing public key
    pub serial: pallas::Base,
    /// Commitment randomness, derived from the second seed half
    pub randomness: pallas::Base,
}

impl CoinSecretKey {
    /// Expand a 64-byte mint seed into a coin secret. The signing key
    /// is sampled by hashing the first seed half with SHA-256 until the
    /// digest is a valid secret key. The candidate is always hashed at
    /// least once, so raw seed bytes never act as a key directly.
    pub fn from_seed(seed: &[u8; 64]) -> Self {
        let mut candidate = [0u8; 32];
        candidate.copy_from_slice(&seed[..32]);
        let signing_key = loop {
            candidate = Sha256::digest(candidate).into();
            if let Some(sk) = SecretKey::from_bytes(candidate) {
                break sk
            }
        };

        let serial =
            hash_to_base(SERIAL_PERSONALIZATION, &signing_key.public_key().to_bytes());
        let randomness = hash_to_base(RANDOM_PERSONALIZATION, &seed[32..]);

        Self { signing_key, serial, randomness }
    }

    /// Commit to this secret with a given amount
    pub fn public_coin(&self, amount: u64) -> PublicCoin {
        PublicCoin::new(self.serial, amount, self.randomness)
    }

    /// The amount-independent tag commitment of this secret
    pub fn tag(&self) -> pallas::Point {
        commit_tag(self.serial, self.randomness)
    }

    /// Identity of the mint this secret produces under `seed_id`
    pub fn mint_id(&self, seed_id: &KeyId) -> MintEntryId {
        MintEntryId::new(self.serial, self.randomness, seed_id)
    }

    /// Digest of the serial, for the wallet's serial lookup index
    pub fn serial_id(&self) -> SerialId {
        SerialId::new(&self.serial)
    }
}

/// Stretch a 32-byte stored key and its derivation index into a 64-byte
/// mint seed: HMAC-SHA512 keyed by the stored key over the
/// little-endian index.
pub fn mint_seed(key: &[u8; 32], index: u32) -> [u8; 64] {
    let mut mac =
        Hmac::<Sha512>::new_from_slice(key).expect("HMAC-SHA512 accepts any key length");
    mac.update(&index.to_le_bytes());
    mac.finalize().into_bytes().into()
}

/// Derive the coin secret for the key `seed_id` at position `index`.
/// The key must exist under the mint change class at exactly that
/// index, otherwise the derivation path is rejected.
pub fn derive_key(keys: &dyn KeyStore, seed_id: &KeyId, index: u32) -> Result<CoinSecretKey> {
    let path = keys.key_path(seed_id)?;
    if path.change != MINT_KEY_CHANGE {
        return Err(Error::InvalidDerivationPath("key is not under the mint change class"))
    }
    if path.index != index {
        return Err(Error::InvalidDerivationPath("key index does not match pool entry"))
    }

    let key = keys.key(seed_id)?;
    Ok(CoinSecretKey::from_seed(&mint_seed(&key, index)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::MemoryKeyStore;

    #[test]
    fn seed_expansion_is_deterministic() {
        let seed = [5u8; 64];
        let a = CoinSecretKey::from_seed(&seed);
        let b = CoinSecretKey::from_seed(&seed);
        assert_eq!(a.serial, b.serial);
        assert_eq!(a.randomness, b.randomness);
        assert_eq!(a.signing_key, b.signing_key);

        let c = CoinSecretKey::from_seed(&[6u8; 64]);
        assert_ne!(a.serial, c.serial);
    }

    #[test]
    fn seed_halves_are_independent() {
        let mut seed = [9u8; 64];
        let a = CoinSecretKey::from_seed(&seed);

        // Changing only the second half must not touch the signing key
        seed[63] ^= 1;
        let b = CoinSecretKey::from_seed(&seed);
        assert_eq!(a.signing_key, b.signing_key);
        assert_eq!(a.serial, b.serial);
        assert_ne!(a.randomness, b.randomness);
    }

    #[test]
    fn derive_key_checks_the_path() {
        let mut keys = MemoryKeyStore::new([1u8; 32]);
        let wrong_class = keys.generate_key(0).unwrap();
        let id = keys.generate_key(MINT_KEY_CHANGE).unwrap();

        assert!(derive_key(&keys, &id, 0).is_ok());
        assert!(matches!(
            derive_key(&keys, &id, 1),
            Err(Error::InvalidDerivationPath(_))
        ));
        assert!(matches!(
            derive_key(&keys, &wrong_class, 0),
            Err(Error::InvalidDerivationPath(_))
        ));
    }

    #[test]
    fn derive_key_fails_while_locked() {
        let mut keys = MemoryKeyStore::new([2u8; 32]);
        let id = keys.generate_key(MINT_KEY_CHANGE).unwrap();
        keys.lock();
        assert!(matches!(derive_key(&keys, &id, 0), Err(Error::KeyUnavailable(_))));
    }
}
