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

use pasta_curves::{
    arithmetic::CurveExt,
    group::{
        ff::{Field, PrimeField},
        GroupEncoding,
    },
    pallas,
};

use super::util::mod_r_p;

/// Domain of the fixed generator used for signing public keys.
const KEYGEN_PERSONALIZATION: &str = "lelantus-mint:keygen";
const KEYGEN_G_BYTES: &[u8] = b"signing-generator";

/// Signing secret key carried inside a coin secret. Validity of a raw
/// 32-byte candidate is the rejection predicate the derivation loop
/// samples against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretKey(pallas::Base);

impl SecretKey {
    /// Try to create a `SecretKey` from the given 32 bytes.
    /// Returns `Some` only if the bytes are a canonical, nonzero
    /// base field element.
    pub fn from_bytes(bytes: [u8; 32]) -> Option<Self> {
        let n = pallas::Base::from_repr(bytes);
        match bool::from(n.is_some()) {
            true => {
                let n = n.unwrap();
                if n == pallas::Base::ZERO {
                    return None
                }
                Some(Self(n))
            }
            false => None,
        }
    }

    /// Reference the raw inner base field element
    pub fn inner(&self) -> pallas::Base {
        self.0
    }

    /// Convert the `SecretKey` into 32 raw bytes
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_repr()
    }

    /// Derive the corresponding public key
    pub fn public_key(&self) -> PublicKey {
        let g = pallas::Point::hash_to_curve(KEYGEN_PERSONALIZATION)(KEYGEN_G_BYTES);
        PublicKey(g * mod_r_p(self.0))
    }
}

/// Public counterpart of [`SecretKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(pallas::Point);

impl PublicKey {
    /// Reference the raw inner curve point
    pub fn inner(&self) -> pallas::Point {
        self.0
    }

    /// Convert the `PublicKey` into its 32-byte group encoding
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_key_rejects_zero_and_noncanonical_bytes() {
        assert!(SecretKey::from_bytes([0u8; 32]).is_none());
        // The field modulus is < 2^255, so all-ones is not canonical.
        assert!(SecretKey::from_bytes([0xff; 32]).is_none());
        assert!(SecretKey::from_bytes(pallas::Base::from(42).to_repr()).is_some());
    }

    #[test]
    fn public_key_is_a_function_of_the_secret() {
        let a = SecretKey::from_bytes(pallas::Base::from(7).to_repr()).unwrap();
        let b = SecretKey::from_bytes(pallas::Base::from(8).to_repr()).unwrap();
        assert_eq!(a.public_key(), a.public_key());
        assert_ne!(a.public_key(), b.public_key());
    }
}
