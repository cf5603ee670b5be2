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

/// Identifier of the managed property (token) a mint belongs to.
pub type PropertyId = u32;

/// Minted amount, in the property's base units.
pub type MintAmount = u64;

/// A transaction hash. The all-zero value means "unset", matching the
/// on-disk sentinel convention used by mint records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxId(pub [u8; 32]);

impl TxId {
    pub const NULL: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Default for TxId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Encodable for TxId {
    fn encode<S: Write>(&self, s: &mut S) -> std::io::Result<usize> {
        s.write_slice(&self.0)?;
        Ok(32)
    }
}

impl Decodable for TxId {
    fn decode<D: Read>(d: &mut D) -> std::io::Result<Self> {
        let mut bytes = [0u8; 32];
        d.read_slice(&mut bytes)?;
        Ok(Self(bytes))
    }
}
