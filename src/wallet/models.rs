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

use darkfi_serial::{SerialDecodable, SerialEncodable};

use crate::{
    crypto::{MintEntryId, SerialId},
    keystore::KeyId,
    types::{MintAmount, PropertyId, TxId},
};

/// On-chain placement of a wallet mint. `block` is -1 until the mint
/// confirms, in which case `group`/`index` are meaningless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, SerialEncodable, SerialDecodable)]
pub struct MintChainState {
    pub block: i32,
    pub group: u32,
    pub index: u64,
}

impl MintChainState {
    pub fn new(block: i32, group: u32, index: u64) -> Self {
        Self { block, group, index }
    }

    pub fn is_on_chain(&self) -> bool {
        self.block >= 0
    }

    /// Reset to the unconfirmed state
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl Default for MintChainState {
    fn default() -> Self {
        Self { block: -1, group: 0, index: 0 }
    }
}

/// Everything the wallet persists about one of its own mints. Secrets
/// are absent: the record holds only what is needed to re-derive them
/// (the seed id) and to track the coin's life on chain.
#[derive(Debug, Clone, PartialEq, Eq, SerialEncodable, SerialDecodable)]
pub struct MintRecord {
    pub property: PropertyId,
    pub amount: MintAmount,
    pub seed_id: KeyId,
    pub serial_id: SerialId,
    /// Transaction that created the mint, null until known
    pub created_tx: TxId,
    pub chain_state: MintChainState,
    /// Transaction that spent the coin, null while unspent
    pub spend_tx: TxId,
}

impl MintRecord {
    pub fn new(
        property: PropertyId,
        amount: MintAmount,
        seed_id: KeyId,
        serial_id: SerialId,
    ) -> Self {
        Self {
            property,
            amount,
            seed_id,
            serial_id,
            created_tx: TxId::NULL,
            chain_state: MintChainState::default(),
            spend_tx: TxId::NULL,
        }
    }

    pub fn is_spent(&self) -> bool {
        !self.spend_tx.is_null()
    }
}

/// One slot of the lookahead pool: a future coin's public identity plus
/// the derivation coordinates needed to expand its secrets on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, SerialEncodable, SerialDecodable)]
pub struct MintPoolEntry {
    pub id: MintEntryId,
    pub seed_id: KeyId,
    pub index: u32,
}

#[cfg(test)]
mod tests {
    use darkfi_serial::{deserialize, serialize};

    use super::*;

    #[test]
    fn chain_state_defaults_to_unconfirmed() {
        let mut state = MintChainState::default();
        assert!(!state.is_on_chain());

        state = MintChainState::new(100, 2, 7);
        assert!(state.is_on_chain());

        state.clear();
        assert!(!state.is_on_chain());
    }

    #[test]
    fn mint_record_serialization_roundtrip() {
        let mut rec = MintRecord::new(
            3,
            5000,
            KeyId::from_bytes([1u8; 20]),
            SerialId::from_bytes([2u8; 20]),
        );
        rec.created_tx = TxId::new([9u8; 32]);
        rec.chain_state = MintChainState::new(42, 1, 3);

        let back: MintRecord = deserialize(&serialize(&rec)).unwrap();
        assert_eq!(rec, back);
        assert!(!back.is_spent());
    }
}
