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

/// Main result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Library errors, grouped by the layer they originate from.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    // =====================
    // Wallet and key errors
    // =====================
    #[error("Key unavailable: {0}")]
    KeyUnavailable(&'static str),

    #[error("Invalid derivation path: {0}")]
    InvalidDerivationPath(&'static str),

    #[error("Mint pool is empty")]
    PoolExhausted,

    #[error("Mint not found")]
    MintNotFound,

    #[error("Mint is already on chain")]
    MintOnChain,

    // =============
    // Ledger errors
    // =============
    #[error("Serial is already marked spent")]
    DuplicateSerial,

    #[error("Mint is already recorded")]
    DuplicateMint,

    #[error("Group size config mismatch: on-disk ({0}, {1}), requested ({2}, {3})")]
    ConfigMismatch(u32, u32, u32, u32),

    #[error("Invalid group size parameters")]
    InvalidGroupConfig,

    // ==============
    // Storage errors
    // ==============
    #[error(transparent)]
    SledError(#[from] sled::Error),

    #[error("Persistence failure: {0}")]
    PersistenceError(String),

    #[error("Decode failed: {0}")]
    DecodeError(&'static str),
}
