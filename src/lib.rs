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

//! Mint bookkeeping for Lelantus-style anonymous coins.
//!
//! Two inseparable pieces: a deterministic mint-pool wallet that derives
//! the secret material for future coins ahead of need from a single
//! wallet seed, and a grouped anonymity-set ledger that persists
//! committed coins, batches them into bounded groups for proof
//! construction, and tracks spent serials to prevent double-spending.

/// Cryptographic primitives: commitments, key derivation, mint identity
pub mod crypto;

/// Error handling
pub mod error;
pub use error::{Error, Result};

/// Mint added/removed change notification
pub mod event;

/// Wallet key-retrieval collaborator
pub mod keystore;

/// Grouped anonymity-set ledger
pub mod ledger;
pub use ledger::MintLedger;

/// Common type aliases and tx hashes
pub mod types;

/// Deterministic mint-pool wallet
pub mod wallet;
pub use wallet::MintWallet;
