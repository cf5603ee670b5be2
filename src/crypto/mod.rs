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

/// Pedersen commitments and public coins
pub mod commit;
pub use commit::PublicCoin;

/// Deterministic coin secret key derivation
pub mod derivation;
pub use derivation::{derive_key, CoinSecretKey, MINT_KEY_CHANGE};

/// Signing keypairs used inside coin secrets
pub mod keypair;
pub use keypair::{PublicKey, SecretKey};

/// Mint identity tags
pub mod mint_id;
pub use mint_id::{MintEntryId, SerialId};

/// Miscellaneous utilities
pub mod util;
