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

//! Ledger change notifications. Subscribers (a wallet syncing its own
//! chain state, a UI) register callbacks and get told about every
//! canonical mint placement and removal.

use std::sync::Mutex;

use crate::{crypto::MintEntryId, types::PropertyId};

/// A mint gained its canonical placement in an anonymity group.
#[derive(Debug, Clone, Copy)]
pub struct MintAdded {
    pub property: PropertyId,
    pub id: MintEntryId,
    pub group: u32,
    pub index: u64,
    /// Set when the minted amount is public, e.g. during chain scan
    pub amount: Option<u64>,
}

/// A mint lost its canonical placement, during a reorg rollback.
#[derive(Debug, Clone, Copy)]
pub struct MintRemoved {
    pub property: PropertyId,
    pub id: MintEntryId,
}

type AddedFn = Box<dyn Fn(&MintAdded) + Send + Sync>;
type RemovedFn = Box<dyn Fn(&MintRemoved) + Send + Sync>;

/// Callback registry the ledger fires after each committed write.
/// Callbacks run on the writer's thread, outside the storage
/// transaction, so a committed write is never observed half-done.
#[derive(Default)]
pub struct MintNotifier {
    added: Mutex<Vec<AddedFn>>,
    removed: Mutex<Vec<RemovedFn>>,
}

impl MintNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_mint_added<F: Fn(&MintAdded) + Send + Sync + 'static>(&self, f: F) {
        self.added.lock().unwrap().push(Box::new(f));
    }

    pub fn on_mint_removed<F: Fn(&MintRemoved) + Send + Sync + 'static>(&self, f: F) {
        self.removed.lock().unwrap().push(Box::new(f));
    }

    pub(crate) fn notify_added(&self, event: &MintAdded) {
        for f in self.added.lock().unwrap().iter() {
            f(event)
        }
    }

    pub(crate) fn notify_removed(&self, event: &MintRemoved) {
        for f in self.removed.lock().unwrap().iter() {
            f(event)
        }
    }
}
