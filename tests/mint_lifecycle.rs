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

use std::sync::{Arc, Mutex};

use lelantus_mint::{
    crypto::{MintEntryId, SerialId},
    keystore::MemoryKeyStore,
    types::TxId,
    wallet::{MintChainState, NewMint},
    MintLedger, MintWallet, Result,
};

const PROPERTY: u32 = 1;

struct Harness {
    pub ledger: MintLedger,
    pub wallet: MintWallet,
}

impl Harness {
    fn new(group_size: u32, start_group_size: u32, seed: [u8; 32]) -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        let ledger = MintLedger::new(&db, group_size, start_group_size)?;
        let wallet =
            MintWallet::with_capacity(&db, Box::new(MemoryKeyStore::new(seed)), 5)?;
        Ok(Self { ledger, wallet })
    }

    /// Generate a mint, confirm it on the ledger and sync the wallet's
    /// view of its placement.
    fn mint(&self, amount: u64, block: u32) -> Result<NewMint> {
        let mint = self.wallet.generate_mint(PROPERTY, amount, None)?;
        let coin = mint.secret.public_coin(amount);
        let (group, index) =
            self.ledger.write_mint(PROPERTY, &coin, &mint.id, amount, block, &[])?;
        self.wallet
            .update_mint_chain_state(&mint.id, MintChainState::new(block as i32, group, index))?;
        Ok(mint)
    }
}

#[test]
fn mint_spend_lifecycle() -> Result<()> {
    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::ConfigBuilder::new().build(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .unwrap();

    let harness = Harness::new(100, 10, [1u8; 32])?;

    let mint = harness.mint(5000, 10)?;
    assert!(harness.ledger.has_mint_id(PROPERTY, &mint.id)?);
    assert!(harness.wallet.get_mint(&mint.id)?.chain_state.is_on_chain());

    // The anonymity group carries our committed coin
    let group = harness.ledger.get_anonymity_group(PROPERTY, 0, 10)?;
    assert_eq!(group, vec![mint.secret.public_coin(5000)]);

    // A spend reveals the serial. The wallet finds its own mint through
    // the serial digest and marks it spent.
    let spend_tx = TxId::new([9u8; 32]);
    assert!(!harness.ledger.has_serial(PROPERTY, &mint.secret.serial)?);
    harness.ledger.write_serial(PROPERTY, &mint.secret.serial, 12, spend_tx)?;

    let serial_id = SerialId::new(&mint.secret.serial);
    let (id, _) = harness.wallet.get_mint_by_serial(&serial_id)?;
    assert_eq!(id, mint.id);
    harness.wallet.update_mint_spend_tx(&id, spend_tx)?;
    assert!(harness.wallet.get_mint(&id)?.is_spent());
    assert_eq!(harness.ledger.spend_tx(PROPERTY, &mint.secret.serial)?.unwrap().spend_tx, spend_tx);

    // Spending the same serial again is rejected
    assert!(harness.ledger.write_serial(PROPERTY, &mint.secret.serial, 13, spend_tx).is_err());

    Ok(())
}

#[test]
fn groups_roll_over_and_overlap() -> Result<()> {
    let harness = Harness::new(2, 1, [2u8; 32])?;

    let m1 = harness.mint(10, 1)?;
    let m2 = harness.mint(20, 2)?;
    // Group 0 is full, the third mint opens group 1 seeded with a copy
    // of the previous group's last coin.
    let m3 = harness.mint(30, 3)?;

    assert_eq!(harness.wallet.get_mint(&m1.id)?.chain_state, MintChainState::new(1, 0, 0));
    assert_eq!(harness.wallet.get_mint(&m2.id)?.chain_state, MintChainState::new(2, 0, 1));
    assert_eq!(harness.wallet.get_mint(&m3.id)?.chain_state, MintChainState::new(3, 1, 1));

    let group1 = harness.ledger.get_anonymity_group(PROPERTY, 1, 10)?;
    assert_eq!(group1, vec![m2.secret.public_coin(20), m3.secret.public_coin(30)]);

    Ok(())
}

#[test]
fn reorg_rolls_the_ledger_back() -> Result<()> {
    let harness = Harness::new(100, 10, [3u8; 32])?;

    let removed: Arc<Mutex<Vec<MintEntryId>>> = Arc::new(Mutex::new(vec![]));
    let removed_log = removed.clone();
    harness.ledger.notifier().on_mint_removed(move |ev| {
        removed_log.lock().unwrap().push(ev.id);
    });

    let m1 = harness.mint(10, 1)?;
    let m2 = harness.mint(20, 2)?;
    harness.ledger.write_serial(PROPERTY, &m1.secret.serial, 2, TxId::new([4u8; 32]))?;

    harness.ledger.delete_all(2)?;

    // Block 2 and everything after is gone: the second mint and the
    // spend of the first. Block 1 survives.
    assert!(harness.ledger.has_mint_id(PROPERTY, &m1.id)?);
    assert!(!harness.ledger.has_mint_id(PROPERTY, &m2.id)?);
    assert!(!harness.ledger.has_serial(PROPERTY, &m1.secret.serial)?);
    assert_eq!(*removed.lock().unwrap(), vec![m2.id]);

    // The wallet unwinds the removed mint to its unconfirmed state
    for id in removed.lock().unwrap().iter() {
        harness.wallet.update_mint_chain_state(id, MintChainState::default())?;
    }
    assert!(!harness.wallet.get_mint(&m2.id)?.chain_state.is_on_chain());

    // The sequence recovers and the coin can confirm again
    let coin = m2.secret.public_coin(20);
    let (group, index) = harness.ledger.write_mint(PROPERTY, &coin, &m2.id, 20, 3, &[])?;
    assert_eq!((group, index), (0, 1));

    Ok(())
}

#[test]
fn restored_wallet_claims_its_coins_from_a_chain_scan() -> Result<()> {
    let seed = [5u8; 32];
    let harness = Harness::new(100, 10, seed)?;

    let m1 = harness.mint(100, 1)?;
    let m2 = harness.mint(200, 2)?;
    let spend_tx = TxId::new([6u8; 32]);
    harness.ledger.write_serial(PROPERTY, &m1.secret.serial, 3, spend_tx)?;

    // A fresh wallet from the same seed, scanning the chain: each mint
    // id seen on chain is offered for recovery along with its placement
    // and revealed spend.
    let db = sled::Config::new().temporary(true).open()?;
    let restored = MintWallet::with_capacity(&db, Box::new(MemoryKeyStore::new(seed)), 5)?;

    let scan = [
        (m1.id, MintChainState::new(1, 0, 0), Some(spend_tx), 100),
        (m2.id, MintChainState::new(2, 0, 1), None, 200),
    ];
    for (id, state, spend, amount) in scan {
        assert!(restored.try_recover_mint(&id, state, spend, PROPERTY, amount)?);
    }

    // A mint that is not ours is left alone
    let foreign = MintEntryId::from_bytes([0xEE; 32]);
    assert!(!restored.try_recover_mint(&foreign, MintChainState::new(3, 0, 2), None, PROPERTY, 1)?);

    let rec1 = restored.get_mint(&m1.id)?;
    assert!(rec1.is_spent());
    assert_eq!(rec1.serial_id, m1.record.serial_id);
    let rec2 = restored.get_mint(&m2.id)?;
    assert!(!rec2.is_spent());
    assert_eq!(rec2.amount, 200);

    // The restored wallet can re-derive the spending secrets
    let secret = restored.private_key(&rec2.seed_id)?;
    assert_eq!(secret.public_coin(200), m2.secret.public_coin(200));

    Ok(())
}
