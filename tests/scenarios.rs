//! End-to-end scenarios through the chain controller.
//!
//! Run with: cargo test --release scenarios

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use huntercore::chain::{Block, ChainConfig, GameChain, MemoryLedger};
use huntercore::game::{
    block_subsidy, min_message_fee, CarriedLoot, GameTxKind, Motion, SyntheticInput, CENT,
};
use huntercore::{BlockHash, Coord, EngineError, GameRules, NameCommand, COIN};

fn spawn(name: &str) -> NameCommand {
    NameCommand {
        name: name.into(),
        payload: r#"{"color":0}"#.into(),
        locked: COIN,
        owner: format!("owner-{name}"),
        registration: true,
    }
}

fn update(name: &str, payload: &str) -> NameCommand {
    NameCommand {
        name: name.into(),
        payload: payload.into(),
        locked: COIN,
        owner: format!("owner-{name}"),
        registration: false,
    }
}

fn next_block(chain: &GameChain, salt: &str, commands: Vec<NameCommand>) -> Block {
    Block::derived(chain.height() + 1, chain.tip().block_hash, salt.as_bytes(), commands)
}

fn create_test_chain() -> (GameChain, MemoryLedger) {
    let chain = GameChain::new(GameRules::small(), ChainConfig::default()).unwrap();
    (chain, MemoryLedger::new())
}

/// A chain whose tip has player `a` standing on `at` next to a loot pile.
fn chain_with_loot(at: Coord, loot: i64) -> (GameChain, MemoryLedger) {
    let (mut chain, mut ledger) = create_test_chain();
    let block = next_block(&chain, "spawn", vec![spawn("a")]);
    chain.connect_block(block, &mut ledger).unwrap();

    let mut tip = chain.tip().clone();
    tip.add_loot(at, loot, tip.height);
    tip.players.get_mut("a").unwrap().hunters.get_mut(&0).unwrap().motion = Motion::at(at);
    let chain = GameChain::from_parts(chain.rules().clone(), ChainConfig::default(), tip, Vec::new());
    (chain, ledger)
}

#[test]
fn test_bounty_pays_miner_tax_in_coinbase() {
    let loot = 7 * COIN;
    let fees = 1_000;
    let (mut chain, mut ledger) = chain_with_loot(Coord::new(3, 3), loot);

    // pick up the pile, then walk to the bank in the corner
    chain.connect_block(next_block(&chain, "pick", Vec::new()), &mut ledger).unwrap();
    assert_eq!(chain.tip().players["a"].general().unwrap().loot.amount, loot);
    let mut block = next_block(&chain, "walk", vec![update("a", r#"{"0":{"wp":[0,0]}}"#)]);

    let report = loop {
        block.fees = fees;
        let report = chain.connect_block(block, &mut ledger).unwrap();
        if !report.transactions.is_empty() {
            break report;
        }
        assert!(chain.height() < 10, "hunter never reached the bank");
        block = next_block(&chain, "walk", Vec::new());
    };

    let height = report.stats.height;
    assert_eq!(report.coinbase, block_subsidy(chain.rules(), height) + fees + loot / 10);
    assert_eq!(report.transactions.len(), 1);
    let tx = &report.transactions[0];
    assert_eq!(tx.kind, GameTxKind::Bounties);
    assert_eq!(tx.value_out(), loot - loot / 10);
    assert_eq!(ledger.balance("owner-a"), loot - loot / 10);
    assert_eq!(chain.tip().players["a"].general().unwrap().loot.amount, 0);
}

#[test]
fn test_simultaneous_destructs_make_one_kill_transaction() {
    let (mut chain, mut ledger) = create_test_chain();
    let block = next_block(&chain, "spawn", vec![spawn("a"), spawn("b")]);
    chain.connect_block(block, &mut ledger).unwrap();

    let destruct = r#"{"0":{"destruct":true}}"#;
    let block = next_block(&chain, "boom", vec![update("a", destruct), update("b", destruct)]);
    let report = chain.connect_block(block, &mut ledger).unwrap();

    assert_eq!(report.transactions.len(), 1);
    let tx = &report.transactions[0];
    assert_eq!(tx.kind, GameTxKind::Kills);
    assert!(tx.outputs.is_empty());
    let victims: Vec<(&str, &[String])> = tx
        .inputs
        .iter()
        .map(|input| match input {
            SyntheticInput::KilledBy { player, killers, .. } => (player.as_str(), killers.as_slice()),
            SyntheticInput::Banking { .. } | SyntheticInput::Refund { .. } => panic!("unexpected bounty input"),
        })
        .collect();
    assert_eq!(
        victims,
        vec![("a", ["a".to_string()].as_slice()), ("b", ["b".to_string()].as_slice())]
    );
    assert_eq!(chain.tip().player_count(), 0);
    assert_eq!(report.stats.taxes, 2 * (COIN / 25));
}

#[test]
fn test_reorg_keeps_kill_txid() {
    let (mut chain, mut ledger) = create_test_chain();
    let base = next_block(&chain, "spawn", vec![spawn("a")]);
    let fork = base.hash;
    chain.connect_block(base, &mut ledger).unwrap();

    let destruct = || vec![update("a", r#"{"0":{"destruct":true}}"#)];
    let first = chain.connect_block(next_block(&chain, "one", destruct()), &mut ledger).unwrap();

    let other = Block::derived(2, fork, b"two", destruct());
    let other_hash = other.hash;
    chain.reorganize(fork, vec![other], &mut ledger).unwrap();

    assert_eq!(chain.tip().block_hash, other_hash);
    let txs = chain.game_transactions(&other_hash).unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].txid(), first.stats.game_txids[0]);
    assert_eq!(chain.game_txids(&other_hash).unwrap(), first.stats.game_txids.as_slice());
    assert_eq!(ledger.len(), 1);
}

#[test]
fn test_reorg_with_address_change_redirects_bounty() {
    let loot = 2 * COIN;
    let (mut chain, mut ledger) = chain_with_loot(Coord::new(1, 1), loot);
    chain.connect_block(next_block(&chain, "pick", Vec::new()), &mut ledger).unwrap();
    let fork = chain.tip().block_hash;
    let height = chain.height() + 1;

    let plain = Block::derived(height, fork, b"plain", vec![update("a", r#"{"0":{"wp":[0,0]}}"#)]);
    chain.connect_block(plain, &mut ledger).unwrap();
    assert_eq!(ledger.balance("owner-a"), loot - loot / 10);

    let redirected = Block::derived(
        height,
        fork,
        b"redirected",
        vec![update("a", r#"{"0":{"wp":[0,0]},"address":"elsewhere"}"#)],
    );
    chain.reorganize(fork, vec![redirected], &mut ledger).unwrap();
    assert_eq!(ledger.balance("owner-a"), 0);
    assert_eq!(ledger.balance("elsewhere"), loot - loot / 10);
    assert_eq!(ledger.len(), 1);
}

#[test]
fn test_respawn_after_death_is_a_new_life() {
    let (mut chain, mut ledger) = create_test_chain();
    chain.connect_block(next_block(&chain, "s1", vec![spawn("a")]), &mut ledger).unwrap();

    // a second registration while alive is dropped
    let report = chain.connect_block(next_block(&chain, "s2", vec![spawn("a")]), &mut ledger).unwrap();
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(chain.tip().players["a"].registered_at, 1);

    let destruct = || vec![update("a", r#"{"0":{"destruct":true}}"#)];
    let first = chain.connect_block(next_block(&chain, "d1", destruct()), &mut ledger).unwrap();
    chain.connect_block(next_block(&chain, "s3", vec![spawn("a")]), &mut ledger).unwrap();
    assert_eq!(chain.tip().players["a"].registered_at, 4);
    let second = chain.connect_block(next_block(&chain, "d2", destruct()), &mut ledger).unwrap();

    assert_ne!(first.stats.game_txids, second.stats.game_txids);
    assert_eq!(ledger.len(), 2);
}

#[test]
fn test_update_for_unknown_player_is_dropped() {
    let (mut chain, mut ledger) = create_test_chain();
    let report = chain
        .connect_block(next_block(&chain, "x", vec![update("ghost", r#"{"msg":"boo"}"#)]), &mut ledger)
        .unwrap();
    assert!(matches!(report.rejected[0], EngineError::InvalidTransition { .. }));
    assert_eq!(chain.height(), 1);
}

#[test]
fn test_fee_tiers() {
    assert_eq!(min_message_fee(0), CENT);
    assert_eq!(min_message_fee(99), CENT);
    assert_eq!(min_message_fee(100), 12 * CENT / 10);
    assert_eq!(min_message_fee(199), 12 * CENT / 10);
    assert_eq!(min_message_fee(200), 14 * CENT / 10);
    assert_eq!(min_message_fee(10_000), 14 * CENT / 10);
}

#[test]
fn test_stats_and_queries() {
    let (mut chain, mut ledger) = create_test_chain();
    chain
        .connect_block(next_block(&chain, "s", vec![spawn("a"), spawn("b")]), &mut ledger)
        .unwrap();
    chain
        .connect_block(next_block(&chain, "m", vec![update("a", r#"{"msg":"hi"}"#)]), &mut ledger)
        .unwrap();

    let stats = chain.stats_for_height(1).unwrap();
    assert_eq!((stats.players, stats.hunters), (2, 2));
    assert!(stats.game_txids.is_empty());
    assert!(chain.stats_for_height(3).is_err());

    let view = chain.player_state("a").unwrap();
    assert_eq!(view.msg.as_deref(), Some("hi"));
    assert_eq!(view.msg_block, Some(2));
    assert_eq!(view.address, "owner-a");

    let json = serde_json::to_value(chain.world_view()).unwrap();
    assert_eq!(json["height"], 2);
    assert!(json["players"]["b"].is_object());
}

#[test]
fn test_block_on_wrong_parent_is_rejected() {
    let (mut chain, mut ledger) = create_test_chain();
    let block = Block::derived(1, BlockHash::from_bytes([7; 32]), b"x", Vec::new());
    assert!(matches!(
        chain.connect_block(block, &mut ledger),
        Err(EngineError::ConsensusViolation(_))
    ));
    assert_eq!(chain.height(), 0);
    assert!(ledger.is_empty());
}

#[test]
fn test_throttled_banking_connects_every_block() {
    let rules = GameRules {
        bank_capacity_per_block: COIN,
        ..GameRules::small()
    };
    let mut chain = GameChain::new(rules.clone(), ChainConfig::default()).unwrap();
    let mut ledger = MemoryLedger::new();
    chain
        .connect_block(next_block(&chain, "spawn", vec![spawn("a"), spawn("b")]), &mut ledger)
        .unwrap();

    // both generals share the corner bank, three coins each
    let mut tip = chain.tip().clone();
    for name in ["a", "b"] {
        let general = tip.players.get_mut(name).unwrap().hunters.get_mut(&0).unwrap();
        general.motion = Motion::at(Coord::new(0, 0));
        general.loot = CarriedLoot {
            amount: 3 * COIN,
            first_block: 1,
            last_block: 1,
            collected_first: 1,
            collected_last: 1,
            banked: 0,
        };
    }
    let mut chain = GameChain::from_parts(rules, ChainConfig::default(), tip, Vec::new());

    let mut txids = Vec::new();
    for _ in 0..6 {
        let report = chain.connect_block(next_block(&chain, "bank", Vec::new()), &mut ledger).unwrap();
        assert_eq!(report.transactions.len(), 1);
        assert_eq!(report.transactions[0].value_out(), COIN - COIN / 10);
        txids.extend(report.stats.game_txids.iter().copied());
    }
    let mut unique = txids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 6);
    assert_eq!(ledger.len(), 6);
    assert_eq!(ledger.balance("owner-a"), 3 * (COIN - COIN / 10));
    assert_eq!(ledger.balance("owner-b"), 3 * (COIN - COIN / 10));

    for _ in 0..6 {
        chain.disconnect_tip(&mut ledger).unwrap();
    }
    assert!(ledger.is_empty());
}

#[test]
fn test_bank_stay_death_refunds_stake() {
    let rules = GameRules {
        max_bank_stay: Some(1),
        ..GameRules::small()
    };
    let mut chain = GameChain::new(rules, ChainConfig::default()).unwrap();
    let mut ledger = MemoryLedger::new();
    chain.connect_block(next_block(&chain, "spawn", vec![spawn("a")]), &mut ledger).unwrap();
    chain.connect_block(next_block(&chain, "stay", Vec::new()), &mut ledger).unwrap();
    let report = chain.connect_block(next_block(&chain, "die", Vec::new()), &mut ledger).unwrap();

    assert!(chain.tip().players.is_empty());
    let refund = report
        .transactions
        .iter()
        .find(|tx| tx.kind == GameTxKind::Bounties)
        .unwrap();
    assert!(matches!(refund.inputs[0], SyntheticInput::Refund { life: 1, .. }));
    assert_eq!(refund.value_out(), COIN);
    assert_eq!(ledger.balance("owner-a"), COIN);
}
