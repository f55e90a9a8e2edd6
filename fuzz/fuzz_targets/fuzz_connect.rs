#![no_main]

//! Block connection fuzzer.
//!
//! Feeds arbitrary name operations through the chain controller, then
//! disconnects everything:
//! 1. Connecting must never panic and never fail the conservation check
//! 2. Invariants hold after every block
//! 3. Disconnecting all blocks restores genesis

use arbitrary::Arbitrary;
use huntercore::chain::{Block, ChainConfig, GameChain, MemoryLedger};
use huntercore::game::check_invariants;
use huntercore::{GameRules, NameCommand, WorldState, COIN};
use libfuzzer_sys::fuzz_target;

/// A fuzzer-generated name operation.
#[derive(Arbitrary, Debug)]
struct FuzzCommand {
    /// Index into a small name pool so commands hit the same players.
    name: u8,
    /// Hunter index the order is for.
    index: u8,
    /// Waypoint target.
    x: i8,
    y: i8,
    destruct: bool,
    spawn: bool,
    color: u8,
}

impl FuzzCommand {
    fn to_command(&self, state: &WorldState) -> NameCommand {
        let name = format!("p{}", self.name % 8);
        let payload = if self.spawn {
            format!(r#"{{"color":{}}}"#, self.color % 4)
        } else if self.destruct {
            format!(r#"{{"{}":{{"destruct":true}}}}"#, self.index % 3)
        } else {
            format!(r#"{{"{}":{{"wp":[{},{}]}}}}"#, self.index % 3, self.x, self.y)
        };
        let locked = state.players.get(&name).map_or(COIN, |p| p.locked);
        NameCommand {
            name,
            payload,
            locked,
            owner: "fuzzowner".into(),
            registration: self.spawn,
        }
    }
}

fuzz_target!(|blocks: Vec<Vec<FuzzCommand>>| {
    let rules = GameRules {
        initial_hunters: 3,
        ..GameRules::small()
    };
    let Ok(mut chain) = GameChain::new(rules.clone(), ChainConfig::default()) else {
        return;
    };
    let mut ledger = MemoryLedger::new();

    let count = blocks.len().min(64);
    for (i, commands) in blocks.iter().take(count).enumerate() {
        let commands = commands.iter().map(|c| c.to_command(chain.tip())).collect();
        let block = Block::derived(chain.height() + 1, chain.tip().block_hash, &i.to_le_bytes(), commands);
        chain.connect_block(block, &mut ledger).unwrap();
        assert!(check_invariants(chain.tip(), &rules).is_empty());
    }
    for _ in 0..count {
        chain.disconnect_tip(&mut ledger).unwrap();
    }
    assert_eq!(chain.tip(), &WorldState::genesis(&rules).unwrap());
    assert!(ledger.is_empty());
});
