//! Seeded random block workloads for soak runs, benchmarks and tests.
//!
//! Players spawn, walk towards the harvest areas or a bank and now and then
//! blow themselves up. All draws come from [`GameRng`], so a seed always
//! yields the same chain.

use serde_json::{json, Map, Value};

use crate::chain::block::Block;
use crate::game::{
    min_spawn_lock, min_update_fee, Coord, GameRng, GameRules, NameCommand, WorldState, NUM_COLORS,
};
use crate::hash::BlockHash;

/// Knobs of the random workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Workload {
    /// Most players that spawn in one block.
    pub max_spawns_per_block: u64,
    /// One in this many live players sends an update per block.
    pub update_one_in: u64,
    /// One in this many ordered hunters destructs instead of moving.
    pub destruct_one_in: u64,
}

impl Default for Workload {
    fn default() -> Self {
        Self {
            max_spawns_per_block: 3,
            update_one_in: 3,
            destruct_one_in: 15,
        }
    }
}

/// Random number stream for a soak seed.
#[must_use]
pub fn seed_rng(seed: u64) -> GameRng {
    GameRng::from_block_hash(&BlockHash::derive(&[b"workload", &seed.to_le_bytes()]))
}

fn random_tile(rng: &mut GameRng, rules: &GameRules, state: &WorldState) -> Coord {
    match rng.below(3) {
        0 if !rules.harvest_areas.is_empty() => {
            let area = rules.harvest_areas[rng.index(rules.harvest_areas.len())];
            Coord::new(rng.between(area.min.x, area.max.x), rng.between(area.min.y, area.max.y))
        }
        1 if !state.banks.is_empty() => {
            let pick = rng.index(state.banks.len());
            state.banks.keys().nth(pick).copied().unwrap_or_default()
        }
        _ => Coord::new(
            rng.between(0, rules.map_width - 1),
            rng.between(0, rules.map_height - 1),
        ),
    }
}

/// Name commands for the block after `state`.
#[must_use]
pub fn random_commands(rng: &mut GameRng, state: &WorldState, rules: &GameRules, workload: &Workload) -> Vec<NameCommand> {
    let height = state.height + 1;
    let mut commands = Vec::new();

    for (name, player) in &state.players {
        if rng.below(workload.update_one_in) != 0 {
            continue;
        }
        let mut payload = Map::new();
        let mut destructs = 0;
        for &index in player.hunters.keys() {
            if rng.below(2) == 0 {
                continue;
            }
            let order = if rng.below(workload.destruct_one_in) == 0 {
                destructs += 1;
                json!({ "destruct": true })
            } else {
                let to = random_tile(rng, rules, state);
                json!({ "wp": [to.x, to.y] })
            };
            payload.insert(index.to_string(), order);
        }
        if rng.below(10) == 0 {
            payload.insert("msg".into(), Value::String(format!("hello from {height}")));
        }
        if payload.is_empty() {
            continue;
        }
        commands.push(NameCommand {
            name: name.clone(),
            payload: Value::Object(payload).to_string(),
            locked: player.locked + min_update_fee(rules, destructs),
            owner: player.owner.clone(),
            registration: false,
        });
    }

    for k in 0..rng.below(workload.max_spawns_per_block + 1) {
        let name = format!("h{height}n{k}");
        let color = rng.below(u64::from(NUM_COLORS));
        commands.push(NameCommand {
            payload: json!({ "color": color }).to_string(),
            locked: min_spawn_lock(rules),
            owner: format!("addr{name}"),
            name,
            registration: true,
        });
    }
    commands
}

/// The block after `state`, with a hash derived from `salt`.
#[must_use]
pub fn random_block(rng: &mut GameRng, state: &WorldState, rules: &GameRules, workload: &Workload, salt: &[u8]) -> Block {
    let commands = random_commands(rng, state, rules, workload);
    Block::derived(state.height + 1, state.block_hash, salt, commands)
}
