//! Per-block hunter lifecycle: admission, combat, movement, banking, spawns
//! and loot.
//!
//! [`process_block`] takes the state after the parent block and the block's
//! name commands and produces the next state plus the ordered list of game
//! events. Phases run in a fixed order and every phase iterates players by
//! name and hunters by index:
//!
//! ```text
//! admit commands ─► destructs/collisions ─► deaths ─► bank stay
//!        ─► waypoints ─► movement ─► crown follows holder ─► banking
//!        ─┬─► spawns   (block-hash RNG)
//!         ├─► treasure ─► loot pickup ─► crown bonus
//!         └─► hearts ─► crown pickup
//!        ─► address/message updates ─► conservation check
//! ```
//!
//! Banking runs before anything random, so a miner can compute the taxes
//! for its coinbase before it knows the final block hash.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

use crate::error::{EngineError, EngineResult};
use crate::game::combat::{merge_kills, resolve_collisions, resolve_destructs, KillMap};
use crate::game::command::{parse_command, GameCommand, HunterOrder, NameCommand};
use crate::game::economy::{self, Amount};
use crate::game::grid::{Coord, Grid};
use crate::game::rng::GameRng;
use crate::game::rules::{BankingSlotRule, GameRules};
use crate::game::world::{
    Address, CarriedLoot, CharacterId, ChatMessage, Hunter, LootPile, Player, WorldState,
};
use crate::hash::BlockHash;

/// Random tiles tried before a heart drop is given up.
const HEART_DROP_ATTEMPTS: u32 = 64;

/// Why a player died.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    /// Caught in a destruct.
    Destruct,
    /// Lost a tile collision.
    Collision,
    /// Stayed on a bank tile too long.
    Spawn,
}

impl DeathCause {
    /// Whether the miner takes a cut of the dropped coins.
    #[must_use]
    pub const fn has_death_tax(self) -> bool {
        !matches!(self, Self::Spawn)
    }
}

/// A player left the game by dying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillEvent {
    /// Victim player.
    pub player: String,
    /// Hunters that killed the general; empty for spawn deaths.
    pub killers: BTreeSet<CharacterId>,
    /// Cause of death.
    pub cause: DeathCause,
    /// Height the victim's life started at.
    pub life: u32,
}

/// Where the coins of a bounty come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BountySource {
    /// Carried loot reached a bank.
    Banking {
        /// Gross amount of the same loot banked in earlier blocks.
        banked_before: Amount,
    },
    /// The stake of a general that died on a bank.
    Refund {
        /// Height the player's life started at.
        life: u32,
    },
}

/// A hunter converted carried loot into a coin payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BountyEvent {
    /// Player.
    pub player: String,
    /// Hunter index.
    pub index: u32,
    /// Banked loot; `amount` is the payout after tax, stake refunds included.
    pub loot: CarriedLoot,
    /// Payout address.
    pub address: Address,
    /// Banking or refund.
    pub source: BountySource,
}

/// Something that creates a game transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A player died.
    Killed(KillEvent),
    /// A hunter banked.
    Banked(BountyEvent),
}

/// Result of applying one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// State after the block.
    pub state: WorldState,
    /// Events in transaction order: kills first, then bounties.
    pub events: Vec<GameEvent>,
    /// Taxes credited to the miner.
    pub taxes: Amount,
    /// Treasure dropped on the map.
    pub treasure: Amount,
    /// Coins that entered the game through name operations.
    pub money_in: Amount,
    /// Commands that were dropped, with the reason.
    pub rejected: Vec<EngineError>,
}

impl StepOutcome {
    /// Sum of all bounty payouts.
    #[must_use]
    pub fn bounty_total(&self) -> Amount {
        self.events
            .iter()
            .map(|e| match e {
                GameEvent::Banked(b) => b.loot.amount,
                GameEvent::Killed(_) => 0,
            })
            .sum()
    }
}

struct Admitted {
    command: GameCommand,
    locked: Amount,
    owner: Address,
}

/// Mutable bookkeeping of one block transition.
struct Step<'a> {
    rules: &'a GameRules,
    grid: Grid,
    height: u32,
    state: WorldState,
    kills: Vec<KillEvent>,
    bounties: Vec<BountyEvent>,
    taxes: Amount,
    money_in: Amount,
    rejected: Vec<EngineError>,
}

/// Apply one block of name commands on top of `prior`.
///
/// Malformed or disallowed commands are dropped and reported in
/// [`StepOutcome::rejected`]; they never fail the block.
///
/// # Errors
///
/// Returns [`EngineError::ConsensusViolation`] if the rules are unusable or
/// the transition does not conserve coins.
pub fn process_block(
    rules: &GameRules,
    prior: &WorldState,
    hash: BlockHash,
    commands: &[NameCommand],
) -> EngineResult<StepOutcome> {
    let grid = rules.grid()?;
    let height = prior.height + 1;
    let mut step = Step {
        rules,
        grid,
        height,
        state: prior.clone(),
        kills: Vec::new(),
        bounties: Vec::new(),
        taxes: 0,
        money_in: 0,
        rejected: Vec::new(),
    };
    step.state.height = height;
    step.state.block_hash = hash;

    let admitted = step.admit(commands);
    step.fight(&admitted);
    step.bank_stay_deaths();
    step.apply_waypoints(&admitted);
    step.move_hunters();
    let respawn_crown = step.update_crown();
    step.bank();

    let mut rng = GameRng::from_block_hash(&hash);
    step.spawn_players(&admitted, &mut rng);
    let (treasure, crown_bonus) = step.drop_treasure(&mut rng);
    step.collect_loot();
    step.pay_crown_bonus(crown_bonus);
    step.drop_heart(&mut rng);
    step.collect_hearts(&mut rng);
    step.collect_crown(respawn_crown, &mut rng);
    step.apply_common(&admitted);

    let before = prior.total_money();
    let after = step.state.total_money();
    let bounties: Amount = step.bounties.iter().map(|b| b.loot.amount).sum();
    if before + treasure + step.money_in != after + step.taxes + bounties {
        return Err(EngineError::ConsensusViolation(format!(
            "coins not conserved at height {height}: {before} + {treasure} + {} != {after} + {} + {bounties}",
            step.money_in, step.taxes
        )));
    }

    for err in &step.rejected {
        debug!(height, %err, "dropped game command");
    }

    let events = step
        .kills
        .into_iter()
        .map(GameEvent::Killed)
        .chain(step.bounties.into_iter().map(GameEvent::Banked))
        .collect();

    Ok(StepOutcome {
        state: step.state,
        events,
        taxes: step.taxes,
        treasure,
        money_in: step.money_in,
        rejected: step.rejected,
    })
}

impl Step<'_> {
    fn admit(&mut self, commands: &[NameCommand]) -> BTreeMap<String, Admitted> {
        let mut admitted = BTreeMap::new();
        let mut seen = BTreeSet::new();

        for cmd in commands {
            if !seen.insert(cmd.name.as_str()) {
                self.rejected
                    .push(EngineError::malformed(&cmd.name, "more than one command in the block"));
                continue;
            }
            match self.admit_one(cmd) {
                Ok(command) => {
                    admitted.insert(
                        cmd.name.clone(),
                        Admitted {
                            command,
                            locked: cmd.locked,
                            owner: cmd.owner.clone(),
                        },
                    );
                }
                Err(e) => self.rejected.push(e),
            }
        }
        admitted
    }

    fn admit_one(&mut self, cmd: &NameCommand) -> EngineResult<GameCommand> {
        let command = parse_command(&cmd.name, &cmd.payload, self.rules.max_waypoints)?;
        let name = cmd.name.as_str();

        if command.is_spawn() {
            if !cmd.registration {
                return Err(EngineError::invalid(name, "spawn outside a registration"));
            }
            if self.state.players.contains_key(name) {
                return Err(EngineError::invalid(name, "player is already alive"));
            }
            let required = economy::min_spawn_lock(self.rules);
            if cmd.locked < required {
                return Err(EngineError::invalid(
                    name,
                    format!("spawn locks {} but needs {required}", cmd.locked),
                ));
            }
            return Ok(command);
        }

        if cmd.registration {
            return Err(EngineError::invalid(name, "registration without a spawn"));
        }
        let Some(player) = self.state.players.get_mut(name) else {
            return Err(EngineError::invalid(name, "no such player"));
        };
        let fee = cmd.locked - player.locked;
        let required = economy::min_update_fee(self.rules, command.destruct_count());
        if fee < required || fee < 0 {
            return Err(EngineError::invalid(
                name,
                format!("game fee {fee} is below the required {required}"),
            ));
        }
        player.locked = cmd.locked;
        self.state.game_fund += fee;
        self.money_in += fee;
        Ok(command)
    }

    fn fight(&mut self, admitted: &BTreeMap<String, Admitted>) {
        let mut destructs = BTreeSet::new();
        for (name, a) in admitted {
            let GameCommand::Update { orders, .. } = &a.command else {
                continue;
            };
            for (&index, order) in orders {
                if !order.destruct {
                    continue;
                }
                let id = CharacterId::new(name.clone(), index);
                if self.state.hunter(&id).is_some() {
                    destructs.insert(id);
                } else {
                    self.rejected
                        .push(EngineError::invalid(name, format!("no hunter {index} to destruct")));
                }
            }
        }

        let mut kills = resolve_destructs(&self.state, self.rules, self.height, &destructs);
        let destructed: BTreeSet<CharacterId> = kills.keys().cloned().collect();
        merge_kills(&mut kills, resolve_collisions(&self.state, self.rules, self.height));

        let cause_of = |victim: &CharacterId| {
            if destructed.contains(victim) {
                DeathCause::Destruct
            } else {
                DeathCause::Collision
            }
        };
        self.apply_kills(&kills, cause_of);
    }

    fn apply_kills(&mut self, kills: &KillMap, cause_of: impl Fn(&CharacterId) -> DeathCause) {
        // Generals take their whole player with them.
        let mut dead_players: BTreeMap<String, (BTreeSet<CharacterId>, DeathCause)> = BTreeMap::new();
        for (victim, killers) in kills {
            if victim.index == 0 {
                dead_players.insert(victim.player.clone(), (killers.clone(), cause_of(victim)));
            }
        }

        for victim in kills.keys() {
            if !dead_players.contains_key(&victim.player) {
                self.kill_hunter(victim, cause_of(victim));
            }
        }
        for (player, (killers, cause)) in dead_players {
            self.kill_player(&player, killers, cause);
        }
    }

    /// Remove a hunter and drop what it carried.
    fn kill_hunter(&mut self, id: &CharacterId, cause: DeathCause) {
        let Some(hunter) = self
            .state
            .players
            .get_mut(&id.player)
            .and_then(|p| p.hunters.remove(&id.index))
        else {
            return;
        };
        self.drop_remains(&hunter, cause);
        trace!(hunter = %id, ?cause, "hunter died");
    }

    fn kill_player(&mut self, name: &str, killers: BTreeSet<CharacterId>, cause: DeathCause) {
        let Some(mut player) = self.state.players.remove(name) else {
            return;
        };
        if cause == DeathCause::Spawn && self.rules.refund_spawn_deaths {
            let stake = player.hunters.get_mut(&0).map_or(0, |g| std::mem::take(&mut g.stake));
            if stake > 0 {
                self.bounties.push(BountyEvent {
                    player: name.to_string(),
                    index: 0,
                    loot: CarriedLoot {
                        amount: stake,
                        ..CarriedLoot::default()
                    },
                    address: player.payout_address().to_string(),
                    source: BountySource::Refund {
                        life: player.registered_at,
                    },
                });
            }
        }
        for hunter in player.hunters.values() {
            self.drop_remains(hunter, cause);
        }
        debug!(player = name, ?cause, killers = killers.len(), "player killed");
        self.kills.push(KillEvent {
            player: name.to_string(),
            killers,
            cause,
            life: player.registered_at,
        });
    }

    fn drop_remains(&mut self, hunter: &Hunter, cause: DeathCause) {
        let gross = hunter.loot.amount + hunter.stake;
        let net = if cause.has_death_tax() {
            let split = economy::death_tax(self.rules, gross);
            self.taxes += split.tax;
            split.net
        } else {
            gross
        };
        let pos = self.grid.push_out_of_spawn(hunter.pos());
        self.state.add_loot(pos, net, self.height);
    }

    fn bank_stay_deaths(&mut self) {
        let Some(max_stay) = self.rules.max_bank_stay else {
            return;
        };
        let mut overstayed = KillMap::new();
        let banks = &self.state.banks;
        for (name, player) in &mut self.state.players {
            for (&index, hunter) in &mut player.hunters {
                if !banks.contains_key(&hunter.pos()) {
                    hunter.bank_stay = 0;
                    continue;
                }
                hunter.bank_stay += 1;
                if hunter.bank_stay > max_stay {
                    overstayed.insert(CharacterId::new(name.clone(), index), BTreeSet::new());
                }
            }
        }
        self.apply_kills(&overstayed, |_| DeathCause::Spawn);
    }

    fn apply_waypoints(&mut self, admitted: &BTreeMap<String, Admitted>) {
        for (name, a) in admitted {
            let GameCommand::Update { orders, .. } = &a.command else {
                continue;
            };
            for (&index, order) in orders {
                let HunterOrder {
                    waypoints: Some(path),
                    ..
                } = order
                else {
                    continue;
                };
                if let Some(bad) = path.iter().find(|&&c| !self.grid.in_bounds(c)) {
                    self.rejected
                        .push(EngineError::invalid(name, format!("waypoint {bad} is off the grid")));
                    continue;
                }
                // Destructed or killed hunters are already gone.
                let Some(hunter) = self
                    .state
                    .players
                    .get_mut(name)
                    .and_then(|p| p.hunters.get_mut(&index))
                else {
                    continue;
                };
                hunter.motion.set_waypoints(path.iter().copied());
            }
        }
    }

    fn move_hunters(&mut self) {
        for player in self.state.players.values_mut() {
            for hunter in player.hunters.values_mut() {
                hunter.motion.step();
            }
        }
    }

    fn bank(&mut self) {
        let mut used: BTreeMap<Coord, Amount> = BTreeMap::new();
        let mut consumed = Vec::new();

        for (name, player) in &mut self.state.players {
            let address = player.payout_address().to_string();
            for (&index, hunter) in &mut player.hunters {
                let pos = hunter.pos();
                let Some(bank) = self.state.banks.get(&pos) else {
                    continue;
                };
                if hunter.loot.amount <= 0 {
                    continue;
                }
                let spent = used.entry(pos).or_insert(0);
                let gross = hunter.loot.amount.min(bank.capacity - *spent);
                if gross <= 0 {
                    continue;
                }
                *spent += gross;

                let split = economy::banking_tax(self.rules, gross);
                self.taxes += split.tax;
                let banked_before = hunter.loot.banked;
                let mut paid = hunter.loot;
                paid.amount = split.net;
                hunter.loot.amount -= gross;
                hunter.loot.banked += gross;
                if hunter.loot.amount == 0 {
                    hunter.loot = CarriedLoot::default();
                }

                if let BankingSlotRule::Consume { min_loot } = self.rules.banking_slot {
                    if gross >= min_loot && hunter.loot.amount == 0 {
                        consumed.push((CharacterId::new(name.clone(), index), self.bounties.len()));
                    }
                }
                self.bounties.push(BountyEvent {
                    player: name.clone(),
                    index,
                    loot: paid,
                    address: address.clone(),
                    source: BountySource::Banking { banked_before },
                });
            }
        }

        for (id, bounty) in consumed {
            self.consume_hunter(&id, bounty);
        }
    }

    /// Take a hunter off the map after banking; a consumed general takes the
    /// player out and its stake is refunded with the bounty.
    fn consume_hunter(&mut self, id: &CharacterId, bounty: usize) {
        let Some(player) = self.state.players.get_mut(&id.player) else {
            return;
        };
        let Some(hunter) = player.hunters.remove(&id.index) else {
            return;
        };
        let mut refund = hunter.stake + hunter.loot.amount;
        if id.index == 0 {
            if let Some(player) = self.state.players.remove(&id.player) {
                refund += player.value_on_map();
            }
        }
        if let Some(b) = self.bounties.get_mut(bounty) {
            b.loot.amount += refund;
        }
        trace!(hunter = %id, "hunter consumed by banking");
    }

    fn spawn_players(&mut self, admitted: &BTreeMap<String, Admitted>, rng: &mut GameRng) {
        for (name, a) in admitted {
            let GameCommand::Spawn { color, .. } = a.command else {
                continue;
            };
            let strip_color = if self.rules.single_spawn_corner { 0 } else { color };
            let strip = self.grid.spawn_strip(strip_color);

            let stake = self.rules.name_coin_amount;
            self.state.game_fund += a.locked - stake;
            self.money_in += a.locked;

            let count = self.rules.initial_hunters.min(self.rules.max_hunters_per_player);
            let mut hunters = BTreeMap::new();
            for index in 0..count {
                let pos = strip[rng.index(strip.len())];
                let hunter_stake = if index == 0 { stake } else { 0 };
                hunters.insert(index, Hunter::spawn(pos, hunter_stake, self.height));
            }

            self.state.players.insert(
                name.clone(),
                Player {
                    color,
                    owner: a.owner.clone(),
                    address: None,
                    message: None,
                    locked: a.locked,
                    registered_at: self.height,
                    next_index: count,
                    hunters,
                },
            );
            debug!(player = %name, color, "player spawned");
        }
    }

    /// Drop the treasure on the harvest areas; returns the treasure and the
    /// crown's cut of it.
    fn drop_treasure(&mut self, rng: &mut GameRng) -> (Amount, Amount) {
        let treasure = economy::block_treasure(self.rules, self.height);
        let bonus = self.rules.crown.as_ref().map_or(0, |c| treasure / c.bonus_divisor);
        let weights: Vec<u32> = self.rules.harvest_areas.iter().map(|a| a.weight).collect();
        let shares = economy::split_weighted(treasure - bonus, &weights);
        if shares.is_empty() {
            return (0, 0);
        }
        for (area, share) in self.rules.harvest_areas.iter().zip(shares) {
            let c = Coord::new(
                rng.between(area.min.x, area.max.x),
                rng.between(area.min.y, area.max.y),
            );
            self.state.add_loot(c, share, self.height);
        }
        (treasure, bonus)
    }

    /// Loot `id` can still pick up; `None` is unlimited.
    fn free_capacity(&self, id: &CharacterId, hunter: &Hunter) -> Option<Amount> {
        if self.state.holds_crown(id) {
            return None;
        }
        let cap = if id.index == 0 {
            self.rules.general_carry_capacity
        } else {
            self.rules.hunter_carry_capacity
        };
        cap.map(|c| (c - hunter.loot.amount).max(0))
    }

    /// Split every pile among the hunters on it. Hunters with the least free
    /// capacity pick first; what they cannot carry stays for the others.
    fn collect_loot(&mut self) {
        let mut collectors: BTreeMap<Coord, Vec<(Option<Amount>, CharacterId)>> = BTreeMap::new();
        for (id, hunter) in self.state.hunters() {
            if self.state.loot.contains_key(&hunter.pos()) {
                let free = self.free_capacity(&id, hunter);
                collectors.entry(hunter.pos()).or_default().push((free, id));
            }
        }

        for (pos, mut tile) in collectors {
            // stable: equal capacities keep (name, index) order
            tile.sort_by_key(|(free, _)| free.map_or((1, 0), |f| (0, f)));
            let mut remaining = tile.len();
            for (free, id) in tile {
                let Some(pile) = self.state.loot.get(&pos).copied() else {
                    break;
                };
                let share = pile.amount / Amount::try_from(remaining).unwrap_or(1);
                remaining -= 1;
                let take = free.map_or(share, |f| share.min(f));
                if take <= 0 {
                    continue;
                }
                if let Some(hunter) = self
                    .state
                    .players
                    .get_mut(&id.player)
                    .and_then(|p| p.hunters.get_mut(&id.index))
                {
                    hunter.loot.collect(&pile, take, self.height);
                }
                self.state.add_loot(pos, -take, self.height);
            }
        }
    }

    /// Move the crown with its holder. Returns whether the crown has to go
    /// back to a respawn tile because the holder stepped on a bank.
    fn update_crown(&mut self) -> bool {
        let Some(crown) = &mut self.state.crown else {
            return false;
        };
        let Some(holder) = crown.holder.clone() else {
            return false;
        };
        let Some(hunter) = self
            .state
            .players
            .get(&holder.player)
            .and_then(|p| p.hunters.get(&holder.index))
        else {
            // dead holders leave the crown where they last stood
            crown.holder = None;
            return false;
        };
        let pos = hunter.pos();
        if self.state.banks.contains_key(&pos) {
            crown.holder = None;
            trace!(%holder, "crown left on a bank");
            return true;
        }
        crown.pos = pos;
        false
    }

    fn pay_crown_bonus(&mut self, bonus: Amount) {
        if bonus <= 0 {
            return;
        }
        let holder = self.state.crown.as_ref().and_then(|c| c.holder.clone());
        let hunter = holder.and_then(|id| {
            self.state
                .players
                .get_mut(&id.player)
                .and_then(|p| p.hunters.get_mut(&id.index))
        });
        match hunter {
            Some(hunter) => {
                let pile = LootPile {
                    amount: bonus,
                    first_block: self.height,
                    last_block: self.height,
                };
                hunter.loot.collect(&pile, bonus, self.height);
            }
            None => self.state.game_fund += bonus,
        }
    }

    fn drop_heart(&mut self, rng: &mut GameRng) {
        let Some(interval) = self.rules.heart_interval else {
            return;
        };
        if self.height % interval != 0 {
            return;
        }
        for _ in 0..HEART_DROP_ATTEMPTS {
            let c = Coord::new(
                rng.between(0, self.grid.width() - 1),
                rng.between(0, self.grid.height() - 1),
            );
            if !self.grid.is_spawn_strip(c) {
                self.state.hearts.insert(c);
                trace!(tile = %c, "heart dropped");
                return;
            }
        }
    }

    /// Each heart with hunters on it gives one random eligible player a new
    /// hunter, counted once per hunter standing there.
    fn collect_hearts(&mut self, rng: &mut GameRng) {
        let mut on_heart: BTreeMap<Coord, Vec<String>> = BTreeMap::new();
        for (name, player) in &self.state.players {
            if !player.can_spawn_hunter(self.rules) {
                continue;
            }
            for hunter in player.hunters.values() {
                if self.state.hearts.contains(&hunter.pos()) {
                    on_heart.entry(hunter.pos()).or_default().push(name.clone());
                }
            }
        }

        for (tile, mut candidates) in on_heart {
            while !candidates.is_empty() {
                let pick = if candidates.len() == 1 {
                    0
                } else {
                    rng.index(candidates.len())
                };
                let name = candidates.remove(pick);
                if self.spawn_hunter(&name, rng) {
                    self.state.hearts.remove(&tile);
                    break;
                }
            }
        }
    }

    fn spawn_hunter(&mut self, name: &str, rng: &mut GameRng) -> bool {
        let Some(player) = self.state.players.get_mut(name) else {
            return false;
        };
        if !player.can_spawn_hunter(self.rules) {
            return false;
        }
        let strip_color = if self.rules.single_spawn_corner { 0 } else { player.color };
        let strip = self.grid.spawn_strip(strip_color);
        let pos = strip[rng.index(strip.len())];
        let index = player.next_index;
        player.next_index += 1;
        player.hunters.insert(index, Hunter::spawn(pos, 0, self.height));
        debug!(player = name, index, "heart collected");
        true
    }

    fn collect_crown(&mut self, respawn: bool, rng: &mut GameRng) {
        let rules = self.rules;
        let Some(crown_rules) = &rules.crown else {
            return;
        };
        let pos = match &mut self.state.crown {
            Some(crown) if crown.holder.is_none() => {
                if respawn {
                    crown.pos = crown_rules.respawn[rng.index(crown_rules.respawn.len())];
                }
                crown.pos
            }
            _ => return,
        };

        let on_tile: Vec<CharacterId> = self
            .state
            .hunters()
            .filter(|(_, h)| h.pos() == pos)
            .map(|(id, _)| id)
            .collect();
        let pick = match on_tile.len() {
            0 => return,
            1 => 0,
            n => rng.index(n),
        };
        let holder = on_tile.into_iter().nth(pick);
        if let Some(crown) = &mut self.state.crown {
            trace!(tile = %pos, ?holder, "crown picked up");
            crown.holder = holder;
        }
    }

    fn apply_common(&mut self, admitted: &BTreeMap<String, Admitted>) {
        for (name, a) in admitted {
            let Some(player) = self.state.players.get_mut(name) else {
                continue;
            };
            player.owner.clone_from(&a.owner);
            if let Some(text) = a.command.message() {
                player.message = Some(ChatMessage {
                    text: text.to_string(),
                    block: self.height,
                });
            }
            if let Some(addr) = a.command.address() {
                player.address = if addr.is_empty() {
                    None
                } else {
                    Some(addr.to_string())
                };
            }
        }

        for bounty in &mut self.bounties {
            if let Some(player) = self.state.players.get(&bounty.player) {
                bounty.address = player.payout_address().to_string();
            }
        }
    }
}
