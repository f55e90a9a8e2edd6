//! Game layer: the rules that turn name operations into hunter moves, loot
//! and payouts.
//!
//! - Grid geometry and straight-line motion
//! - World state (players, hunters, loot, banks)
//! - Command parsing and admission
//! - Combat, banking, spawning and loot pickup per block
//! - Taxes, subsidy and fee tiers
//! - Event-to-transaction materialization

mod combat;
mod command;
mod economy;
mod grid;
mod invariants;
mod lifecycle;
mod materialize;
mod rng;
mod rules;
mod view;
mod world;

pub use combat::{merge_kills, resolve_collisions, resolve_destructs, KillMap};
pub use command::{
    is_valid_player_name, parse_command, GameCommand, HunterOrder, NameCommand, MAX_NAME_LENGTH,
    NUM_COLORS,
};
pub use economy::{
    banking_tax, block_subsidy, block_treasure, coinbase_value, death_tax, format_amount,
    min_message_fee, min_registration_fee, min_spawn_lock, min_update_fee, split_tax,
    split_weighted, Amount, TaxSplit, CENT, COIN,
};
pub use grid::{dist_linf, path_cost, Coord, Grid, Motion};
pub use invariants::{assert_invariants, check_invariants, InvariantViolation};
pub use lifecycle::{
    process_block, BountyEvent, BountySource, DeathCause, GameEvent, KillEvent, StepOutcome,
};
pub use materialize::{materialize, CoinOutput, GameTransaction, GameTxKind, SyntheticInput};
pub use rng::GameRng;
pub use rules::{BankingSlotRule, CollisionRule, CrownRules, GameRules, HarvestArea};
pub use view::{CrownView, HunterView, LootView, PlayerView, WorldView};
pub use world::{
    Address, Bank, CarriedLoot, CharacterId, ChatMessage, Crown, Hunter, LootPile, Player, WorldState,
};
