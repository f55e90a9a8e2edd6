//! Consensus rule parameters.
//!
//! Every node on a network must run with identical rules. The defaults
//! describe the regression-test network; a JSON file can override any field.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::game::economy::{Amount, COIN};
use crate::game::grid::{Coord, Grid};

/// What happens when hunters of different players share a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionRule {
    /// Sharing a tile is harmless.
    #[default]
    Disabled,
    /// Every unprotected hunter on the tile is killed by all the other
    /// players' hunters there.
    Mutual,
    /// The most recently spawned unprotected hunter kills the others.
    NewestWins,
}

/// Whether banking uses up the hunter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankingSlotRule {
    /// The hunter stays alive after banking.
    #[default]
    Retain,
    /// The hunter leaves the map after banking at least `min_loot`.
    Consume {
        /// Smallest gross amount that consumes the hunter.
        min_loot: Amount,
    },
}

/// Rectangle (inclusive bounds) that receives a share of the block treasure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestArea {
    /// Top-left corner.
    pub min: Coord,
    /// Bottom-right corner.
    pub max: Coord,
    /// Relative share of the treasure.
    pub weight: u32,
}

/// The crown: a single item on the map whose holder carries without limit
/// and receives a cut of every block's treasure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrownRules {
    /// Tile the crown lies on at genesis.
    pub start: Coord,
    /// Tiles the crown returns to when its holder enters a bank.
    pub respawn: Vec<Coord>,
    /// The holder's bonus is `treasure / bonus_divisor`.
    pub bonus_divisor: Amount,
}

/// Game rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    /// Grid width in tiles.
    pub map_width: i32,
    /// Grid height in tiles.
    pub map_height: i32,
    /// Length of each leg of a corner spawn strip.
    pub spawn_area_length: i32,
    /// Everyone spawns in the colour 0 corner.
    pub single_spawn_corner: bool,

    /// Stake locked by a spawning player; carried by its general.
    pub name_coin_amount: Amount,
    /// Extra coins a spawn pays into the game fund.
    pub spawn_fee: Amount,
    /// Coins each destruct pays into the game fund.
    pub destruct_fee: Amount,
    /// Banking tax is `gross / banking_tax_divisor`.
    pub banking_tax_divisor: Amount,
    /// Death tax is `gross / death_tax_divisor`.
    pub death_tax_divisor: Amount,

    /// Subsidy of the first blocks.
    pub initial_subsidy: Amount,
    /// Blocks between subsidy halvings.
    pub halving_interval: u32,
    /// Treasure per block as a multiple of the subsidy.
    pub treasure_multiplier: Amount,
    /// Areas the treasure is dropped on.
    pub harvest_areas: Vec<HarvestArea>,

    /// Hunters created when a player spawns.
    pub initial_hunters: u32,
    /// Cap on simultaneously alive hunters of one player.
    pub max_hunters_per_player: u32,
    /// L∞ radius of a destruct.
    pub destruct_radius: u32,
    /// Maximum waypoints per move.
    pub max_waypoints: usize,
    /// Blocks after spawning during which others cannot kill a hunter.
    pub spawn_protection_blocks: u32,
    /// Blocks a hunter may stand on a bank tile before it dies there.
    pub max_bank_stay: Option<u32>,
    /// Gross loot a single bank tile accepts per block.
    pub bank_capacity_per_block: Amount,
    /// Loot a general can carry; `None` is unlimited.
    pub general_carry_capacity: Option<Amount>,
    /// Loot any other hunter can carry; `None` is unlimited.
    pub hunter_carry_capacity: Option<Amount>,

    /// A heart drops on the map every this many blocks; `None` disables
    /// hearts.
    pub heart_interval: Option<u32>,
    /// Hunter indices a player may use over one life.
    pub max_hunter_indices: u32,
    /// The crown, if the map has one.
    pub crown: Option<CrownRules>,
    /// A general dying on a bank refunds its stake instead of dropping it.
    pub refund_spawn_deaths: bool,

    /// Shared-tile rule.
    pub collision: CollisionRule,
    /// Banking rule.
    pub banking_slot: BankingSlotRule,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            map_width: 502,
            map_height: 502,
            spawn_area_length: 15,
            single_spawn_corner: false,
            name_coin_amount: COIN,
            spawn_fee: 0,
            destruct_fee: 0,
            banking_tax_divisor: 10,
            death_tax_divisor: 25,
            initial_subsidy: COIN,
            halving_interval: 150,
            treasure_multiplier: 9,
            harvest_areas: default_harvest_areas(),
            initial_hunters: 1,
            max_hunters_per_player: 20,
            destruct_radius: 1,
            max_waypoints: 100,
            spawn_protection_blocks: 35,
            max_bank_stay: Some(30),
            bank_capacity_per_block: 1_000_000 * COIN,
            general_carry_capacity: Some(2000 * COIN),
            hunter_carry_capacity: Some(2000 * COIN),
            heart_interval: Some(500),
            max_hunter_indices: 1000,
            crown: Some(CrownRules {
                start: Coord::new(250, 248),
                respawn: vec![Coord::new(250, 248), Coord::new(251, 251)],
                bonus_divisor: 36,
            }),
            refund_spawn_deaths: true,
            collision: CollisionRule::Disabled,
            banking_slot: BankingSlotRule::Retain,
        }
    }
}

fn default_harvest_areas() -> Vec<HarvestArea> {
    let square = |cx: i32, cy: i32, r: i32, weight: u32| HarvestArea {
        min: Coord::new(cx - r, cy - r),
        max: Coord::new(cx + r, cy + r),
        weight,
    };
    vec![
        square(251, 251, 20, 2),
        square(100, 100, 10, 1),
        square(401, 100, 10, 1),
        square(401, 401, 10, 1),
        square(100, 401, 10, 1),
    ]
}

impl GameRules {
    /// Check the rules for consistency and build the grid they describe.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ConsensusViolation`] for unusable rule sets.
    pub fn grid(&self) -> Result<Grid, EngineError> {
        let grid = Grid::new(self.map_width, self.map_height, self.spawn_area_length)
            .ok_or_else(|| {
                EngineError::ConsensusViolation(format!(
                    "invalid grid {}x{} with spawn strips of {}",
                    self.map_width, self.map_height, self.spawn_area_length
                ))
            })?;
        for area in &self.harvest_areas {
            if !grid.in_bounds(area.min) || !grid.in_bounds(area.max) {
                return Err(EngineError::ConsensusViolation(format!(
                    "harvest area {}..{} leaves the grid",
                    area.min, area.max
                )));
            }
            if area.min.x > area.max.x || area.min.y > area.max.y {
                return Err(EngineError::ConsensusViolation(format!(
                    "harvest area {}..{} is empty",
                    area.min, area.max
                )));
            }
        }
        if let Some(crown) = &self.crown {
            let mut tiles = std::iter::once(&crown.start).chain(&crown.respawn);
            if let Some(bad) = tiles.find(|&&c| !grid.in_bounds(c) || grid.is_spawn_strip(c)) {
                return Err(EngineError::ConsensusViolation(format!(
                    "crown tile {bad} is off the grid or in a spawn strip"
                )));
            }
            if crown.respawn.is_empty() || crown.bonus_divisor <= 0 {
                return Err(EngineError::ConsensusViolation(
                    "crown needs respawn tiles and a positive bonus divisor".into(),
                ));
            }
        }
        if self.heart_interval == Some(0) {
            return Err(EngineError::ConsensusViolation("heart interval must be positive".into()));
        }
        if self.initial_hunters == 0
            || self.initial_hunters > self.max_hunters_per_player
            || self.initial_hunters > self.max_hunter_indices
        {
            return Err(EngineError::ConsensusViolation(format!(
                "initial hunters {} outside 1..={}",
                self.initial_hunters, self.max_hunters_per_player
            )));
        }
        Ok(grid)
    }

    /// Small rule set for unit tests and simulations: a 64x64 grid with one
    /// harvest area in the middle, no crown and everyone spawning top-left.
    #[must_use]
    pub fn small() -> Self {
        Self {
            map_width: 64,
            map_height: 64,
            spawn_area_length: 8,
            single_spawn_corner: true,
            harvest_areas: vec![HarvestArea {
                min: Coord::new(28, 28),
                max: Coord::new(35, 35),
                weight: 1,
            }],
            crown: None,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_are_valid() {
        assert!(GameRules::default().grid().is_ok());
        assert!(GameRules::small().grid().is_ok());
    }

    #[test]
    fn test_rules_reject_area_outside_grid() {
        let rules = GameRules {
            map_width: 100,
            map_height: 100,
            ..GameRules::default()
        };
        assert!(matches!(rules.grid(), Err(EngineError::ConsensusViolation(_))));
    }

    #[test]
    fn test_rules_from_partial_json() {
        let rules: GameRules = serde_json::from_str(
            r#"{"collision": "newest_wins", "banking_slot": {"consume": {"min_loot": 5}}}"#,
        )
        .unwrap();
        assert_eq!(rules.collision, CollisionRule::NewestWins);
        assert_eq!(rules.banking_slot, BankingSlotRule::Consume { min_loot: 5 });
        assert_eq!(rules.map_width, 502);
    }

    #[test]
    fn test_crown_must_stay_off_spawn_strips() {
        let rules = GameRules {
            crown: Some(CrownRules {
                start: Coord::new(0, 0),
                respawn: vec![Coord::new(32, 32)],
                bonus_divisor: 36,
            }),
            ..GameRules::small()
        };
        assert!(matches!(rules.grid(), Err(EngineError::ConsensusViolation(_))));
    }

    #[test]
    fn test_zero_heart_interval_rejected() {
        let rules = GameRules {
            heart_interval: Some(0),
            ..GameRules::small()
        };
        assert!(rules.grid().is_err());
    }
}
