//! World state invariants - sanity checks that detect bugs.
//!
//! These should NEVER trigger for a state produced by block processing. The
//! controller asserts them in debug builds after every connect and
//! disconnect; the soak runner checks them on every block.

use crate::game::grid::Grid;
use crate::game::world::WorldState;
use crate::game::GameRules;

/// Invariant violation error.
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub message: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invariant violation: {}", self.message)
    }
}

impl std::error::Error for InvariantViolation {}

/// Check all world state invariants.
///
/// Returns a list of violations found, or empty if all invariants hold.
#[must_use]
pub fn check_invariants(state: &WorldState, rules: &GameRules) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let mut violation = |message: String| violations.push(InvariantViolation { message });

    let grid: Option<Grid> = rules.grid().ok();

    for (name, player) in &state.players {
        if player.general().is_none() {
            violation(format!("player '{name}' has no general"));
        }
        if u32::try_from(player.hunters.len()).unwrap_or(u32::MAX) > rules.max_hunters_per_player {
            violation(format!(
                "player '{name}' has {} hunters > max {}",
                player.hunters.len(),
                rules.max_hunters_per_player
            ));
        }
        if player.locked < 0 {
            violation(format!("player '{name}' has negative locked coins {}", player.locked));
        }
        if player.next_index > rules.max_hunter_indices {
            violation(format!("player '{name}' used {} hunter indices", player.next_index));
        }
        for (&index, hunter) in &player.hunters {
            if index >= player.next_index {
                violation(format!("hunter {name}.{index} not below next index {}", player.next_index));
            }
            if let Some(grid) = &grid {
                if !grid.in_bounds(hunter.pos()) {
                    violation(format!("hunter {name}.{index} off the grid at {}", hunter.pos()));
                }
                if let Some(bad) = hunter.motion.waypoints.iter().find(|&&c| !grid.in_bounds(c)) {
                    violation(format!("hunter {name}.{index} has waypoint {bad} off the grid"));
                }
            }
            if hunter.loot.amount < 0 || hunter.stake < 0 {
                violation(format!("hunter {name}.{index} carries a negative amount"));
            }
            if index != 0 && hunter.stake != 0 {
                violation(format!("hunter {name}.{index} carries a stake but is not a general"));
            }
        }
    }

    for (coord, pile) in &state.loot {
        if pile.amount <= 0 {
            violation(format!("loot pile at {coord} holds {}", pile.amount));
        }
        if pile.first_block > pile.last_block {
            violation(format!("loot pile at {coord} has an inverted block range"));
        }
    }

    if let Some(grid) = &grid {
        for heart in &state.hearts {
            if !grid.in_bounds(*heart) || grid.is_spawn_strip(*heart) {
                violation(format!("heart at {heart} is off the grid or in a spawn strip"));
            }
        }
    }

    match (&state.crown, &rules.crown) {
        (Some(crown), Some(_)) => {
            if let Some(holder) = &crown.holder {
                match state.hunter(holder) {
                    None => violation(format!("crown held by dead hunter {holder}")),
                    Some(h) if h.pos() != crown.pos => {
                        violation(format!("crown at {} but its holder {holder} at {}", crown.pos, h.pos()));
                    }
                    Some(_) => {}
                }
            }
        }
        (None, None) => {}
        _ => violation("crown presence does not match the rules".to_string()),
    }

    if state.game_fund < 0 {
        violation(format!("game fund is negative: {}", state.game_fund));
    }

    violations
}

/// Assert that all invariants hold (debug builds only).
///
/// # Panics
///
/// Panics if any invariant is violated (debug builds only).
#[inline]
pub fn assert_invariants(state: &WorldState, rules: &GameRules) {
    #[cfg(debug_assertions)]
    {
        let violations = check_invariants(state, rules);
        assert!(
            violations.is_empty(),
            "Invariant violations at height {}: {:?}",
            state.height,
            violations
        );
    }
    #[cfg(not(debug_assertions))]
    {
        let _ = (state, rules);
    }
}
