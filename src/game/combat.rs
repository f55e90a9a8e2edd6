//! Attack resolution: destructs and tile collisions.
//!
//! Combat is evaluated on the positions at the start of a block, before any
//! hunter moves. The result maps each victim to the set of hunters that
//! killed it; applying the deaths is left to the lifecycle.

use std::collections::{BTreeMap, BTreeSet};

use crate::game::grid::{dist_linf, Coord};
use crate::game::rules::{CollisionRule, GameRules};
use crate::game::world::{CharacterId, WorldState};

/// Victims with the hunters that killed them.
pub type KillMap = BTreeMap<CharacterId, BTreeSet<CharacterId>>;

fn color_of(state: &WorldState, id: &CharacterId) -> Option<u8> {
    state.players.get(&id.player).map(|p| p.color)
}

/// Resolve destructs for the block at `height`.
///
/// Each destructing hunter kills itself and every hunter of another colour
/// within `destruct_radius`, except those still under spawn protection.
#[must_use]
pub fn resolve_destructs(
    state: &WorldState,
    rules: &GameRules,
    height: u32,
    destructs: &BTreeSet<CharacterId>,
) -> KillMap {
    let mut kills = KillMap::new();

    for attacker in destructs {
        let (Some(hunter), Some(color)) = (state.hunter(attacker), color_of(state, attacker)) else {
            continue;
        };
        let center = hunter.pos();

        kills
            .entry(attacker.clone())
            .or_default()
            .insert(attacker.clone());

        for (victim, target) in state.hunters() {
            if &victim == attacker || dist_linf(center, target.pos()) > rules.destruct_radius {
                continue;
            }
            if color_of(state, &victim) == Some(color) || target.is_protected(height, rules) {
                continue;
            }
            kills.entry(victim).or_default().insert(attacker.clone());
        }
    }

    kills
}

/// Resolve tile collisions for the block at `height` under the configured
/// [`CollisionRule`].
#[must_use]
pub fn resolve_collisions(state: &WorldState, rules: &GameRules, height: u32) -> KillMap {
    let mut kills = KillMap::new();
    if rules.collision == CollisionRule::Disabled {
        return kills;
    }

    let mut tiles: BTreeMap<Coord, Vec<CharacterId>> = BTreeMap::new();
    for (id, hunter) in state.hunters() {
        tiles.entry(hunter.pos()).or_default().push(id);
    }

    for occupants in tiles.values() {
        let colors: BTreeSet<u8> = occupants.iter().filter_map(|id| color_of(state, id)).collect();
        if colors.len() < 2 {
            continue;
        }

        let killers_for = |victim: &CharacterId, candidates: &[&CharacterId]| -> BTreeSet<CharacterId> {
            let color = color_of(state, victim);
            candidates
                .iter()
                .filter(|k| color_of(state, k) != color)
                .map(|&k| k.clone())
                .collect()
        };

        match rules.collision {
            CollisionRule::Disabled => {}
            CollisionRule::Mutual => {
                let all: Vec<&CharacterId> = occupants.iter().collect();
                for victim in occupants {
                    let protected = state
                        .hunter(victim)
                        .is_none_or(|h| h.is_protected(height, rules));
                    if protected {
                        continue;
                    }
                    let killers = killers_for(victim, &all);
                    if !killers.is_empty() {
                        kills.entry(victim.clone()).or_default().extend(killers);
                    }
                }
            }
            CollisionRule::NewestWins => {
                // Newest unprotected spawn wins; among equals the first in
                // evaluation order. Protected hunters neither win nor die.
                let Some(winner) = occupants
                    .iter()
                    .filter_map(|id| state.hunter(id).map(|h| (h, id)))
                    .filter(|(h, _)| !h.is_protected(height, rules))
                    .map(|(h, id)| (h.spawn_height, id))
                    .max_by(|(ha, a), (hb, b)| ha.cmp(hb).then_with(|| b.cmp(a)))
                    .map(|(_, id)| id)
                else {
                    continue;
                };
                for victim in occupants {
                    let protected = state
                        .hunter(victim)
                        .is_none_or(|h| h.is_protected(height, rules));
                    if victim == winner || protected {
                        continue;
                    }
                    let killers = killers_for(victim, &[winner]);
                    if !killers.is_empty() {
                        kills.entry(victim.clone()).or_default().extend(killers);
                    }
                }
            }
        }
    }

    kills
}

/// Merge two kill maps, uniting the killer sets.
pub fn merge_kills(into: &mut KillMap, other: KillMap) {
    for (victim, killers) in other {
        into.entry(victim).or_default().extend(killers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::economy::COIN;
    use crate::game::world::{Hunter, Player};

    fn rules() -> GameRules {
        GameRules {
            spawn_protection_blocks: 5,
            ..GameRules::small()
        }
    }

    fn create_test_world(hunters: &[(&str, u8, Coord, u32)]) -> WorldState {
        let mut w = WorldState::genesis(&rules()).unwrap();
        for &(name, color, pos, spawned) in hunters {
            let p = w.players.entry(name.to_string()).or_insert_with(|| Player {
                color,
                owner: format!("addr-{name}"),
                address: None,
                message: None,
                locked: COIN,
                registered_at: spawned,
                next_index: 0,
                hunters: BTreeMap::new(),
            });
            let index = p.next_index;
            p.next_index += 1;
            let stake = if index == 0 { COIN } else { 0 };
            p.hunters.insert(index, Hunter::spawn(pos, stake, spawned));
        }
        w
    }

    fn id(name: &str, index: u32) -> CharacterId {
        CharacterId::new(name, index)
    }

    #[test]
    fn test_destruct_kills_self_and_neighbours() {
        let w = create_test_world(&[
            ("a", 0, Coord::new(10, 10), 1),
            ("b", 1, Coord::new(11, 11), 1),
            ("c", 2, Coord::new(12, 12), 1),
        ]);
        let kills = resolve_destructs(&w, &rules(), 20, &BTreeSet::from([id("a", 0)]));
        assert_eq!(kills.len(), 2);
        assert_eq!(kills[&id("a", 0)], BTreeSet::from([id("a", 0)]));
        assert_eq!(kills[&id("b", 0)], BTreeSet::from([id("a", 0)]));
        assert!(!kills.contains_key(&id("c", 0)));
    }

    #[test]
    fn test_double_destruct_multi_killer() {
        let w = create_test_world(&[("a", 0, Coord::new(10, 10), 1), ("b", 1, Coord::new(10, 11), 1)]);
        let kills = resolve_destructs(&w, &rules(), 20, &BTreeSet::from([id("a", 0), id("b", 0)]));
        assert_eq!(kills[&id("a", 0)], BTreeSet::from([id("a", 0), id("b", 0)]));
        assert_eq!(kills[&id("b", 0)], BTreeSet::from([id("a", 0), id("b", 0)]));
    }

    #[test]
    fn test_destruct_spares_team_and_protected() {
        let w = create_test_world(&[
            ("a", 0, Coord::new(10, 10), 1),
            ("friend", 0, Coord::new(10, 11), 1),
            ("fresh", 1, Coord::new(11, 10), 18),
        ]);
        let kills = resolve_destructs(&w, &rules(), 20, &BTreeSet::from([id("a", 0)]));
        assert_eq!(kills.keys().cloned().collect::<Vec<_>>(), vec![id("a", 0)]);
    }

    #[test]
    fn test_fresh_hunter_can_still_self_destruct() {
        let w = create_test_world(&[("a", 0, Coord::new(0, 0), 19)]);
        let kills = resolve_destructs(&w, &rules(), 20, &BTreeSet::from([id("a", 0)]));
        assert!(kills.contains_key(&id("a", 0)));
    }

    #[test]
    fn test_collisions_disabled_by_default() {
        let w = create_test_world(&[("a", 0, Coord::new(10, 10), 1), ("b", 1, Coord::new(10, 10), 1)]);
        assert!(resolve_collisions(&w, &rules(), 20).is_empty());
    }

    #[test]
    fn test_mutual_collision() {
        let r = GameRules {
            collision: CollisionRule::Mutual,
            ..rules()
        };
        let w = create_test_world(&[
            ("a", 0, Coord::new(10, 10), 1),
            ("b", 1, Coord::new(10, 10), 1),
            ("c", 2, Coord::new(10, 10), 1),
        ]);
        let kills = resolve_collisions(&w, &r, 20);
        assert_eq!(kills.len(), 3);
        assert_eq!(kills[&id("a", 0)], BTreeSet::from([id("b", 0), id("c", 0)]));
    }

    #[test]
    fn test_newest_wins_collision() {
        let r = GameRules {
            collision: CollisionRule::NewestWins,
            ..rules()
        };
        let w = create_test_world(&[
            ("a", 0, Coord::new(10, 10), 1),
            ("b", 1, Coord::new(10, 10), 7),
            ("c", 2, Coord::new(10, 10), 7),
        ]);
        let kills = resolve_collisions(&w, &r, 20);
        // b and c spawned together; b comes first in evaluation order.
        assert_eq!(kills.len(), 2);
        assert_eq!(kills[&id("a", 0)], BTreeSet::from([id("b", 0)]));
        assert_eq!(kills[&id("c", 0)], BTreeSet::from([id("b", 0)]));
    }

    #[test]
    fn test_newest_wins_ignores_protected_hunters() {
        let r = GameRules {
            collision: CollisionRule::NewestWins,
            ..rules()
        };
        // c spawned at 18 and is protected at 20; b is the newest unprotected
        let w = create_test_world(&[
            ("a", 0, Coord::new(10, 10), 1),
            ("b", 1, Coord::new(10, 10), 7),
            ("c", 2, Coord::new(10, 10), 18),
        ]);
        let kills = resolve_collisions(&w, &r, 20);
        assert_eq!(kills.len(), 1);
        assert_eq!(kills[&id("a", 0)], BTreeSet::from([id("b", 0)]));
        assert!(!kills.contains_key(&id("c", 0)));
    }

    #[test]
    fn test_collision_same_team_is_safe() {
        let r = GameRules {
            collision: CollisionRule::Mutual,
            ..rules()
        };
        let w = create_test_world(&[("a", 0, Coord::new(10, 10), 1), ("b", 0, Coord::new(10, 10), 1)]);
        assert!(resolve_collisions(&w, &r, 20).is_empty());
    }
}
