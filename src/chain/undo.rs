//! Undo records: the deltas needed to take a block back out.
//!
//! A record keeps the prior value of every player, loot pile and bank entry
//! the block changed (`None` where the entry did not exist), the hearts and
//! crown before the block, plus digests of the states on both sides so a
//! mismatched application is detected.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{EngineError, EngineResult};
use crate::game::{Amount, Bank, Coord, Crown, LootPile, Player, WorldState};
use crate::hash::{BlockHash, TxId};

/// Everything needed to revert one connected block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoRecord {
    /// Block this record reverts.
    pub block_hash: BlockHash,
    /// Height before the block.
    pub prior_height: u32,
    /// Block hash before the block.
    pub prior_hash: BlockHash,
    /// Game fund before the block.
    pub prior_fund: Amount,
    /// Changed players with their prior value.
    pub players: Vec<(String, Option<Player>)>,
    /// Changed loot piles with their prior value.
    pub loot: Vec<(Coord, Option<LootPile>)>,
    /// Changed banks with their prior value.
    pub banks: Vec<(Coord, Option<Bank>)>,
    /// Hearts before the block, if the block changed them.
    pub hearts: Option<BTreeSet<Coord>>,
    /// Crown before the block.
    pub prior_crown: Option<Crown>,
    /// Game transactions the block created, in order.
    pub game_txids: Vec<TxId>,
    /// Digest of the state before the block.
    pub prior_digest: [u8; 32],
    /// Digest of the state after the block.
    pub post_digest: [u8; 32],
}

/// Entries of `before` that differ in `after`, with their old value.
fn diff<K: Ord + Clone, V: PartialEq + Clone>(
    before: &BTreeMap<K, V>,
    after: &BTreeMap<K, V>,
) -> Vec<(K, Option<V>)> {
    let mut changes: Vec<(K, Option<V>)> = before
        .iter()
        .filter(|(k, v)| after.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), Some(v.clone())))
        .collect();
    changes.extend(
        after
            .keys()
            .filter(|k| !before.contains_key(*k))
            .map(|k| (k.clone(), None)),
    );
    changes
}

fn revert<K: Ord + Clone, V: Clone>(map: &mut BTreeMap<K, V>, changes: &[(K, Option<V>)]) {
    for (k, v) in changes {
        match v {
            Some(v) => {
                map.insert(k.clone(), v.clone());
            }
            None => {
                map.remove(k);
            }
        }
    }
}

impl UndoRecord {
    /// Record the transition `prior -> post`.
    ///
    /// # Errors
    ///
    /// Returns an error if either state cannot be digested.
    pub fn between(prior: &WorldState, post: &WorldState, game_txids: Vec<TxId>) -> EngineResult<Self> {
        Ok(Self {
            block_hash: post.block_hash,
            prior_height: prior.height,
            prior_hash: prior.block_hash,
            prior_fund: prior.game_fund,
            players: diff(&prior.players, &post.players),
            loot: diff(&prior.loot, &post.loot),
            banks: diff(&prior.banks, &post.banks),
            hearts: (prior.hearts != post.hearts).then(|| prior.hearts.clone()),
            prior_crown: prior.crown.clone(),
            game_txids,
            prior_digest: prior.digest()?,
            post_digest: post.digest()?,
        })
    }

    /// Revert `current`, which must be the state this record was made for.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UndoMismatch`] if `current` is not the state
    /// the block produced, or the result is not the state before it.
    pub fn apply(&self, current: &WorldState) -> EngineResult<WorldState> {
        if current.block_hash != self.block_hash {
            return Err(EngineError::UndoMismatch(format!(
                "undo for block {} applied to state at {}",
                self.block_hash, current.block_hash
            )));
        }
        if current.digest()? != self.post_digest {
            return Err(EngineError::UndoMismatch(format!(
                "state at {} differs from what the block produced",
                self.block_hash
            )));
        }

        let mut state = current.clone();
        revert(&mut state.players, &self.players);
        revert(&mut state.loot, &self.loot);
        revert(&mut state.banks, &self.banks);
        if let Some(hearts) = &self.hearts {
            state.hearts.clone_from(hearts);
        }
        state.crown.clone_from(&self.prior_crown);
        state.height = self.prior_height;
        state.block_hash = self.prior_hash;
        state.game_fund = self.prior_fund;

        if state.digest()? != self.prior_digest {
            return Err(EngineError::UndoMismatch(format!(
                "reverting {} does not restore the prior state",
                self.block_hash
            )));
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{GameRules, COIN};

    #[test]
    fn test_diff_records_prior_values() {
        let before = BTreeMap::from([(1, "a"), (2, "b"), (3, "c")]);
        let after = BTreeMap::from([(1, "a"), (2, "x"), (4, "d")]);
        let mut changes = diff(&before, &after);
        changes.sort();
        assert_eq!(changes, vec![(2, Some("b")), (3, Some("c")), (4, None)]);

        let mut restored = after.clone();
        revert(&mut restored, &changes);
        assert_eq!(restored, before);
    }

    #[test]
    fn test_round_trip() {
        let rules = GameRules::small();
        let prior = WorldState::genesis(&rules).unwrap();
        let mut post = prior.clone();
        post.height = 1;
        post.block_hash = BlockHash::from_bytes([1; 32]);
        post.game_fund = 5;
        post.add_loot(Coord::new(3, 3), COIN, 1);

        let undo = UndoRecord::between(&prior, &post, Vec::new()).unwrap();
        assert_eq!(undo.loot.len(), 1);
        assert!(undo.players.is_empty());
        assert_eq!(undo.apply(&post).unwrap(), prior);
    }

    #[test]
    fn test_round_trip_restores_hearts_and_crown() {
        let rules = GameRules {
            crown: Some(crate::game::CrownRules {
                start: Coord::new(20, 20),
                respawn: vec![Coord::new(21, 21)],
                bonus_divisor: 36,
            }),
            ..GameRules::small()
        };
        let mut prior = WorldState::genesis(&rules).unwrap();
        prior.hearts.insert(Coord::new(9, 9));
        let mut post = prior.clone();
        post.height = 1;
        post.block_hash = BlockHash::from_bytes([2; 32]);
        post.hearts.clear();
        post.hearts.insert(Coord::new(10, 12));
        if let Some(crown) = &mut post.crown {
            crown.pos = Coord::new(21, 21);
        }

        let undo = UndoRecord::between(&prior, &post, Vec::new()).unwrap();
        assert!(undo.hearts.is_some());
        assert_eq!(undo.apply(&post).unwrap(), prior);
    }

    #[test]
    fn test_apply_to_wrong_state() {
        let rules = GameRules::small();
        let prior = WorldState::genesis(&rules).unwrap();
        let mut post = prior.clone();
        post.height = 1;
        post.block_hash = BlockHash::from_bytes([1; 32]);
        let undo = UndoRecord::between(&prior, &post, Vec::new()).unwrap();

        let mut tampered = post.clone();
        tampered.game_fund = 99;
        assert!(matches!(undo.apply(&tampered), Err(EngineError::UndoMismatch(_))));
        assert!(matches!(undo.apply(&prior), Err(EngineError::UndoMismatch(_))));
    }
}
