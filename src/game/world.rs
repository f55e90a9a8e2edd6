//! World state: players, hunters, loot piles and banks at one chain height.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{EngineError, EngineResult};
use crate::game::economy::Amount;
use crate::game::grid::{Coord, Motion};
use crate::game::rules::GameRules;
use crate::hash::BlockHash;

/// Payout address as understood by the ledger.
pub type Address = String;

/// Identifies one hunter: player name plus character index.
///
/// Ordered by name, then index, which is the evaluation order of every
/// per-block phase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterId {
    /// Owning player.
    pub player: String,
    /// Index within the player; 0 is the general.
    pub index: u32,
}

impl CharacterId {
    /// Create a new character id.
    #[must_use]
    pub fn new(player: impl Into<String>, index: u32) -> Self {
        Self {
            player: player.into(),
            index,
        }
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.index == 0 {
            write!(f, "{}", self.player)
        } else {
            write!(f, "{}.{}", self.player, self.index)
        }
    }
}

/// Coins lying on one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootPile {
    /// Amount on the tile.
    pub amount: Amount,
    /// Height the first coins were dropped here.
    pub first_block: u32,
    /// Height coins were last dropped here.
    pub last_block: u32,
}

/// Loot carried by a hunter, with where it came from.
///
/// The block ranges travel into the banking input of the bounty
/// transaction, which keeps bounty identifiers distinct across lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CarriedLoot {
    /// Amount carried.
    pub amount: Amount,
    /// Earliest drop height of the collected coins.
    pub first_block: u32,
    /// Latest drop height of the collected coins.
    pub last_block: u32,
    /// Height of the first pickup.
    pub collected_first: u32,
    /// Height of the latest pickup.
    pub collected_last: u32,
    /// Gross amount of this batch already banked by throttled bankings.
    pub banked: Amount,
}

impl CarriedLoot {
    /// Add `amount` taken from `pile` at `height`.
    pub fn collect(&mut self, pile: &LootPile, amount: Amount, height: u32) {
        if amount <= 0 {
            return;
        }
        if self.amount == 0 {
            self.first_block = pile.first_block;
            self.last_block = pile.last_block;
            self.collected_first = height;
        } else {
            self.first_block = self.first_block.min(pile.first_block);
            self.last_block = self.last_block.max(pile.last_block);
        }
        self.amount += amount;
        self.collected_last = height;
    }
}

/// A live hunter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunter {
    /// Position and path.
    pub motion: Motion,
    /// Carried loot.
    pub loot: CarriedLoot,
    /// Stake dropped with the hunter on death; only the general has one.
    pub stake: Amount,
    /// Height the hunter spawned at.
    pub spawn_height: u32,
    /// Consecutive blocks spent on bank tiles.
    pub bank_stay: u32,
}

impl Hunter {
    /// A fresh idle hunter.
    #[must_use]
    pub fn spawn(pos: Coord, stake: Amount, height: u32) -> Self {
        Self {
            motion: Motion::at(pos),
            loot: CarriedLoot::default(),
            stake,
            spawn_height: height,
            bank_stay: 0,
        }
    }

    /// Current tile.
    #[must_use]
    pub const fn pos(&self) -> Coord {
        self.motion.pos
    }

    /// Whether other players cannot kill this hunter at `height`.
    #[must_use]
    pub const fn is_protected(&self, height: u32, rules: &GameRules) -> bool {
        height < self.spawn_height.saturating_add(rules.spawn_protection_blocks)
    }
}

/// Chat message with the height it was sent at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Text.
    pub text: String,
    /// Height of the block that carried it.
    pub block: u32,
}

/// A player: one registered name with its hunters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Team colour, 0..=3.
    pub color: u8,
    /// Address currently holding the name.
    pub owner: Address,
    /// Payout address override.
    pub address: Option<Address>,
    /// Last chat message.
    pub message: Option<ChatMessage>,
    /// Coins locked in the name output.
    pub locked: Amount,
    /// Height this life of the name started at.
    pub registered_at: u32,
    /// Index the next hunter gets.
    pub next_index: u32,
    /// Live hunters by index.
    pub hunters: BTreeMap<u32, Hunter>,
}

impl Player {
    /// Where bounties of this player are paid.
    #[must_use]
    pub fn payout_address(&self) -> &str {
        self.address.as_deref().unwrap_or(&self.owner)
    }

    /// The player's general, if alive.
    #[must_use]
    pub fn general(&self) -> Option<&Hunter> {
        self.hunters.get(&0)
    }

    /// Whether a collected heart can give this player another hunter.
    #[must_use]
    pub fn can_spawn_hunter(&self, rules: &GameRules) -> bool {
        self.hunters.len() < rules.max_hunters_per_player as usize
            && self.next_index < rules.max_hunter_indices
    }

    /// Value the player holds on the map: stakes plus carried loot.
    #[must_use]
    pub fn value_on_map(&self) -> Amount {
        self.hunters.values().map(|h| h.stake + h.loot.amount).sum()
    }
}

/// A bank tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bank {
    /// Gross loot the tile accepts per block.
    pub capacity: Amount,
}

/// Where the crown is and who holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crown {
    /// Tile of the crown; follows the holder.
    pub pos: Coord,
    /// Hunter holding the crown.
    pub holder: Option<CharacterId>,
}

/// The complete game state after some block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldState {
    /// Height of the last applied block; 0 before the first.
    pub height: u32,
    /// Hash of the last applied block.
    pub block_hash: BlockHash,
    /// Live players by name.
    pub players: BTreeMap<String, Player>,
    /// Loot piles by tile.
    pub loot: BTreeMap<Coord, LootPile>,
    /// Bank tiles.
    pub banks: BTreeMap<Coord, Bank>,
    /// Tiles holding a heart.
    pub hearts: BTreeSet<Coord>,
    /// The crown, if the rules have one.
    pub crown: Option<Crown>,
    /// Game fees collected and not paid out.
    pub game_fund: Amount,
}

impl WorldState {
    /// The state before the first block.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules describe no valid grid.
    pub fn genesis(rules: &GameRules) -> EngineResult<Self> {
        let grid = rules.grid()?;
        let banks = grid
            .all_spawn_tiles()
            .into_iter()
            .map(|c| {
                (
                    c,
                    Bank {
                        capacity: rules.bank_capacity_per_block,
                    },
                )
            })
            .collect();
        Ok(Self {
            height: 0,
            block_hash: BlockHash::zero(),
            players: BTreeMap::new(),
            loot: BTreeMap::new(),
            banks,
            hearts: BTreeSet::new(),
            crown: rules.crown.as_ref().map(|c| Crown {
                pos: c.start,
                holder: None,
            }),
            game_fund: 0,
        })
    }

    /// Whether `c` is a bank tile.
    #[must_use]
    pub fn is_bank(&self, c: Coord) -> bool {
        self.banks.contains_key(&c)
    }

    /// Add (or with a negative amount, take) loot at a tile.
    ///
    /// Piles merge additively and disappear when they reach zero.
    pub fn add_loot(&mut self, c: Coord, amount: Amount, height: u32) {
        if amount == 0 {
            return;
        }
        let pile = self.loot.entry(c).or_insert(LootPile {
            amount: 0,
            first_block: height,
            last_block: height,
        });
        pile.amount += amount;
        if amount > 0 {
            pile.last_block = height;
        }
        debug_assert!(pile.amount >= 0, "negative loot at {c}");
        if pile.amount <= 0 {
            self.loot.remove(&c);
        }
    }

    /// All coins in play: loot piles, carried loot, stakes and the game fund.
    #[must_use]
    pub fn total_money(&self) -> Amount {
        let piles: Amount = self.loot.values().map(|p| p.amount).sum();
        let players: Amount = self.players.values().map(Player::value_on_map).sum();
        piles + players + self.game_fund
    }

    /// Number of live players.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Number of live hunters.
    #[must_use]
    pub fn hunter_count(&self) -> usize {
        self.players.values().map(|p| p.hunters.len()).sum()
    }

    /// Whether `id` holds the crown.
    #[must_use]
    pub fn holds_crown(&self, id: &CharacterId) -> bool {
        self.crown
            .as_ref()
            .and_then(|c| c.holder.as_ref())
            .is_some_and(|h| h == id)
    }

    /// Look up a hunter.
    #[must_use]
    pub fn hunter(&self, id: &CharacterId) -> Option<&Hunter> {
        self.players.get(&id.player)?.hunters.get(&id.index)
    }

    /// All hunters in evaluation order.
    pub fn hunters(&self) -> impl Iterator<Item = (CharacterId, &Hunter)> {
        self.players.iter().flat_map(|(name, p)| {
            p.hunters
                .iter()
                .map(move |(&i, h)| (CharacterId::new(name.clone(), i), h))
        })
    }

    /// BLAKE3 digest of the canonical encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be encoded.
    pub fn digest(&self) -> EngineResult<[u8; 32]> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"huntercore/state/v1");
        bincode::serialize_into(&mut hasher, self)
            .map_err(|e| EngineError::ConsensusViolation(format!("state encoding failed: {e}")))?;
        Ok(*hasher.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::economy::COIN;

    fn create_test_world() -> WorldState {
        WorldState::genesis(&GameRules::small()).unwrap()
    }

    #[test]
    fn test_character_id_display_and_order() {
        assert_eq!(CharacterId::new("bob", 0).to_string(), "bob");
        assert_eq!(CharacterId::new("bob", 3).to_string(), "bob.3");
        assert!(CharacterId::new("a", 5) < CharacterId::new("b", 0));
        assert!(CharacterId::new("a", 1) < CharacterId::new("a", 2));
    }

    #[test]
    fn test_add_loot_merges_and_erases() {
        let mut w = create_test_world();
        let c = Coord::new(30, 30);
        w.add_loot(c, 5, 3);
        w.add_loot(c, 7, 9);
        let pile = w.loot[&c];
        assert_eq!(pile.amount, 12);
        assert_eq!(pile.first_block, 3);
        assert_eq!(pile.last_block, 9);

        w.add_loot(c, -12, 10);
        assert!(w.loot.is_empty());
    }

    #[test]
    fn test_carried_loot_provenance() {
        let mut loot = CarriedLoot::default();
        let early = LootPile {
            amount: 10,
            first_block: 2,
            last_block: 4,
        };
        let late = LootPile {
            amount: 10,
            first_block: 6,
            last_block: 8,
        };
        loot.collect(&late, 5, 10);
        loot.collect(&early, 3, 12);
        loot.collect(&early, 0, 13);
        assert_eq!(loot.amount, 8);
        assert_eq!((loot.first_block, loot.last_block), (2, 8));
        assert_eq!((loot.collected_first, loot.collected_last), (10, 12));
    }

    #[test]
    fn test_genesis_banks_contain_origin() {
        let w = create_test_world();
        assert!(w.is_bank(Coord::new(0, 0)));
        assert!(!w.is_bank(Coord::new(1, 1)));
        assert_eq!(w.total_money(), 0);
    }

    #[test]
    fn test_total_money_counts_everything() {
        let mut w = create_test_world();
        let mut hunter = Hunter::spawn(Coord::new(0, 0), COIN, 1);
        hunter.loot.amount = 7;
        let player = Player {
            color: 0,
            owner: "addr".into(),
            address: None,
            message: None,
            locked: COIN,
            registered_at: 1,
            next_index: 1,
            hunters: BTreeMap::from([(0, hunter)]),
        };
        w.players.insert("a".into(), player);
        w.add_loot(Coord::new(5, 5), 11, 1);
        w.game_fund = 2;
        assert_eq!(w.total_money(), COIN + 7 + 11 + 2);
        assert_eq!(w.hunter_count(), 1);
    }

    #[test]
    fn test_digest_tracks_content() {
        let a = create_test_world();
        let mut b = a.clone();
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());
        b.game_fund = 1;
        assert_ne!(a.digest().unwrap(), b.digest().unwrap());
    }

    #[test]
    fn test_payout_address_override() {
        let mut p = Player {
            color: 1,
            owner: "owner".into(),
            address: None,
            message: None,
            locked: 0,
            registered_at: 0,
            next_index: 0,
            hunters: BTreeMap::new(),
        };
        assert_eq!(p.payout_address(), "owner");
        p.address = Some("other".into());
        assert_eq!(p.payout_address(), "other");
    }
}
