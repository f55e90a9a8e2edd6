//! JSON views of the world state for queries and the CLI.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::game::economy::format_amount;
use crate::game::grid::Coord;
use crate::game::world::{Hunter, Player, WorldState};
use crate::game::GameRules;

/// A hunter as shown to clients.
#[derive(Debug, Clone, Serialize)]
pub struct HunterView {
    /// Current tile `[x, y]`.
    pub position: [i32; 2],
    /// Remaining waypoints, next one first.
    pub waypoints: Vec<[i32; 2]>,
    /// Carried loot.
    pub loot: String,
    /// Blocks left to reach the last waypoint.
    pub eta: u64,
    /// Whether others cannot kill it yet.
    pub protected: bool,
    /// Blocks spent on a bank tile.
    pub bank_stay: u32,
    /// Whether it holds the crown.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub has_crown: bool,
}

/// A player as shown to clients.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    /// Team colour.
    pub color: u8,
    /// Stake of the general.
    pub value: String,
    /// Where bounties are paid.
    pub address: String,
    /// Last chat message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    /// Height of the last chat message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg_block: Option<u32>,
    /// Hunters by index.
    pub characters: BTreeMap<u32, HunterView>,
}

/// A loot pile as shown to clients.
#[derive(Debug, Clone, Serialize)]
pub struct LootView {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Amount.
    pub amount: String,
    /// First drop height.
    pub first_block: u32,
    /// Last drop height.
    pub last_block: u32,
}

/// The crown as shown to clients.
#[derive(Debug, Clone, Serialize)]
pub struct CrownView {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Holding player.
    #[serde(rename = "holderName", skip_serializing_if = "Option::is_none")]
    pub holder_name: Option<String>,
    /// Index of the holding hunter.
    #[serde(rename = "holderIndex", skip_serializing_if = "Option::is_none")]
    pub holder_index: Option<u32>,
}

/// The whole world as shown to clients.
#[derive(Debug, Clone, Serialize)]
pub struct WorldView {
    /// Height of the last applied block.
    pub height: u32,
    /// Hash of the last applied block.
    pub hash: String,
    /// Players by name.
    pub players: BTreeMap<String, PlayerView>,
    /// Loot piles.
    pub loot: Vec<LootView>,
    /// Bank tiles.
    pub banks: Vec<[i32; 2]>,
    /// Heart tiles.
    pub hearts: Vec<[i32; 2]>,
    /// The crown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crown: Option<CrownView>,
    /// Game fund.
    pub game_fund: String,
}

const fn xy(c: Coord) -> [i32; 2] {
    [c.x, c.y]
}

impl HunterView {
    /// View of a hunter at `height`.
    #[must_use]
    pub fn new(hunter: &Hunter, has_crown: bool, height: u32, rules: &GameRules) -> Self {
        Self {
            position: xy(hunter.pos()),
            waypoints: hunter.motion.waypoints.iter().copied().map(xy).collect(),
            loot: format_amount(hunter.loot.amount),
            eta: hunter.motion.time_to_destination(),
            protected: hunter.is_protected(height, rules),
            bank_stay: hunter.bank_stay,
            has_crown,
        }
    }
}

impl PlayerView {
    /// View of the player `name` in `state`.
    #[must_use]
    pub fn new(name: &str, player: &Player, state: &WorldState, rules: &GameRules) -> Self {
        let crown_index = state
            .crown
            .as_ref()
            .and_then(|c| c.holder.as_ref())
            .filter(|h| h.player == name)
            .map(|h| h.index);
        Self {
            color: player.color,
            value: format_amount(player.general().map_or(0, |g| g.stake)),
            address: player.payout_address().to_string(),
            msg: player.message.as_ref().map(|m| m.text.clone()),
            msg_block: player.message.as_ref().map(|m| m.block),
            characters: player
                .hunters
                .iter()
                .map(|(&i, h)| (i, HunterView::new(h, crown_index == Some(i), state.height, rules)))
                .collect(),
        }
    }
}

impl WorldView {
    /// View of a whole state.
    #[must_use]
    pub fn new(state: &WorldState, rules: &GameRules) -> Self {
        Self {
            height: state.height,
            hash: state.block_hash.to_string(),
            players: state
                .players
                .iter()
                .map(|(name, p)| (name.clone(), PlayerView::new(name, p, state, rules)))
                .collect(),
            loot: state
                .loot
                .iter()
                .map(|(c, pile)| LootView {
                    x: c.x,
                    y: c.y,
                    amount: format_amount(pile.amount),
                    first_block: pile.first_block,
                    last_block: pile.last_block,
                })
                .collect(),
            banks: state.banks.keys().copied().map(xy).collect(),
            hearts: state.hearts.iter().copied().map(xy).collect(),
            crown: state.crown.as_ref().map(|c| CrownView {
                x: c.pos.x,
                y: c.pos.y,
                holder_name: c.holder.as_ref().map(|h| h.player.clone()),
                holder_index: c.holder.as_ref().map(|h| h.index),
            }),
            game_fund: format_amount(state.game_fund),
        }
    }
}
