//! Turns game events into game transactions.
//!
//! A block yields at most two game transactions: one carrying every kill,
//! then one carrying every bounty. Kill inputs spend nothing and have no
//! outputs; each bounty input pairs with the output at the same position.
//!
//! Identifiers hash a canonical encoding of the transaction and nothing
//! else, so the same events re-mined after a reorg get the same id.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::game::economy::Amount;
use crate::game::lifecycle::{BountyEvent, BountySource, GameEvent, KillEvent};
use crate::game::world::Address;
use crate::hash::TxId;

const DOMAIN: &[u8] = b"huntercore/gametx/v1";

/// Kind of game transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameTxKind {
    /// Players killed in the block.
    Kills,
    /// Loot banked in the block.
    Bounties,
}

/// Synthetic input of a game transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyntheticInput {
    /// A player died.
    KilledBy {
        /// Victim.
        player: String,
        /// Killer hunters as `name` or `name.index`; empty for spawn deaths.
        killers: Vec<String>,
        /// Height the victim's life started at.
        life: u32,
    },
    /// A hunter banked.
    Banking {
        /// Player.
        player: String,
        /// Hunter index.
        index: u32,
        /// Earliest drop height of the banked coins.
        first_block: u32,
        /// Latest drop height of the banked coins.
        last_block: u32,
        /// Height of the first pickup.
        collected_first: u32,
        /// Height of the last pickup.
        collected_last: u32,
        /// Gross amount of the same loot banked in earlier blocks, which
        /// tells apart the payouts of a throttled bank.
        banked_before: Amount,
    },
    /// A general that died on a bank got its stake back.
    Refund {
        /// Player.
        player: String,
        /// Hunter index.
        index: u32,
        /// Height the player's life started at.
        life: u32,
    },
}

/// Coins paid by a bounty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinOutput {
    /// Amount.
    pub amount: Amount,
    /// Receiving address.
    pub address: Address,
}

/// A transaction the game creates on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTransaction {
    /// Kind.
    pub kind: GameTxKind,
    /// Inputs in event order.
    pub inputs: Vec<SyntheticInput>,
    /// Outputs, one per bounty input.
    pub outputs: Vec<CoinOutput>,
}

struct Encoder {
    hasher: blake3::Hasher,
}

impl Encoder {
    fn u8(&mut self, v: u8) {
        self.hasher.update(&[v]);
    }

    fn u32(&mut self, v: u32) {
        self.hasher.update(&v.to_le_bytes());
    }

    fn i64(&mut self, v: i64) {
        self.hasher.update(&v.to_le_bytes());
    }

    fn len(&mut self, n: usize) {
        self.hasher.update(&(n as u64).to_le_bytes());
    }

    fn str(&mut self, s: &str) {
        self.len(s.len());
        self.hasher.update(s.as_bytes());
    }
}

impl GameTransaction {
    /// Deterministic identifier.
    #[must_use]
    pub fn txid(&self) -> TxId {
        let mut enc = Encoder {
            hasher: blake3::Hasher::new(),
        };
        enc.hasher.update(DOMAIN);
        enc.u8(match self.kind {
            GameTxKind::Kills => 0,
            GameTxKind::Bounties => 1,
        });

        enc.len(self.inputs.len());
        for input in &self.inputs {
            match input {
                SyntheticInput::KilledBy {
                    player,
                    killers,
                    life,
                } => {
                    enc.u8(0);
                    enc.str(player);
                    enc.len(killers.len());
                    for k in killers {
                        enc.str(k);
                    }
                    enc.u32(*life);
                }
                SyntheticInput::Banking {
                    player,
                    index,
                    first_block,
                    last_block,
                    collected_first,
                    collected_last,
                    banked_before,
                } => {
                    enc.u8(1);
                    enc.str(player);
                    for v in [*index, *first_block, *last_block, *collected_first, *collected_last] {
                        enc.u32(v);
                    }
                    enc.i64(*banked_before);
                }
                SyntheticInput::Refund { player, index, life } => {
                    enc.u8(2);
                    enc.str(player);
                    enc.u32(*index);
                    enc.u32(*life);
                }
            }
        }

        enc.len(self.outputs.len());
        for out in &self.outputs {
            enc.i64(out.amount);
            enc.str(&out.address);
        }

        TxId::from_bytes(*enc.hasher.finalize().as_bytes())
    }

    /// Total value paid out.
    #[must_use]
    pub fn value_out(&self) -> Amount {
        self.outputs.iter().map(|o| o.amount).sum()
    }

    /// JSON view in the form block explorers show game transactions.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let inputs: Vec<Value> = self
            .inputs
            .iter()
            .map(|input| match input {
                SyntheticInput::KilledBy { player, killers, .. } => json!({
                    "player": player,
                    "killers": killers,
                    "op": "killed_by",
                }),
                SyntheticInput::Banking { player, index, .. } => json!({
                    "player": player,
                    "index": index,
                    "op": "banking",
                }),
                SyntheticInput::Refund { player, index, .. } => json!({
                    "player": player,
                    "index": index,
                    "op": "refund",
                }),
            })
            .collect();
        let outputs: Vec<Value> = self
            .outputs
            .iter()
            .map(|o| {
                json!({
                    "value": crate::game::economy::format_amount(o.amount),
                    "address": o.address,
                })
            })
            .collect();
        json!({
            "txid": self.txid().to_string(),
            "inputs": inputs,
            "outputs": outputs,
        })
    }
}

fn kill_input(kill: &KillEvent) -> SyntheticInput {
    SyntheticInput::KilledBy {
        player: kill.player.clone(),
        killers: kill.killers.iter().map(ToString::to_string).collect(),
        life: kill.life,
    }
}

fn bounty_input(bounty: &BountyEvent) -> (SyntheticInput, CoinOutput) {
    let loot = &bounty.loot;
    let input = match bounty.source {
        BountySource::Banking { banked_before } => SyntheticInput::Banking {
            player: bounty.player.clone(),
            index: bounty.index,
            first_block: loot.first_block,
            last_block: loot.last_block,
            collected_first: loot.collected_first,
            collected_last: loot.collected_last,
            banked_before,
        },
        BountySource::Refund { life } => SyntheticInput::Refund {
            player: bounty.player.clone(),
            index: bounty.index,
            life,
        },
    };
    (
        input,
        CoinOutput {
            amount: loot.amount,
            address: bounty.address.clone(),
        },
    )
}

/// Build the game transactions for one block's events.
///
/// Returns the kill transaction (if anyone died) followed by the bounty
/// transaction (if anyone banked).
#[must_use]
pub fn materialize(events: &[GameEvent]) -> Vec<GameTransaction> {
    let mut kills = GameTransaction {
        kind: GameTxKind::Kills,
        inputs: Vec::new(),
        outputs: Vec::new(),
    };
    let mut bounties = GameTransaction {
        kind: GameTxKind::Bounties,
        inputs: Vec::new(),
        outputs: Vec::new(),
    };

    for event in events {
        match event {
            GameEvent::Killed(k) => kills.inputs.push(kill_input(k)),
            GameEvent::Banked(b) => {
                let (input, output) = bounty_input(b);
                bounties.inputs.push(input);
                bounties.outputs.push(output);
            }
        }
    }

    [kills, bounties]
        .into_iter()
        .filter(|tx| !tx.inputs.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::economy::COIN;
    use crate::game::lifecycle::DeathCause;
    use crate::game::world::{CarriedLoot, CharacterId};
    use std::collections::BTreeSet;

    fn kill(player: &str, killers: &[(&str, u32)]) -> GameEvent {
        GameEvent::Killed(KillEvent {
            player: player.into(),
            killers: killers.iter().map(|&(p, i)| CharacterId::new(p, i)).collect::<BTreeSet<_>>(),
            cause: DeathCause::Destruct,
            life: 3,
        })
    }

    fn bounty(player: &str, amount: Amount, address: &str) -> GameEvent {
        GameEvent::Banked(BountyEvent {
            player: player.into(),
            index: 0,
            loot: CarriedLoot {
                amount,
                first_block: 5,
                last_block: 6,
                collected_first: 7,
                collected_last: 7,
                banked: 0,
            },
            address: address.into(),
            source: BountySource::Banking { banked_before: 0 },
        })
    }

    #[test]
    fn test_no_events_no_transactions() {
        assert!(materialize(&[]).is_empty());
    }

    #[test]
    fn test_kills_combined_into_one_tx() {
        let txs = materialize(&[kill("a", &[("a", 0)]), kill("b", &[("b", 0)])]);
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].kind, GameTxKind::Kills);
        assert_eq!(txs[0].inputs.len(), 2);
        assert!(txs[0].outputs.is_empty());
        let json = txs[0].to_json();
        assert_eq!(json["inputs"][0]["player"], "a");
        assert_eq!(json["inputs"][0]["killers"][0], "a");
        assert_eq!(json["inputs"][0]["op"], "killed_by");
    }

    #[test]
    fn test_kills_before_bounties() {
        let txs = materialize(&[bounty("c", COIN, "x"), kill("a", &[("b", 2)])]);
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].kind, GameTxKind::Kills);
        assert_eq!(txs[1].kind, GameTxKind::Bounties);
        assert_eq!(txs[1].value_out(), COIN);
        assert_eq!(txs[1].to_json()["inputs"][0]["op"], "banking");
        let SyntheticInput::KilledBy { killers, .. } = &txs[0].inputs[0] else {
            panic!("expected kill input");
        };
        assert_eq!(killers, &vec!["b.2".to_string()]);
    }

    #[test]
    fn test_txid_deterministic() {
        let events = [bounty("a", COIN, "addr1")];
        assert_eq!(materialize(&events)[0].txid(), materialize(&events)[0].txid());
    }

    #[test]
    fn test_txid_changes_with_address() {
        let a = materialize(&[bounty("a", COIN, "addr1")]);
        let b = materialize(&[bounty("a", COIN, "addr2")]);
        assert_ne!(a[0].txid(), b[0].txid());
    }

    #[test]
    fn test_throttled_bankings_get_distinct_txids() {
        let first = bounty("a", COIN, "addr");
        let mut second = first.clone();
        if let GameEvent::Banked(b) = &mut second {
            b.source = BountySource::Banking { banked_before: COIN };
        }
        assert_ne!(materialize(&[first])[0].txid(), materialize(&[second])[0].txid());
    }

    #[test]
    fn test_refund_input() {
        let refund = GameEvent::Banked(BountyEvent {
            player: "a".into(),
            index: 0,
            loot: CarriedLoot {
                amount: COIN,
                ..CarriedLoot::default()
            },
            address: "addr".into(),
            source: BountySource::Refund { life: 4 },
        });
        let txs = materialize(&[kill("a", &[]), refund]);
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[1].inputs[0], SyntheticInput::Refund {
            player: "a".into(),
            index: 0,
            life: 4,
        });
        assert_eq!(txs[1].value_out(), COIN);
        assert_eq!(txs[1].to_json()["inputs"][0]["op"], "refund");
    }

    #[test]
    fn test_txid_changes_with_killers() {
        let a = materialize(&[kill("a", &[("a", 0)])]);
        let b = materialize(&[kill("a", &[("a", 0), ("b", 0)])]);
        assert_ne!(a[0].txid(), b[0].txid());
    }
}
