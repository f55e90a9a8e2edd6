//! Game commands carried in name operation payloads.
//!
//! A registration carries a spawn command:
//!
//! ```text
//! {"color": 2, "msg": "hello", "address": "HXyz..."}
//! ```
//!
//! An update carries orders for hunters by index plus optional player-wide
//! fields:
//!
//! ```text
//! {"0": {"wp": [10, 12, 20, 12]}, "1": {"destruct": true}, "msg": "bye"}
//! ```
//!
//! Parsing is strict: unknown keys, non-canonical indices, odd waypoint
//! arrays and repeated consecutive waypoints are all rejected.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{EngineError, EngineResult};
use crate::game::economy::Amount;
use crate::game::grid::Coord;
use crate::game::world::Address;

/// Longest allowed player name in bytes.
pub const MAX_NAME_LENGTH: usize = 255;

/// Longest allowed payout address.
pub(crate) const MAX_ADDRESS_LENGTH: usize = 100;

/// Number of team colours.
pub const NUM_COLORS: u8 = 4;

/// A validated name operation handed over by the name subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameCommand {
    /// Name the operation is for.
    pub name: String,
    /// JSON payload.
    pub payload: String,
    /// Coins locked in the resulting name output.
    pub locked: Amount,
    /// Address holding the resulting name output.
    pub owner: Address,
    /// Whether this is the first registration of the name.
    pub registration: bool,
}

/// Orders for one hunter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HunterOrder {
    /// New path, if one was given. An empty path stops the hunter.
    pub waypoints: Option<Vec<Coord>>,
    /// Blow up this hunter.
    pub destruct: bool,
}

/// A parsed game command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameCommand {
    /// Enter the game.
    Spawn {
        /// Team colour.
        color: u8,
        /// Payout address override.
        address: Option<Address>,
        /// Chat message.
        message: Option<String>,
    },
    /// Steer existing hunters.
    Update {
        /// Orders by hunter index.
        orders: BTreeMap<u32, HunterOrder>,
        /// New payout address; empty clears the override.
        address: Option<Address>,
        /// Chat message.
        message: Option<String>,
    },
}

impl GameCommand {
    /// Whether this is a spawn.
    #[must_use]
    pub const fn is_spawn(&self) -> bool {
        matches!(self, Self::Spawn { .. })
    }

    /// Number of destructs requested.
    #[must_use]
    pub fn destruct_count(&self) -> usize {
        match self {
            Self::Spawn { .. } => 0,
            Self::Update { orders, .. } => orders.values().filter(|o| o.destruct).count(),
        }
    }

    /// Requested payout address change.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        match self {
            Self::Spawn { address, .. } | Self::Update { address, .. } => address.as_deref(),
        }
    }

    /// Chat message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Spawn { message, .. } | Self::Update { message, .. } => message.as_deref(),
        }
    }
}

/// Check a player name: words of `[A-Za-z0-9_-]` separated by single spaces.
#[must_use]
pub fn is_valid_player_name(name: &str) -> bool {
    name.len() <= MAX_NAME_LENGTH
        && name.split(' ').all(|word| {
            !word.is_empty()
                && word
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        })
}

fn is_valid_address(addr: &str) -> bool {
    addr.len() <= MAX_ADDRESS_LENGTH && addr.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Parse the payload of a name operation for `player`.
///
/// # Errors
///
/// Returns [`EngineError::MalformedCommand`] describing the first problem
/// found. Coordinates are not checked against the grid here.
pub fn parse_command(player: &str, payload: &str, max_waypoints: usize) -> EngineResult<GameCommand> {
    if !is_valid_player_name(player) {
        return Err(EngineError::malformed(player, "invalid player name"));
    }
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| EngineError::malformed(player, format!("invalid JSON: {e}")))?;
    let Value::Object(mut obj) = value else {
        return Err(EngineError::malformed(player, "payload is not an object"));
    };

    let message = take_string(player, &mut obj, "msg")?;
    let address = take_string(player, &mut obj, "address")?;
    if let Some(addr) = &address {
        if !is_valid_address(addr) {
            return Err(EngineError::malformed(player, format!("invalid address '{addr}'")));
        }
    }

    if let Some(color) = obj.remove("color") {
        let color = color
            .as_u64()
            .and_then(|c| u8::try_from(c).ok())
            .filter(|&c| c < NUM_COLORS)
            .ok_or_else(|| EngineError::malformed(player, format!("invalid color {color}")))?;
        if let Some(key) = obj.keys().next() {
            return Err(EngineError::malformed(player, format!("unexpected key '{key}' in spawn")));
        }
        return Ok(GameCommand::Spawn {
            color,
            address,
            message,
        });
    }

    let mut orders = BTreeMap::new();
    for (key, order) in obj {
        let index: u32 = key
            .parse()
            .ok()
            .filter(|i: &u32| i.to_string() == key)
            .ok_or_else(|| EngineError::malformed(player, format!("unexpected key '{key}'")))?;
        let Value::Object(mut order) = order else {
            return Err(EngineError::malformed(player, format!("orders for {index} are not an object")));
        };

        let waypoints = match order.remove("wp") {
            Some(wp) => Some(parse_waypoints(player, &wp, max_waypoints)?),
            None => None,
        };
        let destruct = match order.remove("destruct") {
            Some(Value::Bool(b)) => b,
            Some(other) => {
                return Err(EngineError::malformed(player, format!("destruct must be a boolean, got {other}")));
            }
            None => false,
        };
        if let Some(extra) = order.keys().next() {
            return Err(EngineError::malformed(player, format!("unexpected key '{extra}' for {index}")));
        }
        orders.insert(
            index,
            HunterOrder {
                waypoints,
                destruct,
            },
        );
    }

    Ok(GameCommand::Update {
        orders,
        address,
        message,
    })
}

fn take_string(player: &str, obj: &mut Map<String, Value>, key: &str) -> EngineResult<Option<String>> {
    match obj.remove(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(EngineError::malformed(player, format!("{key} must be a string, got {other}"))),
    }
}

fn parse_waypoints(player: &str, wp: &Value, max_waypoints: usize) -> EngineResult<Vec<Coord>> {
    let Value::Array(items) = wp else {
        return Err(EngineError::malformed(player, "wp must be an array"));
    };
    if items.len() % 2 != 0 {
        return Err(EngineError::malformed(player, "wp has an odd number of entries"));
    }
    if items.len() / 2 > max_waypoints {
        return Err(EngineError::malformed(player, format!("more than {max_waypoints} waypoints")));
    }

    let mut path: Vec<Coord> = Vec::with_capacity(items.len() / 2);
    for pair in items.chunks_exact(2) {
        let coord = |v: &Value| {
            v.as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| EngineError::malformed(player, format!("invalid waypoint coordinate {v}")))
        };
        let c = Coord::new(coord(&pair[0])?, coord(&pair[1])?);
        if path.last() == Some(&c) {
            return Err(EngineError::malformed(player, format!("repeated waypoint {c}")));
        }
        path.push(c);
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_names() {
        assert!(is_valid_player_name("a"));
        assert!(is_valid_player_name("Big Bad-Wolf_2"));
        assert!(!is_valid_player_name(""));
        assert!(!is_valid_player_name(" a"));
        assert!(!is_valid_player_name("a "));
        assert!(!is_valid_player_name("a  b"));
        assert!(!is_valid_player_name("a.b"));
        assert!(!is_valid_player_name(&"x".repeat(256)));
    }

    #[test]
    fn test_parse_spawn() {
        let cmd = parse_command("a", r#"{"color":2,"msg":"hi"}"#, 100).unwrap();
        assert_eq!(
            cmd,
            GameCommand::Spawn {
                color: 2,
                address: None,
                message: Some("hi".into()),
            }
        );
        assert!(cmd.is_spawn());
    }

    #[test]
    fn test_parse_spawn_rejects_extras() {
        assert!(parse_command("a", r#"{"color":4}"#, 100).is_err());
        assert!(parse_command("a", r#"{"color":0,"0":{}}"#, 100).is_err());
        assert!(parse_command("a", r#"{"color":"0"}"#, 100).is_err());
    }

    #[test]
    fn test_parse_update() {
        let cmd = parse_command("a", r#"{"0":{"wp":[1,2,3,4]},"2":{"destruct":true},"address":"abc"}"#, 100).unwrap();
        let GameCommand::Update { orders, address, .. } = &cmd else {
            panic!("expected update");
        };
        assert_eq!(orders[&0].waypoints, Some(vec![Coord::new(1, 2), Coord::new(3, 4)]));
        assert!(!orders[&0].destruct);
        assert!(orders[&2].destruct);
        assert_eq!(address.as_deref(), Some("abc"));
        assert_eq!(cmd.destruct_count(), 1);
    }

    #[test]
    fn test_parse_update_strictness() {
        for bad in [
            r#"{"01":{"wp":[1,2]}}"#,
            r#"{"-1":{"wp":[1,2]}}"#,
            r#"{"x":{}}"#,
            r#"{"0":{"wp":[1,2,3]}}"#,
            r#"{"0":{"wp":[1,2,1,2]}}"#,
            r#"{"0":{"wp":[1.5,2]}}"#,
            r#"{"0":{"destruct":1}}"#,
            r#"{"0":{"speed":3}}"#,
            r#"{"0":[1,2]}"#,
            r#"{"msg":5}"#,
            r#"{"address":"not valid!"}"#,
            r#"[1,2]"#,
            "not json",
        ] {
            assert!(
                matches!(parse_command("a", bad, 100), Err(EngineError::MalformedCommand { .. })),
                "accepted {bad}"
            );
        }
    }

    #[test]
    fn test_waypoint_limit() {
        let coords: Vec<String> = (0..3).map(|i| format!("{i},{i}")).collect();
        let payload = format!(r#"{{"0":{{"wp":[{}]}}}}"#, coords.join(","));
        assert!(parse_command("a", &payload, 3).is_ok());
        assert!(parse_command("a", &payload, 2).is_err());
    }

    #[test]
    fn test_empty_waypoints_stop() {
        let cmd = parse_command("a", r#"{"0":{"wp":[]}}"#, 100).unwrap();
        let GameCommand::Update { orders, .. } = cmd else {
            panic!("expected update");
        };
        assert_eq!(orders[&0].waypoints, Some(Vec::new()));
    }

    #[test]
    fn test_invalid_name_rejected() {
        assert!(parse_command("bad name ", r#"{"color":0}"#, 100).is_err());
    }
}
