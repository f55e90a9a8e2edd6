//! Simulate command implementation.
//!
//! A scenario file lists blocks of name operations:
//!
//! ```text
//! {
//!   "rules": { "map_width": 64, ... },
//!   "blocks": [
//!     { "commands": [ { "name": "alice", "payload": {"color": 0}, "registration": true } ] },
//!     { "fees": 1000, "commands": [ { "name": "alice", "payload": {"0": {"wp": [3, 3]}} } ] }
//!   ]
//! }
//! ```
//!
//! A payload given as a JSON string is passed through verbatim, so malformed
//! commands can be scripted too.

use super::output::{format_block_text, JsonBlockReport, JsonSimulation};
use super::{load_rules, CliError, OutputFormat};
use huntercore::chain::{Block, ChainConfig, GameChain, GameStore, MemoryLedger};
use huntercore::game::min_spawn_lock;
use huntercore::{Amount, GameRules, NameCommand};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// One scripted name operation.
#[derive(Debug, Deserialize)]
struct ScenarioCommand {
    name: String,
    payload: Value,
    #[serde(default)]
    locked: Option<Amount>,
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    registration: bool,
}

/// One scripted block.
#[derive(Debug, Deserialize)]
struct ScenarioBlock {
    #[serde(default)]
    salt: Option<String>,
    #[serde(default)]
    fees: Amount,
    #[serde(default)]
    commands: Vec<ScenarioCommand>,
}

/// A scenario file.
#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(default)]
    rules: Option<GameRules>,
    blocks: Vec<ScenarioBlock>,
}

impl ScenarioCommand {
    /// Resolve defaults against the current tip: spawns lock the minimum,
    /// updates keep the player's locked coins.
    fn into_command(self, chain: &GameChain) -> NameCommand {
        let player = chain.tip().players.get(&self.name);
        let locked = self.locked.unwrap_or_else(|| match player {
            Some(p) if !self.registration => p.locked,
            _ => min_spawn_lock(chain.rules()),
        });
        let owner = self
            .owner
            .or_else(|| player.map(|p| p.owner.clone()))
            .unwrap_or_else(|| format!("addr{}", self.name.replace([' ', '-', '_'], "")));
        let payload = match self.payload {
            Value::String(raw) => raw,
            other => other.to_string(),
        };
        NameCommand {
            name: self.name,
            payload,
            locked,
            owner,
            registration: self.registration,
        }
    }
}

/// Execute the simulate command.
///
/// # Errors
///
/// Returns an error if the scenario cannot be read or a block is rejected.
pub(crate) fn execute(
    scenario: &Path,
    rules_path: Option<PathBuf>,
    format: OutputFormat,
    store: Option<PathBuf>,
) -> Result<(), CliError> {
    let text = fs::read_to_string(scenario)
        .map_err(|e| CliError::new(format!("Failed to read {}: {e}", scenario.display())))?;
    let scenario: Scenario = serde_json::from_str(&text)?;

    let rules = match (rules_path, scenario.rules) {
        (Some(path), _) => load_rules(Some(&path), false)?,
        (None, Some(rules)) => rules,
        (None, None) => GameRules::small(),
    };
    let mut chain = GameChain::new(rules, ChainConfig::default())?;
    let mut ledger = MemoryLedger::new();
    let mut reports = Vec::with_capacity(scenario.blocks.len());

    for (i, scripted) in scenario.blocks.into_iter().enumerate() {
        let commands = scripted
            .commands
            .into_iter()
            .map(|c| c.into_command(&chain))
            .collect();
        let salt = scripted.salt.unwrap_or_else(|| i.to_string());
        let mut block = Block::derived(chain.height() + 1, chain.tip().block_hash, salt.as_bytes(), commands);
        block.fees = scripted.fees;
        let report = chain.connect_block(block, &mut ledger)?;
        if format == OutputFormat::Text {
            print!("{}", format_block_text(&report));
        }
        reports.push(JsonBlockReport::from_report(&report));
    }

    if let Some(dir) = store {
        let store = GameStore::open(&dir)?;
        store.save_chain(&chain)?;
        info!(dir = %dir.display(), height = chain.height(), "saved chain");
    }

    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", serde_json::to_string_pretty(&chain.world_view())?);
        }
        OutputFormat::Json => {
            let result = JsonSimulation {
                blocks: reports,
                world: chain.world_view(),
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}
