//! CLI command implementations for Huntercore.

pub(crate) mod query;
pub(crate) mod simulate;
pub(crate) mod soak;

mod output;

use clap::ValueEnum;
use huntercore::chain::StoreError;
use huntercore::{EngineError, GameRules};
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

/// Output format shared by all commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("JSON error: {e}"))
    }
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        Self::new(e.to_string())
    }
}

/// Rules from a JSON file, or the built-in set.
///
/// # Errors
///
/// Returns an error if the file cannot be read, does not parse, or
/// describes an unusable grid.
pub(crate) fn load_rules(path: Option<&Path>, small: bool) -> Result<GameRules, CliError> {
    let rules = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| CliError::new(format!("Failed to read {}: {e}", path.display())))?;
            serde_json::from_str(&text)?
        }
        None if small => GameRules::small(),
        None => GameRules::default(),
    };
    rules.grid()?;
    Ok(rules)
}
