//! Error types for the game engine.

use thiserror::Error;

/// Errors raised while applying or reverting game state transitions.
///
/// `MalformedCommand` and `InvalidTransition` affect a single command and are
/// recovered from inside the block processor: the command is dropped and the
/// block is still valid. The remaining variants reject the whole operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A name operation's payload does not parse as a game command.
    #[error("malformed command from '{player}': {reason}")]
    MalformedCommand {
        /// Player name the command was sent under.
        player: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A well-formed command that the current state does not allow.
    #[error("invalid transition for '{player}': {reason}")]
    InvalidTransition {
        /// Player name the command was sent under.
        player: String,
        /// Why it was refused.
        reason: String,
    },

    /// A block's claimed game outcome disagrees with the recomputation, or
    /// the block does not extend the state it is applied to.
    #[error("consensus violation: {0}")]
    ConsensusViolation(String),

    /// An undo record does not match the state it is applied to.
    #[error("undo mismatch: {0}")]
    UndoMismatch(String),

    /// A query referenced something that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The ledger collaborator refused an operation.
    #[error("ledger error: {0}")]
    Ledger(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Whether the error only invalidates a single command.
    #[must_use]
    pub const fn is_command_local(&self) -> bool {
        matches!(
            self,
            Self::MalformedCommand { .. } | Self::InvalidTransition { .. }
        )
    }

    pub(crate) fn malformed(player: &str, reason: impl Into<String>) -> Self {
        Self::MalformedCommand {
            player: player.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(player: &str, reason: impl Into<String>) -> Self {
        Self::InvalidTransition {
            player: player.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = EngineError::malformed("alice", "unknown key 'foo'");
        assert_eq!(e.to_string(), "malformed command from 'alice': unknown key 'foo'");
        assert!(e.is_command_local());

        let e = EngineError::ConsensusViolation("coinbase too large".into());
        assert!(e.to_string().contains("coinbase too large"));
        assert!(!e.is_command_local());
    }
}
