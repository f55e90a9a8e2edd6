// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Huntercore: a deterministic consensus engine for an on-chain hunter game.
//!
//! Name operations in each block carry player commands. Every node replays
//! them against the same rules and block hash to get:
//! - Bit-identical world state
//! - The same synthetic game transactions (kill records and bounties)
//! - The same coinbase value, including game taxes
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   GameChain (connect / disconnect)  │
//! ├─────────────────────────────────────┤
//! │   process_block ─► materialize      │
//! ├─────────────────────────────────────┤
//! │   WorldState, Grid, GameRules       │
//! └─────────────────────────────────────┘
//! ```

pub mod chain;
pub mod error;
pub mod game;
pub mod hash;

pub use error::{EngineError, EngineResult};
pub use hash::{BlockHash, TxId};

// Re-export the types most callers need at the crate root
pub use chain::{Block, ChainConfig, GameChain, Ledger, MemoryLedger};
pub use game::{Amount, Coord, GameRules, GameTransaction, NameCommand, WorldState, COIN};
