//! Chain layer: applying blocks to the game state and taking them back out.
//!
//! The controller keeps the tip [`WorldState`](crate::game::WorldState) and
//! an undo record for every block within reorg depth. Game transactions are
//! handed to a [`Ledger`] implementation owned by the caller.

mod block;
mod controller;
mod ledger;
mod store;
mod undo;
mod workload;

pub use block::Block;
pub use controller::{
    connect, disconnect, ActiveBlock, BlockReport, ChainConfig, ConnectedBlock, GameChain,
    StatsForHeight,
};
pub use ledger::{realize, unrealize, Ledger, MemoryLedger, OutPoint};
pub use store::{GameStore, StoreError};
pub use undo::UndoRecord;
pub use workload::{random_block, random_commands, seed_rng, Workload};
