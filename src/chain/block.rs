//! Blocks as the game sees them.

use serde::{Deserialize, Serialize};

use crate::game::{Amount, NameCommand};
use crate::hash::{BlockHash, TxId};

/// The game-relevant content of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Height of this block.
    pub height: u32,
    /// Hash of this block.
    pub hash: BlockHash,
    /// Hash of the parent block.
    pub parent: BlockHash,
    /// Name operations in transaction order.
    pub commands: Vec<NameCommand>,
    /// Transaction fees paid to the miner.
    #[serde(default)]
    pub fees: Amount,
    /// Game transaction ids the block claims, if it carries them.
    #[serde(default)]
    pub claimed_txids: Option<Vec<TxId>>,
    /// Coinbase value the block claims, if known.
    #[serde(default)]
    pub claimed_coinbase: Option<Amount>,
}

impl Block {
    /// A block without claims on top of `parent`.
    #[must_use]
    pub fn new(height: u32, hash: BlockHash, parent: BlockHash, commands: Vec<NameCommand>) -> Self {
        Self {
            height,
            hash,
            parent,
            commands,
            fees: 0,
            claimed_txids: None,
            claimed_coinbase: None,
        }
    }

    /// A block whose hash is derived from its height, parent and a salt.
    ///
    /// Simulations use the salt to build competing branches.
    #[must_use]
    pub fn derived(height: u32, parent: BlockHash, salt: &[u8], commands: Vec<NameCommand>) -> Self {
        let hash = BlockHash::derive(&[parent.as_bytes(), &height.to_le_bytes(), salt]);
        Self::new(height, hash, parent, commands)
    }
}
