//! Block integration: connecting and disconnecting blocks, reorganisations
//! and queries against the active chain.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use crate::chain::block::Block;
use crate::chain::ledger::{realize, unrealize, Ledger};
use crate::chain::undo::UndoRecord;
use crate::error::{EngineError, EngineResult};
use crate::game::{
    assert_invariants, coinbase_value, materialize, process_block, Amount, Coord, GameRules,
    GameTransaction, PlayerView, WorldState, WorldView,
};
use crate::hash::{BlockHash, TxId};

/// Controller settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Number of blocks that can be disconnected from the tip.
    pub max_reorg_depth: u32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self { max_reorg_depth: 100 }
    }
}

/// Per-block statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsForHeight {
    /// Height.
    pub height: u32,
    /// Block hash.
    pub block_hash: BlockHash,
    /// Live players after the block.
    pub players: usize,
    /// Live hunters after the block.
    pub hunters: usize,
    /// Game transactions the block created.
    pub game_txids: Vec<TxId>,
    /// Game taxes credited to the miner.
    pub taxes: Amount,
}

/// Result of [`connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedBlock {
    /// State after the block.
    pub state: WorldState,
    /// Game transactions, kills first.
    pub transactions: Vec<GameTransaction>,
    /// Their identifiers.
    pub txids: Vec<TxId>,
    /// Record to revert the block.
    pub undo: UndoRecord,
    /// Game taxes credited to the miner.
    pub taxes: Amount,
    /// Expected coinbase value.
    pub coinbase: Amount,
    /// Commands the block carried that had no effect.
    pub rejected: Vec<EngineError>,
}

/// Apply `block` on top of `prior`.
///
/// Pure: nothing outside the returned value changes.
///
/// # Errors
///
/// Returns [`EngineError::ConsensusViolation`] if the block does not extend
/// `prior`, its claims disagree with the recomputed outcome, or block
/// processing fails.
pub fn connect(rules: &GameRules, block: &Block, prior: &WorldState) -> EngineResult<ConnectedBlock> {
    if block.height != prior.height + 1 || block.parent != prior.block_hash {
        return Err(EngineError::ConsensusViolation(format!(
            "block {} at height {} does not extend {} at height {}",
            block.hash, block.height, prior.block_hash, prior.height
        )));
    }

    let outcome = process_block(rules, prior, block.hash, &block.commands)?;
    let transactions = materialize(&outcome.events);
    let txids: Vec<TxId> = transactions.iter().map(GameTransaction::txid).collect();
    let coinbase = coinbase_value(rules, block.height, block.fees, outcome.taxes);

    if let Some(claimed) = &block.claimed_txids {
        if claimed != &txids {
            return Err(EngineError::ConsensusViolation(format!(
                "block {} claims {} game transactions, recomputed {}",
                block.hash,
                claimed.len(),
                txids.len()
            )));
        }
    }
    if let Some(claimed) = block.claimed_coinbase {
        if claimed != coinbase {
            return Err(EngineError::ConsensusViolation(format!(
                "block {} claims coinbase {claimed}, expected {coinbase}",
                block.hash
            )));
        }
    }

    let undo = UndoRecord::between(prior, &outcome.state, txids.clone())?;
    Ok(ConnectedBlock {
        state: outcome.state,
        transactions,
        txids,
        undo,
        taxes: outcome.taxes,
        coinbase,
        rejected: outcome.rejected,
    })
}

/// Revert `block` from `current` using its undo record.
///
/// # Errors
///
/// Returns [`EngineError::UndoMismatch`] if the record does not belong to
/// the block or to `current`.
pub fn disconnect(block: &Block, undo: &UndoRecord, current: &WorldState) -> EngineResult<WorldState> {
    if undo.block_hash != block.hash {
        return Err(EngineError::UndoMismatch(format!(
            "undo record for {} used to disconnect {}",
            undo.block_hash, block.hash
        )));
    }
    if current.height != block.height {
        return Err(EngineError::UndoMismatch(format!(
            "state is at height {}, block at {}",
            current.height, block.height
        )));
    }
    undo.apply(current)
}

/// A connected block kept for reorganisations and queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveBlock {
    /// The block.
    pub block: Block,
    /// How to revert it.
    pub undo: UndoRecord,
    /// What it did.
    pub stats: StatsForHeight,
    /// Game transactions it created.
    pub transactions: Vec<GameTransaction>,
}

/// Summary handed back by [`GameChain::connect_block`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockReport {
    /// Statistics of the block.
    pub stats: StatsForHeight,
    /// Game transactions it created.
    pub transactions: Vec<GameTransaction>,
    /// Expected coinbase value.
    pub coinbase: Amount,
    /// Commands that had no effect.
    pub rejected: Vec<EngineError>,
}

/// The game state of the active chain plus enough history to reorganise.
#[derive(Debug, Clone)]
pub struct GameChain {
    rules: GameRules,
    config: ChainConfig,
    tip: WorldState,
    active: VecDeque<ActiveBlock>,
}

impl GameChain {
    /// Start from the genesis state.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules are invalid.
    pub fn new(rules: GameRules, config: ChainConfig) -> EngineResult<Self> {
        let tip = WorldState::genesis(&rules)?;
        Ok(Self::from_parts(rules, config, tip, Vec::new()))
    }

    /// Resume from a stored tip and the blocks leading to it, oldest first.
    #[must_use]
    pub fn from_parts(rules: GameRules, config: ChainConfig, tip: WorldState, active: Vec<ActiveBlock>) -> Self {
        Self {
            rules,
            config,
            tip,
            active: active.into(),
        }
    }

    /// Consensus rules.
    #[must_use]
    pub const fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// State at the tip.
    #[must_use]
    pub const fn tip(&self) -> &WorldState {
        &self.tip
    }

    /// Height of the tip.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.tip.height
    }

    /// Connected blocks still within reorg depth, oldest first.
    pub fn active_blocks(&self) -> impl DoubleEndedIterator<Item = &ActiveBlock> {
        self.active.iter()
    }

    /// Connect a block at the tip and realise its game transactions.
    ///
    /// Atomic: on error neither the chain nor the ledger changes.
    ///
    /// # Errors
    ///
    /// Returns the error of [`connect`] or of the ledger.
    pub fn connect_block(&mut self, block: Block, ledger: &mut dyn Ledger) -> EngineResult<BlockReport> {
        let report = self.connect_unpruned(block, ledger)?;
        self.prune();
        Ok(report)
    }

    /// [`Self::connect_block`] without dropping history beyond reorg depth.
    fn connect_unpruned(&mut self, block: Block, ledger: &mut dyn Ledger) -> EngineResult<BlockReport> {
        let connected = match connect(&self.rules, &block, &self.tip) {
            Ok(c) => c,
            Err(e) => {
                warn!(height = block.height, hash = %block.hash, error = %e, "rejected block");
                return Err(e);
            }
        };
        realize(ledger, &connected.transactions)?;
        assert_invariants(&connected.state, &self.rules);

        let stats = StatsForHeight {
            height: block.height,
            block_hash: block.hash,
            players: connected.state.player_count(),
            hunters: connected.state.hunter_count(),
            game_txids: connected.txids.clone(),
            taxes: connected.taxes,
        };
        info!(
            height = block.height,
            hash = %block.hash,
            players = stats.players,
            game_txs = stats.game_txids.len(),
            "connected block"
        );

        self.tip = connected.state;
        self.active.push_back(ActiveBlock {
            block,
            undo: connected.undo,
            stats: stats.clone(),
            transactions: connected.transactions.clone(),
        });

        Ok(BlockReport {
            stats,
            transactions: connected.transactions,
            coinbase: connected.coinbase,
            rejected: connected.rejected,
        })
    }

    fn prune(&mut self) {
        while self.active.len() > self.config.max_reorg_depth as usize {
            self.active.pop_front();
        }
    }

    /// Disconnect the tip block and reverse its game transactions.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if no block within reorg depth is
    /// left, or the error of [`disconnect`] or the ledger.
    pub fn disconnect_tip(&mut self, ledger: &mut dyn Ledger) -> EngineResult<Block> {
        let Some(last) = self.active.back() else {
            return Err(EngineError::NotFound(format!(
                "no block to disconnect above height {}",
                self.tip.height
            )));
        };
        let state = disconnect(&last.block, &last.undo, &self.tip)?;
        unrealize(ledger, &last.undo.game_txids)?;
        assert_invariants(&state, &self.rules);

        info!(height = last.block.height, hash = %last.block.hash, "disconnected block");
        self.tip = state;
        let last = self
            .active
            .pop_back()
            .ok_or_else(|| EngineError::NotFound("active block vanished".into()))?;
        Ok(last.block)
    }

    /// Switch to the branch forking off at `fork` (a block hash in the
    /// active chain, or the hash below the oldest kept block).
    ///
    /// If any block of the branch fails, the previous chain is restored and
    /// the error returned. History is only pruned once the outcome is
    /// settled, so branches longer than the reorg depth can be undone too.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if `fork` is not within reorg
    /// depth, or the error of the failing block.
    pub fn reorganize(&mut self, fork: BlockHash, branch: Vec<Block>, ledger: &mut dyn Ledger) -> EngineResult<()> {
        let known = self.tip.block_hash == fork
            || self
                .active
                .iter()
                .any(|a| a.block.hash == fork || a.block.parent == fork);
        if !known {
            return Err(EngineError::NotFound(format!("fork point {fork} is beyond reorg depth")));
        }

        let mut old_branch = Vec::new();
        while self.tip.block_hash != fork {
            old_branch.push(self.disconnect_tip(ledger)?);
        }
        old_branch.reverse();
        debug!(%fork, depth = old_branch.len(), new = branch.len(), "reorganizing");

        let mut connected = 0usize;
        let mut failure = None;
        for block in branch {
            match self.connect_unpruned(block, ledger) {
                Ok(_) => connected += 1,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let Some(err) = failure else {
            self.prune();
            return Ok(());
        };
        warn!(%fork, connected, error = %err, "restoring previous branch");
        for _ in 0..connected {
            self.disconnect_tip(ledger)?;
        }
        for block in old_branch {
            self.connect_unpruned(block, ledger)?;
        }
        self.prune();
        Err(err)
    }

    /// World state at `height`, reconstructed from the tip with undo records.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if the height is above the tip or
    /// below the retained history.
    pub fn world_state(&self, height: u32) -> EngineResult<WorldState> {
        if height > self.tip.height {
            return Err(EngineError::NotFound(format!("height {height} is above the tip")));
        }
        let mut state = self.tip.clone();
        for active in self.active.iter().rev() {
            if state.height == height {
                break;
            }
            state = disconnect(&active.block, &active.undo, &state)?;
        }
        if state.height != height {
            return Err(EngineError::NotFound(format!("height {height} is no longer retained")));
        }
        Ok(state)
    }

    /// JSON view of the tip.
    #[must_use]
    pub fn world_view(&self) -> WorldView {
        WorldView::new(&self.tip, &self.rules)
    }

    /// A player at the tip.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if the player is not alive.
    pub fn player_state(&self, name: &str) -> EngineResult<PlayerView> {
        self.tip
            .players
            .get(name)
            .map(|p| PlayerView::new(name, p, &self.tip, &self.rules))
            .ok_or_else(|| EngineError::NotFound(format!("no such player '{name}'")))
    }

    /// Shortest waypoint path between two tiles.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTransition`] if a tile is off the grid.
    pub fn path(&self, start: Coord, goal: Coord) -> EngineResult<Vec<Coord>> {
        self.rules.grid()?.find_path(start, goal)
    }

    /// Statistics of the block at `height`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if the block is not retained.
    pub fn stats_for_height(&self, height: u32) -> EngineResult<StatsForHeight> {
        self.active
            .iter()
            .find(|a| a.block.height == height)
            .map(|a| a.stats.clone())
            .ok_or_else(|| EngineError::NotFound(format!("no statistics for height {height}")))
    }

    /// Identifiers of the game transactions a retained block created.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if the block is not retained.
    pub fn game_txids(&self, hash: &BlockHash) -> EngineResult<&[TxId]> {
        self.active
            .iter()
            .find(|a| &a.block.hash == hash)
            .map(|a| a.stats.game_txids.as_slice())
            .ok_or_else(|| EngineError::NotFound(format!("block {hash} is not retained")))
    }

    /// Game transactions of a retained block.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if the block is not retained.
    pub fn game_transactions(&self, hash: &BlockHash) -> EngineResult<&[GameTransaction]> {
        self.active
            .iter()
            .find(|a| &a.block.hash == hash)
            .map(|a| a.transactions.as_slice())
            .ok_or_else(|| EngineError::NotFound(format!("block {hash} is not retained")))
    }
}
