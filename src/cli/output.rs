//! Output formatting utilities for CLI.

use huntercore::chain::BlockReport;
use huntercore::game::{format_amount, WorldView};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;

/// JSON-serializable connected block.
#[derive(Debug, Serialize)]
pub(super) struct JsonBlockReport {
    /// Block height.
    pub(super) height: u32,
    /// Block hash.
    pub(super) hash: String,
    /// Live players after the block.
    pub(super) players: usize,
    /// Game taxes paid to the miner.
    pub(super) taxes: String,
    /// Expected coinbase value.
    pub(super) coinbase: String,
    /// Game transactions.
    pub(super) game_transactions: Vec<Value>,
    /// Dropped commands.
    pub(super) rejected: Vec<String>,
}

impl JsonBlockReport {
    /// Create from a `BlockReport`.
    pub(super) fn from_report(report: &BlockReport) -> Self {
        Self {
            height: report.stats.height,
            hash: report.stats.block_hash.to_string(),
            players: report.stats.players,
            taxes: format_amount(report.stats.taxes),
            coinbase: format_amount(report.coinbase),
            game_transactions: report.transactions.iter().map(|tx| tx.to_json()).collect(),
            rejected: report.rejected.iter().map(ToString::to_string).collect(),
        }
    }
}

/// JSON-serializable simulation result.
#[derive(Debug, Serialize)]
pub(super) struct JsonSimulation {
    /// Connected blocks.
    pub(super) blocks: Vec<JsonBlockReport>,
    /// Final world.
    pub(super) world: WorldView,
}

/// Format a connected block as human-readable text.
pub(super) fn format_block_text(report: &BlockReport) -> String {
    let mut output = String::new();
    let stats = &report.stats;

    let _ = writeln!(
        output,
        "Block {} ({}): {} players, {} hunters, coinbase {}",
        stats.height,
        stats.block_hash,
        stats.players,
        stats.hunters,
        format_amount(report.coinbase)
    );
    for (tx, txid) in report.transactions.iter().zip(&stats.game_txids) {
        let _ = writeln!(
            output,
            "  {txid} {:?}: {} inputs, {} paid out",
            tx.kind,
            tx.inputs.len(),
            format_amount(tx.value_out())
        );
    }
    for err in &report.rejected {
        let _ = writeln!(output, "  dropped: {err}");
    }
    output
}

/// Soak statistics aggregated over many chains.
#[derive(Debug, Default, Serialize)]
pub(super) struct SoakStats {
    /// Chains run.
    pub(super) chains: u64,
    /// Blocks connected.
    pub(super) blocks: u64,
    /// Blocks disconnected and reconnected.
    pub(super) reorged_blocks: u64,
    /// Kill transactions.
    pub(super) kill_txs: u64,
    /// Bounty transactions.
    pub(super) bounty_txs: u64,
    /// Coins paid out in bounties.
    pub(super) bounty_total: i64,
    /// Most players alive on any tip.
    pub(super) max_players: usize,
    /// Seeds that failed, with the first problem found.
    pub(super) failures: Vec<(u64, String)>,
}

impl SoakStats {
    /// Merge another thread's stats.
    pub(super) fn merge(&mut self, other: Self) {
        self.chains += other.chains;
        self.blocks += other.blocks;
        self.reorged_blocks += other.reorged_blocks;
        self.kill_txs += other.kill_txs;
        self.bounty_txs += other.bounty_txs;
        self.bounty_total += other.bounty_total;
        self.max_players = self.max_players.max(other.max_players);
        self.failures.extend(other.failures);
        self.failures.sort();
    }
}

/// Format soak statistics as human-readable text.
pub(super) fn format_soak_text(stats: &SoakStats) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Soak Results");
    let _ = writeln!(output, "  Chains: {}", stats.chains);
    let _ = writeln!(output, "  Blocks: {} ({} reconnected)", stats.blocks, stats.reorged_blocks);
    let _ = writeln!(output, "  Kill transactions: {}", stats.kill_txs);
    let _ = writeln!(
        output,
        "  Bounty transactions: {} ({} paid)",
        stats.bounty_txs,
        format_amount(stats.bounty_total)
    );
    let _ = writeln!(output, "  Most players alive: {}", stats.max_players);
    if stats.failures.is_empty() {
        let _ = writeln!(output, "  All checks passed");
    } else {
        let _ = writeln!(output, "  Failures: {}", stats.failures.len());
        for (seed, reason) in &stats.failures {
            let _ = writeln!(output, "    seed {seed}: {reason}");
        }
    }
    output
}
