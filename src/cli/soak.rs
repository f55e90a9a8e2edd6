//! Soak command implementation.
//!
//! Runs many seeded random chains and checks, for every one, that state
//! invariants hold after each block, that reconnecting disconnected blocks
//! restores the same tip, and that a second run of the seed ends in the
//! same state.

use super::output::{format_soak_text, SoakStats};
use super::{load_rules, CliError, OutputFormat};
use huntercore::chain::{random_block, seed_rng, ChainConfig, GameChain, Ledger, MemoryLedger, Workload};
use huntercore::game::{check_invariants, GameTxKind};
use huntercore::GameRules;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing::warn;

/// Soak run settings.
#[derive(Debug, Clone)]
pub(crate) struct SoakOptions {
    /// Number of chains.
    pub(crate) chains: u64,
    /// Blocks per chain.
    pub(crate) blocks: u32,
    /// Starting seed.
    pub(crate) seed: Option<u64>,
    /// Parallel threads.
    pub(crate) threads: Option<usize>,
    /// Rules file; the small rule set otherwise.
    pub(crate) rules: Option<PathBuf>,
    /// Output format.
    pub(crate) format: OutputFormat,
    /// Show a progress bar.
    pub(crate) progress: bool,
}

/// One chain's outcome and its final state digest.
fn run_chain(seed: u64, blocks: u32, rules: &GameRules) -> Result<(SoakStats, [u8; 32]), String> {
    let mut chain = GameChain::new(rules.clone(), ChainConfig::default()).map_err(|e| e.to_string())?;
    let mut ledger = MemoryLedger::new();
    let mut rng = seed_rng(seed);
    let workload = Workload::default();
    let salt = seed.to_le_bytes();
    let mut stats = SoakStats {
        chains: 1,
        ..SoakStats::default()
    };

    for _ in 0..blocks {
        let block = random_block(&mut rng, chain.tip(), rules, &workload, &salt);
        let height = block.height;
        let report = chain
            .connect_block(block, &mut ledger)
            .map_err(|e| format!("height {height}: {e}"))?;
        stats.blocks += 1;
        stats.max_players = stats.max_players.max(report.stats.players);
        for tx in &report.transactions {
            match tx.kind {
                GameTxKind::Kills => stats.kill_txs += 1,
                GameTxKind::Bounties => {
                    stats.bounty_txs += 1;
                    stats.bounty_total += tx.value_out();
                }
            }
        }
        if let Some(v) = check_invariants(chain.tip(), rules).first() {
            return Err(format!("height {height}: {v}"));
        }

        if rng.below(10) == 0 {
            stats.reorged_blocks += reconnect(&mut chain, &mut ledger, 1 + rng.below(3))?;
        }
    }

    let digest = chain.tip().digest().map_err(|e| e.to_string())?;
    Ok((stats, digest))
}

/// Disconnect the last `depth` blocks and connect them again.
fn reconnect(chain: &mut GameChain, ledger: &mut dyn Ledger, depth: u64) -> Result<u64, String> {
    let depth = usize::try_from(depth).unwrap_or(usize::MAX);
    let blocks: Vec<_> = chain
        .active_blocks()
        .rev()
        .take(depth)
        .map(|a| a.block.clone())
        .collect();
    let Some(fork) = blocks.last().map(|b| b.parent) else {
        return Ok(0);
    };
    let before = chain.tip().clone();
    let count = blocks.len() as u64;
    chain
        .reorganize(fork, blocks.into_iter().rev().collect(), ledger)
        .map_err(|e| format!("reconnect at {}: {e}", before.height))?;
    if chain.tip() != &before {
        return Err(format!("reconnecting to height {} changed the state", before.height));
    }
    Ok(count)
}

fn soak_seed(seed: u64, blocks: u32, rules: &GameRules) -> SoakStats {
    let failed = |reason: String| {
        warn!(seed, %reason, "soak failure");
        SoakStats {
            chains: 1,
            failures: vec![(seed, reason)],
            ..SoakStats::default()
        }
    };
    match (run_chain(seed, blocks, rules), run_chain(seed, blocks, rules)) {
        (Ok((stats, a)), Ok((_, b))) if a == b => stats,
        (Ok(_), Ok(_)) => failed("second run ended in a different state".into()),
        (Err(e), _) | (_, Err(e)) => failed(e),
    }
}

/// Execute the soak command.
///
/// # Errors
///
/// Returns an error if the rules are unusable or any seed fails.
pub(crate) fn execute(options: SoakOptions) -> Result<(), CliError> {
    let rules = load_rules(options.rules.as_deref(), true)?;

    if let Some(num_threads) = options.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .ok(); // Ignore error if already initialized
    }

    let base_seed = options.seed.unwrap_or_else(|| {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(42)
    });

    let pb = if options.progress {
        let pb = ProgressBar::new(options.chains);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chains ({per_sec})")
                .map_err(|e| CliError::new(format!("Invalid progress template: {e}")))?
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();

    // Each thread folds into its own stats, merged at the end
    let stats = (0..options.chains)
        .into_par_iter()
        .fold(SoakStats::default, |mut local, i| {
            local.merge(soak_seed(base_seed.wrapping_add(i), options.blocks, &rules));
            if let Some(pb) = &pb {
                pb.inc(1);
            }
            local
        })
        .reduce(SoakStats::default, |mut a, b| {
            a.merge(b);
            a
        });

    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }
    let duration = start.elapsed();

    match options.format {
        OutputFormat::Text => {
            print!("{}", format_soak_text(&stats));
            println!("  Seeds: {base_seed}..{}", base_seed.wrapping_add(options.chains));
            println!("Duration: {:.2}s", duration.as_secs_f64());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    if stats.failures.is_empty() {
        Ok(())
    } else {
        Err(CliError::new(format!("{} of {} chains failed", stats.failures.len(), stats.chains)))
    }
}
