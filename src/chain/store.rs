//! On-disk snapshots of the tip state and the blocks within reorg depth.
//!
//! Files live in one directory:
//! - `state_{height:010}.bin`: a [`WorldState`]
//! - `block_{height:010}_{hash}.bin`: an [`ActiveBlock`]
//!
//! Every file is `b"HUNT"`, a version byte, then an lz4 frame (size
//! prefixed) of the bincode encoding.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::chain::controller::{ActiveBlock, ChainConfig, GameChain};
use crate::game::{GameRules, WorldState};

const MAGIC: &[u8; 4] = b"HUNT";
const VERSION: u8 = 1;

/// Snapshot store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Encoding or decoding failed.
    #[error("encoding error: {0}")]
    Encoding(#[from] bincode::Error),
    /// Decompression failed.
    #[error("decompression error: {0}")]
    Compression(#[from] lz4_flex::block::DecompressError),
    /// The file is not a snapshot this version understands.
    #[error("{path}: {reason}")]
    BadFormat {
        /// Offending file.
        path: PathBuf,
        /// What is wrong.
        reason: String,
    },
    /// No state snapshot exists.
    #[error("no state snapshot in {0}")]
    Empty(PathBuf),
}

/// Directory holding snapshots.
#[derive(Debug, Clone)]
pub struct GameStore {
    dir: PathBuf,
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    let raw = bincode::serialize(value)?;
    let mut out = Vec::with_capacity(MAGIC.len() + 1 + raw.len() / 2);
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.extend_from_slice(&lz4_flex::compress_prepend_size(&raw));
    Ok(out)
}

fn decode<T: DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T, StoreError> {
    let bad = |reason: &str| StoreError::BadFormat {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
    let Some(rest) = bytes.strip_prefix(MAGIC.as_slice()) else {
        return Err(bad("missing magic"));
    };
    match rest.split_first() {
        Some((&VERSION, body)) => {
            let raw = lz4_flex::decompress_size_prepended(body)?;
            Ok(bincode::deserialize(&raw)?)
        }
        Some((v, _)) => Err(bad(&format!("unsupported version {v}"))),
        None => Err(bad("truncated header")),
    }
}

/// Height encoded in a file name with the given prefix.
fn height_of(name: &str, prefix: &str) -> Option<u32> {
    let rest = name.strip_prefix(prefix)?.strip_suffix(".bin")?;
    rest.get(..10)?.parse().ok()
}

impl GameStore {
    /// Open (and create if needed) a store directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory of the store.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf, StoreError> {
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!("{name}.tmp"));
        fs::write(&tmp, encode(value)?)?;
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), "wrote snapshot");
        Ok(path)
    }

    fn read<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
        let bytes = fs::read(path)?;
        decode(path, &bytes)
    }

    fn files(&self, prefix: &str) -> Result<Vec<(u32, PathBuf)>, StoreError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(height) = name.to_str().and_then(|n| height_of(n, prefix)) {
                files.push((height, entry.path()));
            }
        }
        files.sort();
        Ok(files)
    }

    /// Write a state snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn save_state(&self, state: &WorldState) -> Result<PathBuf, StoreError> {
        self.write(&format!("state_{:010}.bin", state.height), state)
    }

    /// Read the newest state snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Empty`] if there is none, or a read error.
    pub fn load_latest_state(&self) -> Result<WorldState, StoreError> {
        let Some((_, path)) = self.files("state_")?.pop() else {
            return Err(StoreError::Empty(self.dir.clone()));
        };
        Self::read(&path)
    }

    /// Write a connected block with its undo record.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn save_block(&self, active: &ActiveBlock) -> Result<PathBuf, StoreError> {
        let name = format!("block_{:010}_{}.bin", active.block.height, active.block.hash);
        self.write(&name, active)
    }

    /// Read all stored blocks up to and including `height`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns the first read error.
    pub fn load_blocks(&self, height: u32) -> Result<Vec<ActiveBlock>, StoreError> {
        self.files("block_")?
            .into_iter()
            .filter(|(h, _)| *h <= height)
            .map(|(_, path)| Self::read(&path))
            .collect()
    }

    /// Save the tip and every retained block of a chain.
    ///
    /// # Errors
    ///
    /// Returns the first write error.
    pub fn save_chain(&self, chain: &GameChain) -> Result<(), StoreError> {
        for active in chain.active_blocks() {
            self.save_block(active)?;
        }
        self.save_state(chain.tip())?;
        // snapshots of disconnected tips would otherwise win on restore
        for (height, path) in self.files("state_")? {
            if height > chain.height() {
                fs::remove_file(&path)?;
                debug!(path = %path.display(), "removed stale snapshot");
            }
        }
        Ok(())
    }

    /// Rebuild a chain from the newest snapshot.
    ///
    /// Stored blocks that do not lead to the snapshot (from an abandoned
    /// branch) are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if no snapshot exists or a file is unreadable.
    pub fn restore(&self, rules: GameRules, config: ChainConfig) -> Result<GameChain, StoreError> {
        let tip = self.load_latest_state()?;
        let mut blocks = self.load_blocks(tip.height)?;

        let mut chain: Vec<ActiveBlock> = Vec::new();
        let mut want = tip.block_hash;
        while let Some(pos) = blocks.iter().rposition(|a| a.block.hash == want) {
            let active = blocks.swap_remove(pos);
            want = active.block.parent;
            chain.push(active);
            if chain.len() >= config.max_reorg_depth as usize {
                break;
            }
        }
        chain.reverse();
        Ok(GameChain::from_parts(rules, config, tip, chain))
    }

    /// Delete snapshots below `height`, keeping the newest state file.
    ///
    /// # Errors
    ///
    /// Returns the first filesystem error.
    pub fn prune(&self, height: u32) -> Result<usize, StoreError> {
        let mut states = self.files("state_")?;
        states.pop();
        let mut removed = 0;
        for (h, path) in states.into_iter().chain(self.files("block_")?) {
            if h < height {
                fs::remove_file(path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
