//! The ledger collaborator that stores game transactions and their coins.

use std::collections::BTreeMap;

use crate::error::{EngineError, EngineResult};
use crate::game::{Amount, CoinOutput, GameTransaction};
use crate::hash::TxId;

/// Reference to one output of a game transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutPoint {
    /// Transaction.
    pub txid: TxId,
    /// Output index.
    pub vout: u32,
}

/// Storage for the transactions the game creates.
///
/// The controller records every game transaction of a connected block, then
/// creates its outputs; on disconnect it reverses them newest first.
pub trait Ledger {
    /// Store a transaction and return its identifier.
    ///
    /// # Errors
    ///
    /// Fails if the transaction already exists or cannot be stored.
    fn record_transaction(&mut self, tx: &GameTransaction) -> EngineResult<TxId>;

    /// Make an output spendable.
    ///
    /// # Errors
    ///
    /// Fails if the output already exists.
    fn create_output(&mut self, outpoint: OutPoint, output: &CoinOutput) -> EngineResult<()>;

    /// Remove a transaction together with its outputs.
    ///
    /// # Errors
    ///
    /// Fails if the transaction is unknown.
    fn reverse_transaction(&mut self, txid: &TxId) -> EngineResult<()>;
}

/// Record all transactions and their outputs, undoing partial work on error.
///
/// # Errors
///
/// Returns the first ledger error.
pub fn realize(ledger: &mut dyn Ledger, txs: &[GameTransaction]) -> EngineResult<Vec<TxId>> {
    let mut done: Vec<TxId> = Vec::with_capacity(txs.len());
    for tx in txs {
        let result = ledger.record_transaction(tx).and_then(|txid| {
            done.push(txid);
            for (vout, output) in (0u32..).zip(&tx.outputs) {
                ledger.create_output(OutPoint { txid, vout }, output)?;
            }
            Ok(())
        });
        if let Err(e) = result {
            for txid in done.iter().rev() {
                // Best effort: the original error is what the caller needs.
                let _ = ledger.reverse_transaction(txid);
            }
            return Err(e);
        }
    }
    Ok(done)
}

/// Reverse transactions newest first.
///
/// # Errors
///
/// Returns the first ledger error.
pub fn unrealize(ledger: &mut dyn Ledger, txids: &[TxId]) -> EngineResult<()> {
    for txid in txids.iter().rev() {
        ledger.reverse_transaction(txid)?;
    }
    Ok(())
}

/// In-memory ledger for simulations and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    transactions: BTreeMap<TxId, GameTransaction>,
    outputs: BTreeMap<OutPoint, CoinOutput>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a transaction.
    #[must_use]
    pub fn transaction(&self, txid: &TxId) -> Option<&GameTransaction> {
        self.transactions.get(txid)
    }

    /// Number of stored transactions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Whether no transaction is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Coins paid to `address` by game transactions.
    #[must_use]
    pub fn balance(&self, address: &str) -> Amount {
        self.outputs
            .values()
            .filter(|o| o.address == address)
            .map(|o| o.amount)
            .sum()
    }
}

impl Ledger for MemoryLedger {
    fn record_transaction(&mut self, tx: &GameTransaction) -> EngineResult<TxId> {
        let txid = tx.txid();
        if self.transactions.contains_key(&txid) {
            return Err(EngineError::Ledger(format!("duplicate transaction {txid}")));
        }
        self.transactions.insert(txid, tx.clone());
        Ok(txid)
    }

    fn create_output(&mut self, outpoint: OutPoint, output: &CoinOutput) -> EngineResult<()> {
        if self.outputs.contains_key(&outpoint) {
            return Err(EngineError::Ledger(format!(
                "output {}:{} already exists",
                outpoint.txid, outpoint.vout
            )));
        }
        self.outputs.insert(outpoint, output.clone());
        Ok(())
    }

    fn reverse_transaction(&mut self, txid: &TxId) -> EngineResult<()> {
        if self.transactions.remove(txid).is_none() {
            return Err(EngineError::Ledger(format!("unknown transaction {txid}")));
        }
        self.outputs.retain(|op, _| op.txid != *txid);
        Ok(())
    }
}
