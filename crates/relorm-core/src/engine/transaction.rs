//! Nestable transactions.
//!
//! Only the outermost level talks to storage. Each nested level must be
//! committed for the outermost `end` to commit; a level that ends without a
//! commit marks the whole transaction for rollback.

use super::Database;
use crate::error::{Error, Result};
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub(super) struct TransactionState {
    /// Commit flag of every open level, outermost first.
    levels: Vec<bool>,
    /// Some level ended without committing.
    failed: bool,
}

impl Database {
    /// Open a transaction level; the outermost level issues `BEGIN TRANSACTION`.
    pub fn begin(&self) -> Result<()> {
        let mut state = self.transactions.lock();
        if state.levels.is_empty() {
            self.executor.execute("BEGIN TRANSACTION")?;
            state.failed = false;
        }
        state.levels.push(false);
        debug!(depth = state.levels.len(), "transaction begin");
        Ok(())
    }

    /// Mark the innermost level successful. The level stays open until `end`.
    pub fn commit(&self) -> Result<()> {
        let mut state = self.transactions.lock();
        match state.levels.last_mut() {
            Some(committed) => {
                *committed = true;
                Ok(())
            }
            None => Err(Error::Transaction("commit without begin".to_string())),
        }
    }

    /// End the innermost level. Ending the outermost level commits when every
    /// level committed, otherwise rolls back.
    ///
    /// If the final COMMIT or ROLLBACK fails the level stays open, so `end`
    /// can be retried.
    pub fn end(&self) -> Result<()> {
        let mut state = self.transactions.lock();
        let committed = *state
            .levels
            .last()
            .ok_or_else(|| Error::Transaction("end without begin".to_string()))?;
        if state.levels.len() > 1 {
            state.levels.pop();
            state.failed |= !committed;
            debug!(depth = state.levels.len(), committed, "transaction level ended");
            return Ok(());
        }

        if state.failed || !committed {
            warn!("rolling back transaction");
            self.executor.execute("ROLLBACK")?;
        } else {
            debug!("committing transaction");
            self.executor.execute("COMMIT")?;
        }
        state.levels.clear();
        state.failed = false;
        Ok(())
    }

    /// Number of open levels.
    pub fn transaction_depth(&self) -> usize {
        self.transactions.lock().levels.len()
    }

    /// Whether a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.transaction_depth() > 0
    }

    /// Run `f` inside a transaction level, committing on `Ok` and ending
    /// without commit on `Err`.
    pub fn transaction<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Self) -> Result<R>,
    {
        self.begin()?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                self.end()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(end_err) = self.end() {
                    warn!(error = %end_err, "failed to end transaction");
                }
                Err(err)
            }
        }
    }
}
