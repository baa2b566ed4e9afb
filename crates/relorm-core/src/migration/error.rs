//! Migration-specific error types.

use crate::error::Error;
use thiserror::Error;

/// Migration-specific errors.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A migration step failed; earlier steps stay applied.
    #[error("step {step_index} failed: {source} [sql: {sql}]")]
    StepFailed {
        /// Zero-based index of the failed step.
        step_index: usize,
        /// Statement that failed.
        sql: String,
        /// Underlying storage error.
        source: Box<Error>,
    },

    /// The stored schema version is not an integer.
    #[error("stored schema version `{found}` is not an integer")]
    InvalidVersion {
        /// Value found in storage.
        found: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_failed_display() {
        let err = MigrationError::StepFailed {
            step_index: 2,
            sql: "ALTER TABLE T ADD COLUMN C TEXT".into(),
            source: Box::new(Error::statement("ALTER TABLE T ADD COLUMN C TEXT", "locked")),
        };
        let text = err.to_string();
        assert!(text.starts_with("step 2 failed"));
        assert!(text.ends_with("[sql: ALTER TABLE T ADD COLUMN C TEXT]"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
