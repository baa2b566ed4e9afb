//! Core error types.
//!
//! Errors fall into two classes. Configuration errors describe a schema or
//! deployment that cannot work at all (a missing mandatory field, a
//! relationship pointing at an unknown type, a type with no storage binding);
//! they are fatal and carry the offending table or type name. Operational
//! errors are scoped to a single call (a statement rejected by the storage
//! executor, a bind failure, a builder validation failure) and carry the SQL
//! text involved so the caller can decide whether to retry or abort.

use crate::migration::MigrationError;
use crate::value::Value;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Core ORM errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A mandatory schema attribute is missing or empty.
    #[error("schema `{schema}` is missing mandatory field `{field}`")]
    MissingField {
        /// Table or type name of the offending schema.
        schema: String,
        /// Name of the missing attribute.
        field: String,
    },

    /// Two columns of one table share a column or variable name.
    #[error("table `{table}` declares `{name}` more than once")]
    DuplicateColumn {
        /// Owning table.
        table: String,
        /// The duplicated column or variable name.
        name: String,
    },

    /// A relationship names a target type that is not registered.
    #[error("relationship `{refer}` on `{table}` refers to unknown type `{refer_to}`")]
    UnresolvedRelationship {
        /// Table declaring the relationship.
        table: String,
        /// Local field of the relationship.
        refer: String,
        /// Target mapped type name.
        refer_to: String,
    },

    /// Many-to-one/many-to-many ownership edges form a cycle.
    #[error("ownership cycle detected through table `{table}`")]
    CyclicOwnership {
        /// Table at which the cycle was detected.
        table: String,
    },

    /// No schema or binding is registered for a type.
    #[error("type `{0}` is not mapped")]
    UnmappedType(String),

    /// The entity binding lacks an accessor the schema needs.
    #[error("type `{mapped_type}` has no accessor for `{name}`")]
    MissingAccessor {
        /// Mapped type name.
        mapped_type: String,
        /// Variable or relationship name without an accessor.
        name: String,
    },

    /// A table is not part of the database this engine is bound to.
    #[error("no storage binding for `{table}` in database `{database}`")]
    NoStorageBinding {
        /// Database descriptor name.
        database: String,
        /// Table that was requested.
        table: String,
    },

    /// The storage executor rejected a statement.
    #[error("statement failed: {message} [sql: {sql}]")]
    Statement {
        /// SQL text that failed.
        sql: String,
        /// Message reported by the storage engine.
        message: String,
    },

    /// A positional parameter could not be bound.
    #[error("bind failed at parameter {index} ({value}): {message} [sql: {sql}]")]
    Bind {
        /// SQL text being prepared.
        sql: String,
        /// One-based parameter index.
        index: usize,
        /// Value that failed to bind.
        value: Value,
        /// Message reported by the storage engine.
        message: String,
    },

    /// A query builder record failed validation.
    #[error("query builder: {0}")]
    Builder(String),

    /// A relationship required for key inheritance holds no object.
    #[error("relationship `{refer}` on `{mapped_type}` has no referenced object")]
    RelationshipNotSet {
        /// Mapped type owning the relationship.
        mapped_type: String,
        /// Local field of the relationship.
        refer: String,
    },

    /// A stored value could not be converted to the field type.
    #[error("cannot convert {found} to {expected}")]
    Conversion {
        /// Expected Rust type.
        expected: &'static str,
        /// Description of the value found.
        found: String,
    },

    /// Transaction API misuse.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Schema document could not be decoded.
    #[error("descriptor error: {0}")]
    Descriptor(#[from] serde_json::Error),

    /// Migration failure.
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

impl Error {
    /// Whether this error indicates a configuration the process cannot run with.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::MissingField { .. }
                | Error::DuplicateColumn { .. }
                | Error::UnresolvedRelationship { .. }
                | Error::CyclicOwnership { .. }
                | Error::UnmappedType(_)
                | Error::MissingAccessor { .. }
                | Error::NoStorageBinding { .. }
                | Error::Descriptor(_)
        )
    }

    /// SQL text attached to an operational error, if any.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Statement { sql, .. } | Error::Bind { sql, .. } => Some(sql),
            Error::Migration(MigrationError::StepFailed { sql, .. }) => Some(sql),
            _ => None,
        }
    }

    /// Build a statement error from any displayable cause.
    pub fn statement(sql: impl Into<String>, message: impl ToString) -> Self {
        Error::Statement {
            sql: sql.into(),
            message: message.to_string(),
        }
    }
}
