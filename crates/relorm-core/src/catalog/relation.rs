//! Relationship definitions between mapped types.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Cardinality of a relationship, seen from the declaring type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// The target holds this type's key; a single object.
    OneToOne,
    /// The target holds this type's key; a collection.
    OneToMany,
    /// This type holds the target's key.
    ManyToOne,
    /// This type holds the target's key; used by join entities.
    ManyToMany,
}

impl RelationKind {
    /// Whether this edge makes the target an owner whose key this type inherits.
    pub fn is_ownership(&self) -> bool {
        matches!(self, RelationKind::ManyToOne | RelationKind::ManyToMany)
    }

    /// Whether the target inherits this type's key.
    pub fn is_dependent(&self) -> bool {
        !self.is_ownership()
    }
}

/// Referential action for ON DELETE / ON UPDATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    /// Propagate to referencing rows.
    Cascade,
    /// Reject while referencing rows exist.
    Restrict,
    /// Deferred restrict.
    NoAction,
    /// Null the referencing columns.
    SetNull,
    /// Reset the referencing columns to their defaults.
    SetDefault,
}

impl ReferentialAction {
    /// SQL keyword form.
    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
        }
    }
}

/// A relationship declared on a table.
///
/// The target is named by mapped type (`refer_to`). The table it maps to is
/// looked up on first use and cached in `resolved`, so cyclic schema graphs
/// never need to be resolved eagerly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    /// Relationship cardinality.
    pub kind: RelationKind,
    /// Field on the declaring type holding the related object(s).
    pub refer: String,
    /// Mapped type name of the target.
    pub refer_to: String,
    /// ON UPDATE action.
    #[serde(default)]
    pub on_update: Option<ReferentialAction>,
    /// ON DELETE action.
    #[serde(default)]
    pub on_delete: Option<ReferentialAction>,
    /// Eagerly load on select and cascade on save/update.
    #[serde(default)]
    pub load: bool,
    #[serde(skip)]
    resolved: OnceLock<String>,
}

impl Relationship {
    /// Create a relationship of the given kind.
    pub fn new(kind: RelationKind, refer: impl Into<String>, refer_to: impl Into<String>) -> Self {
        Self {
            kind,
            refer: refer.into(),
            refer_to: refer_to.into(),
            on_update: None,
            on_delete: None,
            load: false,
            resolved: OnceLock::new(),
        }
    }

    /// Create a one-to-one relationship.
    pub fn one_to_one(refer: impl Into<String>, refer_to: impl Into<String>) -> Self {
        Self::new(RelationKind::OneToOne, refer, refer_to)
    }

    /// Create a one-to-many relationship.
    pub fn one_to_many(refer: impl Into<String>, refer_to: impl Into<String>) -> Self {
        Self::new(RelationKind::OneToMany, refer, refer_to)
    }

    /// Create a many-to-one relationship.
    pub fn many_to_one(refer: impl Into<String>, refer_to: impl Into<String>) -> Self {
        Self::new(RelationKind::ManyToOne, refer, refer_to)
    }

    /// Create a many-to-many relationship.
    pub fn many_to_many(refer: impl Into<String>, refer_to: impl Into<String>) -> Self {
        Self::new(RelationKind::ManyToMany, refer, refer_to)
    }

    /// Set the eager-load flag.
    pub fn with_load(mut self, load: bool) -> Self {
        self.load = load;
        self
    }

    /// Set the ON DELETE action.
    pub fn with_on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// Set the ON UPDATE action.
    pub fn with_on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }

    /// Table name of the target, if already resolved.
    pub fn resolved_target(&self) -> Option<&str> {
        self.resolved.get().map(String::as_str)
    }

    /// Resolve the target table name once; later calls return the cached name.
    pub(crate) fn resolve_with<F>(&self, lookup: F) -> Result<&str>
    where
        F: FnOnce() -> Result<String>,
    {
        if let Some(table) = self.resolved.get() {
            return Ok(table);
        }
        let table = lookup()?;
        Ok(self.resolved.get_or_init(|| table))
    }
}
