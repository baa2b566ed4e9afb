//! Referential-integrity triggers for engines without native foreign keys.
//!
//! Every trigger works over the key columns one child table inherits from one
//! owner. Column names are identical on both sides, so a key column `K` is
//! matched as `child.K = OLD.K` / `NEW.K`.

use crate::catalog::{ReferentialAction, SchemaRegistry, TableSchema};
use crate::error::Result;
use tracing::warn;

/// The owner/child pair and key columns a trigger enforces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSpec {
    /// Referencing table.
    pub child_table: String,
    /// Referenced table.
    pub parent_table: String,
    /// Shared key columns.
    pub columns: Vec<String>,
}

impl TriggerSpec {
    /// Create a trigger spec.
    pub fn new(
        child_table: impl Into<String>,
        parent_table: impl Into<String>,
        columns: Vec<String>,
    ) -> Self {
        Self {
            child_table: child_table.into(),
            parent_table: parent_table.into(),
            columns,
        }
    }

    fn name(&self, suffix: &str) -> String {
        format!("{}_{}_{}", self.child_table, self.parent_table, suffix)
    }

    fn constraint(&self) -> String {
        format!("fk_{}_{}", self.child_table, self.parent_table)
    }

    fn matches(&self, row: &str) -> String {
        self.columns
            .iter()
            .map(|c| format!("{} = {}.{}", c, row, c))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn assign(&self, value: impl Fn(&str) -> String) -> String {
        self.columns
            .iter()
            .map(|c| format!("{} = {}", c, value(c)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Parent event a set-null trigger reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    /// Parent row deleted.
    Delete,
    /// Parent key updated.
    Update,
}

/// Delete child rows when their parent row is deleted.
pub fn trigger_on_delete_cascade(spec: &TriggerSpec) -> String {
    format!(
        "CREATE TRIGGER IF NOT EXISTS {} BEFORE DELETE ON {} FOR EACH ROW BEGIN \
         DELETE FROM {} WHERE {}; END",
        spec.name("delete_cascade"),
        spec.parent_table,
        spec.child_table,
        spec.matches("OLD")
    )
}

/// Null the child's key columns when the parent row is deleted or its key updated.
pub fn trigger_on_delete_or_update_set_null(spec: &TriggerSpec, event: TriggerEvent) -> String {
    let (suffix, event_sql) = match event {
        TriggerEvent::Delete => ("delete_set_null", "DELETE".to_string()),
        TriggerEvent::Update => (
            "update_set_null",
            format!("UPDATE OF {}", spec.columns.join(", ")),
        ),
    };
    format!(
        "CREATE TRIGGER IF NOT EXISTS {} AFTER {} ON {} FOR EACH ROW BEGIN \
         UPDATE {} SET {} WHERE {}; END",
        spec.name(suffix),
        event_sql,
        spec.parent_table,
        spec.child_table,
        spec.assign(|_| "NULL".to_string()),
        spec.matches("OLD")
    )
}

/// Carry a parent key update over to the child rows.
pub fn trigger_on_update_cascade(spec: &TriggerSpec) -> String {
    format!(
        "CREATE TRIGGER IF NOT EXISTS {} AFTER UPDATE OF {} ON {} FOR EACH ROW BEGIN \
         UPDATE {} SET {} WHERE {}; END",
        spec.name("update_cascade"),
        spec.columns.join(", "),
        spec.parent_table,
        spec.child_table,
        spec.assign(|c| format!("NEW.{}", c)),
        spec.matches("OLD")
    )
}

fn enforce_integrity(spec: &TriggerSpec, event: &str, suffix: &str) -> String {
    let non_null = spec
        .columns
        .iter()
        .map(|c| format!("NEW.{} IS NOT NULL", c))
        .collect::<Vec<_>>()
        .join(" AND ");
    let probe = spec.columns.first().map(String::as_str).unwrap_or("1");
    format!(
        "CREATE TRIGGER IF NOT EXISTS {} BEFORE {} ON {} FOR EACH ROW BEGIN \
         SELECT RAISE(ABORT, '{} on table \"{}\" violates foreign key constraint \"{}\"') \
         WHERE {} AND (SELECT {} FROM {} WHERE {}) IS NULL; END",
        spec.name(suffix),
        event,
        spec.child_table,
        event.to_ascii_lowercase(),
        spec.child_table,
        spec.constraint(),
        non_null,
        probe,
        spec.parent_table,
        spec.matches("NEW")
    )
}

/// Reject child updates that point at a missing parent.
pub fn trigger_on_update_enforce_integrity(spec: &TriggerSpec) -> String {
    enforce_integrity(spec, "UPDATE", "update_integrity")
}

/// Reject child inserts that point at a missing parent.
pub fn trigger_on_insert_enforce_integrity(spec: &TriggerSpec) -> String {
    enforce_integrity(spec, "INSERT", "insert_integrity")
}

/// Reject parent deletes while child rows still reference the parent.
pub fn trigger_on_delete_restrict(spec: &TriggerSpec) -> String {
    format!(
        "CREATE TRIGGER IF NOT EXISTS {} BEFORE DELETE ON {} FOR EACH ROW BEGIN \
         SELECT RAISE(ABORT, 'delete on table \"{}\" violates foreign key constraint \"{}\"') \
         WHERE EXISTS (SELECT 1 FROM {} WHERE {}); END",
        spec.name("delete_restrict"),
        spec.parent_table,
        spec.parent_table,
        spec.constraint(),
        spec.child_table,
        spec.matches("OLD")
    )
}

/// All triggers emulating the foreign keys of a child table.
pub fn triggers(registry: &SchemaRegistry, schema: &TableSchema) -> Result<Vec<String>> {
    let mut statements = Vec::new();
    for group in registry.ownership_keys(schema)? {
        if group.columns.is_empty() {
            continue;
        }
        let spec = TriggerSpec::new(
            schema.table_name.clone(),
            group.parent.table_name.clone(),
            group.column_names().into_iter().map(String::from).collect(),
        );

        statements.push(trigger_on_insert_enforce_integrity(&spec));
        statements.push(trigger_on_update_enforce_integrity(&spec));

        match group.relationship.on_delete {
            Some(ReferentialAction::Cascade) => statements.push(trigger_on_delete_cascade(&spec)),
            Some(ReferentialAction::SetNull) => statements.push(
                trigger_on_delete_or_update_set_null(&spec, TriggerEvent::Delete),
            ),
            Some(ReferentialAction::SetDefault) => warn!(
                table = %schema.table_name,
                refer = %group.relationship.refer,
                "ON DELETE SET DEFAULT has no trigger emulation"
            ),
            Some(ReferentialAction::Restrict) | Some(ReferentialAction::NoAction) | None => {
                statements.push(trigger_on_delete_restrict(&spec))
            }
        }

        match group.relationship.on_update {
            Some(ReferentialAction::Cascade) => statements.push(trigger_on_update_cascade(&spec)),
            Some(ReferentialAction::SetNull) => statements.push(
                trigger_on_delete_or_update_set_null(&spec, TriggerEvent::Update),
            ),
            Some(ReferentialAction::SetDefault) => warn!(
                table = %schema.table_name,
                refer = %group.relationship.refer,
                "ON UPDATE SET DEFAULT has no trigger emulation"
            ),
            _ => {}
        }
    }
    Ok(statements)
}
