//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Tables the storage engine maintains itself; migration never drops them.
pub const DEFAULT_BOOKKEEPING_TABLES: &[&str] = &["sqlite_sequence", "android_metadata"];

/// How referential integrity is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyMode {
    /// Rely on the storage engine's FOREIGN KEY support.
    #[default]
    Native,
    /// Emulate foreign keys with triggers created alongside each table.
    Triggers,
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Foreign-key enforcement strategy.
    pub foreign_keys: ForeignKeyMode,

    /// Extra table names migration must leave alone.
    pub bookkeeping_tables: Vec<String>,

    /// Override the descriptor's locking request. None defers to the descriptor.
    pub locking: Option<bool>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            foreign_keys: ForeignKeyMode::Native,
            bookkeeping_tables: DEFAULT_BOOKKEEPING_TABLES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            locking: None,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the foreign-key enforcement strategy.
    pub fn with_foreign_keys(mut self, mode: ForeignKeyMode) -> Self {
        self.foreign_keys = mode;
        self
    }

    /// Protect an extra table from migration.
    pub fn with_bookkeeping_table(mut self, table: impl Into<String>) -> Self {
        self.bookkeeping_tables.push(table.into());
        self
    }

    /// Force locking on or off.
    pub fn with_locking(mut self, enabled: bool) -> Self {
        self.locking = Some(enabled);
        self
    }

    /// Whether a live table is maintained by the storage engine.
    pub fn is_bookkeeping(&self, table: &str) -> bool {
        table.to_ascii_lowercase().starts_with("sqlite_")
            || self
                .bookkeeping_tables
                .iter()
                .any(|t| t.eq_ignore_ascii_case(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.foreign_keys, ForeignKeyMode::Native);
        assert!(config.locking.is_none());
        assert!(config.is_bookkeeping("sqlite_sequence"));
        assert!(config.is_bookkeeping("sqlite_stat1"));
        assert!(config.is_bookkeeping("ANDROID_METADATA"));
        assert!(!config.is_bookkeeping("LIQUOR"));
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::new()
            .with_foreign_keys(ForeignKeyMode::Triggers)
            .with_bookkeeping_table("schema_log")
            .with_locking(true);
        assert_eq!(config.foreign_keys, ForeignKeyMode::Triggers);
        assert!(config.is_bookkeeping("SCHEMA_LOG"));
        assert_eq!(config.locking, Some(true));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: EngineConfig = serde_json::from_str(r#"{"foreign_keys": "triggers"}"#).unwrap();
        assert_eq!(config.foreign_keys, ForeignKeyMode::Triggers);
        assert!(config.is_bookkeeping("android_metadata"));
    }
}
