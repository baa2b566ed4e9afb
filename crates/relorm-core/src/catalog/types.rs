//! Logical column types and their mapping to storage column types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language-neutral column type declared in a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalType {
    /// 32-bit signed integer.
    #[serde(alias = "int")]
    Integer,
    /// 64-bit signed integer.
    Long,
    /// 16-bit signed integer.
    Short,
    /// 32-bit floating point.
    Float,
    /// 64-bit floating point.
    Double,
    /// Boolean.
    #[serde(alias = "bool")]
    Boolean,
    /// UTF-8 string.
    #[serde(alias = "text")]
    String,
    /// Single character.
    Char,
    /// Single byte.
    Byte,
    /// Binary data.
    #[serde(alias = "bytes")]
    Blob,
}

impl LogicalType {
    /// Check if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            LogicalType::Integer
                | LogicalType::Long
                | LogicalType::Short
                | LogicalType::Float
                | LogicalType::Double
                | LogicalType::Byte
        )
    }

    fn name(&self) -> &'static str {
        match self {
            LogicalType::Integer => "integer",
            LogicalType::Long => "long",
            LogicalType::Short => "short",
            LogicalType::Float => "float",
            LogicalType::Double => "double",
            LogicalType::Boolean => "boolean",
            LogicalType::String => "string",
            LogicalType::Char => "char",
            LogicalType::Byte => "byte",
            LogicalType::Blob => "blob",
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogicalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Ok(LogicalType::Integer),
            "long" => Ok(LogicalType::Long),
            "short" => Ok(LogicalType::Short),
            "float" => Ok(LogicalType::Float),
            "double" => Ok(LogicalType::Double),
            "bool" | "boolean" => Ok(LogicalType::Boolean),
            "string" | "text" => Ok(LogicalType::String),
            "char" => Ok(LogicalType::Char),
            "byte" => Ok(LogicalType::Byte),
            "blob" | "bytes" => Ok(LogicalType::Blob),
            other => Err(format!("unknown column type `{}`", other)),
        }
    }
}

/// Maps logical column types to storage column types. Only DDL generation uses it.
pub trait TypeMapper: Send + Sync {
    /// Storage column type for a logical type.
    fn storage_type(&self, logical: LogicalType) -> &'static str;
}

/// Type mapper for SQLite storage classes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteTypeMapper;

impl TypeMapper for SqliteTypeMapper {
    fn storage_type(&self, logical: LogicalType) -> &'static str {
        match logical {
            LogicalType::Integer | LogicalType::Long | LogicalType::Short | LogicalType::Byte => {
                "INTEGER"
            }
            LogicalType::Float | LogicalType::Double => "REAL",
            LogicalType::Boolean => "NUMERIC",
            LogicalType::String | LogicalType::Char => "TEXT",
            LogicalType::Blob => "BLOB",
        }
    }
}
