//! Schema model for relorm.
//!
//! The catalog holds table schemas, their columns, indexes and
//! relationships, the accessor tables binding Rust types to them, and the
//! registry that resolves relationships lazily across the (possibly cyclic)
//! schema graph.

mod binding;
mod column;
mod database;
mod index;
mod keys;
mod registry;
mod relation;
mod table;
mod types;

pub use binding::{BindingBuilder, EntityBinding};
pub use column::Column;
pub use database::{DatabaseDescriptor, SchemaDocument};
pub use index::Index;
pub use keys::OwnershipKey;
pub use registry::SchemaRegistry;
pub use relation::{ReferentialAction, RelationKind, Relationship};
pub use table::TableSchema;
pub use types::{LogicalType, SqliteTypeMapper, TypeMapper};
