//! # Content Connect - relationships between content types
//!
//! Declares many-to-many relationships between content-item types
//! (e.g. `book` <-> `author`) and persists relationship instances in a
//! junction table.
//!
//! Content Connect provides:
//! - A relationship registry with canonical keys and bidirectional lookup
//! - Schema-versioned tables with gated, idempotent migrations
//! - Bulk upsert/delete SQL generation for MySQL and SQLite dialects
//! - A SQLite-backed driver, option store and content table
//! - A content query layer and an HTTP search endpoint

pub mod config;
pub mod context;
pub mod nonce;
pub mod query;
pub mod relationship;
pub mod search;
pub mod server;
pub mod storage;
pub mod table;
pub mod ui;

// Re-exports for convenient access
pub use context::AppContext;
pub use relationship::{RelationshipDefinition, RelationshipOptions, RelationshipRegistry, TypeSet};
pub use storage::SqliteStore;
pub use table::{JunctionTable, SchemaVersion, SchemaVersionedTable};

/// Result type alias for Content Connect operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Content Connect operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("A relationship already exists between {from} and {to} with name {name}")]
    DuplicateRelationship {
        from: String,
        to: String,
        name: String,
    },

    #[error("Invalid relationship: {0}")]
    InvalidRelationship(String),

    #[error("Invalid bulk write: {0}")]
    InvalidBulkWrite(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Invalid schema version: {0}")]
    InvalidVersion(String),

    #[error("Table {0} has not been migrated")]
    TableNotMigrated(String),

    #[error("Relationship not found: {0}")]
    UnknownRelationship(String),
}
