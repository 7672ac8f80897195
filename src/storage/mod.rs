//! Storage Layer - SQL driver contracts and the SQLite implementation
//!
//! The bundled driver keeps three kinds of tables in one SQLite file:
//! - options(option_name, option_value, autoload), holding schema versions
//! - posts(ID, post_type, post_title, post_status), the content items
//! - schema-versioned tables such as the relationship junction table

pub mod content;
pub mod dialect;
pub mod driver;
pub mod schema;
pub mod sqlite;

pub use content::{ContentItem, ItemPage, PUBLISHED};
pub use dialect::Dialect;
pub use driver::{ColumnFormat, ColumnMap, OptionStore, Row, SqlDriver, SqlValue};
pub use schema::{ColumnSpec, ColumnType, IndexSpec, TableSchema};
pub use sqlite::{SqliteStore, DEFAULT_PREFIX};
