//! Process startup: migrate storage, then register declared relationships

use std::sync::Arc;

use crate::config::ContentConnectConfig;
use crate::relationship::RelationshipRegistry;
use crate::storage::SqliteStore;
use crate::table::JunctionTable;
use crate::Result;

/// Everything a running process shares: configuration, the junction table
/// and the populated registry
#[derive(Debug)]
pub struct AppContext {
    pub config: ContentConnectConfig,
    pub junction: Arc<JunctionTable>,
    pub registry: RelationshipRegistry,
}

impl AppContext {
    /// Bring storage up to date and define every configured relationship,
    /// in file order
    pub fn bootstrap(config: ContentConnectConfig, store: &SqliteStore) -> Result<Self> {
        let junction = Arc::new(JunctionTable::with_prefix(&config.table_prefix));
        if junction.upgrade(store, store, false)? {
            tracing::info!(table = junction.table_name(), "junction table migrated");
        }

        let mut registry = RelationshipRegistry::new(Arc::clone(&junction));
        for declaration in &config.relationships {
            registry.define(
                &declaration.from,
                &declaration.to,
                &declaration.name,
                declaration.options(),
            )?;
        }
        tracing::debug!(relationships = registry.len(), "registry ready");

        Ok(Self {
            config,
            junction,
            registry,
        })
    }

    /// Delete a content item along with every relation it takes part in.
    /// Returns whether the item existed.
    pub fn delete_item(&self, store: &SqliteStore, item_id: i64) -> Result<bool> {
        let removed = self.junction.delete_item(store, item_id)?;
        tracing::debug!(item_id, removed, "removed junction rows");
        store.delete_item_row(item_id)
    }
}
