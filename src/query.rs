//! Content query - related items through a named relationship

use crate::relationship::{RelationshipDefinition, RelationshipRegistry, TypeSet};
use crate::storage::{ContentItem, SqliteStore};
use crate::{Error, Result};

/// Find items of `related_type` related to `item_id`, where `item_id` is an
/// item of `item_type`
#[derive(Debug, Clone)]
pub struct ContentQuery {
    pub relationship: String,
    pub item_type: TypeSet,
    pub item_id: i64,
    pub related_type: TypeSet,
    /// Use the stored sort order instead of newest first
    pub order_by_relationship: bool,
}

impl ContentQuery {
    pub fn new(
        relationship: &str,
        item_type: impl Into<TypeSet>,
        item_id: i64,
        related_type: impl Into<TypeSet>,
    ) -> Self {
        Self {
            relationship: relationship.to_string(),
            item_type: item_type.into(),
            item_id,
            related_type: related_type.into(),
            order_by_relationship: false,
        }
    }

    pub fn order_by_relationship(mut self) -> Self {
        self.order_by_relationship = true;
        self
    }

    /// Resolve the relationship this query runs against
    pub fn resolve<'a>(&self, registry: &'a RelationshipRegistry) -> Result<&'a RelationshipDefinition> {
        registry
            .lookup(&self.item_type, &self.related_type, &self.relationship)
            .ok_or_else(|| {
                Error::UnknownRelationship(format!(
                    "{} between {} and {}",
                    self.relationship, self.item_type, self.related_type
                ))
            })
    }

    pub fn execute(&self, registry: &RelationshipRegistry, store: &SqliteStore) -> Result<Vec<ContentItem>> {
        let definition = self.resolve(registry)?;
        let types: Vec<String> = self.related_type.ids().into_iter().map(String::from).collect();
        tracing::debug!(key = %definition.key(), item_id = self.item_id, "running content query");

        store.related_items(
            definition.table_name(),
            &definition.name,
            self.item_id,
            &types,
            self.order_by_relationship,
        )
    }
}
