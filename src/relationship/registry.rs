//! Relationship Registry - in-memory catalog of relationship definitions
//!
//! Built once per process from the same declarations, in the same order, so
//! every process ends up with identical contents.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{ItemToItem, RelationshipDefinition, RelationshipKind, RelationshipOptions, TypeSet};
use crate::table::JunctionTable;
use crate::{Error, Result};

/// Canonical key: `{sorted from}_{sorted to}_{name}`, each side sorted
/// ascending and joined with `.`
pub fn relationship_key(from: &TypeSet, to: &TypeSet, name: &str) -> String {
    format!("{}_{}_{}", from.sorted_key(), to.sorted_key(), name)
}

/// Catalog of relationship definitions keyed by canonical key
#[derive(Debug)]
pub struct RelationshipRegistry {
    junction: Arc<JunctionTable>,
    definitions: BTreeMap<String, RelationshipDefinition>,
}

impl RelationshipRegistry {
    /// Create an empty registry whose item-to-item relationships are stored
    /// in `junction`
    pub fn new(junction: Arc<JunctionTable>) -> Self {
        Self {
            junction,
            definitions: BTreeMap::new(),
        }
    }

    /// Define a new relationship between `from` and `to`.
    ///
    /// Fails with [`Error::DuplicateRelationship`] when [`Self::lookup`]
    /// already resolves the triple (including through the inverse of a
    /// bidirectional relationship), or when its canonical key is taken.
    pub fn define(
        &mut self,
        from: impl Into<TypeSet>,
        to: impl Into<TypeSet>,
        name: &str,
        options: RelationshipOptions,
    ) -> Result<&RelationshipDefinition> {
        let from = from.into();
        let to = to.into();

        if name.trim().is_empty() {
            return Err(Error::InvalidRelationship("relationship name must not be empty".to_string()));
        }
        if from.is_empty() || to.is_empty() {
            return Err(Error::InvalidRelationship(format!(
                "relationship {name} needs at least one type on each side"
            )));
        }

        let key = relationship_key(&from, &to, name);
        if self.lookup(&from, &to, name).is_some() || self.definitions.contains_key(&key) {
            return Err(Error::DuplicateRelationship {
                from: from.to_string(),
                to: to.to_string(),
                name: name.to_string(),
            });
        }

        let kind = RelationshipKind::ItemToItem(ItemToItem {
            from,
            to,
            is_bidirectional: options.bidirectional,
            table: Arc::clone(&self.junction),
        });
        let definition = RelationshipDefinition::new(name, kind, options);
        definition.setup()?;

        tracing::debug!(%key, id = %definition.id, bidirectional = definition.is_bidirectional(), "defined relationship");
        Ok(self.definitions.entry(key).or_insert(definition))
    }

    /// True iff [`Self::lookup`] finds a definition
    pub fn exists(&self, type_a: impl Into<TypeSet>, type_b: impl Into<TypeSet>, name: &str) -> bool {
        self.lookup(type_a, type_b, name).is_some()
    }

    /// Resolve a relationship. Argument order only matters for
    /// unidirectional relationships, where `type_a` must be the `from` side.
    ///
    /// The inverse order is only tried when `type_b` is a single type.
    pub fn lookup(
        &self,
        type_a: impl Into<TypeSet>,
        type_b: impl Into<TypeSet>,
        name: &str,
    ) -> Option<&RelationshipDefinition> {
        let type_a = type_a.into();
        let type_b = type_b.into();

        let key = relationship_key(&type_a, &type_b, name);
        if let Some(definition) = self.definitions.get(&key) {
            if definition.is_bidirectional() || *definition.from() == type_a {
                return Some(definition);
            }
        }

        if type_b.is_multi() {
            return None;
        }

        let inverse = relationship_key(&type_b, &type_a, name);
        self.definitions
            .get(&inverse)
            .filter(|definition| definition.is_bidirectional())
    }

    pub fn get_by_key(&self, key: &str) -> Option<&RelationshipDefinition> {
        self.definitions.get(key)
    }

    /// Definitions in key order
    pub fn definitions(&self) -> impl Iterator<Item = &RelationshipDefinition> {
        self.definitions.values()
    }

    /// Definitions sharing a relationship name
    pub fn find_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a RelationshipDefinition> + 'a {
        self.definitions.values().filter(move |d| d.name == name)
    }

    pub fn junction(&self) -> &Arc<JunctionTable> {
        &self.junction
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relationship::Labels;
    use crate::storage::SqliteStore;

    fn registry() -> RelationshipRegistry {
        let store = SqliteStore::open_in_memory().unwrap();
        let junction = Arc::new(JunctionTable::with_prefix("wp_"));
        junction.upgrade(&store, &store, false).unwrap();
        RelationshipRegistry::new(junction)
    }

    #[test]
    fn test_key_is_sort_invariant_per_side() {
        let a = TypeSet::from(["page", "article"]);
        let sorted_a = TypeSet::from(["article", "page"]);
        let b = TypeSet::from(["editor", "author"]);
        assert_eq!(relationship_key(&a, &b, "n"), relationship_key(&sorted_a, &b, "n"));
        assert_eq!(relationship_key(&a, &b, "n"), "article.page_author.editor_n");
        assert_ne!(
            relationship_key(&TypeSet::from("a"), &TypeSet::from("b"), "n"),
            relationship_key(&TypeSet::from("b"), &TypeSet::from("a"), "n")
        );
    }

    #[test]
    fn test_unidirectional_lookup_is_order_sensitive() {
        let mut registry = registry();
        registry.define("book", "author", "wrote", RelationshipOptions::default()).unwrap();

        assert!(registry.exists("book", "author", "wrote"));
        assert!(!registry.exists("author", "book", "wrote"));
        assert!(registry.lookup("book", ["author", "editor"], "wrote").is_none());
        assert!(!registry.exists("book", "author", "edited"));
    }

    #[test]
    fn test_bidirectional_lookup_either_order() {
        let mut registry = registry();
        registry
            .define("book", "author", "wrote", RelationshipOptions::default().bidirectional())
            .unwrap();

        assert!(registry.exists("book", "author", "wrote"));
        assert!(registry.exists("author", "book", "wrote"));
    }

    #[test]
    fn test_multi_valued_to_skips_inverse() {
        let mut registry = registry();
        registry
            .define("author", ["book", "film"], "credits", RelationshipOptions::default().bidirectional())
            .unwrap();

        assert!(registry.exists("author", ["film", "book"], "credits"));
        // Inverse would need type_b to be single
        assert!(!registry.exists(["book", "film"], ["author"], "credits"));
        assert!(registry.exists(["book", "film"], "author", "credits"));
    }

    #[test]
    fn test_duplicate_definitions_rejected() {
        let mut registry = registry();
        registry.define("book", "author", "wrote", RelationshipOptions::default()).unwrap();

        let dup = registry.define("book", "author", "wrote", RelationshipOptions::default());
        assert!(matches!(dup, Err(Error::DuplicateRelationship { .. })));
        assert_eq!(
            dup.unwrap_err().to_string(),
            "A relationship already exists between book and author with name wrote"
        );

        // Unidirectional inverse is a different relationship
        registry.define("author", "book", "wrote", RelationshipOptions::default()).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_inverse_of_bidirectional_is_duplicate() {
        let mut registry = registry();
        registry
            .define("book", "author", "wrote", RelationshipOptions::default().bidirectional())
            .unwrap();
        let dup = registry.define("author", "book", "wrote", RelationshipOptions::default().bidirectional());
        assert!(matches!(dup, Err(Error::DuplicateRelationship { .. })));
    }

    #[test]
    fn test_same_key_with_reordered_from_is_duplicate() {
        let mut registry = registry();
        registry
            .define(["page", "article"], "author", "byline", RelationshipOptions::default())
            .unwrap();
        let dup = registry.define(["article", "page"], "author", "byline", RelationshipOptions::default());
        assert!(matches!(dup, Err(Error::DuplicateRelationship { .. })));
    }

    #[test]
    fn test_defaults_and_overrides() {
        let mut registry = registry();
        let def = registry
            .define("Book", ["editor", "author"], "wrote", RelationshipOptions::default())
            .unwrap();
        assert_eq!(def.labels.get("name").map(String::as_str), Some("wrote"));
        assert!(def.enable_ui);
        assert_eq!(def.id, "item-to-item-wrote-book-author-editor");
        assert_eq!(def.table_name(), "wp_post_to_post");
        assert_eq!(def.key(), "Book_author.editor_wrote");

        let labels = Labels::from([("name".to_string(), "Authors".to_string())]);
        let def = registry
            .define(
                "film",
                "director",
                "made",
                RelationshipOptions::default().without_ui().labels(labels).id("films"),
            )
            .unwrap();
        assert_eq!(def.labels.get("name").map(String::as_str), Some("Authors"));
        assert!(!def.enable_ui);
        assert_eq!(def.id, "films");
    }

    #[test]
    fn test_invalid_definitions() {
        let mut registry = registry();
        assert!(matches!(
            registry.define("book", "author", " ", RelationshipOptions::default()),
            Err(Error::InvalidRelationship(_))
        ));
        assert!(matches!(
            registry.define(TypeSet::Many(vec![]), "author", "wrote", RelationshipOptions::default()),
            Err(Error::InvalidRelationship(_))
        ));
    }

    #[test]
    fn test_setup_requires_migrated_table() {
        let mut registry = RelationshipRegistry::new(Arc::new(JunctionTable::with_prefix("wp_")));
        let result = registry.define("book", "author", "wrote", RelationshipOptions::default());
        assert!(matches!(result, Err(Error::TableNotMigrated(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_identical_declarations_converge() {
        let build = || {
            let mut registry = registry();
            registry.define("book", "author", "wrote", RelationshipOptions::default()).unwrap();
            registry
                .define("author", ["book", "film"], "credits", RelationshipOptions::default().bidirectional())
                .unwrap();
            registry.definitions().map(|d| (d.key(), d.id.clone())).collect::<Vec<_>>()
        };
        assert_eq!(build(), build());
    }
}
