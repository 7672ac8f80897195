//! Relationship definitions and the registry that catalogs them
//!
//! A relationship is identified by its canonical key
//! `{sorted from}_{sorted to}_{name}`. Every kind carries the common fields
//! below and supplies its own `setup`, which checks that backing storage is
//! ready.

pub mod item_to_item;
pub mod registry;
pub mod types;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Result;

pub use item_to_item::ItemToItem;
pub use registry::{relationship_key, RelationshipRegistry};
pub use types::TypeSet;

/// Label slot -> display string
pub type Labels = BTreeMap<String, String>;

/// Recognized options for [`RelationshipRegistry::define`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipOptions {
    /// Show the default relationship UI (default: true)
    pub enable_ui: bool,
    /// Replaces the default `{name: relationship name}` labels when set
    pub labels: Option<Labels>,
    /// Discoverable from either side (default: false)
    pub bidirectional: bool,
    /// Overrides the generated DOM id
    pub id: Option<String>,
}

impl Default for RelationshipOptions {
    fn default() -> Self {
        Self {
            enable_ui: true,
            labels: None,
            bidirectional: false,
            id: None,
        }
    }
}

impl RelationshipOptions {
    pub fn bidirectional(mut self) -> Self {
        self.bidirectional = true;
        self
    }

    pub fn without_ui(mut self) -> Self {
        self.enable_ui = false;
        self
    }

    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// The kind-specific part of a definition
#[derive(Debug, Clone)]
pub enum RelationshipKind {
    ItemToItem(ItemToItem),
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::ItemToItem(_) => "item-to-item",
        }
    }

    fn setup(&self) -> Result<()> {
        match self {
            RelationshipKind::ItemToItem(kind) => kind.setup(),
        }
    }
}

/// An immutable, registered relationship
#[derive(Debug, Clone)]
pub struct RelationshipDefinition {
    /// Distinguishes several relationships between the same types
    pub name: String,
    /// Stable identifier for UI/DOM use
    pub id: String,
    pub enable_ui: bool,
    pub labels: Labels,
    pub kind: RelationshipKind,
}

impl RelationshipDefinition {
    pub(crate) fn new(name: &str, kind: RelationshipKind, options: RelationshipOptions) -> Self {
        let labels = options
            .labels
            .unwrap_or_else(|| Labels::from([("name".to_string(), name.to_string())]));
        let id = options.id.unwrap_or_else(|| default_id(name, &kind));

        Self {
            name: name.to_string(),
            id,
            enable_ui: options.enable_ui,
            labels,
            kind,
        }
    }

    /// Ensure backing storage is ready; idempotent
    pub fn setup(&self) -> Result<()> {
        self.kind.setup()
    }

    pub fn from(&self) -> &TypeSet {
        match &self.kind {
            RelationshipKind::ItemToItem(kind) => &kind.from,
        }
    }

    pub fn to(&self) -> &TypeSet {
        match &self.kind {
            RelationshipKind::ItemToItem(kind) => &kind.to,
        }
    }

    pub fn is_bidirectional(&self) -> bool {
        match &self.kind {
            RelationshipKind::ItemToItem(kind) => kind.is_bidirectional,
        }
    }

    /// Canonical registry key
    pub fn key(&self) -> String {
        relationship_key(self.from(), self.to(), &self.name)
    }

    /// Storage table backing this relationship
    pub fn table_name(&self) -> &str {
        match &self.kind {
            RelationshipKind::ItemToItem(kind) => kind.table.table_name(),
        }
    }
}

fn default_id(name: &str, kind: &RelationshipKind) -> String {
    let raw = match kind {
        RelationshipKind::ItemToItem(k) => format!(
            "{}-{}-{}-{}",
            kind.as_str(),
            name,
            k.from.sorted_key(),
            k.to.sorted_key()
        ),
    };
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect()
}
