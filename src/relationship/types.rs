//! Participant type sets

use std::fmt;

use serde::{Deserialize, Serialize};

/// One or more content type identifiers on one side of a relationship.
///
/// `Single("book")` and `Many(["book"])` are distinct: equality is exact
/// and only `Many` counts as multi-valued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeSet {
    Single(String),
    Many(Vec<String>),
}

impl TypeSet {
    /// Identifiers in the order given
    pub fn ids(&self) -> Vec<&str> {
        match self {
            TypeSet::Single(id) => vec![id.as_str()],
            TypeSet::Many(ids) => ids.iter().map(String::as_str).collect(),
        }
    }

    /// Identifiers sorted ascending and joined with `.`
    pub fn sorted_key(&self) -> String {
        let mut ids = self.ids();
        ids.sort_unstable();
        ids.join(".")
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, TypeSet::Many(_))
    }

    /// True when there is no identifier or any identifier is blank
    pub fn is_empty(&self) -> bool {
        let ids = self.ids();
        ids.is_empty() || ids.iter().any(|id| id.trim().is_empty())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids().contains(&id)
    }

    /// Parse a comma separated list; a single entry stays `Single`
    pub fn parse_list(input: &str) -> Self {
        let ids: Vec<String> = input
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        match <[String; 1]>::try_from(ids) {
            Ok([id]) if !input.contains(',') => TypeSet::Single(id),
            Ok([id]) => TypeSet::Many(vec![id]),
            Err(ids) => TypeSet::Many(ids),
        }
    }
}

impl From<&str> for TypeSet {
    fn from(id: &str) -> Self {
        TypeSet::Single(id.to_string())
    }
}

impl From<String> for TypeSet {
    fn from(id: String) -> Self {
        TypeSet::Single(id)
    }
}

impl From<&String> for TypeSet {
    fn from(id: &String) -> Self {
        TypeSet::Single(id.clone())
    }
}

impl From<Vec<String>> for TypeSet {
    fn from(ids: Vec<String>) -> Self {
        TypeSet::Many(ids)
    }
}

impl From<Vec<&str>> for TypeSet {
    fn from(ids: Vec<&str>) -> Self {
        TypeSet::Many(ids.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for TypeSet {
    fn from(ids: [&str; N]) -> Self {
        TypeSet::Many(ids.iter().map(|s| s.to_string()).collect())
    }
}

impl From<&TypeSet> for TypeSet {
    fn from(set: &TypeSet) -> Self {
        set.clone()
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ids().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_key_ignores_given_order() {
        assert_eq!(TypeSet::from(["editor", "author"]).sorted_key(), "author.editor");
        assert_eq!(TypeSet::from("book").sorted_key(), "book");
    }

    #[test]
    fn test_single_and_many_are_distinct() {
        assert_ne!(TypeSet::from("book"), TypeSet::from(["book"]));
        assert!(!TypeSet::from("book").is_multi());
        assert!(TypeSet::from(["book"]).is_multi());
    }

    #[test]
    fn test_empty_detection() {
        assert!(TypeSet::from("").is_empty());
        assert!(TypeSet::Many(vec![]).is_empty());
        assert!(TypeSet::from(["a", " "]).is_empty());
        assert!(!TypeSet::from(["a", "b"]).is_empty());
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(TypeSet::parse_list("author"), TypeSet::from("author"));
        assert_eq!(TypeSet::parse_list("author,editor"), TypeSet::from(["author", "editor"]));
        assert_eq!(TypeSet::parse_list("author,"), TypeSet::from(["author"]));
    }

    #[test]
    fn test_deserialize_string_or_list() {
        let single: TypeSet = serde_json::from_str("\"book\"").unwrap();
        let many: TypeSet = serde_json::from_str("[\"book\", \"film\"]").unwrap();
        assert_eq!(single, TypeSet::from("book"));
        assert_eq!(many, TypeSet::from(["book", "film"]));
    }
}
