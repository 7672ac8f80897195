//! Dotted schema versions (`0.1.0`, `1.2`)

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A dotted numeric version, compared component-wise.
///
/// Missing trailing components count as zero, so `1.2` == `1.2.0`.
#[derive(Debug, Clone)]
pub struct SchemaVersion {
    parts: Vec<u64>,
    raw: String,
}

impl SchemaVersion {
    pub fn parse(version: &str) -> Result<Self> {
        let raw = version.trim();
        if raw.is_empty() {
            return Err(Error::InvalidVersion("empty version".to_string()));
        }

        let parts = raw
            .split('.')
            .map(|p| {
                p.parse::<u64>()
                    .map_err(|_| Error::InvalidVersion(format!("{raw:?} is not a dotted numeric version")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            parts,
            raw: raw.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True when `self` should replace `installed`.
    ///
    /// Absent and unparsable installed versions are always older.
    pub fn is_newer_than(&self, installed: Option<&str>) -> bool {
        match installed.map(SchemaVersion::parse) {
            Some(Ok(installed)) => *self > installed,
            Some(Err(_)) | None => true,
        }
    }
}

impl Ord for SchemaVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| {
                let a = self.parts.get(i).copied().unwrap_or(0);
                let b = other.parts.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for SchemaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SchemaVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SchemaVersion {}

impl FromStr for SchemaVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> SchemaVersion {
        SchemaVersion::parse(s).unwrap()
    }

    #[test]
    fn test_numeric_not_lexicographic() {
        assert!(v("0.10.0") > v("0.9.0"));
        assert!(v("2.0") > v("1.99.99"));
        assert!(v("1.0.1") > v("1.0"));
    }

    #[test]
    fn test_trailing_zeros_are_equal() {
        assert_eq!(v("1.2"), v("1.2.0"));
        assert_eq!(v("1.2").as_str(), "1.2");
    }

    #[test]
    fn test_is_newer_than_installed() {
        let compiled = v("0.1.0");
        assert!(compiled.is_newer_than(None));
        assert!(compiled.is_newer_than(Some("")));
        assert!(compiled.is_newer_than(Some("0.0.9")));
        assert!(!compiled.is_newer_than(Some("0.1.0")));
        assert!(!compiled.is_newer_than(Some("0.2")));
    }

    #[test]
    fn test_invalid_versions() {
        assert!(SchemaVersion::parse("").is_err());
        assert!(SchemaVersion::parse("1.x").is_err());
        assert!("1..2".parse::<SchemaVersion>().is_err());
    }
}
