use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::relationship::{Labels, RelationshipOptions, TypeSet};
use crate::storage::DEFAULT_PREFIX;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConnectConfig {
    pub database: Option<String>,
    pub table_prefix: String,
    /// Registered content types; searches only cover these
    pub content_types: Vec<String>,
    pub per_page: u32,
    pub server: ServerConfig,
    pub nonce: NonceConfig,
    pub relationships: Vec<RelationshipDeclaration>,
}

impl Default for ContentConnectConfig {
    fn default() -> Self {
        Self {
            database: None,
            table_prefix: DEFAULT_PREFIX.to_string(),
            content_types: Vec::new(),
            per_page: 10,
            server: ServerConfig::default(),
            nonce: NonceConfig::default(),
            relationships: Vec::new(),
        }
    }
}

impl ContentConnectConfig {
    /// Database path, falling back to `.content-connect/content-connect.db`
    /// under `base`
    pub fn database_path_in(&self, base: &Path) -> PathBuf {
        self.database
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| default_database_path_in(base))
    }

    /// Config written by `init`
    pub fn sample() -> Self {
        Self {
            content_types: vec!["post".to_string(), "page".to_string()],
            relationships: vec![RelationshipDeclaration {
                from: TypeSet::from("post"),
                to: TypeSet::from("page"),
                name: "related".to_string(),
                bidirectional: true,
                enable_ui: true,
                id: None,
                labels: None,
            }],
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8787 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NonceConfig {
    pub secret: String,
    pub lifetime_secs: u64,
}

impl Default for NonceConfig {
    fn default() -> Self {
        Self {
            secret: "change-me".to_string(),
            lifetime_secs: 86_400,
        }
    }
}

/// One `[[relationships]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDeclaration {
    pub from: TypeSet,
    pub to: TypeSet,
    pub name: String,
    #[serde(default)]
    pub bidirectional: bool,
    #[serde(default = "default_true")]
    pub enable_ui: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,
}

impl RelationshipDeclaration {
    pub fn options(&self) -> RelationshipOptions {
        RelationshipOptions {
            enable_ui: self.enable_ui,
            labels: self.labels.clone(),
            bidirectional: self.bidirectional,
            id: self.id.clone(),
        }
    }
}

fn default_true() -> bool {
    true
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("content-connect.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".content-connect").join("content-connect.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<ContentConnectConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: ContentConnectConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &ContentConnectConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_declarations() {
        let config: ContentConnectConfig = toml::from_str(
            r#"
            table_prefix = "cc_"
            content_types = ["book", "author", "film"]

            [nonce]
            secret = "s3cret"

            [[relationships]]
            from = "book"
            to = "author"
            name = "wrote"

            [[relationships]]
            from = "author"
            to = ["book", "film"]
            name = "credits"
            bidirectional = true
            enable_ui = false

            [relationships.labels]
            name = "Credits"
            "#,
        )
        .unwrap();

        assert_eq!(config.table_prefix, "cc_");
        assert_eq!(config.per_page, 10);
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.nonce.secret, "s3cret");
        assert_eq!(config.nonce.lifetime_secs, 86_400);
        assert_eq!(config.relationships.len(), 2);

        let wrote = &config.relationships[0];
        assert_eq!(wrote.to, TypeSet::from("author"));
        assert_eq!(wrote.options(), RelationshipOptions::default());

        let credits = config.relationships[1].options();
        assert_eq!(config.relationships[1].to, TypeSet::from(["book", "film"]));
        assert!(credits.bidirectional);
        assert!(!credits.enable_ui);
        assert_eq!(
            credits.labels.unwrap().get("name").map(String::as_str),
            Some("Credits")
        );
    }

    #[test]
    fn test_write_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content-connect.toml");

        write_config(&path, &ContentConnectConfig::sample(), false).unwrap();
        assert!(write_config(&path, &ContentConnectConfig::sample(), false).is_err());
        write_config(&path, &ContentConnectConfig::sample(), true).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded, ContentConnectConfig::sample());
        assert!(load_config(Some(&dir.path().join("missing.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_database_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = ContentConnectConfig::default();
        let db = config.database_path_in(dir.path());
        assert_eq!(db, dir.path().join(".content-connect").join("content-connect.db"));

        ensure_db_dir(&db).unwrap();
        assert!(db.parent().unwrap().is_dir());
    }
}
