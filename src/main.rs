//! Content Connect CLI - relationships between content types

use clap::{Parser, Subcommand};
use content_connect::config::{self, ContentConnectConfig};
use content_connect::nonce::{NonceManager, SEARCH_ACTION};
use content_connect::query::ContentQuery;
use content_connect::server::{self, AppState};
use content_connect::storage::{Dialect, SqliteStore, PUBLISHED};
use content_connect::ui::{self, Icons};
use content_connect::{AppContext, JunctionTable, TypeSet};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "content-connect")]
#[command(version)]
#[command(about = "Declare relationships between content types and relate items")]
#[command(long_about = r#"
Content Connect keeps a registry of relationships between content types
(book <-> author) and stores related item pairs in a junction table.

Example usage:
  content-connect init
  content-connect migrate
  content-connect lookup book author wrote
  content-connect connect wrote book author 12 40
  content-connect serve --port 8787
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Create or upgrade managed tables
    Migrate {
        /// Apply the schema even if the installed version is current
        #[arg(long)]
        force: bool,
    },

    /// List registered relationships
    Relationships,

    /// Resolve a relationship from two type lists and a name
    Lookup {
        /// First type (comma separated for several)
        type_a: String,
        /// Second type (comma separated for several)
        type_b: String,
        name: String,
    },

    /// Create a content item
    AddItem {
        #[arg(short = 't', long = "type")]
        post_type: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = PUBLISHED)]
        status: String,
    },

    /// Delete a content item and every relation it takes part in
    DeleteItem { id: i64 },

    /// Relate two items
    Connect {
        name: String,
        from_type: String,
        to_type: String,
        id1: i64,
        id2: i64,
    },

    /// Remove the relation between two items
    Disconnect {
        name: String,
        from_type: String,
        to_type: String,
        id1: i64,
        id2: i64,
    },

    /// List items related to an item
    Related {
        name: String,
        /// Type of the item (comma separated for several)
        item_type: String,
        /// Types to return (comma separated for several)
        related_type: String,
        id: i64,
        /// Use the stored sort order
        #[arg(long)]
        ordered: bool,
    },

    /// Print the junction table DDL
    Schema {
        /// mysql or sqlite
        #[arg(long, default_value = "mysql")]
        dialect: String,
    },

    /// Print a search nonce for a user
    Nonce {
        #[arg(short, long)]
        user: u64,
    },

    /// Start the HTTP search endpoint
    Serve {
        /// Port to listen on (defaults to the config)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);

    let config = match cli.command {
        Commands::Init { .. } => ContentConnectConfig::default(),
        _ => config::load_config(Some(&config_path))?.unwrap_or_default(),
    };

    match cli.command {
        Commands::Init { force } => {
            config::write_config(&config_path, &ContentConnectConfig::sample(), force)?;
            ui::success(&format!("Wrote {}", config_path.display()));
        }

        Commands::Migrate { force } => {
            let store = open_store(cli.database.as_deref(), &config)?;
            let junction = JunctionTable::with_prefix(&config.table_prefix);
            let installed = junction.installed_schema_version(&store)?;
            let applied = junction.upgrade(&store, &store, force)?;

            ui::header("Migrate");
            ui::status(Icons::DATABASE, "Table", &ui::key(junction.table_name()));
            ui::summary_row("installed", installed.as_deref().unwrap_or("none"));
            ui::summary_row("compiled", &junction.schema_version()?.to_string());
            if applied {
                ui::success("Schema applied");
            } else {
                ui::success("Schema already current");
            }
        }

        Commands::Relationships => {
            let store = open_store(cli.database.as_deref(), &config)?;
            let ctx = AppContext::bootstrap(config, &store)?;
            if ctx.registry.is_empty() {
                ui::warn("No relationships declared");
            } else {
                println!("{}", ui::relationships_table(ctx.registry.definitions()));
            }
        }

        Commands::Lookup { type_a, type_b, name } => {
            let store = open_store(cli.database.as_deref(), &config)?;
            let ctx = AppContext::bootstrap(config, &store)?;
            let (type_a, type_b) = (TypeSet::parse_list(&type_a), TypeSet::parse_list(&type_b));
            match ctx.registry.lookup(&type_a, &type_b, &name) {
                Some(def) => {
                    ui::status(Icons::KEY, "Key", &ui::key(&def.key()));
                    ui::summary_row("id", &def.id);
                    ui::summary_row("table", def.table_name());
                    ui::summary_row("bidirectional", &def.is_bidirectional().to_string());
                }
                None => ui::warn(&format!("No relationship {name} between {type_a} and {type_b}")),
            }
        }

        Commands::AddItem { post_type, title, status } => {
            let store = open_store(cli.database.as_deref(), &config)?;
            let id = store.insert_item(&post_type, &title, &status)?;
            ui::status(Icons::NEW, "Created", &format!("{post_type} #{id}"));
        }

        Commands::DeleteItem { id } => {
            let store = open_store(cli.database.as_deref(), &config)?;
            let ctx = AppContext::bootstrap(config, &store)?;
            if ctx.delete_item(&store, id)? {
                ui::status(Icons::DEL, "Deleted", &format!("#{id}"));
            } else {
                ui::warn(&format!("No item #{id}"));
            }
        }

        Commands::Connect { name, from_type, to_type, id1, id2 } => {
            let store = open_store(cli.database.as_deref(), &config)?;
            let ctx = AppContext::bootstrap(config, &store)?;
            let def = ctx
                .registry
                .lookup(TypeSet::parse_list(&from_type), TypeSet::parse_list(&to_type), &name)
                .ok_or_else(|| anyhow::anyhow!("no relationship {name} between {from_type} and {to_type}"))?;
            def.add(&store, id1, id2)?;
            ui::status(Icons::LINK, "Related", &format!("#{id1} {} #{id2} ({name})", Icons::BOTH));
        }

        Commands::Disconnect { name, from_type, to_type, id1, id2 } => {
            let store = open_store(cli.database.as_deref(), &config)?;
            let ctx = AppContext::bootstrap(config, &store)?;
            let def = ctx
                .registry
                .lookup(TypeSet::parse_list(&from_type), TypeSet::parse_list(&to_type), &name)
                .ok_or_else(|| anyhow::anyhow!("no relationship {name} between {from_type} and {to_type}"))?;
            let removed = def.delete(&store, id1, id2)?;
            ui::status(Icons::UNLINK, "Removed rows", &removed.to_string());
        }

        Commands::Related { name, item_type, related_type, id, ordered } => {
            let store = open_store(cli.database.as_deref(), &config)?;
            let ctx = AppContext::bootstrap(config, &store)?;
            let mut query = ContentQuery::new(
                &name,
                TypeSet::parse_list(&item_type),
                id,
                TypeSet::parse_list(&related_type),
            );
            if ordered {
                query = query.order_by_relationship();
            }
            let items = query.execute(&ctx.registry, &store)?;
            if items.is_empty() {
                ui::info("Related", "none");
            } else {
                println!("{}", ui::items_table(&items));
            }
        }

        Commands::Schema { dialect } => {
            let dialect: Dialect = dialect.parse()?;
            let junction = JunctionTable::with_prefix(&config.table_prefix);
            for statement in dialect.schema_statements(junction.schema()) {
                println!("{statement};");
            }
        }

        Commands::Nonce { user } => {
            let nonces = NonceManager::from_config(&config.nonce);
            ui::status(Icons::PERSON, &format!("user {user}"), &nonces.create(SEARCH_ACTION, user));
        }

        Commands::Serve { port } => {
            let store = open_store(cli.database.as_deref(), &config)?;
            let port = port.unwrap_or(config.server.port);
            let ctx = AppContext::bootstrap(config, &store)?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::start_server(port, AppState::new(ctx, store)))?;
        }
    }

    Ok(())
}

fn open_store(database: Option<&Path>, config: &ContentConnectConfig) -> anyhow::Result<SqliteStore> {
    let path = match database {
        Some(path) => path.to_path_buf(),
        None => config.database_path_in(&std::env::current_dir()?),
    };
    config::ensure_db_dir(&path)?;
    tracing::debug!("Opening database {:?}", path);
    Ok(SqliteStore::open(&path, &config.table_prefix)?)
}
