mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use skycat_core::{Database, DbConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// skycat: multi-catalog sky object database
#[derive(Parser)]
#[command(name = "skycat", version, about)]
struct Cli {
    /// Path to the catalog database
    #[arg(long, default_value_t = default_db_path())]
    db: String,

    /// Mesh depth used when creating a new database
    #[arg(long)]
    mesh_depth: Option<u8>,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered catalogs
    Catalogs {
        /// Include disabled catalogs
        #[arg(long)]
        all: bool,
    },
    /// Manage a single catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Add, remove or show single objects
    Object {
        #[command(subcommand)]
        action: ObjectAction,
    },
    /// Find objects by name, exact matches first
    Find {
        name: String,
        /// Only return exact matches
        #[arg(long, conflicts_with = "catalog")]
        exact: bool,
        /// Restrict the search to one catalog
        #[arg(long)]
        catalog: Option<i64>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Find objects by a SQL LIKE pattern on the name
    Wildcard {
        pattern: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List the objects of one trixel
    Trixel { id: i64 },
    /// List the brightest objects
    Bright {
        /// Restrict to one object type, e.g. `galaxy`
        #[arg(long = "type")]
        object_type: Option<String>,
        /// Faintest magnitude to include
        #[arg(long)]
        maglim: Option<f64>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Restrict to one catalog
        #[arg(long)]
        catalog: Option<i64>,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Register a new, empty catalog
    Add {
        name: String,
        /// Catalog id (defaults to the first free custom id)
        #[arg(long)]
        id: Option<i64>,
        #[arg(long, default_value_t = 0.5)]
        precedence: f64,
        /// Allow object inserts and removals
        #[arg(long)]
        mutable: bool,
        #[arg(long, default_value = "")]
        author: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Remove a catalog and all of its objects
    Remove { id: i64 },
    /// Include a catalog in lookups
    Enable { id: i64 },
    /// Hide a catalog from lookups
    Disable { id: i64 },
    /// Object counts per type (whole database if no id is given)
    Stats { id: Option<i64> },
    /// Write a catalog to a standalone dump file
    Dump { id: i64, path: PathBuf },
    /// Import a dump file
    Import {
        path: PathBuf,
        /// Replace an existing mutable catalog with the same id
        #[arg(long)]
        overwrite: bool,
        /// Only print the dump's metadata
        #[arg(long)]
        dry_run: bool,
    },
    /// Copy all objects of one catalog into another
    Copy { src: i64, dst: i64 },
}

#[derive(Subcommand)]
enum ObjectAction {
    /// Insert an object into a mutable catalog
    Add {
        name: String,
        /// Right ascension in degrees
        #[arg(long, allow_hyphen_values = true)]
        ra: f64,
        /// Declination in degrees
        #[arg(long, allow_hyphen_values = true)]
        dec: f64,
        #[arg(long = "type", default_value = "star")]
        object_type: String,
        #[arg(long, allow_hyphen_values = true)]
        magnitude: Option<f64>,
        #[arg(long)]
        long_name: Option<String>,
        /// Target catalog (defaults to the user catalog)
        #[arg(long, default_value_t = skycat_core::USER_CATALOG_ID)]
        catalog: i64,
    },
    /// Remove an object from a mutable catalog
    Remove { catalog: i64, object_id: String },
    /// Show the winning row of an object
    Get {
        object_id: String,
        /// Show the row of a specific catalog instead
        #[arg(long)]
        catalog: Option<i64>,
    },
}

fn default_db_path() -> String {
    dirs_path().to_string_lossy().to_string()
}

fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".skycat").join("catalogs.sqlite")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = DbConfig::default();
    if let Some(depth) = cli.mesh_depth {
        config = config.with_mesh_depth(depth);
    }
    let db = Database::open_with(&PathBuf::from(&cli.db), &config)?;
    debug!(path = %cli.db, mesh_depth = db.mesh_depth(), "opened database");
    let json = cli.json;

    match cli.command {
        Commands::Catalogs { all } => commands::catalogs::list(&db, all, json)?,
        Commands::Catalog { action } => match action {
            CatalogAction::Add {
                name,
                id,
                precedence,
                mutable,
                author,
                description,
            } => commands::catalogs::add(
                &db,
                commands::catalogs::NewCatalog {
                    id,
                    name,
                    precedence,
                    mutable,
                    author,
                    description,
                },
            )?,
            CatalogAction::Remove { id } => commands::catalogs::remove(&db, id)?,
            CatalogAction::Enable { id } => commands::catalogs::set_enabled(&db, id, true)?,
            CatalogAction::Disable { id } => commands::catalogs::set_enabled(&db, id, false)?,
            CatalogAction::Stats { id } => commands::catalogs::stats(&db, id, json)?,
            CatalogAction::Dump { id, path } => commands::catalogs::dump(&db, id, &path)?,
            CatalogAction::Import {
                path,
                overwrite,
                dry_run,
            } => commands::catalogs::import(&db, &path, overwrite, dry_run, json)?,
            CatalogAction::Copy { src, dst } => commands::catalogs::copy(&db, src, dst)?,
        },
        Commands::Object { action } => match action {
            ObjectAction::Add {
                name,
                ra,
                dec,
                object_type,
                magnitude,
                long_name,
                catalog,
            } => commands::objects::add(
                &db,
                catalog,
                commands::objects::ObjectArgs {
                    name,
                    ra,
                    dec,
                    object_type,
                    magnitude,
                    long_name,
                },
            )?,
            ObjectAction::Remove { catalog, object_id } => {
                commands::objects::remove(&db, catalog, &object_id)?
            }
            ObjectAction::Get { object_id, catalog } => {
                commands::objects::get(&db, &object_id, catalog, json)?
            }
        },
        Commands::Find {
            name,
            exact,
            catalog,
            limit,
        } => commands::query::find(&db, &name, exact, catalog, limit, json)?,
        Commands::Wildcard { pattern, limit } => {
            commands::query::wildcard(&db, &pattern, limit, json)?
        }
        Commands::Trixel { id } => commands::query::trixel(&db, id, json)?,
        Commands::Bright {
            object_type,
            maglim,
            limit,
            catalog,
        } => commands::query::bright(&db, object_type.as_deref(), maglim, limit, catalog, json)?,
    }

    Ok(())
}
