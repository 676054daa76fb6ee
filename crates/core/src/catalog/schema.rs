use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::{debug, info};

use super::sql;
use crate::error::{Error, Result};

pub const CURRENT_SCHEMA_VERSION: i64 = 3;

/// Oldest schema version that can still be migrated.
pub const OLDEST_MIGRATABLE_VERSION: i64 = 1;

/// Contents of the `meta` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta {
    pub version: i64,
    pub mesh_depth: u8,
    pub needs_init: bool,
}

/// An additive schema change lifting a database from `from` to `from + 1`.
struct Migration {
    from: i64,
    description: &'static str,
    /// Statements for a full catalog database.
    database: &'static [&'static str],
    /// Statements for a single-catalog dump file.
    dump: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        from: 1,
        description: "add catalog build timestamp",
        database: &["ALTER TABLE catalogs ADD COLUMN timestamp DATETIME DEFAULT NULL"],
        dump: &["ALTER TABLE catalogs ADD COLUMN timestamp DATETIME DEFAULT NULL"],
    },
    Migration {
        from: 2,
        description: "add per-scheme catalog colors",
        database: &[sql::CREATE_COLORS],
        dump: &[],
    },
];

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn master_exists(conn: &Connection) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(sql::EXISTS_MASTER, [], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

/// Read the meta record, `None` for a database that was never initialized.
pub fn read_meta(conn: &Connection) -> Result<Option<Meta>> {
    if !table_exists(conn, "meta")? {
        return Ok(None);
    }
    let meta = conn
        .query_row(sql::GET_META, [], |row| {
            Ok(Meta {
                version: row.get(0)?,
                mesh_depth: row.get::<_, i64>(1)?.clamp(0, u8::MAX as i64) as u8,
                needs_init: row.get(2)?,
            })
        })
        .optional()?;
    Ok(meta)
}

/// Create the meta, registry and color tables of a fresh database.
pub fn initialize(conn: &mut Connection, mesh_depth: u8) -> Result<Meta> {
    let meta = Meta {
        version: CURRENT_SCHEMA_VERSION,
        mesh_depth,
        needs_init: true,
    };

    let tx = conn.transaction()?;
    tx.execute_batch(sql::CREATE_META)?;
    tx.execute(sql::SET_META, params![meta.version, meta.mesh_depth, meta.needs_init])?;
    tx.execute_batch(&sql::create_registry(sql::REGISTRY))?;
    tx.execute_batch(sql::CREATE_COLORS)?;
    tx.commit()?;

    info!(version = meta.version, mesh_depth, "initialized catalog database");
    Ok(meta)
}

pub fn clear_init_flag(conn: &Connection) -> Result<()> {
    conn.execute(sql::CLEAR_INIT, [])?;
    Ok(())
}

fn check_version(version: i64) -> Result<()> {
    if version > CURRENT_SCHEMA_VERSION {
        return Err(Error::SchemaTooNew {
            db: version,
            code: CURRENT_SCHEMA_VERSION,
        });
    }
    if version < OLDEST_MIGRATABLE_VERSION {
        return Err(Error::Migration {
            from: version,
            message: format!("no migration path from schema version {version}"),
        });
    }
    Ok(())
}

/// Run `statements` of every migration above `from`, then `finish`, in one transaction.
fn apply(
    conn: &mut Connection,
    from: i64,
    statements: impl Fn(&Migration) -> &'static [&'static str],
    finish: impl FnOnce(&Transaction) -> rusqlite::Result<()>,
) -> Result<()> {
    let wrap = |e: rusqlite::Error| Error::Migration {
        from,
        message: e.to_string(),
    };

    let tx = conn.transaction().map_err(wrap)?;
    for migration in MIGRATIONS.iter().filter(|m| m.from >= from) {
        debug!(from = migration.from, description = migration.description, "applying migration");
        for statement in statements(migration) {
            tx.execute_batch(statement).map_err(wrap)?;
        }
    }
    finish(&tx).map_err(wrap)?;
    tx.commit().map_err(wrap)?;
    Ok(())
}

/// Bring a catalog database from `meta.version` to the current schema.
/// A no-op for databases that are already current.
pub fn migrate(conn: &mut Connection, meta: &Meta) -> Result<Meta> {
    check_version(meta.version)?;
    if meta.version == CURRENT_SCHEMA_VERSION {
        return Ok(*meta);
    }

    let from = meta.version;
    apply(conn, from, |m| m.database, |tx| {
        tx.execute(sql::UPDATE_VERSION, params![CURRENT_SCHEMA_VERSION])?;
        Ok(())
    })?;

    info!(from, to = CURRENT_SCHEMA_VERSION, "migrated catalog database");
    Ok(Meta {
        version: CURRENT_SCHEMA_VERSION,
        ..*meta
    })
}

/// Bring a dump file opened on `conn` from `version` to the current schema.
pub fn migrate_dump(conn: &mut Connection, version: i64) -> Result<()> {
    check_version(version)?;
    if version == CURRENT_SCHEMA_VERSION {
        return Ok(());
    }
    apply(conn, version, |m| m.dump, |tx| {
        tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)
    })?;
    debug!(from = version, "migrated catalog dump");
    Ok(())
}

pub fn backup_path(path: &Path, version: i64) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".v{version}.bak"));
    path.with_file_name(name)
}

/// Write a consistent copy of the open database next to `path`.
pub fn backup(conn: &Connection, path: &Path, version: i64) -> Result<PathBuf> {
    let target = backup_path(path, version);
    let target_param = super::path_param(&target)?;
    if target.exists() {
        std::fs::remove_file(&target)?;
    }
    conn.execute("VACUUM INTO ?1", params![target_param])?;
    info!(backup = %target.display(), "backed up catalog database before migration");
    Ok(target)
}
