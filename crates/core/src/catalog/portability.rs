//! Single-catalog dump files.
//!
//! A dump is a standalone SQLite file holding one registry row in `catalogs`
//! and the object rows in `cat`, tagged with [`DUMP_APPLICATION_ID`] and the
//! schema version in `user_version`.

use std::path::Path;

use rusqlite::{params, Connection, DatabaseName, OptionalExtension};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::{master, path_param, row_to_catalog, schema, sql};
use crate::domain::{Catalog, USER_CATALOG_ID};
use crate::error::{Error, Result};

pub const DUMP_APPLICATION_ID: i32 = 0x4d51_5158;

const DUMP_SCHEMA: &str = "dump";
const DUMP_OBJECTS: &str = "dump.cat";
const DUMP_REGISTRY: &str = "dump.catalogs";

/// Attach `path` as schema `dump` for the duration of `f`.
fn with_attached<T>(
    conn: &mut Connection,
    path: &Path,
    f: impl FnOnce(&mut Connection) -> Result<T>,
) -> Result<T> {
    conn.execute(
        &format!("ATTACH DATABASE ?1 AS {DUMP_SCHEMA}"),
        params![path_param(path)?],
    )?;
    let result = f(conn);
    let detached = conn.execute_batch(&format!("DETACH DATABASE {DUMP_SCHEMA}"));
    let value = result?;
    detached?;
    Ok(value)
}

/// Write catalog `id` of `conn` to a new dump file at `path`, replacing any
/// existing file. The dumped registry row is always enabled.
pub fn dump_catalog(conn: &mut Connection, id: i64, path: &Path) -> Result<()> {
    let exists: Option<i64> = conn
        .query_row("SELECT id FROM catalogs WHERE id = ?1", params![id], |row| row.get(0))
        .optional()?;
    if exists.is_none() {
        return Err(Error::CatalogNotFound(id));
    }

    path_param(path)?;
    if path.exists() {
        std::fs::remove_file(path)?;
    }

    let written = with_attached(conn, path, |conn| {
        let tx = conn.transaction()?;
        tx.execute_batch(&sql::create_registry(DUMP_REGISTRY))?;
        tx.execute_batch(&sql::create_catalog_table(DUMP_OBJECTS))?;
        tx.execute(
            &format!(
                "INSERT INTO {DUMP_REGISTRY} ({fields}) SELECT {fields} FROM {} WHERE id = ?1",
                sql::REGISTRY,
                fields = sql::registry_fields()
            ),
            params![id],
        )?;
        tx.execute(&format!("UPDATE {DUMP_REGISTRY} SET enabled = 1"), [])?;
        let rows = tx.execute(&sql::copy_rows(&sql::catalog_table(id), DUMP_OBJECTS, id), [])?;
        let schema_name = Some(DatabaseName::Attached(DUMP_SCHEMA));
        tx.pragma_update(schema_name, "application_id", DUMP_APPLICATION_ID)?;
        tx.pragma_update(schema_name, "user_version", schema::CURRENT_SCHEMA_VERSION)?;
        tx.commit()?;
        Ok(rows)
    });

    match written {
        Ok(rows) => {
            info!(catalog = id, rows, path = %path.display(), "dumped catalog");
            Ok(())
        }
        Err(e) => {
            let _ = std::fs::remove_file(path);
            Err(e)
        }
    }
}

/// Copy the dump at `path` to a temporary file, validate it and bring it to
/// the current schema. The original file is never modified.
fn prepare_dump(path: &Path) -> Result<(NamedTempFile, Catalog)> {
    let invalid = || Error::InvalidCatalogFile(path.to_path_buf());

    if !path.is_file() {
        return Err(invalid());
    }
    let tmp = NamedTempFile::new()?;
    std::fs::copy(path, tmp.path())?;

    let mut dump = Connection::open(tmp.path()).map_err(|_| invalid())?;
    let application_id: i32 = dump
        .pragma_query_value(None, "application_id", |row| row.get(0))
        .map_err(|_| invalid())?;
    if application_id != DUMP_APPLICATION_ID {
        return Err(invalid());
    }

    let version: i64 = dump.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version > schema::CURRENT_SCHEMA_VERSION {
        return Err(Error::UnsupportedDumpVersion {
            found: version,
            expected: schema::CURRENT_SCHEMA_VERSION,
        });
    }
    if version < schema::CURRENT_SCHEMA_VERSION {
        schema::migrate_dump(&mut dump, version)?;
    }

    let catalog = dump
        .query_row(&sql::get_first_catalog(sql::REGISTRY), [], row_to_catalog)
        .optional()?
        .ok_or_else(|| Error::EmptyDump(path.to_path_buf()))?;
    drop(dump);

    debug!(path = %path.display(), catalog = catalog.id, version, "validated catalog dump");
    Ok((tmp, catalog))
}

/// Registry metadata of the dump at `path`, without importing it.
pub fn read_catalog_meta_from_file(path: &Path) -> Result<Catalog> {
    prepare_dump(path).map(|(_, catalog)| catalog)
}

/// Import the dump at `path` into `conn`, replacing a catalog with the same
/// id. An existing mutable catalog is only replaced when `overwrite` is set.
/// Every imported row gets its trixel from `trixel_of(ra, dec)`, since the
/// dump may come from a database with another mesh depth.
/// Returns the imported catalog's metadata.
pub fn import_catalog(
    conn: &mut Connection,
    path: &Path,
    overwrite: bool,
    trixel_of: &dyn Fn(f64, f64) -> i64,
) -> Result<Catalog> {
    let (tmp, catalog) = prepare_dump(path)?;
    let id = catalog.id;
    if id < 0 {
        return Err(Error::InvalidCatalogId(id));
    }

    let existing_mutable: Option<bool> = conn
        .query_row("SELECT mut FROM catalogs WHERE id = ?1", params![id], |row| row.get(0))
        .optional()?;
    if existing_mutable == Some(true) && !overwrite {
        warn!(catalog = id, path = %path.display(), "refusing to replace mutable catalog");
        return Err(Error::CatalogExists(id));
    }

    let table = sql::catalog_table(id);
    let rows = with_attached(conn, tmp.path(), |conn| {
        let tx = conn.transaction()?;
        tx.execute(sql::REMOVE_CATALOG, params![id])?;
        tx.execute_batch(&sql::drop_table(&table))?;
        tx.execute(
            &format!(
                "INSERT INTO {} ({fields}) SELECT {fields} FROM {DUMP_REGISTRY} WHERE id = ?1",
                sql::REGISTRY,
                fields = sql::registry_fields()
            ),
            params![id],
        )?;
        if id == USER_CATALOG_ID {
            tx.execute("UPDATE catalogs SET mut = 1 WHERE id = ?1", params![id])?;
        }
        tx.execute_batch(&sql::create_catalog_table(&table))?;
        let rows = tx.execute(&sql::copy_rows(DUMP_OBJECTS, &table, id), [])?;

        {
            let mut select = tx.prepare(&format!("SELECT oid, ra, dec FROM {table}"))?;
            let positions = select
                .query_map([], |row| {
                    Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, f64>(1)?, row.get::<_, f64>(2)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let mut update = tx.prepare(&format!("UPDATE {table} SET trixel = ?1 WHERE oid = ?2"))?;
            for (oid, ra, dec) in positions {
                update.execute(params![trixel_of(ra, dec), oid])?;
            }
        }

        tx.commit()?;
        Ok(rows)
    })?;

    master::compile(conn)?;
    info!(catalog = id, rows, path = %path.display(), "imported catalog");
    Ok(catalog)
}
