//! Compilation of the master table: the precedence-resolved union of every
//! enabled catalog, with one row per object id.

use rusqlite::Connection;
use tracing::debug;

use super::sql;
use crate::error::Result;

pub(crate) fn enabled_catalog_ids(conn: &Connection) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare_cached(sql::GET_ENABLED_IDS)?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<i64>, _>>()?;
    Ok(ids)
}

/// Rebuild `master` from the enabled catalogs.
///
/// The new table is filled under a staging name and swapped in within the
/// same transaction, so readers see either the old or the new master, and a
/// failure leaves the previous one untouched.
pub fn compile(conn: &mut Connection) -> Result<()> {
    let ids = enabled_catalog_ids(conn)?;

    let tx = conn.transaction()?;
    tx.execute_batch(&sql::drop_table(sql::MASTER_STAGING))?;
    tx.execute_batch(&sql::create_master_table(sql::MASTER_STAGING))?;
    if let Some(populate) = sql::populate_master(sql::MASTER_STAGING, &ids) {
        tx.execute_batch(&populate)?;
    }
    tx.execute_batch(&sql::drop_table(sql::MASTER))?;
    tx.execute_batch(&sql::rename_table(sql::MASTER_STAGING, sql::MASTER))?;
    for index in sql::MASTER_INDICES {
        tx.execute_batch(index)?;
    }
    tx.commit()?;

    debug!(catalogs = ids.len(), "compiled master catalog");
    Ok(())
}
