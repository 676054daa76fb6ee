pub mod colors;
pub mod filter;
pub mod master;
pub mod portability;
pub mod schema;
pub mod sql;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::config::DbConfig;
use crate::domain::*;
use crate::error::{Error, Result};
use crate::hasher;
use crate::mesh::{self, SpatialIndexer};
use colors::{CatalogColorMap, ColorMap};
use filter::{Filter, OrderBy};

/// SQLite-backed store for all catalogs and the compiled master table.
pub struct CatalogStore {
    conn: Connection,
    mesh_depth: u8,
    schema_version: i64,
    indexer: Arc<dyn SpatialIndexer>,
}

/// A path as SQL text. SQLite only takes UTF-8 file names.
pub(crate) fn path_param(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| Error::NonUtf8Path(path.to_path_buf()))
}

/// `LIMIT` value for an optional row limit; `-1` is unbounded in SQLite.
fn limit_param(limit: Option<usize>) -> i64 {
    limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX))
}

impl CatalogStore {
    /// Open or create a catalog database at `path`, migrating older schemas.
    pub fn open(path: &Path, config: &DbConfig, indexer: Arc<dyn SpatialIndexer>) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn, Some(path), config, indexer)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory(config: &DbConfig, indexer: Arc<dyn SpatialIndexer>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, None, config, indexer)
    }

    fn init(
        mut conn: Connection,
        path: Option<&Path>,
        config: &DbConfig,
        indexer: Arc<dyn SpatialIndexer>,
    ) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let meta = match schema::read_meta(&conn)? {
            None => schema::initialize(&mut conn, config.mesh_depth.min(mesh::MAX_DEPTH))?,
            Some(meta) => {
                let migratable = (schema::OLDEST_MIGRATABLE_VERSION..schema::CURRENT_SCHEMA_VERSION)
                    .contains(&meta.version);
                if let Some(path) = path.filter(|_| migratable && config.backup_before_migration) {
                    schema::backup(&conn, path, meta.version)?;
                }
                schema::migrate(&mut conn, &meta)?
            }
        };
        // The journal mode lives in the file header, so it may only change
        // once the schema is known to be usable and any backup is taken.
        if path.is_some() && config.wal {
            conn.pragma_update(None, "journal_mode", "WAL")?;
        }

        let mut store = Self {
            conn,
            mesh_depth: meta.mesh_depth,
            schema_version: meta.version,
            indexer,
        };
        store
            .ensure_initialized(meta.needs_init)
            .map_err(|e| Error::Init(e.to_string()))?;
        Ok(store)
    }

    /// Make sure the user catalog and the master table exist.
    fn ensure_initialized(&mut self, needs_init: bool) -> Result<()> {
        let has_user = self.catalog_exists(USER_CATALOG_ID)?;
        if !has_user {
            self.create_catalog(&Catalog::user())?;
        }
        if needs_init || !has_user || !schema::master_exists(&self.conn)? {
            master::compile(&mut self.conn)?;
        }
        if needs_init {
            schema::clear_init_flag(&self.conn)?;
            info!(mesh_depth = self.mesh_depth, "created user catalog and master table");
        }
        Ok(())
    }

    pub fn mesh_depth(&self) -> u8 {
        self.mesh_depth
    }

    pub fn schema_version(&self) -> i64 {
        self.schema_version
    }

    /// Rebuild the master table from the enabled catalogs.
    pub fn compile_master(&mut self) -> Result<()> {
        master::compile(&mut self.conn)
    }

    // ── Catalogs ─────────────────────────────────────────────────────

    pub fn register_catalog(&mut self, catalog: &Catalog) -> Result<()> {
        if catalog.id < 0 {
            return Err(Error::InvalidCatalogId(catalog.id));
        }
        if self.catalog_exists(catalog.id)? {
            return Err(Error::CatalogExists(catalog.id));
        }
        self.create_catalog(catalog)?;
        self.compile_master()?;
        info!(catalog = catalog.id, name = %catalog.name, "registered catalog");
        Ok(())
    }

    /// Insert the registry row and create the object table in one transaction.
    fn create_catalog(&mut self, catalog: &Catalog) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            &sql::insert_into_registry(sql::REGISTRY),
            params![
                catalog.id,
                catalog.name,
                catalog.precedence,
                catalog.author,
                catalog.source,
                catalog.description,
                catalog.mutable,
                catalog.enabled,
                catalog.version,
                catalog.color,
                catalog.license,
                catalog.maintainer,
                catalog.timestamp,
            ],
        )?;
        tx.execute_batch(&sql::create_catalog_table(&sql::catalog_table(catalog.id)))?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_catalog(&self, id: i64) -> Result<Option<Catalog>> {
        let mut stmt = self.conn.prepare_cached(&sql::get_catalog_by_id())?;
        let catalog = stmt.query_row(params![id], row_to_catalog).optional()?;
        Ok(catalog)
    }

    pub fn catalog_exists(&self, id: i64) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT 1 FROM catalogs WHERE id = ?1")?;
        Ok(stmt.exists(params![id])?)
    }

    /// All registered catalogs ordered by id.
    pub fn catalogs(&self, include_disabled: bool) -> Result<Vec<Catalog>> {
        let filter = if include_disabled { "" } else { " WHERE enabled = 1" };
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM catalogs{filter} ORDER BY id ASC",
            sql::registry_fields()
        ))?;
        let catalogs = stmt
            .query_map([], row_to_catalog)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(catalogs)
    }

    /// Update the descriptive fields of a registered catalog. Precedence,
    /// mutability, enablement and version are left untouched.
    pub fn update_catalog_meta(&self, catalog: &Catalog) -> Result<()> {
        let updated = self.conn.execute(
            &sql::update_catalog_meta(),
            params![
                catalog.name,
                catalog.author,
                catalog.source,
                catalog.description,
                catalog.color,
                catalog.license,
                catalog.maintainer,
                catalog.timestamp,
                catalog.id,
            ],
        )?;
        if updated == 0 {
            return Err(Error::CatalogNotFound(catalog.id));
        }
        debug!(catalog = catalog.id, "updated catalog metadata");
        Ok(())
    }

    pub fn set_catalog_enabled(&mut self, id: i64, enabled: bool) -> Result<()> {
        let current = self
            .get_catalog(id)?
            .ok_or(Error::CatalogNotFound(id))?
            .enabled;
        if current == enabled {
            return Ok(());
        }
        self.conn.execute(sql::SET_ENABLED, params![enabled, id])?;
        self.compile_master()?;
        info!(catalog = id, enabled, "changed catalog state");
        Ok(())
    }

    /// Remove a catalog together with its objects. The user catalog can only
    /// be emptied, never removed.
    pub fn remove_catalog(&mut self, id: i64) -> Result<()> {
        if id == USER_CATALOG_ID {
            return Err(Error::UserCatalogProtected);
        }
        self.set_catalog_enabled(id, false)?;

        let tx = self.conn.transaction()?;
        tx.execute(sql::REMOVE_CATALOG, params![id])?;
        tx.execute_batch(&sql::drop_table(&sql::catalog_table(id)))?;
        tx.execute("DELETE FROM catalog_colors WHERE catalog = ?1", params![id])?;
        tx.commit()?;

        info!(catalog = id, "removed catalog");
        Ok(())
    }

    /// The first unused id in the custom-catalog range.
    pub fn find_suitable_catalog_id(&self) -> Result<i64> {
        let mut stmt = self.conn.prepare_cached(sql::GET_ALL_IDS)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut candidate = CUSTOM_CATALOG_MIN_ID;
        for id in ids.into_iter().filter(|id| *id >= CUSTOM_CATALOG_MIN_ID) {
            if id == candidate {
                candidate += 1;
            } else if id > candidate {
                break;
            }
        }
        Ok(candidate)
    }

    /// Fail unless catalog `id` exists and is mutable.
    fn check_writable(&self, id: i64) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT mut FROM catalogs WHERE id = ?1")?;
        let mutable: Option<bool> = stmt.query_row(params![id], |row| row.get(0)).optional()?;
        match mutable {
            None => Err(Error::CatalogNotFound(id)),
            Some(false) => Err(Error::CatalogImmutable(id)),
            Some(true) => Ok(()),
        }
    }

    // ── Objects ──────────────────────────────────────────────────────

    /// Insert an object, or update it if the same content is already stored
    /// in this catalog.
    pub fn insert_object(&mut self, catalog_id: i64, object: &NewObject) -> Result<ObjectId> {
        self.check_writable(catalog_id)?;
        object.validate()?;
        let row = prepare_row(self.indexer.as_ref(), self.mesh_depth, catalog_id, object);
        {
            let mut stmt = self
                .conn
                .prepare_cached(&sql::insert_object(&sql::catalog_table(catalog_id)))?;
            write_row(&mut stmt, &row)?;
        }
        self.compile_master()?;
        debug!(catalog = catalog_id, object = %row.object_id, "inserted object");
        Ok(row.object_id)
    }

    /// Insert many objects in a single transaction. Ids and trixels are
    /// computed in parallel before touching the database.
    pub fn insert_objects(&mut self, catalog_id: i64, objects: &[NewObject]) -> Result<Vec<ObjectId>> {
        self.check_writable(catalog_id)?;
        objects.iter().try_for_each(NewObject::validate)?;

        let indexer = self.indexer.as_ref();
        let depth = self.mesh_depth;
        let rows: Vec<CatalogObject> = objects
            .par_iter()
            .map(|object| prepare_row(indexer, depth, catalog_id, object))
            .collect();

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&sql::insert_object(&sql::catalog_table(catalog_id)))?;
            for row in &rows {
                write_row(&mut stmt, row)?;
            }
        }
        tx.commit()?;

        self.compile_master()?;
        info!(catalog = catalog_id, count = rows.len(), "inserted objects");
        Ok(rows.into_iter().map(|row| row.object_id).collect())
    }

    pub fn remove_object(&mut self, catalog_id: i64, object_id: &ObjectId) -> Result<()> {
        self.check_writable(catalog_id)?;
        let removed = self.conn.execute(
            &sql::remove_object(catalog_id),
            params![object_id.as_bytes().as_slice()],
        )?;
        if removed == 0 {
            return Err(Error::ObjectNotFound(*object_id));
        }
        self.compile_master()?;
        debug!(catalog = catalog_id, object = %object_id, "removed object");
        Ok(())
    }

    /// Copy every object of `src` into the mutable catalog `dst`.
    pub fn copy_objects(&mut self, src: i64, dst: i64) -> Result<usize> {
        if !self.catalog_exists(src)? {
            return Err(Error::CatalogNotFound(src));
        }
        self.check_writable(dst)?;

        let tx = self.conn.transaction()?;
        let copied = tx.execute(&sql::copy_objects(src, dst), [])?;
        tx.commit()?;

        self.compile_master()?;
        info!(src, dst, copied, "copied objects");
        Ok(copied)
    }

    // ── Queries ──────────────────────────────────────────────────────

    fn query_objects<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<CatalogObject>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let objects = stmt
            .query_map(params, row_to_object)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(objects)
    }

    /// Look up the winning copy of an object in the master table.
    pub fn get_object(&self, object_id: &ObjectId) -> Result<Option<CatalogObject>> {
        let mut stmt = self.conn.prepare_cached(&sql::dso_by_oid(sql::MASTER))?;
        let object = stmt
            .query_row(params![object_id.as_bytes().as_slice()], row_to_object)
            .optional()?;
        Ok(object)
    }

    pub fn get_object_in_catalog(&self, object_id: &ObjectId, catalog_id: i64) -> Result<Option<CatalogObject>> {
        if !self.catalog_exists(catalog_id)? {
            return Ok(None);
        }
        let mut stmt = self
            .conn
            .prepare_cached(&sql::dso_by_oid(&sql::catalog_table(catalog_id)))?;
        let object = stmt
            .query_row(params![object_id.as_bytes().as_slice()], row_to_object)
            .optional()?;
        Ok(object)
    }

    /// Case-insensitive name search over the master table. Exact matches on
    /// `name` come first; with `exact_only` nothing else is returned.
    pub fn find_objects_by_name(
        &self,
        name: &str,
        limit: Option<usize>,
        exact_only: bool,
    ) -> Result<Vec<CatalogObject>> {
        let limit_value = limit_param(limit);
        let exact = self.query_objects(&sql::dso_by_name_exact(), params![name, limit_value])?;
        if exact_only || (limit == Some(1) && !exact.is_empty()) {
            return Ok(exact);
        }

        let fuzzy = self.query_objects(&sql::dso_by_name(), params![name, limit_value])?;
        let mut seen: HashSet<ObjectId> = exact.iter().map(|o| o.object_id).collect();
        let mut results = exact;
        results.extend(fuzzy.into_iter().filter(|o| seen.insert(o.object_id)));
        if let Some(limit) = limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    /// Substring search over name, long name and catalog identifier of a
    /// single catalog.
    pub fn find_objects_by_name_in_catalog(
        &self,
        catalog_id: i64,
        name: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CatalogObject>> {
        if !self.catalog_exists(catalog_id)? {
            return Ok(Vec::new());
        }
        self.query_objects(
            &sql::dso_by_name_in_catalog(catalog_id),
            params![name, limit_param(limit)],
        )
    }

    /// SQL `LIKE` match on the object name (`%` and `_` wildcards).
    pub fn find_objects_by_wildcard(&self, pattern: &str, limit: Option<usize>) -> Result<Vec<CatalogObject>> {
        self.query_objects(&sql::dso_by_wildcard(), params![pattern, limit_param(limit)])
    }

    /// All master objects in a trixel, faintest first.
    pub fn objects_in_trixel(&self, trixel: i64) -> Result<Vec<CatalogObject>> {
        self.query_objects(&sql::dso_by_trixel(), params![trixel])
    }

    /// The objects of a trixel that have a known magnitude, faintest first.
    pub fn objects_in_trixel_known_magnitude(&self, trixel: i64) -> Result<Vec<CatalogObject>> {
        self.query_objects(&sql::dso_by_trixel_known_magnitude(), params![trixel])
    }

    pub fn objects_in_trixel_unknown_magnitude(&self, trixel: i64) -> Result<Vec<CatalogObject>> {
        self.query_objects(&sql::dso_by_trixel_unknown_magnitude(), params![trixel])
    }

    fn by_magnitude(
        &self,
        table: &str,
        object_type: Option<ObjectType>,
        maglim: Option<f64>,
        limit: Option<usize>,
    ) -> Result<Vec<CatalogObject>> {
        let sql = sql::dso_by_magnitude(table, object_type.is_some(), maglim.is_some());
        self.query_objects(
            &sql,
            params![
                object_type.map_or(0, ObjectType::code),
                maglim.unwrap_or(0.0),
                limit_param(limit)
            ],
        )
    }

    pub fn objects_by_magnitude(&self, maglim: Option<f64>, limit: Option<usize>) -> Result<Vec<CatalogObject>> {
        self.by_magnitude(sql::MASTER, None, maglim, limit)
    }

    pub fn objects_by_type(
        &self,
        object_type: ObjectType,
        maglim: Option<f64>,
        limit: Option<usize>,
    ) -> Result<Vec<CatalogObject>> {
        self.by_magnitude(sql::MASTER, Some(object_type), maglim, limit)
    }

    pub fn objects_in_catalog(
        &self,
        catalog_id: i64,
        object_type: Option<ObjectType>,
        maglim: Option<f64>,
        limit: Option<usize>,
    ) -> Result<Vec<CatalogObject>> {
        if !self.catalog_exists(catalog_id)? {
            return Ok(Vec::new());
        }
        self.by_magnitude(&sql::catalog_table(catalog_id), object_type, maglim, limit)
    }

    pub fn general_query(
        &self,
        filter: &Filter,
        order: &[OrderBy],
        limit: Option<usize>,
    ) -> Result<Vec<CatalogObject>> {
        let (sql, mut values) = filter::general_query(filter, order);
        values.push(Value::Integer(limit_param(limit)));

        let mut stmt = self.conn.prepare(&sql)?;
        let objects = stmt
            .query_map(params_from_iter(values.iter()), row_to_object)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(objects)
    }

    pub fn catalog_statistics(&self, scope: StatsScope) -> Result<CatalogStatistics> {
        let table = match scope {
            StatsScope::Master => sql::MASTER.to_string(),
            StatsScope::Catalog(id) => {
                if !self.catalog_exists(id)? {
                    return Err(Error::CatalogNotFound(id));
                }
                sql::catalog_table(id)
            }
        };

        let mut stmt = self.conn.prepare(&sql::count_by_type(&table))?;
        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stats = CatalogStatistics::default();
        for (code, count) in counts {
            let count = count as usize;
            *stats
                .object_counts
                .entry(ObjectType::from_code(code))
                .or_default() += count;
            stats.total_count += count;
        }
        Ok(stats)
    }

    // ── Colors ───────────────────────────────────────────────────────

    pub fn catalog_colors(&self) -> Result<ColorMap> {
        colors::load_all(&self.conn)
    }

    pub fn catalog_colors_for(&self, id: i64) -> Result<CatalogColorMap> {
        let catalog = self.get_catalog(id)?.ok_or(Error::CatalogNotFound(id))?;
        colors::load_for(&self.conn, id, &catalog.color)
    }

    pub fn insert_catalog_colors(&mut self, id: i64, colors: &CatalogColorMap) -> Result<()> {
        if !self.catalog_exists(id)? {
            return Err(Error::CatalogNotFound(id));
        }
        colors::store(&mut self.conn, id, colors)
    }

    // ── Dump files ───────────────────────────────────────────────────

    pub fn dump_catalog(&mut self, id: i64, path: &Path) -> Result<()> {
        portability::dump_catalog(&mut self.conn, id, path)
    }

    /// Import a dump file; trixels are recomputed at this database's mesh depth.
    pub fn import_catalog(&mut self, path: &Path, overwrite: bool) -> Result<Catalog> {
        let indexer = Arc::clone(&self.indexer);
        let depth = self.mesh_depth;
        portability::import_catalog(&mut self.conn, path, overwrite, &|ra, dec| {
            indexer.trixel_of(ra, dec, depth)
        })
    }
}

/// Normalize an object and derive its id, trixel and owner.
fn prepare_row(indexer: &dyn SpatialIndexer, depth: u8, catalog_id: i64, object: &NewObject) -> CatalogObject {
    let object = object.normalized();
    CatalogObject {
        object_id: hasher::object_id(&object),
        trixel: indexer.trixel_of(object.ra, object.dec, depth),
        catalog_id,
        object_type: object.object_type,
        ra: object.ra,
        dec: object.dec,
        magnitude: object.magnitude,
        name: object.name,
        long_name: object.long_name,
        catalog_identifier: object.catalog_identifier,
        major_axis: object.major_axis,
        minor_axis: object.minor_axis,
        position_angle: object.position_angle,
        flux: object.flux,
    }
}

fn write_row(stmt: &mut rusqlite::CachedStatement<'_>, row: &CatalogObject) -> rusqlite::Result<usize> {
    stmt.execute(params![
        row.object_id.as_bytes().as_slice(),
        row.object_type.code(),
        row.ra,
        row.dec,
        row.magnitude,
        row.name,
        row.long_name,
        row.catalog_identifier,
        row.major_axis,
        row.minor_axis,
        row.position_angle,
        row.flux,
        row.trixel,
        row.catalog_id,
    ])
}

/// Read a row selected with [`sql::OBJECT_COLUMNS`].
pub(crate) fn row_to_object(row: &Row<'_>) -> rusqlite::Result<CatalogObject> {
    let oid: Vec<u8> = row.get(0)?;
    let object_id = ObjectId::from_slice(&oid).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            Type::Blob,
            format!("object id must be 32 bytes, got {}", oid.len()).into(),
        )
    })?;

    Ok(CatalogObject {
        object_id,
        object_type: ObjectType::from_code(row.get(1)?),
        ra: row.get(2)?,
        dec: row.get(3)?,
        magnitude: row.get(4)?,
        name: row.get(5)?,
        long_name: row.get(6)?,
        catalog_identifier: row.get(7)?,
        major_axis: row.get(8)?,
        minor_axis: row.get(9)?,
        position_angle: row.get(10)?,
        flux: row.get(11)?,
        trixel: row.get::<_, Option<i64>>(12)?.unwrap_or(-1),
        catalog_id: row.get(13)?,
    })
}

/// Read a row selected with [`sql::REGISTRY_COLUMNS`].
pub(crate) fn row_to_catalog(row: &Row<'_>) -> rusqlite::Result<Catalog> {
    let text = |idx: usize| -> rusqlite::Result<String> {
        Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
    };
    Ok(Catalog {
        id: row.get(0)?,
        name: text(1)?,
        precedence: row.get(2)?,
        author: text(3)?,
        source: text(4)?,
        description: text(5)?,
        mutable: row.get::<_, Option<bool>>(6)?.unwrap_or(false),
        enabled: row.get::<_, Option<bool>>(7)?.unwrap_or(true),
        version: row.get::<_, Option<i64>>(8)?.unwrap_or(-1),
        color: text(9)?,
        license: text(10)?,
        maintainer: text(11)?,
        timestamp: row.get(12)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::HtMesh;

    fn make_store() -> CatalogStore {
        CatalogStore::open_in_memory(&DbConfig::default(), Arc::new(HtMesh)).unwrap()
    }

    fn make_store_with_catalog(id: i64, precedence: f64) -> CatalogStore {
        let mut store = make_store();
        store
            .register_catalog(&Catalog::new(id, format!("cat{id}")).with_precedence(precedence).mutable(true))
            .unwrap();
        store
    }

    fn galaxy(name: &str, magnitude: f64) -> NewObject {
        NewObject::new(ObjectType::Galaxy, 10.0, 20.0, name).with_magnitude(magnitude)
    }

    fn names(objects: &[CatalogObject]) -> Vec<&str> {
        objects.iter().map(|o| o.name.as_str()).collect()
    }

    // ── Catalog tests ────────────────────────────────────────────

    #[test]
    fn test_open_creates_user_catalog() {
        let store = make_store();
        let user = store.get_catalog(USER_CATALOG_ID).unwrap().unwrap();
        assert_eq!(user.name, USER_CATALOG_NAME);
        assert!(user.mutable);
        assert!(user.enabled);
        assert_eq!(store.mesh_depth(), 3);
        assert_eq!(store.schema_version(), schema::CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_register_and_get_catalog() {
        let mut store = make_store();
        let mut catalog = Catalog::new(1000, "Messier").with_precedence(2.0);
        catalog.author = "Charles".into();
        catalog.timestamp = Some(chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        store.register_catalog(&catalog).unwrap();

        assert_eq!(store.get_catalog(1000).unwrap(), Some(catalog));
        assert!(store.catalog_exists(1000).unwrap());
        assert_eq!(store.get_catalog(1001).unwrap(), None);
    }

    #[test]
    fn test_register_duplicate_rejected() {
        let mut store = make_store_with_catalog(1000, 1.0);
        let result = store.register_catalog(&Catalog::new(1000, "again"));
        assert!(matches!(result, Err(Error::CatalogExists(1000))));
        assert!(matches!(
            store.register_catalog(&Catalog::new(USER_CATALOG_ID, "user")),
            Err(Error::CatalogExists(0))
        ));
    }

    #[test]
    fn test_register_negative_id_rejected() {
        let mut store = make_store();
        let result = store.register_catalog(&Catalog::new(-1, "bad"));
        assert!(matches!(result, Err(Error::InvalidCatalogId(-1))));
    }

    #[test]
    fn test_catalogs_ordered_and_filtered() {
        let mut store = make_store();
        store.register_catalog(&Catalog::new(2000, "b")).unwrap();
        store.register_catalog(&Catalog::new(1000, "a").enabled(false)).unwrap();

        let all: Vec<i64> = store.catalogs(true).unwrap().iter().map(|c| c.id).collect();
        assert_eq!(all, vec![0, 1000, 2000]);
        let enabled: Vec<i64> = store.catalogs(false).unwrap().iter().map(|c| c.id).collect();
        assert_eq!(enabled, vec![0, 2000]);
    }

    #[test]
    fn test_update_catalog_meta_only_touches_meta() {
        let mut store = make_store_with_catalog(1000, 1.0);
        let mut changed = Catalog::new(1000, "renamed").with_precedence(50.0).mutable(false);
        changed.color = "#ff0000".into();
        store.update_catalog_meta(&changed).unwrap();

        let stored = store.get_catalog(1000).unwrap().unwrap();
        assert_eq!(stored.name, "renamed");
        assert_eq!(stored.color, "#ff0000");
        assert_eq!(stored.precedence, 1.0);
        assert!(stored.mutable);

        let missing = store.update_catalog_meta(&Catalog::new(4242, "x"));
        assert!(matches!(missing, Err(Error::CatalogNotFound(4242))));
    }

    #[test]
    fn test_set_catalog_enabled_updates_master() {
        let mut store = make_store_with_catalog(1000, 1.0);
        let id = store.insert_object(1000, &galaxy("M31", 3.4)).unwrap();
        assert!(store.get_object(&id).unwrap().is_some());

        store.set_catalog_enabled(1000, false).unwrap();
        assert!(store.get_object(&id).unwrap().is_none());
        store.set_catalog_enabled(1000, false).unwrap();

        store.set_catalog_enabled(1000, true).unwrap();
        assert!(store.get_object(&id).unwrap().is_some());

        assert!(matches!(store.set_catalog_enabled(7, true), Err(Error::CatalogNotFound(7))));
    }

    #[test]
    fn test_remove_catalog() {
        let mut store = make_store_with_catalog(1000, 1.0);
        let id = store.insert_object(1000, &galaxy("M31", 3.4)).unwrap();

        store.remove_catalog(1000).unwrap();
        assert!(!store.catalog_exists(1000).unwrap());
        assert!(store.get_object(&id).unwrap().is_none());
        assert!(matches!(store.remove_catalog(1000), Err(Error::CatalogNotFound(1000))));
    }

    #[test]
    fn test_remove_user_catalog_protected() {
        let mut store = make_store();
        assert!(matches!(store.remove_catalog(USER_CATALOG_ID), Err(Error::UserCatalogProtected)));
        assert!(store.catalog_exists(USER_CATALOG_ID).unwrap());
    }

    #[test]
    fn test_find_suitable_catalog_id() {
        let mut store = make_store();
        assert_eq!(store.find_suitable_catalog_id().unwrap(), 1000);
        store.register_catalog(&Catalog::new(1000, "a")).unwrap();
        store.register_catalog(&Catalog::new(1001, "b")).unwrap();
        store.register_catalog(&Catalog::new(1003, "c")).unwrap();
        store.register_catalog(&Catalog::new(5, "low")).unwrap();
        assert_eq!(store.find_suitable_catalog_id().unwrap(), 1002);
    }

    // ── Object tests ─────────────────────────────────────────────

    #[test]
    fn test_insert_object_derives_fields() {
        let mut store = make_store();
        let object = galaxy("M31", 3.4).with_long_name("Andromeda");
        let id = store.insert_object(USER_CATALOG_ID, &object).unwrap();

        assert_eq!(id, hasher::object_id(&object));
        let stored = store.get_object(&id).unwrap().unwrap();
        assert_eq!(stored.catalog_id, USER_CATALOG_ID);
        assert_eq!(stored.trixel, HtMesh.trixel_of(10.0, 20.0, 3));
        assert_eq!(stored.long_name.as_deref(), Some("Andromeda"));
        assert_eq!(stored.to_new_object(), object);
    }

    #[test]
    fn test_insert_normalizes_sentinels() {
        let mut store = make_store();
        let object = NewObject {
            magnitude: Some(99.0),
            catalog_identifier: Some(String::new()),
            ..NewObject::new(ObjectType::Star, 1.0, 2.0, "faint")
        };
        let id = store.insert_object(USER_CATALOG_ID, &object).unwrap();
        let stored = store.get_object(&id).unwrap().unwrap();
        assert_eq!(stored.magnitude, None);
        assert_eq!(stored.catalog_identifier, None);
    }

    #[test]
    fn test_insert_same_content_is_update() {
        let mut store = make_store();
        let a = store.insert_object(USER_CATALOG_ID, &galaxy("M31", 3.4)).unwrap();
        let b = store.insert_object(USER_CATALOG_ID, &galaxy("M31", 3.4)).unwrap();
        assert_eq!(a, b);
        let stats = store.catalog_statistics(StatsScope::Catalog(USER_CATALOG_ID)).unwrap();
        assert_eq!(stats.total_count, 1);
    }

    #[test]
    fn test_insert_into_immutable_or_unknown_rejected() {
        let mut store = make_store();
        store.register_catalog(&Catalog::new(1000, "ro")).unwrap();
        assert!(matches!(
            store.insert_object(1000, &galaxy("M31", 3.4)),
            Err(Error::CatalogImmutable(1000))
        ));
        assert!(matches!(
            store.insert_objects(1000, &[galaxy("M31", 3.4)]),
            Err(Error::CatalogImmutable(1000))
        ));
        assert!(matches!(
            store.insert_object(9, &galaxy("M31", 3.4)),
            Err(Error::CatalogNotFound(9))
        ));
    }

    #[test]
    fn test_insert_objects_bulk() {
        let mut store = make_store_with_catalog(1000, 1.0);
        let objects: Vec<NewObject> = (0..50)
            .map(|i| NewObject::new(ObjectType::Star, i as f64 * 7.0, i as f64 - 25.0, format!("S{i}")))
            .collect();
        let ids = store.insert_objects(1000, &objects).unwrap();

        assert_eq!(ids.len(), 50);
        for (object, id) in objects.iter().zip(&ids) {
            assert_eq!(*id, hasher::object_id(object));
        }
        let stats = store.catalog_statistics(StatsScope::Master).unwrap();
        assert_eq!(stats.total_count, 50);
        assert_eq!(stats.object_counts.get(&ObjectType::Star), Some(&50));
    }

    #[test]
    fn test_insert_objects_is_all_or_nothing() {
        let mut store = make_store_with_catalog(1000, 1.0);
        store.insert_object(USER_CATALOG_ID, &galaxy("kept", 1.0)).unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TRIGGER reject_bad BEFORE INSERT ON cat_1000 WHEN NEW.name = 'bad' \
                 BEGIN SELECT RAISE(ABORT, 'rejected row'); END;",
            )
            .unwrap();

        let batch = [galaxy("first", 2.0), galaxy("bad", 3.0), galaxy("last", 4.0)];
        let err = store.insert_objects(1000, &batch).unwrap_err();
        assert!(matches!(err, Error::Database(_)));

        let stats = store.catalog_statistics(StatsScope::Catalog(1000)).unwrap();
        assert_eq!(stats.total_count, 0);
        let master = store.objects_by_magnitude(None, None).unwrap();
        assert_eq!(names(&master), vec!["kept"]);
    }

    #[test]
    fn test_insert_rejects_non_finite_position() {
        let mut store = make_store_with_catalog(1000, 1.0);
        let mut no_ra = galaxy("no-ra", 2.0);
        no_ra.ra = f64::NAN;
        assert!(matches!(
            store.insert_object(1000, &no_ra),
            Err(Error::InvalidObject(_))
        ));

        let mut no_dec = galaxy("no-dec", 2.0);
        no_dec.dec = f64::INFINITY;
        assert!(matches!(
            store.insert_objects(1000, &[galaxy("fine", 1.0), no_dec]),
            Err(Error::InvalidObject(_))
        ));
        assert_eq!(
            store.catalog_statistics(StatsScope::Catalog(1000)).unwrap().total_count,
            0
        );
    }

    #[test]
    fn test_remove_object() {
        let mut store = make_store();
        let id = store.insert_object(USER_CATALOG_ID, &galaxy("M31", 3.4)).unwrap();
        store.remove_object(USER_CATALOG_ID, &id).unwrap();
        assert!(store.get_object(&id).unwrap().is_none());
        assert!(matches!(
            store.remove_object(USER_CATALOG_ID, &id),
            Err(Error::ObjectNotFound(_))
        ));
    }

    #[test]
    fn test_copy_objects_reowns_rows() {
        let mut store = make_store();
        store.register_catalog(&Catalog::new(1000, "src")).unwrap();
        store.register_catalog(&Catalog::new(1001, "dst").mutable(true)).unwrap();
        // immutable source catalogs are filled by import or bulk load before locking
        store.conn.execute("UPDATE catalogs SET mut = 1 WHERE id = 1000", []).unwrap();
        let id = store.insert_object(1000, &galaxy("M31", 3.4)).unwrap();
        store.conn.execute("UPDATE catalogs SET mut = 0 WHERE id = 1000", []).unwrap();

        assert_eq!(store.copy_objects(1000, 1001).unwrap(), 1);
        let copy = store.get_object_in_catalog(&id, 1001).unwrap().unwrap();
        assert_eq!(copy.catalog_id, 1001);

        assert!(matches!(store.copy_objects(1001, 1000), Err(Error::CatalogImmutable(1000))));
        assert!(matches!(store.copy_objects(77, 1001), Err(Error::CatalogNotFound(77))));
    }

    // ── Query tests ──────────────────────────────────────────────

    #[test]
    fn test_find_objects_by_name() {
        let mut store = make_store();
        store
            .insert_objects(
                USER_CATALOG_ID,
                &[
                    galaxy("M 31", 3.4).with_long_name("Andromeda Galaxy"),
                    galaxy("M 3", 6.2),
                    galaxy("NGC 224", 3.5),
                    galaxy("M 33", 5.7).with_long_name("Triangulum Galaxy"),
                ],
            )
            .unwrap();

        let exact = store.find_objects_by_name("m 3", Some(1), false).unwrap();
        assert_eq!(names(&exact), vec!["M 3"]);

        let all = store.find_objects_by_name("m 3", None, false).unwrap();
        assert_eq!(names(&all), vec!["M 3", "M 31", "M 33"]);

        let by_long_name = store.find_objects_by_name("galaxy", None, false).unwrap();
        assert_eq!(names(&by_long_name), vec!["M 31", "M 33"]);

        assert!(store.find_objects_by_name("galaxy", None, true).unwrap().is_empty());
        assert_eq!(store.find_objects_by_name("m 3", Some(2), false).unwrap().len(), 2);
    }

    #[test]
    fn test_find_objects_by_name_in_catalog() {
        let mut store = make_store();
        store
            .insert_objects(
                USER_CATALOG_ID,
                &[
                    galaxy("M 31", 3.4).with_catalog_identifier("UGC 454"),
                    galaxy("M 33", 5.7),
                ],
            )
            .unwrap();
        let found = store
            .find_objects_by_name_in_catalog(USER_CATALOG_ID, "ugc", None)
            .unwrap();
        assert_eq!(names(&found), vec!["M 31"]);
        assert!(store.find_objects_by_name_in_catalog(1234, "m", None).unwrap().is_empty());
    }

    #[test]
    fn test_find_objects_by_wildcard() {
        let mut store = make_store();
        store
            .insert_objects(
                USER_CATALOG_ID,
                &[galaxy("100", 1.0), galaxy("9", 2.0), galaxy("10", 3.0), galaxy("abc", 4.0)],
            )
            .unwrap();
        let found = store.find_objects_by_wildcard("%0%", None).unwrap();
        assert_eq!(names(&found), vec!["10", "100"]);
        let digits = store.find_objects_by_wildcard("_", None).unwrap();
        assert_eq!(names(&digits), vec!["9"]);
    }

    #[test]
    fn test_objects_in_trixel_faintest_first() {
        let mut store = make_store();
        let mut unknown = galaxy("unknown", 0.0);
        unknown.magnitude = None;
        store
            .insert_objects(
                USER_CATALOG_ID,
                &[galaxy("bright", 1.0), unknown, galaxy("faint", 9.0), galaxy("mid", 5.0)],
            )
            .unwrap();
        let trixel = HtMesh.trixel_of(10.0, 20.0, 3);
        let found = store.objects_in_trixel(trixel).unwrap();
        assert_eq!(names(&found), vec!["faint", "mid", "bright", "unknown"]);
        assert!(store.objects_in_trixel(trixel + 1).unwrap().is_empty());

        let known = store.objects_in_trixel_known_magnitude(trixel).unwrap();
        assert_eq!(names(&known), vec!["faint", "mid", "bright"]);
        let unknown = store.objects_in_trixel_unknown_magnitude(trixel).unwrap();
        assert_eq!(names(&unknown), vec!["unknown"]);
    }

    #[test]
    fn test_objects_by_magnitude_and_type() {
        let mut store = make_store();
        let mut nameless = NewObject::new(ObjectType::Star, 5.0, 5.0, "nomag");
        nameless.magnitude = None;
        store
            .insert_objects(
                USER_CATALOG_ID,
                &[
                    galaxy("g1", 8.0),
                    NewObject::new(ObjectType::Star, 1.0, 1.0, "s1").with_magnitude(2.0),
                    galaxy("g2", 4.0),
                    nameless,
                ],
            )
            .unwrap();

        let all = store.objects_by_magnitude(None, None).unwrap();
        assert_eq!(names(&all), vec!["s1", "g2", "g1", "nomag"]);

        let bright = store.objects_by_magnitude(Some(5.0), None).unwrap();
        assert_eq!(names(&bright), vec!["s1", "g2"]);

        let galaxies = store.objects_by_type(ObjectType::Galaxy, None, Some(1)).unwrap();
        assert_eq!(names(&galaxies), vec!["g2"]);

        let scoped = store
            .objects_in_catalog(USER_CATALOG_ID, Some(ObjectType::Star), None, None)
            .unwrap();
        assert_eq!(names(&scoped), vec!["s1", "nomag"]);
        assert!(store.objects_in_catalog(555, None, None, None).unwrap().is_empty());
    }

    #[test]
    fn test_general_query() {
        let mut store = make_store();
        store
            .insert_objects(
                USER_CATALOG_ID,
                &[galaxy("NGC 1", 12.0), galaxy("NGC 2", 8.0), galaxy("IC 1", 7.0)],
            )
            .unwrap();

        let filter = Filter::Like(filter::Column::Name, "NGC%".into())
            .and(Filter::lt(filter::Column::Magnitude, 13.0));
        let found = store
            .general_query(&filter, &[OrderBy::desc(filter::Column::Magnitude)], None)
            .unwrap();
        assert_eq!(names(&found), vec!["NGC 1", "NGC 2"]);

        let limited = store.general_query(&Filter::All, &[], Some(2)).unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_statistics() {
        let mut store = make_store_with_catalog(1000, 1.0);
        store.insert_object(1000, &galaxy("g", 1.0)).unwrap();
        store
            .insert_object(1000, &NewObject::new(ObjectType::Star, 0.0, 0.0, "s"))
            .unwrap();
        store.insert_object(USER_CATALOG_ID, &galaxy("g", 1.0)).unwrap();

        let cat = store.catalog_statistics(StatsScope::Catalog(1000)).unwrap();
        assert_eq!(cat.total_count, 2);
        assert_eq!(cat.object_counts.get(&ObjectType::Galaxy), Some(&1));

        // the galaxy is present in both catalogs but counted once in master
        let master = store.catalog_statistics(StatsScope::Master).unwrap();
        assert_eq!(master.total_count, 2);

        assert!(matches!(
            store.catalog_statistics(StatsScope::Catalog(31)),
            Err(Error::CatalogNotFound(31))
        ));
    }

    #[test]
    fn test_catalog_colors() {
        let mut store = make_store();
        let mut catalog = Catalog::new(1000, "colored");
        catalog.color = "#008000;night;#ff0000".into();
        store.register_catalog(&catalog).unwrap();

        let overrides: CatalogColorMap = [("night".to_string(), "#aa0000".to_string())].into();
        store.insert_catalog_colors(1000, &overrides).unwrap();

        let colors = store.catalog_colors_for(1000).unwrap();
        assert_eq!(colors.get("default").map(String::as_str), Some("#008000"));
        assert_eq!(colors.get("night").map(String::as_str), Some("#aa0000"));

        let all = store.catalog_colors().unwrap();
        assert_eq!(all.get(&1000), Some(&colors));
        assert!(all.get(&USER_CATALOG_ID).unwrap().is_empty());

        assert!(matches!(
            store.insert_catalog_colors(9, &overrides),
            Err(Error::CatalogNotFound(9))
        ));
    }

    // ── Schema structure pinning ────────────────────────────────

    #[test]
    fn test_store_tables_exist() {
        let store = make_store();
        let mut stmt = store
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(tables, vec!["cat_0", "catalog_colors", "catalogs", "master", "meta"]);
    }

    #[test]
    fn test_master_indexes_exist() {
        let store = make_store();
        let mut stmt = store
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'master' ORDER BY name")
            .unwrap();
        let indexes: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(
            indexes,
            vec!["master_mag", "master_mag_type", "master_name", "master_trixel_mag"]
        );
    }

    #[test]
    fn test_catalog_table_columns() {
        let store = make_store();
        let mut stmt = store
            .conn
            .prepare("SELECT name FROM pragma_table_info('cat_0') ORDER BY cid")
            .unwrap();
        let columns: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(columns, sql::OBJECT_COLUMNS.to_vec());
    }

    // ── Data integrity ──────────────────────────────────────────

    #[test]
    fn test_data_survives_close_and_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("catalogs.sqlite");
        let config = DbConfig::default().with_mesh_depth(5);

        let id;
        {
            let mut store = CatalogStore::open(&db_path, &config, Arc::new(HtMesh)).unwrap();
            store.register_catalog(&Catalog::new(1000, "kept").mutable(true)).unwrap();
            id = store.insert_object(1000, &galaxy("M31", 3.4)).unwrap();
        }
        {
            // the stored depth wins over the configured one
            let reopened = DbConfig::default().with_mesh_depth(2);
            let store = CatalogStore::open(&db_path, &reopened, Arc::new(HtMesh)).unwrap();
            assert_eq!(store.mesh_depth(), 5);
            assert!(store.catalog_exists(1000).unwrap());
            let object = store.get_object(&id).unwrap().unwrap();
            assert_eq!(object.trixel, HtMesh.trixel_of(10.0, 20.0, 5));
        }
    }

    #[test]
    fn test_foreign_key_rows_require_catalog() {
        let store = make_store();
        let result = store.conn.execute(
            "INSERT INTO cat_0 (oid, type, ra, dec, name, catalog) VALUES (x'00', 0, 0, 0, 'x', 4242)",
            [],
        );
        assert!(result.is_err());
    }
}
