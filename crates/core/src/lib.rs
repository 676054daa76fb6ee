pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod hasher;
pub mod mesh;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use catalog::CatalogStore;

pub use catalog::colors::{parse_color_string, to_color_string, CatalogColorMap, ColorMap};
pub use catalog::filter::{Column, Direction, Filter, OrderBy};
pub use config::DbConfig;
pub use domain::*;
pub use error::{Error, Result};
pub use mesh::{HtMesh, SpatialIndexer};

/// The main entry point: a multi-catalog object database.
///
/// All access goes through one connection guarded by a mutex, so a
/// `Database` can be shared between threads behind an `Arc`. Every mutation
/// finishes by rebuilding the master table; readers observe either the
/// state before or after a rebuild, never a partial one.
pub struct Database {
    store: Mutex<CatalogStore>,
    path: Option<PathBuf>,
    config: DbConfig,
    indexer: Arc<dyn SpatialIndexer>,
}

impl Database {
    /// Open or create a database file with default settings.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, &DbConfig::default())
    }

    pub fn open_with(path: &Path, config: &DbConfig) -> Result<Self> {
        Self::open_with_indexer(path, config, Arc::new(HtMesh))
    }

    /// Open with a custom spatial indexer.
    pub fn open_with_indexer(
        path: &Path,
        config: &DbConfig,
        indexer: Arc<dyn SpatialIndexer>,
    ) -> Result<Self> {
        let store = CatalogStore::open(path, config, Arc::clone(&indexer))?;
        Ok(Self {
            store: Mutex::new(store),
            path: Some(path.to_path_buf()),
            config: config.clone(),
            indexer,
        })
    }

    /// Open a private in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let config = DbConfig::default();
        let indexer: Arc<dyn SpatialIndexer> = Arc::new(HtMesh);
        let store = CatalogStore::open_in_memory(&config, Arc::clone(&indexer))?;
        Ok(Self {
            store: Mutex::new(store),
            path: None,
            config,
            indexer,
        })
    }

    /// A second, independent handle on the same database file.
    pub fn reopen(&self) -> Result<Self> {
        let path = self.path.as_deref().ok_or(Error::InMemory)?;
        Self::open_with_indexer(path, &self.config, Arc::clone(&self.indexer))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn mesh_depth(&self) -> u8 {
        self.store.lock().mesh_depth()
    }

    pub fn schema_version(&self) -> i64 {
        self.store.lock().schema_version()
    }

    /// Trixel of a position at this database's mesh depth.
    pub fn trixel_of(&self, ra: f64, dec: f64) -> i64 {
        self.indexer.trixel_of(ra, dec, self.mesh_depth())
    }

    /// Rebuild the master table from the enabled catalogs.
    pub fn compile_master(&self) -> Result<()> {
        self.store.lock().compile_master()
    }

    // ── Catalogs ─────────────────────────────────────────────────────

    /// Register a new catalog with an empty object table.
    pub fn register_catalog(&self, catalog: &Catalog) -> Result<()> {
        self.store.lock().register_catalog(catalog)
    }

    pub fn get_catalog(&self, id: i64) -> Result<Option<Catalog>> {
        self.store.lock().get_catalog(id)
    }

    pub fn catalog_exists(&self, id: i64) -> Result<bool> {
        self.store.lock().catalog_exists(id)
    }

    pub fn catalogs(&self, include_disabled: bool) -> Result<Vec<Catalog>> {
        self.store.lock().catalogs(include_disabled)
    }

    pub fn update_catalog_meta(&self, catalog: &Catalog) -> Result<()> {
        self.store.lock().update_catalog_meta(catalog)
    }

    pub fn set_catalog_enabled(&self, id: i64, enabled: bool) -> Result<()> {
        self.store.lock().set_catalog_enabled(id, enabled)
    }

    pub fn remove_catalog(&self, id: i64) -> Result<()> {
        self.store.lock().remove_catalog(id)
    }

    /// First free id at or above [`CUSTOM_CATALOG_MIN_ID`].
    pub fn find_suitable_catalog_id(&self) -> Result<i64> {
        self.store.lock().find_suitable_catalog_id()
    }

    // ── Objects ──────────────────────────────────────────────────────

    pub fn insert_object(&self, catalog_id: i64, object: &NewObject) -> Result<ObjectId> {
        self.store.lock().insert_object(catalog_id, object)
    }

    /// Insert many objects atomically, with a single master rebuild.
    pub fn insert_objects(&self, catalog_id: i64, objects: &[NewObject]) -> Result<Vec<ObjectId>> {
        self.store.lock().insert_objects(catalog_id, objects)
    }

    pub fn remove_object(&self, catalog_id: i64, object_id: &ObjectId) -> Result<()> {
        self.store.lock().remove_object(catalog_id, object_id)
    }

    /// Copy all objects of `src` into `dst`. Returns the number of rows copied.
    pub fn copy_objects(&self, src: i64, dst: i64) -> Result<usize> {
        self.store.lock().copy_objects(src, dst)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn get_object(&self, object_id: &ObjectId) -> Result<Option<CatalogObject>> {
        self.store.lock().get_object(object_id)
    }

    pub fn get_object_in_catalog(
        &self,
        object_id: &ObjectId,
        catalog_id: i64,
    ) -> Result<Option<CatalogObject>> {
        self.store.lock().get_object_in_catalog(object_id, catalog_id)
    }

    pub fn find_objects_by_name(
        &self,
        name: &str,
        limit: Option<usize>,
        exact_only: bool,
    ) -> Result<Vec<CatalogObject>> {
        self.store.lock().find_objects_by_name(name, limit, exact_only)
    }

    pub fn find_objects_by_name_in_catalog(
        &self,
        catalog_id: i64,
        name: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CatalogObject>> {
        self.store
            .lock()
            .find_objects_by_name_in_catalog(catalog_id, name, limit)
    }

    pub fn find_objects_by_wildcard(
        &self,
        pattern: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CatalogObject>> {
        self.store.lock().find_objects_by_wildcard(pattern, limit)
    }

    pub fn objects_in_trixel(&self, trixel: i64) -> Result<Vec<CatalogObject>> {
        self.store.lock().objects_in_trixel(trixel)
    }

    pub fn objects_in_trixel_known_magnitude(&self, trixel: i64) -> Result<Vec<CatalogObject>> {
        self.store.lock().objects_in_trixel_known_magnitude(trixel)
    }

    pub fn objects_in_trixel_unknown_magnitude(&self, trixel: i64) -> Result<Vec<CatalogObject>> {
        self.store.lock().objects_in_trixel_unknown_magnitude(trixel)
    }

    pub fn objects_by_magnitude(
        &self,
        maglim: Option<f64>,
        limit: Option<usize>,
    ) -> Result<Vec<CatalogObject>> {
        self.store.lock().objects_by_magnitude(maglim, limit)
    }

    pub fn objects_by_type(
        &self,
        object_type: ObjectType,
        maglim: Option<f64>,
        limit: Option<usize>,
    ) -> Result<Vec<CatalogObject>> {
        self.store.lock().objects_by_type(object_type, maglim, limit)
    }

    pub fn objects_in_catalog(
        &self,
        catalog_id: i64,
        object_type: Option<ObjectType>,
        maglim: Option<f64>,
        limit: Option<usize>,
    ) -> Result<Vec<CatalogObject>> {
        self.store
            .lock()
            .objects_in_catalog(catalog_id, object_type, maglim, limit)
    }

    pub fn general_query(
        &self,
        filter: &Filter,
        order: &[OrderBy],
        limit: Option<usize>,
    ) -> Result<Vec<CatalogObject>> {
        self.store.lock().general_query(filter, order, limit)
    }

    pub fn catalog_statistics(&self, scope: StatsScope) -> Result<CatalogStatistics> {
        self.store.lock().catalog_statistics(scope)
    }

    // ── Colors ───────────────────────────────────────────────────────

    pub fn catalog_colors(&self) -> Result<ColorMap> {
        self.store.lock().catalog_colors()
    }

    pub fn catalog_colors_for(&self, id: i64) -> Result<CatalogColorMap> {
        self.store.lock().catalog_colors_for(id)
    }

    pub fn insert_catalog_colors(&self, id: i64, colors: &CatalogColorMap) -> Result<()> {
        self.store.lock().insert_catalog_colors(id, colors)
    }

    // ── Dump files ───────────────────────────────────────────────────

    /// Write one catalog to a standalone dump file.
    pub fn dump_catalog(&self, id: i64, path: &Path) -> Result<()> {
        self.store.lock().dump_catalog(id, path)
    }

    /// Import a dump file, replacing the catalog with the same id.
    /// A mutable catalog is only replaced when `overwrite` is set.
    pub fn import_catalog(&self, path: &Path, overwrite: bool) -> Result<Catalog> {
        self.store.lock().import_catalog(path, overwrite)
    }

    /// Registry metadata of a dump file, without importing it.
    pub fn read_catalog_meta_from_file(path: &Path) -> Result<Catalog> {
        catalog::portability::read_catalog_meta_from_file(path)
    }
}
