//! SQL text used by the catalog store.
//!
//! Everything that depends on a catalog id or a column list is built here by
//! pure functions so the generated statements can be pinned by tests. Catalog
//! ids are integers validated at registration, never caller-supplied text.

pub const CATALOG_PREFIX: &str = "cat_";
pub const MASTER: &str = "master";
pub const MASTER_STAGING: &str = "master_staging";
pub const REGISTRY: &str = "catalogs";

/// Object columns of a catalog table, in storage order.
pub const OBJECT_COLUMNS: [&str; 14] = [
    "oid",
    "type",
    "ra",
    "dec",
    "magnitude",
    "name",
    "long_name",
    "catalog_identifier",
    "major_axis",
    "minor_axis",
    "position_angle",
    "flux",
    "trixel",
    "catalog",
];

/// Registry columns, in the order used by inserts and reads.
pub const REGISTRY_COLUMNS: [&str; 13] = [
    "id",
    "name",
    "precedence",
    "author",
    "source",
    "description",
    "mut",
    "enabled",
    "version",
    "color",
    "license",
    "maintainer",
    "timestamp",
];

/// Descriptive registry fields that may be edited in place.
pub const META_COLUMNS: [&str; 8] = [
    "name",
    "author",
    "source",
    "description",
    "color",
    "license",
    "maintainer",
    "timestamp",
];

pub const CREATE_META: &str = "CREATE TABLE IF NOT EXISTS meta (
    version      INTEGER NOT NULL,
    htmesh_level INTEGER NOT NULL,
    init         INTEGER NOT NULL
)";
pub const GET_META: &str = "SELECT version, htmesh_level, init FROM meta LIMIT 1";
pub const SET_META: &str = "INSERT INTO meta (version, htmesh_level, init) VALUES (?1, ?2, ?3)";
pub const UPDATE_VERSION: &str = "UPDATE meta SET version = ?1";
pub const CLEAR_INIT: &str = "UPDATE meta SET init = 0";

pub const CREATE_COLORS: &str = "CREATE TABLE IF NOT EXISTS catalog_colors (
    catalog INTEGER NOT NULL,
    scheme  TEXT NOT NULL,
    color   TEXT NOT NULL,
    UNIQUE(catalog, scheme)
)";
pub const GET_COLORS: &str = "SELECT catalog, scheme, color FROM catalog_colors ORDER BY catalog, scheme";
pub const GET_COLORS_FOR: &str =
    "SELECT scheme, color FROM catalog_colors WHERE catalog = ?1 ORDER BY scheme";
pub const UPSERT_COLOR: &str = "INSERT INTO catalog_colors (catalog, scheme, color) VALUES (?1, ?2, ?3)
     ON CONFLICT(catalog, scheme) DO UPDATE SET color = excluded.color";

pub const GET_ENABLED_IDS: &str = "SELECT id FROM catalogs WHERE enabled = 1 ORDER BY id ASC";
pub const GET_ALL_IDS: &str = "SELECT id FROM catalogs ORDER BY id ASC";
pub const SET_ENABLED: &str = "UPDATE catalogs SET enabled = ?1 WHERE id = ?2";
pub const REMOVE_CATALOG: &str = "DELETE FROM catalogs WHERE id = ?1";
pub const EXISTS_MASTER: &str =
    "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'master'";

pub fn field_list(columns: &[&str]) -> String {
    columns.join(", ")
}

pub fn prefixed_field_list(columns: &[&str], prefix: &str) -> String {
    columns
        .iter()
        .map(|c| format!("{prefix}{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `?1, ?2, ... ?n`
pub fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ")
}

/// `a = ?1, b = ?2, ...`
pub fn update_list(columns: &[&str]) -> String {
    columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{c} = ?{}", i + 1))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn catalog_table(id: i64) -> String {
    format!("{CATALOG_PREFIX}{id}")
}

pub fn object_fields() -> String {
    field_list(&OBJECT_COLUMNS)
}

pub fn registry_fields() -> String {
    field_list(&REGISTRY_COLUMNS)
}

// ── Registry ────────────────────────────────────────────────────

pub fn create_registry(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    precedence  REAL NOT NULL,
    author      TEXT DEFAULT NULL,
    source      TEXT DEFAULT NULL,
    description TEXT DEFAULT NULL,
    mut         INTEGER DEFAULT 0,
    enabled     INTEGER DEFAULT 1,
    version     INTEGER DEFAULT -1,
    color       TEXT DEFAULT NULL,
    license     TEXT DEFAULT NULL,
    maintainer  TEXT DEFAULT NULL,
    timestamp   DATETIME DEFAULT NULL
)"
    )
}

pub fn insert_into_registry(table: &str) -> String {
    format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        registry_fields(),
        placeholders(REGISTRY_COLUMNS.len())
    )
}

pub fn get_catalog_by_id() -> String {
    format!("SELECT {} FROM catalogs WHERE id = ?1", registry_fields())
}

pub fn get_first_catalog(table: &str) -> String {
    format!("SELECT {} FROM {table} ORDER BY id LIMIT 1", registry_fields())
}

/// Meta columns bind to `?1..?8`, the id to `?9`.
pub fn update_catalog_meta() -> String {
    format!(
        "UPDATE catalogs SET {} WHERE id = ?{}",
        update_list(&META_COLUMNS),
        META_COLUMNS.len() + 1
    )
}

// ── Catalog tables ──────────────────────────────────────────────

pub fn create_catalog_table(table: &str) -> String {
    format!(
        "CREATE TABLE {table} (
    oid                BLOB PRIMARY KEY,
    type               INTEGER NOT NULL,
    ra                 REAL NOT NULL,
    dec                REAL NOT NULL,
    magnitude          REAL DEFAULT NULL,
    name               TEXT NOT NULL,
    long_name          TEXT DEFAULT NULL,
    catalog_identifier TEXT DEFAULT NULL,
    major_axis         REAL DEFAULT NULL,
    minor_axis         REAL DEFAULT NULL,
    position_angle     REAL DEFAULT NULL,
    flux               REAL DEFAULT NULL,
    trixel             INTEGER DEFAULT -1,
    catalog            INTEGER NOT NULL,
    FOREIGN KEY (catalog) REFERENCES catalogs (id) ON DELETE CASCADE ON UPDATE CASCADE
)"
    )
}

pub fn drop_table(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {table}")
}

pub fn insert_object(table: &str) -> String {
    format!(
        "INSERT OR REPLACE INTO {table} ({}) VALUES ({})",
        object_fields(),
        placeholders(OBJECT_COLUMNS.len())
    )
}

pub fn remove_object(id: i64) -> String {
    format!("DELETE FROM {} WHERE oid = ?1", catalog_table(id))
}

/// Copy every row of `src_table` into `dst_table`, re-owning the rows by `dst_id`.
pub fn copy_rows(src_table: &str, dst_table: &str, dst_id: i64) -> String {
    let selected: Vec<String> = OBJECT_COLUMNS
        .iter()
        .map(|c| if *c == "catalog" { dst_id.to_string() } else { c.to_string() })
        .collect();
    format!(
        "INSERT OR REPLACE INTO {dst_table} ({}) SELECT {} FROM {src_table}",
        object_fields(),
        selected.join(", "),
    )
}

pub fn copy_objects(src: i64, dst: i64) -> String {
    copy_rows(&catalog_table(src), &catalog_table(dst), dst)
}

// ── Master catalog ──────────────────────────────────────────────

pub fn master_columns() -> Vec<&'static str> {
    let mut columns = OBJECT_COLUMNS.to_vec();
    columns.push("precedence");
    columns
}

pub fn create_master_table(table: &str) -> String {
    format!(
        "CREATE TABLE {table} (
    oid                BLOB NOT NULL,
    type               INTEGER NOT NULL,
    ra                 REAL NOT NULL,
    dec                REAL NOT NULL,
    magnitude          REAL,
    name               TEXT NOT NULL,
    long_name          TEXT,
    catalog_identifier TEXT,
    major_axis         REAL,
    minor_axis         REAL,
    position_angle     REAL,
    flux               REAL,
    trixel             INTEGER,
    catalog            INTEGER NOT NULL,
    precedence         REAL NOT NULL
)"
    )
}

/// Every enabled catalog's rows, each tagged with its catalog's precedence.
pub fn union_all_catalogs(ids: &[i64]) -> Option<String> {
    if ids.is_empty() {
        return None;
    }
    let fields = prefixed_field_list(&OBJECT_COLUMNS, "c.");
    let parts: Vec<String> = ids
        .iter()
        .map(|id| {
            format!(
                "SELECT {fields}, cl.precedence FROM {} c INNER JOIN catalogs cl ON cl.id = c.catalog",
                catalog_table(*id)
            )
        })
        .collect();
    Some(parts.join("\nUNION ALL\n"))
}

/// Fill `table` with one row per `oid`: highest precedence wins, equal
/// precedence goes to the lowest catalog id. Rows are written in `oid` order.
pub fn populate_master(table: &str, ids: &[i64]) -> Option<String> {
    let union = union_all_catalogs(ids)?;
    let fields = field_list(&master_columns());
    Some(format!(
        "INSERT INTO {table} ({fields})
SELECT {fields} FROM (
SELECT {fields}, ROW_NUMBER() OVER (PARTITION BY oid ORDER BY precedence DESC, catalog ASC) AS winner_rank
FROM (
{union}
)
)
WHERE winner_rank = 1
ORDER BY oid"
    ))
}

pub fn rename_table(from: &str, to: &str) -> String {
    format!("ALTER TABLE {from} RENAME TO {to}")
}

pub const MASTER_INDICES: [&str; 4] = [
    "CREATE INDEX master_trixel_mag ON master (trixel ASC, magnitude DESC, major_axis ASC)",
    "CREATE INDEX master_mag ON master (magnitude ASC)",
    "CREATE INDEX master_mag_type ON master (type, magnitude ASC)",
    "CREATE INDEX master_name ON master (name COLLATE NOCASE ASC, long_name COLLATE NOCASE ASC, magnitude ASC)",
];

// ── Object queries ──────────────────────────────────────────────

pub fn dso_by_trixel() -> String {
    format!(
        "SELECT {} FROM master WHERE trixel = ?1 ORDER BY magnitude DESC, major_axis ASC",
        object_fields()
    )
}

/// Objects of a trixel with a known magnitude, faintest first.
pub fn dso_by_trixel_known_magnitude() -> String {
    format!(
        "SELECT {} FROM master WHERE trixel = ?1 AND magnitude IS NOT NULL \
         ORDER BY magnitude DESC, major_axis ASC",
        object_fields()
    )
}

pub fn dso_by_trixel_unknown_magnitude() -> String {
    format!(
        "SELECT {} FROM master WHERE trixel = ?1 AND magnitude IS NULL ORDER BY major_axis ASC",
        object_fields()
    )
}

pub fn dso_by_oid(table: &str) -> String {
    format!("SELECT {} FROM {table} WHERE oid = ?1 LIMIT 1", object_fields())
}

pub fn dso_by_name_exact() -> String {
    format!(
        "SELECT {} FROM master WHERE name = ?1 COLLATE NOCASE
         ORDER BY magnitude ASC NULLS LAST, oid LIMIT ?2",
        object_fields()
    )
}

pub fn dso_by_name() -> String {
    format!(
        "SELECT {} FROM master
         WHERE instr(lower(name), lower(?1)) > 0 OR instr(lower(long_name), lower(?1)) > 0
         ORDER BY name, long_name, magnitude ASC NULLS LAST, oid LIMIT ?2",
        object_fields()
    )
}

pub fn dso_by_name_in_catalog(id: i64) -> String {
    format!(
        "SELECT {} FROM {}
         WHERE instr(lower(name), lower(?1)) > 0
            OR instr(lower(long_name), lower(?1)) > 0
            OR instr(lower(catalog_identifier), lower(?1)) > 0
         ORDER BY magnitude ASC NULLS LAST, name, oid LIMIT ?2",
        object_fields(),
        catalog_table(id)
    )
}

pub fn dso_by_wildcard() -> String {
    format!(
        "SELECT {} FROM master WHERE name LIKE ?1
         ORDER BY CAST(name AS INTEGER), name, oid LIMIT ?2",
        object_fields()
    )
}

/// Magnitude-ordered scan of `table`, optionally filtered by type
/// (`?1`) and magnitude limit (`?2`). The limit always binds to `?3`.
pub fn dso_by_magnitude(table: &str, with_type: bool, with_maglim: bool) -> String {
    let mut conditions = Vec::new();
    if with_type {
        conditions.push("type = ?1");
    }
    if with_maglim {
        conditions.push("magnitude < ?2");
    }
    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };
    format!(
        "SELECT {} FROM {table}{where_clause} ORDER BY magnitude ASC NULLS LAST, oid LIMIT ?3",
        object_fields()
    )
}

pub fn count_by_type(table: &str) -> String {
    format!("SELECT type, COUNT(*) FROM {table} GROUP BY type ORDER BY type")
}
