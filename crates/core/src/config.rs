use serde::{Deserialize, Serialize};

/// Mesh depth used when a fresh database is initialized.
pub const DEFAULT_MESH_DEPTH: u8 = 3;

/// Options for [`crate::Database::open_with`].
///
/// `mesh_depth` only applies to freshly created databases; an existing file
/// keeps the depth recorded in its `meta` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub mesh_depth: u8,
    /// Use WAL journaling for file-backed databases.
    pub wal: bool,
    /// Copy the database file aside before applying schema migrations.
    pub backup_before_migration: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            mesh_depth: DEFAULT_MESH_DEPTH,
            wal: true,
            backup_before_migration: true,
        }
    }
}

impl DbConfig {
    pub fn with_mesh_depth(mut self, depth: u8) -> Self {
        self.mesh_depth = depth;
        self
    }
}
