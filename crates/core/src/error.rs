use std::path::PathBuf;

use crate::domain::ObjectId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot open catalog database {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database schema version {db} is newer than supported version {code}")]
    SchemaTooNew { db: i64, code: i64 },

    #[error("migration from schema version {from} failed: {message}")]
    Migration { from: i64, message: String },

    #[error("could not initialize database: {0}")]
    Init(String),

    #[error("catalog with id {0} already exists")]
    CatalogExists(i64),

    #[error("catalog with id {0} not found")]
    CatalogNotFound(i64),

    #[error("catalog with id {0} is immutable")]
    CatalogImmutable(i64),

    #[error("removing the user catalog is not allowed")]
    UserCatalogProtected,

    #[error("invalid catalog id {0}: ids must not be negative")]
    InvalidCatalogId(i64),

    #[error("object {0} not found")]
    ObjectNotFound(ObjectId),

    #[error("invalid object: {0}")]
    InvalidObject(String),

    #[error("path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    #[error("not a catalog dump file: {}", .0.display())]
    InvalidCatalogFile(PathBuf),

    #[error("unsupported catalog dump version: wanted {expected}, got {found}")]
    UnsupportedDumpVersion { found: i64, expected: i64 },

    #[error("catalog dump contains no catalog: {}", .0.display())]
    EmptyDump(PathBuf),

    #[error("operation requires a file-backed database")]
    InMemory,
}

pub type Result<T> = std::result::Result<T, Error>;
