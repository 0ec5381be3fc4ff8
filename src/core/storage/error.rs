use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage already exists: {0:?}")]
    AlreadyExists(PathBuf),
    #[error("Storage not found: {0:?}")]
    NotFound(PathBuf),
    #[error("Storage handle already closed")]
    Closed,
    #[error("Unknown storage type: {0}")]
    UnknownKind(String),
    #[error("LMDB map size {0} does not fit in the address space")]
    MapSize(u64),
    #[error("Failed to read frame {path:?}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("LMDB error: {0}")]
    Lmdb(#[from] heed::Error),
    #[error("Container error: {0}")]
    Container(#[from] zip::result::ZipError),
    #[error("Serialization error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}
