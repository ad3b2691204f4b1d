/// Error taxonomy for the index engine.
///
/// Every fatal precondition in the spec (bad disconnect, schema/network
/// mismatch, a forbidden tip jump) maps to its own variant rather than a
/// generic "something went wrong" bucket, so callers can tell a crash-and-
/// retry situation apart from a corrupt-store situation at a glance.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("column family not found: {0}")]
    ColumnFamilyMissing(String),
    #[error("key not found")]
    NotFound,
    #[error(transparent)]
    Rocks(#[from] rocksdb::Error),
    #[error("store task panicked: {0}")]
    TaskJoin(String),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("network magic mismatch: expected {expected:#x}, found {found:#x}")]
    NetworkMismatch { expected: u32, found: u32 },

    #[error("schema mismatch: expected {expected:?}, found {found:?}")]
    SchemaMismatch { expected: String, found: String },

    #[error("bad disconnect at height {height}: {reason}")]
    BadDisconnect { height: u32, reason: String },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("unknown indexer identifier: {0}")]
    UnknownIndexer(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("chain client error: {0}")]
    Client(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;
