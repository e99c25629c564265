use thiserror::Error;

/// Errors raised by the certificate record store.
///
/// Every variant renders with the `certificate store error` prefix so callers
/// can recognise the category after the error has been wrapped.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A write meant to create exactly one row affected none.
    #[error("certificate store error: insertion failed: {0}")]
    InsertionFailed(String),

    /// The targeted serial has no matching row.
    #[error("certificate store error: record not found: {0}")]
    RecordNotFound(String),

    /// A single-row write touched more than one row.
    #[error("certificate store error: {0} rows are affected, should be 1 row")]
    RowsAffected(u64),

    /// A stored value could not be turned back into a record field.
    #[error("certificate store error: failed to decode row: {0}")]
    Decode(String),

    /// A record whose fields contradict each other was refused before writing.
    #[error("certificate store error: invalid record: {0}")]
    InvalidRecord(String),

    #[error("certificate store error: unsupported database driver: {0}")]
    UnsupportedDriver(String),

    #[error("certificate store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("certificate store error: connection pool: {0}")]
    Pool(#[from] r2d2::Error),

    /// Failure reported by a non-SQLite [`Database`](super::Database) backend.
    #[error("certificate store error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Convenient Result type alias
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Map a rows-affected count for a single-row insert onto the store's
    /// error conditions.
    pub(crate) fn check_inserted(affected: u64, what: &str) -> StoreResult<()> {
        match affected {
            1 => Ok(()),
            0 => Err(StoreError::InsertionFailed(format!(
                "failed to insert the {what} record"
            ))),
            n => Err(StoreError::RowsAffected(n)),
        }
    }

    /// Map a rows-affected count for a single-row update.
    pub(crate) fn check_updated(affected: u64, message: &str) -> StoreResult<()> {
        match affected {
            1 => Ok(()),
            0 => Err(StoreError::RecordNotFound(message.to_string())),
            n => Err(StoreError::RowsAffected(n)),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::RecordNotFound(_))
    }
}
