use std::path::Path;
use std::time::Duration;

use r2d2::{ManageConnection, Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OpenFlags, params_from_iter};
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use tracing::debug;

use super::errors::StoreResult;
use super::sql::{Database, SqlRow, SqlValue, format_timestamp};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlValue::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            SqlValue::Timestamp(t) => ToSqlOutput::Owned(Value::Text(format_timestamp(t))),
        })
    }
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(i) => SqlValue::Integer(i),
            ValueRef::Real(f) => SqlValue::Real(f),
            ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
        }
    }
}

/// SQLite-backed [`Database`] over an r2d2 connection pool.
///
/// The handle is cheap to clone; all clones share the pool.
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteDatabase {
    /// Open the existing database file at `path`.
    ///
    /// The file is never created here; the schema is laid down by the
    /// migrations, so a missing file is reported as an open error.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        debug!("Opening SQLite database at {}", path.as_ref().display());
        let flags = OpenFlags::default().difference(OpenFlags::SQLITE_OPEN_CREATE);
        let manager = SqliteConnectionManager::file(path)
            .with_flags(flags)
            .with_init(|conn| {
                conn.busy_timeout(BUSY_TIMEOUT)?;
                Ok(())
            });

        // Surface open errors now instead of after the pool's connect timeout.
        drop(manager.connect()?);
        let pool = Pool::builder().build(manager)?;
        Ok(Self { pool })
    }

    /// Open a private in-memory database.
    ///
    /// The pool is limited to one connection because every SQLite in-memory
    /// connection is a separate database.
    pub fn open_in_memory() -> StoreResult<Self> {
        debug!("Opening in-memory SQLite database");
        let pool = Pool::builder()
            .max_size(1)
            .build(SqliteConnectionManager::memory())?;
        Ok(Self { pool })
    }

    pub(crate) fn connection(&self) -> StoreResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }
}

impl Database for SqliteDatabase {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> StoreResult<u64> {
        let conn = self.connection()?;
        let affected = conn.execute(sql, params_from_iter(params.iter()))?;
        Ok(affected as u64)
    }

    fn query(&self, sql: &str, params: &[SqlValue]) -> StoreResult<Vec<SqlRow>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql)?;
        let columns = stmt.column_count();
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
            (0..columns)
                .map(|idx| row.get_ref(idx).map(SqlValue::from))
                .collect::<rusqlite::Result<Vec<_>>>()
                .map(SqlRow::new)
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
