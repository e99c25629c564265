//! Test databases with the certificate schema applied.

use std::path::Path;

use chrono::{DateTime, Utc};

use super::sqlite::SqliteDatabase;

const SCHEMA: &str = include_str!("../../migrations/sqlite/001_create_certificates.sql");

fn migrate(db: &SqliteDatabase) {
    db.connection().unwrap().execute_batch(SCHEMA).unwrap();
}

pub(crate) fn sqlite() -> SqliteDatabase {
    let db = SqliteDatabase::open_in_memory().unwrap();
    migrate(&db);
    db
}

/// Create a migrated database file at `path` and open it.
pub(crate) fn sqlite_at_path(path: &Path) -> SqliteDatabase {
    rusqlite::Connection::open(path)
        .unwrap()
        .execute_batch(SCHEMA)
        .unwrap();
    SqliteDatabase::open(path).unwrap()
}

/// Stored timestamps may lose sub-second precision.
pub(crate) fn roughly_same_time(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    (a - b).num_milliseconds().abs() < 1000
}
