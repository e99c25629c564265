//! Certificate and OCSP record store
//!
//! Typed operations over two independent relations, `certificates` and
//! `ocsp_responses`, reached through the generic [`Database`] capability.
//! The relations are not kept transactionally consistent with each other: a
//! cached OCSP response may still report a certificate as good for a while
//! after it was revoked.
//!
//! Every write checks its rows-affected count; zero and more than one are
//! distinct errors. The schema is expected to be in place already (see
//! `migrations/`); nothing here runs DDL.

mod certificates;
mod errors;
mod ocsp;
mod sql;
mod sqlite;
#[cfg(test)]
pub(crate) mod testdb;
mod types;

use tracing::debug;

use crate::config::DbConfig;

pub use certificates::{
    get_certificate, get_revoked_certificates, get_unexpired_certificates, insert_certificate,
    revoke_certificate,
};
pub use errors::{StoreError, StoreResult};
pub use ocsp::{get_ocsp, get_unexpired_ocsps, insert_ocsp, update_ocsp, upsert_ocsp};
pub use sql::{Database, SqlRow, SqlValue, format_timestamp, parse_timestamp};
pub use sqlite::SqliteDatabase;
pub use types::{CertificateRecord, CertificateStatus, OcspRecord};

/// Open the database described by `config`.
///
/// Only SQLite is built in; `sqlite3` and `sqlite` both select it, with
/// `data_source` naming the database file (`:memory:` for a private
/// in-memory database).
pub fn open(config: &DbConfig) -> StoreResult<SqliteDatabase> {
    debug!("Opening {} database", config.driver);
    match config.driver.as_str() {
        "sqlite3" | "sqlite" if config.data_source == ":memory:" => {
            SqliteDatabase::open_in_memory()
        }
        "sqlite3" | "sqlite" => SqliteDatabase::open(&config.data_source),
        other => Err(StoreError::UnsupportedDriver(other.to_string())),
    }
}
