use tracing::debug;

use super::errors::{StoreError, StoreResult};
use super::sql::{Database, SqlRow, SqlValue};
use super::types::CertificateRecord;

const INSERT_SQL: &str = "
INSERT INTO certificates (serial, ca_label, status, reason, expiry, revoked_at, pem)
    VALUES (?, ?, ?, ?, ?, ?, ?);";

const SELECT_SQL: &str = "
SELECT serial, ca_label, status, reason, expiry, revoked_at, pem FROM certificates
    WHERE (serial = ?);";

const SELECT_ALL_UNEXPIRED_SQL: &str = "
SELECT serial, ca_label, status, reason, expiry, revoked_at, pem FROM certificates
    WHERE CURRENT_TIMESTAMP < expiry;";

const SELECT_REVOKED_SQL: &str = "
SELECT serial, ca_label, status, reason, expiry, revoked_at, pem FROM certificates
    WHERE status = 'revoked';";

// A repeated revocation keeps the first revocation time.
const UPDATE_REVOKE_SQL: &str = "
UPDATE certificates
    SET status = 'revoked', revoked_at = COALESCE(revoked_at, CURRENT_TIMESTAMP), reason = ?
    WHERE (serial = ?);";

fn certificate_from_row(row: &SqlRow) -> StoreResult<CertificateRecord> {
    Ok(CertificateRecord {
        serial: row.text(0)?,
        ca_label: row.text(1)?,
        status: row.text(2)?.parse()?,
        reason: row.integer(3)?,
        expiry: row.timestamp(4)?,
        revoked_at: row.optional_timestamp(5)?,
        pem: row.text(6)?,
    })
}

fn certificates_from_rows(rows: Vec<SqlRow>) -> StoreResult<Vec<CertificateRecord>> {
    rows.iter().map(certificate_from_row).collect()
}

/// A revocation time is present exactly when the status is revoked.
fn check_revocation_fields(record: &CertificateRecord) -> StoreResult<()> {
    match (record.is_revoked(), record.revoked_at) {
        (true, None) => Err(StoreError::InvalidRecord(format!(
            "certificate {} is revoked but has no revocation time",
            record.serial
        ))),
        (false, Some(_)) => Err(StoreError::InvalidRecord(format!(
            "certificate {} is {} but has a revocation time",
            record.serial, record.status
        ))),
        _ => Ok(()),
    }
}

/// Record a newly issued certificate. Timestamps are stored in UTC.
pub fn insert_certificate<D>(db: &D, record: &CertificateRecord) -> StoreResult<()>
where
    D: Database + ?Sized,
{
    check_revocation_fields(record)?;

    let affected = db.execute(
        INSERT_SQL,
        &[
            record.serial.as_str().into(),
            record.ca_label.as_str().into(),
            record.status.as_str().into(),
            SqlValue::Integer(record.reason),
            record.expiry.into(),
            record.revoked_at.into(),
            record.pem.as_str().into(),
        ],
    )?;
    StoreError::check_inserted(affected, "certificate")?;

    debug!("Inserted certificate record {}", record.serial);
    Ok(())
}

/// Fetch the certificate record with the given serial.
pub fn get_certificate<D>(db: &D, serial: &str) -> StoreResult<CertificateRecord>
where
    D: Database + ?Sized,
{
    let rows = db.query(SELECT_SQL, &[serial.into()])?;
    match rows.first() {
        Some(row) => certificate_from_row(row),
        None => Err(StoreError::RecordNotFound(format!(
            "no certificate with serial {serial}"
        ))),
    }
}

/// All certificates whose expiry lies after the database server's current
/// time. Order is unspecified.
pub fn get_unexpired_certificates<D>(db: &D) -> StoreResult<Vec<CertificateRecord>>
where
    D: Database + ?Sized,
{
    certificates_from_rows(db.query(SELECT_ALL_UNEXPIRED_SQL, &[])?)
}

/// All revoked certificates, expired or not. Order is unspecified.
pub fn get_revoked_certificates<D>(db: &D) -> StoreResult<Vec<CertificateRecord>>
where
    D: Database + ?Sized,
{
    certificates_from_rows(db.query(SELECT_REVOKED_SQL, &[])?)
}

/// Mark a certificate revoked with the given RFC 5280 reason code.
///
/// The revocation time is taken from the database clock.
pub fn revoke_certificate<D>(db: &D, serial: &str, reason_code: i64) -> StoreResult<()>
where
    D: Database + ?Sized,
{
    let affected = db.execute(
        UPDATE_REVOKE_SQL,
        &[SqlValue::Integer(reason_code), serial.into()],
    )?;
    StoreError::check_updated(
        affected,
        "failed to revoke the certificate: certificate not found",
    )?;

    debug!("Revoked certificate {serial} with reason {reason_code}");
    Ok(())
}
