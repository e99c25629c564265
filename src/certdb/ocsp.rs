use chrono::{DateTime, Utc};
use tracing::debug;

use super::errors::{StoreError, StoreResult};
use super::sql::{Database, SqlRow};
use super::types::OcspRecord;

const INSERT_OCSP_SQL: &str = "
INSERT INTO ocsp_responses (serial, body, expiry)
    VALUES (?, ?, ?);";

const UPDATE_OCSP_SQL: &str = "
UPDATE ocsp_responses
    SET expiry = ?, body = ?
    WHERE (serial = ?);";

const SELECT_OCSP_SQL: &str = "
SELECT serial, body, expiry FROM ocsp_responses
    WHERE (serial = ?);";

const SELECT_ALL_UNEXPIRED_OCSP_SQL: &str = "
SELECT serial, body, expiry FROM ocsp_responses
    WHERE CURRENT_TIMESTAMP < expiry;";

fn ocsp_from_row(row: &SqlRow) -> StoreResult<OcspRecord> {
    Ok(OcspRecord {
        serial: row.text(0)?,
        body: row.text(1)?,
        expiry: row.timestamp(2)?,
    })
}

/// Cache a new OCSP response.
pub fn insert_ocsp<D>(db: &D, record: &OcspRecord) -> StoreResult<()>
where
    D: Database + ?Sized,
{
    let affected = db.execute(
        INSERT_OCSP_SQL,
        &[
            record.serial.as_str().into(),
            record.body.as_str().into(),
            record.expiry.into(),
        ],
    )?;
    StoreError::check_inserted(affected, "OCSP")?;

    debug!("Inserted OCSP record {}", record.serial);
    Ok(())
}

/// Fetch the cached OCSP response for `serial`.
pub fn get_ocsp<D>(db: &D, serial: &str) -> StoreResult<OcspRecord>
where
    D: Database + ?Sized,
{
    let rows = db.query(SELECT_OCSP_SQL, &[serial.into()])?;
    match rows.first() {
        Some(row) => ocsp_from_row(row),
        None => Err(StoreError::RecordNotFound(format!(
            "no OCSP response for serial {serial}"
        ))),
    }
}

/// All cached OCSP responses that have not expired according to the
/// database clock.
pub fn get_unexpired_ocsps<D>(db: &D) -> StoreResult<Vec<OcspRecord>>
where
    D: Database + ?Sized,
{
    db.query(SELECT_ALL_UNEXPIRED_OCSP_SQL, &[])?
        .iter()
        .map(ocsp_from_row)
        .collect()
}

fn run_update<D>(db: &D, serial: &str, body: &str, expiry: DateTime<Utc>) -> StoreResult<u64>
where
    D: Database + ?Sized,
{
    db.execute(
        UPDATE_OCSP_SQL,
        &[expiry.into(), body.into(), serial.into()],
    )
}

/// Replace the body and expiry of an existing cached response.
///
/// Never inserts: a serial without a cached response is `RecordNotFound`.
pub fn update_ocsp<D>(db: &D, serial: &str, body: &str, expiry: DateTime<Utc>) -> StoreResult<()>
where
    D: Database + ?Sized,
{
    let affected = run_update(db, serial, body, expiry)?;
    StoreError::check_updated(affected, "failed to update the OCSP record")?;

    debug!("Updated OCSP record {serial}");
    Ok(())
}

/// Update the cached response for `serial`, inserting it when none exists.
///
/// This is an update followed by a conditional insert, not an atomic upsert.
/// Two writers racing on the same new serial may both see zero updated rows,
/// and the slower insert then fails on the primary key. The OCSP cache is
/// rebuilt from the certificate table periodically, so such a loss is
/// corrected on the next refresh.
pub fn upsert_ocsp<D>(db: &D, serial: &str, body: &str, expiry: DateTime<Utc>) -> StoreResult<()>
where
    D: Database + ?Sized,
{
    match run_update(db, serial, body, expiry)? {
        0 => {
            debug!("No cached OCSP response for {serial}, inserting");
            insert_ocsp(
                db,
                &OcspRecord {
                    serial: serial.to_string(),
                    body: body.to_string(),
                    expiry,
                },
            )
        }
        1 => Ok(()),
        n => Err(StoreError::RowsAffected(n)),
    }
}
