use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};

use super::errors::{CrlError, CrlResult};
use super::serial::{parse_serial, parse_serial_list};
use super::signer::{CrlIssuer, create_generic_crl};
use super::types::RevokedEntry;
use crate::certdb::{Database, get_revoked_certificates};

/// Default CRL lifetime when no expiry is given.
pub const ONE_WEEK: Duration = Duration::from_secs(604_800);

/// `now + expiry`, or one week from now when `expiry` is zero.
pub fn resolve_next_update(now: DateTime<Utc>, expiry: Duration) -> CrlResult<DateTime<Utc>> {
    let expiry = if expiry.is_zero() { ONE_WEEK } else { expiry };
    let delta = TimeDelta::from_std(expiry).map_err(|e| CrlError::Time(e.to_string()))?;
    now.checked_add_signed(delta)
        .ok_or_else(|| CrlError::Time(format!("expiry {expiry:?} is out of range")))
}

/// Build a CRL from a serial list, one decimal serial per line.
///
/// The list carries no revocation times, so every entry is revoked "now".
pub fn new_crl_from_file(
    serial_list: &[u8],
    issuer_cert: &[u8],
    issuer_key: &[u8],
    expiry: Duration,
) -> CrlResult<Vec<u8>> {
    let now = Utc::now();
    let next_update = resolve_next_update(now, expiry)?;

    let issuer = CrlIssuer::from_pem(issuer_cert, issuer_key)?;
    let entries: Vec<_> = parse_serial_list(serial_list)?
        .into_iter()
        .map(|serial| RevokedEntry::new(serial, now))
        .collect();

    info!("Generating CRL for {} serials from list", entries.len());
    create_generic_crl(&entries, &issuer, next_update)
}

/// Build a CRL from every certificate the store marks revoked, expired or
/// not, using the recorded revocation times and reason codes.
pub fn new_crl_from_db<D>(
    db: &D,
    issuer_cert: &[u8],
    issuer_key: &[u8],
    expiry: Duration,
) -> CrlResult<Vec<u8>>
where
    D: Database + ?Sized,
{
    let next_update = resolve_next_update(Utc::now(), expiry)?;
    let issuer = CrlIssuer::from_pem(issuer_cert, issuer_key)?;

    let revoked = get_revoked_certificates(db)?;
    let entries = revoked
        .iter()
        .map(|record| {
            let serial = parse_serial(&record.serial).ok_or_else(|| {
                warn!("Rejecting stored serial {:?}", record.serial);
                CrlError::InvalidStoredSerial(record.serial.clone())
            })?;
            let revoked_at = record
                .revoked_at
                .ok_or_else(|| CrlError::MissingRevocationTime(record.serial.clone()))?;
            let reason = u8::try_from(record.reason).ok();
            Ok(RevokedEntry::new(serial, revoked_at).with_reason(reason))
        })
        .collect::<CrlResult<Vec<_>>>()?;

    debug!("Found {} revoked certificates in store", entries.len());
    info!("Generating CRL for {} revoked certificates", entries.len());
    create_generic_crl(&entries, &issuer, next_update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certdb::{CertificateRecord, insert_certificate, revoke_certificate, testdb};
    use crate::crl::CrlData;
    use chrono::Duration as ChronoDuration;
    use num_bigint::BigUint;
    use rcgen::{
        BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair,
        KeyUsagePurpose,
    };

    struct TestCa {
        cert: String,
        key: String,
    }

    fn gen_ca() -> TestCa {
        let mut params = CertificateParams::default();
        let key_pair = KeyPair::generate().unwrap();

        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, "Test CA Root");
        dn.push(DnType::OrganizationName, "Test Organization");
        params.distinguished_name = dn;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];

        let cert = params.self_signed(&key_pair).unwrap();
        TestCa {
            cert: cert.pem(),
            key: key_pair.serialize_pem(),
        }
    }

    fn decode(der: Vec<u8>, ca: &TestCa) -> CrlData {
        let crl = CrlData::from_der(der).unwrap();
        let issuer = CrlIssuer::from_pem(ca.cert.as_bytes(), ca.key.as_bytes()).unwrap();
        crl.verify(&issuer).unwrap();
        crl
    }

    #[test]
    fn test_resolve_next_update() {
        let now = Utc::now();
        assert_eq!(
            resolve_next_update(now, Duration::ZERO).unwrap(),
            now + ChronoDuration::seconds(604_800)
        );
        assert_eq!(
            resolve_next_update(now, Duration::from_secs(3600)).unwrap(),
            now + ChronoDuration::hours(1)
        );
        assert!(resolve_next_update(now, Duration::MAX).is_err());
    }

    #[test]
    fn test_new_crl_from_file() {
        let ca = gen_ca();
        let der = new_crl_from_file(
            b"10\n20\n30\n",
            ca.cert.as_bytes(),
            ca.key.as_bytes(),
            Duration::ZERO,
        )
        .unwrap();
        let crl = decode(der, &ca);

        assert_eq!(
            crl.revoked_serials(),
            vec![BigUint::from(10u32), BigUint::from(20u32), BigUint::from(30u32)]
        );

        let next_update = crl.next_update.unwrap();
        let drift = next_update - (Utc::now() + ChronoDuration::days(7));
        assert!(drift.num_seconds().abs() < 60);
        assert!(crl.entries.iter().all(|e| e.reason.is_none()));
    }

    #[test]
    fn test_new_crl_from_blank_file() {
        let ca = gen_ca();
        let der = new_crl_from_file(
            b"\n\n  \n",
            ca.cert.as_bytes(),
            ca.key.as_bytes(),
            Duration::from_secs(3600),
        )
        .unwrap();
        let crl = decode(der, &ca);
        assert!(crl.entries.is_empty());

        let drift = crl.next_update.unwrap() - (Utc::now() + ChronoDuration::hours(1));
        assert!(drift.num_seconds().abs() < 60);
    }

    #[test]
    fn test_new_crl_from_file_rejects_bad_serial() {
        let ca = gen_ca();
        let err = new_crl_from_file(
            b"10\nten\n30\n",
            ca.cert.as_bytes(),
            ca.key.as_bytes(),
            Duration::ZERO,
        )
        .unwrap_err();
        assert!(matches!(err, CrlError::InvalidSerial { line: 2, .. }));
    }

    #[test]
    fn test_new_crl_from_file_with_bad_issuer() {
        let ca = gen_ca();
        let other = gen_ca();
        assert!(matches!(
            new_crl_from_file(b"1", ca.cert.as_bytes(), other.key.as_bytes(), Duration::ZERO),
            Err(CrlError::KeyMismatch)
        ));
        assert!(matches!(
            new_crl_from_file(b"1", b"garbage", ca.key.as_bytes(), Duration::ZERO),
            Err(CrlError::OpenSsl(_))
        ));
    }

    #[test]
    fn test_new_crl_from_db() {
        let ca = gen_ca();
        let db = testdb::sqlite();
        let now = Utc::now();

        let records = [
            ("1", now + ChronoDuration::days(365)),
            ("2", now + ChronoDuration::days(365)),
            ("3", now - ChronoDuration::days(365)),
        ];
        for (serial, expiry) in records {
            insert_certificate(&db, &CertificateRecord::new(serial, "default", expiry, "pem"))
                .unwrap();
        }
        revoke_certificate(&db, "2", 1).unwrap();

        let der =
            new_crl_from_db(&db, ca.cert.as_bytes(), ca.key.as_bytes(), Duration::ZERO).unwrap();
        let crl = decode(der, &ca);

        assert_eq!(crl.revoked_serials(), vec![BigUint::from(2u32)]);
        assert_eq!(crl.entries[0].reason, Some(1));

        let stored = crate::certdb::get_certificate(&db, "2").unwrap();
        assert_eq!(
            crl.entries[0].revoked_at.timestamp(),
            stored.revoked_at.unwrap().timestamp()
        );
    }

    #[test]
    fn test_new_crl_from_db_includes_expired_revocations() {
        let ca = gen_ca();
        let db = testdb::sqlite();
        let expired = Utc::now() - ChronoDuration::days(30);
        insert_certificate(&db, &CertificateRecord::new("42", "default", expired, "pem")).unwrap();
        revoke_certificate(&db, "42", 0).unwrap();

        let der =
            new_crl_from_db(&db, ca.cert.as_bytes(), ca.key.as_bytes(), Duration::ZERO).unwrap();
        let crl = decode(der, &ca);
        assert_eq!(crl.revoked_serials(), vec![BigUint::from(42u32)]);
        assert_eq!(crl.entries[0].reason, None);
    }

    #[test]
    fn test_untimed_revocation_never_reaches_crl() {
        let ca = gen_ca();
        let db = testdb::sqlite();
        let mut untimed = CertificateRecord::new("5", "default", Utc::now(), "pem");
        untimed.status = crate::certdb::CertificateStatus::Revoked;
        assert!(insert_certificate(&db, &untimed).is_err());

        insert_certificate(&db, &CertificateRecord::new("6", "default", Utc::now(), "pem"))
            .unwrap();
        revoke_certificate(&db, "6", 1).unwrap();

        let der =
            new_crl_from_db(&db, ca.cert.as_bytes(), ca.key.as_bytes(), Duration::ZERO).unwrap();
        let crl = decode(der, &ca);
        assert_eq!(crl.revoked_serials(), vec![BigUint::from(6u32)]);
    }

    #[test]
    fn test_new_crl_from_db_rejects_non_decimal_serial() {
        let ca = gen_ca();
        let db = testdb::sqlite();
        insert_certificate(
            &db,
            &CertificateRecord::new("deadbeef", "default", Utc::now(), "pem"),
        )
        .unwrap();
        revoke_certificate(&db, "deadbeef", 1).unwrap();

        let err = new_crl_from_db(&db, ca.cert.as_bytes(), ca.key.as_bytes(), Duration::ZERO)
            .unwrap_err();
        assert!(matches!(err, CrlError::InvalidStoredSerial(ref s) if s == "deadbeef"));
        assert!(!err.to_string().contains("line"));
    }
}
