use chrono::{DateTime, Utc};
use openssl::pkey::{PKey, Public};
use openssl::x509::X509;
use rcgen::{
    CertificateRevocationListParams, Issuer, KeyIdMethod, KeyPair, RevocationReason,
    RevokedCertParams, SerialNumber,
};
use time::OffsetDateTime;
use tracing::debug;

use super::errors::{CrlError, CrlResult};
use super::types::RevokedEntry;

/// Issuer certificate and private key, parsed and cross-checked.
pub struct CrlIssuer {
    issuer: Issuer<'static, KeyPair>,
    public_key: PKey<Public>,
}

impl std::fmt::Debug for CrlIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrlIssuer").finish_non_exhaustive()
    }
}

impl CrlIssuer {
    /// Parse a PEM issuer certificate and its PEM private key.
    ///
    /// PKCS#8, PKCS#1 and SEC1 keys are accepted. The key must belong to the
    /// certificate.
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> CrlResult<Self> {
        let cert = X509::from_pem(cert_pem)?;
        let private_key = PKey::private_key_from_pem(key_pem).inspect_err(|e| {
            debug!("Malformed private key {e}");
        })?;

        let public_key = cert.public_key()?;
        if !public_key.public_eq(&private_key) {
            return Err(CrlError::KeyMismatch);
        }

        let pkcs8 = private_key.private_key_to_pem_pkcs8()?;
        let key_pair = KeyPair::from_pem(&String::from_utf8_lossy(&pkcs8))?;
        let cert_pem = cert.to_pem()?;
        let issuer = Issuer::from_ca_cert_pem(&String::from_utf8_lossy(&cert_pem), key_pair)?;

        Ok(Self { issuer, public_key })
    }

    pub fn public_key(&self) -> &PKey<Public> {
        &self.public_key
    }
}

fn offset_time(t: DateTime<Utc>) -> CrlResult<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(t.timestamp()).map_err(|e| CrlError::Time(e.to_string()))
}

/// Map an RFC 5280 CRLReason code onto the CRL entry extension.
///
/// `unspecified` (0) is left out, as are codes RFC 5280 does not define.
pub fn revocation_reason(code: u8) -> Option<RevocationReason> {
    Some(match code {
        1 => RevocationReason::KeyCompromise,
        2 => RevocationReason::CaCompromise,
        3 => RevocationReason::AffiliationChanged,
        4 => RevocationReason::Superseded,
        5 => RevocationReason::CessationOfOperation,
        6 => RevocationReason::CertificateHold,
        8 => RevocationReason::RemoveFromCrl,
        9 => RevocationReason::PrivilegeWithdrawn,
        10 => RevocationReason::AaCompromise,
        _ => return None,
    })
}

/// Sign a DER-encoded CRL listing `entries`.
///
/// `thisUpdate` is the time of the call and also seeds the CRL number, so
/// numbers grow across regenerations.
pub fn create_generic_crl(
    entries: &[RevokedEntry],
    issuer: &CrlIssuer,
    next_update: DateTime<Utc>,
) -> CrlResult<Vec<u8>> {
    let this_update = OffsetDateTime::now_utc();

    let revoked_certs = entries
        .iter()
        .map(|entry| {
            Ok(RevokedCertParams {
                serial_number: SerialNumber::from_slice(&entry.serial.to_bytes_be()),
                revocation_time: offset_time(entry.revoked_at)?,
                reason_code: entry.reason.and_then(revocation_reason),
                invalidity_date: None,
            })
        })
        .collect::<CrlResult<Vec<_>>>()?;

    let params = CertificateRevocationListParams {
        this_update,
        next_update: offset_time(next_update)?,
        crl_number: SerialNumber::from_slice(
            &(this_update.unix_timestamp_nanos() / 1_000_000).to_be_bytes(),
        ),
        issuing_distribution_point: None,
        revoked_certs,
        key_identifier_method: KeyIdMethod::Sha256,
    };

    let crl = params.signed_by(&issuer.issuer).inspect_err(|e| {
        debug!("error creating CRL: {e}");
    })?;
    Ok(crl.der().to_vec())
}
