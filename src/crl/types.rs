use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use openssl::x509::X509Crl;
use x509_parser::prelude::*;

use super::errors::{CrlError, CrlResult};
use super::signer::CrlIssuer;

/// One revoked certificate as listed in a CRL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokedEntry {
    pub serial: BigUint,
    pub revoked_at: DateTime<Utc>,
    /// RFC 5280 CRLReason code, if the entry carries one.
    pub reason: Option<u8>,
}

impl RevokedEntry {
    pub fn new(serial: BigUint, revoked_at: DateTime<Utc>) -> Self {
        Self {
            serial,
            revoked_at,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: Option<u8>) -> Self {
        self.reason = reason;
        self
    }
}

/// Represents a decoded Certificate Revocation List
#[derive(Debug, Clone)]
pub struct CrlData {
    /// The raw CRL data in DER format
    pub der_data: Vec<u8>,
    pub this_update: DateTime<Utc>,
    pub next_update: Option<DateTime<Utc>>,
    pub crl_number: Option<BigUint>,
    pub entries: Vec<RevokedEntry>,
}

fn asn1_time(time: &ASN1Time) -> CrlResult<DateTime<Utc>> {
    DateTime::from_timestamp(time.timestamp(), 0)
        .ok_or_else(|| CrlError::Time(format!("{time} is out of range")))
}

impl CrlData {
    /// Decode a CRL from DER data
    pub fn from_der(der_data: Vec<u8>) -> CrlResult<Self> {
        let (this_update, next_update, crl_number, entries) = {
            let (_, crl) = CertificateRevocationList::from_der(&der_data)
                .map_err(|e| CrlError::Parse(e.into()))?;

            let entries = crl
                .iter_revoked_certificates()
                .map(|revoked| {
                    let serial = BigUint::from_bytes_be(&revoked.user_certificate.to_bytes_be());
                    let reason = revoked.reason_code().map(|(_, code)| code.0);
                    let revoked_at = asn1_time(&revoked.revocation_date)?;
                    Ok(RevokedEntry::new(serial, revoked_at).with_reason(reason))
                })
                .collect::<CrlResult<Vec<_>>>()?;

            let next_update = match crl.next_update() {
                Some(t) => Some(asn1_time(&t)?),
                None => None,
            };
            let crl_number = crl
                .crl_number()
                .map(|n| BigUint::from_bytes_be(&n.to_bytes_be()));

            (asn1_time(&crl.last_update())?, next_update, crl_number, entries)
        };

        Ok(Self {
            der_data,
            this_update,
            next_update,
            crl_number,
            entries,
        })
    }

    /// Get list of revoked certificate serial numbers
    pub fn revoked_serials(&self) -> Vec<BigUint> {
        self.entries.iter().map(|e| e.serial.clone()).collect()
    }

    /// Check the CRL signature against the issuer's public key
    pub fn verify(&self, issuer: &CrlIssuer) -> CrlResult<()> {
        let crl = X509Crl::from_der(&self.der_data)?;
        if crl.verify(issuer.public_key())? {
            Ok(())
        } else {
            Err(CrlError::SignatureVerification)
        }
    }
}
