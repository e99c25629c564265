use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::StoreError;

/// Revocation state of an issued certificate.
///
/// A certificate moves from `Good` to `Revoked` once and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    #[default]
    Good,
    Revoked,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateStatus::Good => "good",
            CertificateStatus::Revoked => "revoked",
        }
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CertificateStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "good" => Ok(CertificateStatus::Good),
            "revoked" => Ok(CertificateStatus::Revoked),
            other => Err(StoreError::Decode(format!(
                "unknown certificate status {other:?}"
            ))),
        }
    }
}

/// A certificate and its metadata as recorded in the `certificates` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateRecord {
    /// Unique, immutable identifier of the certificate.
    pub serial: String,
    /// Issuing authority or signing profile.
    pub ca_label: String,
    pub status: CertificateStatus,
    /// RFC 5280 reason code; only meaningful once revoked.
    pub reason: i64,
    pub expiry: DateTime<Utc>,
    /// Set by revocation, `None` while the certificate is good.
    pub revoked_at: Option<DateTime<Utc>>,
    pub pem: String,
}

impl CertificateRecord {
    /// A freshly issued, good certificate.
    pub fn new(
        serial: impl Into<String>,
        ca_label: impl Into<String>,
        expiry: DateTime<Utc>,
        pem: impl Into<String>,
    ) -> Self {
        Self {
            serial: serial.into(),
            ca_label: ca_label.into(),
            status: CertificateStatus::Good,
            reason: 0,
            expiry,
            revoked_at: None,
            pem: pem.into(),
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.status == CertificateStatus::Revoked
    }
}

/// A cached OCSP response body, keyed by certificate serial.
///
/// There is no referential link to [`CertificateRecord`]: a cached response
/// may lag behind the certificate's status until the OCSP refresher catches
/// up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcspRecord {
    pub serial: String,
    pub body: String,
    pub expiry: DateTime<Utc>,
}
