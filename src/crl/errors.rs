use thiserror::Error;
use x509_parser::prelude::X509Error;

use crate::certdb::StoreError;

/// CRL-related errors
#[derive(Error, Debug)]
pub enum CrlError {
    #[error("CRL parsing failed: {0}")]
    Parse(#[from] X509Error),

    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    #[error("Issuer key does not match the issuer certificate")]
    KeyMismatch,

    #[error("Invalid serial number {value:?} on line {line}")]
    InvalidSerial { line: usize, value: String },

    #[error("Stored certificate serial {0:?} is not a decimal number")]
    InvalidStoredSerial(String),

    #[error("Revoked certificate {0} has no revocation time")]
    MissingRevocationTime(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("CRL signing failed: {0}")]
    Sign(#[from] rcgen::Error),

    #[error("Timestamp out of range: {0}")]
    Time(String),

    #[error("CRL signature verification failed")]
    SignatureVerification,
}

/// Convenient Result type alias
pub type CrlResult<T> = Result<T, CrlError>;
