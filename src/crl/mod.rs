//! Certificate Revocation List (CRL) generation
//!
//! Revoked-certificate facts are gathered either from a flat serial list or
//! from the certificate store, then signed into a DER-encoded X.509 CRL
//! (RFC 5280) by the issuing CA.
//!
//! # Features
//! - Serial list parsing that rejects malformed serials
//! - CRL assembly from the certificate store, with reason codes
//! - CRL signing with CRL number and authority key identifier
//! - Decoding and signature verification of produced CRLs

mod assembler;
mod errors;
mod serial;
mod signer;
mod types;

// Re-export public types
pub use assembler::{ONE_WEEK, new_crl_from_db, new_crl_from_file, resolve_next_update};
pub use errors::{CrlError, CrlResult};
pub use serial::{parse_serial, parse_serial_list};
pub use signer::{CrlIssuer, create_generic_crl, revocation_reason};
pub use types::{CrlData, RevokedEntry};
