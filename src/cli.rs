//! The `gencrl` command.
//!
//! If `--db-config` is given, revoked certificates are read from the
//! certificate store it describes. Otherwise a text file with one serial
//! number per line is required (`-` reads it from standard input).

use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use clap::{Parser, ValueEnum};
use config::ConfigError;
use thiserror::Error;
use tracing::{debug, info};

use crate::certdb::{self, StoreError};
use crate::config::DbConfig;
use crate::crl::{CrlData, CrlError, new_crl_from_db, new_crl_from_file};

const STDIN_PATH: &str = "-";

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Usage(&'static str),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to load DB config: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Crl(#[from] CrlError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Raw DER bytes
    #[default]
    Der,
    /// One line of base64-encoded DER
    Base64,
    /// PEM with an `X509 CRL` label
    Pem,
}

/// Generate a new Certificate Revocation List
#[derive(Debug, Clone, Parser)]
#[command(name = "gencrl", version)]
pub struct GencrlArgs {
    /// CA certificate (PEM)
    #[arg(long = "ca", value_name = "CERT", env = "GENCRL_CA")]
    pub ca: Option<String>,

    /// CA private key (PEM)
    #[arg(long = "ca-key", value_name = "KEY", env = "GENCRL_CA_KEY")]
    pub ca_key: Option<String>,

    /// How long the CRL stays valid, e.g. 24h or 1h30m; 0 means one week
    #[arg(long, value_name = "DURATION", value_parser = parse_duration, default_value = "0")]
    pub crl_expiry: Duration,

    /// Certificate store connection config; revoked certificates are read from it
    #[arg(long, value_name = "FILE")]
    pub db_config: Option<String>,

    /// Output encoding of the signed CRL
    #[arg(long, value_enum, default_value_t = OutputFormat::Der)]
    pub format: OutputFormat,

    /// Text file with one serial number per line, `-` for stdin
    #[arg(value_name = "SERIAL_LIST")]
    pub serial_list: Vec<String>,
}

/// Where the revoked serials come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevocationSource<'a> {
    Database(&'a str),
    SerialList(&'a str),
}

impl GencrlArgs {
    /// Check flag combinations before any input is read.
    pub fn validate(&self) -> Result<(RevocationSource<'_>, &str, &str), CliError> {
        let source = match (self.db_config.as_deref(), self.serial_list.as_slice()) {
            (Some(_), [_, ..]) => {
                return Err(CliError::Usage(
                    "Only provide either DB config file (with -db-config) or serial list",
                ));
            }
            (None, []) => {
                return Err(CliError::Usage(
                    "Need to provide either DB config file (with -db-config) or serial list",
                ));
            }
            (None, [_, _, ..]) => {
                return Err(CliError::Usage(
                    "Provided too many arguments, only expected one",
                ));
            }
            (Some(db_config), []) => RevocationSource::Database(db_config),
            (None, [serial_list]) => RevocationSource::SerialList(serial_list.as_str()),
        };

        let ca = self
            .ca
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(CliError::Usage("Need a CA certificate (provide one with -ca)"))?;
        let ca_key = self
            .ca_key
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(CliError::Usage("Need a CA key (provide one with -ca-key)"))?;

        Ok((source, ca, ca_key))
    }
}

/// Read a file, or standard input for `-`.
pub fn read_input(path: &str) -> Result<Vec<u8>, CliError> {
    let read_err = |source| CliError::Read {
        path: path.to_string(),
        source,
    };

    if path == STDIN_PATH {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf).map_err(read_err)?;
        Ok(buf)
    } else {
        std::fs::read(path).map_err(read_err)
    }
}

/// Run the command and return the encoded CRL to print.
pub fn run(args: &GencrlArgs) -> Result<Vec<u8>, CliError> {
    let (source, ca, ca_key) = args.validate()?;

    let cert = read_input(ca)?;
    let key = read_input(ca_key)?;

    let der = match source {
        RevocationSource::SerialList(path) => {
            debug!("Reading serial list from {path}");
            let serials = read_input(path)?;
            new_crl_from_file(&serials, &cert, &key, args.crl_expiry)?
        }
        RevocationSource::Database(path) => {
            let config = DbConfig::load(Path::new(path))?;
            let db = certdb::open(&config)?;
            new_crl_from_db(&db, &cert, &key, args.crl_expiry)?
        }
    };

    let crl = CrlData::from_der(der)?;
    info!(
        "Generated CRL with {} entries, valid until {}",
        crl.entries.len(),
        crl.next_update
            .map_or_else(|| "unspecified".to_string(), |t| t.to_rfc3339())
    );

    Ok(encode_output(&crl.der_data, args.format))
}

pub fn encode_output(der: &[u8], format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Der => der.to_vec(),
        OutputFormat::Base64 => format!("{}\n", STANDARD.encode(der)).into_bytes(),
        OutputFormat::Pem => {
            let encoded = STANDARD.encode(der);
            let mut pem = String::from("-----BEGIN X509 CRL-----\n");
            // base64 output is ASCII, so byte chunks are valid str slices
            for chunk in encoded.as_bytes().chunks(64) {
                pem.push_str(&String::from_utf8_lossy(chunk));
                pem.push('\n');
            }
            pem.push_str("-----END X509 CRL-----\n");
            pem.into_bytes()
        }
    }
}

fn unit_nanos(unit: &str) -> Option<f64> {
    Some(match unit {
        "ns" => 1.0,
        "us" | "µs" | "μs" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        "m" => 60e9,
        "h" => 3600e9,
        _ => return None,
    })
}

/// Parse a duration such as `24h`, `1h30m`, `1.5s` or `0`.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let invalid = || format!("invalid duration {input:?}");
    let s = input.trim();
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(invalid());
    }

    let mut total = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| format!("missing unit in duration {input:?}"))?;
        let (number, tail) = rest.split_at(number_len);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);

        let value: f64 = number.parse().map_err(|_| invalid())?;
        let scale = unit_nanos(unit)
            .ok_or_else(|| format!("unknown unit {unit:?} in duration {input:?}"))?;
        total += value * scale;
        rest = tail;
    }

    if !total.is_finite() || total >= u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(total.round() as u64))
}
