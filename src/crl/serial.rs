use num_bigint::BigUint;
use tracing::warn;

use super::errors::{CrlError, CrlResult};

/// Parse one decimal serial number.
///
/// Surrounding whitespace is ignored. Anything other than ASCII digits,
/// including a sign, yields `None`.
pub fn parse_serial(value: &str) -> Option<BigUint> {
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    BigUint::parse_bytes(trimmed.as_bytes(), 10)
}

/// Parse a serial list: one decimal serial per line, blank lines skipped.
///
/// A single malformed line rejects the whole list. Line numbers in errors
/// are 1-based.
pub fn parse_serial_list(input: &[u8]) -> CrlResult<Vec<BigUint>> {
    let text = String::from_utf8_lossy(input);
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, value)| {
            parse_serial(value).ok_or_else(|| {
                let value = value.trim();
                warn!("Rejecting serial {value:?} on line {}", idx + 1);
                CrlError::InvalidSerial {
                    line: idx + 1,
                    value: value.to_string(),
                }
            })
        })
        .collect()
}
