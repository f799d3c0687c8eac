use crate::core::error::{AuditError, AuditResult};

/// Unit suffixes accepted by [`parse_size`], lower-cased, with their multipliers.
///
/// SI suffixes are powers of 1000, IEC suffixes (`ki`, `kib`, ...) powers of 1024.
/// An empty suffix means plain bytes.
const UNITS: &[(&str, f64)] = &[
    ("", 1.0),
    ("b", 1.0),
    ("k", 1e3),
    ("kb", 1e3),
    ("m", 1e6),
    ("mb", 1e6),
    ("g", 1e9),
    ("gb", 1e9),
    ("t", 1e12),
    ("tb", 1e12),
    ("p", 1e15),
    ("pb", 1e15),
    ("e", 1e18),
    ("eb", 1e18),
    ("ki", 1024.0),
    ("kib", 1024.0),
    ("mi", 1_048_576.0),
    ("mib", 1_048_576.0),
    ("gi", 1_073_741_824.0),
    ("gib", 1_073_741_824.0),
    ("ti", 1_099_511_627_776.0),
    ("tib", 1_099_511_627_776.0),
    ("pi", 1_125_899_906_842_624.0),
    ("pib", 1_125_899_906_842_624.0),
    ("ei", 1_152_921_504_606_846_976.0),
    ("eib", 1_152_921_504_606_846_976.0),
];

/// Parses a human-readable size such as `10kb`, `1MB`, `1.5 MiB` or `42` into bytes.
///
/// The numeric part may contain digits, `.` and `,` (commas are ignored, so
/// `1,000` is a thousand). Units are matched case-insensitively after trimming
/// whitespace. Fractional results are truncated toward zero.
///
/// # Errors
/// Returns [`AuditError::InvalidSizeLimit`] when the number is missing or
/// malformed, the unit is unknown, or the value does not fit in a `u64`.
pub fn parse_size(input: &str) -> AuditResult<u64> {
    let invalid = |reason: &str| AuditError::InvalidSizeLimit {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let number: String = number.chars().filter(|c| *c != ',').collect();
    if number.is_empty() {
        return Err(invalid("missing numeric value"));
    }
    let value: f64 = number
        .parse()
        .map_err(|_| invalid("malformed numeric value"))?;

    let unit = unit.trim().to_ascii_lowercase();
    let multiplier = UNITS
        .iter()
        .find(|(suffix, _)| *suffix == unit)
        .map(|(_, m)| *m)
        .ok_or_else(|| invalid(&format!("unknown unit '{unit}'")))?;

    let bytes = value * multiplier;
    // 2^64 as f64; anything at or above it does not fit.
    if bytes >= 18_446_744_073_709_551_616.0 {
        return Err(invalid("value too large"));
    }
    Ok(bytes as u64)
}

/// Caps a parsed size at the largest signed 64-bit value.
pub fn clamp_threshold(bytes: u64) -> u64 {
    bytes.min(i64::MAX as u64)
}
