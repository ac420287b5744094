use crate::error::CacheControlError;

/// Seconds per duration unit. A year is a fixed 365 days.
pub const UNITS_TO_SECONDS: [(char, u64); 6] = [
    ('s', 1),
    ('m', 60),
    ('h', 3600),
    ('d', 86400),
    ('w', 604800),
    ('y', 31536000),
];

pub fn unit_seconds(unit: char) -> Option<u64> {
    UNITS_TO_SECONDS
        .iter()
        .find(|(u, _)| *u == unit)
        .map(|(_, seconds)| *seconds)
}

/// Parses a `<integer><unit>` duration string such as `"5s"` or `"1y"` into seconds.
///
/// The amount must be plain ASCII digits: no sign, whitespace or decimals.
pub fn parse_duration(value: &str) -> Result<u64, CacheControlError> {
    let unit = value
        .chars()
        .last()
        .ok_or_else(|| invalid(value, "duration is empty".to_string()))?;

    let multiplier = unit_seconds(unit).ok_or_else(|| {
        let units: Vec<String> = UNITS_TO_SECONDS.iter().map(|(u, _)| u.to_string()).collect();
        invalid(
            value,
            format!("invalid unit \"{}\", must be in {}", unit, units.join(", ")),
        )
    })?;

    let amount = &value[..value.len() - unit.len_utf8()];
    if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(value, format!("\"{}\" is not a whole number", amount)));
    }

    amount
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(|| invalid(value, "duration is too large".to_string()))
}

fn invalid(value: &str, reason: String) -> CacheControlError {
    CacheControlError::InvalidDuration {
        value: value.to_string(),
        reason,
    }
}
