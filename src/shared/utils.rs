//! Utility functions and helpers

use alloy_primitives::{I256, U256};

/// Format a fixed-point amount with `decimals` implied decimal places.
///
/// Uses integer arithmetic only, so values wider than an `f64` mantissa keep
/// every digit. Trailing zeros of the fractional part are trimmed and a zero
/// fraction is omitted entirely.
pub fn format_units(amount: U256, decimals: u8) -> String {
    let (whole, fractional) = match U256::from(10u64).checked_pow(U256::from(decimals)) {
        Some(divisor) => (amount / divisor, amount % divisor),
        // 10^decimals does not fit in 256 bits, so every digit is fractional
        None => (U256::ZERO, amount),
    };

    if fractional.is_zero() {
        return whole.to_string();
    }

    let padded = format!("{:0>width$}", fractional.to_string(), width = decimals as usize);
    format!("{}.{}", whole, padded.trim_end_matches('0'))
}

/// Signed variant of [`format_units`] for `int256` oracle values.
pub fn format_signed_units(amount: I256, decimals: u8) -> String {
    let magnitude = format_units(amount.unsigned_abs(), decimals);
    if amount.is_negative() {
        format!("-{}", magnitude)
    } else {
        magnitude
    }
}

/// Format a decimal integer string, e.g. a raw price copied from an explorer.
pub fn format_price_str(raw: &str, decimals: u8) -> Option<String> {
    let raw = raw.trim();
    if let Some(magnitude) = raw.strip_prefix('-') {
        let value = parse_decimal(magnitude)?;
        return Some(format!("-{}", format_units(value, decimals)));
    }
    parse_decimal(raw).map(|value| format_units(value, decimals))
}

/// Parse a human-readable decimal string back into its fixed-point integer.
///
/// Returns `None` when the string is not a plain non-negative decimal or has
/// more fractional digits than `decimals` can represent.
pub fn parse_units(formatted: &str, decimals: u8) -> Option<U256> {
    let (whole, fraction) = match formatted.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (formatted, ""),
    };
    if whole.is_empty() || fraction.len() > decimals as usize {
        return None;
    }

    let mut digits = String::with_capacity(whole.len() + decimals as usize);
    digits.push_str(whole);
    digits.push_str(fraction);
    for _ in fraction.len()..decimals as usize {
        digits.push('0');
    }
    parse_decimal(&digits)
}

fn parse_decimal(digits: &str) -> Option<U256> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    U256::from_str_radix(digits, 10).ok()
}

/// Convert basis points to a percentage with two implied decimals.
pub fn bps_to_percentage(bps: i64) -> f64 {
    bps as f64 / 100.0
}

/// Render a percentage change with an explicit sign, e.g. `+2.50%`.
pub fn format_percentage_change(percentage: f64) -> String {
    let sign = if percentage >= 0.0 { "+" } else { "" };
    format!("{}{:.2}%", sign, percentage)
}

/// Generate unique ID
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_zero_for_any_decimals() {
        for decimals in [0u8, 1, 8, 18, 77, 78, 255] {
            assert_eq!(format_units(U256::ZERO, decimals), "0");
        }
    }

    #[test]
    fn test_format_trims_trailing_zeros() {
        assert_eq!(format_units(U256::from(9_750_000_000_000u64), 8), "97500");
        assert_eq!(format_units(U256::from(345_250_000_000u64), 8), "3452.5");
        assert_eq!(format_units(U256::from(1u64), 8), "0.00000001");
        assert_eq!(format_units(U256::from(120u64), 0), "120");
    }

    #[test]
    fn test_format_beyond_f64_precision() {
        // 2^64 + 1 wei, not representable as f64
        let raw = U256::from(u64::MAX) + U256::from(2u64);
        assert_eq!(format_units(raw, 18), "18.446744073709551617");
    }

    #[test]
    fn test_format_with_oversized_decimals() {
        assert_eq!(format_units(U256::from(5u64), 80), format!("0.{}5", "0".repeat(79)));
    }

    #[test]
    fn test_format_never_ends_with_zero_after_point() {
        for raw in [10u64, 100, 1_000_010, 123_456_789_000, 5] {
            let formatted = format_units(U256::from(raw), 6);
            if formatted.contains('.') {
                assert!(!formatted.ends_with('0'), "{}", formatted);
            }
        }
    }

    #[test]
    fn test_format_signed() {
        assert_eq!(format_signed_units(I256::try_from(-150_000_000i64).unwrap(), 8), "-1.5");
        assert_eq!(format_signed_units(I256::try_from(150_000_000i64).unwrap(), 8), "1.5");
    }

    #[test]
    fn test_parse_units_reverses_format() {
        for raw in [0u64, 1, 100_000_000, 9_750_012_345_678, 42] {
            let value = U256::from(raw);
            let formatted = format_units(value, 8);
            assert_eq!(parse_units(&formatted, 8), Some(value));
        }
    }

    #[test]
    fn test_parse_units_rejects_excess_precision() {
        assert_eq!(parse_units("1.123", 2), None);
        assert_eq!(parse_units("abc", 2), None);
        assert_eq!(parse_units(".5", 2), None);
    }

    #[test]
    fn test_format_price_str() {
        assert_eq!(format_price_str("6543210000000", 8).as_deref(), Some("65432.1"));
        assert_eq!(format_price_str("-5", 1).as_deref(), Some("-0.5"));
        assert_eq!(format_price_str("12x", 8), None);
    }

    #[test]
    fn test_bps_to_percentage() {
        assert_eq!(bps_to_percentage(250), 2.5);
        assert_eq!(bps_to_percentage(-75), -0.75);
    }

    #[test]
    fn test_format_percentage_change() {
        assert_eq!(format_percentage_change(2.5), "+2.50%");
        assert_eq!(format_percentage_change(0.0), "+0.00%");
        assert_eq!(format_percentage_change(-1.234), "-1.23%");
    }
}
