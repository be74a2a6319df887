//! Display Formatting
//!
//! Conversions between nano-unit integers and what a person types or reads.
//! Display is the only place floating point appears in the wallet.

use anyhow::{anyhow, bail, Result};
use gluon_reactor::math::NANO;

const DECIMALS: usize = 9;

/// Format a nano-unit amount as a whole-unit decimal.
pub fn format_amount(nano: u64) -> String {
    format!("{:.6}", nano as f64 / NANO as f64)
}

/// Format a nanoERG amount with its unit.
pub fn format_erg(nano: u64) -> String {
    format!("{} ERG", format_amount(nano))
}

/// Format a nano-percent value such as a reserve ratio.
pub fn format_percent(nano_percent: u64) -> String {
    format!("{:.2}%", nano_percent as f64 / NANO as f64)
}

/// Format a NANO-scaled ratio as a percentage.
pub fn format_ratio(scaled: u64) -> String {
    format!("{:.4}%", scaled as f64 * 100.0 / NANO as f64)
}

/// Parse a whole-unit decimal such as `"1.5"` or `"2 ERG"` into nano-units.
///
/// Exact: more than nine fractional digits is an error, never a rounding.
pub fn parse_amount(input: &str) -> Result<u64> {
    let s = input.trim().trim_end_matches("ERG").trim_end();
    if s.is_empty() {
        bail!("Amount is empty");
    }
    if s.starts_with('-') {
        bail!("Amount cannot be negative");
    }

    let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));
    if whole.is_empty() && fraction.is_empty() {
        bail!("Invalid amount format: {input}");
    }
    if fraction.len() > DECIMALS {
        bail!("Amount has more than {DECIMALS} decimal places: {input}");
    }
    let digits = |part: &str| -> Result<u64> {
        if part.is_empty() {
            return Ok(0);
        }
        if !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(anyhow!("Invalid amount format: {input}"));
        }
        part.parse()
            .map_err(|_| anyhow!("Amount is too large: {input}"))
    };

    let whole = digits(whole)?;
    let fraction = digits(fraction)? * 10u64.pow((DECIMALS - fraction.len()) as u32);
    whole
        .checked_mul(NANO)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(|| anyhow!("Amount is too large: {input}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(1_000_000_000), "1.000000");
        assert_eq!(format_amount(500_000_000), "0.500000");
        assert_eq!(format_erg(2_456_250_000), "2.456250 ERG");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(200_000_000_000), "200.00%");
        assert_eq!(format_percent(24_242_424_242), "24.24%");
        assert_eq!(format_ratio(400_000_000), "40.0000%");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1").unwrap(), 1_000_000_000);
        assert_eq!(parse_amount("0.5").unwrap(), 500_000_000);
        assert_eq!(parse_amount(".25").unwrap(), 250_000_000);
        assert_eq!(parse_amount("2.000000001 ERG").unwrap(), 2_000_000_001);
        assert_eq!(parse_amount(" 3. ").unwrap(), 3_000_000_000);
    }

    #[test]
    fn test_parse_amount_rejects() {
        for bad in ["", "ERG", "-1", "1.0000000001", "1,5", "abc", ".", "1e9"] {
            assert!(parse_amount(bad).is_err(), "{bad:?} should be rejected");
        }
        assert!(parse_amount("18446744074").is_err());
    }
}
