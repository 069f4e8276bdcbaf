//! Fixed-point conversions for on-chain quantities.

use num_bigint::BigUint;

pub const ETHER_DECIMALS: u32 = 18;
pub const GWEI_DECIMALS: u32 = 9;

/// Parses a base-16 quantity, with or without the `0x` prefix.
pub fn parse_hex(raw: &str) -> Option<BigUint> {
    let raw = raw.trim();
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    if digits.is_empty() {
        return Some(BigUint::default());
    }
    BigUint::parse_bytes(digits.as_bytes(), 16)
}

/// Parses a decimal quantity, or a hex one when it carries the `0x` prefix.
pub fn parse_quantity(raw: &str) -> Option<BigUint> {
    let raw = raw.trim();
    if raw.starts_with("0x") || raw.starts_with("0X") {
        return parse_hex(raw);
    }
    BigUint::parse_bytes(raw.as_bytes(), 10)
}

/// Renders `value / 10^decimals` exactly, trailing zeros trimmed.
pub fn format_units(value: &BigUint, decimals: u32) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }
    let padded = if digits.len() <= decimals {
        format!("{}{digits}", "0".repeat(decimals + 1 - digits.len()))
    } else {
        digits
    };
    let (int, frac) = padded.split_at(padded.len() - decimals);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        int.to_string()
    } else {
        format!("{int}.{frac}")
    }
}

/// `value / 10^decimals` as a float, for display-only figures.
pub fn to_unit_f64(value: &BigUint, decimals: u32) -> f64 {
    format_units(value, decimals).parse().unwrap_or_default()
}

pub fn hex_to_ether(raw: &str) -> Option<String> {
    parse_hex(raw).map(|v| format_units(&v, ETHER_DECIMALS))
}

pub fn wei_to_ether(raw: &str) -> Option<String> {
    parse_quantity(raw).map(|v| format_units(&v, ETHER_DECIMALS))
}

pub fn hex_to_decimal(raw: &str) -> Option<String> {
    parse_hex(raw).map(|v| v.to_string())
}
