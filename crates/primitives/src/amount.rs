//! Decimal string helpers for token amounts.
//!
//! Token amounts travel as integer strings in the ticker's base units.
//! Redemption documents present them in human decimal form, so we need a
//! lossless pair of conversions between the two representations.

/// Renders an integer base-unit string as a decimal string with `decimals`
/// fractional digits. `format_number_string("49000", 3)` is `"49.000"`.
pub fn format_number_string(value: &str, decimals: u32) -> String {
    if decimals == 0 {
        return value.to_string();
    }

    let len = value.len() as i64;
    let pos = len - decimals as i64;
    if pos > 0 {
        let (int, frac) = value.split_at(pos as usize);
        format!("{int}.{frac}")
    } else {
        format!("0.{}{}", "0".repeat((-pos) as usize), value)
    }
}

/// Inverse of [`format_number_string`]: resolves a decimal string back to an
/// integer base-unit string, padding or truncating the fractional part to
/// `decimals` digits and stripping leading zeros. Never fails; anything that
/// collapses to nothing becomes `"0"`.
pub fn resolve_number_string(value: &str, decimals: u32) -> String {
    let mut parts: Vec<String> = value.splitn(2, '.').map(str::to_owned).collect();
    if parts.len() == 1 && decimals > 0 {
        parts.push(String::new());
    }

    let joined = if parts.len() > 1 {
        let mut frac = parts[1].clone();
        while (frac.len() as u32) < decimals {
            frac.push('0');
        }
        frac.truncate(decimals as usize);

        let int = if parts[0] == "0" { "" } else { parts[0].as_str() };
        let joined = format!("{int}{frac}");
        if joined.is_empty() || joined.bytes().all(|b| b == b'0') {
            "0".to_string()
        } else {
            joined
        }
    } else {
        value.to_string()
    };

    let trimmed = joined.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Rescales a base-unit value from `decimals_a` to `decimals_b` precision.
pub fn normalize_value(value: u128, decimals_a: u32, decimals_b: u32) -> u128 {
    if decimals_a > decimals_b {
        value / 10u128.pow(decimals_a - decimals_b)
    } else if decimals_a < decimals_b {
        value * 10u128.pow(decimals_b - decimals_a)
    } else {
        value
    }
}
