//! Fixed-point amount conversion between decimal strings and base units

use alloy::primitives::U256;

/// Largest decimal precision whose scale still fits in a `U256`.
pub const MAX_DECIMALS: u8 = 77;

/// Wei per gwei
pub const GWEI: f64 = 1e9;

/// Parse a decimal string into base units, truncating toward zero any
/// fractional digits beyond `decimals`.
///
/// Accepts `123`, `123.45`, `.5`, `5.`, an optional leading `+` and a base-10
/// exponent such as `1e18`, `1.5E-3` or `2e+2`. Returns `None` for signs other
/// than `+` on the value, empty input or overflow.
/// Zero is returned as `Some(0)`; rejecting it is up to the caller.
pub fn parse_units_truncated(value: &str, decimals: u8) -> Option<U256> {
    if decimals > MAX_DECIMALS {
        return None;
    }

    let value = value.trim();
    let value = value.strip_prefix('+').unwrap_or(value);

    let (mantissa, exponent) = match value.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (mantissa, parse_exponent(exponent)?),
        None => (value, 0),
    };

    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    // value = digits * 10^(exponent - frac_len); base units move the point `decimals` further.
    let digits = format!("{}{}", int_part, frac_part);
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Some(U256::ZERO);
    }
    let shift = i64::from(decimals) + i64::from(exponent) - frac_part.len() as i64;

    if shift >= 0 {
        let scale = u8::try_from(shift).ok().and_then(pow10)?;
        U256::from_str_radix(digits, 10).ok()?.checked_mul(scale)
    } else {
        let dropped = usize::try_from(-shift).ok()?;
        if dropped >= digits.len() {
            return Some(U256::ZERO);
        }
        U256::from_str_radix(&digits[..digits.len() - dropped], 10).ok()
    }
}

/// Render base units as a decimal string without trailing zeros.
pub fn format_units_trimmed(amount: U256, decimals: u8) -> String {
    let Some(scale) = pow10(decimals) else {
        return amount.to_string();
    };

    let int_part = amount / scale;
    let frac_part = amount % scale;
    if frac_part.is_zero() {
        return int_part.to_string();
    }

    let frac = format!("{:0>width$}", frac_part.to_string(), width = decimals as usize);
    format!("{}.{}", int_part, frac.trim_end_matches('0'))
}

/// Convert a gwei price to wei, flooring sub-wei remainders.
pub fn gwei_to_wei(gwei: f64) -> Option<u128> {
    if !gwei.is_finite() || gwei < 0.0 {
        return None;
    }
    Some((gwei * GWEI).floor() as u128)
}

/// Checked sum of base-unit amounts.
pub fn checked_total<'a>(amounts: impl IntoIterator<Item = &'a U256>) -> Option<U256> {
    amounts
        .into_iter()
        .try_fold(U256::ZERO, |acc, amount| acc.checked_add(*amount))
}

fn parse_exponent(raw: &str) -> Option<i32> {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn pow10(exp: u8) -> Option<U256> {
    U256::from(10u64).checked_pow(U256::from(exp))
}
