//! Decimal <-> smallest-unit conversion. Only log labels, reports and config
//! values cross this boundary; transactions always carry integers.

use anyhow::{Context, Result};
use ethers::types::U256;
use ethers::utils::{format_units, parse_units};

pub const NATIVE_DECIMALS: u32 = 18;

pub fn to_wei(amount: f64, decimals: u32) -> Result<U256> {
    if !amount.is_finite() || amount < 0.0 {
        anyhow::bail!("Invalid amount {}", amount);
    }
    // Display gives the shortest string that reads back as the same f64.
    decimal_str_to_wei(&amount.to_string(), decimals)
}

/// Parses a plain decimal string, dropping digits below the smallest unit.
pub fn decimal_str_to_wei(amount: &str, decimals: u32) -> Result<U256> {
    let truncated = match amount.split_once('.') {
        Some((whole, frac)) if frac.len() > decimals as usize => {
            format!("{}.{}", whole, &frac[..decimals as usize])
        }
        _ => amount.to_string(),
    };
    let parsed = parse_units(truncated.trim_end_matches('.'), decimals)
        .with_context(|| format!("Failed to convert {} to smallest units", amount))?;
    Ok(parsed.into())
}

pub fn from_wei(amount: U256, decimals: u32) -> String {
    format_units(amount, decimals).unwrap_or_else(|_| amount.to_string())
}

/// Lossy decimal value for display and comparisons in logs.
pub fn to_decimal(amount: U256, decimals: u32) -> f64 {
    from_wei(amount, decimals).parse().unwrap_or(0.0)
}

/// `amount * percent / 100`, rounded down.
pub fn percent_of(amount: U256, percent: u32) -> U256 {
    amount * U256::from(percent) / U256::from(100u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_amount_round_trip() {
        let wei = to_wei(0.00000123, NATIVE_DECIMALS).unwrap();
        assert_eq!(wei, U256::from(1_230_000_000_000u64));

        let back: f64 = from_wei(wei, NATIVE_DECIMALS).parse().unwrap();
        assert_eq!(back, 0.00000123);
    }

    #[test]
    fn test_no_float_noise_in_wei() {
        assert_eq!(to_wei(0.1, NATIVE_DECIMALS).unwrap(), U256::exp10(17));
        assert_eq!(to_wei(0.3, NATIVE_DECIMALS).unwrap(), U256::exp10(17) * 3);
        assert_eq!(
            to_wei(0.0000001, NATIVE_DECIMALS).unwrap(),
            U256::from(100_000_000_000u64)
        );
        // nearest f64 is exactly 1.0
        assert_eq!(
            to_wei(1.000000000000000001, NATIVE_DECIMALS).unwrap(),
            U256::exp10(18)
        );
    }

    #[test]
    fn test_extra_digits_truncated() {
        assert_eq!(
            decimal_str_to_wei("1.000000000000000001", NATIVE_DECIMALS).unwrap(),
            U256::exp10(18) + 1
        );
        assert_eq!(decimal_str_to_wei("0.1234567", 6).unwrap(), U256::from(123_456u64));
        assert_eq!(decimal_str_to_wei("2", 6).unwrap(), U256::from(2_000_000u64));
    }

    #[test]
    fn test_token_decimals() {
        assert_eq!(to_wei(1.5, 6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(from_wei(U256::from(1_500_000u64), 6), "1.500000");
    }

    #[test]
    fn test_negative_rejected() {
        assert!(to_wei(-1.0, NATIVE_DECIMALS).is_err());
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(U256::from(1000u64), 97), U256::from(970u64));
        assert_eq!(percent_of(U256::from(999u64), 50), U256::from(499u64));
    }
}
