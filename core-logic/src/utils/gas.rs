//! # Core Logic - Gas Policy
//!
//! Chain-agnostic retry gas policy. Chain crates own the actual fee lookups;
//! this module only holds the knobs and the escalation arithmetic.

use crate::error::ConfigError;
use serde::Deserialize;
use std::time::Duration;

/// `[gas]` section of a chain config.
#[derive(Debug, Clone, Deserialize)]
pub struct GasConfig {
    /// Gas limit multiplier applied per retry, e.g. `1.1`.
    #[serde(default = "default_escalation_factor")]
    pub escalation_factor: f64,
    /// Percent added on top of `base + priority` for the EIP-1559 max fee.
    #[serde(default = "default_fee_bump_percent")]
    pub fee_bump_percent: u64,
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            escalation_factor: default_escalation_factor(),
            fee_bump_percent: default_fee_bump_percent(),
            receipt_timeout_secs: default_receipt_timeout_secs(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
        }
    }
}

impl GasConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.escalation_factor.is_finite() || self.escalation_factor < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "gas.escalation_factor".to_string(),
                reason: format!("must be >= 1.0, got {}", self.escalation_factor),
            });
        }
        if self.receipt_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "gas.receipt_timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Escalation factor in basis points (1.1 -> 11000).
    pub fn escalation_bps(&self) -> u64 {
        (self.escalation_factor * BPS as f64).round() as u64
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}

fn default_escalation_factor() -> f64 {
    1.1
}

fn default_fee_bump_percent() -> u64 {
    5
}

fn default_receipt_timeout_secs() -> u64 {
    400
}

fn default_receipt_poll_interval_ms() -> u64 {
    2000
}

const BPS: u64 = 10_000;

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Gas limit for 1-based `attempt`: `floor(initial * (factor_bps / 10000)^(attempt - 1))`.
///
/// Exact in integers while the intermediate powers fit in `u128`; falls back
/// to floating point beyond that.
pub fn escalate_gas(initial: u64, factor_bps: u64, attempt: u32) -> u64 {
    if attempt <= 1 || factor_bps == BPS {
        return initial;
    }
    let exp = attempt - 1;

    let g = gcd(factor_bps, BPS).max(1);
    let num = (factor_bps / g) as u128;
    let den = (BPS / g) as u128;

    let exact = num
        .checked_pow(exp)
        .zip(den.checked_pow(exp))
        .and_then(|(n, d)| (initial as u128).checked_mul(n).map(|v| v / d));

    match exact {
        Some(v) => u64::try_from(v).unwrap_or(u64::MAX),
        None => {
            let factor = factor_bps as f64 / BPS as f64;
            (initial as f64 * factor.powi(exp as i32)).floor() as u64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escalate_gas_first_attempt_is_initial() {
        assert_eq!(escalate_gas(21_000, 11_000, 1), 21_000);
    }

    #[test]
    fn test_escalate_gas_floor() {
        assert_eq!(escalate_gas(21_000, 11_000, 2), 23_100);
        assert_eq!(escalate_gas(21_000, 11_000, 3), 25_410);
        // 100_001 * 1.21 = 121_001.21
        assert_eq!(escalate_gas(100_001, 11_000, 3), 121_001);
    }

    #[test]
    fn test_escalate_gas_deep_retries_do_not_overflow() {
        let v = escalate_gas(1_000_000, 11_000, 60);
        assert!(v > 1_000_000);
    }

    #[test]
    fn test_config_defaults() {
        let config = GasConfig::default();
        assert_eq!(config.escalation_bps(), 11_000);
        assert_eq!(config.receipt_timeout(), Duration::from_secs(400));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_factor_below_one_rejected() {
        let config = GasConfig {
            escalation_factor: 0.9,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
