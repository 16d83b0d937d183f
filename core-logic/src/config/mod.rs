use crate::error::ConfigError;
use chrono_tz::Tz;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Inclusive range of whole seconds, written as `[min, max]` in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[u64; 2]", into = "[u64; 2]")]
pub struct SleepRange {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl SleepRange {
    pub fn new(min_secs: u64, max_secs: u64) -> Result<Self, ConfigError> {
        if min_secs > max_secs {
            return Err(ConfigError::InvalidValue {
                field: "sleep range".to_string(),
                reason: format!("min {} is greater than max {}", min_secs, max_secs),
            });
        }
        Ok(Self { min_secs, max_secs })
    }

    /// Fixed duration, e.g. `SleepRange::fixed(20)` for the draw result wait.
    pub const fn fixed(secs: u64) -> Self {
        Self {
            min_secs: secs,
            max_secs: secs,
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_secs(rng.gen_range(self.min_secs..=self.max_secs))
    }
}

impl TryFrom<[u64; 2]> for SleepRange {
    type Error = ConfigError;

    fn try_from(value: [u64; 2]) -> Result<Self, Self::Error> {
        Self::new(value[0], value[1])
    }
}

impl From<SleepRange> for [u64; 2] {
    fn from(range: SleepRange) -> Self {
        [range.min_secs, range.max_secs]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// When to resume in infinite mode: a random moment tomorrow between
/// `window[0]:00` and `window[1]:00` in `timezone`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySchedule {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_window")]
    pub window: [u32; 2],
}

impl Default for DailySchedule {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            window: default_window(),
        }
    }
}

impl DailySchedule {
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "settings.schedule.timezone".to_string(),
                reason: e.to_string(),
            })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tz()?;
        let [start, end] = self.window;
        if start >= end || end > 24 {
            return Err(ConfigError::InvalidValue {
                field: "settings.schedule.window".to_string(),
                reason: format!("expected start < end <= 24, got [{}, {}]", start, end),
            });
        }
        Ok(())
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_window() -> [u32; 2] {
    [9, 18]
}

/// General run behaviour shared by every chain binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSettings {
    #[serde(default)]
    pub shuffle_wallets: bool,
    #[serde(default)]
    pub use_proxy: bool,
    #[serde(default)]
    pub infinite_loop: bool,
    /// Retries after the first attempt of a failed transaction.
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_sleep")]
    pub sleep_between_wallets: SleepRange,
    #[serde(default = "default_sleep")]
    pub sleep_between_actions: SleepRange,
    /// Native-token units (e.g. BTC), converted to wei at the point of use.
    #[serde(default)]
    pub min_balance: f64,
    #[serde(default)]
    pub schedule: DailySchedule,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            shuffle_wallets: false,
            use_proxy: false,
            infinite_loop: false,
            retry_count: default_retry_count(),
            sleep_between_wallets: default_sleep(),
            sleep_between_actions: default_sleep(),
            min_balance: 0.0,
            schedule: DailySchedule::default(),
        }
    }
}

impl RunSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_balance < 0.0 || !self.min_balance.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "settings.min_balance".to_string(),
                reason: format!("must be a non-negative number, got {}", self.min_balance),
            });
        }
        if self.infinite_loop {
            self.schedule.validate()?;
        }
        Ok(())
    }
}

fn default_retry_count() -> u32 {
    1
}

fn default_sleep() -> SleepRange {
    SleepRange {
        min_secs: 10,
        max_secs: 20,
    }
}
