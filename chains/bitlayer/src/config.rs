use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use core_logic::{ConfigError, GasConfig, RunSettings};
use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;

pub const HOME_CHAIN: &str = "bitlayer";

#[derive(Debug, Clone, Deserialize)]
pub struct BitlayerConfig {
    #[serde(default)]
    pub settings: RunSettings,
    #[serde(default)]
    pub files: FileSettings,
    #[serde(default)]
    pub gas: GasConfig,
    #[serde(default)]
    pub modules: ModuleSettings,
    #[serde(default)]
    pub api: ApiSettings,
    pub chains: HashMap<String, ChainSpec>,
}

impl BitlayerConfig {
    /// Loads the TOML file, then `BITLAYER__SECTION__KEY` environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("BITLAYER").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;
        Self::finish(settings)
    }

    /// Same as `load`, from TOML text and without environment overrides.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .context("Failed to parse config")?;
        Self::finish(settings)
    }

    fn finish(settings: Config) -> Result<Self> {
        let mut config: BitlayerConfig = settings
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!(e))?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Fills each chain's `name` from its table key.
    pub fn normalize(&mut self) {
        for (name, chain) in self.chains.iter_mut() {
            chain.name = name.clone();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.settings.validate()?;
        self.gas.validate()?;

        if self.chains.is_empty() {
            return Err(ConfigError::MissingField {
                field: "chains".to_string(),
            });
        }
        if !self.chains.contains_key(HOME_CHAIN) {
            return Err(ConfigError::MissingField {
                field: format!("chains.{}", HOME_CHAIN),
            });
        }
        self.api.validate()?;
        for (name, chain) in &self.chains {
            if url::Url::parse(&chain.rpc).is_err() {
                return Err(ConfigError::InvalidRpcUrl {
                    url: format!("{} ({})", chain.rpc, name),
                });
            }
        }
        self.modules.validate(&self.chains)
    }

    pub fn chain(&self, name: &str) -> Result<&ChainSpec, ConfigError> {
        self.chains.get(name).ok_or_else(|| ConfigError::MissingField {
            field: format!("chains.{}", name),
        })
    }

    pub fn home_chain(&self) -> Result<&ChainSpec, ConfigError> {
        self.chain(HOME_CHAIN)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChainSpec {
    #[serde(skip)]
    pub name: String,
    pub rpc: String,
    pub explorer: String,
    pub chain_id: u64,
    /// Native token symbol, used in log labels only.
    #[serde(default = "default_token")]
    pub token: String,
    /// Fee-market (type 2) transactions; legacy `gasPrice` when false.
    #[serde(default = "default_true")]
    pub eip1559: bool,
}

impl ChainSpec {
    /// "arbitrum" -> "Arbitrum"
    pub fn title(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

fn default_token() -> String {
    "ETH".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileSettings {
    #[serde(default = "default_keys_file")]
    pub keys: String,
    #[serde(default = "default_proxies_file")]
    pub proxies: String,
    #[serde(default = "default_reports_dir")]
    pub reports_dir: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            keys: default_keys_file(),
            proxies: default_proxies_file(),
            reports_dir: default_reports_dir(),
        }
    }
}

fn default_keys_file() -> String {
    "keys.txt".to_string()
}

fn default_proxies_file() -> String {
    "proxies.txt".to_string()
}

fn default_reports_dir() -> String {
    "reports".to_string()
}

/// Base URLs of the web services the tasks talk to.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_bitlayer_url")]
    pub bitlayer: String,
    #[serde(default = "default_minibridge_url")]
    pub minibridge: String,
    /// Ticker returning `{"price": "..."}` for BTC/USDT.
    #[serde(default = "default_btc_price_url")]
    pub btc_price: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bitlayer: default_bitlayer_url(),
            minibridge: default_minibridge_url(),
            btc_price: default_btc_price_url(),
        }
    }
}

impl ApiSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("api.bitlayer", &self.bitlayer),
            ("api.minibridge", &self.minibridge),
            ("api.btc_price", &self.btc_price),
        ] {
            if url::Url::parse(value).is_err() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("'{}' is not a URL", value),
                });
            }
        }
        Ok(())
    }
}

fn default_bitlayer_url() -> String {
    "https://www.bitlayer.org".to_string()
}

fn default_minibridge_url() -> String {
    "https://minibridge-conf.chaineye.tools".to_string()
}

fn default_btc_price_url() -> String {
    "https://api.binance.com/api/v3/ticker/price?symbol=BTCUSDT".to_string()
}

/// Decimal native-token amounts, written as `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "[f64; 2]")]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
}

impl AmountRange {
    pub fn new(min: f64, max: f64) -> Result<Self, ConfigError> {
        if !(min.is_finite() && max.is_finite()) || min < 0.0 || min > max {
            return Err(ConfigError::InvalidValue {
                field: "amount range".to_string(),
                reason: format!("expected 0 <= min <= max, got [{}, {}]", min, max),
            });
        }
        Ok(Self { min, max })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.min == self.max {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }
}

impl TryFrom<[f64; 2]> for AmountRange {
    type Error = ConfigError;

    fn try_from(value: [f64; 2]) -> Result<Self, Self::Error> {
        Self::new(value[0], value[1])
    }
}

/// Inclusive integer range written as `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "[u32; 2]")]
pub struct CountRange {
    pub min: u32,
    pub max: u32,
}

impl CountRange {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(self.min..=self.max)
    }
}

impl TryFrom<[u32; 2]> for CountRange {
    type Error = ConfigError;

    fn try_from(value: [u32; 2]) -> Result<Self, Self::Error> {
        if value[0] > value[1] {
            return Err(ConfigError::InvalidValue {
                field: "count range".to_string(),
                reason: format!("min {} is greater than max {}", value[0], value[1]),
            });
        }
        Ok(Self {
            min: value[0],
            max: value[1],
        })
    }
}

/// Bridge amount: `"max"` (98% of the source balance) or a `[min, max]` range in ETH.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "SendValueRaw")]
pub enum SendValue {
    Max,
    Range(AmountRange),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SendValueRaw {
    Keyword(String),
    Range(AmountRange),
}

impl TryFrom<SendValueRaw> for SendValue {
    type Error = ConfigError;

    fn try_from(raw: SendValueRaw) -> Result<Self, Self::Error> {
        match raw {
            SendValueRaw::Keyword(k) if k.eq_ignore_ascii_case("max") => Ok(SendValue::Max),
            SendValueRaw::Keyword(k) => Err(ConfigError::InvalidValue {
                field: "modules.send_value".to_string(),
                reason: format!("expected \"max\" or [min, max], got \"{}\"", k),
            }),
            SendValueRaw::Range(r) => Ok(SendValue::Range(r)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleSettings {
    #[serde(default = "default_wrap_value")]
    pub wrap_value: AmountRange,
    #[serde(default = "default_wrap_tx_count")]
    pub wrap_tx_count: CountRange,
    #[serde(default = "default_swap_value")]
    pub swap_value: AmountRange,
    #[serde(default = "default_swap_back_percent")]
    pub swap_back_percent: CountRange,
    #[serde(default = "default_wrap_value")]
    pub deposit_value: AmountRange,
    #[serde(default = "default_send_value")]
    pub send_value: SendValue,
    #[serde(default = "default_available_chains")]
    pub available_chains: Vec<String>,
    #[serde(default = "default_bridge_status_checks")]
    pub bridge_status_checks: u32,
    #[serde(default = "default_browse_status_checks")]
    pub browse_status_checks: u32,
    #[serde(default = "default_status_poll_interval_secs")]
    pub status_poll_interval_secs: u64,
    #[serde(default = "default_draw_result_wait_secs")]
    pub draw_result_wait_secs: u64,
    #[serde(default = "default_box_status_checks")]
    pub box_status_checks: u32,
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self {
            wrap_value: default_wrap_value(),
            wrap_tx_count: default_wrap_tx_count(),
            swap_value: default_swap_value(),
            swap_back_percent: default_swap_back_percent(),
            deposit_value: default_wrap_value(),
            send_value: default_send_value(),
            available_chains: default_available_chains(),
            bridge_status_checks: default_bridge_status_checks(),
            browse_status_checks: default_browse_status_checks(),
            status_poll_interval_secs: default_status_poll_interval_secs(),
            draw_result_wait_secs: default_draw_result_wait_secs(),
            box_status_checks: default_box_status_checks(),
        }
    }
}

impl ModuleSettings {
    pub fn validate(&self, chains: &HashMap<String, ChainSpec>) -> Result<(), ConfigError> {
        let CountRange { min, max } = self.swap_back_percent;
        if min < 1 || max > 100 {
            return Err(ConfigError::InvalidValue {
                field: "modules.swap_back_percent".to_string(),
                reason: format!("percentages must be within 1..=100, got [{}, {}]", min, max),
            });
        }
        if let Some(unknown) = self
            .available_chains
            .iter()
            .find(|c| !chains.contains_key(c.as_str()))
        {
            return Err(ConfigError::InvalidValue {
                field: "modules.available_chains".to_string(),
                reason: format!("unknown chain '{}'", unknown),
            });
        }
        if self.bridge_status_checks == 0
            || self.browse_status_checks == 0
            || self.box_status_checks == 0
        {
            return Err(ConfigError::InvalidValue {
                field: "modules.*_status_checks".to_string(),
                reason: "status polls need at least one check".to_string(),
            });
        }
        Ok(())
    }
}

fn default_wrap_value() -> AmountRange {
    AmountRange {
        min: 0.0000001,
        max: 0.000001,
    }
}

fn default_wrap_tx_count() -> CountRange {
    CountRange { min: 5, max: 10 }
}

fn default_swap_value() -> AmountRange {
    AmountRange {
        min: 0.000008,
        max: 0.000023,
    }
}

fn default_swap_back_percent() -> CountRange {
    CountRange { min: 95, max: 99 }
}

fn default_send_value() -> SendValue {
    SendValue::Max
}

fn default_available_chains() -> Vec<String> {
    vec![
        "arbitrum".to_string(),
        "optimism".to_string(),
        "base".to_string(),
    ]
}

fn default_bridge_status_checks() -> u32 {
    10
}

fn default_browse_status_checks() -> u32 {
    12
}

fn default_status_poll_interval_secs() -> u64 {
    5
}

fn default_draw_result_wait_secs() -> u64 {
    20
}

fn default_box_status_checks() -> u32 {
    10
}
