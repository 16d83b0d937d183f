//! # Core Logic - Shared Framework for Chain Bots
//!
//! Chain-agnostic pieces used by every chain crate in the workspace.
//!
//! ## Modules
//!
//! - [`config`] - Run settings, sleep ranges, proxy entries, daily schedule
//! - [`error`] - Typed error handling with thiserror
//! - [`report`] - Append-only CSV reports
//! - [`traits`] - Task, BatchItem and AccountAction definitions
//! - utils - logger, retry/polling, pacing, proxies, keys, gas policy, batch runner

pub mod config;
pub mod error;
pub mod report;
pub mod traits;
pub(crate) mod utils;

pub use config::{DailySchedule, ProxyConfig, RunSettings, SleepRange};
pub use error::{ChainError, ConfigError, NetworkError, WalletError};
pub use report::CsvReport;
pub use traits::{AccountAction, BatchItem, Task, TaskResult};

pub use utils::gas::{escalate_gas, GasConfig};
pub use utils::logger::setup_logger;
pub use utils::pacing::{next_daily_run, Pacer, TokioPacer};
pub use utils::proxy_manager::ProxyManager;
pub use utils::retry::{
    is_transient_error, poll_until, with_retry, PollConfig, PollOutcome, RetryConfig,
};
pub use utils::runner::{BatchRunner, BatchSummary, OUTCOME_HEADER};
pub use utils::wallet_manager::{Batch, BatchEntry, SecretKey, WalletManager};
