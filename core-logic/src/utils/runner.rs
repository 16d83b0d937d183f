use crate::config::RunSettings;
use crate::report::CsvReport;
use crate::traits::{AccountAction, BatchItem};
use crate::utils::pacing::{next_daily_run, Pacer};
use crate::utils::wallet_manager::Batch;
use anyhow::Result;
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub const OUTCOME_HEADER: [&str; 5] = ["position", "account", "action", "status", "message"];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errored: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped + self.errored
    }
}

/// Drives one action over a batch, one account at a time.
///
/// A failing or panicking account is logged and recorded, then the batch
/// moves on. The inter-wallet pause only follows a successful account that
/// is not the last one.
pub struct BatchRunner {
    settings: RunSettings,
    pacer: Arc<dyn Pacer>,
    cancel: CancellationToken,
    report: Option<CsvReport>,
}

impl BatchRunner {
    pub fn new(settings: RunSettings, pacer: Arc<dyn Pacer>, cancel: CancellationToken) -> Self {
        Self {
            settings,
            pacer,
            cancel,
            report: None,
        }
    }

    pub fn with_report(mut self, report: CsvReport) -> Self {
        self.report = Some(report);
        self
    }

    /// One pass, or endless daily passes when `infinite_loop` is set.
    pub async fn run<T: BatchItem>(
        &self,
        batch: &Batch<T>,
        action: &dyn AccountAction<T>,
    ) -> Result<()> {
        let tz = self.settings.schedule.tz()?;

        loop {
            let summary = self.run_batch(batch, action).await;
            info!(
                "{} finished | SUCCESS: {} | FAILED: {} | Skipped: {} | Errors: {}",
                action.name(),
                summary.succeeded,
                summary.failed,
                summary.skipped,
                summary.errored
            );

            if !self.settings.infinite_loop || self.cancel.is_cancelled() {
                return Ok(());
            }

            let at = next_daily_run(
                Utc::now(),
                tz,
                self.settings.schedule.window,
                &mut rand::thread_rng(),
            );
            self.pacer.sleep_until(at, action.name()).await;

            if self.cancel.is_cancelled() {
                return Ok(());
            }
        }
    }

    pub async fn run_batch<T: BatchItem>(
        &self,
        batch: &Batch<T>,
        action: &dyn AccountAction<T>,
    ) -> BatchSummary {
        let total = batch.len();
        let mut summary = BatchSummary::default();

        for entry in batch.entries() {
            if self.cancel.is_cancelled() {
                warn!("Cancelled, {} accounts left unprocessed", total - summary.total());
                break;
            }

            let position = entry.position;
            let account = entry.item.id();
            info!("[{}/{}] {} | {}", position, total, account, action.name());

            let outcome = AssertUnwindSafe(action.run(entry, position, total))
                .catch_unwind()
                .await;

            let (status, message, proceed) = match outcome {
                Ok(Ok(result)) if result.success => {
                    summary.succeeded += 1;
                    ("success", result.message, true)
                }
                Ok(Ok(result)) if result.skipped => {
                    summary.skipped += 1;
                    ("skipped", result.message, false)
                }
                Ok(Ok(result)) => {
                    summary.failed += 1;
                    ("failed", result.message, false)
                }
                Ok(Err(e)) => {
                    summary.errored += 1;
                    error!("[{}/{}] {} | {} | {:#}", position, total, account, action.name(), e);
                    ("error", format!("{:#}", e), false)
                }
                Err(panic) => {
                    summary.errored += 1;
                    let reason = panic_message(panic.as_ref());
                    error!(
                        "[{}/{}] {} | {} | panicked: {}",
                        position,
                        total,
                        account,
                        action.name(),
                        reason
                    );
                    ("error", format!("panicked: {}", reason), false)
                }
            };

            if let Some(report) = &self.report {
                let row = [
                    position.to_string(),
                    account.clone(),
                    action.name().to_string(),
                    status.to_string(),
                    message,
                ];
                if let Err(e) = report.append(&row) {
                    warn!("Could not write report row for {}: {:#}", account, e);
                }
            }

            if proceed && position < total && !self.cancel.is_cancelled() {
                let label = format!("[{}/{}] {}", position, total, account);
                self.pacer
                    .pause(self.settings.sleep_between_wallets, &label)
                    .await;
            }
        }

        summary
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
