//! Mining-gala treasure boxes: open every free box, then wait for the
//! unboxing to settle.

use crate::api::UnboxResult;
use crate::task::{BitlayerTask, Task, TaskContext, TaskResult};
use anyhow::Result;
use async_trait::async_trait;
use core_logic::{poll_until, PollConfig, PollOutcome};
use std::time::Duration;
use tracing::{info, warn};

pub struct TreasureBoxTask;

#[async_trait]
impl Task<TaskContext> for TreasureBoxTask {
    fn name(&self) -> &str {
        "12_openTreasureBox"
    }

    async fn run(&self, ctx: TaskContext) -> Result<TaskResult> {
        let op = ctx.op.to_string();
        let api = ctx.bitlayer_api()?;
        api.login(ctx.account.wallet()).await?;

        let Some(opened) = api.box_info().await? else {
            warn!("{} No free boxes to open", op);
            return Ok(TaskResult::skipped("no free boxes"));
        };
        info!("{} Opened box {} ({} items)", op, opened.box_id, opened.count);

        let modules = &ctx.config.modules;
        let config = PollConfig::new(
            modules.box_status_checks,
            Duration::from_secs(modules.status_poll_interval_secs),
        );
        let api = &api;
        let box_id = opened.box_id.as_str();

        let outcome = poll_until(config, "unboxing status", move |_| async move {
            let status = api.unboxing_status(box_id).await?;
            Ok::<_, anyhow::Error>(Some(status).filter(UnboxResult::is_done))
        })
        .await?;

        match outcome {
            PollOutcome::Ready(result) => {
                info!(
                    "{} Unboxed {} items worth {} BTR | SUCCESS",
                    op, result.count, result.btr
                );
                Ok(TaskResult::success(format!(
                    "unboxed {} items, {} BTR",
                    result.count, result.btr
                )))
            }
            PollOutcome::TimedOut { attempts } => {
                warn!("{} Box {} still unopened after {} checks", op, box_id, attempts);
                Ok(TaskResult::failed(format!(
                    "box {} not unboxed after {} checks",
                    box_id, attempts
                )))
            }
        }
    }
}

impl BitlayerTask for TreasureBoxTask {
    fn module(&self) -> &str {
        "Bitlayer"
    }
}
