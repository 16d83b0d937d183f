use crate::task::{BitlayerTask, Task, TaskContext, TaskResult};
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// BTCFi daily check-in: start it, then claim the reward order.
pub struct BtcfiDailyCheckTask;

#[async_trait]
impl Task<TaskContext> for BtcfiDailyCheckTask {
    fn name(&self) -> &str {
        "14_btcfiDailyCheck"
    }

    async fn run(&self, ctx: TaskContext) -> Result<TaskResult> {
        let op = ctx.op.to_string();
        let api = ctx.bitlayer_api()?;
        api.login(ctx.account.wallet()).await?;

        api.start_daily_check().await?;
        info!("{} Daily check started", op);
        ctx.pause_between_actions().await;

        let order_id = api.claim_daily_check().await?;
        info!("{} Daily check claimed, order {} | SUCCESS", op, order_id);
        Ok(TaskResult::success(format!("daily check order {}", order_id)))
    }
}

impl BitlayerTask for BtcfiDailyCheckTask {
    fn module(&self) -> &str {
        "BTCFi"
    }
}
