use crate::task::{BitlayerTask, Task, TaskContext, TaskResult};
use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

/// Claims "total txn" milestone rewards whose progress reached a tier.
pub struct TxnTasksTask;

#[async_trait]
impl Task<TaskContext> for TxnTasksTask {
    fn name(&self) -> &str {
        "04_txnTasks"
    }

    async fn run(&self, ctx: TaskContext) -> Result<TaskResult> {
        let op = ctx.op.to_string();
        let api = ctx.bitlayer_api()?;
        api.login(ctx.account.wallet()).await?;

        let user = api.user_data().await?;
        let claimable: Vec<_> = user
            .tasks
            .advance_tasks
            .iter()
            .filter(|t| !t.is_completed && t.can_claim)
            .collect();

        if claimable.is_empty() {
            debug!("{} No txn rewards ready ({} txn)", op, user.profile.txn);
            return Ok(TaskResult::skipped("no txn rewards to claim"));
        }

        let mut points = 0;
        for (i, task) in claimable.iter().enumerate() {
            api.claim_task(task).await?;
            let reward = task.claimable_points();
            info!(
                "{} Claimed {} points for {} | SUCCESS",
                op,
                reward,
                task.display_title()
            );
            points += reward;

            if i + 1 < claimable.len() {
                ctx.pause_between_actions().await;
            }
        }

        Ok(TaskResult::success(format!(
            "claimed {} reward(s), {} points",
            claimable.len(),
            points
        )))
    }
}

impl BitlayerTask for TxnTasksTask {
    fn module(&self) -> &str {
        "Bitlayer"
    }
}
