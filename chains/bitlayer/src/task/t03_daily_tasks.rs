use crate::api::bitlayer::{BROWSE_TASK_ID, SHARE_TASK_ID};
use crate::api::{BitlayerApi, UserData};
use crate::task::{BitlayerTask, Task, TaskContext, TaskResult};
use anyhow::Result;
use async_trait::async_trait;
use core_logic::{poll_until, CsvReport, PollConfig, PollOutcome};
use rand::seq::SliceRandom;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const WALLETS_HEADER: [&str; 4] = ["Wallet", "TX count", "Points", "Level"];

/// Claims ongoing transaction rewards and the daily browse/share tasks,
/// then records the account's standing in `wallets.csv`.
pub struct DailyTasksTask;

#[async_trait]
impl Task<TaskContext> for DailyTasksTask {
    fn name(&self) -> &str {
        "03_dailyTasks"
    }

    async fn run(&self, ctx: TaskContext) -> Result<TaskResult> {
        let op = ctx.op.to_string();
        let api = ctx.bitlayer_api()?;
        api.login(ctx.account.wallet()).await?;

        let before = api.user_data().await?;
        let claimed = claim_all(&ctx, &api, &before).await;

        // The standing row is written whatever happened above.
        let after = match api.user_data().await {
            Ok(user) => user,
            Err(e) => {
                warn!("{} Could not refresh user data: {:#}", op, e);
                before
            }
        };
        record_standing(&ctx, &after).await;

        let claimed = claimed?;
        if claimed == 0 {
            return Ok(TaskResult::skipped("nothing to claim"));
        }
        Ok(TaskResult::success(format!("claimed {} task(s)", claimed)))
    }
}

impl BitlayerTask for DailyTasksTask {
    fn module(&self) -> &str {
        "Bitlayer"
    }
}

async fn claim_all(ctx: &TaskContext, api: &BitlayerApi, user: &UserData) -> Result<usize> {
    let op = ctx.op.to_string();
    let mut claimed = 0;

    if let Some(ongoing) = user
        .tasks
        .ongoing_task
        .as_ref()
        .filter(|t| t.reward_points > 0)
    {
        api.claim_task(ongoing).await?;
        info!(
            "{} Claimed {} points for ongoing rewards | SUCCESS",
            op, ongoing.reward_points
        );
        claimed += 1;
        ctx.pause_between_actions().await;
    }

    let mut daily = user.tasks.daily_tasks.clone();
    daily.shuffle(&mut rand::thread_rng());

    for task in &daily {
        let title = task.display_title();
        if task.is_completed {
            debug!("{} {} already completed", op, title);
            continue;
        }

        api.start_task(task).await?;
        ctx.pause_between_actions().await;

        let ready = match task.task_id {
            BROWSE_TASK_ID => wait_for_browse(ctx, api).await?,
            SHARE_TASK_ID => true,
            _ => false,
        };

        if ready {
            api.claim_task(task).await?;
            info!(
                "{} Claimed {} points for {} | SUCCESS",
                op,
                task.claimable_points(),
                title
            );
            claimed += 1;
        }
        ctx.pause_between_actions().await;
    }

    Ok(claimed)
}

/// Reports the dapp-center visit until it is counted, a bounded number of times.
async fn wait_for_browse(ctx: &TaskContext, api: &BitlayerApi) -> Result<bool> {
    let modules = &ctx.config.modules;
    let config = PollConfig::new(
        modules.browse_status_checks,
        Duration::from_secs(modules.status_poll_interval_secs),
    );
    let op = ctx.op.to_string();
    let op = op.as_str();

    let outcome = poll_until(config, "browse status", move |attempt| async move {
        let checked = api.report_browse().await?;
        info!("{} Claimable: {} ({})", op, checked, attempt);
        Ok::<_, anyhow::Error>(checked.then_some(()))
    })
    .await?;

    match outcome {
        PollOutcome::Ready(()) => Ok(true),
        PollOutcome::TimedOut { attempts } => {
            warn!("{} Browse task not counted after {} checks", op, attempts);
            Ok(false)
        }
    }
}

async fn record_standing(ctx: &TaskContext, user: &UserData) {
    let tx_count = match ctx.client.get_nonce(ctx.account.address()).await {
        Ok(nonce) => nonce.low_u64(),
        Err(_) => user.profile.txn,
    };

    let report = CsvReport::new(
        Path::new(&ctx.config.files.reports_dir).join("wallets.csv"),
        &WALLETS_HEADER,
    );
    let row = [
        ctx.account.checksum(),
        tx_count.to_string(),
        user.profile.total_points.to_string(),
        user.profile.level.to_string(),
    ];
    if let Err(e) = report.append(&row) {
        warn!("{} Could not write {}: {:#}", ctx.op, report.path().display(), e);
    }
}
