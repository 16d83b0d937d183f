use crate::config::HOME_CHAIN;
use crate::executor::TransactionIntent;
use crate::task::contracts::{self, WBTC, WBTC_ABI};
use crate::task::{BitlayerTask, Task, TaskContext, TaskResult, UnwrapWbtcTask};
use crate::utils::units::{from_wei, to_wei, NATIVE_DECIMALS};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::warn;

/// Wraps small random amounts of BTC a random number of times. Below the
/// minimum balance it redeems WBTC instead.
pub struct WrapBtcTask;

#[async_trait]
impl Task<TaskContext> for WrapBtcTask {
    fn name(&self) -> &str {
        "06_wrapBtc"
    }

    async fn run(&self, ctx: TaskContext) -> Result<TaskResult> {
        let threshold = ctx.min_balance()?;
        let balance = ctx
            .client
            .get_balance(ctx.account.address(), None)
            .await
            .context("Failed to read BTC balance")?;

        if balance < threshold {
            warn!(
                "{} Current balance is under {} BTC, will attempt to redeem BTC instead",
                ctx.op,
                from_wei(threshold, NATIVE_DECIMALS)
            );
            return UnwrapWbtcTask.run(ctx).await;
        }

        let (wbtc, contract) = contracts::contract(WBTC, WBTC_ABI)?;
        let data = contract
            .encode("deposit", ())
            .context("Failed to encode deposit")?;

        let modules = &ctx.config.modules;
        let count = modules.wrap_tx_count.sample(&mut rand::thread_rng());
        let mut confirmed = 0;

        for i in 1..=count {
            let amount = modules.wrap_value.sample(&mut rand::thread_rng());
            let value = to_wei(amount, NATIVE_DECIMALS)?;
            let label = format!("{} wrap {:.10} BTC [{}/{}]", ctx.op, amount, i, count);

            let intent = TransactionIntent::call(HOME_CHAIN, wbtc, data.clone(), value);
            let outcome = ctx.executor().execute(intent, &label).await;

            if outcome.is_confirmed() {
                confirmed += 1;
                ctx.pause_between_actions().await;
            }
        }

        if confirmed == 0 && count > 0 {
            return Ok(TaskResult::failed(format!("0/{} wraps confirmed", count)));
        }
        Ok(TaskResult::success(format!("{}/{} wraps confirmed", confirmed, count)))
    }
}

impl BitlayerTask for WrapBtcTask {
    fn module(&self) -> &str {
        "WBTC"
    }
}
