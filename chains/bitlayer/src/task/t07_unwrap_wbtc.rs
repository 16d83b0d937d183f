use crate::config::HOME_CHAIN;
use crate::executor::TransactionIntent;
use crate::task::contracts::{self, WBTC, WBTC_ABI};
use crate::task::{tx_result, BitlayerTask, Task, TaskContext, TaskResult};
use crate::utils::erc20;
use crate::utils::units::from_wei;
use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::types::U256;
use tracing::warn;

/// Withdraws the whole WBTC balance back to native BTC.
pub struct UnwrapWbtcTask;

#[async_trait]
impl Task<TaskContext> for UnwrapWbtcTask {
    fn name(&self) -> &str {
        "07_unwrapWbtc"
    }

    async fn run(&self, ctx: TaskContext) -> Result<TaskResult> {
        let (wbtc, contract) = contracts::contract(WBTC, WBTC_ABI)?;
        let token = erc20::token_info(ctx.client.as_ref(), wbtc, ctx.account.address()).await?;

        if token.balance.is_zero() {
            warn!("{} no {} balance to withdraw", ctx.op, token.symbol);
            return Ok(TaskResult::skipped(format!("no {} balance", token.symbol)));
        }

        let data = contract
            .encode("withdraw", token.balance)
            .context("Failed to encode withdraw")?;
        let amount = from_wei(token.balance, token.decimals);
        let label = format!("{} unwrap {} {}", ctx.op, amount, token.symbol);

        let intent = TransactionIntent::call(HOME_CHAIN, wbtc, data, U256::zero());
        let outcome = ctx.executor().execute(intent, &label).await;
        Ok(tx_result(&outcome, &format!("unwrapped {} {}", amount, token.symbol)))
    }
}

impl BitlayerTask for UnwrapWbtcTask {
    fn module(&self) -> &str {
        "WBTC"
    }
}
