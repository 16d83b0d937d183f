use crate::config::HOME_CHAIN;
use crate::executor::TransactionIntent;
use crate::task::contracts::{self, AVALON, AVALON_ABI, AVALON_POOL};
use crate::task::{gate, tx_result, BitlayerTask, Task, TaskContext, TaskResult};
use crate::utils::units::{from_wei, to_wei, NATIVE_DECIMALS};
use anyhow::{Context, Result};
use async_trait::async_trait;

/// Deposits a random amount of native BTC into the Avalon lending pool.
pub struct AvalonDepositTask;

#[async_trait]
impl Task<TaskContext> for AvalonDepositTask {
    fn name(&self) -> &str {
        "10_avalonDeposit"
    }

    async fn run(&self, ctx: TaskContext) -> Result<TaskResult> {
        if let Some(skip) = gate(&ctx).await? {
            return Ok(skip);
        }

        let amount = ctx
            .config
            .modules
            .deposit_value
            .sample(&mut rand::thread_rng());
        let value = to_wei(amount, NATIVE_DECIMALS)?;

        let (avalon, contract) = contracts::contract(AVALON, AVALON_ABI)?;
        let pool = contracts::address(AVALON_POOL)?;
        let data = contract
            .encode("depositETH", (pool, ctx.account.address(), 0u16))
            .context("Failed to encode depositETH")?;

        let shown = from_wei(value, NATIVE_DECIMALS);
        let intent = TransactionIntent::call(HOME_CHAIN, avalon, data, value);
        let outcome = ctx
            .executor()
            .execute(intent, &format!("{} deposit {} BTC", ctx.op, shown))
            .await;
        Ok(tx_result(&outcome, &format!("deposited {} BTC", shown)))
    }
}

impl BitlayerTask for AvalonDepositTask {
    fn module(&self) -> &str {
        "Avalon"
    }
}
