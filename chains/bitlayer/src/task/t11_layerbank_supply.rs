use crate::config::HOME_CHAIN;
use crate::executor::TransactionIntent;
use crate::task::contracts::{self, LAYERBANK, LAYERBANK_ABI, LAYERBANK_LBTC};
use crate::task::{gate, tx_result, BitlayerTask, Task, TaskContext, TaskResult};
use crate::utils::units::{from_wei, to_wei, NATIVE_DECIMALS};
use anyhow::{Context, Result};
use async_trait::async_trait;

/// Supplies a random amount of native BTC to LayerBank.
pub struct LayerbankSupplyTask;

#[async_trait]
impl Task<TaskContext> for LayerbankSupplyTask {
    fn name(&self) -> &str {
        "11_layerbankSupply"
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

        let (layerbank, contract) = contracts::contract(LAYERBANK, LAYERBANK_ABI)?;
        let l_token = contracts::address(LAYERBANK_LBTC)?;
        let data = contract
            .encode("supply", (l_token, value))
            .context("Failed to encode supply")?;

        let shown = from_wei(value, NATIVE_DECIMALS);
        let intent = TransactionIntent::call(HOME_CHAIN, layerbank, data, value);
        let outcome = ctx
            .executor()
            .execute(intent, &format!("{} deposit {} BTC", ctx.op, shown))
            .await;
        Ok(tx_result(&outcome, &format!("supplied {} BTC", shown)))
    }
}

impl BitlayerTask for LayerbankSupplyTask {
    fn module(&self) -> &str {
        "LayerBank"
    }
}
