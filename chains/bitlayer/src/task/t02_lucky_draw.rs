use crate::api::DrawPrize;
use crate::config::HOME_CHAIN;
use crate::executor::TransactionIntent;
use crate::task::contracts::{self, BITLAYER_LOTTERY, LOTTERY_ABI};
use crate::task::{assemble_cars, tx_result, BitlayerTask, Task, TaskContext, TaskResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::SleepRange;
use ethers::types::U256;
use tracing::{debug, info, warn};

/// Free lucky draw: fetch a ticket, reveal it on-chain, read the prize,
/// then build whatever cars the collected parts allow.
pub struct LuckyDrawTask;

#[async_trait]
impl Task<TaskContext> for LuckyDrawTask {
    fn name(&self) -> &str {
        "02_luckyDraw"
    }

    async fn run(&self, ctx: TaskContext) -> Result<TaskResult> {
        let op = ctx.op.to_string();
        let api = ctx.bitlayer_api()?;
        api.login(ctx.account.wallet()).await?;

        let chances = api.draw_info().await?;
        if chances == 0 {
            warn!("{} You have 0 Lucky Draw(s)", op);
            return Ok(TaskResult::skipped("no lucky draws left"));
        }
        debug!("{} You have {} Lucky Draw(s)", op, chances);

        let ticket = api.draw_pre().await?;
        let (lottery, contract) = contracts::contract(BITLAYER_LOTTERY, LOTTERY_ABI)?;
        let data = contract
            .encode(
                "lotteryReveal",
                (ticket.lottery_id.clone(), U256::from(ticket.expire_time)),
            )
            .context("Failed to encode lotteryReveal")?;

        let intent = TransactionIntent::call(HOME_CHAIN, lottery, data, U256::zero());
        let outcome = ctx
            .executor()
            .execute(intent, &format!("{} Lucky Draw", op))
            .await;
        if !outcome.is_confirmed() {
            return Ok(tx_result(&outcome, "lucky draw"));
        }

        let wait = SleepRange::fixed(ctx.config.modules.draw_result_wait_secs);
        ctx.pacer
            .pause(wait, &format!("{} Checking draw results", ctx.op.tag()))
            .await;

        let message = match api.draw_reply(&ticket.lottery_id).await? {
            DrawPrize::Btc(value) => format!("won {}$ in BTC", value),
            DrawPrize::Points(value) => format!("won {} points", value),
            DrawPrize::Other(raw) => {
                debug!("{} Unusual draw result: {}", op, raw);
                "won something unusual".to_string()
            }
        };
        info!("{} You {} | SUCCESS", op, message);

        // assembly errors never fail the draw
        if let Err(e) = assemble_cars(&api, &op).await {
            warn!("{} Car assembly failed: {:#}", op, e);
        }

        Ok(tx_result(&outcome, &message))
    }
}

impl BitlayerTask for LuckyDrawTask {
    fn module(&self) -> &str {
        "Bitlayer"
    }
}
