//! MiniBridge: ETH from the richest configured L2 to Bitlayer.
//!
//! The maker identifies the destination from the last four digits of the
//! transfer value, so every amount ends in `8000 + BITLAYER_INTERNAL_ID`.

use crate::api::MiniBridgeApi;
use crate::client::ChainClient;
use crate::config::SendValue;
use crate::executor::TransactionIntent;
use crate::task::contracts::{self, MINIBRIDGE_MAKER};
use crate::task::{tx_result, BitlayerTask, Task, TaskContext, TaskResult};
use crate::utils::units::{from_wei, percent_of, to_wei, NATIVE_DECIMALS};
use anyhow::Result;
use async_trait::async_trait;
use core_logic::{poll_until, PollConfig, PollOutcome};
use ethers::types::U256;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 0.0001 ETH
pub const MIN_SEND_VALUE: u128 = 100_000_000_000_000;
/// 0.05 ETH
pub const MAX_SEND_VALUE: u128 = 50_000_000_000_000_000;
pub const BITLAYER_INTERNAL_ID: u64 = 832;
const MAX_PERCENT: u32 = 98;

/// Amount to send from `balance`, or the reason the account is skipped.
pub fn bridge_value<R: Rng + ?Sized>(
    balance: U256,
    send_value: &SendValue,
    rng: &mut R,
) -> Result<U256, String> {
    let value = match send_value {
        SendValue::Max => percent_of(balance, MAX_PERCENT),
        SendValue::Range(range) => {
            let min = to_wei(range.min, NATIVE_DECIMALS).map_err(|e| e.to_string())?;
            let max = to_wei(range.max, NATIVE_DECIMALS).map_err(|e| e.to_string())?;
            let value = U256::from(rng.gen_range(min.as_u128()..=max.as_u128()));

            if value < U256::from(MIN_SEND_VALUE) || value > U256::from(MAX_SEND_VALUE) {
                return Err(format!(
                    "generated amount {} is outside of allowed range {}-{} ETH",
                    from_wei(value, NATIVE_DECIMALS),
                    from_wei(U256::from(MIN_SEND_VALUE), NATIVE_DECIMALS),
                    from_wei(U256::from(MAX_SEND_VALUE), NATIVE_DECIMALS)
                ));
            }
            if value > balance {
                return Err(format!(
                    "generated amount {} exceeds wallet balance",
                    from_wei(value, NATIVE_DECIMALS)
                ));
            }
            value
        }
    };

    let code = U256::from(8000 + BITLAYER_INTERNAL_ID);
    let step = U256::from(10_000u64);
    Ok(value / step * step + code)
}

pub struct MinibridgeTask;

impl MinibridgeTask {
    /// The eligible source chain with the highest balance of at least
    /// `MIN_SEND_VALUE`.
    async fn richest_source(
        &self,
        ctx: &TaskContext,
    ) -> Result<Option<(Arc<dyn ChainClient>, U256)>> {
        let mut best: Option<(Arc<dyn ChainClient>, U256)> = None;

        for chain in &ctx.config.modules.available_chains {
            let client = ctx.connector.connect(chain)?;
            let balance = match client.get_balance(ctx.account.address(), None).await {
                Ok(balance) => balance,
                Err(e) => {
                    warn!("{} {} balance unavailable: {}", ctx.op, chain, e);
                    continue;
                }
            };
            if balance < U256::from(MIN_SEND_VALUE) {
                continue;
            }
            if best.as_ref().map_or(true, |(_, b)| balance > *b) {
                best = Some((client, balance));
            }
        }

        if let Some((client, balance)) = &best {
            debug!(
                "{} Highest balance found on {}: {} ETH",
                ctx.op,
                client.chain().title(),
                from_wei(*balance, NATIVE_DECIMALS)
            );
        }
        Ok(best)
    }

    async fn wait_for_delivery(&self, ctx: &TaskContext) -> Result<Option<f64>> {
        let api = MiniBridgeApi::new(&ctx.config.api.minibridge, ctx.proxy.as_ref())?;
        let api = &api;
        let address = ctx.account.address();
        let op = ctx.op.to_string();
        let op = op.as_str();

        let modules = &ctx.config.modules;
        let config = PollConfig::new(
            modules.bridge_status_checks,
            Duration::from_secs(modules.status_poll_interval_secs),
        );

        let outcome = poll_until(config, "bridge status", move |_| async move {
            match api.status(address).await? {
                Some(status) if status.is_finished() => Ok::<_, anyhow::Error>(Some(status)),
                Some(status) => {
                    info!(
                        "{} Transfer <{}>. Checking again",
                        op,
                        status.status.to_uppercase()
                    );
                    Ok(None)
                }
                None => Ok(None),
            }
        })
        .await?;

        Ok(match outcome {
            PollOutcome::Ready(status) => Some(status.received),
            PollOutcome::TimedOut { .. } => None,
        })
    }
}

#[async_trait]
impl Task<TaskContext> for MinibridgeTask {
    fn name(&self) -> &str {
        "05_minibridge"
    }

    async fn run(&self, ctx: TaskContext) -> Result<TaskResult> {
        let Some((client, balance)) = self.richest_source(&ctx).await? else {
            warn!(
                "{} No balance over {} ETH found on any chain, skipping",
                ctx.op,
                from_wei(U256::from(MIN_SEND_VALUE), NATIVE_DECIMALS)
            );
            return Ok(TaskResult::skipped("no source chain with enough balance"));
        };

        let value = {
            let mut rng = rand::thread_rng();
            bridge_value(balance, &ctx.config.modules.send_value, &mut rng)
        };
        let value = match value {
            Ok(value) => value,
            Err(reason) => {
                warn!("{} {}, skipping", ctx.op, reason);
                return Ok(TaskResult::skipped(reason));
            }
        };

        let source = client.chain().clone();
        let label = format!(
            "{} Bridge {} ETH from {} => Bitlayer",
            ctx.op,
            from_wei(value, NATIVE_DECIMALS),
            source.title()
        );
        let maker = contracts::address(MINIBRIDGE_MAKER)?;
        let intent = TransactionIntent::transfer(&source.name, maker, value);

        let outcome = ctx.executor_on(client).execute(intent, &label).await;
        if !outcome.is_confirmed() {
            return Ok(tx_result(&outcome, "bridge transfer"));
        }

        info!("{} Querying MiniBridge API for status", ctx.op);
        match self.wait_for_delivery(&ctx).await? {
            Some(received) => {
                info!(
                    "{} Transfer <FINISHED>. Received {:.8} BTC | SUCCESS",
                    ctx.op, received
                );
                Ok(tx_result(
                    &outcome,
                    &format!("bridged from {}, received {:.8} BTC", source.title(), received),
                ))
            }
            None => {
                warn!("{} Transfer not finished in time", ctx.op);
                Ok(TaskResult::failed("bridge transfer sent, delivery not confirmed")
                    .with_tx_hash(outcome.tx_hash().map(|h| format!("{:?}", h))))
            }
        }
    }
}

impl BitlayerTask for MinibridgeTask {
    fn module(&self) -> &str {
        "Minibridge"
    }
}
