//! BitCow round trip: BTC into WBTC or BITUSD, then a share of the token
//! balance back. The reverse leg runs even when the forward leg failed, so
//! tokens left over from earlier runs are swept too.

use crate::config::HOME_CHAIN;
use crate::executor::{TransactionIntent, TxOutcome};
use crate::task::contracts::{self, BITCOW, BITCOW_ABI, BITUSD, BITUSD_POOL, WBTC};
use crate::task::{gate, tx_result, BitlayerTask, Task, TaskContext, TaskResult};
use crate::utils::erc20;
use crate::utils::units::{from_wei, percent_of, to_wei, NATIVE_DECIMALS};
use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::contract::BaseContract;
use ethers::types::{Address, U256};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapTarget {
    Wbtc,
    Bitusd,
}

impl SwapTarget {
    fn token(&self) -> &'static str {
        match self {
            SwapTarget::Wbtc => WBTC,
            SwapTarget::Bitusd => BITUSD,
        }
    }
}

pub struct BitcowSwapTask {
    target: SwapTarget,
}

impl BitcowSwapTask {
    pub fn new(target: SwapTarget) -> Self {
        Self { target }
    }

    fn forward_calldata(&self, contract: &BaseContract) -> Result<ethers::types::Bytes> {
        let data = match self.target {
            SwapTarget::Wbtc => contract.encode("swapBTCtoWBTC", contracts::address(WBTC)?),
            SwapTarget::Bitusd => contract.encode(
                "swapBTCtoERC20",
                (
                    vec![contracts::address(BITUSD_POOL)?],
                    vec![true],
                    U256::zero(),
                ),
            ),
        };
        data.context("Failed to encode forward swap")
    }

    fn reverse_calldata(
        &self,
        contract: &BaseContract,
        token: Address,
        amount: U256,
    ) -> Result<ethers::types::Bytes> {
        let data = match self.target {
            SwapTarget::Wbtc => contract.encode("swapWBTCtoBTC", (token, amount)),
            SwapTarget::Bitusd => contract.encode(
                "swap",
                (
                    amount,
                    vec![contracts::address(BITUSD_POOL)?],
                    vec![false],
                    U256::zero(),
                ),
            ),
        };
        data.context("Failed to encode reverse swap")
    }

    /// Swaps `percent` of the token balance back, approving the router
    /// first when the allowance does not cover the balance.
    async fn swap_back(
        &self,
        ctx: &TaskContext,
        router: Address,
        contract: &BaseContract,
        percent: u32,
    ) -> Result<TxOutcome> {
        let token = contracts::address(self.target.token())?;
        let owner = ctx.account.address();
        let info = erc20::token_info(ctx.client.as_ref(), token, owner).await?;

        if info.balance.is_zero() {
            warn!("{} No {} tokens to swap", ctx.op, info.symbol);
            return Ok(TxOutcome::Skipped {
                reason: format!("no {} to swap back", info.symbol),
            });
        }

        let amount = percent_of(info.balance, percent);
        let shown = from_wei(amount, info.decimals);

        let allowance = erc20::allowance(ctx.client.as_ref(), token, owner, router).await?;
        if allowance < info.balance {
            let data = erc20::approve_calldata(router, U256::MAX)?;
            let intent = TransactionIntent::call(HOME_CHAIN, token, data, U256::zero());
            let label = format!("{} approve {} {}", ctx.op, shown, info.symbol);

            let approval = ctx.executor().execute(intent, &label).await;
            if !approval.is_confirmed() {
                return Ok(approval);
            }
            ctx.pause_between_actions().await;
        }

        let data = self.reverse_calldata(contract, token, amount)?;
        let intent = TransactionIntent::call(HOME_CHAIN, router, data, U256::zero());
        let to = match self.target {
            SwapTarget::Wbtc => "BTC",
            SwapTarget::Bitusd => "WBTC",
        };
        let label = format!("{} swap {} {} > {}", ctx.op, shown, info.symbol, to);

        Ok(ctx.executor().execute(intent, &label).await)
    }
}

#[async_trait]
impl Task<TaskContext> for BitcowSwapTask {
    fn name(&self) -> &str {
        match self.target {
            SwapTarget::Wbtc => "08_bitcowSwapWbtc",
            SwapTarget::Bitusd => "08_bitcowSwapBitusd",
        }
    }

    async fn run(&self, ctx: TaskContext) -> Result<TaskResult> {
        if let Some(skip) = gate(&ctx).await? {
            return Ok(skip);
        }

        let modules = &ctx.config.modules;
        let (amount, percent) = {
            let mut rng = rand::thread_rng();
            (
                modules.swap_value.sample(&mut rng),
                modules.swap_back_percent.sample(&mut rng),
            )
        };
        let value = to_wei(amount, NATIVE_DECIMALS)?;

        let (router, contract) = contracts::contract(BITCOW, BITCOW_ABI)?;
        let data = self.forward_calldata(&contract)?;
        let token = match self.target {
            SwapTarget::Wbtc => "WBTC",
            SwapTarget::Bitusd => "BITUSD",
        };
        let label = format!(
            "{} swap {} BTC > {}",
            ctx.op,
            from_wei(value, NATIVE_DECIMALS),
            token
        );

        let intent = TransactionIntent::call(HOME_CHAIN, router, data, value);
        let forward = ctx.executor().execute(intent, &label).await;
        if forward.is_confirmed() {
            ctx.pause_between_actions().await;
        }

        let reverse = self.swap_back(&ctx, router, &contract, percent).await?;

        let what = format!(
            "forward {}, reverse {}",
            leg_status(&forward),
            leg_status(&reverse)
        );
        info!("{} Swap legs: {}", ctx.op, what);
        Ok(tx_result(&reverse, &what))
    }
}

impl BitlayerTask for BitcowSwapTask {
    fn module(&self) -> &str {
        "BitCow"
    }
}

fn leg_status(outcome: &TxOutcome) -> &'static str {
    match outcome {
        TxOutcome::Confirmed { .. } => "confirmed",
        TxOutcome::Failed { .. } => "failed",
        TxOutcome::Skipped { .. } => "skipped",
    }
}
