use crate::config::HOME_CHAIN;
use crate::executor::TransactionIntent;
use crate::task::contracts::{self, OWLTO, OWLTO_ABI};
use crate::task::{tx_result, BitlayerTask, Task, TaskContext, TaskResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use ethers::types::U256;

/// Owlto daily check-in, keyed by today's date as `YYYYMMDD`.
pub struct OwltoCheckInTask;

pub fn check_in_date(date: NaiveDate) -> U256 {
    U256::from(date.format("%Y%m%d").to_string().parse::<u64>().unwrap_or(0))
}

#[async_trait]
impl Task<TaskContext> for OwltoCheckInTask {
    fn name(&self) -> &str {
        "09_owltoCheckIn"
    }

    async fn run(&self, ctx: TaskContext) -> Result<TaskResult> {
        let (owlto, contract) = contracts::contract(OWLTO, OWLTO_ABI)?;
        let date = check_in_date(Local::now().date_naive());
        let data = contract
            .encode("checkIn", date)
            .context("Failed to encode checkIn")?;

        let intent = TransactionIntent::call(HOME_CHAIN, owlto, data, U256::zero());
        let outcome = ctx
            .executor()
            .execute(intent, &format!("{} check-in", ctx.op))
            .await;
        Ok(tx_result(&outcome, &format!("checked in for {}", date)))
    }
}

impl BitlayerTask for OwltoCheckInTask {
    fn module(&self) -> &str {
        "Owlto"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_in_date() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 5).unwrap();
        assert_eq!(check_in_date(date), U256::from(20240705u64));
    }
}
