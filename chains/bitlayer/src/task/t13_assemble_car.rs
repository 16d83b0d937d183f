//! Car assembly from the parts won in lucky draws.

use crate::api::BitlayerApi;
use crate::task::{BitlayerTask, Task, TaskContext, TaskResult};
use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

/// Normal, premium and top cars.
pub const STAR_RATINGS: [u8; 3] = [1, 2, 3];

/// Upper bound on cars built per rating in one run.
pub const ASSEMBLE_LIMIT: u32 = 10;

/// Builds cars of each rating until the site declines. Returns how many
/// were built.
pub async fn assemble_cars(api: &BitlayerApi, op: &str) -> Result<u32> {
    let mut built = 0;
    for rating in STAR_RATINGS {
        for _ in 0..ASSEMBLE_LIMIT {
            if !api.assemble_car(rating).await? {
                break;
            }
            built += 1;
            info!("{} Assembled a {}-star car | SUCCESS", op, rating);
        }
    }

    let cars = api.car_info().await?;
    info!(
        "{} Garage: {} normal, {} premium, {} top",
        op, cars.normal_car_amount, cars.premium_car_amount, cars.top_car_amount
    );
    Ok(built)
}

pub struct AssembleCarTask;

#[async_trait]
impl Task<TaskContext> for AssembleCarTask {
    fn name(&self) -> &str {
        "13_assembleCar"
    }

    async fn run(&self, ctx: TaskContext) -> Result<TaskResult> {
        let op = ctx.op.to_string();
        let api = ctx.bitlayer_api()?;
        api.login(ctx.account.wallet()).await?;

        let built = assemble_cars(&api, &op).await?;
        if built == 0 {
            warn!("{} Not enough parts for a car", op);
            return Ok(TaskResult::skipped("no car parts to assemble"));
        }
        Ok(TaskResult::success(format!("assembled {} car(s)", built)))
    }
}

impl BitlayerTask for AssembleCarTask {
    fn module(&self) -> &str {
        "Bitlayer"
    }
}
