use crate::client::FeeParams;
use core_logic::ChainError;
use ethers::prelude::*;
use std::sync::Arc;
use tracing::debug;

/// Reads fee parameters from a node.
#[derive(Clone, Debug)]
pub struct GasManager {
    provider: Arc<Provider<Http>>,
}

impl GasManager {
    pub fn new(provider: Arc<Provider<Http>>) -> Self {
        Self { provider }
    }

    pub async fn fee_params(&self, eip1559: bool) -> Result<FeeParams, ChainError> {
        if !eip1559 {
            let gas_price = self
                .provider
                .get_gas_price()
                .await
                .map_err(|e| ChainError::Rpc(format!("eth_gasPrice: {}", e)))?;
            return Ok(FeeParams::Legacy { gas_price });
        }

        // 1. Base fee from the latest block
        let block = self
            .provider
            .get_block(BlockNumber::Latest)
            .await
            .map_err(|e| ChainError::Rpc(format!("eth_getBlockByNumber: {}", e)))?
            .ok_or_else(|| ChainError::Rpc("latest block missing".to_string()))?;

        let base_fee = block
            .base_fee_per_gas
            .ok_or_else(|| ChainError::Rpc("base fee missing in block".to_string()))?;

        // 2. Node's priority fee suggestion, falling back to the fee history estimator
        let priority_fee = match self
            .provider
            .request::<_, U256>("eth_maxPriorityFeePerGas", ())
            .await
        {
            Ok(fee) => fee,
            Err(e) => {
                debug!("eth_maxPriorityFeePerGas unavailable ({}), using estimator", e);
                let (_, prio) = self
                    .provider
                    .estimate_eip1559_fees(None)
                    .await
                    .map_err(|e| ChainError::Rpc(format!("fee estimation: {}", e)))?;
                prio
            }
        };

        Ok(FeeParams::Eip1559 {
            base_fee,
            priority_fee,
        })
    }
}

/// `(base + priority) * (100 + bump_percent) / 100`
pub fn max_fee_per_gas(base_fee: U256, priority_fee: U256, bump_percent: u64) -> U256 {
    (base_fee + priority_fee) * U256::from(100 + bump_percent) / U256::from(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_fee_bump() {
        let max = max_fee_per_gas(U256::from(100u64), U256::from(20u64), 5);
        assert_eq!(max, U256::from(126u64));
    }

    #[test]
    fn test_max_fee_rounds_down() {
        let max = max_fee_per_gas(U256::from(7u64), U256::from(3u64), 5);
        // 10 * 105 / 100 = 10.5
        assert_eq!(max, U256::from(10u64));
    }
}
