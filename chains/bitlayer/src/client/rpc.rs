use crate::client::{ChainClient, ChainConnector, FeeParams, Receipt};
use crate::config::ChainSpec;
use crate::utils::erc20;
use crate::utils::gas::GasManager;
use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::ChainError;
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// `ChainClient` over an HTTP JSON-RPC endpoint.
pub struct RpcClient {
    provider: Arc<Provider<Http>>,
    gas: GasManager,
    chain: ChainSpec,
    poll_interval: Duration,
}

impl RpcClient {
    pub fn new(chain: ChainSpec, poll_interval: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        let url = url::Url::parse(&chain.rpc)
            .with_context(|| format!("Invalid RPC URL {}", chain.rpc))?;

        let provider = Arc::new(Provider::new(Http::new_with_client(url, client)));

        Ok(Self {
            gas: GasManager::new(provider.clone()),
            provider,
            chain,
            poll_interval,
        })
    }

    pub fn provider(&self) -> &Provider<Http> {
        &self.provider
    }
}

#[async_trait]
impl ChainClient for RpcClient {
    fn chain(&self) -> &ChainSpec {
        &self.chain
    }

    async fn get_nonce(&self, address: Address) -> Result<U256, ChainError> {
        self.provider
            .get_transaction_count(address, Some(BlockNumber::Pending.into()))
            .await
            .map_err(|e| ChainError::Rpc(format!("eth_getTransactionCount: {}", e)))
    }

    async fn get_balance(
        &self,
        address: Address,
        token: Option<Address>,
    ) -> Result<U256, ChainError> {
        match token {
            None => self
                .provider
                .get_balance(address, None)
                .await
                .map_err(|e| ChainError::Rpc(format!("eth_getBalance: {}", e))),
            Some(token) => erc20::balance_of(self, token, address)
                .await
                .map_err(|e| ChainError::Rpc(format!("balanceOf: {:#}", e))),
        }
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<u64, ChainError> {
        let gas = self
            .provider
            .estimate_gas(tx, None)
            .await
            .map_err(|e| ChainError::GasEstimation(e.to_string()))?;
        Ok(gas.min(U256::from(u64::MAX)).as_u64())
    }

    async fn current_fee_parameters(&self) -> Result<FeeParams, ChainError> {
        self.gas.fee_params(self.chain.eip1559).await
    }

    async fn broadcast(&self, raw: Bytes) -> Result<TxHash, ChainError> {
        let pending = self
            .provider
            .send_raw_transaction(raw)
            .await
            .map_err(|e| ChainError::Broadcast(e.to_string()))?;
        Ok(*pending)
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> Result<Receipt, ChainError> {
        let started = Instant::now();

        loop {
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    return Ok(Receipt {
                        tx_hash,
                        status: receipt.status == Some(U64::from(1)),
                        block_number: receipt.block_number.map(|b| b.as_u64()),
                        gas_used: receipt.gas_used,
                    });
                }
                Ok(None) => {}
                Err(e) => debug!("Receipt poll for {:?} failed: {}", tx_hash, e),
            }

            if started.elapsed() >= timeout {
                return Err(ChainError::ConfirmationTimeout {
                    tx_hash: format!("{:?}", tx_hash),
                    timeout_secs: timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes, ChainError> {
        self.provider
            .call(tx, None)
            .await
            .map_err(|e| ChainError::Rpc(format!("eth_call: {}", e)))
    }
}

/// Opens a fresh `RpcClient` per call from the configured chain table.
pub struct RpcConnector {
    chains: HashMap<String, ChainSpec>,
    poll_interval: Duration,
}

impl RpcConnector {
    pub fn new(chains: HashMap<String, ChainSpec>, poll_interval: Duration) -> Self {
        Self {
            chains,
            poll_interval,
        }
    }
}

impl ChainConnector for RpcConnector {
    fn connect(&self, chain: &str) -> Result<Arc<dyn ChainClient>> {
        let spec = self
            .chains
            .get(chain)
            .cloned()
            .with_context(|| format!("Chain '{}' is not configured", chain))?;
        Ok(Arc::new(RpcClient::new(spec, self.poll_interval)?))
    }
}
