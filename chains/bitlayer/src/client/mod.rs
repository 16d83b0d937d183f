//! Chain access used by the executor and the integrations.
//!
//! Everything that talks to an RPC node goes through [`ChainClient`], so the
//! transaction engine can run against an in-memory chain in tests.

pub mod rpc;

use crate::config::ChainSpec;
use anyhow::Result;
use async_trait::async_trait;
use core_logic::ChainError;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TxHash, U256};
use std::sync::Arc;
use std::time::Duration;

pub use rpc::{RpcClient, RpcConnector};

/// Fee parameters for the next submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeParams {
    Legacy { gas_price: U256 },
    Eip1559 { base_fee: U256, priority_fee: U256 },
}

/// The parts of a transaction receipt the bot cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    /// `true` when the receipt status is 1.
    pub status: bool,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain(&self) -> &ChainSpec;

    /// Next usable nonce (pending tag). Never cached.
    async fn get_nonce(&self, address: Address) -> Result<U256, ChainError>;

    /// Native balance when `token` is `None`, otherwise ERC20 `balanceOf`.
    async fn get_balance(&self, address: Address, token: Option<Address>)
        -> Result<U256, ChainError>;

    /// Fails with `ChainError::GasEstimation` when the call would revert.
    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<u64, ChainError>;

    async fn current_fee_parameters(&self) -> Result<FeeParams, ChainError>;

    async fn broadcast(&self, raw: Bytes) -> Result<TxHash, ChainError>;

    /// Fails with `ChainError::ConfirmationTimeout` once `timeout` elapses.
    async fn wait_for_receipt(&self, tx_hash: TxHash, timeout: Duration)
        -> Result<Receipt, ChainError>;

    /// Read-only `eth_call` against the latest block.
    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes, ChainError>;
}

/// Opens a client for a configured chain by name.
pub trait ChainConnector: Send + Sync {
    fn connect(&self, chain: &str) -> Result<Arc<dyn ChainClient>>;
}
