//! # Transaction Executor
//!
//! Builds, signs, submits and confirms one [`TransactionIntent`], retrying
//! with an escalated gas limit when the transaction reverts, is rejected, or
//! is not mined in time.
//!
//! Per attempt:
//! 1. fresh nonce (pending tag) and fee parameters;
//! 2. gas limit: estimated once, then `initial * factor^(attempt - 1)`;
//! 3. local signature, raw broadcast, receipt wait.
//!
//! A failed gas estimate ends the execution immediately: the call would
//! revert again no matter the gas. Every other failure is retried after a
//! randomized backoff until `max_retries` is used up, and the result is
//! returned as a [`TxOutcome`] rather than an error.

use crate::client::{ChainClient, FeeParams};
use crate::utils::gas::max_fee_per_gas;
use core_logic::{escalate_gas, ChainError, GasConfig, Pacer, RunSettings, SleepRange};
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// An unsigned transaction as produced by an integration.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionIntent {
    pub to: Address,
    /// Calldata; empty for plain transfers.
    pub data: Bytes,
    /// Wei.
    pub value: U256,
    pub chain: String,
}

impl TransactionIntent {
    pub fn call(chain: &str, to: Address, data: Bytes, value: U256) -> Self {
        Self {
            to,
            data,
            value,
            chain: chain.to_string(),
        }
    }

    pub fn transfer(chain: &str, to: Address, value: U256) -> Self {
        Self::call(chain, to, Bytes::default(), value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    Confirmed {
        tx_hash: TxHash,
        attempts: u32,
    },
    Failed {
        reason: String,
        attempts: u32,
        tx_hash: Option<TxHash>,
    },
    Skipped {
        reason: String,
    },
}

impl TxOutcome {
    /// Only a confirmed transaction allows dependent follow-up steps.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, TxOutcome::Confirmed { .. })
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            TxOutcome::Confirmed { tx_hash, .. } => Some(*tx_hash),
            TxOutcome::Failed { tx_hash, .. } => *tx_hash,
            TxOutcome::Skipped { .. } => None,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            TxOutcome::Confirmed { attempts, .. } | TxOutcome::Failed { attempts, .. } => {
                *attempts
            }
            TxOutcome::Skipped { .. } => 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExecutorPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Gas limit multiplier per retry, in basis points.
    pub escalation_bps: u64,
    pub fee_bump_percent: u64,
    pub receipt_timeout: Duration,
    pub backoff: SleepRange,
}

impl ExecutorPolicy {
    pub fn from_config(settings: &RunSettings, gas: &GasConfig) -> Self {
        Self {
            max_retries: settings.retry_count,
            escalation_bps: gas.escalation_bps(),
            fee_bump_percent: gas.fee_bump_percent,
            receipt_timeout: gas.receipt_timeout(),
            backoff: settings.sleep_between_actions,
        }
    }
}

/// Scoped to one `execute` call.
struct RetryState {
    attempt: u32,
    initial_gas: Option<u64>,
    last_tx_hash: Option<TxHash>,
}

struct AttemptError {
    error: ChainError,
    tx_hash: Option<TxHash>,
}

impl From<ChainError> for AttemptError {
    fn from(error: ChainError) -> Self {
        Self {
            error,
            tx_hash: None,
        }
    }
}

/// Executes intents for one account on one chain.
pub struct TransactionExecutor {
    client: Arc<dyn ChainClient>,
    wallet: LocalWallet,
    policy: ExecutorPolicy,
    pacer: Arc<dyn Pacer>,
}

impl TransactionExecutor {
    pub fn new(
        client: Arc<dyn ChainClient>,
        wallet: LocalWallet,
        policy: ExecutorPolicy,
        pacer: Arc<dyn Pacer>,
    ) -> Self {
        let chain_id = client.chain().chain_id;
        Self {
            client,
            wallet: wallet.with_chain_id(chain_id),
            policy,
            pacer,
        }
    }

    pub fn client(&self) -> &Arc<dyn ChainClient> {
        &self.client
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub async fn execute(&self, intent: TransactionIntent, label: &str) -> TxOutcome {
        let chain = self.client.chain();
        if intent.chain != chain.name {
            let reason = format!(
                "intent targets '{}' but executor is bound to '{}'",
                intent.chain, chain.name
            );
            error!("{} | FAILED | {}", label, reason);
            return TxOutcome::Failed {
                reason,
                attempts: 0,
                tx_hash: None,
            };
        }

        let max_attempts = self.policy.max_retries + 1;
        let mut state = RetryState {
            attempt: 0,
            initial_gas: None,
            last_tx_hash: None,
        };
        let mut last_error = String::new();

        while state.attempt < max_attempts {
            state.attempt += 1;

            match self.attempt(&intent, label, &mut state).await {
                Ok(tx_hash) => {
                    let after = if state.attempt > 1 {
                        format!(" after {} attempts", state.attempt)
                    } else {
                        String::new()
                    };
                    info!("{} | Tx confirmed{} | SUCCESS", label, after);
                    return TxOutcome::Confirmed {
                        tx_hash,
                        attempts: state.attempt,
                    };
                }
                Err(AttemptError { error: e, tx_hash }) => {
                    if tx_hash.is_some() {
                        state.last_tx_hash = tx_hash;
                    }

                    if !e.is_retryable() {
                        error!("{} | FAILED | {}", label, e);
                        return TxOutcome::Failed {
                            reason: e.to_string(),
                            attempts: state.attempt,
                            tx_hash: state.last_tx_hash,
                        };
                    }

                    error!(
                        "{} | Tx FAILED (attempt {}/{}): {}",
                        label, state.attempt, max_attempts, e
                    );
                    last_error = e.to_string();

                    if state.attempt < max_attempts {
                        self.pacer.pause(self.policy.backoff, label).await;
                    }
                }
            }
        }

        TxOutcome::Failed {
            reason: last_error,
            attempts: state.attempt,
            tx_hash: state.last_tx_hash,
        }
    }

    async fn attempt(
        &self,
        intent: &TransactionIntent,
        label: &str,
        state: &mut RetryState,
    ) -> Result<TxHash, AttemptError> {
        let from = self.wallet.address();
        let chain = self.client.chain();

        // Building
        let nonce = self.client.get_nonce(from).await?;
        let fees = self.client.current_fee_parameters().await?;

        let mut tx = self.build(intent, from, nonce, fees);

        let gas_limit = match state.initial_gas {
            Some(initial) => escalate_gas(initial, self.policy.escalation_bps, state.attempt),
            None => {
                let estimated = self.client.estimate_gas(&tx).await?;
                state.initial_gas = Some(estimated);
                escalate_gas(estimated, self.policy.escalation_bps, state.attempt)
            }
        };
        tx.set_gas(gas_limit);

        debug!(
            "{} | attempt {} nonce {} gas {} fees {:?}",
            label, state.attempt, nonce, gas_limit, fees
        );

        // Signing
        let signature = self
            .wallet
            .sign_transaction(&tx)
            .await
            .map_err(|e| ChainError::Signing(e.to_string()))?;
        let raw = tx.rlp_signed(&signature);

        // Submitted
        let tx_hash = self.client.broadcast(raw).await?;
        info!("{} | {}/tx/{:?}", label, chain.explorer, tx_hash);

        // Confirming
        let receipt = self
            .client
            .wait_for_receipt(tx_hash, self.policy.receipt_timeout)
            .await
            .map_err(|error| AttemptError {
                error,
                tx_hash: Some(tx_hash),
            })?;

        if receipt.status {
            Ok(tx_hash)
        } else {
            Err(AttemptError {
                error: ChainError::Reverted {
                    tx_hash: format!("{:?}", tx_hash),
                },
                tx_hash: Some(tx_hash),
            })
        }
    }

    fn build(
        &self,
        intent: &TransactionIntent,
        from: Address,
        nonce: U256,
        fees: FeeParams,
    ) -> TypedTransaction {
        let chain_id = self.client.chain().chain_id;

        match fees {
            FeeParams::Legacy { gas_price } => TransactionRequest::new()
                .from(from)
                .to(intent.to)
                .data(intent.data.clone())
                .value(intent.value)
                .nonce(nonce)
                .gas_price(gas_price)
                .chain_id(chain_id)
                .into(),
            FeeParams::Eip1559 {
                base_fee,
                priority_fee,
            } => Eip1559TransactionRequest::new()
                .from(from)
                .to(intent.to)
                .data(intent.data.clone())
                .value(intent.value)
                .nonce(nonce)
                .max_priority_fee_per_gas(priority_fee)
                .max_fee_per_gas(max_fee_per_gas(
                    base_fee,
                    priority_fee,
                    self.policy.fee_bump_percent,
                ))
                .chain_id(chain_id)
                .into(),
        }
    }
}
