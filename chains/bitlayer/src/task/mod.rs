use crate::account::Account;
use crate::api::BitlayerApi;
use crate::client::{ChainClient, ChainConnector};
use crate::config::{BitlayerConfig, HOME_CHAIN};
use crate::executor::{ExecutorPolicy, TransactionExecutor, TxOutcome};
use crate::utils::units::{from_wei, to_wei, NATIVE_DECIMALS};
use anyhow::Result;
use async_trait::async_trait;
use core_logic::{AccountAction, BatchEntry, Pacer, ProxyConfig};
use ethers::types::U256;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

pub mod contracts;
pub mod t01_parse_accounts;
pub mod t02_lucky_draw;
pub mod t03_daily_tasks;
pub mod t04_txn_tasks;
pub mod t05_minibridge;
pub mod t06_wrap_btc;
pub mod t07_unwrap_wbtc;
pub mod t08_bitcow_swap;
pub mod t09_owlto_check_in;
pub mod t10_avalon_deposit;
pub mod t11_layerbank_supply;
pub mod t12_treasure_box;
pub mod t13_assemble_car;
pub mod t14_btcfi_daily_check;

pub use self::t01_parse_accounts::{AccountStats, ParseAccounts};
pub use self::t02_lucky_draw::LuckyDrawTask;
pub use self::t03_daily_tasks::DailyTasksTask;
pub use self::t04_txn_tasks::TxnTasksTask;
pub use self::t05_minibridge::{bridge_value, MinibridgeTask};
pub use self::t06_wrap_btc::WrapBtcTask;
pub use self::t07_unwrap_wbtc::UnwrapWbtcTask;
pub use self::t08_bitcow_swap::{BitcowSwapTask, SwapTarget};
pub use self::t09_owlto_check_in::OwltoCheckInTask;
pub use self::t10_avalon_deposit::AvalonDepositTask;
pub use self::t11_layerbank_supply::LayerbankSupplyTask;
pub use self::t12_treasure_box::TreasureBoxTask;
pub use self::t13_assemble_car::{assemble_cars, AssembleCarTask};
pub use self::t14_btcfi_daily_check::BtcfiDailyCheckTask;

pub use core_logic::traits::{Task, TaskResult};

/// A task runnable from the menu.
pub trait BitlayerTask: Task<TaskContext> {
    /// Module tag in log lines, e.g. `"WBTC"`.
    fn module(&self) -> &str;
}

/// Who and where, for log lines: `[3/10] 0xAbC... | Minibridge |`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpContext {
    pub index: usize,
    pub total: usize,
    pub address: String,
    pub module: String,
}

impl OpContext {
    /// `[3/10] 0xAbC... | Minibridge`, without the trailing separator.
    pub fn tag(&self) -> String {
        format!(
            "[{}/{}] {} | {}",
            self.index, self.total, self.address, self.module
        )
    }
}

impl fmt::Display for OpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} |", self.tag())
    }
}

/// Everything one account's task needs. Cheap to clone.
#[derive(Clone)]
pub struct TaskContext {
    pub account: Account,
    /// Bitlayer mainnet.
    pub client: Arc<dyn ChainClient>,
    /// Other configured chains, for bridging.
    pub connector: Arc<dyn ChainConnector>,
    pub config: Arc<BitlayerConfig>,
    pub pacer: Arc<dyn Pacer>,
    pub policy: ExecutorPolicy,
    pub proxy: Option<ProxyConfig>,
    pub op: OpContext,
}

impl TaskContext {
    /// Executor on the home chain.
    pub fn executor(&self) -> TransactionExecutor {
        self.executor_on(self.client.clone())
    }

    pub fn executor_on(&self, client: Arc<dyn ChainClient>) -> TransactionExecutor {
        let wallet = self
            .account
            .on_chain(client.chain().chain_id)
            .wallet()
            .clone();
        TransactionExecutor::new(client, wallet, self.policy, self.pacer.clone())
    }

    /// Same account, relabelled for another module.
    pub fn for_module(&self, module: &str) -> Self {
        let mut ctx = self.clone();
        ctx.op.module = module.to_string();
        ctx
    }

    /// Points-site session for this account, through its proxy.
    pub fn bitlayer_api(&self) -> Result<BitlayerApi> {
        BitlayerApi::new(
            &self.config.api.bitlayer,
            self.proxy.as_ref(),
            self.op.to_string(),
        )
    }

    pub fn min_balance(&self) -> Result<U256> {
        to_wei(self.config.settings.min_balance, NATIVE_DECIMALS)
    }

    pub async fn pause_between_actions(&self) {
        let label = self.op.tag();
        self.pacer
            .pause(self.config.settings.sleep_between_actions, &label)
            .await;
    }
}

/// A deliberate no-op: the action did not apply to this account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip(pub String);

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Skip> for TaskResult {
    fn from(skip: Skip) -> Self {
        TaskResult::skipped(skip.0)
    }
}

/// Guard for balance-sensitive actions. A balance that cannot be read also
/// skips, with the read error as the reason.
pub async fn require_min_balance(ctx: &TaskContext, threshold: U256) -> Result<(), Skip> {
    let balance = ctx
        .client
        .get_balance(ctx.account.address(), None)
        .await
        .map_err(|e| Skip(format!("balance unavailable: {}", e)))?;

    if balance < threshold {
        return Err(Skip(format!(
            "balance {} {} is under {} {}",
            from_wei(balance, NATIVE_DECIMALS),
            ctx.client.chain().token,
            from_wei(threshold, NATIVE_DECIMALS),
            ctx.client.chain().token
        )));
    }
    Ok(())
}

/// Runs the balance guard and logs the skip.
pub async fn gate(ctx: &TaskContext) -> Result<Option<TaskResult>> {
    let threshold = ctx.min_balance()?;
    match require_min_balance(ctx, threshold).await {
        Ok(()) => Ok(None),
        Err(skip) => {
            warn!("{} Skipped: {}", ctx.op, skip);
            Ok(Some(skip.into()))
        }
    }
}

/// Maps an executor outcome to the task result the runner records.
pub fn tx_result(outcome: &TxOutcome, what: &str) -> TaskResult {
    let tx_hash = outcome.tx_hash().map(|h| format!("{:?}", h));
    match outcome {
        TxOutcome::Confirmed { .. } => TaskResult::success(what).with_tx_hash(tx_hash),
        TxOutcome::Failed { reason, .. } => {
            TaskResult::failed(format!("{}: {}", what, reason)).with_tx_hash(tx_hash)
        }
        TxOutcome::Skipped { reason } => TaskResult::skipped(reason.clone()),
    }
}

/// Shared, per-run state from which a `TaskContext` is built for each account.
#[derive(Clone)]
pub struct Environment {
    pub connector: Arc<dyn ChainConnector>,
    pub config: Arc<BitlayerConfig>,
    pub pacer: Arc<dyn Pacer>,
    pub policy: ExecutorPolicy,
}

impl Environment {
    pub fn context(
        &self,
        entry: &BatchEntry<Account>,
        position: usize,
        total: usize,
        module: &str,
    ) -> Result<TaskContext> {
        Ok(TaskContext {
            account: entry.item.clone(),
            client: self.connector.connect(HOME_CHAIN)?,
            connector: self.connector.clone(),
            config: self.config.clone(),
            pacer: self.pacer.clone(),
            policy: self.policy,
            proxy: entry.proxy.clone(),
            op: OpContext {
                index: position,
                total,
                address: entry.item.checksum(),
                module: module.to_string(),
            },
        })
    }
}

/// Adapts a `Task<TaskContext>` to the batch runner.
pub struct TaskAction {
    task: Arc<dyn BitlayerTask>,
    env: Environment,
}

impl TaskAction {
    pub fn new(task: Arc<dyn BitlayerTask>, env: Environment) -> Self {
        Self { task, env }
    }
}

#[async_trait]
impl AccountAction<Account> for TaskAction {
    fn name(&self) -> &str {
        self.task.name()
    }

    async fn run(
        &self,
        entry: &BatchEntry<Account>,
        position: usize,
        total: usize,
    ) -> Result<TaskResult> {
        let ctx = self.env.context(entry, position, total, self.task.module())?;
        self.task.run(ctx).await
    }
}

/// What the interactive menu offers.
pub enum MenuAction {
    ParseAccounts,
    Run(Arc<dyn BitlayerTask>),
}

pub fn menu(config: &BitlayerConfig) -> Vec<(String, MenuAction)> {
    let wrap = config.modules.wrap_tx_count;
    vec![
        ("Parse Accounts".to_string(), MenuAction::ParseAccounts),
        ("Free Draw".to_string(), MenuAction::Run(Arc::new(LuckyDrawTask))),
        ("Claim Daily Tasks".to_string(), MenuAction::Run(Arc::new(DailyTasksTask))),
        ("Claim Total TXN".to_string(), MenuAction::Run(Arc::new(TxnTasksTask))),
        (
            "Minibridge EVM > Bitlayer".to_string(),
            MenuAction::Run(Arc::new(MinibridgeTask)),
        ),
        ("Open Treasure Box".to_string(), MenuAction::Run(Arc::new(TreasureBoxTask))),
        ("Assemble Car".to_string(), MenuAction::Run(Arc::new(AssembleCarTask))),
        (
            "BTCFi Daily Check".to_string(),
            MenuAction::Run(Arc::new(BtcfiDailyCheckTask)),
        ),
        (
            format!("Wrap BTC {} to {} times", wrap.min, wrap.max),
            MenuAction::Run(Arc::new(WrapBtcTask)),
        ),
        ("Unwrap WBTC".to_string(), MenuAction::Run(Arc::new(UnwrapWbtcTask))),
        (
            "Swap BTC > WBTC > BTC".to_string(),
            MenuAction::Run(Arc::new(BitcowSwapTask::new(SwapTarget::Wbtc))),
        ),
        (
            "Swap BTC > BITUSD > WBTC".to_string(),
            MenuAction::Run(Arc::new(BitcowSwapTask::new(SwapTarget::Bitusd))),
        ),
        ("Check in with Owlto".to_string(), MenuAction::Run(Arc::new(OwltoCheckInTask))),
        ("Deposit to Avalon".to_string(), MenuAction::Run(Arc::new(AvalonDepositTask))),
        (
            "Deposit to LayerBank".to_string(),
            MenuAction::Run(Arc::new(LayerbankSupplyTask)),
        ),
    ]
}
