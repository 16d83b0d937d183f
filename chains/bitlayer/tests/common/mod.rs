#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Bytes as Body;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use bitlayer_project::account::Account;
use bitlayer_project::client::{ChainClient, ChainConnector, FeeParams, Receipt};
use bitlayer_project::config::{BitlayerConfig, ChainSpec};
use bitlayer_project::executor::ExecutorPolicy;
use bitlayer_project::task::{OpContext, TaskContext};
use chrono::{DateTime, Utc};
use core_logic::{ChainError, Pacer, SecretKey, SleepRange};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::abi::Token;
use ethers::types::{Address, Bytes, TxHash, U256};
use ethers::utils::{id, keccak256};
use serde_json::Value;
use ethers::utils::rlp::Rlp;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

pub const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const CONFIG: &str = r#"
[settings]
retry_count = 2
sleep_between_actions = [1, 2]
min_balance = 0.001

[chains.bitlayer]
rpc = "https://rpc.ankr.com/bitlayer"
explorer = "https://www.btrscan.com"
chain_id = 200901
token = "BTC"
eip1559 = false

[chains.arbitrum]
rpc = "https://rpc.ankr.com/arbitrum"
explorer = "https://arbiscan.io"
chain_id = 42161
"#;

pub fn config() -> BitlayerConfig {
    BitlayerConfig::from_toml_str(CONFIG).unwrap()
}

pub fn account() -> Account {
    let key = SecretKey::parse(KEY, 1).unwrap();
    Account::from_secret(&key, 200901).unwrap()
}

pub fn policy(max_retries: u32) -> ExecutorPolicy {
    ExecutorPolicy {
        max_retries,
        escalation_bps: 11_000,
        fee_bump_percent: 10,
        receipt_timeout: Duration::from_secs(30),
        backoff: SleepRange::fixed(5),
    }
}

/// What happens to the next broadcast transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mined {
    Success,
    Reverted,
    Timeout,
}

/// Fields of a broadcast transaction, decoded from the raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTx {
    pub nonce: U256,
    pub gas: U256,
    pub value: U256,
    pub to: Option<Address>,
    pub data: Bytes,
}

impl SentTx {
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.data.get(..4).and_then(|s| s.try_into().ok())
    }
}

/// In-memory chain. The pending nonce advances on every broadcast.
pub struct MockChainClient {
    spec: ChainSpec,
    nonce: Mutex<U256>,
    balance: Mutex<U256>,
    estimate: Mutex<Result<u64, ChainError>>,
    receipts: Mutex<VecDeque<Mined>>,
    sent: Mutex<Vec<SentTx>>,
    calls: Mutex<HashMap<[u8; 4], Bytes>>,
    pub nonce_reads: AtomicUsize,
    pub estimates: AtomicUsize,
}

impl MockChainClient {
    pub fn new(spec: ChainSpec) -> Self {
        Self {
            spec,
            nonce: Mutex::new(U256::from(7u64)),
            balance: Mutex::new(U256::exp10(18)),
            estimate: Mutex::new(Ok(100_000)),
            receipts: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            calls: Mutex::new(HashMap::new()),
            nonce_reads: AtomicUsize::new(0),
            estimates: AtomicUsize::new(0),
        }
    }

    pub fn bitlayer() -> Self {
        Self::new(config().home_chain().unwrap().clone())
    }

    pub fn with_balance(self, balance: U256) -> Self {
        *self.balance.lock().unwrap() = balance;
        self
    }

    pub fn with_estimate(self, estimate: Result<u64, ChainError>) -> Self {
        *self.estimate.lock().unwrap() = estimate;
        self
    }

    /// Outcomes for successive broadcasts; anything beyond the script succeeds.
    pub fn with_receipts(self, script: &[Mined]) -> Self {
        self.receipts.lock().unwrap().extend(script.iter().copied());
        self
    }

    /// ABI-encoded `output` for every `eth_call` to `signature`, whatever the target.
    pub fn with_call(self, signature: &str, output: Vec<Token>) -> Self {
        self.calls
            .lock()
            .unwrap()
            .insert(id(signature), Bytes::from(ethers::abi::encode(&output)));
        self
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    fn chain(&self) -> &ChainSpec {
        &self.spec
    }

    async fn get_nonce(&self, _address: Address) -> Result<U256, ChainError> {
        self.nonce_reads.fetch_add(1, Ordering::SeqCst);
        Ok(*self.nonce.lock().unwrap())
    }

    async fn get_balance(
        &self,
        _address: Address,
        _token: Option<Address>,
    ) -> Result<U256, ChainError> {
        Ok(*self.balance.lock().unwrap())
    }

    async fn estimate_gas(&self, _tx: &TypedTransaction) -> Result<u64, ChainError> {
        self.estimates.fetch_add(1, Ordering::SeqCst);
        self.estimate.lock().unwrap().clone()
    }

    async fn current_fee_parameters(&self) -> Result<FeeParams, ChainError> {
        Ok(FeeParams::Legacy {
            gas_price: U256::from(50_000_000u64),
        })
    }

    async fn broadcast(&self, raw: Bytes) -> Result<TxHash, ChainError> {
        let (tx, _sig) = TypedTransaction::decode_signed(&Rlp::new(raw.as_ref()))
            .map_err(|e| ChainError::Broadcast(e.to_string()))?;
        self.sent.lock().unwrap().push(SentTx {
            nonce: tx.nonce().copied().unwrap_or_default(),
            gas: tx.gas().copied().unwrap_or_default(),
            value: tx.value().copied().unwrap_or_default(),
            to: tx.to_addr().copied(),
            data: tx.data().cloned().unwrap_or_default(),
        });

        let mut nonce = self.nonce.lock().unwrap();
        *nonce += U256::one();
        Ok(TxHash::from(keccak256(raw.as_ref())))
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> Result<Receipt, ChainError> {
        let next = self
            .receipts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Mined::Success);
        match next {
            Mined::Timeout => Err(ChainError::ConfirmationTimeout {
                tx_hash: format!("{:?}", tx_hash),
                timeout_secs: timeout.as_secs(),
            }),
            mined => Ok(Receipt {
                tx_hash,
                status: mined == Mined::Success,
                block_number: Some(1),
                gas_used: Some(U256::from(21_000u64)),
            }),
        }
    }

    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes, ChainError> {
        let selector: [u8; 4] = tx
            .data()
            .and_then(|d| d.get(..4))
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| ChainError::Rpc("eth_call without selector".to_string()))?;
        self.calls
            .lock()
            .unwrap()
            .get(&selector)
            .cloned()
            .ok_or_else(|| {
                ChainError::Rpc(format!(
                    "eth_call 0x{} is not scripted",
                    hex_selector(selector)
                ))
            })
    }
}

fn hex_selector(selector: [u8; 4]) -> String {
    selector.iter().map(|b| format!("{:02x}", b)).collect()
}

pub struct MockConnector {
    clients: HashMap<String, Arc<MockChainClient>>,
}

impl MockConnector {
    pub fn new(clients: Vec<Arc<MockChainClient>>) -> Self {
        Self {
            clients: clients
                .into_iter()
                .map(|c| (c.chain().name.clone(), c))
                .collect(),
        }
    }
}

impl ChainConnector for MockConnector {
    fn connect(&self, chain: &str) -> Result<Arc<dyn ChainClient>> {
        let client: Arc<dyn ChainClient> = self
            .clients
            .get(chain)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Chain '{}' is not configured", chain))?;
        Ok(client)
    }
}

#[derive(Default)]
pub struct CountingPacer {
    pub pauses: AtomicUsize,
}

impl CountingPacer {
    pub fn count(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Pacer for CountingPacer {
    async fn pause(&self, _range: SleepRange, _label: &str) -> Duration {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        Duration::ZERO
    }

    async fn sleep_until(&self, _at: DateTime<Utc>, _label: &str) {}
}

pub fn task_context(client: Arc<MockChainClient>, pacer: Arc<CountingPacer>) -> TaskContext {
    task_context_with(client, pacer, config())
}

pub fn task_context_with(
    client: Arc<MockChainClient>,
    pacer: Arc<CountingPacer>,
    config: BitlayerConfig,
) -> TaskContext {
    let account = account();
    TaskContext {
        op: OpContext {
            index: 1,
            total: 1,
            address: account.checksum(),
            module: "Test".to_string(),
        },
        account,
        client: client.clone(),
        connector: Arc::new(MockConnector::new(vec![client])),
        config: Arc::new(config),
        pacer,
        policy: policy(1),
        proxy: None,
    }
}

/// Config whose web APIs point at `base_url`, polling without delay.
pub fn config_for_site(base_url: &str) -> BitlayerConfig {
    let mut config = config();
    config.api.bitlayer = base_url.to_string();
    config.api.minibridge = base_url.to_string();
    config.api.btc_price = format!("{}/ticker", base_url);
    config.modules.status_poll_interval_secs = 0;
    config.modules.draw_result_wait_secs = 0;
    config
}

/// A request received by [`MockSite`].
#[derive(Debug, Clone)]
pub struct SiteRequest {
    pub method: String,
    pub path: String,
    pub body: Value,
}

/// Local HTTP server answering scripted JSON per `METHOD /path` (query
/// ignored). Responses are served in order and the last one repeats;
/// unscripted paths get a 404.
#[derive(Clone, Default)]
pub struct MockSite {
    routes: Arc<Mutex<HashMap<String, VecDeque<Value>>>>,
    requests: Arc<Mutex<Vec<SiteRequest>>>,
}

impl MockSite {
    pub fn new() -> Self {
        Self::default().route("POST", "/me/login", vec![serde_json::json!({"message": "ok"})])
    }

    pub fn route(self, method: &str, path: &str, responses: Vec<Value>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(format!("{} {}", method, path), responses.into());
        self
    }

    /// Starts serving on an ephemeral port and returns the base URL.
    pub async fn serve(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().fallback(answer).with_state(self.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    pub fn requests(&self) -> Vec<SiteRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self, method: &str, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

async fn answer(State(site): State<MockSite>, method: Method, uri: Uri, body: Body) -> Response {
    site.requests.lock().unwrap().push(SiteRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    let key = format!("{} {}", method, uri.path());
    let mut routes = site.routes.lock().unwrap();
    let next = routes.get_mut(&key).and_then(|queue| {
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    });
    match next {
        Some(value) => Json(value).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Collects every event message, in order.
pub struct LogCapture(pub Arc<Mutex<Vec<String>>>);

struct MessageVisitor(String);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{:?}", value);
        }
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.0.lock().unwrap().push(visitor.0);
    }
}
