//! Bitlayer points site client: signature login, task board, lucky draw,
//! treasure boxes, car assembly and the BTCFi daily check.

use super::{
    ensure_ok, ensure_success, http_client, lenient_f64, lenient_u64, read_json, transport_error,
};
use anyhow::{Context, Result};
use core_logic::{with_retry, NetworkError, ProxyConfig, RetryConfig};
use ethers::signers::{LocalWallet, Signer};
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub const LOGIN_MESSAGE: &str = "BITLAYER";
const IP_ECHO_URL: &str = "https://httpbin.org/ip";
const USER_DATA_ROUTE: &str = "routes/($lang)._app+/me+/_index+/_layout";
const CAR_INFO_ROUTE: &str = "routes/($lang)._app+/assemble-cars/_index";

/// Unboxing is finished once the result reports this status.
pub const UNBOXED_STATUS: u64 = 3;

/// Daily task ids with special handling.
pub const BROWSE_TASK_ID: u64 = 1;
pub const SHARE_TASK_ID: u64 = 2;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub profile: Profile,
    #[serde(default)]
    pub me_info: MeInfo,
    #[serde(default)]
    pub tasks: TaskBoard,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub total_points: u64,
    #[serde(default)]
    pub btr: f64,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub days_on_bitlayer: u32,
    #[serde(default)]
    pub txn: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeInfo {
    #[serde(default)]
    pub rank: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskBoard {
    #[serde(default)]
    pub daily_tasks: Vec<ApiTask>,
    #[serde(default)]
    pub ongoing_task: Option<ApiTask>,
    #[serde(default)]
    pub advance_tasks: Vec<ApiTask>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTask {
    pub task_id: u64,
    #[serde(default)]
    pub task_type: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub main_title: Option<String>,
    #[serde(default)]
    pub reward_points: u64,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub can_claim: bool,
    #[serde(default)]
    pub extra_data: Option<ExtraData>,
    #[serde(default)]
    pub action: Option<TaskActionInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtraData {
    #[serde(default)]
    pub cur_done_progress: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskActionInfo {
    #[serde(default)]
    pub payload: Option<TaskPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskPayload {
    #[serde(default)]
    pub progress_cfg: Vec<ProgressTier>,
}

/// Reward tier: `value` points once progress reaches `key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ProgressTier {
    pub key: u64,
    pub value: u64,
}

impl ApiTask {
    /// `mainTitle` when present, else `title`.
    pub fn display_title(&self) -> String {
        self.main_title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.title)
            .trim()
            .to_string()
    }

    pub fn progress(&self) -> Option<u64> {
        self.extra_data
            .as_ref()
            .and_then(|d| lenient_u64(&d.cur_done_progress))
    }

    pub fn progress_tiers(&self) -> &[ProgressTier] {
        self.action
            .as_ref()
            .and_then(|a| a.payload.as_ref())
            .map(|p| p.progress_cfg.as_slice())
            .unwrap_or(&[])
    }

    /// Points a claim yields now: the reached progress tier for tiered
    /// tasks, the flat reward otherwise.
    pub fn claimable_points(&self) -> u64 {
        match (self.progress(), self.progress_tiers()) {
            (Some(progress), tiers) if !tiers.is_empty() => progress_reward(progress, tiers),
            _ => self.reward_points,
        }
    }
}

/// Walks the tiers in order and keeps the value of the last one reached.
pub fn progress_reward(progress: u64, tiers: &[ProgressTier]) -> u64 {
    let mut points = 0;
    for tier in tiers {
        if progress >= tier.key {
            points = tier.value;
        } else {
            break;
        }
    }
    points
}

/// Parameters for the on-chain `lotteryReveal` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawTicket {
    pub lottery_id: String,
    pub expire_time: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawPrize {
    /// USD value paid in BTC.
    Btc(String),
    Points(String),
    Other(Value),
}

impl DrawPrize {
    pub fn from_reply(reply: &Value) -> Self {
        let value = reply
            .get("value")
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default();

        match reply.get("lottery_type").and_then(Value::as_u64) {
            Some(0) => DrawPrize::Btc(value),
            Some(1) => DrawPrize::Points(value),
            _ => DrawPrize::Other(reply.clone()),
        }
    }
}

pub fn parse_draw_ticket(body: &Value) -> Result<DrawTicket, NetworkError> {
    let invalid = |reason: &str| NetworkError::InvalidResponse {
        endpoint: "/api/draw/pre".to_string(),
        reason: format!("{}: {}", reason, body),
    };

    let lottery_id = body
        .get("lottery_id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid("missing lottery_id"))?
        .to_string();
    let expire_time = body
        .get("expire_time")
        .and_then(lenient_u64)
        .ok_or_else(|| invalid("missing expire_time"))?;

    Ok(DrawTicket {
        lottery_id,
        expire_time,
    })
}

/// A free treasure box opened for the account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BoxInfo {
    #[serde(default)]
    pub box_id: String,
    #[serde(default)]
    pub expire_at: u64,
    /// Items inside the opened box(es).
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnboxResult {
    pub btr: f64,
    pub status: u64,
    pub count: u64,
}

impl UnboxResult {
    pub fn is_done(&self) -> bool {
        self.status == UNBOXED_STATUS
    }
}

pub fn parse_unbox_result(body: &Value) -> UnboxResult {
    UnboxResult {
        btr: body.get("btr").and_then(lenient_f64).unwrap_or(0.0),
        status: body.get("status").and_then(lenient_u64).unwrap_or(0),
        count: body.get("count").and_then(lenient_u64).unwrap_or(0),
    }
}

/// Assembled cars by rank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarInfo {
    #[serde(default)]
    pub normal_car_amount: u64,
    #[serde(default)]
    pub premium_car_amount: u64,
    #[serde(default)]
    pub top_car_amount: u64,
}

impl CarInfo {
    pub fn total(&self) -> u64 {
        self.normal_car_amount + self.premium_car_amount + self.top_car_amount
    }
}

/// One logged-in session. Cookies from `/me/login` are kept by the client.
pub struct BitlayerApi {
    http: Client,
    base_url: String,
    label: String,
    proxied: bool,
}

impl BitlayerApi {
    pub fn new(
        base_url: &str,
        proxy: Option<&ProxyConfig>,
        label: impl Into<String>,
    ) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/');
        let mut headers = HeaderMap::new();
        headers.insert(
            ORIGIN,
            HeaderValue::from_str(base_url).context("Invalid Bitlayer base URL")?,
        );
        headers.insert(
            REFERER,
            HeaderValue::from_str(&format!("{}/me", base_url))
                .context("Invalid Bitlayer base URL")?,
        );

        Ok(Self {
            http: http_client(proxy, headers)?,
            base_url: base_url.to_string(),
            label: label.into(),
            proxied: proxy.is_some(),
        })
    }

    /// Logs the exit IP. Failure is only logged.
    pub async fn check_ip(&self) {
        let result: Result<Value> = async {
            let resp = self.http.get(IP_ECHO_URL).send().await?;
            Ok(resp.json::<Value>().await?)
        }
        .await;

        match result {
            Ok(body) => {
                let ip = body.get("origin").and_then(Value::as_str).unwrap_or("?");
                info!("{} Current IP: {}", self.label, ip);
            }
            Err(e) => warn!("{} Failed to get IP: {:#}", self.label, e),
        }
    }

    /// Signs the fixed challenge and opens a session.
    pub async fn login(&self, wallet: &LocalWallet) -> Result<()> {
        if self.proxied {
            self.check_ip().await;
        }

        let signature = wallet
            .sign_message(LOGIN_MESSAGE)
            .await
            .context("Failed to sign login message")?;
        let body = json!({
            "address": ethers::utils::to_checksum(&wallet.address(), None),
            "signature": format!("0x{}", hex::encode(signature.to_vec())),
        });

        let data = self.post("/me/login", &body).await?;
        ensure_ok("/me/login", &data).context("Authorization failed")?;
        debug!("{} Authorization successful", self.label);
        Ok(())
    }

    pub async fn user_data(&self) -> Result<UserData> {
        let data = with_retry(RetryConfig::new(2, 1_000), "user data", move || async move {
            Ok::<_, anyhow::Error>(self.get("/me/tasks", &[("_data", USER_DATA_ROUTE)]).await?)
        })
        .await?;
        let user: UserData = serde_json::from_value(data).map_err(|e| {
            NetworkError::InvalidResponse {
                endpoint: "/me/tasks".to_string(),
                reason: e.to_string(),
            }
        })?;

        debug!(
            "{} BTR: {}, Pts: {}, LVL: {}, Rank: {}, Days on Bitlayer: {}, Txn: {}",
            self.label,
            user.profile.btr,
            user.profile.total_points,
            user.profile.level,
            user.me_info.rank,
            user.profile.days_on_bitlayer,
            user.profile.txn
        );
        Ok(user)
    }

    pub async fn start_task(&self, task: &ApiTask) -> Result<()> {
        let data = self
            .post("/me/task/start", &json!({ "taskId": task.task_id }))
            .await?;
        ensure_ok("/me/task/start", &data)
            .with_context(|| format!("Failed to start {}", task.display_title()))?;
        info!("{} Started {}", self.label, task.display_title());
        Ok(())
    }

    pub async fn claim_task(&self, task: &ApiTask) -> Result<()> {
        let body = json!({ "taskId": task.task_id, "taskType": task.task_type });
        let data = self.post("/me/task/claim", &body).await?;
        ensure_ok("/me/task/claim", &data)
            .with_context(|| format!("Failed to claim task {}", task.task_id))?;
        Ok(())
    }

    /// One browse-status report. `true` once the visit is counted.
    pub async fn report_browse(&self) -> Result<bool> {
        let body = json!({ "taskId": BROWSE_TASK_ID, "pageName": "dapp_center" });
        let data = self.post("/me/task/report", &body).await?;
        Ok(data.get("checked").and_then(Value::as_bool).unwrap_or(false))
    }

    /// Number of lucky draws available.
    pub async fn draw_info(&self) -> Result<u64> {
        let data = with_retry(RetryConfig::new(2, 1_000), "draw info", move || async move {
            Ok::<_, anyhow::Error>(self.get("/api/draw/info", &[]).await?)
        })
        .await?;
        data.get("chances").and_then(lenient_u64).ok_or_else(|| {
            NetworkError::InvalidResponse {
                endpoint: "/api/draw/info".to_string(),
                reason: format!("missing chances: {}", data),
            }
            .into()
        })
    }

    pub async fn draw_pre(&self) -> Result<DrawTicket> {
        let data = self.get("/api/draw/pre", &[]).await?;
        Ok(parse_draw_ticket(&data)?)
    }

    pub async fn draw_reply(&self, lottery_id: &str) -> Result<DrawPrize> {
        let endpoint = format!("/api/draw/reply/{}", lottery_id);
        let data = self.get(&endpoint, &[]).await?;
        if data.is_null() {
            return Err(NetworkError::InvalidResponse {
                endpoint,
                reason: "empty draw result".to_string(),
            }
            .into());
        }
        Ok(DrawPrize::from_reply(&data))
    }

    /// Opens every free box at once. `None` when there is nothing to open.
    pub async fn box_info(&self) -> Result<Option<BoxInfo>> {
        let endpoint = "/api/mining-gala/box";
        let data = self
            .get(endpoint, &[("type", "project"), ("count", "-1")])
            .await?;
        if data.is_null() {
            return Ok(None);
        }
        let info: BoxInfo =
            serde_json::from_value(data).map_err(|e| NetworkError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Some(info).filter(|b| !b.box_id.is_empty()))
    }

    pub async fn unboxing_status(&self, box_id: &str) -> Result<UnboxResult> {
        let endpoint = format!("/api/mining-gala/result/{}", box_id);
        let data = self.get(&endpoint, &[]).await?;
        if data.is_null() {
            return Err(NetworkError::InvalidResponse {
                endpoint,
                reason: "empty unboxing status".to_string(),
            }
            .into());
        }
        Ok(parse_unbox_result(&data))
    }

    pub async fn car_info(&self) -> Result<CarInfo> {
        let endpoint = "/assemble-cars";
        let data = self.get(endpoint, &[("_data", CAR_INFO_ROUTE)]).await?;
        let user_info = data
            .get("userInfo")
            .cloned()
            .ok_or_else(|| NetworkError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: format!("missing userInfo: {}", data),
            })?;
        let cars: CarInfo =
            serde_json::from_value(user_info).map_err(|e| NetworkError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        debug!(
            "{} Normal cars: {}, Premium cars: {}, Top cars: {}",
            self.label, cars.normal_car_amount, cars.premium_car_amount, cars.top_car_amount
        );
        Ok(cars)
    }

    /// `false` when the site declines, i.e. there are no parts for that rating.
    pub async fn assemble_car(&self, star_rating: u8) -> Result<bool> {
        let endpoint = "/api/raffle/assemble";
        let data = self
            .post(endpoint, &json!({ "starRating": star_rating }))
            .await?;
        match ensure_ok(endpoint, &data) {
            Ok(()) => Ok(true),
            Err(e) => {
                debug!("{} {}-star car not assembled: {}", self.label, star_rating, e);
                Ok(false)
            }
        }
    }

    pub async fn start_daily_check(&self) -> Result<()> {
        let endpoint = "/api/btcfi/daily-check";
        let data = self.get(endpoint, &[]).await?;
        ensure_success(endpoint, &data).context("Failed to start daily check")?;
        Ok(())
    }

    /// Claims the daily check reward and returns its order id.
    pub async fn claim_daily_check(&self) -> Result<u64> {
        let endpoint = "/api/btcfi/claim-order";
        let data = self.get(endpoint, &[]).await?;
        ensure_success(endpoint, &data).context("Failed to claim daily check")?;
        data.pointer("/data/orderId")
            .and_then(lenient_u64)
            .ok_or_else(|| {
                NetworkError::InvalidResponse {
                    endpoint: endpoint.to_string(),
                    reason: format!("missing orderId: {}", data),
                }
                .into()
            })
    }

    async fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Value, NetworkError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| transport_error(endpoint, e))?;
        read_json(endpoint, resp).await
    }

    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value, NetworkError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(endpoint, e))?;
        read_json(endpoint, resp).await
    }
}
