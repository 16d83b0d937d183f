//! Companion web APIs: the Bitlayer points site, the MiniBridge status feed
//! and the BTC price ticker.
//!
//! Both go through the account's pinned proxy when proxies are enabled.

pub mod bitlayer;
pub mod minibridge;
pub mod price;

pub use bitlayer::{
    ApiTask, BitlayerApi, BoxInfo, CarInfo, DrawPrize, DrawTicket, ProgressTier, UnboxResult,
    UserData,
};
pub use minibridge::{BridgeStatus, MiniBridgeApi};
pub use price::btc_usd_price;

use anyhow::{Context, Result};
use core_logic::{NetworkError, ProxyConfig};
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
];

pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Cookie-keeping JSON client with a random browser user agent, routed
/// through `proxy` when one is given.
pub fn http_client(proxy: Option<&ProxyConfig>, extra_headers: HeaderMap) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static(random_user_agent()));
    headers.extend(extra_headers);

    let mut builder = Client::builder()
        .default_headers(headers)
        .cookie_store(true)
        .timeout(REQUEST_TIMEOUT);

    if let Some(proxy_conf) = proxy {
        let mut proxy = reqwest::Proxy::all(&proxy_conf.url)
            .with_context(|| format!("Invalid proxy {}", proxy_conf.url))?;
        if let (Some(u), Some(p)) = (&proxy_conf.username, &proxy_conf.password) {
            proxy = proxy.basic_auth(u, p);
        }
        builder = builder.proxy(proxy);
    }

    builder.build().context("Failed to build HTTP client")
}

/// Maps non-2xx statuses to `NetworkError` and decodes the JSON body.
pub(crate) async fn read_json(endpoint: &str, response: Response) -> Result<Value, NetworkError> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        return Err(NetworkError::RateLimited {
            endpoint: endpoint.to_string(),
            retry_after,
        });
    }
    if !status.is_success() {
        return Err(NetworkError::HttpError {
            status_code: status.as_u16(),
            endpoint: endpoint.to_string(),
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| NetworkError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
}

pub(crate) fn transport_error(endpoint: &str, e: reqwest::Error) -> NetworkError {
    if e.is_timeout() {
        NetworkError::Timeout {
            timeout_ms: REQUEST_TIMEOUT.as_millis() as u64,
            endpoint: endpoint.to_string(),
        }
    } else if e.is_connect() {
        NetworkError::ConnectionRefused {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
    } else {
        NetworkError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
    }
}

/// Success marker check: the body must carry `"message": "ok"`.
pub fn ensure_ok(endpoint: &str, body: &Value) -> Result<(), NetworkError> {
    match body.get("message").and_then(Value::as_str) {
        Some("ok") => Ok(()),
        _ => Err(NetworkError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: format!("expected message \"ok\", got {}", body),
        }),
    }
}

/// Success marker for the BTCFi endpoints: `"success": true`.
pub fn ensure_success(endpoint: &str, body: &Value) -> Result<(), NetworkError> {
    match body.get("success").and_then(Value::as_bool) {
        Some(true) => Ok(()),
        _ => Err(NetworkError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: format!("expected success true, got {}", body),
        }),
    }
}

/// Reads a JSON number that some endpoints send as a string.
pub(crate) fn lenient_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
