use super::{http_client, lenient_f64, read_json, transport_error};
use anyhow::Result;
use core_logic::{NetworkError, ProxyConfig};
use ethers::types::Address;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde_json::Value;

/// Latest transfer record for an address.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeStatus {
    pub status: String,
    /// Amount credited on the destination chain, in native units.
    pub received: f64,
}

impl BridgeStatus {
    pub fn is_finished(&self) -> bool {
        self.status.eq_ignore_ascii_case("finished")
    }
}

pub struct MiniBridgeApi {
    http: Client,
    base_url: String,
}

impl MiniBridgeApi {
    pub fn new(base_url: &str, proxy: Option<&ProxyConfig>) -> Result<Self> {
        Ok(Self {
            http: http_client(proxy, HeaderMap::new())?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `None` while the feed has no file for the address yet (HTTP 404).
    pub async fn status(&self, address: Address) -> Result<Option<BridgeStatus>, NetworkError> {
        let endpoint = status_path(address);
        let url = format!("{}{}", self.base_url, endpoint);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(&endpoint, e))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = read_json(&endpoint, resp).await?;
        parse_status(&endpoint, &body).map(Some)
    }
}

/// `/0xabc...def.json`, lower-case hex.
pub fn status_path(address: Address) -> String {
    format!("/0x{}.json", hex::encode(address.as_bytes()))
}

pub fn parse_status(endpoint: &str, body: &Value) -> Result<BridgeStatus, NetworkError> {
    let latest = body
        .as_array()
        .and_then(|records| records.first())
        .ok_or_else(|| NetworkError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: format!("expected a non-empty list, got {}", body),
        })?;

    let status = latest
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let received = latest
        .get("toamount_native")
        .and_then(lenient_f64)
        .unwrap_or(0.0);

    Ok(BridgeStatus { status, received })
}
