use super::{http_client, lenient_f64, read_json, transport_error};
use anyhow::Result;
use core_logic::NetworkError;
use reqwest::header::HeaderMap;
use serde_json::Value;

/// Current BTC price in USD from a ticker answering `{"price": "..."}`.
pub async fn btc_usd_price(url: &str) -> Result<f64> {
    let http = http_client(None, HeaderMap::new())?;
    let resp = http
        .get(url)
        .send()
        .await
        .map_err(|e| transport_error(url, e))?;
    let body = read_json(url, resp).await?;
    Ok(parse_price(url, &body)?)
}

pub fn parse_price(endpoint: &str, body: &Value) -> Result<f64, NetworkError> {
    body.get("price")
        .and_then(lenient_f64)
        .filter(|p| p.is_finite() && *p > 0.0)
        .ok_or_else(|| NetworkError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: format!("missing price: {}", body),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_price() {
        let price = parse_price("/ticker", &json!({"symbol": "BTCUSDT", "price": "67012.50"}));
        assert_eq!(price.unwrap(), 67012.5);
        assert!(parse_price("/ticker", &json!({"price": "0"})).is_err());
        assert!(parse_price("/ticker", &json!({})).is_err());
    }
}
