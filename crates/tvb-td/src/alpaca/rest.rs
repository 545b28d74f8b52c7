//! Alpaca trading REST API.
//!
//! Thin client that returns raw JSON; typing happens in the parent module.
//!
//! # REST endpoints
//!
//! | Operation          | Method | Path                            |
//! |--------------------|--------|---------------------------------|
//! | Account            | GET    | `/v2/account`                   |
//! | Open orders        | GET    | `/v2/orders?status=open`        |
//! | Position           | GET    | `/v2/positions/{symbol}`        |
//! | Submit order       | POST   | `/v2/orders`                    |
//! | Order by ID        | GET    | `/v2/orders/{order_id}`         |
//! | Cancel order       | DELETE | `/v2/orders/{order_id}`         |
//! | Cancel all orders  | DELETE | `/v2/orders`                    |

use anyhow::{Context, Result, anyhow};
use reqwest::StatusCode;
use tracing::debug;

use super::config::AlpacaConfig;

/// Alpaca REST client.
pub struct RestClient {
    /// Shared HTTP client.
    http: reqwest::Client,
    /// API key ID.
    api_key: String,
    /// API secret key.
    secret_key: String,
    /// REST base URL (e.g. `https://paper-api.alpaca.markets`).
    base_url: String,
}

impl RestClient {
    /// Create a new client (no connection opened yet).
    pub fn new(config: &AlpacaConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            secret_key: config.secret_key.clone(),
            base_url: config.rest_url.clone(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .header("APCA-API-KEY-ID", &self.api_key)
            .header("APCA-API-SECRET-KEY", &self.secret_key)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// `GET /v2/account`.
    pub async fn get_account(&self) -> Result<serde_json::Value> {
        let resp = self
            .request(reqwest::Method::GET, "/v2/account")
            .send()
            .await
            .context("account request failed")?;
        json_body(resp, "account").await
    }

    /// `GET /v2/orders?status=open[&symbols=...]`.
    pub async fn get_open_orders(&self, symbol: Option<&str>) -> Result<serde_json::Value> {
        let mut params: Vec<(&str, &str)> = vec![("status", "open"), ("direction", "asc")];
        if let Some(sym) = symbol {
            params.push(("symbols", sym));
        }
        let resp = self
            .request(reqwest::Method::GET, "/v2/orders")
            .query(&params)
            .send()
            .await
            .context("open orders request failed")?;
        json_body(resp, "open orders").await
    }

    /// `GET /v2/positions/{symbol}`. Returns `None` on 404 (no position).
    pub async fn get_position(&self, symbol: &str) -> Result<Option<serde_json::Value>> {
        let path = format!("/v2/positions/{}", urlencoding::encode(symbol));
        let resp = self
            .request(reqwest::Method::GET, &path)
            .send()
            .await
            .context("position request failed")?;
        if resp.status() == StatusCode::NOT_FOUND {
            debug!("[alpaca-rest] no position for {symbol}");
            return Ok(None);
        }
        json_body(resp, "position").await.map(Some)
    }

    /// `GET /v2/orders/{order_id}`.
    pub async fn get_order(&self, order_id: &str) -> Result<serde_json::Value> {
        let path = format!("/v2/orders/{}", urlencoding::encode(order_id));
        let resp = self
            .request(reqwest::Method::GET, &path)
            .send()
            .await
            .context("get order request failed")?;
        json_body(resp, "get order").await
    }

    // -----------------------------------------------------------------------
    // Order operations
    // -----------------------------------------------------------------------

    /// `POST /v2/orders` with a JSON body.
    pub async fn place_order(&self, body: &serde_json::Value) -> Result<serde_json::Value> {
        let resp = self
            .request(reqwest::Method::POST, "/v2/orders")
            .json(body)
            .send()
            .await
            .context("place order request failed")?;
        json_body(resp, "place order").await
    }

    /// `DELETE /v2/orders/{order_id}`.
    pub async fn cancel_order(&self, order_id: &str) -> Result<()> {
        let path = format!("/v2/orders/{}", urlencoding::encode(order_id));
        let resp = self
            .request(reqwest::Method::DELETE, &path)
            .send()
            .await
            .context("cancel order request failed")?;
        ensure_success(resp, "cancel order").await
    }

    /// `DELETE /v2/orders`.
    pub async fn cancel_all_orders(&self) -> Result<()> {
        let resp = self
            .request(reqwest::Method::DELETE, "/v2/orders")
            .send()
            .await
            .context("cancel all orders request failed")?;
        ensure_success(resp, "cancel all orders").await
    }
}

/// Succeed on 2xx, otherwise fail with the status and Alpaca's error message.
async fn ensure_success(resp: reqwest::Response, what: &str) -> Result<()> {
    if resp.status().is_success() {
        return Ok(());
    }
    Err(http_error(resp, what).await)
}

/// Decode a 2xx JSON body.
async fn json_body(resp: reqwest::Response, what: &str) -> Result<serde_json::Value> {
    if !resp.status().is_success() {
        return Err(http_error(resp, what).await);
    }
    resp.json().await.with_context(|| format!("{what} response is not JSON"))
}

async fn http_error(resp: reqwest::Response, what: &str) -> anyhow::Error {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    // Alpaca errors look like {"code": 40310000, "message": "..."}
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(body);
    anyhow!("{what} HTTP {status}: {message}")
}
