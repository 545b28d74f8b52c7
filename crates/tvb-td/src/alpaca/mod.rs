//! Alpaca broker.
//!
//! Implements the [`Broker`](crate::Broker) trait for Alpaca's trading API,
//! against either the paper or the live account.
//!
//! # Architecture
//!
//! ```text
//! AlpacaTd
//! ├── RestClient   (signed-header REST calls, raw JSON)
//! └── JSON → typed (AccountSnapshot, OrderSnapshot, Position)
//! ```
//!
//! Alpaca encodes quantities and prices as decimal strings and timestamps as
//! RFC 3339 strings; both are parsed into `rust_decimal` / `chrono` values.

pub mod config;
pub mod rest;

use std::str::FromStr;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};
use tvb_core::trading::{AccountSnapshot, OrderKind, OrderRequest, OrderSnapshot, Position};
use tvb_core::types::Side;
use uuid::Uuid;

use self::config::AlpacaConfig;
use self::rest::RestClient;

/// Alpaca broker.
pub struct AlpacaTd {
    /// REST sub-client.
    rest: RestClient,
}

impl AlpacaTd {
    pub fn new(config: AlpacaConfig) -> Self {
        Self { rest: RestClient::new(&config) }
    }
}

#[async_trait]
impl crate::Broker for AlpacaTd {
    async fn get_account(&self) -> Result<AccountSnapshot> {
        let val = self.rest.get_account().await?;
        parse_account(&val).ok_or_else(|| anyhow!("malformed account response: {val}"))
    }

    async fn get_open_orders(&self, symbol: Option<&str>) -> Result<Vec<OrderSnapshot>> {
        let val = self.rest.get_open_orders(symbol).await?;
        let mut result = Vec::new();
        collect_orders(&val, &mut result);
        debug!("[alpaca-td] {} open order(s) for {}", result.len(), symbol.unwrap_or("*"));
        Ok(result)
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<Position>> {
        match self.rest.get_position(symbol).await? {
            Some(val) => {
                let pos = parse_position(&val).ok_or_else(|| anyhow!("malformed position response: {val}"))?;
                Ok(Some(pos))
            }
            None => Ok(None),
        }
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderSnapshot> {
        let client_order_id = Uuid::new_v4().to_string();
        let body = order_body(request, &client_order_id);
        let val = self.rest.place_order(&body).await?;
        let order = parse_order(&val).ok_or_else(|| anyhow!("malformed order response: {val}"))?;

        info!(
            "[alpaca-td] order placed: {} → id={} coid={}",
            request, order.id, order.client_order_id,
        );
        Ok(order)
    }

    async fn get_order(&self, order_id: &str) -> Result<OrderSnapshot> {
        let val = self.rest.get_order(order_id).await?;
        parse_order(&val).ok_or_else(|| anyhow!("malformed order response: {val}"))
    }

    async fn cancel_order(&self, order_id: &str) -> Result<()> {
        self.rest.cancel_order(order_id).await?;
        info!("[alpaca-td] cancel requested: id={order_id}");
        Ok(())
    }

    async fn cancel_all_orders(&self) -> Result<()> {
        self.rest.cancel_all_orders().await?;
        info!("[alpaca-td] all orders cancelled");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Typed → JSON
// ---------------------------------------------------------------------------

/// Build the `POST /v2/orders` body for a request.
fn order_body(request: &OrderRequest, client_order_id: &str) -> serde_json::Value {
    let mut body = serde_json::json!({
        "symbol": request.symbol,
        "qty": request.quantity.to_string(),
        "side": request.side.as_str(),
        "time_in_force": request.time_in_force.as_str(),
        "client_order_id": client_order_id,
    });
    match request.kind {
        OrderKind::Market => {
            body["type"] = "market".into();
        }
        OrderKind::Limit { limit_price } => {
            body["type"] = "limit".into();
            body["limit_price"] = limit_price.to_string().into();
        }
    }
    body
}

// ---------------------------------------------------------------------------
// JSON → typed helpers
// ---------------------------------------------------------------------------

/// Extract orders from a JSON array value into the result vector.
fn collect_orders(val: &serde_json::Value, result: &mut Vec<OrderSnapshot>) {
    if let Some(arr) = val.as_array() {
        for o in arr {
            if let Some(order) = parse_order(o) {
                result.push(order);
            }
        }
    }
}

/// Parse an Alpaca order object into an [`OrderSnapshot`].
fn parse_order(v: &serde_json::Value) -> Option<OrderSnapshot> {
    Some(OrderSnapshot {
        id: v.get("id")?.as_str()?.to_string(),
        client_order_id: v
            .get("client_order_id")
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string(),
        symbol: v.get("symbol")?.as_str()?.to_string(),
        side: parse_side(v.get("side")?.as_str()?)?,
        quantity: decimal_field(v, "qty").unwrap_or(Decimal::ZERO),
        filled_quantity: decimal_field(v, "filled_qty").unwrap_or(Decimal::ZERO),
        status: v
            .get("status")
            .and_then(|s| s.as_str())
            .unwrap_or("unknown")
            .to_string(),
        submitted_at: time_field(v, "submitted_at"),
        filled_at: time_field(v, "filled_at"),
        canceled_at: time_field(v, "canceled_at"),
        failed_at: time_field(v, "failed_at"),
    })
}

/// Parse an Alpaca position object into a [`Position`].
fn parse_position(v: &serde_json::Value) -> Option<Position> {
    Some(Position {
        symbol: v.get("symbol")?.as_str()?.to_string(),
        quantity: decimal_field(v, "qty")?,
    })
}

/// Parse an Alpaca account object into an [`AccountSnapshot`].
fn parse_account(v: &serde_json::Value) -> Option<AccountSnapshot> {
    let flag = |name: &str| v.get(name).and_then(|b| b.as_bool()).unwrap_or(false);
    Some(AccountSnapshot {
        status: v.get("status").and_then(|s| s.as_str()).unwrap_or("UNKNOWN").to_string(),
        currency: v.get("currency").and_then(|s| s.as_str()).unwrap_or("USD").to_string(),
        cash: decimal_field(v, "cash")?,
        equity: decimal_field(v, "equity").unwrap_or(Decimal::ZERO),
        buying_power: decimal_field(v, "buying_power").unwrap_or(Decimal::ZERO),
        daytrading_buying_power: decimal_field(v, "daytrading_buying_power").unwrap_or(Decimal::ZERO),
        account_blocked: flag("account_blocked"),
        trading_blocked: flag("trading_blocked"),
        transfers_blocked: flag("transfers_blocked"),
        trade_suspended_by_user: flag("trade_suspended_by_user"),
        shorting_enabled: flag("shorting_enabled"),
        crypto_status: v.get("crypto_status").and_then(|s| s.as_str()).map(str::to_string),
    })
}

fn parse_side(side: &str) -> Option<Side> {
    match side {
        "buy" => Some(Side::Buy),
        "sell" => Some(Side::Sell),
        _ => None,
    }
}

/// Decimal from a string (Alpaca's encoding) or a JSON number.
fn decimal_field(v: &serde_json::Value, name: &str) -> Option<Decimal> {
    match v.get(name)? {
        serde_json::Value::String(s) => Decimal::from_str(s).ok(),
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

fn time_field(v: &serde_json::Value, name: &str) -> Option<DateTime<Utc>> {
    let raw = v.get(name)?.as_str()?;
    DateTime::parse_from_rfc3339(raw).ok().map(|t| t.with_timezone(&Utc))
}
