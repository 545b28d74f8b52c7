//! In-memory broker with scripted order lifecycles.
//!
//! Every submitted order consumes the next [`OrderScript`] from a queue
//! (default: filled on the first poll). Each `get_order` call counts as one
//! poll and advances that order's script. Submitted requests and cancel
//! requests are recorded for assertions.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tvb_core::trading::{AccountSnapshot, OrderRequest, OrderSnapshot, Position};
use tvb_core::types::Side;

/// How a scripted order evolves as it is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderScript {
    /// Fully filled once polled this many times.
    pub fill_after: Option<u32>,
    /// Rejected by the broker once polled this many times.
    pub fail_after: Option<u32>,
    /// Filled quantity reported from the first poll while still open.
    pub partial_fill: Option<Decimal>,
    /// A cancel request marks the order failed instead of canceled.
    pub cancel_fails: bool,
}

impl OrderScript {
    pub fn fills_after(polls: u32) -> Self {
        Self { fill_after: Some(polls), fail_after: None, partial_fill: None, cancel_fails: false }
    }

    /// Stays open until canceled.
    pub fn never_fills() -> Self {
        Self { fill_after: None, fail_after: None, partial_fill: None, cancel_fails: false }
    }

    /// Stays open with `filled` units done until canceled.
    pub fn partially_filled(filled: Decimal) -> Self {
        Self { partial_fill: Some(filled), ..Self::never_fills() }
    }

    pub fn fails_after(polls: u32) -> Self {
        Self { fail_after: Some(polls), ..Self::never_fills() }
    }

    pub fn rejects_cancel(self) -> Self {
        Self { cancel_fails: true, ..self }
    }
}

impl Default for OrderScript {
    fn default() -> Self {
        Self::fills_after(1)
    }
}

struct Tracked {
    snapshot: OrderSnapshot,
    script: OrderScript,
    polls: u32,
}

impl Tracked {
    fn advance(&mut self) {
        self.polls += 1;
        if !self.snapshot.is_open() {
            return;
        }
        let now = Some(Utc::now());
        if let Some(filled) = self.script.partial_fill {
            self.snapshot.filled_quantity = filled;
            self.snapshot.status = "partially_filled".into();
        }
        if self.script.fail_after.is_some_and(|n| self.polls >= n) {
            self.snapshot.failed_at = now;
            self.snapshot.status = "rejected".into();
        } else if self.script.fill_after.is_some_and(|n| self.polls >= n) {
            self.snapshot.filled_quantity = self.snapshot.quantity;
            self.snapshot.filled_at = now;
            self.snapshot.status = "filled".into();
        }
    }
}

#[derive(Default)]
struct State {
    cash: Decimal,
    shorting_enabled: bool,
    positions: Vec<Position>,
    orders: Vec<Tracked>,
    scripts: VecDeque<OrderScript>,
    submitted: Vec<OrderRequest>,
    canceled: Vec<String>,
    cancel_all_calls: usize,
    reject_submissions: bool,
    next_id: u64,
}

impl State {
    fn track(&mut self, symbol: &str, side: Side, quantity: Decimal, script: OrderScript) -> OrderSnapshot {
        self.next_id += 1;
        let snapshot = OrderSnapshot {
            id: format!("ord-{}", self.next_id),
            client_order_id: format!("cl-{}", self.next_id),
            symbol: symbol.to_string(),
            side,
            quantity,
            filled_quantity: Decimal::ZERO,
            status: "new".into(),
            submitted_at: Some(Utc::now()),
            filled_at: None,
            canceled_at: None,
            failed_at: None,
        };
        self.orders.push(Tracked { snapshot: snapshot.clone(), script, polls: 0 });
        snapshot
    }

    fn order_mut(&mut self, order_id: &str) -> Result<&mut Tracked> {
        self.orders
            .iter_mut()
            .find(|t| t.snapshot.id == order_id)
            .ok_or_else(|| anyhow!("order {order_id} not found"))
    }
}

/// Scripted in-memory broker.
#[derive(Default)]
pub struct ScriptedBroker {
    state: Mutex<State>,
}

impl ScriptedBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cash(self, cash: Decimal) -> Self {
        self.state().cash = cash;
        self
    }

    pub fn with_shorting(self, enabled: bool) -> Self {
        self.state().shorting_enabled = enabled;
        self
    }

    pub fn with_position(self, symbol: &str, quantity: Decimal) -> Self {
        self.state().positions.push(Position { symbol: symbol.to_string(), quantity });
        self
    }

    /// Seed a pre-existing open order that never fills.
    pub fn with_open_order(self, symbol: &str, side: Side, quantity: Decimal) -> Self {
        self.state().track(symbol, side, quantity, OrderScript::never_fills());
        self
    }

    /// Queue the script for the next submitted order.
    pub fn push_script(&self, script: OrderScript) {
        self.state().scripts.push_back(script);
    }

    /// Make every subsequent submission fail.
    pub fn reject_submissions(&self) {
        self.state().reject_submissions = true;
    }

    /// Requests accepted by `submit_order`, in submission order.
    pub fn submitted(&self) -> Vec<OrderRequest> {
        self.state().submitted.clone()
    }

    /// Order IDs passed to `cancel_order`, in call order.
    pub fn canceled(&self) -> Vec<String> {
        self.state().canceled.clone()
    }

    pub fn cancel_all_calls(&self) -> usize {
        self.state().cancel_all_calls
    }

    /// Number of `get_order` calls made for an order.
    pub fn polls(&self, order_id: &str) -> u32 {
        self.state()
            .orders
            .iter()
            .find(|t| t.snapshot.id == order_id)
            .map_or(0, |t| t.polls)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl crate::Broker for ScriptedBroker {
    async fn get_account(&self) -> Result<AccountSnapshot> {
        let state = self.state();
        Ok(AccountSnapshot {
            status: "ACTIVE".into(),
            currency: "USD".into(),
            cash: state.cash,
            equity: state.cash,
            buying_power: state.cash,
            daytrading_buying_power: Decimal::ZERO,
            account_blocked: false,
            trading_blocked: false,
            transfers_blocked: false,
            trade_suspended_by_user: false,
            shorting_enabled: state.shorting_enabled,
            crypto_status: None,
        })
    }

    async fn get_open_orders(&self, symbol: Option<&str>) -> Result<Vec<OrderSnapshot>> {
        Ok(self
            .state()
            .orders
            .iter()
            .filter(|t| t.snapshot.is_open())
            .filter(|t| symbol.is_none_or(|s| t.snapshot.symbol == s))
            .map(|t| t.snapshot.clone())
            .collect())
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<Position>> {
        Ok(self.state().positions.iter().find(|p| p.symbol == symbol).cloned())
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderSnapshot> {
        let mut state = self.state();
        if state.reject_submissions {
            bail!("place order HTTP 403 Forbidden: insufficient buying power");
        }
        let script = state.scripts.pop_front().unwrap_or_default();
        state.submitted.push(request.clone());
        Ok(state.track(&request.symbol, request.side, Decimal::from(request.quantity), script))
    }

    async fn get_order(&self, order_id: &str) -> Result<OrderSnapshot> {
        let mut state = self.state();
        let tracked = state.order_mut(order_id)?;
        tracked.advance();
        Ok(tracked.snapshot.clone())
    }

    async fn cancel_order(&self, order_id: &str) -> Result<()> {
        let mut state = self.state();
        state.canceled.push(order_id.to_string());
        let tracked = state.order_mut(order_id)?;
        if tracked.snapshot.is_open() {
            if tracked.script.cancel_fails {
                tracked.snapshot.failed_at = Some(Utc::now());
                tracked.snapshot.status = "rejected".into();
            } else {
                tracked.snapshot.canceled_at = Some(Utc::now());
                tracked.snapshot.status = "canceled".into();
            }
        }
        Ok(())
    }

    async fn cancel_all_orders(&self) -> Result<()> {
        let mut state = self.state();
        state.cancel_all_calls += 1;
        let now = Some(Utc::now());
        for tracked in state.orders.iter_mut().filter(|t| t.snapshot.is_open()) {
            tracked.snapshot.canceled_at = now;
            tracked.snapshot.status = "canceled".into();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Broker;
    use rust_decimal_macros::dec;
    use tvb_core::trading::OrderKind;
    use tvb_core::types::{OrderState, TimeInForce};

    fn request(qty: u64) -> OrderRequest {
        OrderRequest {
            symbol: "MSFT".into(),
            side: Side::Buy,
            quantity: qty,
            kind: OrderKind::Market,
            time_in_force: TimeInForce::GoodTillCanceled,
        }
    }

    #[tokio::test]
    async fn scripted_fill_after_polls() {
        let broker = ScriptedBroker::new();
        broker.push_script(OrderScript::fills_after(3));
        let order = broker.submit_order(&request(5)).await.unwrap();

        assert_eq!(broker.get_order(&order.id).await.unwrap().state(), OrderState::Open);
        assert_eq!(broker.get_order(&order.id).await.unwrap().state(), OrderState::Open);
        let done = broker.get_order(&order.id).await.unwrap();
        assert_eq!(done.state(), OrderState::Filled);
        assert_eq!(done.filled_quantity, dec!(5));
        assert_eq!(broker.polls(&order.id), 3);
    }

    #[tokio::test]
    async fn cancel_keeps_partial_fill() {
        let broker = ScriptedBroker::new();
        broker.push_script(OrderScript::partially_filled(dec!(2)));
        let order = broker.submit_order(&request(5)).await.unwrap();
        broker.get_order(&order.id).await.unwrap();
        broker.cancel_order(&order.id).await.unwrap();

        let after = broker.get_order(&order.id).await.unwrap();
        assert_eq!(after.state(), OrderState::Canceled);
        assert_eq!(after.unfilled_quantity(), dec!(3));
        assert_eq!(broker.canceled(), vec![order.id]);
    }

    #[tokio::test]
    async fn open_orders_filter_by_symbol() {
        let broker = ScriptedBroker::new()
            .with_open_order("MSFT", Side::Buy, dec!(1))
            .with_open_order("TSLA", Side::Sell, dec!(2));
        assert_eq!(broker.get_open_orders(Some("TSLA")).await.unwrap().len(), 1);
        assert_eq!(broker.get_open_orders(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rejected_submission_is_an_error() {
        let broker = ScriptedBroker::new();
        broker.reject_submissions();
        assert!(broker.submit_order(&request(1)).await.is_err());
        assert!(broker.submitted().is_empty());
    }
}
