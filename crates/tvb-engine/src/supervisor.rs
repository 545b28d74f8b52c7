//! Order supervision.
//!
//! Polls a submitted order until it reaches a terminal state.
//!
//! ```text
//!             ┌──────── poll every interval ────────┐
//!             ▼                                     │
//! Submitted ──┬─ filled / canceled / failed ──► return
//!             ├─ elapsed > total timeout ───► cancel → re-fetch ──► Canceled (failsafe)
//!             └─ elapsed > per-order timeout ──► Escalating (policy by side)
//!                   Cancel: cancel → confirm ──► confirmed outcome
//!                   Market: cancel → confirm ──► market order for remainder → confirm
//! ```
//!
//! Confirmations run with [`Escalation::Disabled`]; they end only on a
//! terminal state or the failsafe, so escalation happens at most once.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::prelude::ToPrimitive;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};
use tvb_core::TvbError;
use tvb_core::config::TradingOptions;
use tvb_core::trading::OrderSnapshot;
use tvb_core::types::{OrderOutcome, OrderState, Side, TimeoutPolicy};
use tvb_td::Broker;

use crate::builder;

/// Fixed polling interval between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Supervision timing and escalation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorOptions {
    pub poll_interval: Duration,
    /// Open longer than this → escalate.
    pub per_order_timeout: Duration,
    /// Open longer than this → cancel unconditionally.
    pub total_timeout: Duration,
    pub buy_policy: Option<TimeoutPolicy>,
    pub sell_policy: Option<TimeoutPolicy>,
}

impl SupervisorOptions {
    pub fn from_options(options: &TradingOptions) -> Result<Self, TvbError> {
        Ok(Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            per_order_timeout: options.per_order_timeout()?,
            total_timeout: options.total_timeout()?,
            buy_policy: options.buy_timeout_policy(),
            sell_policy: options.sell_timeout_policy(),
        })
    }

    pub fn policy_for(&self, side: Side) -> Option<TimeoutPolicy> {
        match side {
            Side::Buy => self.buy_policy,
            Side::Sell => self.sell_policy,
        }
    }
}

/// Whether a per-order timeout may trigger the side's policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    Allowed,
    Disabled,
}

/// Terminal outcome together with the snapshot that proved it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub outcome: OrderOutcome,
    pub order: OrderSnapshot,
}

enum Watch {
    Settled(Verified),
    /// Still open after the per-order timeout.
    Expired(OrderSnapshot),
}

/// Drives one submitted order to a terminal outcome.
pub struct OrderSupervisor<B: Broker> {
    broker: Arc<B>,
    options: SupervisorOptions,
}

impl<B: Broker> OrderSupervisor<B> {
    pub fn new(broker: Arc<B>, options: SupervisorOptions) -> Self {
        Self { broker, options }
    }

    /// Supervise a freshly submitted order.
    pub async fn supervise(&self, order: OrderSnapshot) -> Result<Verified, TvbError> {
        self.verify(order, Instant::now(), Escalation::Allowed).await
    }

    /// Poll `order` (submitted at `started`) to a terminal outcome.
    pub async fn verify(
        &self,
        order: OrderSnapshot,
        started: Instant,
        escalation: Escalation,
    ) -> Result<Verified, TvbError> {
        match self.watch(order, started, escalation).await? {
            Watch::Settled(verified) => Ok(verified),
            Watch::Expired(order) => self.escalate(order, started).await,
        }
    }

    async fn watch(&self, mut order: OrderSnapshot, started: Instant, escalation: Escalation) -> Result<Watch, TvbError> {
        loop {
            if let Some(outcome) = terminal_outcome(&order) {
                log_outcome(&order, outcome);
                return Ok(Watch::Settled(Verified { outcome, order }));
            }

            let elapsed = started.elapsed();
            if elapsed > self.options.total_timeout {
                warn!(
                    "[supervisor] order {} ({} {} {}) exceeded total max time of {:?}, canceling",
                    order.id, order.side, order.quantity, order.symbol, self.options.total_timeout,
                );
                self.broker.cancel_order(&order.id).await.map_err(TvbError::Broker)?;
                let order = self.broker.get_order(&order.id).await.map_err(TvbError::Broker)?;
                // A fill that beat the cancel is reported as such.
                let outcome = match terminal_outcome(&order) {
                    Some(OrderOutcome::Filled) => OrderOutcome::Filled,
                    _ => OrderOutcome::Canceled,
                };
                log_outcome(&order, outcome);
                return Ok(Watch::Settled(Verified { outcome, order }));
            }
            if escalation == Escalation::Allowed && elapsed > self.options.per_order_timeout {
                return Ok(Watch::Expired(order));
            }

            sleep(self.options.poll_interval).await;
            order = self.broker.get_order(&order.id).await.map_err(TvbError::Broker)?;
            debug!("[supervisor] order {} status={} filled={}", order.id, order.status, order.filled_quantity);
        }
    }

    /// Confirm an order without further escalation.
    async fn confirm(&self, order: OrderSnapshot, started: Instant) -> Result<Verified, TvbError> {
        match self.watch(order, started, Escalation::Disabled).await? {
            Watch::Settled(verified) => Ok(verified),
            Watch::Expired(order) => Err(TvbError::Supervision(format!("order {} expired during confirmation", order.id))),
        }
    }

    async fn escalate(&self, order: OrderSnapshot, started: Instant) -> Result<Verified, TvbError> {
        let Some(policy) = self.options.policy_for(order.side) else {
            error!(
                "[supervisor] no timeout policy for {} orders, order {} ({} {}) left open",
                order.side, order.id, order.quantity, order.symbol,
            );
            return Err(TvbError::Config(format!("no timeout policy configured for {} orders", order.side)));
        };
        warn!(
            "[supervisor] order {} ({} {} {}) exceeded max time of {:?}, escalating with {policy:?}",
            order.id, order.side, order.quantity, order.symbol, self.options.per_order_timeout,
        );

        let confirmed = self.cancel_and_confirm(&order, started).await?;
        match policy {
            TimeoutPolicy::Cancel => {
                if confirmed.outcome == OrderOutcome::Failed {
                    error!("[supervisor] cancel failed for order {} ({} {})", order.id, order.quantity, order.symbol);
                }
                Ok(confirmed)
            }
            TimeoutPolicy::Market => {
                if confirmed.outcome == OrderOutcome::Failed {
                    error!("[supervisor] cancel failed for order {} ({} {})", order.id, order.quantity, order.symbol);
                    return Err(TvbError::Supervision(format!(
                        "cancel of order {} not confirmed, not resubmitting",
                        order.id
                    )));
                }
                self.resubmit_remainder(confirmed).await
            }
        }
    }

    async fn cancel_and_confirm(&self, order: &OrderSnapshot, started: Instant) -> Result<Verified, TvbError> {
        self.broker.cancel_order(&order.id).await.map_err(TvbError::Broker)?;
        let refreshed = self.broker.get_order(&order.id).await.map_err(TvbError::Broker)?;
        self.confirm(refreshed, started).await
    }

    async fn resubmit_remainder(&self, confirmed: Verified) -> Result<Verified, TvbError> {
        let order = &confirmed.order;
        let remainder = order.unfilled_quantity();
        let whole = remainder.trunc();
        if whole != remainder {
            warn!("[supervisor] fractional remainder {} of order {} not resubmitted", remainder - whole, order.id);
        }
        let quantity = whole.to_u64().unwrap_or(0);
        if quantity == 0 {
            info!("[supervisor] order {} has nothing left to fill", order.id);
            return Ok(Verified { outcome: OrderOutcome::Filled, order: confirmed.order });
        }

        let request = builder::market(&order.symbol, order.side, quantity);
        let replacement = self.broker.submit_order(&request).await.map_err(TvbError::Broker)?;
        info!("[supervisor] timeout market order {} placed: {request}", replacement.id);
        self.confirm(replacement, Instant::now()).await
    }
}

fn terminal_outcome(order: &OrderSnapshot) -> Option<OrderOutcome> {
    match order.state() {
        OrderState::Open => None,
        OrderState::Filled => Some(OrderOutcome::Filled),
        OrderState::Canceled => Some(OrderOutcome::Canceled),
        OrderState::Failed => Some(OrderOutcome::Failed),
    }
}

fn log_outcome(order: &OrderSnapshot, outcome: OrderOutcome) {
    match outcome {
        OrderOutcome::Filled => info!(
            "[supervisor] order {} filled: {} {} {}",
            order.id, order.side, order.filled_quantity, order.symbol
        ),
        OrderOutcome::Canceled => info!(
            "[supervisor] order {} canceled: {} {}/{} {}",
            order.id, order.side, order.filled_quantity, order.quantity, order.symbol
        ),
        OrderOutcome::Failed => warn!(
            "[supervisor] order {} failed: {} {} {}",
            order.id, order.side, order.quantity, order.symbol
        ),
    }
}
