//! Trading-related data structures: intents, requests, and broker snapshots.
//!
//! Intents and requests flow from the engine towards the broker; snapshots
//! flow back and are never cached across units of work.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::{OrderState, Side, TimeInForce};

// ---------------------------------------------------------------------------
// Order intent (sizer → builder)
// ---------------------------------------------------------------------------

/// Side and whole-unit quantity decided by the sizer.
///
/// A quantity of zero is the "no action" sentinel: nothing is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub side: Side,
    pub quantity: u64,
}

impl OrderIntent {
    pub fn new(side: Side, quantity: u64) -> Self {
        Self { side, quantity }
    }

    /// An intent that results in no order.
    pub fn no_action(side: Side) -> Self {
        Self { side, quantity: 0 }
    }

    pub fn is_no_action(&self) -> bool {
        self.quantity == 0
    }
}

// ---------------------------------------------------------------------------
// Order request (builder → broker)
// ---------------------------------------------------------------------------

/// Price strategy of an order request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    Market,
    Limit { limit_price: Decimal },
}

/// An order ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    /// Whole units, always positive.
    pub quantity: u64,
    pub kind: OrderKind,
    pub time_in_force: TimeInForce,
}

impl OrderRequest {
    /// Limit price, if this is a limit order.
    pub fn limit_price(&self) -> Option<Decimal> {
        match self.kind {
            OrderKind::Market => None,
            OrderKind::Limit { limit_price } => Some(limit_price),
        }
    }

    pub fn is_market(&self) -> bool {
        matches!(self.kind, OrderKind::Market)
    }
}

impl std::fmt::Display for OrderRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            OrderKind::Market => write!(f, "{} {} {} @ market", self.side, self.quantity, self.symbol),
            OrderKind::Limit { limit_price } => {
                write!(f, "{} {} {} @ limit {}", self.side, self.quantity, self.symbol, limit_price)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Broker snapshots (broker → engine)
// ---------------------------------------------------------------------------

/// Point-in-time view of an order as reported by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    /// Broker-assigned order ID.
    pub id: String,
    /// Client-assigned order ID.
    pub client_order_id: String,
    pub symbol: String,
    pub side: Side,
    /// Original order quantity.
    pub quantity: Decimal,
    /// Cumulative filled quantity.
    pub filled_quantity: Decimal,
    /// Raw broker status string (e.g. `"new"`, `"partially_filled"`).
    pub status: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub filled_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
}

impl OrderSnapshot {
    /// Lifecycle state derived from the terminal timestamps.
    ///
    /// Cancellation wins over failure, failure over fill.
    pub fn state(&self) -> OrderState {
        if self.canceled_at.is_some() {
            OrderState::Canceled
        } else if self.failed_at.is_some() {
            OrderState::Failed
        } else if self.filled_at.is_some() {
            OrderState::Filled
        } else {
            OrderState::Open
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == OrderState::Open
    }

    /// Quantity still working (`quantity − filled_quantity`, never negative).
    pub fn unfilled_quantity(&self) -> Decimal {
        (self.quantity - self.filled_quantity).max(Decimal::ZERO)
    }
}

/// Net holding in one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    /// Positive = long, negative = short.
    pub quantity: Decimal,
}

/// Account summary as reported by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub status: String,
    pub currency: String,
    pub cash: Decimal,
    pub equity: Decimal,
    pub buying_power: Decimal,
    pub daytrading_buying_power: Decimal,
    pub account_blocked: bool,
    pub trading_blocked: bool,
    pub transfers_blocked: bool,
    pub trade_suspended_by_user: bool,
    pub shorting_enabled: bool,
    pub crypto_status: Option<String>,
}

/// Position and pending orders for one symbol, fetched fresh per decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionState {
    /// Signed net quantity; zero when no position exists.
    pub quantity: Decimal,
    /// Open orders in broker response order.
    pub open_orders: Vec<OrderSnapshot>,
}

impl PositionState {
    pub fn new(position: Option<&Position>, open_orders: Vec<OrderSnapshot>) -> Self {
        Self {
            quantity: position.map(|p| p.quantity).unwrap_or(Decimal::ZERO),
            open_orders,
        }
    }

    /// A flat position with no pending orders.
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn with_quantity(quantity: Decimal) -> Self {
        Self { quantity, open_orders: Vec::new() }
    }
}

/// The slice of account state the sizer needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccountState {
    /// Cash snapshot taken once per unit of work. May be negative.
    pub cash: Decimal,
}

impl AccountState {
    pub fn new(cash: Decimal) -> Self {
        Self { cash }
    }
}
