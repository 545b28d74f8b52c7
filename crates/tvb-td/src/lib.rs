//! # tvb-td
//!
//! Brokerage access for the bridge.
//!
//! Each broker implements the [`Broker`] trait, which provides the account,
//! position, and order operations the decision core consumes. The broker's own
//! state is the single source of truth: implementations never cache results
//! between calls.
//!
//! ## Supported brokers
//!
//! | Broker | Module   | Accounts      | Order channel |
//! |--------|----------|---------------|---------------|
//! | Alpaca | `alpaca` | Paper, Live   | REST          |

pub mod alpaca;
#[cfg(any(test, feature = "testkit"))]
pub mod mock;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tvb_core::trading::{AccountSnapshot, OrderRequest, OrderSnapshot, Position};

/// Trait implemented by all brokers.
///
/// All operations take `&self` so a single broker can serve many concurrent
/// units of work. No call carries its own timeout; a hung call blocks only the
/// unit of work that issued it.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Account summary (cash balance and status flags).
    async fn get_account(&self) -> Result<AccountSnapshot>;

    /// Open orders, optionally filtered by symbol, in broker response order.
    async fn get_open_orders(&self, symbol: Option<&str>) -> Result<Vec<OrderSnapshot>>;

    /// Net position in `symbol`, or `None` when flat.
    async fn get_position(&self, symbol: &str) -> Result<Option<Position>>;

    /// Submit a new order.
    ///
    /// Returns the broker's view of the accepted order, including its ID.
    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderSnapshot>;

    /// Fetch the current state of an order by broker ID.
    async fn get_order(&self, order_id: &str) -> Result<OrderSnapshot>;

    /// Request cancellation of an order by broker ID.
    ///
    /// Returning `Ok` only means the request was accepted; callers confirm
    /// the outcome with [`get_order`](Broker::get_order).
    async fn cancel_order(&self, order_id: &str) -> Result<()>;

    /// Cancel every open order on the account.
    async fn cancel_all_orders(&self) -> Result<()>;
}

#[async_trait]
impl<B: Broker + ?Sized> Broker for Arc<B> {
    async fn get_account(&self) -> Result<AccountSnapshot> {
        (**self).get_account().await
    }

    async fn get_open_orders(&self, symbol: Option<&str>) -> Result<Vec<OrderSnapshot>> {
        (**self).get_open_orders(symbol).await
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<Position>> {
        (**self).get_position(symbol).await
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderSnapshot> {
        (**self).submit_order(request).await
    }

    async fn get_order(&self, order_id: &str) -> Result<OrderSnapshot> {
        (**self).get_order(order_id).await
    }

    async fn cancel_order(&self, order_id: &str) -> Result<()> {
        (**self).cancel_order(order_id).await
    }

    async fn cancel_all_orders(&self) -> Result<()> {
        (**self).cancel_all_orders().await
    }
}
