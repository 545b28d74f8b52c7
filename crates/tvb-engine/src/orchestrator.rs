//! Per-alert unit of work.
//!
//! parse → fetch state → cancel pending orders → size → build → submit →
//! supervise. Every alert runs independently; broker state is re-read for each
//! one and nothing is cached between alerts.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use tvb_core::TvbError;
use tvb_core::config::TradingOptions;
use tvb_core::trading::{AccountState, OrderRequest, PositionState};
use tvb_core::types::{OrderOutcome, TradeSignal};
use tvb_td::Broker;

use crate::builder::{self, LimitOptions};
use crate::parser;
use crate::sizer::{self, SizingOptions};
use crate::supervisor::{OrderSupervisor, SupervisorOptions};

/// Everything the orchestrator needs from the settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub sizing: SizingOptions,
    pub limits: LimitOptions,
    pub supervision: SupervisorOptions,
    /// `false` runs the decision logic without cancel or submit calls.
    pub enabled: bool,
}

impl EngineSettings {
    pub fn from_options(options: &TradingOptions) -> Result<Self, TvbError> {
        Ok(Self {
            sizing: SizingOptions::from_options(options),
            limits: LimitOptions::from_options(options),
            supervision: SupervisorOptions::from_options(options)?,
            enabled: options.enabled,
        })
    }
}

/// How a unit of work ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Nothing to do for this signal.
    Skipped,
    /// Trading disabled; this order would have been placed.
    DryRun(OrderRequest),
    /// The order was placed and reached a terminal outcome.
    Settled(OrderRequest, OrderOutcome),
}

/// Turns alerts into supervised orders.
pub struct TradeOrchestrator<B: Broker> {
    broker: Arc<B>,
    settings: EngineSettings,
}

impl<B: Broker> TradeOrchestrator<B> {
    pub fn new(broker: Arc<B>, settings: EngineSettings) -> Self {
        Self { broker, settings }
    }

    /// Process one alert to completion.
    pub async fn handle(&self, raw: &str) -> Result<Disposition, TvbError> {
        let signal = parser::parse_signal(raw).inspect_err(|e| warn!("[engine] {e}"))?;
        info!("[engine] signal: {signal}");

        self.handle_signal(&signal).await.inspect_err(|e| {
            if e.is_fatal() || matches!(e, TvbError::Broker(_)) {
                error!(
                    "[engine] {e} for: {}, action: {}, price: {}",
                    signal.symbol, signal.action, signal.reference_price
                );
            } else {
                warn!(
                    "[engine] {e} for: {}, action: {}, price: {}",
                    signal.symbol, signal.action, signal.reference_price
                );
            }
        })
    }

    async fn handle_signal(&self, signal: &TradeSignal) -> Result<Disposition, TvbError> {
        let symbol = signal.symbol.as_str();

        let open_orders = self.broker.get_open_orders(Some(symbol)).await.map_err(TvbError::Broker)?;
        let position = self.broker.get_position(symbol).await.map_err(TvbError::Broker)?;
        let position = PositionState::new(position.as_ref(), open_orders);
        debug!(
            "[engine] {symbol}: position {} with {} open order(s)",
            position.quantity,
            position.open_orders.len()
        );

        let account = match self.settings.sizing.test_balance {
            Some(balance) => AccountState::new(balance),
            None => {
                let snapshot = self.broker.get_account().await.map_err(TvbError::Broker)?;
                AccountState::new(snapshot.cash)
            }
        };

        self.cancel_pending(&position).await?;

        let intent = sizer::decide(signal, &position, &account, &self.settings.sizing)?;
        if intent.is_no_action() {
            info!(
                "[engine] no order for: {symbol}, action: {}, price: {}, quantity: 0",
                signal.action, signal.reference_price
            );
            return Ok(Disposition::Skipped);
        }

        let request = builder::build(symbol, &intent, signal.reference_price, &self.settings.limits)?;
        if !self.settings.enabled {
            info!(
                "[engine] not enabled, order not placed for: {symbol}, action: {}, price: {}, quantity: {}",
                signal.action, signal.reference_price, request.quantity
            );
            debug!("[engine] dry-run request: {request}");
            return Ok(Disposition::DryRun(request));
        }

        let order = self.broker.submit_order(&request).await.map_err(TvbError::Broker)?;
        info!(
            "[engine] order submitted for: {symbol}, action: {}, price: {}, quantity: {} → {request}",
            signal.action, signal.reference_price, request.quantity
        );

        let supervisor = OrderSupervisor::new(Arc::clone(&self.broker), self.settings.supervision);
        let verified = supervisor.supervise(order).await?;
        info!(
            "[engine] order {} for: {symbol}, action: {}, price: {}, quantity: {}",
            verified.outcome, signal.action, signal.reference_price, request.quantity
        );
        Ok(Disposition::Settled(request, verified.outcome))
    }

    /// Cancel every open order for the symbol before acting on a new decision.
    async fn cancel_pending(&self, position: &PositionState) -> Result<(), TvbError> {
        for order in &position.open_orders {
            if !self.settings.enabled {
                debug!("[engine] dry-run: would cancel order {} ({} {} {})", order.id, order.side, order.quantity, order.symbol);
                continue;
            }
            info!(
                "[engine] canceling pending order {} ({} {}/{} {})",
                order.id, order.side, order.filled_quantity, order.quantity, order.symbol
            );
            self.broker.cancel_order(&order.id).await.map_err(TvbError::Broker)?;
        }
        Ok(())
    }
}
