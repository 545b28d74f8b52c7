//! Typed error definitions for the bridge.
//!
//! [`TvbError`] is the error type of the decision and supervision core. Broker
//! clients keep using `anyhow::Result`; their failures are wrapped into
//! [`TvbError::Broker`] at the point where the core issued the call.

use thiserror::Error;

/// Domain-specific errors for the bridge.
#[derive(Debug, Error)]
pub enum TvbError {
    /// Alert text did not match any known grammar.
    #[error("parse error: {0}")]
    Parse(String),

    /// Settings are missing, misspelt, inconsistent, or lack a timeout policy.
    #[error("config error: {0}")]
    Config(String),

    /// The alert parsed, but no decision rule covers it.
    #[error("unhandled signal: {0}")]
    UnhandledSignal(String),

    /// A remote broker call failed.
    #[error("broker error: {0:#}")]
    Broker(anyhow::Error),

    /// An order request could not be built (e.g. zero quantity).
    #[error("order error: {0}")]
    Order(String),

    /// Order supervision could not reach a trustworthy terminal state.
    #[error("supervision error: {0}")]
    Supervision(String),
}

impl TvbError {
    /// Returns `true` for errors that must abort the unit of work without any
    /// further order activity.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Supervision(_))
    }
}
