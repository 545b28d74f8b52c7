//! # tvb-core
//!
//! Core crate for the TradingView → Alpaca bridge, providing:
//!
//! - **Types** (`types`): enums, trade signals, order requests and broker snapshots
//! - **Configuration** (`config`): JSON settings deserialization and validation
//! - **Error types** (`error`): domain-specific `TvbError` via thiserror
//! - **Logging** (`logging`): tracing-based structured logging

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

// Re-export types at crate root for convenience.
pub use error::TvbError;
pub use types::*;
