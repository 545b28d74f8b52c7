//! # tvb-engine
//!
//! Decision and supervision core of the bridge.
//!
//! ## Pipeline
//!
//! ```text
//! alert text ──► parser ──► sizer ──► builder ──► Broker::submit_order ──► supervisor
//!                  │          │
//!                  │          └─ position, open orders, cash (fresh per alert)
//!                  └─ TradeSignal
//! ```
//!
//! - [`parser`]: alert grammars → `TradeSignal`
//! - [`sizer`]: decision table → `OrderIntent`
//! - [`builder`]: market / limit `OrderRequest`
//! - [`supervisor`]: polling, timeout escalation, failsafe cancel
//! - [`orchestrator`]: one unit of work per alert

pub mod builder;
pub mod orchestrator;
pub mod parser;
pub mod sizer;
pub mod supervisor;

pub use orchestrator::{Disposition, EngineSettings, TradeOrchestrator};
