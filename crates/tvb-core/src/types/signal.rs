//! Structured form of an inbound alert.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::{PositionHint, SignalAction};

/// A parsed alert. Immutable once produced by the signal parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeSignal {
    /// Normalized action keyword.
    pub action: SignalAction,
    /// `None` means unspecified and is treated as a long context.
    pub position_hint: Option<PositionHint>,
    /// Ticker exactly as it appeared in the alert (no case folding).
    pub symbol: String,
    /// Price quoted by the alert; always positive.
    pub reference_price: Decimal,
}

impl std::fmt::Display for TradeSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.position_hint {
            Some(hint) => write!(f, "{} {} {}@{}", self.action, hint, self.symbol, self.reference_price),
            None => write!(f, "{} {}@{}", self.action, self.symbol, self.reference_price),
        }
    }
}
