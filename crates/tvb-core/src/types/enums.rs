//! Enumerations used throughout the bridge.
//!
//! Alert keywords arrive in arbitrary case (`Bullish`, `OPEN`, `sell`); the
//! `from_keyword` constructors normalize them into the canonical variants.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Signal vocabulary
// ---------------------------------------------------------------------------

/// Action keyword carried by an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalAction {
    Open,
    Close,
    Bull,
    Bear,
    Buy,
    Sell,
}

impl SignalAction {
    /// Case-insensitive keyword lookup.
    pub fn from_keyword(word: &str) -> Option<Self> {
        const KEYWORDS: [(&str, SignalAction); 6] = [
            ("open", SignalAction::Open),
            ("close", SignalAction::Close),
            ("bull", SignalAction::Bull),
            ("bear", SignalAction::Bear),
            ("buy", SignalAction::Buy),
            ("sell", SignalAction::Sell),
        ];
        KEYWORDS
            .iter()
            .find(|(kw, _)| kw.eq_ignore_ascii_case(word))
            .map(|(_, action)| *action)
    }
}

impl std::fmt::Display for SignalAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Close => write!(f, "Close"),
            Self::Bull => write!(f, "Bull"),
            Self::Bear => write!(f, "Bear"),
            Self::Buy => write!(f, "Buy"),
            Self::Sell => write!(f, "Sell"),
        }
    }
}

/// Optional position context carried by indicator alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionHint {
    Long,
    Short,
}

impl PositionHint {
    /// Case-insensitive keyword lookup.
    pub fn from_keyword(word: &str) -> Option<Self> {
        if word.eq_ignore_ascii_case("long") {
            Some(Self::Long)
        } else if word.eq_ignore_ascii_case("short") {
            Some(Self::Short)
        } else {
            None
        }
    }
}

impl std::fmt::Display for PositionHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "Long"),
            Self::Short => write!(f, "Short"),
        }
    }
}

// ---------------------------------------------------------------------------
// Order / trading enums
// ---------------------------------------------------------------------------

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Wire representation used by the Alpaca API.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time-in-force for submitted orders. Only good-till-canceled is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeInForce {
    #[default]
    GoodTillCanceled,
}

impl TimeInForce {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GoodTillCanceled => "gtc",
        }
    }
}

/// What to do with an order that is still open after the per-order timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeoutPolicy {
    /// Cancel and confirm the cancellation.
    Cancel,
    /// Cancel, then resubmit the unfilled remainder as a market order.
    Market,
}

impl TimeoutPolicy {
    /// Parse a settings value. Only the exact spellings `Cancel` and `Market`
    /// are accepted.
    pub fn from_setting(value: &str) -> Option<Self> {
        match value {
            "Cancel" => Some(Self::Cancel),
            "Market" => Some(Self::Market),
            _ => None,
        }
    }
}

/// Lifecycle state of an order as seen by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderState {
    Open,
    Filled,
    Canceled,
    Failed,
}

/// Terminal result of a supervised order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderOutcome {
    Filled,
    Canceled,
    Failed,
}

impl std::fmt::Display for OrderOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Filled => write!(f, "filled"),
            Self::Canceled => write!(f, "canceled"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Which Alpaca account the bridge trades against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountKind {
    #[serde(rename = "paperTrading")]
    Paper,
    #[serde(rename = "realTrading")]
    Real,
}

impl AccountKind {
    pub fn is_paper(self) -> bool {
        matches!(self, Self::Paper)
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paper => write!(f, "PAPER"),
            Self::Real => write!(f, "REAL MONEY"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_keywords_ignore_case() {
        assert_eq!(SignalAction::from_keyword("BULL"), Some(SignalAction::Bull));
        assert_eq!(SignalAction::from_keyword("close"), Some(SignalAction::Close));
        assert_eq!(SignalAction::from_keyword("Sell"), Some(SignalAction::Sell));
        assert_eq!(SignalAction::from_keyword("hold"), None);
    }

    #[test]
    fn hint_keywords_ignore_case() {
        assert_eq!(PositionHint::from_keyword("SHORT"), Some(PositionHint::Short));
        assert_eq!(PositionHint::from_keyword("long"), Some(PositionHint::Long));
        assert_eq!(PositionHint::from_keyword("flat"), None);
    }

    #[test]
    fn timeout_policy_requires_exact_spelling() {
        assert_eq!(TimeoutPolicy::from_setting("Cancel"), Some(TimeoutPolicy::Cancel));
        assert_eq!(TimeoutPolicy::from_setting("Market"), Some(TimeoutPolicy::Market));
        assert_eq!(TimeoutPolicy::from_setting("market"), None);
        assert_eq!(TimeoutPolicy::from_setting("Cancle"), None);
    }

    #[test]
    fn account_kind_setting_names() {
        let kind: AccountKind = serde_json::from_str("\"realTrading\"").unwrap();
        assert_eq!(kind, AccountKind::Real);
        assert!(!kind.is_paper());
        assert_eq!(AccountKind::Paper.to_string(), "PAPER");
    }
}
