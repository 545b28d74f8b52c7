//! Settings parsing for the bridge.
//!
//! All settings live in a single JSON file. `paperTrading` holds the complete
//! option set; `realTrading` holds overrides that are merged on top of it when
//! `using` selects the real-money account. Every option key is mandatory in
//! `paperTrading`, and unknown keys are rejected everywhere, so a misspelt
//! option fails at startup instead of silently falling back to a default.
//!
//! # Example
//!
//! ```json
//! {
//!   "using": "paperTrading",
//!   "paperTrading": {
//!     "short": false, "buyPerc": 0.2, "testMode": true, "enabled": true,
//!     "limit": true, "limitamt": 0.04, "limitThreshold": 100, "limitPerc": 0.0005,
//!     "maxTime": 10, "totalMaxTime": 30, "buyTimeout": "Cancel", "sellTimeout": "Market"
//!   },
//!   "realTrading": { "testMode": false },
//!   "server": { "host": "0.0.0.0", "port": 5000 }
//! }
//! ```

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use crate::error::TvbError;
use crate::types::{AccountKind, TimeoutPolicy};

/// Balance substituted for the account cash when `testMode` is on.
pub const TEST_MODE_BALANCE: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);

/// Top-level settings file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Which account (and option set) to use.
    pub using: AccountKind,

    /// Complete option set; the base for both accounts.
    #[serde(rename = "paperTrading")]
    pub paper_trading: TradingOptions,

    /// Overrides applied when trading with real money.
    #[serde(rename = "realTrading", default)]
    pub real_trading: TradingOptionsOverride,

    /// Webhook listener address.
    #[serde(default)]
    pub server: ServerConfig,
}

/// The option set consumed by the decision and supervision core.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct TradingOptions {
    /// Allow opening short positions.
    pub short: bool,
    /// Fraction of the balance spent per new entry.
    pub buy_perc: Decimal,
    /// Size against [`TEST_MODE_BALANCE`] instead of the account cash.
    pub test_mode: bool,
    /// Submit and cancel orders for real. `false` runs the decision logic only.
    pub enabled: bool,
    /// Use limit orders instead of market orders.
    pub limit: bool,
    /// Absolute limit offset used at or below `limitThreshold`.
    #[serde(rename = "limitamt")]
    pub limit_amt: Decimal,
    /// Price above which the fractional offset `limitPerc` applies.
    pub limit_threshold: Decimal,
    /// Fractional limit offset used above `limitThreshold`.
    pub limit_perc: Decimal,
    /// Per-order timeout in seconds before escalation.
    pub max_time: f64,
    /// Absolute order lifetime in seconds before the failsafe cancel.
    pub total_max_time: f64,
    /// Escalation policy for buy orders (`"Cancel"` or `"Market"`).
    pub buy_timeout: String,
    /// Escalation policy for sell orders (`"Cancel"` or `"Market"`).
    pub sell_timeout: String,
}

/// Partial option set. Every present key replaces the base value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct TradingOptionsOverride {
    pub short: Option<bool>,
    pub buy_perc: Option<Decimal>,
    pub test_mode: Option<bool>,
    pub enabled: Option<bool>,
    pub limit: Option<bool>,
    #[serde(rename = "limitamt")]
    pub limit_amt: Option<Decimal>,
    pub limit_threshold: Option<Decimal>,
    pub limit_perc: Option<Decimal>,
    pub max_time: Option<f64>,
    pub total_max_time: Option<f64>,
    pub buy_timeout: Option<String>,
    pub sell_timeout: Option<String>,
}

/// Webhook listener address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    5000
}

impl TradingOptions {
    /// Apply every key present in `patch`.
    pub fn merged(&self, patch: &TradingOptionsOverride) -> Self {
        let mut out = self.clone();
        if let Some(v) = patch.short {
            out.short = v;
        }
        if let Some(v) = patch.buy_perc {
            out.buy_perc = v;
        }
        if let Some(v) = patch.test_mode {
            out.test_mode = v;
        }
        if let Some(v) = patch.enabled {
            out.enabled = v;
        }
        if let Some(v) = patch.limit {
            out.limit = v;
        }
        if let Some(v) = patch.limit_amt {
            out.limit_amt = v;
        }
        if let Some(v) = patch.limit_threshold {
            out.limit_threshold = v;
        }
        if let Some(v) = patch.limit_perc {
            out.limit_perc = v;
        }
        if let Some(v) = patch.max_time {
            out.max_time = v;
        }
        if let Some(v) = patch.total_max_time {
            out.total_max_time = v;
        }
        if let Some(ref v) = patch.buy_timeout {
            out.buy_timeout = v.clone();
        }
        if let Some(ref v) = patch.sell_timeout {
            out.sell_timeout = v.clone();
        }
        out
    }

    /// Per-order timeout as a [`Duration`].
    pub fn per_order_timeout(&self) -> Result<Duration, TvbError> {
        seconds("maxTime", self.max_time)
    }

    /// Failsafe timeout as a [`Duration`].
    pub fn total_timeout(&self) -> Result<Duration, TvbError> {
        seconds("totalMaxTime", self.total_max_time)
    }

    /// Escalation policy for buy orders; `None` if the setting is unrecognized.
    pub fn buy_timeout_policy(&self) -> Option<TimeoutPolicy> {
        TimeoutPolicy::from_setting(&self.buy_timeout)
    }

    /// Escalation policy for sell orders; `None` if the setting is unrecognized.
    pub fn sell_timeout_policy(&self) -> Option<TimeoutPolicy> {
        TimeoutPolicy::from_setting(&self.sell_timeout)
    }

    /// Range checks on numeric options.
    pub fn validate(&self) -> Result<(), TvbError> {
        if self.buy_perc <= Decimal::ZERO || self.buy_perc > Decimal::ONE {
            return Err(TvbError::Config(format!("buyPerc must be in (0, 1], got {}", self.buy_perc)));
        }
        for (name, value) in [
            ("limitamt", self.limit_amt),
            ("limitThreshold", self.limit_threshold),
            ("limitPerc", self.limit_perc),
        ] {
            if value < Decimal::ZERO {
                return Err(TvbError::Config(format!("{name} must not be negative, got {value}")));
            }
        }
        self.per_order_timeout()?;
        self.total_timeout()?;

        // Unknown policy spellings are tolerated here; they only become fatal
        // when an order on that side actually times out.
        if self.buy_timeout_policy().is_none() {
            warn!("[config] unrecognized buyTimeout '{}', buy orders cannot escalate", self.buy_timeout);
        }
        if self.sell_timeout_policy().is_none() {
            warn!("[config] unrecognized sellTimeout '{}', sell orders cannot escalate", self.sell_timeout);
        }
        Ok(())
    }
}

fn seconds(name: &str, value: f64) -> Result<Duration, TvbError> {
    if value <= 0.0 {
        return Err(TvbError::Config(format!("{name} must be positive, got {value}")));
    }
    Duration::try_from_secs_f64(value)
        .map_err(|e| TvbError::Config(format!("{name} is not a valid duration ({value}): {e}")))
}

/// Settings after account selection and override merging.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSettings {
    pub account: AccountKind,
    pub options: TradingOptions,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Parse settings from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, TvbError> {
        serde_json::from_str(content).map_err(|e| TvbError::Config(format!("invalid settings: {e}")))
    }

    /// Select the account, merge overrides, and validate the result.
    pub fn resolve(&self) -> Result<ResolvedSettings, TvbError> {
        let options = match self.using {
            AccountKind::Paper => self.paper_trading.clone(),
            AccountKind::Real => self.paper_trading.merged(&self.real_trading),
        };
        options.validate()?;

        // A fixed test balance against a live account could size orders far
        // beyond the real cash.
        if options.enabled && options.test_mode && !self.using.is_paper() {
            return Err(TvbError::Config(
                "testMode with real money keys while enabled; disable one or the other".into(),
            ));
        }

        Ok(ResolvedSettings { account: self.using, options, server: self.server.clone() })
    }
}

/// Load and parse a JSON settings file.
pub fn load_config(path: &std::path::Path) -> Result<AppConfig, TvbError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| TvbError::Config(format!("cannot read {}: {e}", path.display())))?;
    AppConfig::from_json(&content)
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// API credentials for the selected account.
#[derive(Clone)]
pub struct BrokerCredentials {
    pub account: AccountKind,
    pub api_key: String,
    pub secret_key: String,
}

impl std::fmt::Debug for BrokerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerCredentials")
            .field("account", &self.account)
            .field("api_key", &mask(&self.api_key))
            .field("secret_key", &"***")
            .finish()
    }
}

fn mask(key: &str) -> String {
    format!("{}***", key.chars().take(4).collect::<String>())
}

impl BrokerCredentials {
    /// Environment variable names holding the key pair for `account`.
    pub fn env_names(account: AccountKind) -> (&'static str, &'static str) {
        match account {
            AccountKind::Paper => ("Alpaca_API_KEY", "Alpaca_SECRET_KEY"),
            AccountKind::Real => ("Alpaca_API_KEY-real", "Alpaca_SECRET-real"),
        }
    }

    /// Read the key pair from the process environment.
    pub fn from_env(account: AccountKind) -> Result<Self, TvbError> {
        Self::from_lookup(account, |name| std::env::var(name).ok())
    }

    /// Read the key pair through an arbitrary variable lookup.
    pub fn from_lookup(
        account: AccountKind,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, TvbError> {
        let (key_var, secret_var) = Self::env_names(account);
        let fetch = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| TvbError::Config(format!("missing credential variable {name}")))
        };
        Ok(Self { account, api_key: fetch(key_var)?, secret_key: fetch(secret_var)? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const PAPER: &str = r#"{
        "short": false, "buyPerc": 0.2, "testMode": true, "enabled": true,
        "limit": true, "limitamt": 0.04, "limitThreshold": 100, "limitPerc": 0.0005,
        "maxTime": 10, "totalMaxTime": 30, "buyTimeout": "Cancel", "sellTimeout": "Market"
    }"#;

    fn settings(using: &str, real: &str) -> String {
        format!(r#"{{ "using": "{using}", "paperTrading": {PAPER}, "realTrading": {real} }}"#)
    }

    #[test]
    fn parses_complete_paper_settings() {
        let cfg = AppConfig::from_json(&settings("paperTrading", "{}")).unwrap();
        let resolved = cfg.resolve().unwrap();
        assert_eq!(resolved.account, AccountKind::Paper);
        assert_eq!(resolved.options.buy_perc, dec!(0.2));
        assert_eq!(resolved.options.limit_amt, dec!(0.04));
        assert_eq!(resolved.options.limit_threshold, dec!(100));
        assert_eq!(resolved.options.per_order_timeout().unwrap(), Duration::from_secs(10));
        assert_eq!(resolved.options.buy_timeout_policy(), Some(TimeoutPolicy::Cancel));
        assert_eq!(resolved.options.sell_timeout_policy(), Some(TimeoutPolicy::Market));
        assert_eq!(resolved.server, ServerConfig::default());
    }

    #[test]
    fn missing_key_is_rejected() {
        let json = r#"{ "using": "paperTrading", "paperTrading": {
            "short": false, "buyPerc": 0.2, "testMode": true, "enabled": true,
            "limit": true, "limitamt": 0.04, "limitThreshold": 100, "limitPerc": 0.0005,
            "maxTime": 10, "buyTimeout": "Cancel", "sellTimeout": "Market" } }"#;
        let err = AppConfig::from_json(json).unwrap_err();
        assert!(matches!(err, TvbError::Config(_)));
        assert!(err.to_string().contains("totalMaxTime"));
    }

    #[test]
    fn extra_key_is_rejected() {
        let json = PAPER.replace("\"short\": false", "\"short\": false, \"leverage\": 2");
        let err = AppConfig::from_json(&format!(r#"{{ "using": "paperTrading", "paperTrading": {json} }}"#))
            .unwrap_err();
        assert!(err.to_string().contains("leverage"));
    }

    #[test]
    fn misspelt_real_override_is_rejected() {
        let err = AppConfig::from_json(&settings("realTrading", r#"{ "testmode": false }"#)).unwrap_err();
        assert!(matches!(err, TvbError::Config(_)));
    }

    #[test]
    fn real_overrides_are_merged() {
        let cfg =
            AppConfig::from_json(&settings("realTrading", r#"{ "testMode": false, "buyPerc": 0.1 }"#)).unwrap();
        let resolved = cfg.resolve().unwrap();
        assert_eq!(resolved.account, AccountKind::Real);
        assert!(!resolved.options.test_mode);
        assert_eq!(resolved.options.buy_perc, dec!(0.1));
        assert_eq!(resolved.options.limit_perc, dec!(0.0005));
    }

    #[test]
    fn test_mode_with_real_money_is_refused() {
        let cfg = AppConfig::from_json(&settings("realTrading", "{}")).unwrap();
        let err = cfg.resolve().unwrap_err();
        assert!(err.to_string().contains("testMode"));
    }

    #[test]
    fn test_mode_with_real_money_allowed_when_disabled() {
        let cfg = AppConfig::from_json(&settings("realTrading", r#"{ "enabled": false }"#)).unwrap();
        assert!(cfg.resolve().is_ok());
    }

    #[test]
    fn range_checks() {
        let mut opts = AppConfig::from_json(&settings("paperTrading", "{}")).unwrap().paper_trading;
        opts.buy_perc = dec!(1.5);
        assert!(opts.validate().is_err());

        opts.buy_perc = dec!(0.2);
        opts.max_time = 0.0;
        assert!(opts.validate().is_err());

        opts.max_time = 10.0;
        opts.limit_amt = dec!(-0.01);
        assert!(opts.validate().is_err());
    }

    #[test]
    fn unknown_policy_is_tolerated_at_startup() {
        let mut opts = AppConfig::from_json(&settings("paperTrading", "{}")).unwrap().paper_trading;
        opts.sell_timeout = "Limit".into();
        assert!(opts.validate().is_ok());
        assert_eq!(opts.sell_timeout_policy(), None);
    }

    #[test]
    fn credentials_from_lookup() {
        let creds = BrokerCredentials::from_lookup(AccountKind::Real, |name| match name {
            "Alpaca_API_KEY-real" => Some("AKREAL123".into()),
            "Alpaca_SECRET-real" => Some("s3cret".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(creds.api_key, "AKREAL123");
        assert!(!format!("{creds:?}").contains("s3cret"));

        let err = BrokerCredentials::from_lookup(AccountKind::Paper, |_| None).unwrap_err();
        assert!(err.to_string().contains("Alpaca_API_KEY"));
    }

    #[test]
    fn test_mode_balance_constant() {
        assert_eq!(TEST_MODE_BALANCE, dec!(100000));
    }
}
