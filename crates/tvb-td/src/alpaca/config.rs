//! Alpaca broker configuration.
//!
//! Holds API credentials and the REST base URL. The URL defaults to the paper
//! or live endpoint depending on the selected account.

use tvb_core::config::BrokerCredentials;
use tvb_core::types::AccountKind;

/// Configuration for the Alpaca broker.
#[derive(Debug, Clone)]
pub struct AlpacaConfig {
    /// Sent as `APCA-API-KEY-ID`.
    pub api_key: String,

    /// Sent as `APCA-API-SECRET-KEY`.
    pub secret_key: String,

    /// Paper or live account.
    pub account: AccountKind,

    /// REST base URL (no trailing slash).
    pub rest_url: String,
}

impl AlpacaConfig {
    /// Build a config for the credentials' account with the default endpoint.
    pub fn from_credentials(credentials: &BrokerCredentials) -> Self {
        Self {
            api_key: credentials.api_key.clone(),
            secret_key: credentials.secret_key.clone(),
            account: credentials.account,
            rest_url: default_rest_url(credentials.account),
        }
    }

    /// Point the client at a different REST endpoint.
    pub fn with_rest_url(mut self, url: impl Into<String>) -> Self {
        self.rest_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Default REST base URL for an account kind.
pub fn default_rest_url(account: AccountKind) -> String {
    match account {
        AccountKind::Paper => "https://paper-api.alpaca.markets".into(),
        AccountKind::Real => "https://api.alpaca.markets".into(),
    }
}
