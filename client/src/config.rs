//! Client configuration with TOML file support.

use std::time::Duration;

use ballot_types::{AccountAddress, ChainId};
use serde::{Deserialize, Serialize};

use crate::logging::LogFormat;
use crate::ClientError;

/// Configuration for the ballot client.
///
/// Can be loaded from a TOML file via [`ClientConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// JSON-RPC endpoint of the wallet.
    #[serde(default = "default_wallet_url")]
    pub wallet_url: String,

    /// Address the election contract is deployed at. Required.
    #[serde(default)]
    pub contract_address: String,

    /// Refuse to connect when the wallet is on any other chain.
    #[serde(default)]
    pub expected_chain_id: Option<u64>,

    /// How often to poll the wallet for account/chain changes.
    #[serde(default = "default_account_poll_interval_ms")]
    pub account_poll_interval_ms: u64,

    /// How often to poll for a pending transaction's receipt.
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,

    /// Consecutive polls a transaction may be unknown before it counts as dropped.
    #[serde(default = "default_dropped_after_polls")]
    pub dropped_after_polls: u32,

    /// Largest candidate count the client will read; a larger count is
    /// shown as a failed candidate list.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_wallet_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_account_poll_interval_ms() -> u64 {
    1_000
}

fn default_receipt_poll_interval_ms() -> u64 {
    2_000
}

fn default_dropped_after_polls() -> u32 {
    30
}

fn default_max_candidates() -> u64 {
    crate::sync::DEFAULT_MAX_CANDIDATES
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, ClientError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ClientError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ClientError> {
        toml::from_str(s).map_err(|e| ClientError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("ClientConfig is always serializable to TOML")
    }

    /// Check the fields that cannot be defaulted.
    pub fn validate(&self) -> Result<(), ClientError> {
        self.contract_address()?;
        self.log_format()?;
        if self.wallet_url.trim().is_empty() {
            return Err(ClientError::Config("wallet_url is empty".into()));
        }
        Ok(())
    }

    pub fn contract_address(&self) -> Result<AccountAddress, ClientError> {
        if self.contract_address.trim().is_empty() {
            return Err(ClientError::Config("contract_address is not set".into()));
        }
        AccountAddress::parse(&self.contract_address)
            .map_err(|e| ClientError::Config(format!("contract_address: {e}")))
    }

    pub fn expected_chain(&self) -> Option<ChainId> {
        self.expected_chain_id.map(ChainId)
    }

    pub fn log_format(&self) -> Result<LogFormat, ClientError> {
        self.log_format.parse().map_err(ClientError::Config)
    }

    pub fn account_poll_interval(&self) -> Duration {
        Duration::from_millis(self.account_poll_interval_ms.max(1))
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms.max(1))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            wallet_url: default_wallet_url(),
            contract_address: String::new(),
            expected_chain_id: None,
            account_poll_interval_ms: default_account_poll_interval_ms(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
            dropped_after_polls: default_dropped_after_polls(),
            max_candidates: default_max_candidates(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
