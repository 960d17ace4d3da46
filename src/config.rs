use std::collections::HashMap;
use std::time::Duration;

use crate::domain::Network;

/// Base fee per operation, in stroops.
pub const DEFAULT_BASE_FEE: u32 = 100;

/// Seconds a signed transaction stays valid.
pub const DEFAULT_TX_TIMEOUT_SECS: u64 = 180;

/// HTTP timeout for a single gateway request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolved runtime settings shared by the gateway and the service.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_fee: u32,
    pub tx_timeout_secs: u64,
    pub http_timeout: Duration,
    horizon_overrides: HashMap<Network, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_fee: DEFAULT_BASE_FEE,
            tx_timeout_secs: DEFAULT_TX_TIMEOUT_SECS,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            horizon_overrides: HashMap::new(),
        }
    }
}

impl Settings {
    pub fn with_base_fee(mut self, base_fee: u32) -> Self {
        self.base_fee = base_fee;
        self
    }

    pub fn with_tx_timeout(mut self, secs: u64) -> Self {
        self.tx_timeout_secs = secs;
        self
    }

    /// Point one network at a different Horizon instance (self-hosted, or a mock in tests).
    pub fn with_horizon_url(mut self, network: Network, url: impl Into<String>) -> Self {
        let url = url.into();
        self.horizon_overrides
            .insert(network, url.trim_end_matches('/').to_string());
        self
    }

    pub fn horizon_url(&self, network: Network) -> &str {
        self.horizon_overrides
            .get(&network)
            .map(String::as_str)
            .unwrap_or_else(|| network.horizon_url())
    }
}
