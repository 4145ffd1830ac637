//! Configuration for the dispatch module.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the dispatch pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Pause between two consecutive items (milliseconds).
    /// Keeps the message service from being flooded; 0 disables pacing.
    #[serde(default = "default_pacing_delay")]
    pub pacing_delay_ms: u64,

    /// Time budget for each individual service call (seconds).
    /// A call exceeding it counts as a failure of that item only.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,

    /// Address used for items without a recipient address of their own.
    #[serde(default = "default_recipient_address")]
    pub default_recipient_address: String,
}

fn default_pacing_delay() -> u64 {
    300
}

fn default_call_timeout() -> u64 {
    30
}

fn default_recipient_address() -> String {
    "destinataire@example.com".to_string()
}

impl DispatchConfig {
    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pacing_delay_ms: default_pacing_delay(),
            call_timeout_secs: default_call_timeout(),
            default_recipient_address: default_recipient_address(),
        }
    }
}
