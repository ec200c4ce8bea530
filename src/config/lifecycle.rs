//! Subscription lifecycle configuration

use std::time::Duration;

use serde::Deserialize;

/// Background expiry sweep. Lazy expiry on read is always on; the sweep only
/// tidies rows nobody has looked at.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LifecycleConfig {
    /// Seconds between sweeps, 0 disables the sweep
    #[serde(default)]
    pub sweep_interval_secs: u64,
}

impl LifecycleConfig {
    /// Sweep period, or `None` when disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}
