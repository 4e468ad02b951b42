// ==========================================
// Billing Import Engine - Configuration Layer
// ==========================================
// Counterparty profiles (alias/rule/tax tables) and
// session-level settings.
// ==========================================

pub mod profile;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use profile::{ClassificationRule, CounterpartyProfile, RuleSet, TaxTable};

// ==========================================
// SessionConfig - session store settings
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sessions idle longer than this are evicted by the sweeper.
    /// Observed practice is 5-10 minutes.
    pub idle_ttl: Duration,
    /// Interval of the background eviction sweep.
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_session_config() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.idle_ttl, Duration::from_secs(600));
        assert!(cfg.sweep_interval < cfg.idle_ttl);
    }
}
