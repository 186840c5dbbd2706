//! Consolidated, read-only configuration (§9 "Dynamic config objects").
//!
//! Every knob that would otherwise be scattered global state — MOP
//! preference order, default handling, rollover, invariant-check cadence,
//! and the dealer subsystem's own parameters — is collected here, built once
//! by the driver from a [`crate::scenario::ScenarioInput`] and consulted
//! read-only for the rest of the run.

use crate::dealer::DealerConfig;
use crate::invariants::CheckMode;
use crate::models::ledger::DefaultMode;
use crate::mop::MopConfig;

/// Top-level configuration for one simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub mop: MopConfig,
    pub default_mode: DefaultMode,
    pub rollover_enabled: bool,
    pub check_mode: CheckMode,
    pub max_days: u64,
    pub quiet_days: u64,
    pub dealer: Option<DealerConfig>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            mop: MopConfig::default(),
            default_mode: DefaultMode::default(),
            rollover_enabled: false,
            check_mode: CheckMode::OnCommit,
            max_days: 365,
            quiet_days: 3,
            dealer: None,
        }
    }
}

impl SimConfig {
    pub fn with_default_mode(mut self, mode: DefaultMode) -> Self {
        self.default_mode = mode;
        self
    }

    pub fn with_rollover_enabled(mut self, enabled: bool) -> Self {
        self.rollover_enabled = enabled;
        self
    }

    pub fn with_check_mode(mut self, mode: CheckMode) -> Self {
        self.check_mode = mode;
        self
    }

    pub fn with_max_days(mut self, max_days: u64) -> Self {
        self.max_days = max_days;
        self
    }

    pub fn with_quiet_days(mut self, quiet_days: u64) -> Self {
        self.quiet_days = quiet_days;
        self
    }

    pub fn with_dealer(mut self, dealer: DealerConfig) -> Self {
        self.dealer = Some(dealer);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_disables_dealer_and_rollover() {
        let config = SimConfig::default();
        assert!(config.dealer.is_none());
        assert!(!config.rollover_enabled);
        assert_eq!(config.default_mode, DefaultMode::ExpelAgent);
    }
}
