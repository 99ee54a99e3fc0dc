//! `From` implementations bridging `probe_config` types to `probe_core` types.

use crate::config::{HomingCfg, ProbeCfg, TrsyncTimeouts};
use std::time::Duration;

impl From<&probe_config::ProbeSection> for ProbeCfg {
    fn from(c: &probe_config::ProbeSection) -> Self {
        Self {
            z_offset: c.z_offset,
            deactivate_on_each_sample: c.deactivate_on_each_sample,
        }
    }
}

impl From<&probe_config::TrsyncCfg> for TrsyncTimeouts {
    fn from(c: &probe_config::TrsyncCfg) -> Self {
        Self {
            single_board: c.single_board_timeout_s,
            multi_board: c.multi_board_timeout_s,
        }
    }
}

impl From<&probe_config::HomingCfg> for HomingCfg {
    fn from(c: &probe_config::HomingCfg) -> Self {
        // Duration::from_secs_f64 panics on negative or non-finite input.
        let secs = if c.fallback_trigger_s.is_finite() {
            c.fallback_trigger_s.max(0.0)
        } else {
            0.0
        };
        Self {
            fallback_after: Duration::from_secs_f64(secs),
            retries: c.retries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn homing_seconds_become_duration() {
        let c = probe_config::HomingCfg {
            fallback_trigger_s: 0.25,
            retries: 2,
        };
        let h = HomingCfg::from(&c);
        assert_eq!(h.fallback_after, Duration::from_millis(250));
        assert_eq!(h.retries, 2);
    }

    #[test]
    fn non_finite_fallback_clamps_to_zero() {
        let c = probe_config::HomingCfg {
            fallback_trigger_s: f64::NAN,
            retries: 0,
        };
        assert_eq!(HomingCfg::from(&c).fallback_after, Duration::ZERO);
    }
}
