//! Runtime configuration used by the probe engine.
//!
//! These are separate from the TOML-deserialized config in `probe_config`;
//! see `conversions` for the mapping.

use std::time::Duration;

/// Mechanism settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeCfg {
    /// Reported by `get_position_endstop`.
    pub z_offset: f64,
    /// Retract after every attempt (multi-probe begin/end become no-ops).
    pub deactivate_on_each_sample: bool,
}

impl Default for ProbeCfg {
    fn default() -> Self {
        Self {
            z_offset: 0.0,
            deactivate_on_each_sample: true,
        }
    }
}

/// Channel expiry timeouts, in seconds of print time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrsyncTimeouts {
    /// One board: no cross-board skew to budget for.
    pub single_board: f64,
    /// Several boards must agree.
    pub multi_board: f64,
}

impl TrsyncTimeouts {
    /// Expiry to use for `channels` armed channels.
    #[inline]
    pub fn for_channels(&self, channels: usize) -> f64 {
        if channels == 1 {
            self.single_board
        } else {
            self.multi_board
        }
    }
}

impl Default for TrsyncTimeouts {
    fn default() -> Self {
        Self {
            single_board: 0.025,
            multi_board: 0.250,
        }
    }
}

/// Host-side trigger evaluation and sequencing.
#[derive(Debug, Clone, PartialEq)]
pub struct HomingCfg {
    /// Elapsed wall time after which the fallback criterion forces a trigger.
    pub fallback_after: Duration,
    /// Re-runs of an attempt after a comms timeout.
    pub retries: u32,
}

impl Default for HomingCfg {
    fn default() -> Self {
        Self {
            fallback_after: Duration::from_secs(8),
            retries: 0,
        }
    }
}
