//! Maps `Box<dyn Error>` from trait boundaries to typed `ProbeError`.
//!
//! The traits in `probe_traits` use `Box<dyn Error + Send + Sync>` so any
//! backend can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `probe_hardware::error::HwError`.

use crate::error::ProbeError;

/// Map a trait-boundary error to a typed `ProbeError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> ProbeError {
    #[cfg(feature = "hardware-errors")]
    {
        use probe_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout => ProbeError::Timeout,
                HwError::Busy(_) => ProbeError::State(hw.to_string()),
                other => ProbeError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        ProbeError::Timeout
    } else {
        ProbeError::Hardware(s)
    }
}

/// Wrap a boxed trait error into an `eyre::Report` carrying a typed `ProbeError`.
pub fn report(e: probe_traits::BoxError) -> eyre::Report {
    eyre::Report::new(map_hw_error(e.as_ref()))
}
