//! Classified result of one homing attempt.

/// What `home_wait`'s return value means to the motion planner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HomingOutcome {
    /// Triggered; `at` is the trigger time reported to the planner.
    Triggered { at: f64 },
    /// The move ran to completion without a trigger.
    NoTrigger,
    /// A board lost contact with the host during the attempt.
    CommsFailure,
}

impl HomingOutcome {
    pub fn from_wait_result(value: f64) -> Self {
        if value < 0.0 {
            HomingOutcome::CommsFailure
        } else if value > 0.0 {
            HomingOutcome::Triggered { at: value }
        } else {
            HomingOutcome::NoTrigger
        }
    }

    pub fn is_triggered(&self) -> bool {
        matches!(self, HomingOutcome::Triggered { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            HomingOutcome::Triggered { .. } => "triggered",
            HomingOutcome::NoTrigger => "no_trigger",
            HomingOutcome::CommsFailure => "comms_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_of_wait_result_classifies() {
        assert_eq!(HomingOutcome::from_wait_result(-1.0), HomingOutcome::CommsFailure);
        assert_eq!(HomingOutcome::from_wait_result(0.0), HomingOutcome::NoTrigger);
        assert_eq!(
            HomingOutcome::from_wait_result(12.0),
            HomingOutcome::Triggered { at: 12.0 }
        );
        assert_eq!(HomingOutcome::from_wait_result(f64::NAN), HomingOutcome::NoTrigger);
    }
}
