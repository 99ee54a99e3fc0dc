//! Start-up phases with explicit listener lists.
//!
//! Components that need to act once the boards have identified themselves
//! register a listener on an `InitSequence`; the host runs the sequence
//! after the kinematics are known.

use crate::error::Result;
use probe_traits::{Kinematics, Stepper};
use std::sync::Arc;

/// Payload of the board-identify phase.
pub struct McuIdentify {
    pub steppers: Vec<Arc<dyn Stepper>>,
}

impl McuIdentify {
    pub fn from_kinematics(kin: &dyn Kinematics) -> Self {
        Self {
            steppers: kin.steppers(),
        }
    }
}

pub type IdentifyListener<'a> = Box<dyn FnMut(&McuIdentify) -> Result<()> + 'a>;

#[derive(Default)]
pub struct InitSequence<'a> {
    identify: Vec<IdentifyListener<'a>>,
}

impl<'a> InitSequence<'a> {
    pub fn new() -> Self {
        Self {
            identify: Vec::new(),
        }
    }

    pub fn on_identify(&mut self, listener: impl FnMut(&McuIdentify) -> Result<()> + 'a) {
        self.identify.push(Box::new(listener));
    }

    pub fn identify_listeners(&self) -> usize {
        self.identify.len()
    }

    /// Run identify listeners in registration order, stopping at the first error.
    pub fn run_identify(self, kin: &dyn Kinematics) -> Result<()> {
        let event = McuIdentify::from_kinematics(kin);
        tracing::debug!(
            listeners = self.identify.len(),
            steppers = event.steppers.len(),
            "running identify phase"
        );
        for mut listener in self.identify {
            listener(&event)?;
        }
        Ok(())
    }
}
