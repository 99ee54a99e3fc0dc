//! Test and helper mocks for probe_core

use probe_traits::{ActivationScript, BoxError, Toolhead};

/// Activation script that does nothing; stands in for an empty G-code template.
#[derive(Debug, Default)]
pub struct NoopScript;

impl ActivationScript for NoopScript {
    fn run(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Toolhead parked at a fixed position.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedToolhead(pub [f64; 4]);

impl Toolhead for FixedToolhead {
    fn get_position(&self) -> [f64; 4] {
        self.0
    }
}
