//! Simulated toolhead, steppers and activation scripts.

use crate::error::HwError;
use probe_traits::{ActivationScript, Board, BoxError, Kinematics, Stepper, Toolhead};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
pub struct SimToolhead {
    position: Mutex<[f64; 4]>,
}

impl SimToolhead {
    pub fn new(position: [f64; 4]) -> Self {
        Self {
            position: Mutex::new(position),
        }
    }

    pub fn set_position(&self, position: [f64; 4]) {
        *self.position.lock().unwrap_or_else(PoisonError::into_inner) = position;
    }

    /// Move a single axis (0 = x, 1 = y, 2 = z, 3 = e).
    pub fn set_axis(&self, axis: usize, value: f64) {
        let mut pos = self.position.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = pos.get_mut(axis) {
            *slot = value;
        }
    }
}

impl Toolhead for SimToolhead {
    fn get_position(&self) -> [f64; 4] {
        *self.position.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Activation script backed by a G-code snippet.
///
/// Only linear moves are interpreted: a `G0`/`G1` line with X, Y or Z words
/// moves the simulated toolhead. Every other line is accepted and ignored.
pub struct SimScript {
    name: String,
    lines: Vec<String>,
    toolhead: Arc<SimToolhead>,
    runs: Arc<AtomicUsize>,
}

impl SimScript {
    pub fn new(name: impl Into<String>, text: &str, toolhead: Arc<SimToolhead>) -> Self {
        Self {
            name: name.into(),
            lines: text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with(';'))
                .map(str::to_ascii_uppercase)
                .collect(),
            toolhead,
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared run counter, readable after the script is boxed.
    pub fn run_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.runs)
    }

    fn apply_move(&self, line: &str) -> Result<(), HwError> {
        for word in line.split_whitespace().skip(1) {
            let mut chars = word.chars();
            let axis = match chars.next() {
                Some('X') => 0,
                Some('Y') => 1,
                Some('Z') => 2,
                _ => continue,
            };
            let value = chars.as_str();
            let v: f64 = value.parse().map_err(|_| {
                HwError::Script(format!("{}: bad move parameter '{word}'", self.name))
            })?;
            self.toolhead.set_axis(axis, v);
        }
        Ok(())
    }
}

impl ActivationScript for SimScript {
    fn run(&mut self) -> Result<(), BoxError> {
        self.runs.fetch_add(1, Ordering::Relaxed);
        for line in &self.lines {
            let cmd = line.split_whitespace().next().unwrap_or_default();
            if matches!(cmd, "G0" | "G1") {
                self.apply_move(line)?;
            }
        }
        tracing::debug!(script = %self.name, lines = self.lines.len(), "script ran");
        Ok(())
    }
}

pub struct SimStepper {
    name: String,
    board: Arc<dyn Board>,
    axes: Vec<char>,
}

impl SimStepper {
    pub fn new(name: impl Into<String>, board: Arc<dyn Board>, axes: &[char]) -> Self {
        Self {
            name: name.into(),
            board,
            axes: axes.iter().map(char::to_ascii_lowercase).collect(),
        }
    }
}

impl Stepper for SimStepper {
    fn name(&self) -> &str {
        &self.name
    }

    fn board(&self) -> Arc<dyn Board> {
        Arc::clone(&self.board)
    }

    fn is_active_axis(&self, axis: char) -> bool {
        self.axes.contains(&axis.to_ascii_lowercase())
    }
}

#[derive(Default)]
pub struct SimKinematics {
    steppers: Vec<Arc<dyn Stepper>>,
}

impl SimKinematics {
    pub fn new(steppers: Vec<Arc<dyn Stepper>>) -> Self {
        Self { steppers }
    }
}

impl Kinematics for SimKinematics {
    fn steppers(&self) -> Vec<Arc<dyn Stepper>> {
        self.steppers.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_non_moves_leave_toolhead_alone() {
        let th = Arc::new(SimToolhead::new([1.0, 2.0, 3.0, 0.0]));
        let mut s = SimScript::new("activate_gcode", "; deploy\nM280 P0 S10\nG4 P200", th.clone());
        s.run().unwrap();
        assert_eq!(th.get_position(), [1.0, 2.0, 3.0, 0.0]);
        assert_eq!(s.run_counter().load(Ordering::Relaxed), 1);
    }

    #[test]
    fn linear_move_changes_position() {
        let th = Arc::new(SimToolhead::default());
        let mut s = SimScript::new("deactivate_gcode", "g1 z5 f600", th.clone());
        s.run().unwrap();
        assert_eq!(th.get_position()[2], 5.0);
    }

    #[test]
    fn malformed_move_is_an_error() {
        let th = Arc::new(SimToolhead::default());
        let mut s = SimScript::new("activate_gcode", "G1 Zabc", th);
        assert!(s.run().is_err());
    }
}
