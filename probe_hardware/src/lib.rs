#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Simulated collaborators for the homing probe.
//!
//! Every type here implements one of the `probe_traits` seams and keeps a
//! shared log so tests can inspect what the probe did after the object has
//! been boxed and moved into it.
pub mod accel;
pub mod board;
pub mod dispatch;
pub mod error;
pub mod motion;

pub use accel::SimAccel;
pub use board::{SimBehavior, SimBoard, TrsyncStart};
pub use dispatch::{DispatchStats, DispatchStatsHandle, SimDispatch};
pub use motion::{SimKinematics, SimScript, SimStepper, SimToolhead};
