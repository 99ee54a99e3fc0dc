#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Accelerometer-triggered homing probe (hardware-agnostic).
//!
//! All hardware goes through the `probe_traits` seams: boards and their
//! trigger-sync primitives, the cross-board dispatch context, the
//! accelerometer, the toolhead and the activation scripts.
//!
//! ## Architecture
//!
//! - **Channels**: one `TrsyncChannel` per board (`trsync` module)
//! - **Dispatch**: `TriggerDispatcher` arms and disarms all channels together
//! - **Samples**: `BulkSampleRouter` buffers or intercepts the sensor stream
//! - **Session**: `HomingSession` state and trigger resolution (`session` module)
//! - **Endstop**: `AccelEndstop` drives one attempt end to end
//! - **Probe**: `ProbeController` sequences deploy/retract around attempts
//! - **Runner**: `run_sequence` for multi-probe sequences with retries
//!
//! ## Threading
//!
//! The sensor delivers batches from its own thread into the router; the
//! router runs the trigger criterion on that thread. Boards fulfill the
//! attempt's `Completion` from their own context. `home_wait` blocks the
//! calling thread on that completion and is the only suspension point.

pub mod builder;
pub mod config;
pub mod conversions;
pub mod dispatcher;
pub mod endstop;
pub mod error;
pub mod events;
pub mod hw_error;
pub mod mocks;
pub mod probe;
pub mod router;
pub mod runner;
pub mod session;
pub mod status;
pub mod trigger;
pub mod trsync;
pub mod util;

pub use builder::EndstopBuilder;
pub use config::{HomingCfg, ProbeCfg, TrsyncTimeouts};
pub use dispatcher::{DisarmReport, TriggerDispatcher};
pub use endstop::{AccelEndstop, HomingEndstop};
pub use events::{InitSequence, McuIdentify};
pub use probe::{ActivationScripts, HomingMove, ProbeController, ProbeState};
pub use router::{BulkSampleRouter, RouterMode};
pub use runner::{AttemptReport, ProbePlan, run_sequence};
pub use session::{HomingSession, SessionState, TriggerHandle};
pub use status::HomingOutcome;
pub use trigger::{ElapsedFallback, TriggerCriterion};
pub use trsync::TrsyncChannel;
