//! Collaborator seams for the homing probe.
//!
//! Everything the probe touches but does not own (controller boards, their
//! trigger-sync primitives, the cross-board dispatch context, the accelerometer,
//! the toolhead and the activation scripts) is reached through these traits.
pub mod clock;
pub mod completion;

pub use clock::{Clock, MonotonicClock};
pub use completion::Completion;

use std::sync::Arc;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Terminal reason reported by a trigger-sync channel when it is stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerReason {
    /// The board saw its own trigger condition.
    EndstopHit,
    /// The channel was stopped by the host (explicit request or window end).
    HostRequest,
    /// The board lost contact with the host before the expiry.
    CommsTimeout,
}

impl TriggerReason {
    /// Whether a completion fulfilled with this reason carries the failure flag.
    pub fn is_failure(self) -> bool {
        matches!(self, TriggerReason::CommsTimeout)
    }
}

/// One independently clocked controller board.
pub trait Board: Send + Sync {
    fn name(&self) -> &str;
    /// Convert a print time (seconds) into this board's clock ticks.
    fn print_time_to_clock(&self, print_time: f64) -> u64;
    /// True when the host only writes a command file (dry run, nothing reports back).
    fn is_fileoutput(&self) -> bool;
    /// Allocate the board's trigger-sync primitive.
    fn create_trsync(&self) -> Box<dyn Trsync>;
}

/// Per-board trigger-sync primitive.
pub trait Trsync: Send {
    /// Arm the countdown. The channel fulfills `completion` when it reaches a
    /// terminal state on its own.
    fn start(
        &mut self,
        print_time: f64,
        report_offset: f64,
        completion: Completion,
        expire_timeout: f64,
    );
    /// Tell the board when the homing move is expected to end.
    fn set_home_end_time(&mut self, home_end_time: f64);
    /// Stop the channel and return exactly one terminal reason.
    fn stop(&mut self) -> TriggerReason;
}

/// Cross-board dispatch context relaying a trigger on one board to the others.
pub trait TriggerDispatch: Send {
    fn add_board(&mut self, board: &str);
    /// Begin relaying; boards stopped by the relay report `host_reason`.
    fn start(&mut self, host_reason: TriggerReason);
    fn stop(&mut self);
}

pub trait Stepper: Send + Sync {
    fn name(&self) -> &str;
    fn board(&self) -> Arc<dyn Board>;
    fn is_active_axis(&self, axis: char) -> bool;
}

pub trait Kinematics {
    fn steppers(&self) -> Vec<Arc<dyn Stepper>>;
}

/// Opaque batch of raw sensor samples as delivered by the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBatch {
    pub sequence: u64,
    pub data: Vec<u8>,
}

/// Receiver of sample batches, fed from the sensor's acquisition context.
pub trait SampleSink: Send + Sync {
    fn handle_batch(&self, batch: SampleBatch);
}

pub trait AccelSensor: Send {
    fn name(&self) -> &str;
    /// Route all future batches into `sink`.
    fn attach(&mut self, sink: Arc<dyn SampleSink>);
    fn start_measurements(&mut self) -> Result<(), BoxError>;
    fn finish_measurements(&mut self) -> Result<(), BoxError>;
}

pub trait Toolhead: Send + Sync {
    /// Commanded position `[x, y, z, e]`.
    fn get_position(&self) -> [f64; 4];
}

/// Script that deploys or retracts the probing mechanism. Must not move the toolhead.
pub trait ActivationScript: Send {
    fn run(&mut self) -> Result<(), BoxError>;
}
