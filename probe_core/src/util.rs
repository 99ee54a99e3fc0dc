//! Small helpers shared by the dispatcher and the session.

use probe_traits::Board;

/// Stepper names in the same rail group share this prefix.
pub const STEPPER_PREFIX: &str = "stepper_";

/// Characters compared when looking for rail siblings (`stepper_z` for `stepper_z1`).
pub const RAIL_GROUP_LEN: usize = 9;

/// Rail-group prefix of a stepper name, or `None` when the name is not a
/// `stepper_*` name and therefore belongs to no shared rail.
#[inline]
pub fn rail_group(name: &str) -> Option<&str> {
    if !name.starts_with(STEPPER_PREFIX) {
        return None;
    }
    let end = name
        .char_indices()
        .nth(RAIL_GROUP_LEN)
        .map_or(name.len(), |(i, _)| i);
    Some(&name[..end])
}

/// Board ticks covered by `rest_time` starting at `print_time`.
///
/// Both ends go through the board clock conversion so rounding matches what
/// the board will see; a clock that reads backwards yields zero.
#[inline]
pub fn rest_ticks(board: &dyn Board, print_time: f64, rest_time: f64) -> u64 {
    let start = board.print_time_to_clock(print_time);
    board
        .print_time_to_clock(print_time + rest_time)
        .saturating_sub(start)
}

/// Report offset for channel `index` of `channels`: evenly spaced phases in `[0, 1)`.
#[inline]
pub fn report_offset(index: usize, channels: usize) -> f64 {
    if channels == 0 {
        return 0.0;
    }
    index as f64 / channels as f64
}
