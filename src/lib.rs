//! Kart Sim - per-frame kart racing simulation
//!
//! Core modules:
//! - `sim`: Deterministic simulation (ground following, control, hazards, checkpoints)
//! - `feedback`: Visual/audio cues derived from each simulated frame
//! - `tuning`: Data-driven kart balance
//! - `best_times`: Finish-time leaderboard

pub mod best_times;
pub mod feedback;
pub mod sim;
pub mod tuning;

pub use best_times::BestTimes;
pub use tuning::{KartTuning, TuningError};

use glam::Vec3;

/// Fixed design constants
pub mod consts {
    /// Frames longer than this (seconds) are dropped whole (stall, tab switch)
    pub const MAX_FRAME_DT: f32 = 0.3;
    /// Velocity is stored in units per 60 Hz frame
    pub const FRAME_UNITS_PER_SECOND: f32 = 60.0;

    /// Downward ground probe length
    pub const GROUND_PROBE_LENGTH: f32 = 0.7;
    /// Kart origin hovers this far above the ground hit along filtered up
    pub const GROUND_OFFSET: f32 = 0.55;

    /// Hazard trigger radius
    pub const HAZARD_RADIUS: f32 = 2.0;
    /// Checkpoint trigger radius
    pub const CHECKPOINT_RADIUS: f32 = 20.0;
    /// Checkpoint marker hover height
    pub const CHECKPOINT_MARKER_HEIGHT: f32 = 10.0;

    /// Reference frame step for tests and the demo loop
    pub const FRAME_DT: f32 = 1.0 / 60.0;
}

/// Linear blend `a + (b - a) * t` (t is not clamped)
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Wrap an angle into [0, 2π)
#[inline]
pub fn wrap_angle_positive(angle: f32) -> f32 {
    use std::f32::consts::TAU;
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Signed angle from `from` to `to`, measured about `axis` (right-hand rule), in (-π, π].
///
/// Returns 0 when either vector is zero length.
pub fn signed_angle_about(from: Vec3, to: Vec3, axis: Vec3) -> f32 {
    let (Some(a), Some(b)) = (from.try_normalize(), to.try_normalize()) else {
        return 0.0;
    };
    let cos = a.dot(b).clamp(-1.0, 1.0);
    let sin = a.cross(b).dot(axis.normalize_or_zero());
    sin.atan2(cos)
}
