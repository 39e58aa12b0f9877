//! Kart tuning and balance
//!
//! Every numeric constant the per-frame simulation uses lives here so a track
//! can ship its own balance file. Missing fields fall back to the defaults.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Errors raised while loading or validating tuning
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse tuning JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("tuning field `{field}` must be finite and non-negative (got {value})")]
    OutOfRange { field: &'static str, value: f32 },
}

/// Per-hazard effect parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectTuning {
    /// Seconds the effect stays active
    pub duration: f32,
    /// Forward thrust multiplier while active
    pub velocity_factor: f32,
}

/// Kart balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KartTuning {
    // === Ground following ===
    /// Up-vector blend strength per second while grounded
    pub up_grounded_filter: f32,
    /// Up-vector blend strength per second while airborne
    pub up_falling_filter: f32,
    /// Downward probe length
    pub probe_length: f32,
    /// Hover height above the ground hit
    pub ground_offset: f32,
    /// Airborne seconds before snapping back to the safe snapshot
    pub max_fall_time: f32,

    // === Control ===
    /// Per-frame turn filter weight at full stick
    pub turn_filter: f32,
    /// Turn rate target magnitude (radians per second)
    pub max_turn: f32,
    /// Forward thrust per second
    pub forward_thrust: f32,
    /// Reverse thrust per second (not scaled by hazard effects)
    pub reverse_thrust: f32,
    /// Braking damping per second
    pub brake: f32,
    /// Linear velocity decay per second
    pub velocity_decay: f32,
    /// Turn rate decay per second
    pub turn_decay: f32,
    /// Engine volume smoothing weight per frame
    pub engine_volume_filter: f32,

    // === Frame ===
    /// Seconds to frame units
    pub frame_units: f32,
    /// Frames above this delta are dropped
    pub max_frame_dt: f32,

    // === Hazards ===
    /// Trigger radius for every hazard category
    pub hazard_radius: f32,
    /// Velocity a bomb sets on contact
    pub bomb_launch: Vec3,
    pub bomb: EffectTuning,
    pub boost: EffectTuning,
    pub poison: EffectTuning,
    /// Speed floor after a bumper redirect
    pub bumper_min_speed: f32,
    /// Fraction of speed kept after a bumper redirect
    pub bumper_speed_retention: f32,
    /// Outward push, in multiples of the current speed
    pub bumper_push: f32,

    // === Track ===
    /// Checkpoint trigger radius
    pub checkpoint_radius: f32,
}

impl Default for KartTuning {
    fn default() -> Self {
        Self {
            up_grounded_filter: 7.0,
            up_falling_filter: 1.0,
            probe_length: GROUND_PROBE_LENGTH,
            ground_offset: GROUND_OFFSET,
            max_fall_time: 2.0,

            turn_filter: 0.1,
            max_turn: std::f32::consts::TAU / 3.0,
            forward_thrust: 2.0,
            reverse_thrust: 1.0,
            brake: 3.0,
            velocity_decay: 2.0,
            turn_decay: 5.0,
            engine_volume_filter: 0.1,

            frame_units: FRAME_UNITS_PER_SECOND,
            max_frame_dt: MAX_FRAME_DT,

            hazard_radius: HAZARD_RADIUS,
            bomb_launch: Vec3::new(0.0, 1.2, 0.0),
            bomb: EffectTuning {
                duration: 2.0,
                velocity_factor: 0.5,
            },
            boost: EffectTuning {
                duration: 1.0,
                velocity_factor: 1.6,
            },
            poison: EffectTuning {
                duration: 3.0,
                velocity_factor: 0.1,
            },
            bumper_min_speed: 0.3,
            bumper_speed_retention: 0.8,
            bumper_push: 2.0,

            checkpoint_radius: CHECKPOINT_RADIUS,
        }
    }
}

impl KartTuning {
    /// Parse tuning from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load tuning from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded kart tuning from {}", path.display());
        Ok(tuning)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject non-finite or negative scalars
    pub fn validate(&self) -> Result<(), TuningError> {
        let fields = [
            ("up_grounded_filter", self.up_grounded_filter),
            ("up_falling_filter", self.up_falling_filter),
            ("probe_length", self.probe_length),
            ("ground_offset", self.ground_offset),
            ("max_fall_time", self.max_fall_time),
            ("turn_filter", self.turn_filter),
            ("max_turn", self.max_turn),
            ("forward_thrust", self.forward_thrust),
            ("reverse_thrust", self.reverse_thrust),
            ("brake", self.brake),
            ("velocity_decay", self.velocity_decay),
            ("turn_decay", self.turn_decay),
            ("engine_volume_filter", self.engine_volume_filter),
            ("frame_units", self.frame_units),
            ("max_frame_dt", self.max_frame_dt),
            ("hazard_radius", self.hazard_radius),
            ("bomb.duration", self.bomb.duration),
            ("bomb.velocity_factor", self.bomb.velocity_factor),
            ("boost.duration", self.boost.duration),
            ("boost.velocity_factor", self.boost.velocity_factor),
            ("poison.duration", self.poison.duration),
            ("poison.velocity_factor", self.poison.velocity_factor),
            ("bumper_min_speed", self.bumper_min_speed),
            ("bumper_speed_retention", self.bumper_speed_retention),
            ("bumper_push", self.bumper_push),
            ("checkpoint_radius", self.checkpoint_radius),
        ];

        for (field, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(TuningError::OutOfRange { field, value });
            }
        }

        if !self.bomb_launch.is_finite() {
            return Err(TuningError::OutOfRange {
                field: "bomb_launch",
                value: self.bomb_launch.length(),
            });
        }

        Ok(())
    }
}
