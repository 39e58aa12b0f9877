//! Kart state and core simulation types
//!
//! All state the per-frame update mutates lives in `KartState`.

use std::str::FromStr;

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tuning::{EffectTuning, KartTuning};

/// Position + orientation of the kart
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Pose at `position` facing `target` with world up as reference.
    ///
    /// Falls back to identity rotation when the target is coincident or straight above/below.
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        let rotation = (target - position)
            .try_normalize()
            .and_then(|forward| {
                let right = Vec3::Y.cross(forward).try_normalize()?;
                let up = forward.cross(right);
                Some(Quat::from_mat3(&Mat3::from_cols(right, up, forward)))
            })
            .unwrap_or(Quat::IDENTITY);
        Self { position, rotation }
    }

    /// Local +X in world space
    #[inline]
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Local +Y in world space
    #[inline]
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Local +Z in world space
    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }
}

/// Hazard categories, in the order they are checked each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardKind {
    Bomb,
    Boost,
    Bumper,
    Poison,
}

impl HazardKind {
    /// Fixed per-frame check order; later categories overwrite earlier ones
    pub const CHECK_ORDER: [HazardKind; 4] = [
        HazardKind::Bomb,
        HazardKind::Boost,
        HazardKind::Bumper,
        HazardKind::Poison,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HazardKind::Bomb => "bomb",
            HazardKind::Boost => "boost",
            HazardKind::Bumper => "bumper",
            HazardKind::Poison => "poison",
        }
    }

    /// Timed state this hazard puts the kart in (bumpers only deflect)
    pub fn effect_state(&self) -> Option<HazardState> {
        match self {
            HazardKind::Bomb => Some(HazardState::Exploded),
            HazardKind::Boost => Some(HazardState::Fast),
            HazardKind::Poison => Some(HazardState::Slow),
            HazardKind::Bumper => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown hazard kind `{0}`")]
pub struct UnknownHazardKind(pub String);

impl FromStr for HazardKind {
    type Err = UnknownHazardKind;

    /// Case-insensitive, singular or plural
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bomb" | "bombs" => Ok(HazardKind::Bomb),
            "boost" | "boosts" => Ok(HazardKind::Boost),
            "bumper" | "bumpers" => Ok(HazardKind::Bumper),
            "poison" => Ok(HazardKind::Poison),
            _ => Err(UnknownHazardKind(s.to_string())),
        }
    }
}

/// Discrete kart state driven by hazards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HazardState {
    #[default]
    Ok,
    Slow,
    Exploded,
    Fast,
}

/// A timed hazard effect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffect {
    pub state: HazardState,
    /// Simulation time (seconds) the effect started
    pub start_time: f64,
    /// Seconds until the effect expires
    pub duration: f32,
    pub velocity_factor: f32,
}

impl ActiveEffect {
    pub fn new(state: HazardState, start_time: f64, tuning: EffectTuning) -> Self {
        Self {
            state,
            start_time,
            duration: tuning.duration,
            velocity_factor: tuning.velocity_factor,
        }
    }

    /// Strictly past its duration at `now`
    pub fn expired(&self, now: f64) -> bool {
        now - self.start_time > f64::from(self.duration)
    }
}

/// Last hazard instance that fired, for re-trigger suppression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardContact {
    pub kind: HazardKind,
    pub index: usize,
}

/// Discrete things that happened during a frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum KartEvent {
    /// A timed hazard effect started
    HazardTriggered { kind: HazardKind, index: usize },
    /// A bumper pushed the kart back (`reversed` for head-on hits)
    BumperDeflect { index: usize, reversed: bool },
    /// A timed effect ran out and the kart returned to `Ok`
    EffectExpired { state: HazardState },
    /// Checkpoint `index` was reached
    CheckpointHit { index: usize },
    /// The last checkpoint was reached at `time` seconds
    TrackComplete { time: f64 },
    /// Airborne too long; restored to the safe snapshot
    FallRecovered,
}

/// Complete per-kart simulation state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KartState {
    pub pose: Pose,
    /// World-space linear velocity (units per 60 Hz frame)
    pub velocity: Vec3,
    /// Signed angular velocity about local up (radians per frame)
    pub turn_rate: f32,
    /// Smoothed ground normal, always unit length
    pub filtered_up: Vec3,
    /// Seconds since last ground contact
    pub fall_time: f32,
    /// Safe snapshot from the last ground contact
    pub last_safe_position: Vec3,
    pub last_safe_up: Vec3,
    /// Active timed hazard effect, `None` while `Ok`
    pub effect: Option<ActiveEffect>,
    /// Last hazard that fired
    pub last_hazard: Option<HazardContact>,
    /// Smoothed engine volume in [0, 1]
    pub engine_volume: f32,
    /// Steering animation position in [0, 1]; only moves while controls apply
    pub steering: f32,
}

impl KartState {
    /// Fresh state at `pose`, `Ok`, at rest
    pub fn new(pose: Pose) -> Self {
        let up = pose.up();
        Self {
            pose,
            velocity: Vec3::ZERO,
            turn_rate: 0.0,
            filtered_up: up,
            fall_time: 0.0,
            last_safe_position: pose.position,
            last_safe_up: up,
            effect: None,
            last_hazard: None,
            engine_volume: 0.0,
            steering: 0.5,
        }
    }

    /// Current discrete state
    pub fn hazard_state(&self) -> HazardState {
        self.effect.map(|e| e.state).unwrap_or_default()
    }

    /// Forward thrust multiplier (1 when no effect is active)
    pub fn velocity_factor(&self) -> f32 {
        self.effect.map(|e| e.velocity_factor).unwrap_or(1.0)
    }

    /// Start (or replace) the effect for `state`
    pub fn start_effect(&mut self, state: HazardState, now: f64, tuning: &KartTuning) {
        let effect_tuning = match state {
            HazardState::Exploded => tuning.bomb,
            HazardState::Fast => tuning.boost,
            HazardState::Slow => tuning.poison,
            HazardState::Ok => {
                self.effect = None;
                return;
            }
        };
        self.effect = Some(ActiveEffect::new(state, now, effect_tuning));
    }

    /// Current speed magnitude
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }
}

impl Default for KartState {
    fn default() -> Self {
        Self::new(Pose::default())
    }
}
