//! Hazard detection and effects
//!
//! Each frame the kart is tested against every hazard category in a fixed
//! order (bomb, boost, bumper, poison). A timed hazard only fires when the
//! matched instance differs from the last one that fired, so sitting inside a
//! trigger radius does not re-apply it. Bumpers push every frame they overlap.

use std::f32::consts::PI;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::state::{HazardContact, HazardKind, HazardState, KartEvent, KartState};
use crate::tuning::KartTuning;
use crate::{signed_angle_about, wrap_angle_positive};

/// Read-only hazard lookup by category
pub trait HazardProvider {
    /// Positions of every hazard of `kind`; empty when the category is absent
    fn hazards(&self, kind: HazardKind) -> &[Vec3];
}

impl<T: HazardProvider + ?Sized> HazardProvider for &T {
    fn hazards(&self, kind: HazardKind) -> &[Vec3] {
        (**self).hazards(kind)
    }
}

/// A track's hazards grouped by category
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HazardSet {
    pub bombs: Vec<Vec3>,
    pub boosts: Vec<Vec3>,
    pub bumpers: Vec<Vec3>,
    pub poison: Vec<Vec3>,
}

impl HazardSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hazard, returning its index within its category
    pub fn add(&mut self, kind: HazardKind, position: Vec3) -> usize {
        let list = self.list_mut(kind);
        list.push(position);
        list.len() - 1
    }

    fn list_mut(&mut self, kind: HazardKind) -> &mut Vec<Vec3> {
        match kind {
            HazardKind::Bomb => &mut self.bombs,
            HazardKind::Boost => &mut self.boosts,
            HazardKind::Bumper => &mut self.bumpers,
            HazardKind::Poison => &mut self.poison,
        }
    }

    pub fn len(&self) -> usize {
        self.bombs.len() + self.boosts.len() + self.bumpers.len() + self.poison.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HazardProvider for HazardSet {
    fn hazards(&self, kind: HazardKind) -> &[Vec3] {
        match kind {
            HazardKind::Bomb => &self.bombs,
            HazardKind::Boost => &self.boosts,
            HazardKind::Bumper => &self.bumpers,
            HazardKind::Poison => &self.poison,
        }
    }
}

/// No hazards at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHazards;

impl HazardProvider for NoHazards {
    fn hazards(&self, _kind: HazardKind) -> &[Vec3] {
        &[]
    }
}

/// First hazard (in list order) strictly within `radius` of `position`
pub fn find_hazard(position: Vec3, hazards: &[Vec3], radius: f32) -> Option<usize> {
    hazards
        .iter()
        .position(|h| position.distance(*h) < radius)
}

/// Result of a bumper push
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deflection {
    pub velocity: Vec3,
    /// Head-on hit; horizontal velocity was reversed
    pub reversed: bool,
}

/// Push a kart at `kart_pos` away from a bumper at `bumper_pos`.
///
/// The approach angle is measured about world up from the velocity to the
/// horizontal outward direction and wrapped into [0, 2π). Inside (120°, 240°)
/// the horizontal velocity is reversed; otherwise the velocity is bent outward
/// and rescaled to `max(retention * speed, min_speed)`. Returns `None` when the
/// kart sits exactly above the bumper or is at rest (no deflection direction).
pub fn deflect_from_bumper(
    velocity: Vec3,
    kart_pos: Vec3,
    bumper_pos: Vec3,
    tuning: &KartTuning,
) -> Option<Deflection> {
    let mut outward = kart_pos - bumper_pos;
    outward.y = 0.0;
    let outward = outward.try_normalize()?;

    let angle = wrap_angle_positive(signed_angle_about(velocity, outward, Vec3::Y));
    if angle > 2.0 * PI / 3.0 && angle < 4.0 * PI / 3.0 {
        return Some(Deflection {
            velocity: Vec3::new(-velocity.x, velocity.y, -velocity.z),
            reversed: true,
        });
    }

    let speed = velocity.length();
    let new_speed = (speed * tuning.bumper_speed_retention).max(tuning.bumper_min_speed);
    let dir = (velocity + outward * (speed * tuning.bumper_push)).try_normalize()?;
    Some(Deflection {
        velocity: dir * new_speed,
        reversed: false,
    })
}

/// Revert an expired effect to `Ok`; returns the state that ended
pub fn expire_effect(state: &mut KartState, now: f64) -> Option<HazardState> {
    let effect = state.effect?;
    if !effect.expired(now) {
        return None;
    }
    state.effect = None;
    log::debug!("{:?} wore off after {:.2}s", effect.state, now - effect.start_time);
    Some(effect.state)
}

/// Whether `contact` is a new hazard instance compared to the last one that fired
fn is_new_contact(state: &KartState, contact: HazardContact) -> bool {
    state.last_hazard != Some(contact)
}

/// Test every category and apply effects, appending to `events`
pub fn update_hazards(
    state: &mut KartState,
    hazards: &dyn HazardProvider,
    tuning: &KartTuning,
    now: f64,
    events: &mut Vec<KartEvent>,
) {
    for kind in HazardKind::CHECK_ORDER {
        let positions = hazards.hazards(kind);
        let Some(index) = find_hazard(state.pose.position, positions, tuning.hazard_radius) else {
            continue;
        };
        let contact = HazardContact { kind, index };

        match kind {
            HazardKind::Bumper => {
                if let Some(deflection) =
                    deflect_from_bumper(state.velocity, state.pose.position, positions[index], tuning)
                {
                    state.velocity = deflection.velocity;
                    events.push(KartEvent::BumperDeflect {
                        index,
                        reversed: deflection.reversed,
                    });
                }
                state.last_hazard = Some(contact);
            }
            HazardKind::Bomb | HazardKind::Boost | HazardKind::Poison => {
                if !is_new_contact(state, contact) {
                    continue;
                }
                match kind {
                    HazardKind::Bomb => state.velocity = tuning.bomb_launch,
                    HazardKind::Poison => state.velocity = Vec3::ZERO,
                    _ => {}
                }
                if let Some(effect_state) = kind.effect_state() {
                    state.start_effect(effect_state, now, tuning);
                }
                state.last_hazard = Some(contact);
                log::debug!("Hit {} #{} at t={:.2}s", kind.as_str(), index, now);
                events.push(KartEvent::HazardTriggered { kind, index });
            }
        }
    }
}
