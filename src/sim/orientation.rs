//! Ground following
//!
//! Probes the terrain along the kart's current down axis, smooths the up
//! vector toward the ground normal, snaps the kart to its hover height and
//! tracks how long it has been airborne. The orientation is rebuilt from the
//! filtered up every frame rather than integrated.

use glam::{Mat3, Quat, Vec3};

use super::state::{KartState, Pose};
use super::terrain::{Ray, TerrainSampler};
use crate::tuning::KartTuning;

/// What the ground probe found this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundContact {
    /// Probe hit; kart snapped to the surface
    Grounded,
    /// Probe missed; kart is falling
    Airborne,
    /// Airborne past the fall limit; kart restored to the safe snapshot
    Recovered,
}

/// Blend `from` toward `to` by `t` and renormalize.
///
/// `t` is not clamped, so large steps overshoot. A degenerate blend keeps `from`.
pub fn blend_up(from: Vec3, to: Vec3, t: f32) -> Vec3 {
    from.lerp(to, t)
        .try_normalize()
        .or_else(|| from.try_normalize())
        .unwrap_or(Vec3::Y)
}

/// Rotation whose local axes are `(right, up, forward)` with `up` fixed.
///
/// `forward = right_hint x up`, `right = up x forward`. When the previous right
/// axis is parallel to `up`, the previous forward is used to recover a basis.
pub fn orientation_from_up(up: Vec3, right_hint: Vec3, forward_hint: Vec3) -> Quat {
    let forward = right_hint
        .cross(up)
        .try_normalize()
        .or_else(|| {
            let right = up.cross(forward_hint).try_normalize()?;
            right.cross(up).try_normalize()
        })
        .unwrap_or_else(|| up.any_orthonormal_vector());
    let right = up.cross(forward);
    Quat::from_mat3(&Mat3::from_cols(right, up, forward)).normalize()
}

/// Run the ground probe and update up, pose, velocity and fall state
pub fn follow_ground(
    state: &mut KartState,
    terrain: &dyn TerrainSampler,
    tuning: &KartTuning,
    dt: f32,
) -> GroundContact {
    let ray = Ray::new(state.pose.position, -state.pose.up(), tuning.probe_length);
    let hit = terrain.sample(&ray);

    let contact = if hit.hit {
        state.filtered_up = blend_up(state.filtered_up, hit.normal, tuning.up_grounded_filter * dt);
        state.pose.position = hit.point + state.filtered_up * tuning.ground_offset;

        // No velocity into (or away from) the surface
        state.velocity -= hit.normal * state.velocity.dot(hit.normal);

        state.fall_time = 0.0;
        state.last_safe_position = state.pose.position;
        state.last_safe_up = state.filtered_up;
        GroundContact::Grounded
    } else {
        state.filtered_up = blend_up(state.filtered_up, Vec3::Y, tuning.up_falling_filter * dt);
        state.velocity += Vec3::NEG_Y * dt;

        state.fall_time += dt;
        if state.fall_time > tuning.max_fall_time {
            state.pose.position = state.last_safe_position;
            state.filtered_up = state.last_safe_up;
            state.velocity = Vec3::ZERO;
            state.turn_rate = 0.0;
            log::debug!(
                "Fell for {:.2}s, recovered to {:?}",
                state.fall_time,
                state.last_safe_position
            );
            GroundContact::Recovered
        } else {
            GroundContact::Airborne
        }
    };

    let Pose { rotation, .. } = state.pose;
    state.pose.rotation = orientation_from_up(
        state.filtered_up,
        rotation * Vec3::X,
        rotation * Vec3::Z,
    );

    contact
}
