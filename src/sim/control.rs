//! Player control and velocity integration

use glam::Quat;
use serde::{Deserialize, Serialize};

use super::state::KartState;
use crate::lerp;
use crate::tuning::KartTuning;

/// Raw input reading for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KartInput {
    /// Throttle (+1) / reverse (-1)
    pub accelerate: f32,
    /// Steer left (-1) / right (+1)
    pub horizontal: f32,
    /// Brake in [0, 1]
    pub brake: f32,
}

impl KartInput {
    pub fn new(accelerate: f32, horizontal: f32, brake: f32) -> Self {
        Self {
            accelerate,
            horizontal,
            brake,
        }
    }

    /// Split into one-sided axes, each clamped to [0, 1]
    pub fn axes(&self) -> ControlAxes {
        ControlAxes {
            forward: self.accelerate.clamp(0.0, 1.0),
            back: (-self.accelerate).clamp(0.0, 1.0),
            left: (-self.horizontal).clamp(0.0, 1.0),
            right: self.horizontal.clamp(0.0, 1.0),
            brake: self.brake.clamp(0.0, 1.0),
        }
    }

    /// Steering animation position in [0, 1] (0.5 = centered)
    pub fn steering(&self) -> f32 {
        (self.horizontal.clamp(-1.0, 1.0) + 1.0) * 0.5
    }
}

/// One-sided control axes, each in [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlAxes {
    pub forward: f32,
    pub back: f32,
    pub left: f32,
    pub right: f32,
    pub brake: f32,
}

/// Smooth the turn rate toward `target`, weighted by `weight`
#[inline]
fn filter_turn(turn_rate: f32, weight: f32, target: f32) -> f32 {
    weight * target + (1.0 - weight) * turn_rate
}

/// Steer, thrust and brake from player input
pub fn apply_controls(state: &mut KartState, input: &KartInput, tuning: &KartTuning, dt: f32) {
    let axes = input.axes();

    // Left pulls toward -max, then right toward +max
    let weight = tuning.turn_filter * axes.left;
    state.turn_rate = filter_turn(state.turn_rate, weight, -tuning.max_turn * dt);
    let weight = tuning.turn_filter * axes.right;
    state.turn_rate = filter_turn(state.turn_rate, weight, tuning.max_turn * dt);

    let up = state.pose.up();
    state.pose.rotation = (Quat::from_axis_angle(up, state.turn_rate) * state.pose.rotation).normalize();

    state.engine_volume = lerp(state.engine_volume, axes.forward, tuning.engine_volume_filter);
    state.steering = input.steering();

    let forward = state.pose.forward();
    state.velocity += forward * (axes.forward * tuning.forward_thrust * state.velocity_factor() * dt);
    state.velocity -= forward * (axes.back * tuning.reverse_thrust * dt);
    state.velocity *= 1.0 - axes.brake * tuning.brake * dt;
}

/// Per-frame drag on velocity and turn rate
pub fn apply_decay(state: &mut KartState, tuning: &KartTuning, dt: f32) {
    state.velocity *= 1.0 - tuning.velocity_decay * dt;
    state.turn_rate *= 1.0 - tuning.turn_decay * dt;
}

/// Advance position; velocity is in frame units
pub fn integrate_position(state: &mut KartState, tuning: &KartTuning, dt: f32) {
    state.pose.position += state.velocity * (dt * tuning.frame_units);
}

/// Signed velocity along the kart's forward axis
pub fn forward_speed(state: &KartState) -> f32 {
    state.velocity.dot(state.pose.forward())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::FRAME_DT;
    use crate::sim::state::{HazardState, Pose};
    use glam::Vec3;
    use proptest::prelude::*;

    #[test]
    fn test_full_throttle_from_rest() {
        let tuning = KartTuning::default();
        let mut state = KartState::default();
        let input = KartInput::new(1.0, 0.0, 0.0);

        apply_controls(&mut state, &input, &tuning, FRAME_DT);
        let thrust = 2.0 * FRAME_DT;
        assert!((state.velocity - Vec3::Z * thrust).length() < 1e-7);

        apply_decay(&mut state, &tuning, FRAME_DT);
        let expected = thrust * (1.0 - 2.0 * FRAME_DT);
        assert!((state.speed() - expected).abs() < 1e-7);
        assert!((forward_speed(&state) - expected).abs() < 1e-7);
    }

    #[test]
    fn test_reverse_ignores_velocity_factor() {
        let tuning = KartTuning::default();
        let mut state = KartState::default();
        state.start_effect(HazardState::Slow, 0.0, &tuning);
        apply_controls(&mut state, &KartInput::new(-1.0, 0.0, 0.0), &tuning, FRAME_DT);
        assert!((state.velocity.z + FRAME_DT).abs() < 1e-7);

        let mut state = KartState::default();
        state.start_effect(HazardState::Slow, 0.0, &tuning);
        apply_controls(&mut state, &KartInput::new(1.0, 0.0, 0.0), &tuning, FRAME_DT);
        assert!((state.velocity.z - 2.0 * 0.1 * FRAME_DT).abs() < 1e-7);
    }

    #[test]
    fn test_boost_scales_forward_thrust() {
        let tuning = KartTuning::default();
        let mut state = KartState::default();
        state.start_effect(HazardState::Fast, 0.0, &tuning);
        apply_controls(&mut state, &KartInput::new(1.0, 0.0, 0.0), &tuning, FRAME_DT);
        assert!((state.velocity.z - 2.0 * 1.6 * FRAME_DT).abs() < 1e-6);
    }

    #[test]
    fn test_brake_damps_without_reversing() {
        let tuning = KartTuning::default();
        let mut state = KartState::default();
        state.velocity = Vec3::new(0.0, 0.0, 1.0);
        for _ in 0..600 {
            apply_controls(&mut state, &KartInput::new(0.0, 0.0, 1.0), &tuning, FRAME_DT);
            assert!(state.velocity.z >= 0.0);
        }
        assert!(state.velocity.z < 1e-3);
    }

    #[test]
    fn test_turning_is_smoothed() {
        let tuning = KartTuning::default();
        let mut state = KartState::default();
        let input = KartInput::new(0.0, 1.0, 0.0);

        apply_controls(&mut state, &input, &tuning, FRAME_DT);
        let first = state.turn_rate;
        let target = tuning.max_turn * FRAME_DT;
        assert!((first - 0.1 * target).abs() < 1e-7);

        for _ in 0..200 {
            apply_controls(&mut state, &input, &tuning, FRAME_DT);
        }
        assert!(state.turn_rate > first);
        assert!(state.turn_rate <= target + 1e-7);
    }

    #[test]
    fn test_right_turn_swings_forward_toward_right() {
        let tuning = KartTuning::default();
        let mut state = KartState::new(Pose::default());
        for _ in 0..30 {
            apply_controls(&mut state, &KartInput::new(0.0, 1.0, 0.0), &tuning, FRAME_DT);
        }
        let forward = state.pose.forward();
        assert!(forward.x > 0.0);
        assert!((state.pose.up() - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_decay_and_integration() {
        let tuning = KartTuning::default();
        let mut state = KartState::default();
        state.velocity = Vec3::new(0.5, 0.0, 0.0);
        state.turn_rate = 0.2;

        apply_decay(&mut state, &tuning, 0.1);
        assert!((state.velocity.x - 0.5 * 0.8).abs() < 1e-6);
        assert!((state.turn_rate - 0.2 * 0.5).abs() < 1e-6);

        integrate_position(&mut state, &tuning, 0.1);
        assert!((state.pose.position.x - 0.4 * 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_engine_volume_follows_throttle() {
        let tuning = KartTuning::default();
        let mut state = KartState::default();
        apply_controls(&mut state, &KartInput::new(1.0, 0.0, 0.0), &tuning, FRAME_DT);
        assert!((state.engine_volume - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_steering_cue() {
        assert_eq!(KartInput::new(0.0, -1.0, 0.0).steering(), 0.0);
        assert_eq!(KartInput::new(0.0, 0.0, 0.0).steering(), 0.5);
        assert_eq!(KartInput::new(0.0, 1.0, 0.0).steering(), 1.0);

        let tuning = KartTuning::default();
        let mut state = KartState::default();
        assert_eq!(state.steering, 0.5);
        apply_controls(&mut state, &KartInput::new(0.0, 0.5, 0.0), &tuning, FRAME_DT);
        assert_eq!(state.steering, 0.75);
    }

    proptest! {
        #[test]
        fn prop_axes_are_one_sided_and_clamped(
            accelerate in -5.0f32..5.0,
            horizontal in -5.0f32..5.0,
            brake in -5.0f32..5.0,
        ) {
            let axes = KartInput::new(accelerate, horizontal, brake).axes();
            for v in [axes.forward, axes.back, axes.left, axes.right, axes.brake] {
                prop_assert!((0.0..=1.0).contains(&v));
            }
            prop_assert!(axes.forward == 0.0 || axes.back == 0.0);
            prop_assert!(axes.left == 0.0 || axes.right == 0.0);
        }
    }
}
