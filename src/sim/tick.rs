//! Per-frame kart update
//!
//! Order each frame:
//! drop oversize frames -> expire effects -> checkpoints -> ground follow ->
//! hazards -> controls (skipped while exploded) -> decay -> integrate.

use glam::Vec3;

use super::checkpoint::{CheckpointTracker, RaceClock};
use super::control::{KartInput, apply_controls, apply_decay, integrate_position};
use super::hazard::{HazardProvider, expire_effect, update_hazards};
use super::orientation::{GroundContact, follow_ground};
use super::state::{HazardState, KartEvent, KartState, Pose};
use super::terrain::TerrainSampler;
use crate::feedback::{FeedbackSink, FrameFeedback};
use crate::tuning::KartTuning;

/// Source of player input, read once per frame
pub trait InputSource {
    fn read(&self) -> KartInput;
}

impl InputSource for KartInput {
    fn read(&self) -> KartInput {
        *self
    }
}

/// Read-only collaborators the kart queries each frame
#[derive(Clone, Copy)]
pub struct World<'a> {
    pub input: &'a dyn InputSource,
    pub terrain: &'a dyn TerrainSampler,
    pub hazards: &'a dyn HazardProvider,
}

impl<'a> World<'a> {
    pub fn new(
        input: &'a dyn InputSource,
        terrain: &'a dyn TerrainSampler,
        hazards: &'a dyn HazardProvider,
    ) -> Self {
        Self {
            input,
            terrain,
            hazards,
        }
    }
}

/// What a simulated frame produced
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub pose: Pose,
    pub velocity: Vec3,
    pub speed: f32,
    pub state: HazardState,
    pub contact: GroundContact,
    /// Input as read this frame
    pub input: KartInput,
    /// Steering cue, held while controls are skipped
    pub steering: f32,
    pub events: Vec<KartEvent>,
}

/// One kart's simulation
#[derive(Debug, Clone)]
pub struct KartSimulation {
    name: String,
    pub state: KartState,
    pub tracker: CheckpointTracker,
    pub clock: RaceClock,
    pub tuning: KartTuning,
    /// Total simulated seconds; timestamps hazard effects
    sim_time: f64,
    initial_position: Vec3,
    initial_look_at: Vec3,
}

impl KartSimulation {
    /// Kart at the origin facing +Z with no checkpoints
    pub fn new(name: impl Into<String>, tuning: KartTuning) -> Self {
        Self {
            name: name.into(),
            state: KartState::default(),
            tracker: CheckpointTracker::default(),
            clock: RaceClock::default(),
            tuning,
            sim_time: 0.0,
            initial_position: Vec3::ZERO,
            initial_look_at: Vec3::Z,
        }
    }

    /// Set checkpoints and start pose, then reset to the start
    pub fn initialize_track(&mut self, checkpoints: Vec<Vec3>, start: Vec3, look_at: Vec3) {
        self.tracker = CheckpointTracker::new(checkpoints);
        self.initial_position = start;
        self.initial_look_at = look_at;
        self.reset();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn hazard_state(&self) -> HazardState {
        self.state.hazard_state()
    }

    /// Race progress, 0-100
    pub fn percent_complete(&self) -> u32 {
        self.tracker.percent_complete()
    }

    /// Back to the start line: checkpoints, motion, effects and clock cleared
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.clock.reset();
        self.state = KartState::new(Pose::looking_at(self.initial_position, self.initial_look_at));
        log::info!("{} reset to {:?}", self.name, self.initial_position);
    }

    /// Advance one frame of `dt` seconds.
    ///
    /// Returns `None` when the frame is dropped (negative, non-finite or over
    /// the stall limit); nothing changes on a dropped frame.
    pub fn update(&mut self, dt: f32, world: &World<'_>) -> Option<FrameOutput> {
        if !(0.0..=self.tuning.max_frame_dt).contains(&dt) {
            log::trace!("{}: dropped frame dt={}", self.name, dt);
            return None;
        }

        let tuning = &self.tuning;
        let state = &mut self.state;
        let mut events = Vec::new();

        self.sim_time += f64::from(dt);
        self.clock.advance(dt);
        let now = self.sim_time;

        if let Some(ended) = expire_effect(state, now) {
            events.push(KartEvent::EffectExpired { state: ended });
        }

        if !self.tracker.is_complete() {
            if let Some(index) = self.tracker.update(state.pose.position, tuning.checkpoint_radius) {
                events.push(KartEvent::CheckpointHit { index });
                if self.tracker.is_complete() {
                    let time = self.clock.finish();
                    log::info!("{} finished in {:.3}s", self.name, time);
                    events.push(KartEvent::TrackComplete { time });
                }
            }
        }

        let contact = follow_ground(state, world.terrain, tuning, dt);
        if contact == GroundContact::Recovered {
            events.push(KartEvent::FallRecovered);
        }

        update_hazards(state, world.hazards, tuning, now, &mut events);

        let input = world.input.read();
        if state.hazard_state() != HazardState::Exploded {
            apply_controls(state, &input, tuning, dt);
        }

        apply_decay(state, tuning, dt);
        integrate_position(state, tuning, dt);

        Some(FrameOutput {
            pose: state.pose,
            velocity: state.velocity,
            speed: state.speed(),
            state: state.hazard_state(),
            contact,
            input,
            steering: state.steering,
            events,
        })
    }

    /// Advance one frame and hand the derived cues to `sink`
    pub fn update_and_emit(
        &mut self,
        dt: f32,
        world: &World<'_>,
        sink: &mut dyn FeedbackSink,
    ) -> Option<FrameOutput> {
        let output = self.update(dt, world)?;
        sink.on_frame(&FrameFeedback::from_output(&output, self.state.engine_volume));
        Some(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::FRAME_DT;
    use crate::sim::hazard::{HazardSet, NoHazards};
    use crate::sim::state::HazardKind;
    use crate::sim::terrain::{FlatGround, Ray, TerrainHit};

    struct Void;

    impl TerrainSampler for Void {
        fn sample(&self, _ray: &Ray) -> TerrainHit {
            TerrainHit::miss()
        }
    }

    /// Ground only inside |x| < half_width
    struct Strip {
        half_width: f32,
    }

    impl TerrainSampler for Strip {
        fn sample(&self, ray: &Ray) -> TerrainHit {
            let hit = FlatGround::new(0.0).sample(ray);
            if hit.hit && hit.point.x.abs() < self.half_width {
                hit
            } else {
                TerrainHit::miss()
            }
        }
    }

    fn kart_on_ground() -> KartSimulation {
        let mut sim = KartSimulation::new("test", KartTuning::default());
        sim.initialize_track(Vec::new(), Vec3::new(0.0, 0.55, 0.0), Vec3::new(0.0, 0.55, 10.0));
        sim
    }

    #[test]
    fn test_throttle_from_rest_one_frame() {
        let mut sim = kart_on_ground();
        let input = KartInput::new(1.0, 0.0, 0.0);
        let ground = FlatGround::new(0.0);
        let world = World::new(&input, &ground, &NoHazards);

        let out = sim.update(FRAME_DT, &world).unwrap();

        let expected = 2.0 * FRAME_DT * (1.0 - 2.0 * FRAME_DT);
        assert!((out.speed - expected).abs() < 1e-7);
        assert!((out.velocity.normalize() - Vec3::Z).length() < 1e-5);
        assert_eq!(out.contact, GroundContact::Grounded);
        assert!((out.pose.position.z - expected * FRAME_DT * 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_oversize_frame_is_dropped() {
        let mut sim = kart_on_ground();
        let input = KartInput::new(1.0, 1.0, 0.0);
        let ground = FlatGround::new(0.0);
        let world = World::new(&input, &ground, &NoHazards);
        let before = sim.state.clone();

        assert!(sim.update(0.31, &world).is_none());
        assert!(sim.update(f32::NAN, &world).is_none());
        assert!(sim.update(-0.01, &world).is_none());
        assert_eq!(sim.state.pose, before.pose);
        assert_eq!(sim.state.velocity, before.velocity);
        assert_eq!(sim.sim_time(), 0.0);

        assert!(sim.update(0.3, &world).is_some());
    }

    #[test]
    fn test_boost_expires_after_duration() {
        let mut sim = kart_on_ground();
        let input = KartInput::default();
        let ground = FlatGround::new(0.0);
        let mut hazards = HazardSet::new();
        hazards.add(HazardKind::Boost, Vec3::new(0.0, 0.0, 0.0));
        let empty = HazardSet::new();

        let out = sim.update(FRAME_DT, &World::new(&input, &ground, &hazards)).unwrap();
        assert_eq!(out.state, HazardState::Fast);
        assert_eq!(sim.state.velocity_factor(), 1.6);

        // 60 frames is exactly one second, still within the effect
        let world = World::new(&input, &ground, &empty);
        for _ in 0..59 {
            let out = sim.update(FRAME_DT, &world).unwrap();
            assert_eq!(out.state, HazardState::Fast);
        }

        let mut expired = false;
        for _ in 0..3 {
            let out = sim.update(FRAME_DT, &world).unwrap();
            if out.events.contains(&KartEvent::EffectExpired { state: HazardState::Fast }) {
                expired = true;
                break;
            }
        }
        assert!(expired);
        assert_eq!(sim.hazard_state(), HazardState::Ok);
        assert_eq!(sim.state.velocity_factor(), 1.0);
    }

    #[test]
    fn test_exploded_kart_ignores_input() {
        let mut sim = kart_on_ground();
        let input = KartInput::new(1.0, 1.0, 0.0);
        let ground = FlatGround::new(0.0);
        let mut hazards = HazardSet::new();
        hazards.add(HazardKind::Bomb, Vec3::new(0.0, 0.0, 0.5));

        let out = sim.update(FRAME_DT, &World::new(&input, &ground, &hazards)).unwrap();
        assert_eq!(out.state, HazardState::Exploded);
        // Launch velocity only, decayed once
        let expected = Vec3::new(0.0, 1.2, 0.0) * (1.0 - 2.0 * FRAME_DT);
        assert!((out.velocity - expected).length() < 1e-6);
        assert_eq!(sim.state.turn_rate, 0.0);
        assert_eq!(sim.state.engine_volume, 0.0);
    }

    #[test]
    fn test_bomb_not_reapplied_while_inside_radius() {
        let mut sim = kart_on_ground();
        let input = KartInput::default();
        let ground = FlatGround::new(0.0);
        let mut hazards = HazardSet::new();
        hazards.add(HazardKind::Bomb, Vec3::new(0.0, 0.0, 0.0));
        let world = World::new(&input, &ground, &hazards);

        let first = sim.update(FRAME_DT, &world).unwrap();
        assert!(matches!(first.events[..], [KartEvent::HazardTriggered { kind: HazardKind::Bomb, index: 0 }]));

        sim.state.pose.position = Vec3::new(0.0, 0.55, 0.0);
        let second = sim.update(FRAME_DT, &world).unwrap();
        assert!(second.events.is_empty());
        // Grounded: the upward launch does not come back
        assert!(second.velocity.y.abs() < 1e-6);
    }

    #[test]
    fn test_continuous_ground_contact_keeps_fall_time_zero() {
        let mut sim = kart_on_ground();
        let input = KartInput::new(1.0, 0.3, 0.0);
        let ground = FlatGround::new(0.0);
        let world = World::new(&input, &ground, &NoHazards);
        for _ in 0..300 {
            sim.update(FRAME_DT, &world).unwrap();
            assert_eq!(sim.state.fall_time, 0.0);
            assert!((sim.state.filtered_up.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_driving_off_edge_recovers_to_safe_snapshot() {
        let mut sim = kart_on_ground();
        let strip = Strip { half_width: 3.0 };
        let drive = KartInput::new(1.0, 0.0, 0.0);
        let idle = KartInput::default();

        // Face +X and drive off the strip
        sim.state.pose = Pose::looking_at(sim.state.pose.position, Vec3::new(10.0, 0.55, 0.0));
        let world = World::new(&drive, &strip, &NoHazards);
        let mut airborne = false;
        for _ in 0..600 {
            let out = sim.update(FRAME_DT, &world).unwrap();
            if out.contact == GroundContact::Airborne {
                airborne = true;
                break;
            }
        }
        assert!(airborne);
        let safe = sim.state.last_safe_position;
        assert!(safe.x.abs() < 3.0);

        let world = World::new(&idle, &strip, &NoHazards);
        let mut recovered = None;
        for _ in 0..200 {
            let out = sim.update(FRAME_DT, &world).unwrap();
            if out.events.contains(&KartEvent::FallRecovered) {
                recovered = Some(out);
                break;
            }
        }
        let out = recovered.unwrap();
        assert_eq!(out.pose.position, safe);
        assert_eq!(out.velocity, Vec3::ZERO);
    }

    #[test]
    fn test_void_from_spawn_recovers_to_spawn() {
        let mut sim = kart_on_ground();
        let input = KartInput::default();
        let world = World::new(&input, &Void, &NoHazards);
        let spawn = sim.state.pose.position;
        let mut recovered = false;
        for _ in 0..130 {
            let out = sim.update(FRAME_DT, &world).unwrap();
            if out.contact == GroundContact::Recovered {
                recovered = true;
                assert_eq!(out.pose.position, spawn);
                break;
            }
        }
        assert!(recovered);
    }

    #[test]
    fn test_checkpoints_and_finish_time() {
        let mut sim = KartSimulation::new("racer", KartTuning::default());
        sim.initialize_track(
            vec![Vec3::new(0.0, 0.0, 25.0), Vec3::new(0.0, 0.0, 60.0)],
            Vec3::new(0.0, 0.55, 0.0),
            Vec3::new(0.0, 0.55, 10.0),
        );
        let input = KartInput::new(1.0, 0.0, 0.0);
        let ground = FlatGround::new(0.0);
        let world = World::new(&input, &ground, &NoHazards);

        let mut hits = Vec::new();
        let mut finish = None;
        for _ in 0..2000 {
            let out = sim.update(FRAME_DT, &world).unwrap();
            for event in out.events {
                match event {
                    KartEvent::CheckpointHit { index } => hits.push(index),
                    KartEvent::TrackComplete { time } => finish = Some(time),
                    _ => {}
                }
            }
            if finish.is_some() {
                break;
            }
        }

        assert_eq!(hits, vec![0, 1]);
        assert_eq!(sim.percent_complete(), 100);
        let finish = finish.unwrap();
        assert!(finish > 0.0);
        assert_eq!(sim.clock.finish_time, Some(finish));

        // Inert after completion
        let out = sim.update(FRAME_DT, &world).unwrap();
        assert!(out.events.is_empty());
    }

    #[test]
    fn test_reset_restores_start() {
        let mut sim = kart_on_ground();
        sim.initialize_track(
            vec![Vec3::new(0.0, 0.0, 5.0)],
            Vec3::new(0.0, 0.55, 0.0),
            Vec3::new(10.0, 0.55, 0.0),
        );
        let input = KartInput::new(1.0, 0.5, 0.0);
        let ground = FlatGround::new(0.0);
        let mut hazards = HazardSet::new();
        hazards.add(HazardKind::Poison, Vec3::new(0.0, 0.0, 0.0));
        let world = World::new(&input, &ground, &hazards);
        for _ in 0..30 {
            sim.update(FRAME_DT, &world);
        }
        assert!(sim.tracker.hits() > 0);

        sim.reset();
        assert_eq!(sim.tracker.hits(), 0);
        assert_eq!(sim.hazard_state(), HazardState::Ok);
        assert_eq!(sim.state.velocity, Vec3::ZERO);
        assert_eq!(sim.state.velocity_factor(), 1.0);
        assert_eq!(sim.state.last_hazard, None);
        assert_eq!(sim.state.pose.position, Vec3::new(0.0, 0.55, 0.0));
        assert!((sim.state.pose.forward() - Vec3::X).length() < 1e-5);
        assert_eq!(sim.clock.elapsed, 0.0);
    }

    #[test]
    fn test_emit_feeds_sink() {
        let mut sim = kart_on_ground();
        let input = KartInput::new(1.0, -1.0, 0.0);
        let ground = FlatGround::new(0.0);
        let world = World::new(&input, &ground, &NoHazards);
        let mut frames: Vec<FrameFeedback> = Vec::new();

        sim.update_and_emit(FRAME_DT, &world, &mut frames);
        assert!(sim.update_and_emit(0.5, &world, &mut frames).is_none());

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].state, HazardState::Ok);
        assert_eq!(frames[0].steering, 0.0);
        assert!((frames[0].engine_volume - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_steering_cue_holds_while_exploded() {
        let mut sim = kart_on_ground();
        let ground = FlatGround::new(0.0);

        let left = KartInput::new(0.0, -1.0, 0.0);
        let out = sim.update(FRAME_DT, &World::new(&left, &ground, &NoHazards)).unwrap();
        assert_eq!(out.steering, 0.0);

        let mut hazards = HazardSet::new();
        hazards.add(HazardKind::Bomb, sim.state.pose.position);
        let right = KartInput::new(0.0, 1.0, 0.0);
        let world = World::new(&right, &ground, &hazards);
        let mut frames: Vec<FrameFeedback> = Vec::new();
        let out = sim.update_and_emit(FRAME_DT, &world, &mut frames).unwrap();

        assert_eq!(out.state, HazardState::Exploded);
        assert_eq!(out.steering, 0.0);
        assert_eq!(frames[0].steering, 0.0);
        assert_eq!(sim.state.steering, 0.0);
    }
}
