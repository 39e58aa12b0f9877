//! Kart Sim entry point
//!
//! Runs a headless race on a generated demo track with an autopilot driver
//! and logs what happens.
//!
//! Usage: `kart-sim [tuning.json] [best_times.json]`. The best-times board
//! defaults to `best_times.json` beside the tuning file; with no arguments
//! finishes are ranked but not saved.

use std::f32::consts::TAU;
use std::path::{Path, PathBuf};

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use kart_sim::consts::FRAME_DT;
use kart_sim::feedback::LogSink;
use kart_sim::sim::{
    FlatGround, HazardKind, HazardSet, KartEvent, KartInput, KartSimulation, World,
    format_race_time,
};
use kart_sim::{BestTimes, KartTuning, signed_angle_about};

/// Demo track seed
const TRACK_SEED: u64 = 0x6b61_7274;
/// Checkpoint ring radius
const RING_RADIUS: f32 = 120.0;
const CHECKPOINT_COUNT: usize = 8;
/// Give up after two simulated minutes
const MAX_FRAMES: u32 = 60 * 120;
const BEST_TIMES_FILE: &str = "best_times.json";

/// Checkpoints on a ring plus hazards scattered near the racing line
fn demo_track(seed: u64) -> (Vec<Vec3>, HazardSet) {
    let mut rng = Pcg32::seed_from_u64(seed);

    let checkpoints: Vec<Vec3> = (1..=CHECKPOINT_COUNT)
        .map(|i| {
            let theta = i as f32 / CHECKPOINT_COUNT as f32 * TAU;
            Vec3::new(RING_RADIUS * theta.sin(), 0.0, RING_RADIUS * theta.cos())
        })
        .collect();

    let mut hazards = HazardSet::new();
    for i in 0..CHECKPOINT_COUNT * 3 {
        let theta = (i as f32 + rng.random_range(0.2..0.8)) / (CHECKPOINT_COUNT * 3) as f32 * TAU;
        let r = RING_RADIUS + rng.random_range(-6.0..6.0);
        let kind = match rng.random_range(0..4) {
            0 => HazardKind::Bomb,
            1 => HazardKind::Boost,
            2 => HazardKind::Bumper,
            _ => HazardKind::Poison,
        };
        hazards.add(kind, Vec3::new(r * theta.sin(), 0.55, r * theta.cos()));
    }

    (checkpoints, hazards)
}

/// Full throttle, steer toward the next checkpoint
fn autopilot(sim: &KartSimulation) -> KartInput {
    let Some(target) = sim.tracker.next_checkpoint() else {
        return KartInput::new(0.0, 0.0, 1.0);
    };
    let pose = sim.state.pose;
    let mut to_target = target - pose.position;
    to_target.y = 0.0;
    let angle = signed_angle_about(pose.forward(), to_target, pose.up());
    KartInput::new(1.0, (angle * 2.0).clamp(-1.0, 1.0), 0.0)
}

/// Rank a finish on the board at `path` (in memory only without one)
fn record_finish(path: Option<&Path>, name: &str, time: f64, checkpoints: usize) {
    let mut board = match path.map(BestTimes::load).transpose() {
        Ok(board) => board.unwrap_or_default(),
        Err(e) => {
            log::warn!("{}; starting a fresh board", e);
            BestTimes::new()
        }
    };

    match board.add_time(name, time, checkpoints) {
        Some(rank) => println!("New best time: #{} of {}", rank, board.entries.len()),
        None => println!(
            "Not a best time (record {})",
            board.best().map(format_race_time).unwrap_or_default()
        ),
    }

    if let Some(path) = path {
        if let Err(e) = board.save(path) {
            log::warn!("{}", e);
        }
    }
}

fn main() {
    env_logger::init();
    log::info!("Kart Sim (headless) starting...");

    let tuning_path = std::env::args().nth(1).map(PathBuf::from);
    let board_path = std::env::args()
        .nth(2)
        .map(PathBuf::from)
        .or_else(|| tuning_path.as_ref().map(|p| p.with_file_name(BEST_TIMES_FILE)));

    let tuning = match &tuning_path {
        Some(path) => match KartTuning::load(path) {
            Ok(tuning) => tuning,
            Err(e) => {
                log::warn!("{}; using default tuning", e);
                KartTuning::default()
            }
        },
        None => KartTuning::default(),
    };

    let (checkpoints, hazards) = demo_track(TRACK_SEED);
    log::info!(
        "Demo track: {} checkpoints, {} hazards (seed {:#x})",
        checkpoints.len(),
        hazards.len(),
        TRACK_SEED
    );

    let ground = FlatGround::new(0.0);
    let mut sim = KartSimulation::new("demo", tuning);
    sim.initialize_track(checkpoints, Vec3::new(0.0, 0.55, RING_RADIUS), Vec3::new(10.0, 0.55, RING_RADIUS));

    let mut sink = LogSink::default();
    let mut finish = None;
    for frame in 0..MAX_FRAMES {
        let input = autopilot(&sim);
        let world = World::new(&input, &ground, &hazards);
        let Some(output) = sim.update_and_emit(FRAME_DT, &world, &mut sink) else {
            continue;
        };

        for event in &output.events {
            match event {
                KartEvent::CheckpointHit { .. } => {
                    log::info!("Frame {}: {}% complete", frame, sim.percent_complete());
                }
                KartEvent::TrackComplete { time } => finish = Some(*time),
                _ => {}
            }
        }
        if finish.is_some() {
            break;
        }
    }

    match finish {
        Some(time) => {
            println!("{} finished in {}", sim.name(), format_race_time(time));
            record_finish(board_path.as_deref(), sim.name(), time, sim.tracker.total());
        }
        None => println!(
            "{} did not finish ({}% after {})",
            sim.name(),
            sim.percent_complete(),
            format_race_time(sim.clock.track_time())
        ),
    }
}
