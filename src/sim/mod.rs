//! Deterministic kart simulation
//!
//! All per-frame kart logic lives here. This module must stay pure:
//! - Time comes only from the frame delta passed in
//! - Terrain, hazards and input are read-only collaborators
//! - No rendering, audio or platform dependencies

pub mod checkpoint;
pub mod control;
pub mod hazard;
pub mod orientation;
pub mod state;
pub mod terrain;
pub mod tick;

pub use checkpoint::{CheckpointTracker, RaceClock, format_race_time};
pub use control::{ControlAxes, KartInput};
pub use hazard::{Deflection, HazardProvider, HazardSet, NoHazards, deflect_from_bumper, find_hazard};
pub use orientation::GroundContact;
pub use state::{
    ActiveEffect, HazardContact, HazardKind, HazardState, KartEvent, KartState, Pose,
    UnknownHazardKind,
};
pub use terrain::{FlatGround, Ray, TerrainHit, TerrainSampler, Triangle, TriangleMesh};
pub use tick::{FrameOutput, InputSource, KartSimulation, World};
