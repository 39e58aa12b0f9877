//! Race progress
//!
//! Checkpoints are hit strictly in order: only the next unhit checkpoint is
//! ever tested, and the cursor never moves backwards within a race.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::CHECKPOINT_MARKER_HEIGHT;

/// Ordered checkpoint cursor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointTracker {
    checkpoints: Vec<Vec3>,
    hits: usize,
}

impl CheckpointTracker {
    pub fn new(checkpoints: Vec<Vec3>) -> Self {
        Self {
            checkpoints,
            hits: 0,
        }
    }

    /// Checkpoints reached so far
    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn total(&self) -> usize {
        self.checkpoints.len()
    }

    /// Every checkpoint reached; the tracker no longer tests anything
    pub fn is_complete(&self) -> bool {
        self.hits >= self.checkpoints.len()
    }

    /// Next checkpoint to reach
    pub fn next_checkpoint(&self) -> Option<Vec3> {
        self.checkpoints.get(self.hits).copied()
    }

    /// Where the guide marker floats (above the next checkpoint)
    pub fn marker_position(&self) -> Option<Vec3> {
        self.next_checkpoint()
            .map(|c| c + Vec3::new(0.0, CHECKPOINT_MARKER_HEIGHT, 0.0))
    }

    /// Advance if `position` is strictly within `radius` of the next checkpoint.
    ///
    /// Returns the index that was hit.
    pub fn update(&mut self, position: Vec3, radius: f32) -> Option<usize> {
        let next = self.next_checkpoint()?;
        if position.distance(next) >= radius {
            return None;
        }
        let index = self.hits;
        self.hits += 1;
        log::debug!("Checkpoint {}/{} reached", self.hits, self.total());
        Some(index)
    }

    /// Percent complete, rounded to the nearest integer.
    ///
    /// A track without checkpoints counts as complete.
    pub fn percent_complete(&self) -> u32 {
        if self.checkpoints.is_empty() {
            return 100;
        }
        (self.hits as f64 / self.checkpoints.len() as f64 * 100.0).round() as u32
    }

    /// Rewind to the first checkpoint
    pub fn reset(&mut self) {
        self.hits = 0;
    }
}

/// Simulation-time race clock
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RaceClock {
    /// Seconds since race start (advances only on simulated frames)
    pub elapsed: f64,
    /// Latched when the last checkpoint is reached
    pub finish_time: Option<f64>,
}

impl RaceClock {
    pub fn advance(&mut self, dt: f32) {
        self.elapsed += f64::from(dt);
    }

    /// Latch the finish time (first call wins)
    pub fn finish(&mut self) -> f64 {
        *self.finish_time.get_or_insert(self.elapsed)
    }

    /// Finish time if complete, else running time
    pub fn track_time(&self) -> f64 {
        self.finish_time.unwrap_or(self.elapsed)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Format seconds as `m:ss.mmm`
pub fn format_race_time(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let minutes = total_ms / 60_000;
    let secs = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;
    format!("{}:{:02}.{:03}", minutes, secs, millis)
}
