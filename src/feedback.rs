//! Visual and audio cues
//!
//! The simulation does not render anything. Each frame it hands a
//! `FrameFeedback` to whatever particle, sound or HUD layer is listening.

use serde::{Deserialize, Serialize};

use crate::sim::state::{HazardState, KartEvent};
use crate::sim::tick::FrameOutput;

/// Speed trail emission per unit of speed
pub const TRAIL_EMIT_PER_SPEED: f32 = 100.0;
/// Aura emission while a hazard effect is active
pub const AURA_EMIT_RATE: f32 = 500.0;

/// Speed trail look, by speed magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedBand {
    /// 0 < s < 0.7, long grey dust
    Dust,
    /// 0.7 <= s < 1.3, yellow sparks
    Spark,
    /// 1.3 <= s < 1.5, red flame
    Flame,
    /// Everything else (standing still included), short green plasma
    Plasma,
}

impl SpeedBand {
    pub fn from_speed(speed: f32) -> Self {
        if speed > 0.0 && speed < 0.7 {
            SpeedBand::Dust
        } else if (0.7..1.3).contains(&speed) {
            SpeedBand::Spark
        } else if (1.3..1.5).contains(&speed) {
            SpeedBand::Flame
        } else {
            SpeedBand::Plasma
        }
    }

    /// Trail particle lifetime in seconds
    pub fn trail_lifetime(&self) -> f32 {
        match self {
            SpeedBand::Dust => 2.0,
            SpeedBand::Spark => 0.5,
            SpeedBand::Flame | SpeedBand::Plasma => 0.4,
        }
    }
}

/// Everything a presentation layer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameFeedback {
    pub speed: f32,
    pub state: HazardState,
    pub speed_band: SpeedBand,
    pub trail_emit_rate: f32,
    /// 0 while `Ok`
    pub aura_emit_rate: f32,
    /// Smoothed engine volume in [0, 1]
    pub engine_volume: f32,
    /// Steering animation position in [0, 1]
    pub steering: f32,
    pub events: Vec<KartEvent>,
}

impl FrameFeedback {
    pub fn from_output(output: &FrameOutput, engine_volume: f32) -> Self {
        let speed = output.speed;
        Self {
            speed,
            state: output.state,
            speed_band: SpeedBand::from_speed(speed),
            trail_emit_rate: speed * TRAIL_EMIT_PER_SPEED,
            aura_emit_rate: match output.state {
                HazardState::Ok => 0.0,
                HazardState::Slow | HazardState::Exploded | HazardState::Fast => AURA_EMIT_RATE,
            },
            engine_volume,
            steering: output.steering,
            events: output.events.clone(),
        }
    }
}

/// Receiver for per-frame cues
pub trait FeedbackSink {
    fn on_frame(&mut self, feedback: &FrameFeedback);
}

/// Records every frame (tests, replays)
impl FeedbackSink for Vec<FrameFeedback> {
    fn on_frame(&mut self, feedback: &FrameFeedback) {
        self.push(feedback.clone());
    }
}

/// Logs state changes and notable events
#[derive(Debug, Default)]
pub struct LogSink {
    last_state: Option<HazardState>,
}

impl FeedbackSink for LogSink {
    fn on_frame(&mut self, feedback: &FrameFeedback) {
        if self.last_state != Some(feedback.state) {
            log::info!("State -> {:?} (speed {:.2})", feedback.state, feedback.speed);
            self.last_state = Some(feedback.state);
        }
        for event in &feedback.events {
            log::debug!("{:?}", event);
        }
    }
}
