//! Finish-time leaderboard
//!
//! Keeps the ten fastest finishes, fastest first.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of times to keep
pub const MAX_BEST_TIMES: usize = 10;

#[derive(Debug, Error)]
pub enum BestTimesError {
    #[error("failed to access best times file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to (de)serialize best times: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single finish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestTimeEntry {
    pub kart_name: String,
    /// Finish time in seconds
    pub time: f64,
    /// Checkpoints on the track when it was set
    pub checkpoints: usize,
}

/// Leaderboard, sorted ascending by time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BestTimes {
    pub entries: Vec<BestTimeEntry>,
}

impl BestTimes {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Whether a time would make the board
    pub fn qualifies(&self, time: f64) -> bool {
        if !time.is_finite() || time <= 0.0 {
            return false;
        }
        if self.entries.len() < MAX_BEST_TIMES {
            return true;
        }
        self.entries.last().map(|e| time < e.time).unwrap_or(true)
    }

    /// Record a finish; returns the 1-indexed rank or None if it didn't qualify.
    ///
    /// Ties go behind existing entries.
    pub fn add_time(&mut self, kart_name: &str, time: f64, checkpoints: usize) -> Option<usize> {
        if !self.qualifies(time) {
            return None;
        }

        let entry = BestTimeEntry {
            kart_name: kart_name.to_string(),
            time,
            checkpoints,
        };

        let pos = self
            .entries
            .iter()
            .position(|e| time < e.time)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, entry);
        self.entries.truncate(MAX_BEST_TIMES);

        log::info!("{} set a #{} time: {:.3}s", kart_name, pos + 1, time);
        Some(pos + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fastest time (if any)
    pub fn best(&self) -> Option<f64> {
        self.entries.first().map(|e| e.time)
    }

    pub fn to_json(&self) -> Result<String, BestTimesError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a saved board, re-sorting and trimming it
    pub fn from_json(json: &str) -> Result<Self, BestTimesError> {
        let mut board: Self = serde_json::from_str(json)?;
        board.entries.retain(|e| e.time.is_finite() && e.time > 0.0);
        board.entries.sort_by(|a, b| a.time.total_cmp(&b.time));
        board.entries.truncate(MAX_BEST_TIMES);
        Ok(board)
    }

    /// Load a saved board; a missing file is a fresh board
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BestTimesError> {
        let path = path.as_ref();
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No best times at {}, starting fresh", path.display());
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };
        let board = Self::from_json(&json)?;
        log::info!("Loaded {} best times", board.entries.len());
        Ok(board)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), BestTimesError> {
        std::fs::write(path, self.to_json()?)?;
        log::info!("Best times saved ({} entries)", self.entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_time_ranks_ascending() {
        let mut board = BestTimes::new();
        assert_eq!(board.add_time("a", 62.0, 8), Some(1));
        assert_eq!(board.add_time("b", 55.5, 8), Some(1));
        assert_eq!(board.add_time("c", 70.0, 8), Some(3));
        assert_eq!(board.add_time("d", 62.0, 8), Some(3));
        let names: Vec<_> = board.entries.iter().map(|e| e.kart_name.as_str()).collect();
        assert_eq!(names, ["b", "a", "d", "c"]);
        assert_eq!(board.best(), Some(55.5));
    }

    #[test]
    fn test_board_caps_at_ten() {
        let mut board = BestTimes::new();
        for i in 0..MAX_BEST_TIMES {
            board.add_time("k", 10.0 + i as f64, 4);
        }
        assert!(!board.qualifies(30.0));
        assert_eq!(board.add_time("slow", 30.0, 4), None);
        assert_eq!(board.add_time("fast", 9.0, 4), Some(1));
        assert_eq!(board.entries.len(), MAX_BEST_TIMES);
        assert_eq!(board.entries.last().map(|e| e.time), Some(18.0));
    }

    #[test]
    fn test_invalid_times_rejected() {
        let mut board = BestTimes::new();
        assert_eq!(board.add_time("x", 0.0, 4), None);
        assert_eq!(board.add_time("x", f64::NAN, 4), None);
        assert!(board.is_empty());
    }

    #[test]
    fn test_from_json_sorts_and_filters() {
        let json = r#"{"entries":[
            {"kart_name":"b","time":40.0,"checkpoints":3},
            {"kart_name":"a","time":20.0,"checkpoints":3},
            {"kart_name":"z","time":-1.0,"checkpoints":3}
        ]}"#;
        let board = BestTimes::from_json(json).unwrap();
        assert_eq!(board.entries.len(), 2);
        assert_eq!(board.entries[0].kart_name, "a");

        let again = BestTimes::from_json(&board.to_json().unwrap()).unwrap();
        assert_eq!(again, board);
        assert!(BestTimes::from_json("[").is_err());
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("kart_sim_best_times_{}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let fresh = BestTimes::load(&path).unwrap();
        assert!(fresh.is_empty());

        let mut board = fresh;
        board.add_time("demo", 42.5, 8);
        board.save(&path).unwrap();
        let loaded = BestTimes::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, board);
        assert_eq!(loaded.best(), Some(42.5));
    }
}
