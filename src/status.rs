use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use chrono::Utc;

use crate::config::ExerciseType;
use crate::error::TResult;

/// Snapshot of the tracker for the host's status query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackerStatus {
    /// Unix seconds when the snapshot was taken
    pub timestamp: f64,
    pub is_running: bool,
    pub exercise_type: ExerciseType,
    pub is_kalman_enabled: bool,
    pub is_barometer_available: bool,
    pub is_accelerometer_enabled: bool,
    pub is_gyroscope_enabled: bool,
    pub fix_count: u64,
    pub accel_sample_count: u64,
    pub gyro_sample_count: u64,
    pub pressure_sample_count: u64,
    pub frames_emitted: u64,
}

impl TrackerStatus {
    pub fn save(&self, path: impl AsRef<Path>) -> TResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> TResult<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

pub fn current_timestamp() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}
