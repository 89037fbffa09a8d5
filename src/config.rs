use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{TResult, TelemetryError};

/// Exercise mode selected at session start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseType {
    Bicycle,
    Running,
    Hiking,
    Walking,
}

impl ExerciseType {
    /// Position filter process noise. Larger values follow raw fixes more closely.
    pub fn position_process_noise(self) -> f64 {
        match self {
            ExerciseType::Bicycle => 0.0,
            ExerciseType::Running => 0.5,
            ExerciseType::Hiking => 1.0,
            ExerciseType::Walking => 2.0,
        }
    }

    /// Bicycle mode reports raw fixes.
    pub fn uses_position_filter(self) -> bool {
        self != ExerciseType::Bicycle
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExerciseType::Bicycle => "bicycle",
            ExerciseType::Running => "running",
            ExerciseType::Hiking => "hiking",
            ExerciseType::Walking => "walking",
        }
    }
}

impl Default for ExerciseType {
    fn default() -> Self {
        ExerciseType::Running
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseType {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bicycle" => Ok(ExerciseType::Bicycle),
            "running" => Ok(ExerciseType::Running),
            "hiking" => Ok(ExerciseType::Hiking),
            "walking" => Ok(ExerciseType::Walking),
            _ => Err(TelemetryError::UnknownExerciseType(s.to_string())),
        }
    }
}

/// Session configuration supplied by the host application.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub exercise_type: ExerciseType,
    #[serde(default = "enabled")]
    pub accelerometer: bool,
    #[serde(default = "enabled")]
    pub gyroscope: bool,
    #[serde(default = "enabled")]
    pub barometer: bool,
}

fn enabled() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            exercise_type: ExerciseType::default(),
            accelerometer: true,
            gyroscope: true,
            barometer: true,
        }
    }
}

impl EngineConfig {
    pub fn new(exercise_type: ExerciseType) -> Self {
        Self {
            exercise_type,
            ..Self::default()
        }
    }

    pub fn with_sensors(mut self, accelerometer: bool, gyroscope: bool, barometer: bool) -> Self {
        self.accelerometer = accelerometer;
        self.gyroscope = gyroscope;
        self.barometer = barometer;
        self
    }

    /// Motion analytics need at least one inertial sensor.
    pub fn motion_enabled(&self) -> bool {
        self.accelerometer || self.gyroscope
    }

    pub fn validate(&self) -> TResult<()> {
        let noise = self.exercise_type.position_process_noise();
        if !noise.is_finite() || noise < 0.0 {
            return Err(TelemetryError::InvalidConfig(format!(
                "process noise for {} must be non-negative, got {}",
                self.exercise_type, noise
            )));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> TResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exercise_type_parse() {
        assert_eq!("bicycle".parse::<ExerciseType>().unwrap(), ExerciseType::Bicycle);
        assert_eq!(" Hiking ".parse::<ExerciseType>().unwrap(), ExerciseType::Hiking);
        assert!(matches!(
            "skiing".parse::<ExerciseType>(),
            Err(TelemetryError::UnknownExerciseType(_))
        ));
    }

    #[test]
    fn test_process_noise_per_mode() {
        assert_eq!(ExerciseType::Bicycle.position_process_noise(), 0.0);
        assert_eq!(ExerciseType::Running.position_process_noise(), 0.5);
        assert_eq!(ExerciseType::Hiking.position_process_noise(), 1.0);
        assert_eq!(ExerciseType::Walking.position_process_noise(), 2.0);
        assert!(!ExerciseType::Bicycle.uses_position_filter());
        assert!(ExerciseType::Walking.uses_position_filter());
    }

    #[test]
    fn test_config_from_json_defaults() {
        let config = EngineConfig::from_json_str(r#"{"exercise_type":"walking","gyroscope":false}"#).unwrap();
        assert_eq!(config.exercise_type, ExerciseType::Walking);
        assert!(config.accelerometer);
        assert!(!config.gyroscope);
        assert!(config.barometer);
    }

    #[test]
    fn test_config_rejects_unknown_exercise() {
        assert!(EngineConfig::from_json_str(r#"{"exercise_type":"rowing"}"#).is_err());
    }
}
