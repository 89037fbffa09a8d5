//! Exercise-specific readings of a motion frame, for display layers.

use serde::{Deserialize, Serialize};

use crate::motion::{MotionFrame, RoadSurfaceQuality};

const MS_TO_KMH: f64 = 3.6;

/// 0-100, higher is a better road.
pub fn road_quality_score(motion: &MotionFrame) -> f64 {
    let base = match motion.road_surface_quality {
        RoadSurfaceQuality::Smooth => 90.0,
        RoadSurfaceQuality::Rough => 60.0,
        RoadSurfaceQuality::VeryRough => 30.0,
    };
    (base - motion.vibration_intensity * 20.0).clamp(0.0, 100.0)
}

/// 0-100. Cornering weighted by speed, saturating at 50 km/h.
pub fn cornering_risk(motion: &MotionFrame, speed_ms: f64) -> f64 {
    let speed_factor = (speed_ms * MS_TO_KMH / 50.0).clamp(0.0, 1.0);
    (motion.cornering_intensity * speed_factor * 100.0).min(100.0)
}

/// kcal from a MET estimate driven by speed, incline and vibration.
pub fn estimate_calories(motion: &MotionFrame, speed_ms: f64, duration_s: f64, weight_kg: f64) -> f64 {
    let speed_kmh = speed_ms * MS_TO_KMH;
    let met = if speed_kmh > 0.0 {
        3.5 + speed_kmh / 10.0 + motion.incline_angle_deg.abs() / 10.0 + motion.vibration_intensity
    } else {
        0.0
    };
    met * weight_kg * (duration_s / 3600.0)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    fn from_thresholds(value: f64, low: f64, high: f64) -> Self {
        if value < low {
            Level::Low
        } else if value < high {
            Level::Medium
        } else {
            Level::High
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlopeTrend {
    Flat,
    GentleClimb,
    SteepClimb,
    GentleDescent,
    SteepDescent,
}

impl SlopeTrend {
    pub fn from_incline(incline_deg: f64) -> Self {
        if incline_deg.abs() < 5.0 {
            SlopeTrend::Flat
        } else if incline_deg > 10.0 {
            SlopeTrend::SteepClimb
        } else if incline_deg > 5.0 {
            SlopeTrend::GentleClimb
        } else if incline_deg < -10.0 {
            SlopeTrend::SteepDescent
        } else {
            SlopeTrend::GentleDescent
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CyclingAnalysis {
    pub road_condition: RoadSurfaceQuality,
    /// Low = straight, Medium = gentle curve, High = sharp curve
    pub cornering: Level,
    pub slope: SlopeTrend,
}

pub fn cycling_analysis(motion: &MotionFrame) -> CyclingAnalysis {
    CyclingAnalysis {
        road_condition: motion.road_surface_quality,
        cornering: Level::from_thresholds(motion.cornering_intensity, 0.3, 0.6),
        slope: SlopeTrend::from_incline(motion.incline_angle_deg),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunningAnalysis {
    /// Low vibration means a consistent stride
    pub stride_irregularity: Level,
    pub vertical_oscillation: Level,
}

pub fn running_analysis(motion: &MotionFrame) -> RunningAnalysis {
    RunningAnalysis {
        stride_irregularity: Level::from_thresholds(motion.vibration_intensity, 0.3, 0.6),
        vertical_oscillation: Level::from_thresholds(motion.vertical_acceleration.abs(), 2.0, 4.0),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "meters", rename_all = "snake_case")]
pub enum ElevationChange {
    Level,
    Ascent(f64),
    Descent(f64),
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HikingAnalysis {
    pub terrain_difficulty: Level,
    pub elevation_change: ElevationChange,
}

/// Needs the barometric relative altitude; None without it.
pub fn hiking_analysis(motion: &MotionFrame, relative_altitude: Option<f64>) -> Option<HikingAnalysis> {
    let relative = relative_altitude?;
    let difficulty = motion.vibration_intensity + motion.incline_angle_deg.abs() / 45.0;
    let elevation_change = if relative > 50.0 {
        ElevationChange::Ascent(relative)
    } else if relative < -50.0 {
        ElevationChange::Descent(-relative)
    } else {
        ElevationChange::Level
    };
    Some(HikingAnalysis {
        terrain_difficulty: Level::from_thresholds(difficulty, 0.4, 0.7),
        elevation_change,
    })
}
