use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::types::{InertialSample, SensorKind};

pub const MOTION_WINDOW_SIZE: usize = 10;

const STANDARD_GRAVITY: f64 = 9.81;

// Vibration normalisation, fitted on recorded rides
const VIBRATION_FLOOR: f64 = 0.5;
const VIBRATION_SPAN: f64 = 2.5;

const SMOOTH_THRESHOLD: f64 = 0.2;
const ROUGH_THRESHOLD: f64 = 0.5;

/// rad/s of yaw rate that counts as full cornering
const CORNERING_FULL_SCALE: f64 = 3.0;

const INCLINE_THRESHOLD_DEG: f64 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadSurfaceQuality {
    Smooth,
    Rough,
    VeryRough,
}

impl RoadSurfaceQuality {
    pub fn from_intensity(vibration_intensity: f64) -> Self {
        if vibration_intensity < SMOOTH_THRESHOLD {
            RoadSurfaceQuality::Smooth
        } else if vibration_intensity < ROUGH_THRESHOLD {
            RoadSurfaceQuality::Rough
        } else {
            RoadSurfaceQuality::VeryRough
        }
    }
}

/// Motion analytics derived from the current window contents.
///
/// Accelerometer-derived fields (vibration, road surface, incline, vertical
/// acceleration) read 0 / smooth / level when `accel_samples` is 0, and
/// vibration needs at least 2. Consumers check the counts before trusting them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionFrame {
    pub road_surface_quality: RoadSurfaceQuality,
    /// Mean magnitude of sample-to-sample accel change, m/s²
    pub vibration_level: f64,
    pub vibration_intensity: f64,
    pub cornering_intensity: f64,
    pub incline_angle_deg: f64,
    pub is_climbing: bool,
    pub is_descending: bool,
    pub vertical_acceleration: f64,
    /// Samples in the window each field was computed from
    pub accel_samples: usize,
    pub gyro_samples: usize,
}

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Last few accelerometer and gyroscope samples, oldest evicted first.
#[derive(Clone, Debug)]
pub struct MotionWindow {
    accel: VecDeque<InertialSample>,
    gyro: VecDeque<InertialSample>,
    capacity: usize,
}

impl Default for MotionWindow {
    fn default() -> Self {
        Self::new(MOTION_WINDOW_SIZE)
    }
}

impl MotionWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        MotionWindow {
            accel: VecDeque::with_capacity(capacity),
            gyro: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: InertialSample) {
        let buffer = match sample.kind {
            SensorKind::Accelerometer => &mut self.accel,
            SensorKind::Gyroscope => &mut self.gyro,
        };
        buffer.push_back(sample);
        while buffer.len() > self.capacity {
            buffer.pop_front();
        }
    }

    pub fn accel_len(&self) -> usize {
        self.accel.len()
    }

    pub fn gyro_len(&self) -> usize {
        self.gyro.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accel.is_empty() && self.gyro.is_empty()
    }

    pub fn latest(&self, kind: SensorKind) -> Option<&InertialSample> {
        match kind {
            SensorKind::Accelerometer => self.accel.back(),
            SensorKind::Gyroscope => self.gyro.back(),
        }
    }

    /// Mean norm of successive accelerometer differences. 0 with fewer than two samples.
    pub fn vibration_level(&self) -> f64 {
        if self.accel.len() < 2 {
            return 0.0;
        }
        let total: f64 = self
            .accel
            .iter()
            .zip(self.accel.iter().skip(1))
            .map(|(prev, next)| (next.vector() - prev.vector()).norm())
            .sum();
        total / (self.accel.len() - 1) as f64
    }

    pub fn vibration_intensity(&self) -> f64 {
        clamp01((self.vibration_level() - VIBRATION_FLOOR) / VIBRATION_SPAN)
    }

    pub fn cornering_intensity(&self) -> f64 {
        if self.gyro.is_empty() {
            return 0.0;
        }
        let mean_yaw_rate =
            self.gyro.iter().map(|s| s.z.abs()).sum::<f64>() / self.gyro.len() as f64;
        clamp01(mean_yaw_rate / CORNERING_FULL_SCALE)
    }

    /// Pitch of the mean gravity vector, degrees in [-90, 90] for a forward-facing device.
    pub fn incline_angle_deg(&self) -> f64 {
        if self.accel.is_empty() {
            return 0.0;
        }
        let n = self.accel.len() as f64;
        let mean_y = self.accel.iter().map(|s| s.y).sum::<f64>() / n;
        let mean_z = self.accel.iter().map(|s| s.z).sum::<f64>() / n;
        mean_y.atan2(mean_z).to_degrees()
    }

    pub fn vertical_acceleration(&self) -> f64 {
        self.accel
            .back()
            .map(|s| s.z - STANDARD_GRAVITY)
            .unwrap_or(0.0)
    }

    /// None while no inertial data has arrived.
    pub fn analyze(&self) -> Option<MotionFrame> {
        if self.is_empty() {
            return None;
        }

        let vibration_level = self.vibration_level();
        let vibration_intensity = clamp01((vibration_level - VIBRATION_FLOOR) / VIBRATION_SPAN);
        let incline_angle_deg = self.incline_angle_deg();

        Some(MotionFrame {
            road_surface_quality: RoadSurfaceQuality::from_intensity(vibration_intensity),
            vibration_level,
            vibration_intensity,
            cornering_intensity: self.cornering_intensity(),
            incline_angle_deg,
            is_climbing: incline_angle_deg > INCLINE_THRESHOLD_DEG,
            is_descending: incline_angle_deg < -INCLINE_THRESHOLD_DEG,
            vertical_acceleration: self.vertical_acceleration(),
            accel_samples: self.accel.len(),
            gyro_samples: self.gyro.len(),
        })
    }

    pub fn clear(&mut self) {
        self.accel.clear();
        self.gyro.clear();
    }
}
