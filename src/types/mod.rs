use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// GPS fix as delivered by the platform location provider.
///
/// Timestamps are milliseconds on the provider's monotonic clock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
    pub horizontal_accuracy: f64,
    #[serde(default)]
    pub vertical_accuracy: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub bearing: Option<f64>,
    pub timestamp_ms: i64,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, horizontal_accuracy: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            horizontal_accuracy,
            vertical_accuracy: None,
            speed: None,
            bearing: None,
            timestamp_ms,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_vertical_accuracy(mut self, vertical_accuracy: f64) -> Self {
        self.vertical_accuracy = Some(vertical_accuracy);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_bearing(mut self, bearing: f64) -> Self {
        self.bearing = Some(bearing);
        self
    }

    /// Same fix with the coordinates replaced (used for filtered output).
    pub fn with_position(&self, latitude: f64, longitude: f64, horizontal_accuracy: f64) -> Self {
        Self {
            latitude,
            longitude,
            horizontal_accuracy,
            ..self.clone()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Accelerometer,
    Gyroscope,
}

/// Accelerometer (m/s²) or gyroscope (rad/s) reading in the device frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InertialSample {
    pub kind: SensorKind,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub timestamp_ms: i64,
}

impl InertialSample {
    pub fn accel(x: f64, y: f64, z: f64, timestamp_ms: i64) -> Self {
        Self {
            kind: SensorKind::Accelerometer,
            x,
            y,
            z,
            timestamp_ms,
        }
    }

    pub fn gyro(x: f64, y: f64, z: f64, timestamp_ms: i64) -> Self {
        Self {
            kind: SensorKind::Gyroscope,
            x,
            y,
            z,
            timestamp_ms,
        }
    }

    pub fn vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn magnitude(&self) -> f64 {
        self.vector().norm()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PressureSample {
    pub pressure_hpa: f64,
    pub timestamp_ms: i64,
}

impl PressureSample {
    pub fn new(pressure_hpa: f64, timestamp_ms: i64) -> Self {
        Self {
            pressure_hpa,
            timestamp_ms,
        }
    }
}

/// Latest raw axis reading attached to an output frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisReading {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Vector norm: acceleration magnitude or rotation rate.
    pub magnitude: f64,
}

impl From<&InertialSample> for AxisReading {
    fn from(sample: &InertialSample) -> Self {
        Self {
            x: sample.x,
            y: sample.y,
            z: sample.z,
            magnitude: sample.magnitude(),
        }
    }
}
