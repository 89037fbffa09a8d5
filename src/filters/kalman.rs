use serde::{Deserialize, Serialize};

/// Scalar Kalman bookkeeping: one variance and the "primed" flag.
///
/// The estimate itself lives with the caller so that a single variance can
/// drive several estimates (latitude and longitude share one).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KalmanState {
    variance: f64,
    initialized: bool,
}

impl KalmanState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    /// First observation after reset: trust it fully.
    pub fn prime(&mut self, measurement_noise: f64) {
        self.variance = measurement_noise.max(0.0);
        self.initialized = true;
    }

    /// Predict + correct the variance and return the gain to apply to every
    /// estimate this state governs. Gain is in (0, 1].
    pub fn step(&mut self, process_noise: f64, measurement_noise: f64) -> f64 {
        let predicted = self.variance + process_noise.max(0.0);
        let denominator = predicted + measurement_noise.max(0.0);
        let gain = if denominator > 0.0 && predicted > 0.0 {
            predicted / denominator
        } else {
            // Zero uncertainty on both sides: take the measurement.
            1.0
        };
        self.variance = ((1.0 - gain) * predicted).max(0.0);
        gain
    }

    pub fn reset(&mut self) {
        self.variance = 0.0;
        self.initialized = false;
    }
}
