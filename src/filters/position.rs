use serde::{Deserialize, Serialize};

use super::kalman::KalmanState;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilteredPosition {
    pub latitude: f64,
    pub longitude: f64,
    /// sqrt(variance), meters
    pub accuracy: f64,
}

/// Latitude/longitude smoother.
///
/// Not a 2-state filter: both axes are corrected with the same gain and share
/// one variance. A process noise of 0 turns the filter into a pass-through.
#[derive(Clone, Debug)]
pub struct PositionFilter {
    process_noise: f64,
    state: KalmanState,
    latitude: f64,
    longitude: f64,
}

impl PositionFilter {
    pub fn new(process_noise: f64) -> Self {
        Self {
            process_noise,
            state: KalmanState::new(),
            latitude: 0.0,
            longitude: 0.0,
        }
    }

    pub fn process_noise(&self) -> f64 {
        self.process_noise
    }

    pub fn variance(&self) -> f64 {
        self.state.variance()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_initialized()
    }

    pub fn update(&mut self, raw_lat: f64, raw_lng: f64, accuracy_m: f64) -> FilteredPosition {
        let measurement_noise = accuracy_m * accuracy_m;

        if !self.state.is_initialized() || self.process_noise <= 0.0 {
            self.state.prime(measurement_noise);
            self.latitude = raw_lat;
            self.longitude = raw_lng;
            return FilteredPosition {
                latitude: raw_lat,
                longitude: raw_lng,
                accuracy: accuracy_m.abs(),
            };
        }

        let gain = self.state.step(self.process_noise, measurement_noise);
        self.latitude += gain * (raw_lat - self.latitude);
        self.longitude += gain * (raw_lng - self.longitude);

        FilteredPosition {
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy: self.state.variance().sqrt(),
        }
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.latitude = 0.0;
        self.longitude = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_first_sample_identity() {
        let mut filter = PositionFilter::new(0.5);
        let out = filter.update(37.5665, 126.978, 8.0);
        assert_eq!(out.latitude, 37.5665);
        assert_eq!(out.longitude, 126.978);
        assert_eq!(out.accuracy, 8.0);
        assert_eq!(filter.variance(), 64.0);
    }

    #[test]
    fn test_convergence_on_repeated_measurement() {
        let mut filter = PositionFilter::new(0.5);
        let mut last_accuracy = f64::INFINITY;
        let mut out = filter.update(37.0, 127.0, 5.0);
        for _ in 0..25 {
            out = filter.update(37.0, 127.0, 5.0);
            assert!(out.accuracy <= last_accuracy);
            last_accuracy = out.accuracy;
        }
        assert_abs_diff_eq!(out.latitude, 37.0, epsilon = 1e-9);
        assert_abs_diff_eq!(out.longitude, 127.0, epsilon = 1e-9);
    }

    #[test]
    fn test_shared_gain_moves_both_axes_proportionally() {
        let mut filter = PositionFilter::new(0.5);
        filter.update(0.0, 0.0, 5.0);
        let out = filter.update(1.0, 2.0, 5.0);
        let gain = 25.5 / 50.5;
        assert_abs_diff_eq!(out.latitude, gain, epsilon = 1e-12);
        assert_abs_diff_eq!(out.longitude, 2.0 * gain, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_process_noise_passes_through() {
        let mut filter = PositionFilter::new(0.0);
        filter.update(37.0, 127.0, 5.0);
        let out = filter.update(37.001, 127.002, 5.0);
        assert_eq!(out.latitude, 37.001);
        assert_eq!(out.longitude, 127.002);
        assert_eq!(out.accuracy, 5.0);
    }

    #[test]
    fn test_higher_process_noise_tracks_faster() {
        let mut smooth = PositionFilter::new(0.5);
        let mut responsive = PositionFilter::new(2.0);
        smooth.update(0.0, 0.0, 5.0);
        responsive.update(0.0, 0.0, 5.0);
        let a = smooth.update(1.0, 1.0, 5.0);
        let b = responsive.update(1.0, 1.0, 5.0);
        assert!(b.latitude > a.latitude);
    }

    #[test]
    fn test_reset_reprimes() {
        let mut filter = PositionFilter::new(1.0);
        filter.update(10.0, 10.0, 3.0);
        filter.update(10.1, 10.1, 3.0);
        filter.reset();
        assert!(!filter.is_initialized());
        let out = filter.update(50.0, 60.0, 4.0);
        assert_eq!(out.latitude, 50.0);
        assert_eq!(filter.variance(), 16.0);
    }
}
