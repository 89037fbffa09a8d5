use log::debug;
use serde::{Deserialize, Serialize};

use super::kalman::KalmanState;

const ALTITUDE_PROCESS_NOISE: f64 = 0.5;
/// Measurement variance used when the fix carries no vertical accuracy (~5 m).
const DEFAULT_ALTITUDE_VARIANCE: f64 = 25.0;

const GPS_WEIGHT: f64 = 0.3;
const BARO_WEIGHT: f64 = 0.7;

const STANDARD_PRESSURE_HPA: f64 = 1013.25;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilteredAltitude {
    pub altitude: f64,
    pub accuracy: f64,
}

/// Standard-atmosphere altitude (m) for a pressure reading in hPa.
pub fn pressure_to_altitude(pressure_hpa: f64) -> f64 {
    44_330.0 * (1.0 - (pressure_hpa / STANDARD_PRESSURE_HPA).powf(1.0 / 5.255))
}

/// Turns raw pressure into altitude relative to the first reading of the session.
#[derive(Clone, Debug, Default)]
pub struct BarometricAltimeter {
    reference_altitude: Option<f64>,
    relative_altitude: Option<f64>,
    last_pressure: Option<f64>,
}

impl BarometricAltimeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a pressure sample. Returns the relative altitude, or None for
    /// non-physical readings.
    pub fn update(&mut self, pressure_hpa: f64) -> Option<f64> {
        if !pressure_hpa.is_finite() || pressure_hpa <= 0.0 {
            return None;
        }
        let altitude = pressure_to_altitude(pressure_hpa);
        let reference = *self.reference_altitude.get_or_insert_with(|| {
            debug!("Barometer reference latched at {:.2} hPa", pressure_hpa);
            altitude
        });
        let relative = altitude - reference;
        self.relative_altitude = Some(relative);
        self.last_pressure = Some(pressure_hpa);
        Some(relative)
    }

    pub fn relative_altitude(&self) -> Option<f64> {
        self.relative_altitude
    }

    pub fn last_pressure(&self) -> Option<f64> {
        self.last_pressure
    }

    pub fn is_available(&self) -> bool {
        self.reference_altitude.is_some()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Mixes GPS altitude with the barometer's relative altitude anchored at the
/// session's first GPS altitude.
#[derive(Clone, Debug, Default)]
pub struct AltitudeBlender {
    start_gps_altitude: Option<f64>,
}

impl AltitudeBlender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn combine(gps_altitude: f64, barometric_relative_altitude: f64, start_gps_altitude: f64) -> f64 {
        gps_altitude * GPS_WEIGHT + (start_gps_altitude + barometric_relative_altitude) * BARO_WEIGHT
    }

    /// Raw altitude to feed the altitude filter. The first GPS altitude of the
    /// session latches the anchor and is returned as-is.
    pub fn blend(&mut self, gps_altitude: f64, barometric_relative_altitude: Option<f64>) -> f64 {
        let Some(start) = self.start_gps_altitude else {
            debug!("Altitude anchor latched at {:.1} m", gps_altitude);
            self.start_gps_altitude = Some(gps_altitude);
            return gps_altitude;
        };
        match barometric_relative_altitude {
            Some(relative) => Self::combine(gps_altitude, relative, start),
            None => gps_altitude,
        }
    }

    pub fn start_gps_altitude(&self) -> Option<f64> {
        self.start_gps_altitude
    }

    pub fn reset(&mut self) {
        self.start_gps_altitude = None;
    }
}

/// Same recipe as the position filter, single axis, own state.
#[derive(Clone, Debug)]
pub struct AltitudeFilter {
    state: KalmanState,
    altitude: f64,
}

impl Default for AltitudeFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl AltitudeFilter {
    pub fn new() -> Self {
        Self {
            state: KalmanState::new(),
            altitude: 0.0,
        }
    }

    pub fn update(&mut self, raw_altitude: f64, vertical_accuracy: Option<f64>) -> FilteredAltitude {
        let measurement_noise = match vertical_accuracy {
            Some(acc) if acc > 0.0 => acc * acc,
            _ => DEFAULT_ALTITUDE_VARIANCE,
        };

        if !self.state.is_initialized() {
            self.state.prime(measurement_noise);
            self.altitude = raw_altitude;
        } else {
            let gain = self.state.step(ALTITUDE_PROCESS_NOISE, measurement_noise);
            self.altitude += gain * (raw_altitude - self.altitude);
        }

        FilteredAltitude {
            altitude: self.altitude,
            accuracy: self.state.variance().sqrt(),
        }
    }

    pub fn variance(&self) -> f64 {
        self.state.variance()
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.altitude = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_combine_weights() {
        // 0.3 * 110 + 0.7 * (100 + 8)
        assert_abs_diff_eq!(AltitudeBlender::combine(110.0, 8.0, 100.0), 108.6, epsilon = 1e-9);
    }

    #[test]
    fn test_blend_latches_first_gps_altitude() {
        let mut blender = AltitudeBlender::new();
        assert_eq!(blender.blend(250.0, Some(3.0)), 250.0);
        assert_eq!(blender.start_gps_altitude(), Some(250.0));

        // Anchor stays at the first value
        let raw = blender.blend(260.0, Some(5.0));
        assert_abs_diff_eq!(raw, 260.0 * 0.3 + 255.0 * 0.7, epsilon = 1e-9);
        assert_eq!(blender.start_gps_altitude(), Some(250.0));
    }

    #[test]
    fn test_blend_without_barometer_uses_gps() {
        let mut blender = AltitudeBlender::new();
        blender.blend(100.0, None);
        assert_eq!(blender.blend(123.0, None), 123.0);
    }

    #[test]
    fn test_altitude_filter_default_noise() {
        let mut filter = AltitudeFilter::new();
        let first = filter.update(100.0, None);
        assert_eq!(first.altitude, 100.0);
        assert_eq!(filter.variance(), 25.0);

        let second = filter.update(101.0, Some(0.0));
        let gain = 25.5 / 50.5;
        assert_abs_diff_eq!(second.altitude, 100.0 + gain, epsilon = 1e-12);
    }

    #[test]
    fn test_altitude_filter_uses_vertical_accuracy() {
        let mut filter = AltitudeFilter::new();
        filter.update(50.0, Some(3.0));
        assert_eq!(filter.variance(), 9.0);
        filter.reset();
        assert_eq!(filter.variance(), 0.0);
        assert_eq!(filter.update(70.0, Some(2.0)).altitude, 70.0);
    }

    #[test]
    fn test_barometer_relative_altitude() {
        let mut baro = BarometricAltimeter::new();
        assert!(!baro.is_available());
        assert_eq!(baro.update(1013.25), Some(0.0));
        assert!(baro.is_available());

        // ~12 hPa drop is roughly 100 m of climb near sea level
        let relative = baro.update(1001.29).unwrap();
        assert_abs_diff_eq!(relative, 100.0, epsilon = 2.0);
    }

    #[test]
    fn test_barometer_ignores_bad_pressure() {
        let mut baro = BarometricAltimeter::new();
        assert_eq!(baro.update(0.0), None);
        assert_eq!(baro.update(f64::NAN), None);
        assert!(!baro.is_available());
    }
}
