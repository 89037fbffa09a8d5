//! Simulated sensor sources for the live tracker binary.
//!
//! Each loop pushes into the shared [`EngineHandle`] on its own cadence and
//! exits once the engine stops tracking.

use std::f64::consts::PI;

use log::{debug, warn};
use tokio::time::{interval, sleep, Duration, Instant};

use crate::engine::EngineHandle;
use crate::types::{InertialSample, LocationFix, PressureSample};

const M_PER_DEG_LAT: f64 = 111_195.0;
const SEA_LEVEL_HPA: f64 = 1013.25;

/// Synthetic outdoor session: steady heading, rolling hills, speed from the exercise.
#[derive(Clone, Debug)]
pub struct RouteSimulator {
    origin_lat: f64,
    origin_lon: f64,
    base_altitude: f64,
    speed_ms: f64,
}

impl RouteSimulator {
    pub fn new(origin_lat: f64, origin_lon: f64, base_altitude: f64, speed_ms: f64) -> Self {
        Self {
            origin_lat,
            origin_lon,
            base_altitude,
            speed_ms,
        }
    }

    fn along_track(&self, t_s: f64) -> f64 {
        self.speed_ms * t_s
    }

    pub fn altitude(&self, t_s: f64) -> f64 {
        self.base_altitude + 15.0 * (self.along_track(t_s) / 400.0 * 2.0 * PI).sin()
    }

    /// Fix at `t_ms` with a few meters of deterministic noise.
    pub fn fix(&self, t_ms: i64, seq: u64) -> LocationFix {
        let t_s = t_ms as f64 / 1000.0;
        let distance = self.along_track(t_s);
        let noise_north = (seq as f64 * 1.7).sin() * 2.0;
        let noise_east = (seq as f64 * 2.3).cos() * 2.0;
        let north = distance * 0.8 + noise_north;
        let east = distance * 0.6 + noise_east;

        let lat = self.origin_lat + north / M_PER_DEG_LAT;
        let lon = self.origin_lon + east / (M_PER_DEG_LAT * self.origin_lat.to_radians().cos());
        let accuracy = 4.0 + (seq as f64 * 0.1).sin().abs() * 3.0;

        LocationFix::new(lat, lon, accuracy, t_ms)
            .with_altitude(self.altitude(t_s) + (seq as f64 * 0.9).sin() * 1.5)
            .with_vertical_accuracy(accuracy * 1.5)
            .with_speed(self.speed_ms + (seq as f64 * 0.5).sin() * 0.3)
            .with_bearing(36.87)
    }

    pub fn accel(&self, t_ms: i64) -> InertialSample {
        let t = t_ms as f64 / 1000.0;
        InertialSample::accel(
            (t * 2.0 * PI * 3.0).sin() * 0.5,
            0.4 + (t * 2.0 * PI).cos() * 0.3,
            9.81 + (t * 2.0 * PI * 7.0).sin() * 0.8,
            t_ms,
        )
    }

    pub fn gyro(&self, t_ms: i64) -> InertialSample {
        let t = t_ms as f64 / 1000.0;
        InertialSample::gyro(
            (t * 0.5).sin() * 0.05,
            (t * 0.3).cos() * 0.03,
            (t * 0.2).sin() * 0.4,
            t_ms,
        )
    }

    /// Pressure consistent with the route altitude (standard atmosphere).
    pub fn pressure(&self, t_ms: i64) -> PressureSample {
        let altitude = self.altitude(t_ms as f64 / 1000.0);
        let pressure = SEA_LEVEL_HPA * (1.0 - altitude / 44_330.0).powf(5.255);
        PressureSample::new(pressure, t_ms)
    }
}

fn elapsed_ms(start: Instant) -> i64 {
    start.elapsed().as_millis() as i64
}

fn still_tracking(handle: &EngineHandle, source: &str) -> bool {
    match handle.is_tracking() {
        Ok(tracking) => tracking,
        Err(e) => {
            warn!("[{}] {}", source, e);
            false
        }
    }
}

/// Irregular GPS cadence between 0.7 s and 1.6 s.
pub async fn gps_loop(handle: EngineHandle, route: RouteSimulator, start: Instant) {
    let mut fix_count = 0u64;
    loop {
        let gap_ms = 700 + (fix_count * 37 % 10) * 100;
        sleep(Duration::from_millis(gap_ms)).await;
        if !still_tracking(&handle, "gps") {
            break;
        }

        let fix = route.fix(elapsed_ms(start), fix_count);
        if let Err(e) = handle.on_fix_received(fix) {
            warn!("[gps] {}", e);
            break;
        }
        fix_count += 1;
        debug!("[gps] {} fixes", fix_count);
    }
}

/// ~50 Hz accelerometer + gyroscope.
pub async fn inertial_loop(handle: EngineHandle, route: RouteSimulator, start: Instant) {
    let mut ticker = interval(Duration::from_millis(20));
    let mut sample_count = 0u64;
    loop {
        ticker.tick().await;
        if !still_tracking(&handle, "imu") {
            break;
        }

        let t_ms = elapsed_ms(start);
        let pushed = handle
            .on_inertial_sample(route.accel(t_ms))
            .and_then(|_| handle.on_inertial_sample(route.gyro(t_ms)));
        if let Err(e) = pushed {
            warn!("[imu] {}", e);
            break;
        }
        sample_count += 1;
        if sample_count % 500 == 0 {
            debug!("[imu] {} samples", sample_count);
        }
    }
}

/// ~5 Hz barometer.
pub async fn baro_loop(handle: EngineHandle, route: RouteSimulator, start: Instant) {
    let mut ticker = interval(Duration::from_millis(200));
    loop {
        ticker.tick().await;
        if !still_tracking(&handle, "baro") {
            break;
        }
        if let Err(e) = handle.on_pressure_sample(route.pressure(elapsed_ms(start))) {
            warn!("[baro] {}", e);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::altitude::pressure_to_altitude;
    use crate::geodesy::fix_distance;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_pressure_matches_route_altitude() {
        let route = RouteSimulator::new(37.0, 127.0, 250.0, 3.0);
        for t_ms in [0, 10_000, 55_000] {
            let pressure = route.pressure(t_ms).pressure_hpa;
            assert_abs_diff_eq!(
                pressure_to_altitude(pressure),
                route.altitude(t_ms as f64 / 1000.0),
                epsilon = 0.01
            );
        }
    }

    #[test]
    fn test_fixes_progress_at_route_speed() {
        let route = RouteSimulator::new(37.0, 127.0, 100.0, 5.0);
        let a = route.fix(0, 0);
        let b = route.fix(60_000, 0);
        // Same noise term, so the displacement is the travelled distance
        assert_abs_diff_eq!(fix_distance(&a, &b), 300.0, epsilon = 1.0);
        assert!(a.altitude.is_some() && a.speed.is_some());
    }

    #[tokio::test]
    async fn test_loops_stop_with_engine() {
        let handle = EngineHandle::new(crate::config::EngineConfig::default()).unwrap();
        handle.start().unwrap();
        let route = RouteSimulator::new(37.0, 127.0, 100.0, 3.0);
        let start = Instant::now();
        let imu = tokio::spawn(inertial_loop(handle.clone(), route.clone(), start));
        let baro = tokio::spawn(baro_loop(handle.clone(), route, start));

        sleep(Duration::from_millis(300)).await;
        handle.stop().unwrap();
        imu.await.unwrap();
        baro.await.unwrap();
        assert!(!handle.is_tracking().unwrap());
    }
}
