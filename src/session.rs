use log::debug;
use serde::{Deserialize, Serialize};

use crate::geodesy::fix_distance;
use crate::types::LocationFix;

// Plausibility gates, kept as empirically tuned on recorded sessions
const MIN_DISTANCE_DELTA_M: f64 = 0.5;
const MAX_DISTANCE_DELTA_M: f64 = 100.0;
const MAX_TIME_DELTA_S: f64 = 10.0;
const MIN_ELEVATION_DELTA_M: f64 = 0.5;
const MOVING_SPEED_MS: f64 = 0.5;

pub fn distance_delta_accepted(delta_m: f64) -> bool {
    (MIN_DISTANCE_DELTA_M..=MAX_DISTANCE_DELTA_M).contains(&delta_m)
}

pub fn time_delta_accepted(delta_s: f64) -> bool {
    (0.0..=MAX_TIME_DELTA_S).contains(&delta_s)
}

pub fn elevation_delta_accepted(delta_m: f64) -> bool {
    delta_m.abs() > MIN_ELEVATION_DELTA_M
}

/// Cumulative statistics for one tracking session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub distance: f64,
    pub elevation_gain: f64,
    pub elevation_loss: f64,
    pub moving_time: f64,
    pub elapsed_time: f64,
    pub max_speed: f64,
    pub previous_fix: Option<LocationFix>,
    pub previous_altitude: Option<f64>,
    pub last_update_epoch: Option<i64>,
}

impl SessionState {
    pub fn avg_speed(&self) -> f64 {
        if self.elapsed_time > 0.0 {
            self.distance / self.elapsed_time
        } else {
            0.0
        }
    }

    pub fn moving_avg_speed(&self) -> f64 {
        if self.moving_time > 0.0 {
            self.distance / self.moving_time
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            distance: self.distance,
            elevation_gain: self.elevation_gain,
            elevation_loss: self.elevation_loss,
            moving_time: self.moving_time,
            elapsed_time: self.elapsed_time,
            max_speed: self.max_speed,
            avg_speed: self.avg_speed(),
            moving_avg_speed: self.moving_avg_speed(),
        }
    }
}

/// Read-only statistics attached to each output frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub distance: f64,
    pub elevation_gain: f64,
    pub elevation_loss: f64,
    pub moving_time: f64,
    pub elapsed_time: f64,
    pub max_speed: f64,
    pub avg_speed: f64,
    pub moving_avg_speed: f64,
}

#[derive(Clone, Debug, Default)]
pub struct SessionAccumulator {
    state: SessionState,
}

impl SessionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn summary(&self) -> SessionSummary {
        self.state.summary()
    }

    /// Integrate one fix. `altitude` is None when the fix carried no usable
    /// altitude; elevation is then left untouched.
    pub fn ingest(&mut self, fix: &LocationFix, altitude: Option<f64>) {
        let state = &mut self.state;

        if let (Some(previous_fix), Some(last_epoch)) = (&state.previous_fix, state.last_update_epoch) {
            let distance_delta = fix_distance(previous_fix, fix);
            if distance_delta_accepted(distance_delta) {
                state.distance += distance_delta;
            } else {
                debug!("Rejected distance delta {:.2} m", distance_delta);
            }

            // Overflowing deltas come from corrupt timestamps and are rejected like any other
            let time_delta = fix
                .timestamp_ms
                .checked_sub(last_epoch)
                .map(|delta_ms| delta_ms as f64 / 1000.0);
            match time_delta {
                Some(time_delta) if time_delta_accepted(time_delta) => {
                    state.elapsed_time += time_delta;
                    if fix.speed.is_some_and(|s| s >= MOVING_SPEED_MS) {
                        state.moving_time += time_delta;
                    }
                }
                _ => debug!("Rejected time delta {:?} s", time_delta),
            }

            if let (Some(current), Some(previous)) = (altitude, state.previous_altitude) {
                let elevation_delta = current - previous;
                if elevation_delta_accepted(elevation_delta) {
                    if elevation_delta > 0.0 {
                        state.elevation_gain += elevation_delta;
                    } else {
                        state.elevation_loss += -elevation_delta;
                    }
                }
            }

            if let Some(speed) = fix.speed {
                state.max_speed = state.max_speed.max(speed);
            }
        }

        // Next delta is measured from the latest observation, accepted or not
        state.previous_fix = Some(fix.clone());
        if altitude.is_some() {
            state.previous_altitude = altitude;
        }
        state.last_update_epoch = Some(fix.timestamp_ms);
    }

    pub fn reset(&mut self) {
        self.state = SessionState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    // Meters per degree of latitude on the mean-radius sphere
    const M_PER_DEG: f64 = 6_371_008.8 * std::f64::consts::PI / 180.0;

    fn fix_at(north_m: f64, t_ms: i64) -> LocationFix {
        LocationFix::new(37.0 + north_m / M_PER_DEG, 127.0, 5.0, t_ms)
    }

    #[test]
    fn test_first_fix_only_primes() {
        let mut acc = SessionAccumulator::new();
        acc.ingest(&fix_at(0.0, 1_000).with_speed(9.0), Some(100.0));
        let state = acc.state();
        assert_eq!(state.distance, 0.0);
        assert_eq!(state.elapsed_time, 0.0);
        assert_eq!(state.max_speed, 0.0);
        assert_eq!(state.last_update_epoch, Some(1_000));
        assert_eq!(state.previous_altitude, Some(100.0));
        assert!(state.previous_fix.is_some());
    }

    #[test]
    fn test_gate_bounds() {
        assert!(!distance_delta_accepted(0.3));
        assert!(distance_delta_accepted(0.5));
        assert!(distance_delta_accepted(99.0));
        assert!(distance_delta_accepted(100.0));
        assert!(!distance_delta_accepted(150.0));
        assert!(time_delta_accepted(0.0));
        assert!(time_delta_accepted(10.0));
        assert!(!time_delta_accepted(-1.0));
        assert!(!time_delta_accepted(10.5));
        assert!(!elevation_delta_accepted(0.4));
        assert!(elevation_delta_accepted(-0.6));
    }

    #[test]
    fn test_jitter_is_ignored() {
        let mut acc = SessionAccumulator::new();
        for i in 0..5 {
            acc.ingest(&fix_at(0.3 * i as f64, i * 1_000), None);
        }
        assert_eq!(acc.state().distance, 0.0);
        assert_abs_diff_eq!(acc.state().elapsed_time, 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_distance_steps_accumulate() {
        let mut acc = SessionAccumulator::new();
        acc.ingest(&fix_at(0.0, 0), None);
        acc.ingest(&fix_at(0.501, 1_000), None);
        assert_abs_diff_eq!(acc.state().distance, 0.501, epsilon = 1e-3);
        acc.ingest(&fix_at(99.501, 2_000), None);
        assert_abs_diff_eq!(acc.state().distance, 99.501, epsilon = 1e-2);
    }

    #[test]
    fn test_half_meter_step_is_the_boundary() {
        let mut acc = SessionAccumulator::new();
        acc.ingest(&fix_at(0.0, 0), None);
        let at_gate = fix_at(0.5 + 1e-7, 1_000);
        assert!(fix_distance(&fix_at(0.0, 0), &at_gate) >= 0.5);
        acc.ingest(&at_gate, None);
        assert_abs_diff_eq!(acc.state().distance, 0.5, epsilon = 1e-6);

        // Just under the gate, measured from the fix above
        acc.ingest(&fix_at(1.0, 2_000), None);
        assert_abs_diff_eq!(acc.state().distance, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_extreme_timestamps_do_not_overflow() {
        let mut acc = SessionAccumulator::new();
        acc.ingest(&fix_at(0.0, i64::MIN), None);
        acc.ingest(&fix_at(5.0, i64::MAX).with_speed(2.0), None);
        assert_eq!(acc.state().elapsed_time, 0.0);
        assert_eq!(acc.state().moving_time, 0.0);
        assert_abs_diff_eq!(acc.state().distance, 5.0, epsilon = 1e-3);

        acc.ingest(&fix_at(10.0, i64::MIN).with_speed(2.0), None);
        assert_eq!(acc.state().elapsed_time, 0.0);
        assert_eq!(acc.state().last_update_epoch, Some(i64::MIN));
    }

    #[test]
    fn test_teleport_rejected_but_becomes_reference() {
        let mut acc = SessionAccumulator::new();
        acc.ingest(&fix_at(0.0, 0), None);
        acc.ingest(&fix_at(150.0, 1_000), None);
        assert_eq!(acc.state().distance, 0.0);
        // Delta is measured from the rejected fix, not the last accepted one
        acc.ingest(&fix_at(160.0, 2_000), None);
        assert_abs_diff_eq!(acc.state().distance, 10.0, epsilon = 1e-2);
    }

    #[test]
    fn test_time_gate() {
        let mut acc = SessionAccumulator::new();
        acc.ingest(&fix_at(0.0, 10_000), None);
        acc.ingest(&fix_at(5.0, 25_000).with_speed(2.0), None); // 15 s gap
        assert_eq!(acc.state().elapsed_time, 0.0);
        acc.ingest(&fix_at(10.0, 24_000).with_speed(2.0), None); // clock went back
        assert_eq!(acc.state().elapsed_time, 0.0);
        acc.ingest(&fix_at(15.0, 26_000).with_speed(2.0), None);
        assert_abs_diff_eq!(acc.state().elapsed_time, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(acc.state().moving_time, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_moving_time_needs_speed() {
        let mut acc = SessionAccumulator::new();
        acc.ingest(&fix_at(0.0, 0), None);
        acc.ingest(&fix_at(1.0, 1_000).with_speed(0.4), None);
        acc.ingest(&fix_at(2.0, 2_000), None);
        acc.ingest(&fix_at(3.0, 3_000).with_speed(0.5), None);
        let state = acc.state();
        assert_abs_diff_eq!(state.elapsed_time, 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(state.moving_time, 1.0, epsilon = 1e-9);
        assert!(state.moving_time <= state.elapsed_time);
    }

    #[test]
    fn test_elevation_gate() {
        let mut acc = SessionAccumulator::new();
        acc.ingest(&fix_at(0.0, 0), Some(100.0));
        acc.ingest(&fix_at(2.0, 1_000), Some(100.4));
        assert_eq!(acc.state().elevation_gain, 0.0);
        acc.ingest(&fix_at(4.0, 2_000), Some(101.0));
        assert_abs_diff_eq!(acc.state().elevation_gain, 0.6, epsilon = 1e-9);
        acc.ingest(&fix_at(6.0, 3_000), Some(100.4));
        assert_abs_diff_eq!(acc.state().elevation_loss, 0.6, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_altitude_keeps_reference() {
        let mut acc = SessionAccumulator::new();
        acc.ingest(&fix_at(0.0, 0), Some(100.0));
        acc.ingest(&fix_at(2.0, 1_000), None);
        assert_eq!(acc.state().previous_altitude, Some(100.0));
        acc.ingest(&fix_at(4.0, 2_000), Some(102.0));
        assert_abs_diff_eq!(acc.state().elevation_gain, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_max_speed_and_averages() {
        let mut acc = SessionAccumulator::new();
        acc.ingest(&fix_at(0.0, 0).with_speed(1.0), None);
        acc.ingest(&fix_at(10.0, 2_000).with_speed(5.0), None);
        acc.ingest(&fix_at(20.0, 4_000).with_speed(3.0), None);
        acc.ingest(&fix_at(20.0, 6_000).with_speed(0.0), None);
        let summary = acc.summary();
        assert_eq!(summary.max_speed, 5.0);
        assert_abs_diff_eq!(summary.elapsed_time, 6.0, epsilon = 1e-9);
        assert_abs_diff_eq!(summary.moving_time, 4.0, epsilon = 1e-9);
        assert_abs_diff_eq!(summary.avg_speed, 20.0 / 6.0, epsilon = 1e-2);
        assert_abs_diff_eq!(summary.moving_avg_speed, 5.0, epsilon = 1e-2);
    }

    #[test]
    fn test_averages_zero_without_time() {
        let acc = SessionAccumulator::new();
        assert_eq!(acc.summary().avg_speed, 0.0);
        assert_eq!(acc.summary().moving_avg_speed, 0.0);
    }

    #[test]
    fn test_reset() {
        let mut acc = SessionAccumulator::new();
        acc.ingest(&fix_at(0.0, 0), Some(1.0));
        acc.ingest(&fix_at(10.0, 1_000), Some(5.0));
        acc.reset();
        assert_eq!(acc.state(), &SessionState::default());
    }
}
