//! Telemetry fusion engine.
//!
//! Owns every estimator for one tracking session. Fixes, inertial samples and
//! pressure samples update state as they arrive; `tick()` is called by the
//! host at 1 Hz and turns the latest state into an [`OutputFrame`], so the
//! output cadence does not depend on how often the GPS provider delivers.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{TResult, TelemetryError};
use crate::filters::altitude::FilteredAltitude;
use crate::filters::{AltitudeBlender, AltitudeFilter, BarometricAltimeter, PositionFilter};
use crate::grade::{GradeResult, GradeTracker};
use crate::motion::{MotionFrame, MotionWindow};
use crate::recording::SessionLog;
use crate::session::{SessionAccumulator, SessionSummary};
use crate::status::{current_timestamp, TrackerStatus};
use crate::types::{AxisReading, InertialSample, LocationFix, PressureSample, SensorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Idle,
    Tracking,
}

/// One emitted telemetry frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputFrame {
    /// 1-based index of the tick that emitted this frame
    pub sequence: u64,
    /// Position after the position filter (raw in bicycle mode)
    pub fix: LocationFix,
    pub is_kalman_filtered: bool,
    pub altitude: Option<FilteredAltitude>,
    /// GPS/barometer blend fed to the altitude filter
    pub enhanced_altitude: Option<f64>,
    pub relative_altitude: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub motion: Option<MotionFrame>,
    pub accelerometer: Option<AxisReading>,
    pub gyroscope: Option<AxisReading>,
    pub grade: Option<GradeResult>,
    pub session: SessionSummary,
    pub is_new_fix: bool,
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    fixes: u64,
    accel: u64,
    gyro: u64,
    pressure: u64,
    frames: u64,
}

pub struct FusionEngine {
    config: EngineConfig,
    state: EngineState,
    position: PositionFilter,
    altitude: AltitudeFilter,
    blender: AltitudeBlender,
    altimeter: BarometricAltimeter,
    motion: MotionWindow,
    session: SessionAccumulator,
    grade: GradeTracker,
    latest: Option<OutputFrame>,
    fix_pending: bool,
    counters: Counters,
    /// Inputs accepted this session, when recording is on. Survives `stop`.
    recording: Option<SessionLog>,
}

impl FusionEngine {
    pub fn new(config: EngineConfig) -> TResult<Self> {
        config.validate()?;
        Ok(Self {
            position: PositionFilter::new(config.exercise_type.position_process_noise()),
            config,
            state: EngineState::Idle,
            altitude: AltitudeFilter::new(),
            blender: AltitudeBlender::new(),
            altimeter: BarometricAltimeter::new(),
            motion: MotionWindow::default(),
            session: SessionAccumulator::new(),
            grade: GradeTracker::new(),
            latest: None,
            fix_pending: false,
            counters: Counters::default(),
            recording: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_tracking(&self) -> bool {
        self.state == EngineState::Tracking
    }

    /// Idle → Tracking with fresh state.
    pub fn start(&mut self) -> TResult<()> {
        if self.is_tracking() {
            return Err(TelemetryError::AlreadyTracking);
        }
        self.reset();
        if self.recording.is_some() {
            self.recording = Some(SessionLog::new(self.config.clone()));
        }
        self.state = EngineState::Tracking;
        info!("Tracking started ({})", self.config.exercise_type);
        Ok(())
    }

    /// Tracking → Idle. Returns the final statistics of the session.
    pub fn stop(&mut self) -> TResult<SessionSummary> {
        if !self.is_tracking() {
            return Err(TelemetryError::NotTracking);
        }
        let summary = self.session.summary();
        self.reset();
        self.state = EngineState::Idle;
        info!(
            "Tracking stopped: {:.1} m in {:.0} s",
            summary.distance, summary.elapsed_time
        );
        Ok(summary)
    }

    /// Drop all session state. Filters re-prime on the next observation.
    pub fn reset(&mut self) {
        self.position.reset();
        self.altitude.reset();
        self.blender.reset();
        self.altimeter.reset();
        self.motion.clear();
        self.session.reset();
        self.grade.reset();
        self.latest = None;
        self.fix_pending = false;
        self.counters = Counters::default();
    }

    pub fn reconfigure(&mut self, config: EngineConfig) -> TResult<()> {
        if self.is_tracking() {
            return Err(TelemetryError::AlreadyTracking);
        }
        config.validate()?;
        self.position = PositionFilter::new(config.exercise_type.position_process_noise());
        if self.recording.is_some() {
            self.recording = Some(SessionLog::new(config.clone()));
        }
        self.config = config;
        Ok(())
    }

    pub fn on_fix_received(&mut self, raw: LocationFix) {
        if !self.is_tracking() {
            trace!("Fix dropped while idle");
            return;
        }
        self.counters.fixes += 1;
        if let Some(log) = self.recording.as_mut() {
            log.fixes.push(raw.clone());
        }

        let use_filter = self.config.exercise_type.uses_position_filter();
        let fix = if use_filter {
            let filtered = self
                .position
                .update(raw.latitude, raw.longitude, raw.horizontal_accuracy);
            raw.with_position(filtered.latitude, filtered.longitude, filtered.accuracy)
        } else {
            raw.clone()
        };

        let relative_altitude = self.barometric_relative_altitude();
        let enhanced_altitude = raw
            .altitude
            .map(|gps| self.blender.blend(gps, relative_altitude));
        let altitude = enhanced_altitude.map(|value| self.altitude.update(value, raw.vertical_accuracy));

        self.session.ingest(&raw, enhanced_altitude);
        let grade = self.grade.update(&raw, enhanced_altitude);

        debug!(
            "Fix #{} lat={:.6} lon={:.6} acc={:.1}m",
            self.counters.fixes, fix.latitude, fix.longitude, fix.horizontal_accuracy
        );

        self.latest = Some(OutputFrame {
            sequence: 0,
            fix,
            is_kalman_filtered: use_filter,
            altitude,
            enhanced_altitude,
            relative_altitude,
            pressure_hpa: self.altimeter.last_pressure(),
            motion: None,
            accelerometer: None,
            gyroscope: None,
            grade,
            session: self.session.summary(),
            is_new_fix: true,
        });
        self.fix_pending = true;
    }

    pub fn on_inertial_sample(&mut self, sample: InertialSample) {
        if !self.is_tracking() {
            trace!("Inertial sample dropped while idle");
            return;
        }
        match sample.kind {
            SensorKind::Accelerometer if self.config.accelerometer => self.counters.accel += 1,
            SensorKind::Gyroscope if self.config.gyroscope => self.counters.gyro += 1,
            _ => return,
        }
        if let Some(log) = self.recording.as_mut() {
            log.inertial.push(sample.clone());
        }
        self.motion.push(sample);
    }

    pub fn on_pressure_sample(&mut self, sample: PressureSample) {
        if !self.is_tracking() || !self.config.barometer {
            return;
        }
        if let Some(log) = self.recording.as_mut() {
            log.pressure.push(sample.clone());
        }
        if self.altimeter.update(sample.pressure_hpa).is_some() {
            self.counters.pressure += 1;
        }
    }

    /// Emit the current frame. None while idle or before the first fix.
    pub fn tick(&mut self) -> Option<OutputFrame> {
        if !self.is_tracking() {
            return None;
        }
        let mut frame = self.latest.clone()?;

        frame.motion = if self.config.motion_enabled() {
            self.motion.analyze()
        } else {
            None
        };
        frame.accelerometer = self
            .motion
            .latest(SensorKind::Accelerometer)
            .map(AxisReading::from);
        frame.gyroscope = self.motion.latest(SensorKind::Gyroscope).map(AxisReading::from);
        frame.relative_altitude = self.barometric_relative_altitude();
        frame.pressure_hpa = self.altimeter.last_pressure();

        frame.is_new_fix = self.fix_pending;
        self.fix_pending = false;
        self.counters.frames += 1;
        frame.sequence = self.counters.frames;
        Some(frame)
    }

    /// Latest cached frame, without consuming the new-fix flag.
    pub fn latest_frame(&self) -> Option<&OutputFrame> {
        self.latest.as_ref()
    }

    pub fn session_summary(&self) -> SessionSummary {
        self.session.summary()
    }

    pub fn status(&self) -> TrackerStatus {
        TrackerStatus {
            timestamp: current_timestamp(),
            is_running: self.is_tracking(),
            exercise_type: self.config.exercise_type,
            is_kalman_enabled: self.config.exercise_type.uses_position_filter(),
            is_barometer_available: self.barometer_available(),
            is_accelerometer_enabled: self.config.accelerometer,
            is_gyroscope_enabled: self.config.gyroscope,
            fix_count: self.counters.fixes,
            accel_sample_count: self.counters.accel,
            gyro_sample_count: self.counters.gyro,
            pressure_sample_count: self.counters.pressure,
            frames_emitted: self.counters.frames,
        }
    }

    /// Keep a [`SessionLog`] of every accepted input from the next `start` on.
    pub fn set_recording(&mut self, enabled: bool) {
        self.recording = enabled.then(|| SessionLog::new(self.config.clone()));
    }

    /// The log recorded so far, leaving an empty one in its place.
    pub fn take_recording(&mut self) -> Option<SessionLog> {
        let fresh = SessionLog::new(self.config.clone());
        self.recording.as_mut().map(|log| std::mem::replace(log, fresh))
    }

    fn barometer_available(&self) -> bool {
        self.config.barometer && self.altimeter.is_available()
    }

    fn barometric_relative_altitude(&self) -> Option<f64> {
        if self.barometer_available() {
            self.altimeter.relative_altitude()
        } else {
            None
        }
    }
}

/// Thread-safe handle shared by the fix, sensor and tick callbacks.
///
/// Every call takes the one engine lock, so a tick never sees a half-applied fix.
#[derive(Clone)]
pub struct EngineHandle {
    engine: Arc<Mutex<FusionEngine>>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> TResult<Self> {
        Ok(Self {
            engine: Arc::new(Mutex::new(FusionEngine::new(config)?)),
        })
    }

    fn lock(&self) -> TResult<MutexGuard<'_, FusionEngine>> {
        self.engine
            .lock()
            .map_err(|_| TelemetryError::Internal("Failed to acquire engine lock".to_string()))
    }

    pub fn start(&self) -> TResult<()> {
        self.lock()?.start()
    }

    pub fn stop(&self) -> TResult<SessionSummary> {
        self.lock()?.stop()
    }

    pub fn reset(&self) -> TResult<()> {
        self.lock()?.reset();
        Ok(())
    }

    pub fn reconfigure(&self, config: EngineConfig) -> TResult<()> {
        self.lock()?.reconfigure(config)
    }

    pub fn is_tracking(&self) -> TResult<bool> {
        Ok(self.lock()?.is_tracking())
    }

    pub fn on_fix_received(&self, fix: LocationFix) -> TResult<()> {
        self.lock()?.on_fix_received(fix);
        Ok(())
    }

    pub fn on_inertial_sample(&self, sample: InertialSample) -> TResult<()> {
        self.lock()?.on_inertial_sample(sample);
        Ok(())
    }

    pub fn on_pressure_sample(&self, sample: PressureSample) -> TResult<()> {
        self.lock()?.on_pressure_sample(sample);
        Ok(())
    }

    pub fn tick(&self) -> TResult<Option<OutputFrame>> {
        Ok(self.lock()?.tick())
    }

    pub fn latest_frame(&self) -> TResult<Option<OutputFrame>> {
        Ok(self.lock()?.latest_frame().cloned())
    }

    pub fn status(&self) -> TResult<TrackerStatus> {
        Ok(self.lock()?.status())
    }

    pub fn set_recording(&self, enabled: bool) -> TResult<()> {
        self.lock()?.set_recording(enabled);
        Ok(())
    }

    pub fn take_recording(&self) -> TResult<Option<SessionLog>> {
        Ok(self.lock()?.take_recording())
    }
}
