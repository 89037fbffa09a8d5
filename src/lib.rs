//! Telemetry fusion for exercise tracking.
//!
//! Irregular GPS fixes and inertial/barometric samples go in; a steady 1 Hz
//! stream of filtered position, altitude, motion analytics, grade and session
//! statistics comes out. See [`engine::FusionEngine`].

pub mod config;
pub mod engine;
pub mod error;
pub mod filters;
pub mod geodesy;
pub mod grade;
pub mod insights;
pub mod motion;
pub mod recording;
pub mod sensors;
pub mod session;
pub mod status;
pub mod types;

pub use config::{EngineConfig, ExerciseType};
pub use engine::{EngineHandle, EngineState, FusionEngine, OutputFrame};
pub use error::{TResult, TelemetryError};
pub use session::{SessionState, SessionSummary};
pub use types::{InertialSample, LocationFix, PressureSample, SensorKind};
