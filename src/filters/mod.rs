pub mod altitude;
pub mod kalman;
pub mod position;

pub use altitude::{AltitudeBlender, AltitudeFilter, BarometricAltimeter};
pub use kalman::KalmanState;
pub use position::{FilteredPosition, PositionFilter};
