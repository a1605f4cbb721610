//! Error taxonomy for the stabilization core.
//!
//! Saturation of the motor mixer is deliberately absent here: it is reported
//! through [`crate::state::TelemetryRecord::saturated`] and never interrupts a cycle.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlightError {
    /// IMU bus read failed or produced non-finite data.
    #[error("IMU read failed")]
    SensorFault,

    /// No valid radio frame inside the failsafe window.
    #[error("radio link timed out")]
    RadioTimeout,

    /// Arm requested before a calibration bias was installed.
    #[error("arm rejected: sensors not calibrated")]
    ConfigurationError,

    /// Calibration finished with fewer samples than requested.
    #[error("calibration incomplete: {accepted} of {required} samples")]
    CalibrationIncomplete { accepted: u16, required: u16 },
}

pub type FlightResult<T> = Result<T, FlightError>;
