//! Flight-stabilization core of a quad-X multirotor.
//!
//! Raw IMU samples and radio snapshots go in, ESC pulse trains come out:
//!
//! ```text
//! RawImuSample ─► AttitudeEstimator ─┐
//! RadioChannelSnapshot ─► Arming ────┼─► FlightController ─► AxisPid ×3 ─► mixer ─► PulseTrain
//! battery centivolts ────────────────┘
//! ```
//!
//! Board specifics stay behind [`FlightPlatform`], [`PulseChannelDriver`] and
//! [`TelemetrySink`]; [`ControlLoop`] ties them together into the real-time loop.
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod arming;
pub mod attitude;
pub mod calibration;
pub mod config;
pub mod control_loop;
pub mod crsf;
pub mod error;
pub mod filter;
pub mod flight;
pub mod mixer;
pub mod pid;
pub mod pulse;
pub mod radio;
pub mod state;

pub use control_loop::{ControlLoop, CycleReport, FlightPlatform, TelemetrySink};
pub use error::{FlightError, FlightResult};
pub use flight::{CycleInput, FlightContext, FlightController};
pub use pulse::{PulseChannelDriver, PulseReport, PulseTrain};
