//! Quad-X mixer with battery sag compensation.
//!
//! Motor layout (top view, front up):
//!
//! ```text
//!   4 (CW)    1 (CCW)
//!        \  /
//!        /  \
//!   3 (CCW)   2 (CW)
//! ```

use crate::config::{
    BATTERY_COMP_DIVISOR, BATTERY_COMP_MAX_CV, BATTERY_COMP_MIN_CV, BATTERY_COMP_REFERENCE_CV,
    ESC_MAX_US, ESC_MIN_ARMED_US, MOTOR_COUNT, THROTTLE_MAX_US,
};
use crate::state::{AxisTriple, MotorCommand};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MixOutput {
    pub command: MotorCommand,
    /// At least one output was clamped. Informational only.
    pub saturated: bool,
}

/// Output scale factor for a battery reading, `None` outside the trusted window.
pub fn battery_compensation(battery_centivolts: u16) -> Option<f32> {
    if battery_centivolts > BATTERY_COMP_MIN_CV && battery_centivolts < BATTERY_COMP_MAX_CV {
        Some((BATTERY_COMP_REFERENCE_CV - battery_centivolts as f32) / BATTERY_COMP_DIVISOR)
    } else {
        None
    }
}

/// Combine throttle and PID corrections into four ESC pulse widths.
///
/// Disarmed, every output is exactly the idle pulse whatever the inputs.
pub fn mix(
    throttle: u16,
    corrections: &AxisTriple,
    armed: bool,
    battery_centivolts: u16,
) -> MixOutput {
    if !armed {
        return MixOutput {
            command: MotorCommand::IDLE,
            saturated: false,
        };
    }

    let finite = |v: f32| if v.is_finite() { v } else { 0.0 };
    let throttle = throttle.min(THROTTLE_MAX_US) as f32;
    let roll = finite(corrections.roll);
    let pitch = finite(corrections.pitch);
    let yaw = finite(corrections.yaw);

    let mut esc: [f32; MOTOR_COUNT] = [
        throttle - pitch + roll - yaw,
        throttle + pitch + roll + yaw,
        throttle + pitch - roll - yaw,
        throttle - pitch - roll + yaw,
    ];

    if let Some(factor) = battery_compensation(battery_centivolts) {
        for out in esc.iter_mut() {
            *out += *out * factor;
        }
    }

    let lo = ESC_MIN_ARMED_US as f32;
    let hi = ESC_MAX_US as f32;
    let mut saturated = false;
    let mut command = MotorCommand::IDLE;
    for (slot, value) in command.esc.iter_mut().zip(esc) {
        if value < lo || value > hi {
            saturated = true;
        }
        *slot = (value.clamp(lo, hi) + 0.5) as u16;
    }

    MixOutput { command, saturated }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ESC_IDLE_US;

    fn corr(roll: f32, pitch: f32, yaw: f32) -> AxisTriple {
        AxisTriple { roll, pitch, yaw }
    }

    #[test]
    fn symmetric_hover_with_compensation() {
        let out = mix(1500, &corr(0.0, 0.0, 0.0), true, 1200);
        assert_eq!(out.command.esc, [1520; 4]);
        assert!(!out.saturated);
    }

    #[test]
    fn disarmed_is_always_idle() {
        for &(t, r, p, y, v) in &[
            (1000u16, 0.0f32, 0.0f32, 0.0f32, 1200u16),
            (2000, 400.0, -400.0, 400.0, 1150),
            (1800, f32::NAN, 1e9, -1e9, 0),
            (0, 0.0, 0.0, 0.0, u16::MAX),
        ] {
            let out = mix(t, &corr(r, p, y), false, v);
            assert_eq!(out.command.esc, [ESC_IDLE_US; 4]);
        }
    }

    #[test]
    fn clamps_at_extremes_without_compensation() {
        let out = mix(1800, &corr(0.0, 500.0, 0.0), true, 1260);
        assert_eq!(out.command.esc[1], 2000);
        assert_eq!(out.command.esc[2], 2000);
        assert_eq!(out.command.esc[0], 1300);
        assert_eq!(out.command.esc[3], 1300);
        assert!(out.saturated);
    }

    #[test]
    fn throttle_is_capped_before_mixing() {
        let out = mix(2000, &corr(0.0, 0.0, 0.0), true, 0);
        assert_eq!(out.command.esc, [1800; 4]);
    }

    #[test]
    fn low_output_is_held_above_stall() {
        let out = mix(1000, &corr(0.0, 0.0, 0.0), true, 0);
        assert_eq!(out.command.esc, [ESC_MIN_ARMED_US; 4]);
        assert!(out.saturated);
    }

    #[test]
    fn quad_x_signs() {
        let out = mix(1500, &corr(10.0, 20.0, 30.0), true, 0);
        assert_eq!(out.command.esc, [1460, 1560, 1480, 1500]);
    }

    #[test]
    fn compensation_window_is_exclusive() {
        assert_eq!(battery_compensation(1100), None);
        assert_eq!(battery_compensation(1260), None);
        assert_eq!(battery_compensation(1240), Some(0.0));
        assert!(battery_compensation(1101).unwrap() > 0.0);
        assert!(battery_compensation(1250).unwrap() < 0.0);
    }

    #[test]
    fn non_finite_correction_is_ignored() {
        let out = mix(1500, &corr(f32::NAN, 0.0, f32::INFINITY), true, 0);
        assert_eq!(out.command.esc, [1500; 4]);
    }
}
