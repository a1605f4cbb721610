use crate::config::PidGains;

/// Single-axis PID with integral and output clamped to the same limits.
pub struct AxisPid {
    kp: f32,
    ki: f32,
    kd: f32,
    min_limit: f32,
    max_limit: f32,
    setpoint: f32,
    integral: f32,
    last_error: f32,
    last_output: f32,
}

impl AxisPid {
    pub fn new(gains: PidGains) -> Self {
        let (min_limit, max_limit) = if gains.min_limit <= gains.max_limit {
            (gains.min_limit, gains.max_limit)
        } else {
            (gains.max_limit, gains.min_limit)
        };
        Self {
            kp: gains.kp,
            ki: gains.ki,
            kd: gains.kd,
            min_limit,
            max_limit,
            setpoint: 0.0,
            integral: 0.0,
            last_error: 0.0,
            last_output: 0.0,
        }
    }

    /// Clear the integrator and derivative memory. Call on arming, never in flight.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
        self.last_output = 0.0;
    }

    /// Non-finite setpoints are ignored.
    pub fn set_setpoint(&mut self, value: f32) {
        if value.is_finite() {
            self.setpoint = value;
        }
    }

    pub fn setpoint(&self) -> f32 {
        self.setpoint
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn update(&mut self, measurement: f32) -> f32 {
        if !measurement.is_finite() {
            return self.last_output;
        }

        let error = self.setpoint - measurement;

        self.integral += self.ki * error;
        self.integral = self.integral.clamp(self.min_limit, self.max_limit);

        let output = self.kp * error + self.integral + self.kd * (error - self.last_error);
        let output = output.clamp(self.min_limit, self.max_limit);

        self.last_error = error;
        self.last_output = output;
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(kp: f32, ki: f32, kd: f32) -> AxisPid {
        AxisPid::new(PidGains::new(kp, ki, kd, 400.0))
    }

    #[test]
    fn proportional_only() {
        let mut p = pid(2.0, 0.0, 0.0);
        p.set_setpoint(10.0);
        assert_eq!(p.update(4.0), 12.0);
    }

    #[test]
    fn derivative_acts_on_error_change() {
        let mut p = pid(0.0, 0.0, 1.0);
        p.set_setpoint(5.0);
        assert_eq!(p.update(0.0), 5.0);
        assert_eq!(p.update(0.0), 0.0);
        assert_eq!(p.update(2.0), -2.0);
    }

    #[test]
    fn integral_never_exceeds_clamp() {
        let mut p = pid(0.0, 50.0, 0.0);
        p.set_setpoint(1000.0);
        for _ in 0..1000 {
            p.update(0.0);
            assert!(p.integral() <= 400.0);
            assert!(p.integral() >= -400.0);
        }
        assert_eq!(p.integral(), 400.0);

        p.set_setpoint(-1000.0);
        for _ in 0..1000 {
            p.update(0.0);
        }
        assert_eq!(p.integral(), -400.0);
    }

    #[test]
    fn wound_up_integral_unwinds_immediately() {
        let mut p = pid(0.0, 1.0, 0.0);
        p.set_setpoint(1000.0);
        for _ in 0..100 {
            p.update(0.0);
        }
        p.set_setpoint(0.0);
        // Clamped at 400, so one cycle of -100 error brings it to 300.
        assert_eq!(p.update(100.0), 300.0);
    }

    #[test]
    fn output_is_clamped() {
        let mut p = pid(10.0, 0.0, 0.0);
        p.set_setpoint(100.0);
        assert_eq!(p.update(0.0), 400.0);
        p.set_setpoint(-100.0);
        assert_eq!(p.update(0.0), -400.0);
    }

    #[test]
    fn nan_measurement_holds_previous_output() {
        let mut p = pid(1.0, 0.1, 0.0);
        p.set_setpoint(10.0);
        let out = p.update(0.0);
        let integral = p.integral();
        assert_eq!(p.update(f32::NAN), out);
        assert_eq!(p.integral(), integral);
    }

    #[test]
    fn nan_setpoint_is_ignored() {
        let mut p = pid(1.0, 0.0, 0.0);
        p.set_setpoint(3.0);
        p.set_setpoint(f32::NAN);
        assert_eq!(p.setpoint(), 3.0);
    }

    #[test]
    fn reset_clears_memory() {
        let mut p = pid(0.0, 1.0, 1.0);
        p.set_setpoint(50.0);
        p.update(0.0);
        p.reset();
        assert_eq!(p.integral(), 0.0);
        // Fresh derivative: the full error shows up again.
        assert_eq!(p.update(0.0), 50.0 + 50.0);
    }
}
