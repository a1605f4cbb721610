/// First-order low-pass, seeded with the first sample.
pub struct LowPassFilter {
    alpha: f32,
    last_output: f32,
    initialized: bool,
}

impl LowPassFilter {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            last_output: 0.0,
            initialized: false,
        }
    }

    pub fn filter(&mut self, input: f32) -> f32 {
        if !self.initialized {
            self.last_output = input;
            self.initialized = true;
        } else {
            self.last_output = self.alpha * input + (1.0 - self.alpha) * self.last_output;
        }
        self.last_output
    }

    pub fn reset(&mut self) {
        self.initialized = false;
        self.last_output = 0.0;
    }
}

/// Fixed-weight blend of a gyro-integrated angle and an absolute accelerometer angle.
///
/// The first accelerometer reading seeds the angle directly; after that every
/// correction is `angle * gyro_weight + accel * (1 - gyro_weight)`.
pub struct ComplementaryFilter {
    gyro_weight: f32,
    angle: f32,
    initialized: bool,
}

impl ComplementaryFilter {
    pub fn new(gyro_weight: f32) -> Self {
        Self {
            gyro_weight: gyro_weight.clamp(0.0, 1.0),
            angle: 0.0,
            initialized: false,
        }
    }

    /// Integrate a gyro step (degrees) into the angle.
    pub fn propagate(&mut self, delta: f32) {
        self.angle += delta;
    }

    /// Add an already-computed offset, used for cross-axis yaw coupling.
    pub fn shift(&mut self, offset: f32) {
        self.angle += offset;
    }

    pub fn correct(&mut self, accel_angle: f32) -> f32 {
        if !self.initialized {
            self.angle = accel_angle;
            self.initialized = true;
        } else {
            self.angle = self.angle * self.gyro_weight + accel_angle * (1.0 - self.gyro_weight);
        }
        self.angle
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn is_seeded(&self) -> bool {
        self.initialized
    }

    pub fn reset(&mut self) {
        self.angle = 0.0;
        self.initialized = false;
    }
}
