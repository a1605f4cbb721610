pub mod icm42688;
pub mod pwm;
