//! Arm/disarm state machine.
//!
//! The craft is armed only while both the radio arming switch (`primary_armed`)
//! and the onboard enable (`secondary_armed`) agree. Either one withdrawing
//! consent disarms. After an onboard or forced disarm the radio switch has to be
//! cycled back to neutral before the craft can be armed again.

use crate::config::{FlightConfig, SWITCH_HIGH_US};
use crate::state::{ArmingState, FlightMode, RadioChannelSnapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisarmReason {
    Switch,
    OnboardEnable,
    RadioTimeout,
    SensorFault,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArmingTransition {
    None,
    /// Entered an armed mode; the caller must reset its PID controllers.
    Armed(FlightMode),
    Disarmed(DisarmReason),
    /// Arm conditions held but the sensors are not calibrated.
    Rejected,
}

pub struct ArmingStateMachine {
    state: ArmingState,
    debounce_cycles: u8,
    enable_count: u8,
    enable_debounced: bool,
    rejected_logged: bool,
}

impl ArmingStateMachine {
    pub fn new(config: &FlightConfig) -> Self {
        Self {
            state: ArmingState {
                primary_armed: false,
                secondary_armed: true,
                mode: FlightMode::Disarmed,
            },
            debounce_cycles: config.enable_debounce_cycles.max(1),
            enable_count: 0,
            enable_debounced: false,
            rejected_logged: false,
        }
    }

    pub fn state(&self) -> ArmingState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state.is_armed()
    }

    /// Run one evaluation from this cycle's radio snapshot and onboard enable level.
    pub fn evaluate(
        &mut self,
        radio: &RadioChannelSnapshot,
        onboard_enable: bool,
        calibrated: bool,
    ) -> ArmingTransition {
        let enable_edge = self.debounce(onboard_enable);

        if radio.failsafe {
            return self.force_disarm(DisarmReason::RadioTimeout);
        }

        let switch_high = radio.switch_a > SWITCH_HIGH_US;
        self.state.primary_armed = switch_high;

        if enable_edge && self.state.is_armed() {
            self.state.secondary_armed = false;
        }

        // Re-arm guard: consent comes back only with the switch at neutral.
        if !self.state.secondary_armed && !switch_high {
            self.state.secondary_armed = true;
        }

        if self.state.is_armed() {
            if !self.state.primary_armed {
                return self.disarm(DisarmReason::Switch);
            }
            if !self.state.secondary_armed {
                return self.disarm(DisarmReason::OnboardEnable);
            }
            return ArmingTransition::None;
        }

        if !(self.state.primary_armed && self.state.secondary_armed) {
            self.rejected_logged = false;
            return ArmingTransition::None;
        }

        if !calibrated {
            if !self.rejected_logged {
                warn!("arm rejected: sensors not calibrated");
                self.rejected_logged = true;
            }
            return ArmingTransition::Rejected;
        }

        let mode = if radio.switch_b > SWITCH_HIGH_US {
            FlightMode::ArmedAutoLevel
        } else {
            FlightMode::ArmedAcro
        };
        self.state.mode = mode;
        info!("armed: {}", mode);
        ArmingTransition::Armed(mode)
    }

    /// Disarm regardless of switch position; re-arming then needs a switch cycle.
    pub fn force_disarm(&mut self, reason: DisarmReason) -> ArmingTransition {
        self.state.primary_armed = false;
        self.state.secondary_armed = false;
        if self.state.is_armed() {
            self.disarm(reason)
        } else {
            ArmingTransition::None
        }
    }

    fn disarm(&mut self, reason: DisarmReason) -> ArmingTransition {
        self.state.mode = FlightMode::Disarmed;
        warn!("disarmed: {}", reason);
        ArmingTransition::Disarmed(reason)
    }

    // Rising edge of the enable level after it held for `debounce_cycles` evaluations.
    fn debounce(&mut self, level: bool) -> bool {
        if level {
            self.enable_count = self.enable_count.saturating_add(1);
        } else {
            self.enable_count = 0;
            self.enable_debounced = false;
        }

        if !self.enable_debounced && self.enable_count >= self.debounce_cycles {
            self.enable_debounced = true;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn radio(switch_a: u16, switch_b: u16) -> RadioChannelSnapshot {
        RadioChannelSnapshot {
            throttle: 1000,
            roll: 1500,
            pitch: 1500,
            yaw: 1500,
            switch_a,
            switch_b,
            failsafe: false,
        }
    }

    fn machine() -> ArmingStateMachine {
        ArmingStateMachine::new(&FlightConfig::default())
    }

    /// Hold the enable control long enough for its edge to register.
    fn press(sm: &mut ArmingStateMachine, snap: &RadioChannelSnapshot) -> ArmingTransition {
        let mut last = ArmingTransition::None;
        for _ in 0..FlightConfig::default().enable_debounce_cycles {
            let t = sm.evaluate(snap, true, true);
            if t != ArmingTransition::None {
                last = t;
            }
        }
        last
    }

    #[test]
    fn arms_in_auto_level_with_mode_switch_up() {
        let mut sm = machine();
        assert_eq!(
            sm.evaluate(&radio(1900, 1900), false, true),
            ArmingTransition::Armed(FlightMode::ArmedAutoLevel)
        );
        assert!(sm.state().auto_level());
        assert!(!sm.state().acro_mode());
    }

    #[test]
    fn arms_in_acro_with_mode_switch_down() {
        let mut sm = machine();
        assert_eq!(
            sm.evaluate(&radio(1900, 1000), false, true),
            ArmingTransition::Armed(FlightMode::ArmedAcro)
        );
        assert!(sm.state().acro_mode());
    }

    #[test]
    fn switch_at_threshold_does_not_arm() {
        let mut sm = machine();
        assert_eq!(sm.evaluate(&radio(1500, 1900), false, true), ArmingTransition::None);
        assert!(!sm.is_armed());
    }

    #[test]
    fn mode_is_latched_at_arming() {
        let mut sm = machine();
        sm.evaluate(&radio(1900, 1900), false, true);
        assert_eq!(sm.evaluate(&radio(1900, 1000), false, true), ArmingTransition::None);
        assert!(sm.state().auto_level());
    }

    #[test]
    fn switch_low_disarms_immediately() {
        let mut sm = machine();
        sm.evaluate(&radio(1900, 1000), false, true);
        assert_eq!(
            sm.evaluate(&radio(1500, 1000), false, true),
            ArmingTransition::Disarmed(DisarmReason::Switch)
        );
        assert!(!sm.is_armed());
    }

    #[test]
    fn uncalibrated_arm_is_rejected_without_state_change() {
        let mut sm = machine();
        assert_eq!(sm.evaluate(&radio(1900, 1900), false, false), ArmingTransition::Rejected);
        assert!(!sm.is_armed());
        assert_eq!(sm.state().mode, FlightMode::Disarmed);
        // Calibration arrives later with the switch still up.
        assert_eq!(
            sm.evaluate(&radio(1900, 1900), false, true),
            ArmingTransition::Armed(FlightMode::ArmedAutoLevel)
        );
    }

    #[test]
    fn onboard_enable_disarms_and_blocks_rearm_until_switch_cycles() {
        let mut sm = machine();
        let up = radio(1900, 1000);
        let down = radio(1000, 1000);

        assert_eq!(sm.evaluate(&up, false, true), ArmingTransition::Armed(FlightMode::ArmedAcro));
        assert_eq!(press(&mut sm, &up), ArmingTransition::Disarmed(DisarmReason::OnboardEnable));
        assert!(!sm.state().secondary_armed);

        // Switch stays up: no re-arm, whatever the enable does.
        for _ in 0..50 {
            assert_eq!(sm.evaluate(&up, false, true), ArmingTransition::None);
            assert!(!sm.is_armed());
        }

        assert_eq!(sm.evaluate(&down, false, true), ArmingTransition::None);
        assert!(sm.state().secondary_armed);
        assert_eq!(sm.evaluate(&up, false, true), ArmingTransition::Armed(FlightMode::ArmedAcro));
    }

    #[test]
    fn enable_is_debounced() {
        let mut sm = machine();
        let up = radio(1900, 1000);
        sm.evaluate(&up, false, true);
        // A one-cycle glitch does nothing.
        assert_eq!(sm.evaluate(&up, true, true), ArmingTransition::None);
        assert_eq!(sm.evaluate(&up, false, true), ArmingTransition::None);
        assert!(sm.is_armed());
    }

    #[test]
    fn held_enable_fires_once() {
        let mut sm = machine();
        let up = radio(1900, 1000);
        let down = radio(1000, 1000);
        sm.evaluate(&up, false, true);
        press(&mut sm, &up);
        // Still held through a switch cycle: no new edge, so arming goes through.
        sm.evaluate(&down, true, true);
        assert_eq!(sm.evaluate(&up, true, true), ArmingTransition::Armed(FlightMode::ArmedAcro));
    }

    #[test]
    fn enable_edge_while_disarmed_is_ignored() {
        let mut sm = machine();
        let down = radio(1000, 1000);
        press(&mut sm, &down);
        assert!(sm.state().secondary_armed);
    }

    #[test]
    fn failsafe_disarms_regardless_of_switch() {
        let mut sm = machine();
        sm.evaluate(&radio(1900, 1000), false, true);
        let mut lost = radio(1900, 1000);
        lost.failsafe = true;
        assert_eq!(
            sm.evaluate(&lost, false, true),
            ArmingTransition::Disarmed(DisarmReason::RadioTimeout)
        );
        // Link returns with the switch still up: stays disarmed.
        assert_eq!(sm.evaluate(&radio(1900, 1000), false, true), ArmingTransition::None);
        assert!(!sm.is_armed());
    }

    #[test]
    fn forced_disarm_requires_switch_cycle() {
        let mut sm = machine();
        sm.evaluate(&radio(1900, 1900), false, true);
        assert_eq!(
            sm.force_disarm(DisarmReason::SensorFault),
            ArmingTransition::Disarmed(DisarmReason::SensorFault)
        );
        assert_eq!(sm.evaluate(&radio(1900, 1900), false, true), ArmingTransition::None);
        sm.evaluate(&radio(1000, 1900), false, true);
        assert!(sm.evaluate(&radio(1900, 1900), false, true) != ArmingTransition::None);
    }
}
