//! Radio link supervision.
//!
//! The capture side (interrupt, DMA or parser task) stamps every decoded frame
//! when it comes off the wire; the control loop feeds it in with that stamp and
//! asks for the snapshot valid now. A frame that sat in a queue is judged by
//! its capture time, never by when it was picked up.
//! A link that stays silent longer than the timeout yields the failsafe
//! snapshot, which always disarms.

use crate::state::RadioChannelSnapshot;

pub struct RadioWatchdog {
    timeout_us: u64,
    last: Option<(RadioChannelSnapshot, u64)>,
    in_failsafe: bool,
}

impl RadioWatchdog {
    pub fn new(timeout_us: u64) -> Self {
        Self {
            timeout_us,
            last: None,
            in_failsafe: true,
        }
    }

    /// Frames captured before the one already held are dropped.
    pub fn feed(&mut self, snapshot: RadioChannelSnapshot, captured_us: u64) {
        if matches!(self.last, Some((_, held)) if held > captured_us) {
            return;
        }
        self.last = Some((snapshot, captured_us));
    }

    pub fn snapshot(&mut self, now_us: u64) -> RadioChannelSnapshot {
        let fresh = match self.last {
            Some((snap, at)) if !snap.failsafe && now_us.saturating_sub(at) <= self.timeout_us => {
                Some(snap)
            }
            _ => None,
        };

        match fresh {
            Some(snap) => {
                if self.in_failsafe {
                    info!("radio link up");
                    self.in_failsafe = false;
                }
                snap
            }
            None => {
                if !self.in_failsafe {
                    warn!("radio failsafe: no frame for {} us", self.timeout_us);
                    self.in_failsafe = true;
                }
                RadioChannelSnapshot::failsafe()
            }
        }
    }

    pub fn in_failsafe(&self) -> bool {
        self.in_failsafe
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live() -> RadioChannelSnapshot {
        RadioChannelSnapshot {
            throttle: 1200,
            roll: 1500,
            pitch: 1500,
            yaw: 1500,
            switch_a: 1900,
            switch_b: 1000,
            failsafe: false,
        }
    }

    #[test]
    fn starts_in_failsafe() {
        let mut wd = RadioWatchdog::new(200_000);
        assert!(wd.snapshot(0).failsafe);
        assert!(wd.in_failsafe());
    }

    #[test]
    fn fresh_frame_passes_through() {
        let mut wd = RadioWatchdog::new(200_000);
        wd.feed(live(), 1_000);
        assert_eq!(wd.snapshot(150_000), live());
        assert!(!wd.in_failsafe());
    }

    #[test]
    fn stale_frame_becomes_failsafe() {
        let mut wd = RadioWatchdog::new(200_000);
        wd.feed(live(), 1_000);
        assert_eq!(wd.snapshot(201_000), live());
        let snap = wd.snapshot(201_001);
        assert!(snap.failsafe);
        assert!(snap.switch_a <= 1500);
        assert_eq!(snap.throttle, 1000);
    }

    #[test]
    fn frame_picked_up_late_is_judged_by_capture_time() {
        let mut wd = RadioWatchdog::new(200_000);
        // Captured just after boot, only drained once calibration is over.
        wd.feed(live(), 10_000);
        let snap = wd.snapshot(8_000_000);
        assert!(snap.failsafe);
        assert!(snap.switch_a <= 1500);
    }

    #[test]
    fn older_frame_does_not_replace_newer_one() {
        let mut wd = RadioWatchdog::new(200_000);
        let mut newer = live();
        newer.switch_a = 1000;
        wd.feed(newer, 300_000);
        wd.feed(live(), 100_000);
        assert_eq!(wd.snapshot(350_000), newer);
    }

    #[test]
    fn link_recovers_on_new_frame() {
        let mut wd = RadioWatchdog::new(200_000);
        wd.feed(live(), 0);
        assert!(wd.snapshot(500_000).failsafe);
        wd.feed(live(), 500_000);
        assert!(!wd.snapshot(500_100).failsafe);
    }
}
