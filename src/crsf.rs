//! CRSF (Crossfire / ELRS) RC-channel frame decoding.
//!
//! Frame layout: `[sync] [len] [type] [payload ...] [crc]`, where `len` counts
//! type + payload + crc and the CRC-8 (poly 0xD5) covers type + payload.

use crate::state::RadioChannelSnapshot;

pub const CRSF_SYNC: u8 = 0xC8;
pub const CRSF_FRAMETYPE_RC_CHANNELS_PACKED: u8 = 0x16;
const RC_PAYLOAD_LEN: usize = 22;
const MAX_FRAME_LEN: usize = 64;

/// CRSF tick value at stick center (1500 µs).
pub const CRSF_TICKS_CENTER: u16 = 992;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RcChannels {
    pub channels: [u16; 16], // 11-bit values (0-2047)
}

/// Decoded channels plus the microsecond timestamp they were read off the wire.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RcFrame {
    pub channels: RcChannels,
    pub captured_us: u64,
}

impl RcChannels {
    /// Map AETR + two aux switches onto a snapshot. Channel order:
    /// roll, pitch, throttle, yaw, arm switch, mode switch.
    pub fn to_snapshot(&self) -> RadioChannelSnapshot {
        let ch = |i: usize| ticks_to_us(self.channels[i]);
        RadioChannelSnapshot {
            roll: ch(0),
            pitch: ch(1),
            throttle: ch(2),
            yaw: ch(3),
            switch_a: ch(4),
            switch_b: ch(5),
            failsafe: false,
        }
    }
}

/// 11-bit CRSF ticks to pulse width, `1500 + (ticks - 992) * 5 / 8`.
pub fn ticks_to_us(ticks: u16) -> u16 {
    let us = 1500 + (ticks as i32 - CRSF_TICKS_CENTER as i32) * 5 / 8;
    us.clamp(0, u16::MAX as i32) as u16
}

pub struct CrsfParser {
    buffer: heapless::Vec<u8, MAX_FRAME_LEN>,
}

impl Default for CrsfParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CrsfParser {
    pub fn new() -> Self {
        Self {
            buffer: heapless::Vec::new(),
        }
    }

    pub fn push_byte(&mut self, b: u8) -> Option<RcChannels> {
        if self.buffer.is_empty() {
            if b == CRSF_SYNC {
                let _ = self.buffer.push(b);
            }
            return None;
        }

        if self.buffer.len() == 1 {
            // Type + CRC at least, whole frame must fit the buffer.
            if !(2..=(MAX_FRAME_LEN - 2) as u8).contains(&b) {
                self.buffer.clear();
                if b == CRSF_SYNC {
                    let _ = self.buffer.push(b);
                }
                return None;
            }
            let _ = self.buffer.push(b);
            return None;
        }

        let total_size = 2 + self.buffer[1] as usize;
        if self.buffer.len() < total_size {
            let _ = self.buffer.push(b);
        }
        if self.buffer.len() < total_size {
            return None;
        }

        let frame = self.buffer.as_slice();
        let body = &frame[2..total_size - 1];
        let received_crc = frame[total_size - 1];

        let mut result = None;
        if calc_crc8(body) == received_crc {
            let payload = &body[1..];
            if body[0] == CRSF_FRAMETYPE_RC_CHANNELS_PACKED && payload.len() == RC_PAYLOAD_LEN {
                result = Some(parse_channels(payload));
            }
        } else {
            debug!("crsf: crc mismatch");
        }

        self.buffer.clear();
        result
    }

    /// Feed a chunk, return the newest channel frame in it.
    pub fn push_bytes(&mut self, data: &[u8]) -> Option<RcChannels> {
        let mut last_res = None;
        for &b in data {
            if let Some(res) = self.push_byte(b) {
                last_res = Some(res);
            }
        }
        last_res
    }
}

pub fn calc_crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0;
    for &b in data {
        crc ^= b;
        for _ in 0..8 {
            if (crc & 0x80) != 0 {
                crc = (crc << 1) ^ 0xD5;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// Unpack 16 little-endian 11-bit channels from a 22-byte payload.
fn parse_channels(payload: &[u8]) -> RcChannels {
    let mut channels = [0u16; 16];
    let mut acc: u32 = 0;
    let mut bits = 0;
    let mut bytes = payload.iter();

    for ch in channels.iter_mut() {
        while bits < 11 {
            let Some(&b) = bytes.next() else {
                return RcChannels::default();
            };
            acc |= (b as u32) << bits;
            bits += 8;
        }
        *ch = (acc & 0x07FF) as u16;
        acc >>= 11;
        bits -= 11;
    }

    RcChannels { channels }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(channels: &[u16; 16]) -> [u8; RC_PAYLOAD_LEN] {
        let mut out = [0u8; RC_PAYLOAD_LEN];
        let mut acc: u32 = 0;
        let mut bits = 0;
        let mut idx = 0;
        for &ch in channels {
            acc |= ((ch & 0x07FF) as u32) << bits;
            bits += 11;
            while bits >= 8 {
                out[idx] = acc as u8;
                idx += 1;
                acc >>= 8;
                bits -= 8;
            }
        }
        out
    }

    fn frame(channels: &[u16; 16]) -> [u8; 26] {
        let mut f = [0u8; 26];
        f[0] = CRSF_SYNC;
        f[1] = 24;
        f[2] = CRSF_FRAMETYPE_RC_CHANNELS_PACKED;
        f[3..25].copy_from_slice(&pack(channels));
        f[25] = calc_crc8(&f[2..25]);
        f
    }

    fn sample_channels() -> [u16; 16] {
        let mut ch = [CRSF_TICKS_CENTER; 16];
        ch[2] = 172;
        ch[4] = 1811;
        ch[5] = 191;
        ch[15] = 2047;
        ch
    }

    #[test]
    fn ticks_map_to_microseconds() {
        assert_eq!(ticks_to_us(992), 1500);
        assert_eq!(ticks_to_us(172), 988);
        assert_eq!(ticks_to_us(1811), 2011);
    }

    #[test]
    fn decodes_rc_frame() {
        let mut parser = CrsfParser::new();
        let rc = parser.push_bytes(&frame(&sample_channels())).unwrap();
        assert_eq!(rc.channels, sample_channels());

        let snap = rc.to_snapshot();
        assert_eq!(snap.roll, 1500);
        assert!(snap.throttle < 1000);
        assert!(snap.switch_a > 1500);
        assert!(snap.switch_b <= 1500);
        assert!(!snap.failsafe);
    }

    #[test]
    fn rejects_bad_crc() {
        let mut parser = CrsfParser::new();
        let mut f = frame(&sample_channels());
        f[25] ^= 0xFF;
        assert!(parser.push_bytes(&f).is_none());
        // Parser recovers on the next good frame.
        assert!(parser.push_bytes(&frame(&sample_channels())).is_some());
    }

    #[test]
    fn resyncs_after_garbage() {
        let mut parser = CrsfParser::new();
        let mut stream = [0u8; 30];
        stream[0] = 0x00;
        stream[1] = CRSF_SYNC;
        stream[2] = 0xFF; // bad length
        stream[3] = 0x12;
        stream[4..30].copy_from_slice(&frame(&sample_channels()));
        assert_eq!(
            parser.push_bytes(&stream).map(|rc| rc.channels),
            Some(sample_channels())
        );
    }

    #[test]
    fn ignores_other_frame_types() {
        let mut parser = CrsfParser::new();
        // Link statistics frame, 10-byte payload.
        let mut f = [0u8; 14];
        f[0] = CRSF_SYNC;
        f[1] = 12;
        f[2] = 0x14;
        f[13] = calc_crc8(&f[2..13]);
        assert!(parser.push_bytes(&f).is_none());
    }
}
