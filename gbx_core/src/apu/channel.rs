use super::units::LengthTimer;
use std::sync::atomic::{AtomicU64, Ordering};

/// What the sampler needs to know about one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelSnapshot {
    pub enabled: bool,
    pub left: bool,
    pub right: bool,
    pub duty: u8,
    /// 0..=15
    pub volume: u8,
    pub frequency: f32,
}

impl ChannelSnapshot {
    fn pack(&self) -> u64 {
        (self.enabled as u64)
            | (self.left as u64) << 1
            | (self.right as u64) << 2
            | ((self.duty & 0x03) as u64) << 3
            | (self.volume as u64) << 8
            | (self.frequency.to_bits() as u64) << 32
    }

    fn unpack(bits: u64) -> Self {
        Self {
            enabled: bits & 0x01 != 0,
            left: bits & 0x02 != 0,
            right: bits & 0x04 != 0,
            duty: ((bits >> 3) & 0x03) as u8,
            volume: (bits >> 8) as u8,
            frequency: f32::from_bits((bits >> 32) as u32),
        }
    }
}

/// Single-word cross-thread view of a channel.
#[derive(Debug, Default)]
pub struct SharedChannel(AtomicU64);

impl SharedChannel {
    pub fn load(&self) -> ChannelSnapshot {
        ChannelSnapshot::unpack(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, snapshot: ChannelSnapshot) {
        self.0.store(snapshot.pack(), Ordering::Release);
    }
}

/// State every channel shares.
#[derive(Debug)]
pub struct ChannelCore {
    pub enabled: bool,
    pub dac: bool,
    pub length: LengthTimer,
}

impl ChannelCore {
    pub fn new(length_threshold: u16) -> Self {
        Self {
            enabled: false,
            dac: false,
            length: LengthTimer::new(length_threshold),
        }
    }

    pub fn set_dac(&mut self, on: bool) {
        self.dac = on;
        if !on {
            self.enabled = false;
        }
    }

    /// Handles the length enable and trigger bits of NRx4.
    pub fn write_control(&mut self, data: u8) -> bool {
        self.length.set_enabled(data & 0x40 != 0);

        let trigger = data & 0x80 != 0;
        if trigger {
            self.length.trigger();
            self.enabled = self.dac;
        }
        trigger
    }

    /// Length only counts while the channel plays.
    pub fn tick_len(&mut self) {
        if self.enabled && self.length.tick() {
            self.enabled = false;
        }
    }

    pub fn power_off(&mut self) {
        self.enabled = false;
        self.dac = false;
        self.length.reset();
    }
}
