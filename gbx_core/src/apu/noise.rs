use super::channel::{ChannelCore, ChannelSnapshot};
use super::units::Envelope;
use bit_field::BitField;

const LENGTH_THRESHOLD: u16 = 64;

pub const NOISE_RING_SIZE: usize = 16384;

/// LFSR output shared with the sampler.
#[derive(Debug)]
pub struct NoiseRing {
    samples: Box<[f32]>,
    read: usize,
    write: usize,
}

impl NoiseRing {
    pub fn new() -> Self {
        Self {
            samples: vec![0.0; NOISE_RING_SIZE].into_boxed_slice(),
            read: 0,
            write: 1,
        }
    }

    /// Returns false when the ring is full and the sample was dropped.
    pub fn push(&mut self, sample: f32) -> bool {
        if self.write == self.read {
            return false;
        }
        self.samples[self.write] = sample;
        self.write = (self.write + 1) % NOISE_RING_SIZE;
        true
    }

    pub fn current(&self) -> f32 {
        self.samples[self.read]
    }

    /// Moves to the next sample, holding the last one when the ring runs dry.
    pub fn advance(&mut self) {
        let next = (self.read + 1) % NOISE_RING_SIZE;
        if next != self.write {
            self.read = next;
        }
    }
}

#[derive(Debug)]
pub struct Noise {
    core: ChannelCore,
    envelope: Envelope,
    shift: u8,
    narrow: bool,
    divider: u8,
    lfsr: u16,
}

impl Noise {
    pub fn new() -> Self {
        Self {
            core: ChannelCore::new(LENGTH_THRESHOLD),
            envelope: Envelope::new(),
            shift: 0,
            narrow: false,
            divider: 0,
            lfsr: 0xFFFF,
        }
    }

    /// LFSR clock in Hz.
    pub fn frequency(&self) -> f32 {
        let divider = if self.divider == 0 {
            0.5
        } else {
            self.divider as f32
        };
        262_144.0 / (divider * (1u32 << self.shift) as f32)
    }

    /// Advances the LFSR and returns the resulting sample.
    pub fn step(&mut self) -> f32 {
        let next = (self.lfsr.get_bit(0)) ^ (self.lfsr.get_bit(1));
        self.lfsr.set_bit(15, next);
        if self.narrow {
            self.lfsr.set_bit(7, next);
        }
        self.lfsr >>= 1;

        if self.lfsr.get_bit(0) {
            1.0
        } else {
            -1.0
        }
    }
}

impl super::Channel for Noise {
    fn tick_len(&mut self) {
        self.core.tick_len();
    }

    fn tick_env(&mut self) {
        self.envelope.tick();
    }

    fn write_reg0(&mut self, _data: u8) {}

    fn write_reg1(&mut self, data: u8) {
        self.core.length.load(data.get_bits(0..6));
    }

    fn write_reg2(&mut self, data: u8) {
        self.envelope.load(data);
        self.core.set_dac(data & 0xF8 != 0);
    }

    fn write_reg3(&mut self, data: u8) {
        self.shift = data.get_bits(4..8);
        self.narrow = data.get_bit(3);
        self.divider = data.get_bits(0..3);
    }

    fn write_reg4(&mut self, data: u8) {
        if self.core.write_control(data) {
            self.envelope.restart();
            self.lfsr = 0xFFFF;
        }
    }

    fn enabled(&self) -> bool {
        self.core.enabled
    }

    fn power_off(&mut self) {
        self.core.power_off();
        self.envelope.load(0);
        self.shift = 0;
        self.narrow = false;
        self.divider = 0;
    }

    fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            enabled: self.core.enabled,
            volume: self.envelope.volume(),
            frequency: self.frequency(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Channel;
    use super::*;

    #[test]
    fn test_frequency() {
        let mut noise = Noise::new();
        assert_eq!(noise.frequency(), 524_288.0);

        noise.write_reg3(0x23);
        assert_eq!(noise.frequency(), 262_144.0 / 12.0);
    }

    #[test]
    fn test_lfsr_sequence() {
        let mut noise = Noise::new();
        noise.write_reg3(0x08);

        let samples = (0..8).map(|_| noise.step()).collect::<Vec<_>>();
        assert!(samples.iter().all(|&s| s == 1.0 || s == -1.0));
        assert_eq!(samples[0], 1.0);

        // all ones feed back zeros
        noise.write_reg2(0xF0);
        noise.write_reg4(0x80);
        assert!(noise.enabled());
        noise.step();
        assert_eq!(noise.lfsr, 0x3FBF);
    }

    #[test]
    fn test_ring_full_and_dry() {
        let mut ring = NoiseRing::new();
        let mut pushed = 0;
        while ring.push(1.0) {
            pushed += 1;
        }
        assert_eq!(pushed, NOISE_RING_SIZE - 1);

        ring.advance();
        assert_eq!(ring.current(), 1.0);
        assert!(ring.push(-1.0));
        assert!(!ring.push(-1.0));

        for _ in 0..NOISE_RING_SIZE * 2 {
            ring.advance();
        }
        assert_eq!(ring.current(), -1.0);
    }
}
