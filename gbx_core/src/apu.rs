use bit_field::BitField;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

mod channel;
mod noise;
mod pulse;
mod sampler;
mod units;
mod wave;

pub use channel::ChannelSnapshot;
use channel::SharedChannel;
use noise::{Noise, NoiseRing};
use pulse::Pulse;
pub use sampler::{Frame, Sampler, BUS_COUNT, FRONT_LEFT, FRONT_RIGHT, REAR_LEFT, REAR_RIGHT};
use units::{FrameSequencer, Step};
use wave::Wave;

/// frame sequencer clock (Hz)
pub const FRAME_SEQUENCER_RATE: f64 = 512.0;

const REG_BASE: u16 = 0xFF10;
const NR52: u16 = 0xFF26;
const WAVE_RAM: u16 = 0xFF30;

#[rustfmt::skip]
const READ_MASKS: [u8; 0x20] = [
    0x80, 0x3F, 0x00, 0xFF, 0xBF, // NR10-NR14
    0xFF, 0x3F, 0x00, 0xFF, 0xBF, // NR20-NR24
    0x7F, 0xFF, 0x9F, 0xFF, 0xBF, // NR30-NR34
    0xFF, 0xFF, 0x00, 0x00, 0xBF, // NR40-NR44
    0x00, 0x00, 0x70,             // NR50-NR52
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

trait Channel {
    fn tick_len(&mut self);
    fn tick_env(&mut self) {}

    fn write_reg0(&mut self, data: u8);
    fn write_reg1(&mut self, data: u8);
    fn write_reg2(&mut self, data: u8);
    fn write_reg3(&mut self, data: u8);
    fn write_reg4(&mut self, data: u8);

    fn enabled(&self) -> bool;
    fn power_off(&mut self);

    /// Snapshot without panning.
    fn snapshot(&self) -> ChannelSnapshot;
}

/// State shared with the audio thread.
#[derive(Debug)]
pub(crate) struct SoundContext {
    channels: [SharedChannel; 4],
    /// NR50
    master: AtomicU32,
    wave: Mutex<[f32; 32]>,
    noise: Mutex<NoiseRing>,
}

pub struct Apu {
    ctx: Arc<SoundContext>,
    power: bool,

    sequencer: FrameSequencer,
    pulse1: Pulse,
    pulse2: Pulse,
    wave: Wave,
    noise: Noise,

    regs: [u8; 0x20],
    wave_ram: [u8; 0x10],
    lfsr_clock: f64,
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

impl Apu {
    pub fn new() -> Self {
        let ctx = Arc::new(SoundContext {
            channels: Default::default(),
            master: AtomicU32::new(0),
            wave: Mutex::new([-1.0; 32]),
            noise: Mutex::new(NoiseRing::new()),
        });

        Self {
            ctx,
            power: false,

            sequencer: FrameSequencer::new(),
            pulse1: Pulse::new(true),
            pulse2: Pulse::new(false),
            wave: Wave::new(),
            noise: Noise::new(),

            regs: [0; 0x20],
            wave_ram: [0; 0x10],
            lfsr_clock: 0.0,
        }
    }

    /// Register state the boot ROM leaves behind.
    pub fn post_boot() -> Self {
        let mut apu = Self::new();
        apu.write(0xFF26, 0x80);
        apu.write(0xFF24, 0x77);
        apu.write(0xFF25, 0xF3);
        apu.write(0xFF10, 0x80);
        apu.write(0xFF11, 0xBF);
        apu.write(0xFF12, 0xF3);
        apu.write(0xFF14, 0x3F);
        apu.write(0xFF1A, 0x7F);
        apu.write(0xFF1C, 0x9F);
        apu.write(0xFF1E, 0x3F);
        apu.write(0xFF21, 0x00);
        apu.write(0xFF23, 0x3F);
        apu
    }

    /// A new handle for the audio thread.
    pub fn sampler(&self) -> Sampler {
        Sampler::new(self.ctx.clone())
    }

    pub fn powered(&self) -> bool {
        self.power
    }

    pub fn channel(&self, index: usize) -> ChannelSnapshot {
        self.ctx.channels[index].load()
    }

    /// Advances by `ticks` frame sequencer ticks.
    pub fn advance(&mut self, ticks: u32) {
        if !self.power {
            return;
        }

        for _ in 0..ticks {
            let step = self.sequencer.tick();

            if step.contains(Step::LENGTH) {
                self.pulse1.tick_len();
                self.pulse2.tick_len();
                self.wave.tick_len();
                self.noise.tick_len();
            }
            if step.contains(Step::ENVELOPE) {
                self.pulse1.tick_env();
                self.pulse2.tick_env();
                self.noise.tick_env();
            }
            if step.contains(Step::SWEEP) {
                if let Some(period) = self.pulse1.tick_sweep() {
                    self.regs[0x03] = period as u8;
                    self.regs[0x04].set_bits(0..3, (period >> 8) as u8);
                }
            }

            self.clock_lfsr();
        }

        self.publish_all();
    }

    fn clock_lfsr(&mut self) {
        self.lfsr_clock += self.noise.frequency() as f64 / FRAME_SEQUENCER_RATE;
        let steps = self.lfsr_clock.floor();
        self.lfsr_clock -= steps;

        if !self.noise.enabled() || steps < 1.0 {
            return;
        }

        let mut ring = self.ctx.noise.lock().unwrap_or_else(PoisonError::into_inner);
        for _ in 0..steps as u32 {
            let sample = self.noise.step();
            if !ring.push(sample) {
                break;
            }
        }
    }

    fn publish(&self, index: usize) {
        let mut snapshot = match index {
            0 => self.pulse1.snapshot(),
            1 => self.pulse2.snapshot(),
            2 => self.wave.snapshot(),
            _ => self.noise.snapshot(),
        };
        let nr51 = self.regs[0x15];
        snapshot.right = nr51.get_bit(index);
        snapshot.left = nr51.get_bit(index + 4);

        self.ctx.channels[index].store(snapshot);
    }

    fn publish_all(&self) {
        (0..4).for_each(|i| self.publish(i));
    }

    fn nr52(&self) -> u8 {
        let mut data = 0x70;
        data.set_bit(7, self.power);
        data.set_bit(3, self.noise.enabled());
        data.set_bit(2, self.wave.enabled());
        data.set_bit(1, self.pulse2.enabled());
        data.set_bit(0, self.pulse1.enabled());
        data
    }

    /// PCM12: digital outputs of channels 1 and 2.
    pub fn pcm12(&self) -> u8 {
        let [ch1, ch2] = [self.channel(0), self.channel(1)];
        let level = |s: ChannelSnapshot| if s.enabled { s.volume & 0x0F } else { 0 };
        level(ch1) | level(ch2) << 4
    }

    /// PCM34: digital outputs of channels 3 and 4.
    pub fn pcm34(&self) -> u8 {
        let [ch3, ch4] = [self.channel(2), self.channel(3)];
        let level = |s: ChannelSnapshot| if s.enabled { s.volume & 0x0F } else { 0 };
        level(ch3) | level(ch4) << 4
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            NR52 => self.nr52(),
            0xFF30..=0xFF3F => self.wave_ram[(addr - WAVE_RAM) as usize],
            0xFF10..=0xFF2F => {
                let index = (addr - REG_BASE) as usize;
                self.regs[index] | READ_MASKS[index]
            }
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        match addr {
            NR52 => {
                self.set_power(data.get_bit(7));
                return;
            }
            0xFF30..=0xFF3F => {
                self.write_wave(addr, data);
                return;
            }
            _ if !self.power => {
                log::debug!("apu write {:#06x} while powered off dropped", addr);
                return;
            }
            0xFF10..=0xFF2F => self.regs[(addr - REG_BASE) as usize] = data,
            _ => return,
        }

        match addr {
            0xFF10 => self.pulse1.write_reg0(data),
            0xFF11 => self.pulse1.write_reg1(data),
            0xFF12 => self.pulse1.write_reg2(data),
            0xFF13 => self.pulse1.write_reg3(data),
            0xFF14 => self.pulse1.write_reg4(data),

            0xFF16 => self.pulse2.write_reg1(data),
            0xFF17 => self.pulse2.write_reg2(data),
            0xFF18 => self.pulse2.write_reg3(data),
            0xFF19 => self.pulse2.write_reg4(data),

            0xFF1A => self.wave.write_reg0(data),
            0xFF1B => self.wave.write_reg1(data),
            0xFF1C => self.wave.write_reg2(data),
            0xFF1D => self.wave.write_reg3(data),
            0xFF1E => self.wave.write_reg4(data),

            0xFF20 => self.noise.write_reg1(data),
            0xFF21 => self.noise.write_reg2(data),
            0xFF22 => self.noise.write_reg3(data),
            0xFF23 => self.noise.write_reg4(data),

            0xFF24 => self.ctx.master.store(data as u32, Ordering::Release),
            0xFF25 => {}
            _ => return,
        }

        self.publish_all();
    }

    fn write_wave(&mut self, addr: u16, data: u8) {
        let index = (addr - WAVE_RAM) as usize;
        self.wave_ram[index] = data;

        let mut wave = self.ctx.wave.lock().unwrap_or_else(PoisonError::into_inner);
        wave[index * 2] = (data >> 4) as f32 / 7.5 - 1.0;
        wave[index * 2 + 1] = (data & 0x0F) as f32 / 7.5 - 1.0;
    }

    fn set_power(&mut self, on: bool) {
        if on == self.power {
            return;
        }
        self.power = on;

        if !on {
            self.pulse1.power_off();
            self.pulse2.power_off();
            self.wave.power_off();
            self.noise.power_off();
            self.regs[..(NR52 - REG_BASE) as usize].fill(0);
            self.ctx.master.store(0, Ordering::Release);
            log::debug!("apu powered off");
        } else {
            self.sequencer.reset();
            log::debug!("apu powered on");
        }

        self.publish_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn powered() -> Apu {
        let mut apu = Apu::new();
        apu.write(NR52, 0x80);
        apu
    }

    #[test]
    fn test_read_masks() {
        let mut apu = powered();
        apu.write(0xFF11, 0x85);
        apu.write(0xFF1C, 0x20);
        apu.write(0xFF13, 0x12);

        assert_eq!(apu.read(0xFF11), 0xBF);
        assert_eq!(apu.read(0xFF1C), 0xBF);
        assert_eq!(apu.read(0xFF13), 0xFF);
        assert_eq!(apu.read(0xFF15), 0xFF);
        assert_eq!(apu.read(0xFF27), 0xFF);
        assert_eq!(apu.read(NR52), 0xF0);

        apu.write(0xFF3A, 0x5C);
        assert_eq!(apu.read(0xFF3A), 0x5C);
    }

    #[test]
    fn test_trigger_and_nr52() {
        let mut apu = powered();
        apu.write(0xFF12, 0xF0);
        apu.write(0xFF14, 0x80);
        assert_eq!(apu.read(NR52), 0xF1);
        assert!(apu.channel(0).enabled);

        apu.write(0xFF12, 0x00);
        assert_eq!(apu.read(NR52), 0xF0);
        assert!(!apu.channel(0).enabled);
    }

    #[test]
    fn test_sweep_add() {
        let mut apu = powered();
        apu.write(0xFF10, 0x12);
        apu.write(0xFF12, 0xF0);
        apu.write(0xFF13, 0x00);
        apu.write(0xFF14, 0x81);

        apu.advance(4);
        assert_eq!(apu.pulse1.period(), 0x140);
        assert_eq!(apu.regs[0x03], 0x40);
        assert_eq!(apu.regs[0x04] & 0x07, 0x01);
        assert_eq!(apu.channel(0).frequency, 1_048_576.0 / (2048 - 0x140) as f32);
    }

    #[test]
    fn test_sweep_overflow() {
        let mut apu = powered();
        apu.write(0xFF10, 0x11);
        apu.write(0xFF12, 0xF0);
        apu.write(0xFF13, 0x00);
        apu.write(0xFF14, 0x86);

        apu.advance(4);
        assert_eq!(apu.read(NR52) & 0x01, 0);
        assert_eq!(apu.pulse1.period(), 0x600);
    }

    #[test]
    fn test_length_thresholds() {
        let mut apu = powered();

        apu.write(0xFF12, 0xF0);
        apu.write(0xFF11, 0x00);
        apu.write(0xFF14, 0xC0);

        apu.write(0xFF1A, 0x80);
        apu.write(0xFF1B, 0x00);
        apu.write(0xFF1E, 0xC0);
        assert_eq!(apu.read(NR52) & 0x05, 0x05);

        apu.advance(126);
        assert_eq!(apu.read(NR52) & 0x05, 0x05);
        apu.advance(2);
        assert_eq!(apu.read(NR52) & 0x05, 0x04);

        apu.advance(126);
        assert_eq!(apu.read(NR52) & 0x05, 0x04);
        apu.advance(2);
        assert_eq!(apu.read(NR52) & 0x05, 0x00);
    }

    #[test]
    fn test_envelope_publish() {
        let mut apu = powered();
        apu.write(0xFF17, 0x51);
        apu.write(0xFF19, 0x80);
        assert_eq!(apu.channel(1).volume, 5);

        apu.advance(8);
        assert_eq!(apu.channel(1).volume, 4);
        assert_eq!(apu.pcm12(), 0x40);
    }

    #[test]
    fn test_power_off() {
        let mut apu = powered();
        apu.write(0xFF12, 0xF0);
        apu.write(0xFF14, 0x80);
        apu.write(0xFF24, 0x77);
        apu.write(0xFF30, 0x12);

        apu.write(NR52, 0x00);
        assert_eq!(apu.read(NR52), 0x70);
        assert_eq!(apu.read(0xFF24), 0x00);
        assert_eq!(apu.read(0xFF30), 0x12);

        apu.write(0xFF24, 0x77);
        assert_eq!(apu.read(0xFF24), 0x00);
    }

    #[test]
    fn test_panning() {
        let mut apu = powered();
        apu.write(0xFF25, 0x18);
        let ch4 = apu.channel(3);
        assert!(ch4.right && !ch4.left);
        let ch1 = apu.channel(0);
        assert!(ch1.left && !ch1.right);
    }

    #[test]
    fn test_sampler_buses() {
        let mut apu = powered();
        apu.write(0xFF24, 0x77);
        apu.write(0xFF25, 0x11);
        apu.write(0xFF11, 0x80);
        apu.write(0xFF12, 0xF0);
        apu.write(0xFF14, 0x80);

        let mut sampler = apu.sampler();
        let mut frames = [[0.0; BUS_COUNT]; 64];
        sampler.sample(&mut frames, 48000);

        assert!(frames.iter().all(|f| f[REAR_LEFT] == 0.0 && f[REAR_RIGHT] == 0.0));
        assert!(frames.iter().all(|f| f[FRONT_LEFT] == f[FRONT_RIGHT]));
        assert!(frames.iter().any(|f| f[FRONT_LEFT] != 0.0));

        let mut out = [1.0; 64 * 3];
        sampler.sample_interleaved(&mut out, 3, 48000);
        assert!(out.chunks(3).all(|c| c[2] == 0.0));
    }
}
