use super::channel::{ChannelCore, ChannelSnapshot};
use super::units::{Envelope, Sweep, SweepResult};
use bit_field::BitField;

const LENGTH_THRESHOLD: u16 = 64;

#[derive(Debug)]
pub struct Pulse {
    core: ChannelCore,
    envelope: Envelope,
    sweep: Option<Sweep>,
    duty: u8,
    period: u16,
}

impl Pulse {
    pub fn new(sweep: bool) -> Self {
        Self {
            core: ChannelCore::new(LENGTH_THRESHOLD),
            envelope: Envelope::new(),
            sweep: sweep.then(Sweep::new),
            duty: 0,
            period: 0,
        }
    }

    pub fn period(&self) -> u16 {
        self.period
    }

    /// Returns the new period when the sweep wrote one back.
    pub fn tick_sweep(&mut self) -> Option<u16> {
        let sweep = self.sweep.as_mut()?;
        if !self.core.enabled {
            return None;
        }

        match sweep.tick(self.period) {
            SweepResult::Idle => None,
            SweepResult::Overflow => {
                log::debug!("sweep overflow from period {:#05x}", self.period);
                self.core.enabled = false;
                None
            }
            SweepResult::Update(period) => {
                self.period = period;
                Some(period)
            }
        }
    }
}

impl super::Channel for Pulse {
    fn tick_len(&mut self) {
        self.core.tick_len();
    }

    fn tick_env(&mut self) {
        self.envelope.tick();
    }

    fn write_reg0(&mut self, data: u8) {
        if let Some(sweep) = self.sweep.as_mut() {
            sweep.load(data);
        }
    }

    fn write_reg1(&mut self, data: u8) {
        self.duty = data.get_bits(6..8);
        self.core.length.load(data.get_bits(0..6));
    }

    fn write_reg2(&mut self, data: u8) {
        self.envelope.load(data);
        self.core.set_dac(data & 0xF8 != 0);
    }

    fn write_reg3(&mut self, data: u8) {
        self.period.set_bits(0..8, data as u16);
    }

    fn write_reg4(&mut self, data: u8) {
        self.period.set_bits(8..11, data.get_bits(0..3) as u16);
        if self.core.write_control(data) {
            self.envelope.restart();
            if let Some(sweep) = self.sweep.as_mut() {
                sweep.restart();
            }
        }
    }

    fn enabled(&self) -> bool {
        self.core.enabled
    }

    fn power_off(&mut self) {
        self.core.power_off();
        self.envelope.load(0);
        if let Some(sweep) = self.sweep.as_mut() {
            sweep.load(0);
        }
        self.duty = 0;
        self.period = 0;
    }

    fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            enabled: self.core.enabled,
            duty: self.duty,
            volume: self.envelope.volume(),
            frequency: 1_048_576.0 / (2048 - self.period) as f32,
            ..Default::default()
        }
    }
}
