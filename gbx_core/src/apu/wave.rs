use super::channel::{ChannelCore, ChannelSnapshot};
use bit_field::BitField;

/// doubled relative to the other channels
const LENGTH_THRESHOLD: u16 = 64 << 1;

/// output level code -> snapshot volume
const VOLUMES: [u8; 4] = [0, 15, 8, 4];

#[derive(Debug)]
pub struct Wave {
    core: ChannelCore,
    level: u8,
    period: u16,
}

impl Wave {
    pub fn new() -> Self {
        Self {
            core: ChannelCore::new(LENGTH_THRESHOLD),
            level: 0,
            period: 0,
        }
    }
}

impl super::Channel for Wave {
    fn tick_len(&mut self) {
        self.core.tick_len();
    }

    fn write_reg0(&mut self, data: u8) {
        self.core.set_dac(data.get_bit(7));
    }

    fn write_reg1(&mut self, data: u8) {
        self.core.length.load(data);
    }

    fn write_reg2(&mut self, data: u8) {
        self.level = data.get_bits(5..7);
    }

    fn write_reg3(&mut self, data: u8) {
        self.period.set_bits(0..8, data as u16);
    }

    fn write_reg4(&mut self, data: u8) {
        self.period.set_bits(8..11, data.get_bits(0..3) as u16);
        self.core.write_control(data);
    }

    fn enabled(&self) -> bool {
        self.core.enabled
    }

    fn power_off(&mut self) {
        self.core.power_off();
        self.level = 0;
        self.period = 0;
    }

    fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            enabled: self.core.enabled,
            volume: VOLUMES[self.level as usize],
            frequency: 2_097_152.0 / (2048 - self.period) as f32,
            ..Default::default()
        }
    }
}
