use bit_field::BitField;

#[derive(Debug, PartialEq, Eq)]
pub enum SweepResult {
    Idle,
    Update(u16),
    Overflow,
}

/// Channel 1 frequency sweep driven by NR10.
#[derive(Debug, Default)]
pub struct Sweep {
    pace: u8,
    subtract: bool,
    step: u8,
    counter: u8,
}

impl Sweep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, data: u8) {
        self.pace = data.get_bits(4..7);
        self.subtract = data.get_bit(3);
        self.step = data.get_bits(0..3);
    }

    pub fn restart(&mut self) {
        self.counter = 0;
    }

    pub fn tick(&mut self, period: u16) -> SweepResult {
        if self.pace == 0 {
            return SweepResult::Idle;
        }

        self.counter += 1;
        if self.counter < self.pace {
            return SweepResult::Idle;
        }
        self.counter = 0;

        let delta = period >> self.step;
        let next = if self.subtract {
            period as i32 - delta as i32
        } else {
            period as i32 + delta as i32
        };

        if next > 0x7FF {
            SweepResult::Overflow
        } else if next < 1 {
            SweepResult::Idle
        } else {
            SweepResult::Update(next as u16)
        }
    }
}
