use bit_field::BitField;

/// Volume envelope driven by NRx2.
#[derive(Debug, Default)]
pub struct Envelope {
    initial: u8,
    increase: bool,
    pace: u8,
    counter: u8,
    volume: u8,
}

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, data: u8) {
        self.initial = data.get_bits(4..8);
        self.increase = data.get_bit(3);
        self.pace = data.get_bits(0..3);
        self.volume = self.initial;
        self.counter = 0;
    }

    pub fn restart(&mut self) {
        self.volume = self.initial;
        self.counter = 0;
    }

    /// Returns true when the volume changed.
    pub fn tick(&mut self) -> bool {
        if self.pace == 0 {
            return false;
        }

        self.counter += 1;
        if self.counter < self.pace {
            return false;
        }
        self.counter = 0;

        match self.increase {
            true if self.volume < 15 => self.volume += 1,
            false if self.volume > 0 => self.volume -= 1,
            _ => return false,
        }
        true
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }
}
