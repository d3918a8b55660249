use bit_field::BitField;

/// Divider bit watched by TIMA for each TAC clock select.
const TAC_MASKS: [u16; 4] = [1 << 9, 1 << 3, 1 << 5, 1 << 7];

/// Free running 16-bit divider plus TIMA/TMA/TAC.
#[derive(Debug)]
pub struct Timer {
    divider: u16,
    tima: u8,
    tma: u8,
    tac: u8,
    signal: bool,
    // TIMA overflowed during the last cycle and reads 0x00
    overflow: bool,
    // TIMA was reloaded from TMA during the current cycle
    reloading: bool,
}

impl Timer {
    pub fn new(divider: u16) -> Self {
        Self {
            divider,
            tima: 0,
            tma: 0,
            tac: 0xF8,
            signal: false,
            overflow: false,
            reloading: false,
        }
    }

    /// Advances one M-cycle. Returns true when the timer interrupt fires.
    pub fn tick(&mut self) -> bool {
        self.reloading = false;

        let mut irq = false;
        if self.overflow {
            self.overflow = false;
            self.reloading = true;
            self.tima = self.tma;
            irq = true;
        }

        self.divider = self.divider.wrapping_add(4);
        self.update_signal();

        irq
    }

    pub fn divider(&self) -> u16 {
        self.divider
    }

    pub fn div(&self) -> u8 {
        (self.divider >> 8) as u8
    }

    pub fn tima(&self) -> u8 {
        self.tima
    }

    pub fn tma(&self) -> u8 {
        self.tma
    }

    pub fn tac(&self) -> u8 {
        self.tac
    }

    pub fn reset_divider(&mut self) {
        self.divider = 0;
        self.update_signal();
    }

    pub fn write_tima(&mut self, data: u8) {
        if self.reloading {
            return;
        }
        self.overflow = false;
        self.tima = data;
    }

    pub fn write_tma(&mut self, data: u8) {
        self.tma = data;
        if self.reloading {
            self.tima = data;
        }
    }

    pub fn write_tac(&mut self, data: u8) {
        self.tac = data | 0xF8;
        self.update_signal();
    }

    fn update_signal(&mut self) {
        let mask = TAC_MASKS[self.tac.get_bits(0..2) as usize];
        let signal = self.tac.get_bit(2) && (self.divider & mask) != 0;

        if self.signal && !signal {
            let (tima, overflow) = self.tima.overflowing_add(1);
            self.tima = tima;
            self.overflow |= overflow;
        }
        self.signal = signal;
    }
}
