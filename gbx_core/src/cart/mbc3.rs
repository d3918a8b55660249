use super::RamAccess;
use bit_field::BitField;

const RTC_REGS: usize = 5;

/// MBC3. The clock registers are latched storage, they do not count.
pub struct Mbc3 {
    ram_enable: bool,
    rom_bank: usize,
    ram_select: u8,
    rtc: bool,
    rtc_regs: [u8; RTC_REGS],
    rtc_latched: [u8; RTC_REGS],
    latch_armed: bool,
}

impl Mbc3 {
    pub fn new(rtc: bool) -> Self {
        Self {
            ram_enable: false,
            rom_bank: 1,
            ram_select: 0,
            rtc,
            rtc_regs: [0; RTC_REGS],
            rtc_latched: [0; RTC_REGS],
            latch_armed: false,
        }
    }
}

impl super::Mbc for Mbc3 {
    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram_enable = data & 0x0F == 0x0A,
            0x2000..=0x3FFF => {
                self.rom_bank = match data.get_bits(0..7) {
                    0 => 1,
                    n => n as usize,
                };
            }
            0x4000..=0x5FFF => self.ram_select = data,
            0x6000..=0x7FFF => {
                if self.latch_armed && data == 0x01 {
                    self.rtc_latched = self.rtc_regs;
                    log::debug!("rtc latched {:?}", self.rtc_latched);
                }
                self.latch_armed = data == 0x00;
            }
            _ => unreachable!(),
        }
    }

    fn romn_bank(&self) -> usize {
        self.rom_bank
    }

    fn ram_access(&self) -> RamAccess {
        if !self.ram_enable {
            return RamAccess::Disabled;
        }
        match self.ram_select {
            0x00..=0x07 => RamAccess::Bank(self.ram_select as usize & 0x03),
            0x08..=0x0C if self.rtc => RamAccess::Rtc(self.ram_select - 0x08),
            _ => RamAccess::Disabled,
        }
    }

    fn read_rtc(&self, reg: u8) -> u8 {
        self.rtc_latched[reg as usize]
    }

    fn write_rtc(&mut self, reg: u8, data: u8) {
        self.rtc_regs[reg as usize] = data;
    }
}
