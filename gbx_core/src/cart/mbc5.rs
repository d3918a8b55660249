use super::RamAccess;
use bit_field::BitField;

pub struct Mbc5 {
    ram_enable: bool,
    rom_bank: usize,
    ram_bank: usize,
}

impl Mbc5 {
    pub fn new() -> Self {
        Self {
            ram_enable: false,
            rom_bank: 1,
            ram_bank: 0,
        }
    }
}

impl super::Mbc for Mbc5 {
    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram_enable = data & 0x0F == 0x0A,
            0x2000..=0x2FFF => self.rom_bank = (self.rom_bank & 0x100) | data as usize,
            0x3000..=0x3FFF => {
                self.rom_bank.set_bit(8, data.get_bit(0));
            }
            0x4000..=0x5FFF => self.ram_bank = data.get_bits(0..4) as usize,
            0x6000..=0x7FFF => {}
            _ => unreachable!(),
        }
    }

    fn romn_bank(&self) -> usize {
        self.rom_bank
    }

    fn ram_access(&self) -> RamAccess {
        if self.ram_enable {
            RamAccess::Bank(self.ram_bank)
        } else {
            RamAccess::Disabled
        }
    }
}
