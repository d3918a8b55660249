use super::RamAccess;
use bit_field::BitField;

#[derive(Debug, PartialEq, Eq)]
enum BankMode {
    Simple,
    Advanced,
}

pub struct Mbc1 {
    ram_enable: bool,
    bank_low: usize,
    bank_high: usize,
    mode: BankMode,
}

impl Mbc1 {
    pub fn new() -> Self {
        Self {
            ram_enable: false,
            bank_low: 1,
            bank_high: 0,
            mode: BankMode::Simple,
        }
    }
}

impl super::Mbc for Mbc1 {
    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram_enable = data & 0x0F == 0x0A,
            0x2000..=0x3FFF => {
                self.bank_low = match data.get_bits(0..5) {
                    0 => 1,
                    n => n as usize,
                };
            }
            0x4000..=0x5FFF => self.bank_high = data.get_bits(0..2) as usize,
            0x6000..=0x7FFF => {
                self.mode = if data.get_bit(0) {
                    BankMode::Advanced
                } else {
                    BankMode::Simple
                };
            }
            _ => unreachable!(),
        }
    }

    fn rom0_bank(&self) -> usize {
        match self.mode {
            BankMode::Simple => 0,
            BankMode::Advanced => self.bank_high << 5,
        }
    }

    fn romn_bank(&self) -> usize {
        self.bank_high << 5 | self.bank_low
    }

    fn ram_access(&self) -> RamAccess {
        if !self.ram_enable {
            return RamAccess::Disabled;
        }
        match self.mode {
            BankMode::Simple => RamAccess::Bank(0),
            BankMode::Advanced => RamAccess::Bank(self.bank_high),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Mbc;
    use super::*;

    #[test]
    fn test_rom_banking() {
        let mut mbc = Mbc1::new();
        assert_eq!(mbc.romn_bank(), 1);

        mbc.write(0x2000, 0x00);
        assert_eq!(mbc.romn_bank(), 1);

        mbc.write(0x2100, 0xE5);
        assert_eq!(mbc.romn_bank(), 0x05);

        mbc.write(0x4000, 0x02);
        assert_eq!(mbc.romn_bank(), 0x45);
        assert_eq!(mbc.rom0_bank(), 0);

        mbc.write(0x6000, 0x01);
        assert_eq!(mbc.rom0_bank(), 0x40);
    }

    #[test]
    fn test_ram_banking() {
        let mut mbc = Mbc1::new();
        assert_eq!(mbc.ram_access(), RamAccess::Disabled);

        mbc.write(0x0000, 0x0A);
        mbc.write(0x4000, 0x03);
        assert_eq!(mbc.ram_access(), RamAccess::Bank(0));

        mbc.write(0x6000, 0x01);
        assert_eq!(mbc.ram_access(), RamAccess::Bank(3));

        mbc.write(0x1000, 0x00);
        assert_eq!(mbc.ram_access(), RamAccess::Disabled);
    }
}
