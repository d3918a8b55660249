use super::RamAccess;

/// ROM only cartridge, optionally with always-on RAM.
pub struct Mbc0 {
    ram: bool,
}

impl Mbc0 {
    pub fn new(ram: bool) -> Self {
        Self { ram }
    }
}

impl super::Mbc for Mbc0 {
    fn write(&mut self, addr: u16, data: u8) {
        log::debug!("write {:#04x} to rom at {:#06x} ignored", data, addr);
    }

    fn romn_bank(&self) -> usize {
        1
    }

    fn ram_access(&self) -> RamAccess {
        if self.ram {
            RamAccess::Bank(0)
        } else {
            RamAccess::Disabled
        }
    }
}
