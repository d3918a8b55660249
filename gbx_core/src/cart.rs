use crate::bus::Variant;
use std::fmt;

mod mbc0;
mod mbc1;
mod mbc3;
mod mbc5;

const HEADER_END: usize = 0x150;
const TITLE: std::ops::Range<usize> = 0x134..0x144;
const CGB_FLAG: usize = 0x143;
const CART_TYPE: usize = 0x147;
const ROM_SIZE: usize = 0x148;
const RAM_SIZE: usize = 0x149;

pub const DMG_BOOT_ROM_SIZE: usize = 0x100;
pub const CGB_BOOT_ROM_SIZE: usize = 0x900;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    HeaderTooShort(usize),
    UnsupportedCartridge(u8),
    UnsupportedRomSize(u8),
    UnsupportedRamSize(u8),
    TruncatedRom { expected: usize, actual: usize },
    BootRomSize(usize),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::HeaderTooShort(len) => {
                write!(f, "rom of {} bytes has no complete header", len)
            }
            LoadError::UnsupportedCartridge(code) => {
                write!(f, "unsupported cartridge type {:#04x}", code)
            }
            LoadError::UnsupportedRomSize(code) => write!(f, "unsupported rom size {:#04x}", code),
            LoadError::UnsupportedRamSize(code) => write!(f, "unsupported ram size {:#04x}", code),
            LoadError::TruncatedRom { expected, actual } => {
                write!(f, "rom declares {} bytes but has {}", expected, actual)
            }
            LoadError::BootRomSize(len) => write!(f, "boot rom of {} bytes", len),
        }
    }
}

impl std::error::Error for LoadError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbcKind {
    RomOnly,
    Mbc1,
    Mbc3,
    Mbc5,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartridgeInfo {
    pub title: String,
    pub variant: Variant,
    pub mbc: MbcKind,
    pub battery: bool,
    pub ram: bool,
    pub rtc: bool,
    pub rom_size_code: u8,
    pub ram_size_code: u8,
    /// DMG cartridge booted by CGB hardware
    pub cgb_compatibility: bool,
}

impl CartridgeInfo {
    fn parse(rom: &[u8]) -> Result<Self, LoadError> {
        if rom.len() < HEADER_END {
            return Err(LoadError::HeaderTooShort(rom.len()));
        }

        let cart_type = rom[CART_TYPE];
        let (mbc, ram, battery, rtc) = match cart_type {
            0x00 => (MbcKind::RomOnly, false, false, false),
            0x08 => (MbcKind::RomOnly, true, false, false),
            0x09 => (MbcKind::RomOnly, true, true, false),
            0x01 => (MbcKind::Mbc1, false, false, false),
            0x02 => (MbcKind::Mbc1, true, false, false),
            0x03 => (MbcKind::Mbc1, true, true, false),
            0x0F => (MbcKind::Mbc3, false, true, true),
            0x10 => (MbcKind::Mbc3, true, true, true),
            0x11 => (MbcKind::Mbc3, false, false, false),
            0x12 => (MbcKind::Mbc3, true, false, false),
            0x13 => (MbcKind::Mbc3, true, true, false),
            0x19 | 0x1C => (MbcKind::Mbc5, false, false, false),
            0x1A | 0x1D => (MbcKind::Mbc5, true, false, false),
            0x1B | 0x1E => (MbcKind::Mbc5, true, true, false),
            _ => return Err(LoadError::UnsupportedCartridge(cart_type)),
        };

        let variant = match rom[CGB_FLAG] {
            0x80 | 0xC0 => Variant::Cgb,
            _ => Variant::Dmg,
        };
        let title_end = match variant {
            Variant::Cgb => TITLE.end - 1,
            Variant::Dmg => TITLE.end,
        };
        let title = rom[TITLE.start..title_end]
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| if c.is_ascii_graphic() || c == b' ' { c as char } else { '?' })
            .collect::<String>()
            .trim_end()
            .to_string();

        Ok(Self {
            title,
            variant,
            mbc,
            battery,
            ram,
            rtc,
            rom_size_code: rom[ROM_SIZE],
            ram_size_code: rom[RAM_SIZE],
            cgb_compatibility: false,
        })
    }

    /// Number of 16 KiB ROM banks declared by the header.
    pub fn rom_banks(&self) -> Result<usize, LoadError> {
        match self.rom_size_code {
            code @ 0x00..=0x08 => Ok(2 << code),
            code => Err(LoadError::UnsupportedRomSize(code)),
        }
    }

    /// Number of 8 KiB RAM banks declared by the header.
    pub fn ram_banks(&self) -> Result<usize, LoadError> {
        if !self.ram {
            return Ok(0);
        }
        match self.ram_size_code {
            0x00 => Ok(0),
            0x02 => Ok(1),
            0x03 => Ok(4),
            0x04 => Ok(16),
            0x05 => Ok(8),
            code => Err(LoadError::UnsupportedRamSize(code)),
        }
    }

    pub(crate) fn create_mbc(&self) -> Box<dyn Mbc> {
        match self.mbc {
            MbcKind::RomOnly => Box::new(mbc0::Mbc0::new(self.ram)),
            MbcKind::Mbc1 => Box::new(mbc1::Mbc1::new()),
            MbcKind::Mbc3 => Box::new(mbc3::Mbc3::new(self.rtc)),
            MbcKind::Mbc5 => Box::new(mbc5::Mbc5::new()),
        }
    }
}

pub struct Cartridge {
    rom: Vec<u8>,
    boot_rom: Option<Vec<u8>>,
    info: CartridgeInfo,
}

impl Cartridge {
    pub fn load(rom: Vec<u8>, boot_rom: Option<Vec<u8>>) -> Result<Self, LoadError> {
        let mut info = CartridgeInfo::parse(&rom)?;

        if let Some(boot) = boot_rom.as_ref() {
            match (info.variant, boot.len()) {
                (Variant::Dmg, DMG_BOOT_ROM_SIZE) | (Variant::Cgb, CGB_BOOT_ROM_SIZE) => {}
                (Variant::Dmg, CGB_BOOT_ROM_SIZE) => {
                    log::info!("dmg cartridge on cgb boot rom, running in compatibility mode");
                    info.cgb_compatibility = true;
                }
                (_, len) => return Err(LoadError::BootRomSize(len)),
            }
        }

        log::info!(
            "cartridge \"{}\": {:?} {:?}, rom code {:#04x}, ram code {:#04x}, battery {}",
            info.title,
            info.variant,
            info.mbc,
            info.rom_size_code,
            info.ram_size_code,
            info.battery,
        );

        Ok(Self {
            rom,
            boot_rom,
            info,
        })
    }

    pub fn info(&self) -> &CartridgeInfo {
        &self.info
    }

    pub(crate) fn into_parts(self) -> (Vec<u8>, Option<Vec<u8>>, CartridgeInfo) {
        (self.rom, self.boot_rom, self.info)
    }
}

/// What the 0xA000-0xBFFF window currently maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RamAccess {
    Disabled,
    Bank(usize),
    Rtc(u8),
}

/// Memory bank controller. Tracks bank selections only, storage lives on the bus.
#[allow(unused_variables)]
pub trait Mbc: Send {
    fn write(&mut self, addr: u16, data: u8);

    /// bank mapped at 0x0000-0x3FFF
    fn rom0_bank(&self) -> usize {
        0
    }

    /// bank mapped at 0x4000-0x7FFF
    fn romn_bank(&self) -> usize;

    fn ram_access(&self) -> RamAccess;

    fn read_rtc(&self, reg: u8) -> u8 {
        0xFF
    }

    fn write_rtc(&mut self, reg: u8, data: u8) {}
}

/// Builds a minimal ROM image with a valid header, for tests.
#[cfg(test)]
pub(crate) fn test_rom(cart_type: u8, rom_code: u8, ram_code: u8, cgb: bool) -> Vec<u8> {
    let mut rom = vec![0u8; (2 << rom_code) * crate::bus::ROM_BANK_SIZE];
    rom[TITLE.start..TITLE.start + 4].copy_from_slice(b"TEST");
    rom[CGB_FLAG] = if cgb { 0x80 } else { 0x00 };
    rom[CART_TYPE] = cart_type;
    rom[ROM_SIZE] = rom_code;
    rom[RAM_SIZE] = ram_code;
    for (bank, chunk) in rom.chunks_mut(crate::bus::ROM_BANK_SIZE).enumerate() {
        chunk[0x3FFF] = bank as u8;
    }
    rom
}
