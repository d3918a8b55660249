use super::context::MachineContext;
use crate::cart::LoadError;

pub const ROM_BANK_SIZE: usize = 0x4000;
pub const VRAM_BANK_SIZE: usize = 0x2000;
pub const RAM_BANK_SIZE: usize = 0x2000;
pub const WRAM_BANK_SIZE: usize = 0x1000;
pub const OAM_SIZE: usize = 0xA0;
pub const IO_SIZE: usize = 0x80;
pub const HRAM_SIZE: usize = 0x7F;

pub const IO_OFFSET: u16 = 0xFF00;

/// Persistence adapter for battery backed cartridge RAM.
pub trait SaveBacking: Send {
    /// Fills `data` with the persisted contents. Missing data is left untouched.
    fn load(&mut self, data: &mut [u8]);

    fn flush(&mut self, data: &[u8]) -> std::io::Result<()>;
}

/// Cartridge RAM. Flushed through its backing on drop.
pub struct SaveRam {
    data: Vec<u8>,
    backing: Option<Box<dyn SaveBacking>>,
    dirty: bool,
}

impl SaveRam {
    pub fn new(banks: usize, mut backing: Option<Box<dyn SaveBacking>>) -> Self {
        let mut data = vec![0; banks * RAM_BANK_SIZE];
        if let Some(backing) = backing.as_mut() {
            backing.load(&mut data);
        }

        Self {
            data,
            backing,
            dirty: false,
        }
    }

    pub fn banks(&self) -> usize {
        self.data.len() / RAM_BANK_SIZE
    }

    pub fn bank(&self, bank: usize) -> &[u8] {
        let start = bank * RAM_BANK_SIZE;
        &self.data[start..start + RAM_BANK_SIZE]
    }

    pub fn read(&self, bank: usize, offset: usize) -> u8 {
        self.data[bank * RAM_BANK_SIZE + offset]
    }

    pub fn write(&mut self, bank: usize, offset: usize, data: u8) {
        self.data[bank * RAM_BANK_SIZE + offset] = data;
        self.dirty = true;
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        if let Some(backing) = self.backing.as_mut() {
            if self.dirty {
                backing.flush(&self.data)?;
                self.dirty = false;
            }
        }
        Ok(())
    }
}

impl Drop for SaveRam {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            log::error!("failed to flush save ram: {}", err);
        }
    }
}

impl std::fmt::Debug for SaveRam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveRam")
            .field("banks", &self.banks())
            .field("backed", &self.backing.is_some())
            .field("dirty", &self.dirty)
            .finish()
    }
}

/// All storage visible on the bus.
#[derive(Debug)]
pub struct MemoryRegions {
    pub rom0: Box<[u8; ROM_BANK_SIZE]>,
    pub rom_n: Vec<Box<[u8; ROM_BANK_SIZE]>>,
    pub vram: Vec<Box<[u8; VRAM_BANK_SIZE]>>,
    pub ram: Option<SaveRam>,
    pub wram0: Box<[u8; WRAM_BANK_SIZE]>,
    pub wram_n: Vec<Box<[u8; WRAM_BANK_SIZE]>>,
    pub oam: [u8; OAM_SIZE],
    pub io: [u8; IO_SIZE],
    pub hram: [u8; HRAM_SIZE],
    pub boot_rom: Option<Vec<u8>>,
}

impl MemoryRegions {
    pub fn allocate(
        ctx: &MachineContext,
        rom: &[u8],
        boot_rom: Option<Vec<u8>>,
        backing: Option<Box<dyn SaveBacking>>,
    ) -> Result<Self, LoadError> {
        let expected = ctx.rom_bank_num * ROM_BANK_SIZE;
        if rom.len() < expected {
            return Err(LoadError::TruncatedRom {
                expected,
                actual: rom.len(),
            });
        }

        let mut banks = rom[..expected].chunks_exact(ROM_BANK_SIZE).map(|chunk| {
            let mut bank = Box::new([0; ROM_BANK_SIZE]);
            bank.copy_from_slice(chunk);
            bank
        });
        let rom0 = banks.next().ok_or(LoadError::TruncatedRom {
            expected,
            actual: rom.len(),
        })?;
        let rom_n = banks.collect();

        let ram = if ctx.ram_bank_num > 0 {
            Some(SaveRam::new(ctx.ram_bank_num, backing))
        } else {
            None
        };

        Ok(Self {
            rom0,
            rom_n,
            vram: (0..ctx.vram_bank_num)
                .map(|_| Box::new([0; VRAM_BANK_SIZE]))
                .collect(),
            ram,
            wram0: Box::new([0; WRAM_BANK_SIZE]),
            wram_n: (1..ctx.wram_bank_num)
                .map(|_| Box::new([0; WRAM_BANK_SIZE]))
                .collect(),
            oam: [0; OAM_SIZE],
            io: [0; IO_SIZE],
            hram: [0; HRAM_SIZE],
            boot_rom,
        })
    }

    /// ROM bank `bank`, wrapped to the number of banks present.
    pub fn rom_bank(&self, bank: usize) -> &[u8; ROM_BANK_SIZE] {
        match bank % (self.rom_n.len() + 1) {
            0 => &self.rom0,
            n => &self.rom_n[n - 1],
        }
    }
}

/// Offset-corrected IO index.
pub fn io_index(addr: u16) -> usize {
    (addr - IO_OFFSET) as usize
}
