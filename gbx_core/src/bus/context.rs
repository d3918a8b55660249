use crate::cart::CartridgeInfo;

/// Console the session runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Dmg,
    Cgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speed {
    Normal,
    Double,
}

impl Speed {
    /// How many M-cycles the CPU executes in the time of one normal-speed M-cycle.
    pub fn factor(self) -> u32 {
        match self {
            Speed::Normal => 1,
            Speed::Double => 2,
        }
    }
}

/// Global machine state for one cartridge session.
#[derive(Debug)]
pub struct MachineContext {
    pub variant: Variant,
    pub speed: Speed,
    pub speed_switch_armed: bool,
    /// DMG software on CGB hardware: banked memory and palette RAM stay reachable
    pub cgb_compatibility: bool,

    pub rom_bank_num: usize,
    pub ram_bank_num: usize,
    /// total WRAM banks including the fixed bank 0
    pub wram_bank_num: usize,
    pub vram_bank_num: usize,

    /// index into the switchable WRAM banks (bank 1 is index 0)
    pub wram_bank: usize,
    pub vram_bank: usize,

    pub ie: u8,
    pub boot_rom_mapped: bool,

    pub battery: bool,
    pub ram_present: bool,
    pub rtc_present: bool,
}

impl MachineContext {
    pub fn new(info: &CartridgeInfo, rom_bank_num: usize, ram_bank_num: usize) -> Self {
        let cgb = info.variant == Variant::Cgb || info.cgb_compatibility;

        Self {
            variant: info.variant,
            speed: Speed::Normal,
            speed_switch_armed: false,
            cgb_compatibility: info.cgb_compatibility,

            rom_bank_num,
            ram_bank_num,
            wram_bank_num: if cgb { 8 } else { 2 },
            vram_bank_num: if cgb { 2 } else { 1 },

            wram_bank: 0,
            vram_bank: 0,

            ie: 0x00,
            boot_rom_mapped: false,

            battery: info.battery,
            ram_present: info.ram,
            rtc_present: info.rtc,
        }
    }

    pub fn is_cgb(&self) -> bool {
        self.variant == Variant::Cgb
    }

    /// Console hardware is a CGB, whatever mode the cartridge runs in.
    pub fn cgb_hardware(&self) -> bool {
        self.is_cgb() || self.cgb_compatibility
    }
}
