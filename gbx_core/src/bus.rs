use crate::apu::Apu;
use crate::cart::{Cartridge, LoadError, Mbc, RamAccess};
use crate::ppu::{Mode, Ppu};
use std::borrow::Cow;

mod context;
mod dma;
mod io;
mod joypad;
mod regions;
mod timer;

pub use context::{MachineContext, Speed, Variant};
use dma::{OamDma, VramDma, VramDmaMode};
pub use joypad::Button;
use regions::{MemoryRegions, IO_OFFSET, IO_SIZE};
pub use regions::{SaveBacking, SaveRam, RAM_BANK_SIZE, ROM_BANK_SIZE, VRAM_BANK_SIZE, WRAM_BANK_SIZE};
use timer::Timer;

const IF: usize = 0x0F;

const DMG_DIVIDER: u16 = 0xABCC;
const CGB_DIVIDER: u16 = 0x1EA0;

bitflags::bitflags! {
    pub struct Interrupt: u8 {
        const VBLANK = 0x01;
        const STAT   = 0x02;
        const TIMER  = 0x04;
        const SERIAL = 0x08;
        const JOYPAD = 0x10;
    }
}

/// Storage kinds for bank dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryType {
    Rom0,
    RomN,
    Vram,
    RamN,
    Wram0,
    WramN,
    Oam,
    Io,
    Hram,
}

pub struct Bus {
    ctx: MachineContext,
    mem: MemoryRegions,
    mbc: Box<dyn Mbc>,

    timer: Timer,
    oam_dma: OamDma,
    vram_dma: VramDma,
    joypad: joypad::Joypad,
    ppu: Ppu,
    apu: Apu,

    cycles: u64,
    sequencer_signal: bool,
    stall: u32,
}

impl Bus {
    pub fn new(cart: Cartridge, backing: Option<Box<dyn SaveBacking>>) -> Result<Self, LoadError> {
        let (rom, boot_rom, info) = cart.into_parts();
        let ctx = MachineContext::new(&info, info.rom_banks()?, info.ram_banks()?);
        let mem = MemoryRegions::allocate(&ctx, &rom, boot_rom, backing)?;

        let mut bus = Self {
            mbc: info.create_mbc(),
            ctx,
            mem,

            timer: Timer::new(0),
            oam_dma: OamDma::default(),
            vram_dma: VramDma::default(),
            joypad: joypad::Joypad::default(),
            ppu: Ppu::new(),
            apu: Apu::new(),

            cycles: 0,
            sequencer_signal: false,
            stall: 0,
        };

        if bus.mem.boot_rom.is_some() {
            bus.ctx.boot_rom_mapped = true;
        } else {
            bus.post_boot();
        }
        bus.ppu.set_compatibility(bus.ctx.cgb_compatibility);

        log::info!(
            "memory: {} rom banks, {} ram banks, {} wram banks, {} vram banks",
            bus.ctx.rom_bank_num,
            bus.ctx.ram_bank_num,
            bus.ctx.wram_bank_num,
            bus.ctx.vram_bank_num,
        );

        Ok(bus)
    }

    fn post_boot(&mut self) {
        let divider = match self.ctx.variant {
            Variant::Dmg => DMG_DIVIDER,
            Variant::Cgb => CGB_DIVIDER,
        };
        self.timer = Timer::new(divider);
        self.mem.io[IF] = 0xE1;
        self.ppu = Ppu::post_boot();
        self.apu = Apu::post_boot();
    }

    /// One M-cycle.
    pub fn tick(&mut self) {
        self.cycles += 1;

        if self.timer.tick() {
            self.request_interrupt(Interrupt::TIMER);
        }
        self.clock_sequencer();

        let events = self.ppu.tick(4 / self.ctx.speed.factor());
        if events.vblank {
            self.request_interrupt(Interrupt::VBLANK);
        }
        if events.stat {
            self.request_interrupt(Interrupt::STAT);
        }
        if events.hblank {
            self.hblank_dma();
        }
    }

    /// One M-cycle with the clocks stopped.
    pub(crate) fn tick_stopped(&mut self) {
        self.cycles += 1;
    }

    fn clock_sequencer(&mut self) {
        let bit = match self.ctx.speed {
            Speed::Normal => 12,
            Speed::Double => 13,
        };
        let signal = self.timer.divider() & (1 << bit) != 0;
        if self.sequencer_signal && !signal {
            self.apu.advance(1);
        }
        self.sequencer_signal = signal;
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Ticks, then reads.
    pub fn read(&mut self, addr: u16) -> u8 {
        self.tick();
        self.inspect(addr)
    }

    /// Ticks, then writes.
    pub fn write(&mut self, addr: u16, data: u8) {
        self.tick();
        self.store(addr, data);
    }

    /// Reads without advancing time.
    pub fn inspect(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x3FFF => match self.boot_rom_byte(addr) {
                Some(data) => data,
                None => self.mem.rom_bank(self.mbc.rom0_bank())[addr as usize],
            },
            0x4000..=0x7FFF => self.mem.rom_bank(self.mbc.romn_bank())[addr as usize - 0x4000],
            0x8000..=0x9FFF => {
                if self.ppu.vram_blocked() {
                    0xFF
                } else {
                    self.mem.vram[self.ctx.vram_bank][addr as usize - 0x8000]
                }
            }
            0xA000..=0xBFFF => self.read_ram(addr),
            0xC000..=0xCFFF => self.mem.wram0[addr as usize - 0xC000],
            0xD000..=0xDFFF => self.mem.wram_n[self.ctx.wram_bank][addr as usize - 0xD000],
            0xE000..=0xFDFF => self.inspect(addr - 0x2000),
            0xFE00..=0xFE9F => {
                if self.ppu.oam_blocked() {
                    0xFF
                } else {
                    self.mem.oam[addr as usize - 0xFE00]
                }
            }
            0xFEA0..=0xFEFF => 0xFF,
            0xFF00..=0xFF7F => self.read_io(addr),
            0xFF80..=0xFFFE => self.mem.hram[addr as usize - 0xFF80],
            0xFFFF => self.ctx.ie,
        }
    }

    /// Reads `addr` as if `bank` was selected in its region.
    pub fn read_bank(&self, addr: u16, bank: usize) -> u8 {
        match addr {
            0x0000..=0x3FFF => self.mem.rom_bank(bank)[addr as usize],
            0x4000..=0x7FFF => self.mem.rom_bank(bank)[addr as usize - 0x4000],
            0x8000..=0x9FFF => {
                self.mem.vram[bank % self.mem.vram.len()][addr as usize - 0x8000]
            }
            0xA000..=0xBFFF => match self.mem.ram.as_ref() {
                Some(ram) => ram.read(bank % ram.banks(), addr as usize - 0xA000),
                None => 0xFF,
            },
            0xD000..=0xDFFF => {
                let index = bank.max(1) - 1;
                self.mem.wram_n[index % self.mem.wram_n.len()][addr as usize - 0xD000]
            }
            _ => self.inspect(addr),
        }
    }

    fn store(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x7FFF => self.mbc.write(addr, data),
            0x8000..=0x9FFF => {
                if self.ppu.vram_blocked() {
                    log::debug!("vram write {:#06x} during transfer dropped", addr);
                } else {
                    self.mem.vram[self.ctx.vram_bank][addr as usize - 0x8000] = data;
                }
            }
            0xA000..=0xBFFF => self.write_ram(addr, data),
            0xC000..=0xCFFF => self.mem.wram0[addr as usize - 0xC000] = data,
            0xD000..=0xDFFF => self.mem.wram_n[self.ctx.wram_bank][addr as usize - 0xD000] = data,
            0xE000..=0xFDFF => self.store(addr - 0x2000, data),
            0xFE00..=0xFE9F => {
                if self.ppu.oam_blocked() {
                    log::debug!("oam write {:#06x} during scan dropped", addr);
                } else {
                    self.mem.oam[addr as usize - 0xFE00] = data;
                }
            }
            0xFEA0..=0xFEFF => {}
            0xFF00..=0xFF7F => self.write_io(addr, data),
            0xFF80..=0xFFFE => self.mem.hram[addr as usize - 0xFF80] = data,
            0xFFFF => self.ctx.ie = data,
        }
    }

    fn boot_rom_byte(&self, addr: u16) -> Option<u8> {
        if !self.ctx.boot_rom_mapped {
            return None;
        }
        let boot = self.mem.boot_rom.as_ref()?;
        match addr {
            0x0000..=0x00FF => Some(boot[addr as usize]),
            0x0200..=0x08FF if self.ctx.cgb_hardware() => boot.get(addr as usize).copied(),
            _ => None,
        }
    }

    fn read_ram(&self, addr: u16) -> u8 {
        match self.mbc.ram_access() {
            RamAccess::Disabled => 0xFF,
            RamAccess::Bank(bank) => match self.mem.ram.as_ref() {
                Some(ram) => ram.read(bank % ram.banks(), addr as usize - 0xA000),
                None => 0xFF,
            },
            RamAccess::Rtc(reg) => self.mbc.read_rtc(reg),
        }
    }

    fn write_ram(&mut self, addr: u16, data: u8) {
        match self.mbc.ram_access() {
            RamAccess::Disabled => log::debug!("write to disabled ram {:#06x}", addr),
            RamAccess::Bank(bank) => {
                if let Some(ram) = self.mem.ram.as_mut() {
                    let bank = bank % ram.banks();
                    ram.write(bank, addr as usize - 0xA000, data);
                }
            }
            RamAccess::Rtc(reg) => self.mbc.write_rtc(reg, data),
        }
    }

    pub fn request_interrupt(&mut self, irq: Interrupt) {
        self.mem.io[IF] |= irq.bits();
    }

    /// IE & IF
    pub fn pending_interrupts(&self) -> u8 {
        self.ctx.ie & self.mem.io[IF] & 0x1F
    }

    pub(crate) fn acknowledge_interrupt(&mut self, bits: u8) {
        self.mem.io[IF] &= !bits;
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        if self.joypad.set_button(button, pressed) {
            self.request_interrupt(Interrupt::JOYPAD);
        }
    }

    pub(crate) fn reset_divider(&mut self) {
        self.timer.reset_divider();
    }

    /// Performs an armed speed switch. Returns false when none was armed.
    pub(crate) fn switch_speed(&mut self) -> bool {
        if !self.ctx.is_cgb() || !self.ctx.speed_switch_armed {
            return false;
        }

        self.ctx.speed_switch_armed = false;
        self.ctx.speed = match self.ctx.speed {
            Speed::Normal => Speed::Double,
            Speed::Double => Speed::Normal,
        };
        log::info!("speed switched to {:?}", self.ctx.speed);
        true
    }

    pub(crate) fn take_stall(&mut self) -> u32 {
        std::mem::take(&mut self.stall)
    }

    pub(crate) fn take_frame(&mut self) -> bool {
        self.ppu.take_frame()
    }

    fn start_oam_dma(&mut self, page: u8) {
        match self.oam_dma.start(page) {
            Some(source) => {
                log::debug!("oam dma from {:#06x}", source);
                for i in 0..dma::OAM_DMA_LENGTH {
                    self.mem.oam[i as usize] = self.inspect(source + i);
                }
                for _ in 0..dma::OAM_DMA_CYCLES {
                    self.tick();
                }
            }
            None => log::warn!("oam dma from page {:#04x} ignored", page),
        }
    }

    fn start_vram_dma(&mut self, data: u8) {
        let mode = match self.vram_dma.start(data) {
            Some(mode) => mode,
            None => {
                log::debug!("hblank dma cancelled, {} blocks left", self.vram_dma.remaining());
                return;
            }
        };

        let source = self.vram_dma.source();
        if (0x8000..0xA000).contains(&source) {
            log::warn!("vram dma from vram {:#06x} rejected", source);
            self.vram_dma.abort();
            return;
        }

        match mode {
            VramDmaMode::GeneralPurpose => {
                let mut blocks = 0;
                while self.copy_vram_block() {
                    blocks += 1;
                }
                log::debug!("general dma of {} blocks from {:#06x}", blocks, source);

                let cost = blocks * dma::VRAM_DMA_BLOCK_CYCLES * self.ctx.speed.factor() + 1;
                for _ in 0..cost {
                    self.tick();
                }
            }
            VramDmaMode::HBlank => {
                if !self.ppu.enabled() || self.ppu.mode() == Mode::HBlank {
                    self.hblank_dma();
                }
            }
        }
    }

    fn hblank_dma(&mut self) {
        if self.vram_dma.active()
            && self.vram_dma.mode() == VramDmaMode::HBlank
            && self.copy_vram_block()
        {
            self.stall += dma::VRAM_DMA_BLOCK_CYCLES * self.ctx.speed.factor();
        }
    }

    fn copy_vram_block(&mut self) -> bool {
        match self.vram_dma.next_block() {
            Some((source, dest)) => {
                for i in 0..dma::VRAM_DMA_BLOCK {
                    let data = self.inspect(source.wrapping_add(i));
                    let offset = (dest + i) as usize & 0x1FFF;
                    self.mem.vram[self.ctx.vram_bank][offset] = data;
                }
                true
            }
            None => false,
        }
    }

    pub fn ctx(&self) -> &MachineContext {
        &self.ctx
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn apu(&self) -> &Apu {
        &self.apu
    }

    /// ROM bank mapped at `addr`, 0 outside the ROM area.
    pub fn rom_bank_at(&self, addr: u16) -> usize {
        let bank = match addr {
            0x0000..=0x3FFF => self.mbc.rom0_bank(),
            0x4000..=0x7FFF => self.mbc.romn_bank(),
            _ => return 0,
        };
        bank % self.ctx.rom_bank_num
    }

    pub fn bank_count(&self, ty: MemoryType) -> usize {
        match ty {
            MemoryType::Rom0 | MemoryType::Wram0 | MemoryType::Oam => 1,
            MemoryType::Io | MemoryType::Hram => 1,
            MemoryType::RomN => self.mem.rom_n.len(),
            MemoryType::Vram => self.mem.vram.len(),
            MemoryType::RamN => self.mem.ram.as_ref().map_or(0, |ram| ram.banks()),
            MemoryType::WramN => self.mem.wram_n.len(),
        }
    }

    /// Contents of one bank of a region. The IO page is read through the
    /// register handlers, so it matches what `inspect` returns.
    pub fn bank(&self, ty: MemoryType, bank: usize) -> Option<Cow<'_, [u8]>> {
        if bank >= self.bank_count(ty) {
            return None;
        }
        let data: &[u8] = match ty {
            MemoryType::Rom0 => &self.mem.rom0[..],
            MemoryType::RomN => &self.mem.rom_n[bank][..],
            MemoryType::Vram => &self.mem.vram[bank][..],
            MemoryType::RamN => self.mem.ram.as_ref()?.bank(bank),
            MemoryType::Wram0 => &self.mem.wram0[..],
            MemoryType::WramN => &self.mem.wram_n[bank][..],
            MemoryType::Oam => &self.mem.oam[..],
            MemoryType::Io => {
                let page = (0..IO_SIZE as u16).map(|i| self.read_io(IO_OFFSET + i)).collect();
                return Some(Cow::Owned(page));
            }
            MemoryType::Hram => &self.mem.hram[..],
        };
        Some(Cow::Borrowed(data))
    }

    pub fn flush_save(&mut self) -> std::io::Result<()> {
        match self.mem.ram.as_mut() {
            Some(ram) => ram.flush(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::test_rom;

    fn bus(cart_type: u8, rom_code: u8, ram_code: u8, cgb: bool) -> Bus {
        let cart = Cartridge::load(test_rom(cart_type, rom_code, ram_code, cgb), None).unwrap();
        Bus::new(cart, None).unwrap()
    }

    #[test]
    fn test_post_boot_state() {
        let bus = bus(0x00, 0, 0, false);
        assert_eq!(bus.inspect(0xFF04), 0xAB);
        assert_eq!(bus.inspect(0xFF0F), 0xE1);
        assert_eq!(bus.inspect(0xFF40), 0x91);
        assert_eq!(bus.inspect(0xFF47), 0xFC);
        assert_eq!(bus.inspect(0xFF07), 0xF8);
        assert_eq!(bus.inspect(0xFF26) & 0x80, 0x80);
    }

    #[test]
    fn test_echo_and_unusable() {
        let mut bus = bus(0x00, 0, 0, false);
        bus.write(0xC123, 0x42);
        assert_eq!(bus.inspect(0xE123), 0x42);

        bus.write(0xFD00, 0x24);
        assert_eq!(bus.inspect(0xDD00), 0x24);

        bus.write(0xFEA0, 0x11);
        assert_eq!(bus.inspect(0xFEA0), 0xFF);
    }

    #[test]
    fn test_io_dump_reads_registers() {
        let mut bus = bus(0x00, 0, 0, true);
        bus.write(0xFF70, 0x03);
        bus.write(0xFF4F, 0x01);

        let dump = bus.bank(MemoryType::Io, 0).unwrap();
        assert_eq!(dump.len(), 0x80);
        for (i, &data) in dump.iter().enumerate() {
            assert_eq!(data, bus.inspect(0xFF00 + i as u16), "io {:#06x}", 0xFF00 + i);
        }
        assert_eq!(dump[0x07], 0xF8);
        assert_eq!(dump[0x40], 0x91);
        assert_eq!(dump[0x47], 0xFC);
        assert_eq!(dump[0x70], 0xFB);
    }

    #[test]
    fn test_wram_banks() {
        let mut bus = bus(0x00, 0, 0, true);

        bus.write(0xFF70, 0x00);
        assert_eq!(bus.inspect(0xFF70), 0xF9);
        bus.write(0xD000, 0x01);

        bus.write(0xFF70, 0x0B);
        assert_eq!(bus.inspect(0xFF70), 0xFB);
        bus.write(0xD000, 0x03);

        bus.write(0xFF70, 0x01);
        assert_eq!(bus.inspect(0xD000), 0x01);
        assert_eq!(bus.read_bank(0xD000, 3), 0x03);
        assert_eq!(bus.bank(MemoryType::WramN, 2).unwrap()[0], 0x03);
        assert_eq!(bus.bank(MemoryType::WramN, 7), None);
    }

    #[test]
    fn test_dmg_hides_cgb_registers() {
        let mut bus = bus(0x00, 0, 0, false);
        for addr in [0xFF4D, 0xFF4F, 0xFF55, 0xFF68, 0xFF69, 0xFF70] {
            bus.write(addr, 0x00);
            assert_eq!(bus.inspect(addr), 0xFF, "{:#06x}", addr);
        }

        bus.write(0xFF70, 0x05);
        bus.write(0xD000, 0x77);
        assert_eq!(bus.read_bank(0xD000, 1), 0x77);
    }

    #[test]
    fn test_register_masks() {
        let mut bus = bus(0x00, 0, 0, true);

        bus.write(0xFF07, 0x05);
        assert_eq!(bus.inspect(0xFF07), 0xFD);

        bus.write(0xFF0F, 0x01);
        assert_eq!(bus.inspect(0xFF0F), 0xE1);

        bus.write(0xFF00, 0x00);
        assert_eq!(bus.inspect(0xFF00), 0xCF);

        bus.write(0xFF4F, 0x01);
        assert_eq!(bus.inspect(0xFF4F), 0xFF);
        bus.write(0xFF4F, 0x00);
        assert_eq!(bus.inspect(0xFF4F), 0xFE);

        bus.write(0xFF4D, 0x01);
        assert_eq!(bus.inspect(0xFF4D), 0x7F);

        bus.write(0xFFFF, 0xA5);
        assert_eq!(bus.inspect(0xFFFF), 0xA5);

        bus.write(0xFF01, 0x5A);
        assert_eq!(bus.inspect(0xFF01), 0x5A);
        assert_eq!(bus.inspect(0xFF03), 0xFF);
    }

    #[test]
    fn test_oam_dma() {
        let mut bus = bus(0x00, 0, 0, false);
        bus.write(0xFF40, 0x00);
        for i in 0..0xA0 {
            bus.write(0xC100 + i, i as u8 ^ 0x5A);
        }

        let start = bus.cycles();
        bus.write(0xFF46, 0xC1);
        assert_eq!(bus.cycles() - start, 1 + 160);
        assert_eq!(bus.inspect(0xFF46), 0xC1);
        for i in 0..0xA0u16 {
            assert_eq!(bus.inspect(0xFE00 + i), i as u8 ^ 0x5A);
        }

        let start = bus.cycles();
        bus.write(0xFF46, 0xE0);
        assert_eq!(bus.cycles() - start, 1);
    }

    #[test]
    fn test_vram_contention() {
        let mut bus = bus(0x00, 0, 0, false);
        bus.write(0xFF40, 0x00);
        bus.write(0x8000, 0x12);
        bus.write(0xFE00, 0x34);

        bus.write(0xFF40, 0x80);
        for _ in 0..20 {
            bus.tick();
        }
        assert_eq!(bus.ppu().mode(), Mode::Transfer);
        assert_eq!(bus.inspect(0x8000), 0xFF);
        assert_eq!(bus.inspect(0xFE00), 0xFF);
        bus.store(0x8000, 0x99);

        bus.write(0xFF40, 0x00);
        assert_eq!(bus.inspect(0x8000), 0x12);
        assert_eq!(bus.inspect(0xFE00), 0x34);
    }

    #[test]
    fn test_mbc1_switching() {
        let mut bus = bus(0x03, 0x03, 0x03, false);
        assert_eq!(bus.inspect(0x7FFF), 1);

        bus.write(0x2000, 0x05);
        assert_eq!(bus.inspect(0x7FFF), 5);
        assert_eq!(bus.rom_bank_at(0x4000), 5);

        bus.write(0x2000, 0x1F);
        assert_eq!(bus.inspect(0x7FFF), 15);

        assert_eq!(bus.inspect(0xA000), 0xFF);
        bus.write(0x0000, 0x0A);
        bus.write(0x6000, 0x01);
        bus.write(0x4000, 0x02);
        bus.write(0xA000, 0x42);
        assert_eq!(bus.bank(MemoryType::RamN, 2).unwrap()[0], 0x42);
    }

    #[test]
    fn test_general_vram_dma() {
        let mut bus = bus(0x00, 0, 0, true);
        bus.write(0xFF40, 0x00);
        for i in 0..0x20 {
            bus.write(0xC000 + i, i as u8 + 1);
        }

        bus.write(0xFF51, 0xC0);
        bus.write(0xFF52, 0x00);
        bus.write(0xFF53, 0x01);
        bus.write(0xFF54, 0x00);

        let start = bus.cycles();
        bus.write(0xFF55, 0x01);
        assert_eq!(bus.cycles() - start, 1 + 2 * 8 + 1);
        assert_eq!(bus.inspect(0xFF55), 0xFF);
        assert_eq!(bus.inspect(0x8100), 0x01);
        assert_eq!(bus.inspect(0x811F), 0x20);
    }

    #[test]
    fn test_hblank_vram_dma() {
        let mut bus = bus(0x00, 0, 0, true);
        bus.write(0xFF40, 0x00);
        for i in 0..0x30 {
            bus.write(0xC000 + i, 0xAA);
        }
        bus.write(0xFF51, 0xC0);
        bus.write(0xFF52, 0x00);
        bus.write(0xFF53, 0x00);
        bus.write(0xFF54, 0x00);

        bus.write(0xFF55, 0x82);
        assert_eq!(bus.inspect(0xFF55), 0x01);
        assert_eq!(bus.take_stall(), 8);
        assert_eq!(bus.inspect(0x800F), 0xAA);
        assert_eq!(bus.inspect(0x8010), 0x00);

        bus.write(0xFF40, 0x80);
        while bus.ppu().mode() != Mode::HBlank {
            bus.tick();
        }
        assert_eq!(bus.inspect(0xFF55), 0x00);

        bus.write(0xFF55, 0x00);
        assert_eq!(bus.inspect(0xFF55), 0x80);
    }

    #[test]
    fn test_vram_dma_source_rejected() {
        let mut bus = bus(0x00, 0, 0, true);
        bus.write(0xFF51, 0x80);
        bus.write(0xFF52, 0x00);
        let start = bus.cycles();
        bus.write(0xFF55, 0x03);
        assert_eq!(bus.cycles() - start, 1);
        assert_eq!(bus.inspect(0xFF55), 0xFF);
    }

    #[test]
    fn test_timer_if_write_wins() {
        let mut bus = bus(0x00, 0, 0, false);
        bus.write(0xFF0F, 0x00);
        bus.write(0xFF04, 0x00);
        bus.write(0xFF06, 0x42);
        bus.write(0xFF05, 0xFF);
        bus.write(0xFF07, 0x05);

        bus.tick();
        assert_eq!(bus.inspect(0xFF05), 0x00);
        assert_eq!(bus.inspect(0xFF0F), 0xE0);

        bus.write(0xFF0F, 0x00);
        assert_eq!(bus.inspect(0xFF05), 0x42);
        assert_eq!(bus.inspect(0xFF0F), 0xE0);
    }

    #[test]
    fn test_timer_interrupt() {
        let mut bus = bus(0x00, 0, 0, false);
        bus.write(0xFF0F, 0x00);
        bus.write(0xFF04, 0x00);
        bus.write(0xFF05, 0xFF);
        bus.write(0xFF07, 0x05);

        bus.tick();
        bus.tick();
        assert_eq!(bus.inspect(0xFF0F) & 0x04, 0x00);
        bus.tick();
        assert_eq!(bus.inspect(0xFF0F) & 0x04, 0x04);
    }

    #[test]
    fn test_boot_rom_overlay() {
        let mut boot = vec![0x31; 0x100];
        boot[0] = 0xAA;
        let cart = Cartridge::load(test_rom(0x00, 0, 0, false), Some(boot)).unwrap();
        let mut bus = Bus::new(cart, None).unwrap();

        assert_eq!(bus.inspect(0x0000), 0xAA);
        assert_eq!(bus.inspect(0x0134), b'T');
        assert_eq!(bus.inspect(0xFF40), 0x00);

        bus.write(0xFF50, 0x01);
        assert_eq!(bus.inspect(0x0000), 0x00);
    }

    #[test]
    fn test_cgb_compatibility_mode() {
        let mut boot = vec![0x00; 0x900];
        boot[0x200] = 0x5A;
        let cart = Cartridge::load(test_rom(0x00, 0, 0, false), Some(boot)).unwrap();
        let mut bus = Bus::new(cart, None).unwrap();
        assert!(bus.ctx().cgb_compatibility);
        assert!(!bus.ctx().is_cgb());
        assert_eq!(bus.inspect(0x0200), 0x5A);

        bus.write(0xFF70, 0x02);
        assert_eq!(bus.inspect(0xFF70), 0xFA);
        bus.write(0xD000, 0x77);
        bus.write(0xFF70, 0x01);
        assert_eq!(bus.inspect(0xD000), 0x00);
        assert_eq!(bus.bank_count(MemoryType::WramN), 7);

        bus.write(0xFF4D, 0x01);
        assert_eq!(bus.inspect(0xFF4D), 0xFF);

        bus.write(0xFF68, 0x80);
        for data in [0x00, 0x00, 0x1F, 0x00, 0xE0, 0x03, 0xFF, 0x7F] {
            bus.write(0xFF69, data);
        }
        bus.write(0xFF47, 0b00_01_10_11);
        assert_eq!(
            bus.ppu().palettes().dmg_bg(),
            [0xFFFFFFFF, 0x00FF00FF, 0xFF0000FF, 0x000000FF]
        );
    }

    #[test]
    fn test_truncated_rom() {
        let mut rom = test_rom(0x00, 0, 0, false);
        rom[0x148] = 0x01;
        let cart = Cartridge::load(rom, None).unwrap();
        assert_eq!(
            Bus::new(cart, None).err(),
            Some(LoadError::TruncatedRom {
                expected: 0x10000,
                actual: 0x8000
            })
        );
    }

    #[test]
    fn test_joypad_interrupt() {
        let mut bus = bus(0x00, 0, 0, false);
        bus.write(0xFF0F, 0x00);
        bus.write(0xFF00, 0x20);
        bus.set_button(Button::Down, true);
        assert_eq!(bus.inspect(0xFF0F), 0xF0);
        assert_eq!(bus.inspect(0xFF00), 0xE7);
    }
}
