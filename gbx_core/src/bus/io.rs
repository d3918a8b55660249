use super::regions::{io_index, IO_SIZE};
use super::{Bus, Interrupt, IF};

type ReadFn = fn(&Bus, u16) -> u8;
type WriteFn = fn(&mut Bus, u16, u8);

/// Which consoles see a register.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Access {
    All,
    /// CGB hardware, including DMG cartridges in compatibility mode
    CgbHardware,
    /// CGB cartridges only
    CgbMode,
}

/// One IO register: accessors, read OR mask and console visibility.
#[derive(Clone, Copy)]
struct IoHandler {
    read: ReadFn,
    write: WriteFn,
    mask: u8,
    access: Access,
}

const UNMAPPED: IoHandler = IoHandler {
    read: read_unmapped,
    write: write_unmapped,
    mask: 0x00,
    access: Access::All,
};

lazy_static::lazy_static! {
    static ref IO_HANDLERS: [IoHandler; IO_SIZE] = build_handlers();
}

fn build_handlers() -> [IoHandler; IO_SIZE] {
    let mut table = [UNMAPPED; IO_SIZE];

    let mut map = |first: u16, last: u16, read: ReadFn, write: WriteFn, mask: u8, access: Access| {
        for addr in first..=last {
            table[io_index(addr)] = IoHandler {
                read,
                write,
                mask,
                access,
            };
        }
    };

    map(0xFF00, 0xFF00, read_joypad, write_joypad, 0xC0, Access::All);
    map(0xFF01, 0xFF01, read_stored, write_stored, 0x00, Access::All);
    map(0xFF02, 0xFF02, read_stored, write_stored, 0x7E, Access::All);

    map(0xFF04, 0xFF04, read_div, write_div, 0x00, Access::All);
    map(0xFF05, 0xFF05, read_tima, write_tima, 0x00, Access::All);
    map(0xFF06, 0xFF06, read_tma, write_tma, 0x00, Access::All);
    map(0xFF07, 0xFF07, read_tac, write_tac, 0xF8, Access::All);
    map(0xFF0F, 0xFF0F, read_stored, write_if, 0xE0, Access::All);

    map(0xFF10, 0xFF3F, read_apu, write_apu, 0x00, Access::All);

    map(0xFF40, 0xFF45, read_ppu, write_ppu, 0x00, Access::All);
    map(0xFF46, 0xFF46, read_oam_dma, write_oam_dma, 0x00, Access::All);
    map(0xFF47, 0xFF4B, read_ppu, write_ppu, 0x00, Access::All);

    map(0xFF4D, 0xFF4D, read_key1, write_key1, 0x7E, Access::CgbMode);
    map(0xFF4F, 0xFF4F, read_vbk, write_vbk, 0xFE, Access::CgbHardware);
    map(0xFF50, 0xFF50, read_unmapped, write_boot, 0x00, Access::All);
    map(0xFF51, 0xFF54, read_unmapped, write_hdma, 0x00, Access::CgbMode);
    map(0xFF55, 0xFF55, read_hdma5, write_hdma5, 0x00, Access::CgbMode);
    map(0xFF56, 0xFF56, read_stored, write_stored, 0x3C, Access::CgbMode);

    map(0xFF68, 0xFF68, read_ppu, write_ppu, 0x40, Access::CgbHardware);
    map(0xFF69, 0xFF69, read_ppu, write_ppu, 0x00, Access::CgbHardware);
    map(0xFF6A, 0xFF6A, read_ppu, write_ppu, 0x40, Access::CgbHardware);
    map(0xFF6B, 0xFF6B, read_ppu, write_ppu, 0x00, Access::CgbHardware);
    map(0xFF6C, 0xFF6C, read_ppu, write_ppu, 0xFE, Access::CgbMode);

    map(0xFF70, 0xFF70, read_svbk, write_svbk, 0xF8, Access::CgbHardware);
    map(0xFF76, 0xFF76, read_pcm12, write_read_only, 0x00, Access::CgbMode);
    map(0xFF77, 0xFF77, read_pcm34, write_read_only, 0x00, Access::CgbMode);

    table
}

impl Bus {
    pub(super) fn read_io(&self, addr: u16) -> u8 {
        let handler = &IO_HANDLERS[io_index(addr)];
        if !self.io_visible(handler.access) {
            return 0xFF;
        }
        (handler.read)(self, addr) | handler.mask
    }

    fn io_visible(&self, access: Access) -> bool {
        match access {
            Access::All => true,
            Access::CgbHardware => self.ctx.cgb_hardware(),
            Access::CgbMode => self.ctx.is_cgb(),
        }
    }

    pub(super) fn write_io(&mut self, addr: u16, data: u8) {
        let handler = &IO_HANDLERS[io_index(addr)];
        if !self.io_visible(handler.access) {
            log::debug!("cgb register {:#06x} written on dmg", addr);
            return;
        }
        (handler.write)(self, addr, data)
    }
}

fn read_unmapped(_: &Bus, _: u16) -> u8 {
    0xFF
}

fn write_unmapped(_: &mut Bus, addr: u16, data: u8) {
    log::debug!("write {:#04x} to unmapped io {:#06x}", data, addr);
}

fn write_read_only(_: &mut Bus, addr: u16, data: u8) {
    log::debug!("write {:#04x} to read-only io {:#06x}", data, addr);
}

fn read_stored(bus: &Bus, addr: u16) -> u8 {
    bus.mem.io[io_index(addr)]
}

fn write_stored(bus: &mut Bus, addr: u16, data: u8) {
    bus.mem.io[io_index(addr)] = data;
}

fn read_joypad(bus: &Bus, _: u16) -> u8 {
    bus.joypad.read()
}

fn write_joypad(bus: &mut Bus, _: u16, data: u8) {
    bus.joypad.write(data);
}

fn read_div(bus: &Bus, _: u16) -> u8 {
    bus.timer.div()
}

fn write_div(bus: &mut Bus, _: u16, _: u8) {
    bus.timer.reset_divider();
}

fn read_tima(bus: &Bus, _: u16) -> u8 {
    bus.timer.tima()
}

fn write_tima(bus: &mut Bus, _: u16, data: u8) {
    bus.timer.write_tima(data);
}

fn read_tma(bus: &Bus, _: u16) -> u8 {
    bus.timer.tma()
}

fn write_tma(bus: &mut Bus, _: u16, data: u8) {
    bus.timer.write_tma(data);
}

fn read_tac(bus: &Bus, _: u16) -> u8 {
    bus.timer.tac()
}

fn write_tac(bus: &mut Bus, _: u16, data: u8) {
    bus.timer.write_tac(data);
}

fn write_if(bus: &mut Bus, _: u16, data: u8) {
    bus.mem.io[IF] = data & 0x1F;
}

fn read_apu(bus: &Bus, addr: u16) -> u8 {
    bus.apu.read(addr)
}

fn write_apu(bus: &mut Bus, addr: u16, data: u8) {
    bus.apu.write(addr, data);
}

fn read_ppu(bus: &Bus, addr: u16) -> u8 {
    bus.ppu.read(addr)
}

fn write_ppu(bus: &mut Bus, addr: u16, data: u8) {
    if bus.ppu.write(addr, data) {
        bus.request_interrupt(Interrupt::STAT);
    }
}

fn read_oam_dma(bus: &Bus, _: u16) -> u8 {
    bus.oam_dma.page()
}

fn write_oam_dma(bus: &mut Bus, _: u16, data: u8) {
    bus.start_oam_dma(data);
}

fn read_key1(bus: &Bus, _: u16) -> u8 {
    let double = bus.ctx.speed == super::Speed::Double;
    (double as u8) << 7 | bus.ctx.speed_switch_armed as u8
}

fn write_key1(bus: &mut Bus, _: u16, data: u8) {
    bus.ctx.speed_switch_armed = data & 0x01 != 0;
}

fn read_vbk(bus: &Bus, _: u16) -> u8 {
    bus.ctx.vram_bank as u8
}

fn write_vbk(bus: &mut Bus, _: u16, data: u8) {
    bus.ctx.vram_bank = (data & 0x01) as usize;
}

fn write_boot(bus: &mut Bus, _: u16, data: u8) {
    if data != 0 && bus.ctx.boot_rom_mapped {
        bus.ctx.boot_rom_mapped = false;
        log::info!("boot rom unmapped");
    }
}

fn write_hdma(bus: &mut Bus, addr: u16, data: u8) {
    bus.vram_dma.write_reg((addr - 0xFF51) as usize, data);
}

fn read_hdma5(bus: &Bus, _: u16) -> u8 {
    bus.vram_dma.status()
}

fn write_hdma5(bus: &mut Bus, _: u16, data: u8) {
    bus.start_vram_dma(data);
}

fn read_svbk(bus: &Bus, _: u16) -> u8 {
    bus.ctx.wram_bank as u8 + 1
}

fn write_svbk(bus: &mut Bus, _: u16, data: u8) {
    let bank = match data & 0x07 {
        0 => 1,
        n => n as usize,
    };
    bus.ctx.wram_bank = bank - 1;
    log::debug!("wram bank {}", bank);
}

fn read_pcm12(bus: &Bus, _: u16) -> u8 {
    bus.apu.pcm12()
}

fn read_pcm34(bus: &Bus, _: u16) -> u8 {
    bus.apu.pcm34()
}
