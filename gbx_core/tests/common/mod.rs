#![allow(dead_code)]

use gbx_core::{Bus, Cartridge, Cpu, Flags};

pub const CODE: u16 = 0xC000;

/// 32 KiB ROM-only image with a valid header.
pub fn rom(cgb: bool) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    rom[0x134..0x138].copy_from_slice(b"TEST");
    rom[0x143] = if cgb { 0x80 } else { 0x00 };
    rom
}

/// CPU and bus with `program` placed in WRAM and PC pointing at it.
pub fn machine(program: &[u8], cgb: bool) -> (Cpu, Bus) {
    let cart = Cartridge::load(rom(cgb), None).unwrap();
    let mut bus = Bus::new(cart, None).unwrap();
    for (i, &b) in program.iter().enumerate() {
        bus.write(CODE + i as u16, b);
    }
    bus.write(0xFFFF, 0x00);
    bus.write(0xFF0F, 0x00);

    let mut cpu = Cpu::new(bus.ctx());
    let regs = cpu.registers_mut();
    regs.f = Flags::empty();
    regs.pc = CODE;
    regs.sp = 0xDFF0;
    regs.set_hl(0xC800);
    regs.set_bc(0xC980);
    regs.set_de(0xC900);
    (cpu, bus)
}
