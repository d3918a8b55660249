use crate::bus::{Bus, Interrupt, MachineContext, Variant};
use crate::MC_PER_FRAME;
use op_code::OPCODES;

mod execute;
mod op_code;
mod regs;

pub use op_code::{disassemble, Condition, Instruction, Operand, CB_OPCODES, OPCODES as BASE_OPCODES};
pub use regs::{Flags, Registers};

const VECTOR_BASE: u16 = 0x40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuState {
    Running,
    Halted,
    /// waits for a joypad interrupt flag with the clocks frozen
    Stopped,
}

pub struct Cpu {
    regs: Registers,
    state: CpuState,

    ime: bool,
    /// EI takes effect after the following instruction
    ime_delay: u8,
    /// next opcode fetch does not advance PC
    halt_bug: bool,

    op: u8,
}

impl Cpu {
    /// Register state matching the machine: zeroed when a boot ROM will run, post-boot values otherwise.
    pub fn new(ctx: &MachineContext) -> Self {
        let mut regs = Registers::default();

        if !ctx.boot_rom_mapped {
            match ctx.variant {
                Variant::Dmg => {
                    regs.set_af(0x01B0);
                    regs.set_bc(0x0013);
                    regs.set_de(0x00D8);
                    regs.set_hl(0x014D);
                }
                Variant::Cgb => {
                    regs.set_af(0x1180);
                    regs.set_bc(0x0000);
                    regs.set_de(0xFF56);
                    regs.set_hl(0x000D);
                }
            }
            regs.sp = 0xFFFE;
            regs.pc = 0x0100;
        }

        Self {
            regs,
            state: CpuState::Running,

            ime: false,
            ime_delay: 0,
            halt_bug: false,

            op: 0x00,
        }
    }

    pub fn registers(&self) -> Registers {
        self.regs
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    pub fn state(&self) -> CpuState {
        self.state
    }

    pub fn ime(&self) -> bool {
        self.ime
    }

    pub fn pc(&self) -> u16 {
        self.regs.pc
    }

    pub fn set_pc(&mut self, addr: u16) {
        self.regs.pc = addr;
    }

    /// Runs until a frame completes or one frame worth of M-cycles elapsed. Returns M-cycles consumed.
    pub fn run_cycles(&mut self, bus: &mut Bus) -> u32 {
        bus.take_frame();

        let mut cycles = 0;
        loop {
            cycles += self.step(bus);
            if bus.take_frame() || cycles >= MC_PER_FRAME * bus.ctx().speed.factor() {
                break;
            }
        }
        cycles
    }

    /// Single instruction, interrupt dispatch or idle cycle.
    pub fn run_cycle(&mut self, bus: &mut Bus) -> u32 {
        self.step(bus)
    }

    pub fn step(&mut self, bus: &mut Bus) -> u32 {
        let start = bus.cycles();

        match self.state {
            CpuState::Running => {
                if self.ime && bus.pending_interrupts() != 0 {
                    self.service_interrupt(bus);
                } else {
                    self.execute(bus);
                    self.advance_ime();
                }
            }
            CpuState::Halted => {
                bus.tick();
                if bus.pending_interrupts() != 0 {
                    self.state = CpuState::Running;
                }
            }
            CpuState::Stopped => {
                bus.tick_stopped();
                if bus.inspect(0xFF0F) & Interrupt::JOYPAD.bits() != 0 {
                    log::debug!("resumed from stop");
                    self.state = CpuState::Running;
                }
            }
        }

        for _ in 0..bus.take_stall() {
            bus.tick();
        }

        (bus.cycles() - start) as u32
    }

    fn execute(&mut self, bus: &mut Bus) {
        if log::log_enabled!(log::Level::Trace) {
            let (text, _) = disassemble(bus, self.regs.pc);
            log::trace!("{:04X}  {:<20} {}", self.regs.pc, text, self.regs);
        }

        self.op = bus.read(self.regs.pc);
        if self.halt_bug {
            self.halt_bug = false;
        } else {
            self.regs.pc = self.regs.pc.wrapping_add(1);
        }

        let handler = OPCODES[self.op as usize].handler;
        handler(self, bus);
    }

    fn advance_ime(&mut self) {
        if self.ime_delay > 0 {
            self.ime_delay -= 1;
            if self.ime_delay == 0 {
                self.ime = true;
            }
        }
    }

    fn service_interrupt(&mut self, bus: &mut Bus) {
        let bit = bus.pending_interrupts().trailing_zeros() as u16;

        bus.tick();
        bus.tick();
        self.push_word(bus, self.regs.pc);

        bus.acknowledge_interrupt(1 << bit);
        self.ime = false;
        self.regs.pc = VECTOR_BASE + 8 * bit;
        bus.tick();

        log::trace!("interrupt {} dispatched", bit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{test_rom, Cartridge};

    fn machine(program: &[u8]) -> (Cpu, Bus) {
        let cart = Cartridge::load(test_rom(0x00, 0, 0, false), None).unwrap();
        let mut bus = Bus::new(cart, None).unwrap();
        for (i, &b) in program.iter().enumerate() {
            bus.write(0xC000 + i as u16, b);
        }
        bus.write(0xFFFF, 0x00);
        bus.write(0xFF0F, 0x00);

        let mut cpu = Cpu::new(bus.ctx());
        cpu.set_pc(0xC000);
        cpu.registers_mut().sp = 0xDFF0;
        (cpu, bus)
    }

    #[test]
    fn test_post_boot_registers() {
        let (cpu, _) = machine(&[]);
        let regs = cpu.registers();
        assert_eq!(regs.af(), 0x01B0);
        assert_eq!(regs.bc(), 0x0013);
        assert_eq!(regs.de(), 0x00D8);
        assert_eq!(regs.hl(), 0x014D);
        assert_eq!(cpu.state(), CpuState::Running);
    }

    #[test]
    fn test_alu() {
        // LD A,$3A; ADD A,$C6; SUB A,$01; CP $FE
        let (mut cpu, mut bus) = machine(&[0x3E, 0x3A, 0xC6, 0xC6, 0xD6, 0x01, 0xFE, 0xFE]);

        cpu.step(&mut bus);
        cpu.step(&mut bus);
        assert_eq!(cpu.registers().a, 0x00);
        assert_eq!(cpu.registers().f, Flags::Z | Flags::H | Flags::C);

        cpu.step(&mut bus);
        assert_eq!(cpu.registers().a, 0xFF);
        assert_eq!(cpu.registers().f, Flags::N | Flags::H | Flags::C);

        cpu.step(&mut bus);
        assert_eq!(cpu.registers().a, 0xFF);
        assert_eq!(cpu.registers().f, Flags::N);
    }

    #[test]
    fn test_daa() {
        // LD A,$45; ADD A,$38; DAA
        let (mut cpu, mut bus) = machine(&[0x3E, 0x45, 0xC6, 0x38, 0x27]);
        for _ in 0..3 {
            cpu.step(&mut bus);
        }
        assert_eq!(cpu.registers().a, 0x83);
        assert!(!cpu.registers().f.contains(Flags::C));
    }

    #[test]
    fn test_push_pop_af() {
        // LD BC,$12FF; PUSH BC; POP AF
        let (mut cpu, mut bus) = machine(&[0x01, 0xFF, 0x12, 0xC5, 0xF1]);
        for _ in 0..3 {
            cpu.step(&mut bus);
        }
        assert_eq!(cpu.registers().af(), 0x12F0);
        assert_eq!(cpu.registers().sp, 0xDFF0);
    }

    #[test]
    fn test_cb_ops() {
        // LD A,$81; RLC A; BIT 7,A; SWAP A; SET 0,(HL)
        let (mut cpu, mut bus) = machine(&[0x3E, 0x81, 0xCB, 0x07, 0xCB, 0x7F, 0xCB, 0x37, 0xCB, 0xC6]);
        cpu.registers_mut().set_hl(0xC800);

        cpu.step(&mut bus);
        assert_eq!(cpu.step(&mut bus), 2);
        assert_eq!(cpu.registers().a, 0x03);
        assert!(cpu.registers().f.contains(Flags::C));

        cpu.step(&mut bus);
        assert!(cpu.registers().f.contains(Flags::Z | Flags::H));

        cpu.step(&mut bus);
        assert_eq!(cpu.registers().a, 0x30);

        assert_eq!(cpu.step(&mut bus), 4);
        assert_eq!(bus.inspect(0xC800), 0x01);
    }

    #[test]
    fn test_disassemble() {
        let (_, bus) = machine(&[0x20, 0xFE, 0xCB, 0x7E, 0xEA, 0x34, 0x12, 0xD3, 0xF8, 0x02]);

        assert_eq!(disassemble(&bus, 0xC000), ("JR NZ, $C000".to_string(), 2));
        assert_eq!(disassemble(&bus, 0xC002), ("BIT 7, (HL)".to_string(), 2));
        assert_eq!(disassemble(&bus, 0xC004), ("LD ($1234), A".to_string(), 3));
        assert_eq!(disassemble(&bus, 0xC007), ("DB $D3".to_string(), 1));
        assert_eq!(disassemble(&bus, 0xC008), ("LD HL, SP+2".to_string(), 2));
    }

    #[test]
    fn test_invalid_opcode_is_nop() {
        let (mut cpu, mut bus) = machine(&[0xD3, 0x00]);
        let before = cpu.registers();

        assert_eq!(cpu.step(&mut bus), 1);
        assert_eq!(cpu.pc(), 0xC001);
        assert_eq!(cpu.registers().af(), before.af());
    }
}
