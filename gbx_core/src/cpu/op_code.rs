use super::Cpu;
use crate::Bus;
use lazy_static::lazy_static;

pub(super) type Op = fn(&mut Cpu, &mut Bus);

const R8_NAMES: [&str; 8] = ["B", "C", "D", "E", "H", "L", "(HL)", "A"];
const R16_NAMES: [&str; 4] = ["BC", "DE", "HL", "SP"];
const STACK_NAMES: [&str; 4] = ["BC", "DE", "HL", "AF"];
const INDIRECT_NAMES: [&str; 4] = ["(BC)", "(DE)", "(HL+)", "(HL-)"];
const ALU_NAMES: [&str; 8] = ["ADD", "ADC", "SUB", "SBC", "AND", "XOR", "OR", "CP"];
const ROT_NAMES: [&str; 8] = ["RLC", "RRC", "RL", "RR", "SLA", "SRA", "SWAP", "SRL"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    NZ,
    Z,
    NC,
    C,
}

impl Condition {
    fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            0 => Condition::NZ,
            1 => Condition::Z,
            2 => Condition::NC,
            _ => Condition::C,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    None,
    /// B C D E H L (HL) A
    R8(u8),
    /// BC DE HL SP
    R16(u8),
    /// BC DE HL AF
    Stack(u8),
    /// (BC) (DE) (HL+) (HL-)
    Indirect(u8),
    Imm8,
    Imm16,
    Addr16,
    /// (0xFF00 + n)
    HighAddr,
    /// (0xFF00 + C)
    HighC,
    Rel,
    Signed,
    /// SP plus a signed immediate
    SpOffset,
    Cond(Condition),
    Vector(u8),
    Bit(u8),
    Prefix,
}

impl Operand {
    /// bytes this operand occupies after the opcode
    pub fn size(self) -> u16 {
        match self {
            Operand::Imm8
            | Operand::HighAddr
            | Operand::Rel
            | Operand::Signed
            | Operand::SpOffset
            | Operand::Prefix => 1,
            Operand::Imm16 | Operand::Addr16 => 2,
            _ => 0,
        }
    }
}

#[derive(Clone, Copy)]
pub struct Instruction {
    pub(super) handler: Op,
    pub mnemonic: &'static str,
    pub operands: [Operand; 2],
    /// M-cycles, branch not taken
    pub cycles: u8,
    /// M-cycles, branch taken
    pub cycles_taken: u8,
}

impl Instruction {
    const INVALID: Instruction = Instruction {
        handler: Cpu::invalid,
        mnemonic: "???",
        operands: [Operand::None, Operand::None],
        cycles: 1,
        cycles_taken: 1,
    };

    pub fn length(&self) -> u16 {
        1 + self.operands[0].size() + self.operands[1].size()
    }

    pub fn is_valid(&self) -> bool {
        self.mnemonic != Self::INVALID.mnemonic
    }
}

impl std::fmt::Debug for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instruction")
            .field("mnemonic", &self.mnemonic)
            .field("operands", &self.operands)
            .field("cycles", &self.cycles)
            .field("cycles_taken", &self.cycles_taken)
            .finish()
    }
}

lazy_static! {
    pub static ref OPCODES: [Instruction; 256] = build(decode);
    pub static ref CB_OPCODES: [Instruction; 256] = build(decode_cb);
}

fn build(decode: fn(u8) -> Instruction) -> [Instruction; 256] {
    let mut table = [Instruction::INVALID; 256];
    for (op, entry) in table.iter_mut().enumerate() {
        *entry = decode(op as u8);
    }
    table
}

fn ins(handler: Op, mnemonic: &'static str, operands: [Operand; 2], cycles: u8) -> Instruction {
    Instruction {
        handler,
        mnemonic,
        operands,
        cycles,
        cycles_taken: cycles,
    }
}

fn branch(handler: Op, mnemonic: &'static str, operands: [Operand; 2], cycles: u8, taken: u8) -> Instruction {
    Instruction {
        handler,
        mnemonic,
        operands,
        cycles,
        cycles_taken: taken,
    }
}

fn alu_operands(kind: u8, src: Operand) -> [Operand; 2] {
    match kind {
        0 | 1 | 3 => [Operand::R8(7), src],
        _ => [src, Operand::None],
    }
}

fn decode(op: u8) -> Instruction {
    use Operand::*;

    let x = op >> 6;
    let y = (op >> 3) & 7;
    let z = op & 7;
    let p = y >> 1;
    let q = y & 1;
    let hl = |mem: bool, short: u8, long: u8| if mem { long } else { short };

    match op {
        0x00 => ins(Cpu::nop, "NOP", [None, None], 1),
        0x08 => ins(Cpu::ld_a16_sp, "LD", [Addr16, R16(3)], 5),
        0x10 => ins(Cpu::stop, "STOP", [Imm8, None], 1),
        0x18 => ins(Cpu::jr, "JR", [Rel, None], 3),
        0x20 | 0x28 | 0x30 | 0x38 => branch(Cpu::jr_cc, "JR", [Cond(Condition::from_bits(y)), Rel], 2, 3),
        0x07 => ins(Cpu::rlca, "RLCA", [None, None], 1),
        0x0F => ins(Cpu::rrca, "RRCA", [None, None], 1),
        0x17 => ins(Cpu::rla, "RLA", [None, None], 1),
        0x1F => ins(Cpu::rra, "RRA", [None, None], 1),
        0x27 => ins(Cpu::daa, "DAA", [None, None], 1),
        0x2F => ins(Cpu::cpl, "CPL", [None, None], 1),
        0x37 => ins(Cpu::scf, "SCF", [None, None], 1),
        0x3F => ins(Cpu::ccf, "CCF", [None, None], 1),
        0x76 => ins(Cpu::halt, "HALT", [None, None], 1),

        0xC0 | 0xC8 | 0xD0 | 0xD8 => branch(Cpu::ret_cc, "RET", [Cond(Condition::from_bits(y)), None], 2, 5),
        0xC2 | 0xCA | 0xD2 | 0xDA => branch(Cpu::jp_cc, "JP", [Cond(Condition::from_bits(y)), Imm16], 3, 4),
        0xC4 | 0xCC | 0xD4 | 0xDC => branch(Cpu::call_cc, "CALL", [Cond(Condition::from_bits(y)), Imm16], 3, 6),
        0xC3 => ins(Cpu::jp, "JP", [Imm16, None], 4),
        0xC9 => ins(Cpu::ret, "RET", [None, None], 4),
        0xCB => ins(Cpu::prefix_cb, "PREFIX", [Prefix, None], 1),
        0xCD => ins(Cpu::call, "CALL", [Imm16, None], 6),
        0xD9 => ins(Cpu::reti, "RETI", [None, None], 4),
        0xE0 => ins(Cpu::ldh_a8_a, "LDH", [HighAddr, R8(7)], 3),
        0xF0 => ins(Cpu::ldh_a_a8, "LDH", [R8(7), HighAddr], 3),
        0xE2 => ins(Cpu::ld_c_a, "LD", [HighC, R8(7)], 2),
        0xF2 => ins(Cpu::ld_a_c, "LD", [R8(7), HighC], 2),
        0xE8 => ins(Cpu::add_sp_e, "ADD", [R16(3), Signed], 4),
        0xF8 => ins(Cpu::ld_hl_sp_e, "LD", [R16(2), SpOffset], 3),
        0xE9 => ins(Cpu::jp_hl, "JP", [R16(2), None], 1),
        0xF9 => ins(Cpu::ld_sp_hl, "LD", [R16(3), R16(2)], 2),
        0xEA => ins(Cpu::ld_a16_a, "LD", [Addr16, R8(7)], 4),
        0xFA => ins(Cpu::ld_a_a16, "LD", [R8(7), Addr16], 4),
        0xF3 => ins(Cpu::di, "DI", [None, None], 1),
        0xFB => ins(Cpu::ei, "EI", [None, None], 1),

        _ if x == 0 && z == 1 && q == 0 => ins(Cpu::ld_r16_d16, "LD", [R16(p), Imm16], 3),
        _ if x == 0 && z == 1 => ins(Cpu::add_hl_r16, "ADD", [R16(2), R16(p)], 2),
        _ if x == 0 && z == 2 && q == 0 => ins(Cpu::ld_ind_a, "LD", [Indirect(p), R8(7)], 2),
        _ if x == 0 && z == 2 => ins(Cpu::ld_a_ind, "LD", [R8(7), Indirect(p)], 2),
        _ if x == 0 && z == 3 && q == 0 => ins(Cpu::inc_r16, "INC", [R16(p), None], 2),
        _ if x == 0 && z == 3 => ins(Cpu::dec_r16, "DEC", [R16(p), None], 2),
        _ if x == 0 && z == 4 => ins(Cpu::inc_r8, "INC", [R8(y), None], hl(y == 6, 1, 3)),
        _ if x == 0 && z == 5 => ins(Cpu::dec_r8, "DEC", [R8(y), None], hl(y == 6, 1, 3)),
        _ if x == 0 && z == 6 => ins(Cpu::ld_r8_d8, "LD", [R8(y), Imm8], hl(y == 6, 2, 3)),

        _ if x == 1 => ins(Cpu::ld_r8_r8, "LD", [R8(y), R8(z)], hl(y == 6 || z == 6, 1, 2)),
        _ if x == 2 => ins(Cpu::alu_r8, ALU_NAMES[y as usize], alu_operands(y, R8(z)), hl(z == 6, 1, 2)),

        _ if z == 1 && q == 0 => ins(Cpu::pop, "POP", [Stack(p), None], 3),
        _ if z == 5 && q == 0 => ins(Cpu::push, "PUSH", [Stack(p), None], 4),
        _ if z == 6 => ins(Cpu::alu_d8, ALU_NAMES[y as usize], alu_operands(y, Imm8), 2),
        _ if z == 7 => ins(Cpu::rst, "RST", [Vector(y * 8), None], 4),

        _ => Instruction::INVALID,
    }
}

fn decode_cb(op: u8) -> Instruction {
    use Operand::*;

    let x = op >> 6;
    let y = (op >> 3) & 7;
    let z = op & 7;
    let mem = z == 6;

    match x {
        0 => ins(Cpu::cb_rot, ROT_NAMES[y as usize], [R8(z), None], if mem { 4 } else { 2 }),
        1 => ins(Cpu::cb_bit, "BIT", [Bit(y), R8(z)], if mem { 3 } else { 2 }),
        2 => ins(Cpu::cb_res, "RES", [Bit(y), R8(z)], if mem { 4 } else { 2 }),
        _ => ins(Cpu::cb_set, "SET", [Bit(y), R8(z)], if mem { 4 } else { 2 }),
    }
}

/// Decodes the instruction at `addr` without side effects. Returns the text and its length.
pub fn disassemble(bus: &Bus, addr: u16) -> (String, u16) {
    let op = bus.inspect(addr);
    if op == 0xCB {
        let cb = &CB_OPCODES[bus.inspect(addr.wrapping_add(1)) as usize];
        return (format_instruction(cb, bus, addr, 2), 2);
    }

    let instr = &OPCODES[op as usize];
    if !instr.is_valid() {
        return (format!("DB ${:02X}", op), 1);
    }
    let len = instr.length();
    (format_instruction(instr, bus, addr, len), len)
}

fn format_instruction(instr: &Instruction, bus: &Bus, addr: u16, len: u16) -> String {
    let imm8 = bus.inspect(addr.wrapping_add(1));
    let imm16 = u16::from_le_bytes([imm8, bus.inspect(addr.wrapping_add(2))]);
    let next = addr.wrapping_add(len);

    let text = |op: Operand| -> Option<String> {
        Some(match op {
            Operand::None | Operand::Prefix => return Option::None,
            Operand::R8(r) => R8_NAMES[r as usize].to_string(),
            Operand::R16(r) => R16_NAMES[r as usize].to_string(),
            Operand::Stack(r) => STACK_NAMES[r as usize].to_string(),
            Operand::Indirect(r) => INDIRECT_NAMES[r as usize].to_string(),
            Operand::Imm8 => format!("${:02X}", imm8),
            Operand::Imm16 => format!("${:04X}", imm16),
            Operand::Addr16 => format!("(${:04X})", imm16),
            Operand::HighAddr => format!("($FF{:02X})", imm8),
            Operand::HighC => "($FF00+C)".to_string(),
            Operand::Rel => format!("${:04X}", next.wrapping_add(imm8 as i8 as u16)),
            Operand::Signed => format!("{:+}", imm8 as i8),
            Operand::SpOffset => format!("SP{:+}", imm8 as i8),
            Operand::Cond(c) => format!("{:?}", c),
            Operand::Vector(v) => format!("${:02X}", v),
            Operand::Bit(b) => b.to_string(),
        })
    };

    let operands = instr
        .operands
        .iter()
        .filter_map(|&op| text(op))
        .collect::<Vec<_>>();

    if operands.is_empty() {
        instr.mnemonic.to_string()
    } else {
        format!("{} {}", instr.mnemonic, operands.join(", "))
    }
}
