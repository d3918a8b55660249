mod common;

use common::{machine, CODE};
use gbx_core::cpu::{BASE_OPCODES, CB_OPCODES};
use gbx_core::Flags;

/// M-cycles with branches not taken. Undefined opcodes cost 1, 0xCB is the prefix fetch.
#[rustfmt::skip]
const CYCLES: [u8; 256] = [
//  0  1  2  3  4  5  6  7  8  9  a  b  c  d  e  f
    1, 3, 2, 2, 1, 1, 2, 1, 5, 2, 2, 2, 1, 1, 2, 1, // 0
    1, 3, 2, 2, 1, 1, 2, 1, 3, 2, 2, 2, 1, 1, 2, 1, // 1
    2, 3, 2, 2, 1, 1, 2, 1, 2, 2, 2, 2, 1, 1, 2, 1, // 2
    2, 3, 2, 2, 3, 3, 3, 1, 2, 2, 2, 2, 1, 1, 2, 1, // 3
    1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 2, 1, // 4
    1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 2, 1, // 5
    1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 2, 1, // 6
    2, 2, 2, 2, 2, 2, 1, 2, 1, 1, 1, 1, 1, 1, 2, 1, // 7
    1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 2, 1, // 8
    1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 2, 1, // 9
    1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 2, 1, // a
    1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 2, 1, // b
    2, 3, 3, 4, 3, 4, 2, 4, 2, 4, 3, 1, 3, 6, 2, 4, // c
    2, 3, 3, 1, 3, 4, 2, 4, 2, 4, 3, 1, 3, 1, 2, 4, // d
    3, 3, 2, 1, 1, 4, 2, 4, 4, 1, 4, 1, 1, 1, 2, 4, // e
    3, 3, 2, 1, 1, 4, 2, 4, 3, 2, 4, 1, 1, 1, 2, 4, // f
];

#[rustfmt::skip]
const LENGTHS: [u16; 256] = [
//  0  1  2  3  4  5  6  7  8  9  a  b  c  d  e  f
    1, 3, 1, 1, 1, 1, 2, 1, 3, 1, 1, 1, 1, 1, 2, 1, // 0
    2, 3, 1, 1, 1, 1, 2, 1, 2, 1, 1, 1, 1, 1, 2, 1, // 1
    2, 3, 1, 1, 1, 1, 2, 1, 2, 1, 1, 1, 1, 1, 2, 1, // 2
    2, 3, 1, 1, 1, 1, 2, 1, 2, 1, 1, 1, 1, 1, 2, 1, // 3
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 4
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 5
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 6
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 7
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 8
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 9
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // a
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // b
    1, 1, 3, 3, 3, 1, 2, 1, 1, 1, 3, 2, 3, 3, 2, 1, // c
    1, 1, 3, 1, 3, 1, 2, 1, 1, 1, 3, 1, 3, 1, 2, 1, // d
    2, 1, 1, 1, 1, 1, 2, 1, 2, 1, 3, 1, 1, 1, 2, 1, // e
    2, 1, 1, 1, 1, 1, 2, 1, 2, 1, 3, 1, 1, 1, 2, 1, // f
];

const INVALID: [u8; 11] = [0xD3, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD];

fn conditional(op: u8) -> bool {
    matches!(op & 0xE7, 0x20 | 0xC0 | 0xC2 | 0xC4)
}

fn taken_cycles(op: u8) -> u8 {
    match op & 0xE7 {
        0x20 => 3,
        0xC0 => 5,
        0xC2 => 4,
        0xC4 => 6,
        _ => CYCLES[op as usize],
    }
}

fn condition_holds(op: u8, flags: Flags) -> bool {
    match (op >> 3) & 3 {
        0 => !flags.contains(Flags::Z),
        1 => flags.contains(Flags::Z),
        2 => !flags.contains(Flags::C),
        _ => flags.contains(Flags::C),
    }
}

/// Unconditional jumps, calls, returns and restarts.
fn transfers_control(op: u8) -> bool {
    matches!(op, 0x18 | 0xC3 | 0xC9 | 0xCD | 0xD9 | 0xE9) || op & 0xC7 == 0xC7
}

#[test]
fn test_table_matches_reference() {
    for op in 0..=255u8 {
        let instr = &BASE_OPCODES[op as usize];
        assert_eq!(instr.cycles, CYCLES[op as usize], "cycles of {:02X}", op);
        assert_eq!(instr.cycles_taken, taken_cycles(op), "taken cycles of {:02X}", op);
        assert_eq!(instr.length(), LENGTHS[op as usize], "length of {:02X}", op);
        assert_eq!(instr.is_valid(), !INVALID.contains(&op), "validity of {:02X}", op);
    }
}

#[test]
fn test_base_opcode_timing() {
    for op in (0..=255u8).filter(|&op| op != 0xCB) {
        for flags in [Flags::empty(), Flags::Z | Flags::C] {
            let (mut cpu, mut bus) = machine(&[op, 0x00, 0xC8], false);
            cpu.registers_mut().f = flags;

            let taken = conditional(op) && condition_holds(op, flags);
            let expected = if taken { taken_cycles(op) } else { CYCLES[op as usize] };
            assert_eq!(
                cpu.step(&mut bus),
                expected as u32,
                "cycles of {:02X} with flags {}",
                op,
                flags
            );

            if !taken && !transfers_control(op) {
                assert_eq!(
                    cpu.pc(),
                    CODE + LENGTHS[op as usize],
                    "length of {:02X}",
                    op
                );
            }
        }
    }
}

#[test]
fn test_cb_opcode_timing() {
    for op in 0..=255u8 {
        let expected = match (op >> 6, op & 7) {
            (_, z) if z != 6 => 2,
            (1, _) => 3,
            _ => 4,
        };
        assert_eq!(CB_OPCODES[op as usize].cycles, expected, "table cycles of CB {:02X}", op);
        assert_eq!(CB_OPCODES[op as usize].length(), 2);

        let (mut cpu, mut bus) = machine(&[0xCB, op], false);
        assert_eq!(cpu.step(&mut bus), expected as u32, "cycles of CB {:02X}", op);
        assert_eq!(cpu.pc(), CODE + 2);
    }
}

#[test]
fn test_branch_targets() {
    // JR NZ,+4 taken; CALL Z,$C800 not taken
    let (mut cpu, mut bus) = machine(&[0x20, 0x04], false);
    assert_eq!(cpu.step(&mut bus), 3);
    assert_eq!(cpu.pc(), CODE + 6);

    let (mut cpu, mut bus) = machine(&[0xCC, 0x00, 0xC8], false);
    assert_eq!(cpu.step(&mut bus), 3);
    assert_eq!(cpu.pc(), CODE + 3);
    assert_eq!(cpu.registers().sp, 0xDFF0);

    // CALL $C800 pushes the return address
    let (mut cpu, mut bus) = machine(&[0xCD, 0x00, 0xC8], false);
    assert_eq!(cpu.step(&mut bus), 6);
    assert_eq!(cpu.pc(), 0xC800);
    assert_eq!(bus.inspect(0xDFEF), 0xC0);
    assert_eq!(bus.inspect(0xDFEE), 0x03);
}

#[test]
fn test_ldh_and_sp_arithmetic() {
    // LD A,$5A; LDH ($80),A; LD HL,SP-1; ADD SP,+2
    let (mut cpu, mut bus) = machine(&[0x3E, 0x5A, 0xE0, 0x80, 0xF8, 0xFF, 0xE8, 0x02], false);
    for _ in 0..4 {
        cpu.step(&mut bus);
    }

    assert_eq!(bus.inspect(0xFF80), 0x5A);
    assert_eq!(cpu.registers().hl(), 0xDFEF);
    assert_eq!(cpu.registers().sp, 0xDFF2);
    assert_eq!(cpu.registers().f, Flags::empty());
}
