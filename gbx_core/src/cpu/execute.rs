use super::op_code::CB_OPCODES;
use super::{Cpu, CpuState, Flags};
use crate::Bus;

impl Cpu {
    fn fetch_byte(&mut self, bus: &mut Bus) -> u8 {
        let b = bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        b
    }

    fn fetch_word(&mut self, bus: &mut Bus) -> u16 {
        let lo = self.fetch_byte(bus);
        let hi = self.fetch_byte(bus);
        u16::from_le_bytes([lo, hi])
    }

    /// Two writes, high byte first.
    pub(super) fn push_word(&mut self, bus: &mut Bus, v: u16) {
        let [hi, lo] = v.to_be_bytes();
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.write(self.regs.sp, hi);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.write(self.regs.sp, lo);
    }

    fn push_internal(&mut self, bus: &mut Bus, v: u16) {
        bus.tick();
        self.push_word(bus, v);
    }

    fn pop_word(&mut self, bus: &mut Bus) -> u16 {
        let lo = bus.read(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = bus.read(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        u16::from_le_bytes([lo, hi])
    }

    fn get_r8(&mut self, bus: &mut Bus, r: u8) -> u8 {
        match r {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => self.regs.h,
            5 => self.regs.l,
            6 => bus.read(self.regs.hl()),
            _ => self.regs.a,
        }
    }

    fn set_r8(&mut self, bus: &mut Bus, r: u8, v: u8) {
        match r {
            0 => self.regs.b = v,
            1 => self.regs.c = v,
            2 => self.regs.d = v,
            3 => self.regs.e = v,
            4 => self.regs.h = v,
            5 => self.regs.l = v,
            6 => bus.write(self.regs.hl(), v),
            _ => self.regs.a = v,
        }
    }

    fn get_r16(&self, r: u8) -> u16 {
        match r {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.regs.hl(),
            _ => self.regs.sp,
        }
    }

    fn set_r16(&mut self, r: u8, v: u16) {
        match r {
            0 => self.regs.set_bc(v),
            1 => self.regs.set_de(v),
            2 => self.regs.set_hl(v),
            _ => self.regs.sp = v,
        }
    }

    /// (BC) (DE) (HL+) (HL-)
    fn indirect_addr(&mut self, r: u8) -> u16 {
        match r {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => {
                let hl = self.regs.hl();
                self.regs.set_hl(hl.wrapping_add(1));
                hl
            }
            _ => {
                let hl = self.regs.hl();
                self.regs.set_hl(hl.wrapping_sub(1));
                hl
            }
        }
    }

    fn condition(&self) -> bool {
        let f = self.regs.f;
        match (self.op >> 3) & 3 {
            0 => !f.contains(Flags::Z),
            1 => f.contains(Flags::Z),
            2 => !f.contains(Flags::C),
            _ => f.contains(Flags::C),
        }
    }

    fn set_flags(&mut self, z: bool, n: bool, h: bool, c: bool) {
        self.regs.f.set(Flags::Z, z);
        self.regs.f.set(Flags::N, n);
        self.regs.f.set(Flags::H, h);
        self.regs.f.set(Flags::C, c);
    }

    fn alu(&mut self, kind: u8, v: u8) {
        let a = self.regs.a;
        let carry = self.regs.f.contains(Flags::C) as u8;

        match kind {
            0 | 1 => {
                let c = if kind == 1 { carry } else { 0 };
                let r = a as u16 + v as u16 + c as u16;
                let h = (a & 0xF) + (v & 0xF) + c > 0xF;
                self.regs.a = r as u8;
                self.set_flags(r as u8 == 0, false, h, r > 0xFF);
            }
            2 | 3 | 7 => {
                let c = if kind == 3 { carry } else { 0 };
                let r = (a as i16) - (v as i16) - (c as i16);
                let h = ((a & 0xF) as i16) - ((v & 0xF) as i16) - (c as i16) < 0;
                if kind != 7 {
                    self.regs.a = r as u8;
                }
                self.set_flags(r as u8 == 0, true, h, r < 0);
            }
            4 => {
                self.regs.a = a & v;
                self.set_flags(self.regs.a == 0, false, true, false);
            }
            5 => {
                self.regs.a = a ^ v;
                self.set_flags(self.regs.a == 0, false, false, false);
            }
            _ => {
                self.regs.a = a | v;
                self.set_flags(self.regs.a == 0, false, false, false);
            }
        }
    }

    /// SP + signed immediate, flags from the low byte.
    fn sp_offset(&mut self, e: u8) -> u16 {
        let sp = self.regs.sp;
        let h = (sp & 0xF) + (e as u16 & 0xF) > 0xF;
        let c = (sp & 0xFF) + e as u16 > 0xFF;
        self.set_flags(false, false, h, c);
        sp.wrapping_add(e as i8 as u16)
    }

    /// RLC RRC RL RR SLA SRA SWAP SRL
    fn rotate(&mut self, kind: u8, v: u8) -> u8 {
        let carry = self.regs.f.contains(Flags::C) as u8;
        let (r, c) = match kind {
            0 => (v.rotate_left(1), v & 0x80 != 0),
            1 => (v.rotate_right(1), v & 0x01 != 0),
            2 => (v << 1 | carry, v & 0x80 != 0),
            3 => (v >> 1 | carry << 7, v & 0x01 != 0),
            4 => (v << 1, v & 0x80 != 0),
            5 => (v >> 1 | (v & 0x80), v & 0x01 != 0),
            6 => (v.rotate_left(4), false),
            _ => (v >> 1, v & 0x01 != 0),
        };
        self.set_flags(r == 0, false, false, c);
        r
    }
}

// Handlers. `self.op` holds the opcode being executed.
impl Cpu {
    pub(super) fn invalid(&mut self, _bus: &mut Bus) {
        log::warn!(
            "invalid opcode {:02X} at {:04X}",
            self.op,
            self.regs.pc.wrapping_sub(1)
        );
    }

    pub(super) fn nop(&mut self, _bus: &mut Bus) {}

    pub(super) fn stop(&mut self, bus: &mut Bus) {
        self.regs.pc = self.regs.pc.wrapping_add(1);
        bus.reset_divider();
        if !bus.switch_speed() {
            log::debug!("stopped at {:04X}", self.regs.pc);
            self.state = CpuState::Stopped;
        }
    }

    pub(super) fn halt(&mut self, bus: &mut Bus) {
        if bus.pending_interrupts() == 0 {
            self.state = CpuState::Halted;
        } else if !self.ime && self.ime_delay == 0 {
            self.halt_bug = true;
        }
    }

    pub(super) fn di(&mut self, _bus: &mut Bus) {
        self.ime = false;
        self.ime_delay = 0;
    }

    pub(super) fn ei(&mut self, _bus: &mut Bus) {
        if !self.ime && self.ime_delay == 0 {
            self.ime_delay = 2;
        }
    }

    pub(super) fn ld_r16_d16(&mut self, bus: &mut Bus) {
        let v = self.fetch_word(bus);
        self.set_r16(self.op >> 4 & 3, v);
    }

    pub(super) fn ld_ind_a(&mut self, bus: &mut Bus) {
        let addr = self.indirect_addr(self.op >> 4 & 3);
        bus.write(addr, self.regs.a);
    }

    pub(super) fn ld_a_ind(&mut self, bus: &mut Bus) {
        let addr = self.indirect_addr(self.op >> 4 & 3);
        self.regs.a = bus.read(addr);
    }

    pub(super) fn inc_r16(&mut self, bus: &mut Bus) {
        let r = self.op >> 4 & 3;
        bus.tick();
        self.set_r16(r, self.get_r16(r).wrapping_add(1));
    }

    pub(super) fn dec_r16(&mut self, bus: &mut Bus) {
        let r = self.op >> 4 & 3;
        bus.tick();
        self.set_r16(r, self.get_r16(r).wrapping_sub(1));
    }

    pub(super) fn inc_r8(&mut self, bus: &mut Bus) {
        let r = self.op >> 3 & 7;
        let v = self.get_r8(bus, r);
        let res = v.wrapping_add(1);
        self.set_r8(bus, r, res);
        let c = self.regs.f.contains(Flags::C);
        self.set_flags(res == 0, false, v & 0xF == 0xF, c);
    }

    pub(super) fn dec_r8(&mut self, bus: &mut Bus) {
        let r = self.op >> 3 & 7;
        let v = self.get_r8(bus, r);
        let res = v.wrapping_sub(1);
        self.set_r8(bus, r, res);
        let c = self.regs.f.contains(Flags::C);
        self.set_flags(res == 0, true, v & 0xF == 0, c);
    }

    pub(super) fn ld_r8_d8(&mut self, bus: &mut Bus) {
        let v = self.fetch_byte(bus);
        self.set_r8(bus, self.op >> 3 & 7, v);
    }

    pub(super) fn rlca(&mut self, _bus: &mut Bus) {
        self.regs.a = self.rotate(0, self.regs.a);
        self.regs.f.remove(Flags::Z);
    }

    pub(super) fn rrca(&mut self, _bus: &mut Bus) {
        self.regs.a = self.rotate(1, self.regs.a);
        self.regs.f.remove(Flags::Z);
    }

    pub(super) fn rla(&mut self, _bus: &mut Bus) {
        self.regs.a = self.rotate(2, self.regs.a);
        self.regs.f.remove(Flags::Z);
    }

    pub(super) fn rra(&mut self, _bus: &mut Bus) {
        self.regs.a = self.rotate(3, self.regs.a);
        self.regs.f.remove(Flags::Z);
    }

    pub(super) fn ld_a16_sp(&mut self, bus: &mut Bus) {
        let addr = self.fetch_word(bus);
        let [hi, lo] = self.regs.sp.to_be_bytes();
        bus.write(addr, lo);
        bus.write(addr.wrapping_add(1), hi);
    }

    pub(super) fn add_hl_r16(&mut self, bus: &mut Bus) {
        let hl = self.regs.hl();
        let v = self.get_r16(self.op >> 4 & 3);
        bus.tick();

        let (res, c) = hl.overflowing_add(v);
        let h = (hl & 0xFFF) + (v & 0xFFF) > 0xFFF;
        let z = self.regs.f.contains(Flags::Z);
        self.set_flags(z, false, h, c);
        self.regs.set_hl(res);
    }

    pub(super) fn jr(&mut self, bus: &mut Bus) {
        let e = self.fetch_byte(bus) as i8;
        bus.tick();
        self.regs.pc = self.regs.pc.wrapping_add(e as u16);
    }

    pub(super) fn jr_cc(&mut self, bus: &mut Bus) {
        let e = self.fetch_byte(bus) as i8;
        if self.condition() {
            bus.tick();
            self.regs.pc = self.regs.pc.wrapping_add(e as u16);
        }
    }

    pub(super) fn daa(&mut self, _bus: &mut Bus) {
        let f = self.regs.f;
        let mut a = self.regs.a;
        let mut carry = f.contains(Flags::C);

        if !f.contains(Flags::N) {
            if carry || a > 0x99 {
                a = a.wrapping_add(0x60);
                carry = true;
            }
            if f.contains(Flags::H) || a & 0x0F > 0x09 {
                a = a.wrapping_add(0x06);
            }
        } else {
            if carry {
                a = a.wrapping_sub(0x60);
            }
            if f.contains(Flags::H) {
                a = a.wrapping_sub(0x06);
            }
        }

        self.regs.a = a;
        self.set_flags(a == 0, f.contains(Flags::N), false, carry);
    }

    pub(super) fn cpl(&mut self, _bus: &mut Bus) {
        self.regs.a = !self.regs.a;
        self.regs.f.insert(Flags::N | Flags::H);
    }

    pub(super) fn scf(&mut self, _bus: &mut Bus) {
        self.regs.f.remove(Flags::N | Flags::H);
        self.regs.f.insert(Flags::C);
    }

    pub(super) fn ccf(&mut self, _bus: &mut Bus) {
        self.regs.f.remove(Flags::N | Flags::H);
        self.regs.f.toggle(Flags::C);
    }

    pub(super) fn ld_r8_r8(&mut self, bus: &mut Bus) {
        let v = self.get_r8(bus, self.op & 7);
        self.set_r8(bus, self.op >> 3 & 7, v);
    }

    pub(super) fn alu_r8(&mut self, bus: &mut Bus) {
        let v = self.get_r8(bus, self.op & 7);
        self.alu(self.op >> 3 & 7, v);
    }

    pub(super) fn alu_d8(&mut self, bus: &mut Bus) {
        let v = self.fetch_byte(bus);
        self.alu(self.op >> 3 & 7, v);
    }

    pub(super) fn ret_cc(&mut self, bus: &mut Bus) {
        bus.tick();
        if self.condition() {
            self.regs.pc = self.pop_word(bus);
            bus.tick();
        }
    }

    pub(super) fn ret(&mut self, bus: &mut Bus) {
        self.regs.pc = self.pop_word(bus);
        bus.tick();
    }

    pub(super) fn reti(&mut self, bus: &mut Bus) {
        self.ret(bus);
        self.ime = true;
    }

    pub(super) fn pop(&mut self, bus: &mut Bus) {
        let v = self.pop_word(bus);
        match self.op >> 4 & 3 {
            3 => self.regs.set_af(v),
            r => self.set_r16(r, v),
        }
    }

    pub(super) fn push(&mut self, bus: &mut Bus) {
        let v = match self.op >> 4 & 3 {
            3 => self.regs.af(),
            r => self.get_r16(r),
        };
        self.push_internal(bus, v);
    }

    pub(super) fn jp(&mut self, bus: &mut Bus) {
        let addr = self.fetch_word(bus);
        bus.tick();
        self.regs.pc = addr;
    }

    pub(super) fn jp_cc(&mut self, bus: &mut Bus) {
        let addr = self.fetch_word(bus);
        if self.condition() {
            bus.tick();
            self.regs.pc = addr;
        }
    }

    pub(super) fn jp_hl(&mut self, _bus: &mut Bus) {
        self.regs.pc = self.regs.hl();
    }

    pub(super) fn call(&mut self, bus: &mut Bus) {
        let addr = self.fetch_word(bus);
        self.push_internal(bus, self.regs.pc);
        self.regs.pc = addr;
    }

    pub(super) fn call_cc(&mut self, bus: &mut Bus) {
        let addr = self.fetch_word(bus);
        if self.condition() {
            self.push_internal(bus, self.regs.pc);
            self.regs.pc = addr;
        }
    }

    pub(super) fn rst(&mut self, bus: &mut Bus) {
        self.push_internal(bus, self.regs.pc);
        self.regs.pc = (self.op & 0x38) as u16;
    }

    pub(super) fn ldh_a8_a(&mut self, bus: &mut Bus) {
        let n = self.fetch_byte(bus);
        bus.write(0xFF00 | n as u16, self.regs.a);
    }

    pub(super) fn ldh_a_a8(&mut self, bus: &mut Bus) {
        let n = self.fetch_byte(bus);
        self.regs.a = bus.read(0xFF00 | n as u16);
    }

    pub(super) fn ld_c_a(&mut self, bus: &mut Bus) {
        bus.write(0xFF00 | self.regs.c as u16, self.regs.a);
    }

    pub(super) fn ld_a_c(&mut self, bus: &mut Bus) {
        self.regs.a = bus.read(0xFF00 | self.regs.c as u16);
    }

    pub(super) fn ld_a16_a(&mut self, bus: &mut Bus) {
        let addr = self.fetch_word(bus);
        bus.write(addr, self.regs.a);
    }

    pub(super) fn ld_a_a16(&mut self, bus: &mut Bus) {
        let addr = self.fetch_word(bus);
        self.regs.a = bus.read(addr);
    }

    pub(super) fn add_sp_e(&mut self, bus: &mut Bus) {
        let e = self.fetch_byte(bus);
        let sp = self.sp_offset(e);
        bus.tick();
        bus.tick();
        self.regs.sp = sp;
    }

    pub(super) fn ld_hl_sp_e(&mut self, bus: &mut Bus) {
        let e = self.fetch_byte(bus);
        let v = self.sp_offset(e);
        bus.tick();
        self.regs.set_hl(v);
    }

    pub(super) fn ld_sp_hl(&mut self, bus: &mut Bus) {
        bus.tick();
        self.regs.sp = self.regs.hl();
    }

    pub(super) fn prefix_cb(&mut self, bus: &mut Bus) {
        self.op = self.fetch_byte(bus);
        let handler = CB_OPCODES[self.op as usize].handler;
        handler(self, bus);
    }

    pub(super) fn cb_rot(&mut self, bus: &mut Bus) {
        let r = self.op & 7;
        let v = self.get_r8(bus, r);
        let res = self.rotate(self.op >> 3 & 7, v);
        self.set_r8(bus, r, res);
    }

    pub(super) fn cb_bit(&mut self, bus: &mut Bus) {
        let v = self.get_r8(bus, self.op & 7);
        let set = v & (1 << (self.op >> 3 & 7)) != 0;
        let c = self.regs.f.contains(Flags::C);
        self.set_flags(!set, false, true, c);
    }

    pub(super) fn cb_res(&mut self, bus: &mut Bus) {
        let r = self.op & 7;
        let v = self.get_r8(bus, r);
        self.set_r8(bus, r, v & !(1 << (self.op >> 3 & 7)));
    }

    pub(super) fn cb_set(&mut self, bus: &mut Bus) {
        let r = self.op & 7;
        let v = self.get_r8(bus, r);
        self.set_r8(bus, r, v | 1 << (self.op >> 3 & 7));
    }
}
