use bit_field::BitField;

mod palette;

pub use palette::{rgb555_to_rgba, Colors, PaletteRam, Palettes};

pub const DOTS_PER_LINE: u32 = 456;
pub const LINES_PER_FRAME: u8 = 154;
pub const VISIBLE_LINES: u8 = 144;

const OAM_SCAN_DOTS: u32 = 80;
const TRANSFER_DOTS: u32 = 172;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    HBlank = 0,
    VBlank = 1,
    OamScan = 2,
    Transfer = 3,
}

/// What happened during one call to [`Ppu::tick`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PpuEvents {
    pub vblank: bool,
    pub stat: bool,
    pub hblank: bool,
}

/// Display timing and register peer. Produces no pixels.
#[derive(Debug)]
pub struct Ppu {
    lcdc: u8,
    stat: u8,
    scy: u8,
    scx: u8,
    ly: u8,
    lyc: u8,
    wy: u8,
    wx: u8,
    opri: u8,

    dot: u32,
    mode: Mode,
    stat_line: bool,

    frames: u64,
    frame_ready: bool,

    palettes: Palettes,
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            lcdc: 0x00,
            stat: 0x00,
            scy: 0,
            scx: 0,
            ly: 0,
            lyc: 0,
            wy: 0,
            wx: 0,
            opri: 0,

            dot: 0,
            mode: Mode::HBlank,
            stat_line: false,

            frames: 0,
            frame_ready: false,

            palettes: Palettes::new(),
        }
    }

    /// State the boot ROM leaves behind.
    pub fn post_boot() -> Self {
        let mut ppu = Self::new();
        ppu.lcdc = 0x91;
        ppu.stat = 0x81;
        ppu.ly = VISIBLE_LINES;
        ppu.mode = Mode::VBlank;
        ppu
    }

    pub fn enabled(&self) -> bool {
        self.lcdc.get_bit(7)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn ly(&self) -> u8 {
        self.ly
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn palettes(&self) -> &Palettes {
        &self.palettes
    }

    pub fn set_compatibility(&mut self, on: bool) {
        self.palettes.set_compatibility(on);
    }

    pub fn vram_blocked(&self) -> bool {
        self.enabled() && self.mode == Mode::Transfer
    }

    pub fn oam_blocked(&self) -> bool {
        self.enabled() && matches!(self.mode, Mode::OamScan | Mode::Transfer)
    }

    /// Returns true once per completed frame.
    pub fn take_frame(&mut self) -> bool {
        std::mem::take(&mut self.frame_ready)
    }

    pub fn tick(&mut self, dots: u32) -> PpuEvents {
        let mut events = PpuEvents::default();
        if !self.enabled() {
            return events;
        }

        for _ in 0..dots {
            self.dot += 1;

            if self.dot == DOTS_PER_LINE {
                self.dot = 0;
                self.ly += 1;
                if self.ly == LINES_PER_FRAME {
                    self.ly = 0;
                }

                if self.ly == VISIBLE_LINES {
                    self.mode = Mode::VBlank;
                    self.frames += 1;
                    self.frame_ready = true;
                    events.vblank = true;
                } else if self.ly < VISIBLE_LINES {
                    self.mode = Mode::OamScan;
                }
            } else if self.ly < VISIBLE_LINES {
                if self.dot == OAM_SCAN_DOTS {
                    self.mode = Mode::Transfer;
                } else if self.dot == OAM_SCAN_DOTS + TRANSFER_DOTS {
                    self.mode = Mode::HBlank;
                    events.hblank = true;
                }
            }

            events.stat |= self.update_stat_line();
        }

        events
    }

    fn update_stat_line(&mut self) -> bool {
        let coincidence = self.ly == self.lyc;
        let line = (coincidence && self.stat.get_bit(6))
            || (self.mode == Mode::HBlank && self.stat.get_bit(3))
            || (self.mode == Mode::VBlank && self.stat.get_bit(4))
            || (self.mode == Mode::OamScan && self.stat.get_bit(5));

        let rising = line && !self.stat_line;
        self.stat_line = line;
        rising
    }

    fn set_enabled(&mut self, on: bool) {
        if on {
            self.dot = 0;
            self.ly = 0;
            self.mode = Mode::OamScan;
            log::debug!("lcd on");
        } else {
            self.dot = 0;
            self.ly = 0;
            self.mode = Mode::HBlank;
            self.stat_line = false;
            log::debug!("lcd off");
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF40 => self.lcdc,
            0xFF41 => {
                let mode = if self.enabled() { self.mode as u8 } else { 0 };
                0x80 | (self.stat & 0x78) | ((self.ly == self.lyc) as u8) << 2 | mode
            }
            0xFF42 => self.scy,
            0xFF43 => self.scx,
            0xFF44 => self.ly,
            0xFF45 => self.lyc,
            0xFF47 => self.palettes.bgp(),
            0xFF48 => self.palettes.obp(0),
            0xFF49 => self.palettes.obp(1),
            0xFF4A => self.wy,
            0xFF4B => self.wx,
            0xFF68 => self.palettes.cgb_bg.read_index(),
            0xFF69 => self.palettes.cgb_bg.read_data(),
            0xFF6A => self.palettes.cgb_obj.read_index(),
            0xFF6B => self.palettes.cgb_obj.read_data(),
            0xFF6C => self.opri,
            _ => 0xFF,
        }
    }

    /// Returns true when the write raises the STAT line.
    pub fn write(&mut self, addr: u16, data: u8) -> bool {
        match addr {
            0xFF40 => {
                let was = self.enabled();
                self.lcdc = data;
                if was != self.enabled() {
                    self.set_enabled(!was);
                }
            }
            0xFF41 => self.stat = data & 0x78,
            0xFF42 => self.scy = data,
            0xFF43 => self.scx = data,
            0xFF44 => log::debug!("write to LY ignored"),
            0xFF45 => self.lyc = data,
            0xFF47 => self.palettes.write_bgp(data),
            0xFF48 => self.palettes.write_obp(0, data),
            0xFF49 => self.palettes.write_obp(1, data),
            0xFF4A => self.wy = data,
            0xFF4B => self.wx = data,
            0xFF68 => self.palettes.cgb_bg.write_index(data),
            0xFF69 => {
                if self.vram_blocked() {
                    log::debug!("BCPD write during transfer dropped");
                } else {
                    self.palettes.cgb_bg.write_data(data);
                }
            }
            0xFF6A => self.palettes.cgb_obj.write_index(data),
            0xFF6B => {
                if self.vram_blocked() {
                    log::debug!("OCPD write during transfer dropped");
                } else {
                    self.palettes.cgb_obj.write_data(data);
                }
            }
            0xFF6C => self.opri = data & 0x01,
            _ => unreachable!(),
        }

        self.enabled() && self.update_stat_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running() -> Ppu {
        let mut ppu = Ppu::new();
        ppu.write(0xFF40, 0x80);
        ppu
    }

    #[test]
    fn test_line_modes() {
        let mut ppu = running();
        assert_eq!(ppu.mode(), Mode::OamScan);

        ppu.tick(80);
        assert_eq!(ppu.mode(), Mode::Transfer);
        assert!(ppu.vram_blocked() && ppu.oam_blocked());

        let events = ppu.tick(172);
        assert!(events.hblank);
        assert_eq!(ppu.mode(), Mode::HBlank);

        ppu.tick(204);
        assert_eq!(ppu.ly(), 1);
        assert_eq!(ppu.mode(), Mode::OamScan);
    }

    #[test]
    fn test_frame() {
        let mut ppu = running();

        let events = ppu.tick(DOTS_PER_LINE * VISIBLE_LINES as u32);
        assert!(events.vblank);
        assert_eq!(ppu.mode(), Mode::VBlank);
        assert!(ppu.take_frame());
        assert!(!ppu.take_frame());

        ppu.tick(DOTS_PER_LINE * 10);
        assert_eq!(ppu.ly(), 0);
        assert_eq!(ppu.frames(), 1);
    }

    #[test]
    fn test_lyc_interrupt() {
        let mut ppu = running();
        ppu.write(0xFF45, 2);
        ppu.write(0xFF41, 0x40);

        assert!(!ppu.tick(DOTS_PER_LINE).stat);
        assert!(ppu.tick(DOTS_PER_LINE).stat);
        assert_eq!(ppu.read(0xFF41) & 0x07, 0x06);
    }

    #[test]
    fn test_lcd_off() {
        let mut ppu = running();
        ppu.tick(DOTS_PER_LINE * 3 + 100);
        ppu.write(0xFF40, 0x00);

        assert_eq!(ppu.ly(), 0);
        assert_eq!(ppu.read(0xFF41) & 0x03, 0);
        assert!(!ppu.vram_blocked());
        assert_eq!(ppu.tick(DOTS_PER_LINE), PpuEvents::default());
    }
}
