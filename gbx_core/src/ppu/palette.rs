use bit_field::BitField;

const PALETTE_RAM_SIZE: usize = 0x40;

/// DMG shades, lightest first (RGBA8888)
const DMG_SHADES: [u32; 4] = [0xE0F8D0FF, 0x88C070FF, 0x346856FF, 0x081820FF];

pub type Colors = [u32; 4];

/// Expands an RGB555 colour to RGBA8888.
pub fn rgb555_to_rgba(color: u16) -> u32 {
    let expand = |c: u16| {
        let c = (c & 0x1F) as u32;
        (c << 3) | (c >> 2)
    };
    let r = expand(color);
    let g = expand(color >> 5);
    let b = expand(color >> 10);
    r << 24 | g << 16 | b << 8 | 0xFF
}

fn shade_colors(data: u8, shades: &Colors) -> Colors {
    let mut colors = [0; 4];
    for (i, color) in colors.iter_mut().enumerate() {
        *color = shades[data.get_bits(i * 2..i * 2 + 2) as usize];
    }
    colors
}

/// CGB palette memory behind an index register with auto-increment.
#[derive(Debug)]
pub struct PaletteRam {
    index: u8,
    ram: [u8; PALETTE_RAM_SIZE],
    colors: [Colors; 8],
}

impl PaletteRam {
    fn new() -> Self {
        let mut ram = Self {
            index: 0,
            ram: [0xFF; PALETTE_RAM_SIZE],
            colors: [[0; 4]; 8],
        };
        for palette in 0..8 {
            ram.recompute(palette);
        }
        ram
    }

    pub fn read_index(&self) -> u8 {
        self.index
    }

    pub fn write_index(&mut self, data: u8) {
        self.index = data & 0xBF;
    }

    pub fn read_data(&self) -> u8 {
        self.ram[self.index.get_bits(0..6) as usize]
    }

    pub fn write_data(&mut self, data: u8) {
        let addr = self.index.get_bits(0..6) as usize;
        self.ram[addr] = data;
        self.recompute(addr / 8);

        if self.index.get_bit(7) {
            let next = (self.index + 1) & 0x3F;
            self.index.set_bits(0..6, next);
        }
    }

    pub fn colors(&self) -> &[Colors; 8] {
        &self.colors
    }

    fn recompute(&mut self, palette: usize) {
        for i in 0..4 {
            let addr = palette * 8 + i * 2;
            let color = u16::from_le_bytes([self.ram[addr], self.ram[addr + 1]]);
            self.colors[palette][i] = rgb555_to_rgba(color);
        }
    }
}

#[derive(Debug)]
pub struct Palettes {
    bgp: u8,
    obp: [u8; 2],
    /// DMG palettes pick from CGB palette RAM instead of the fixed shades
    compatibility: bool,
    pub cgb_bg: PaletteRam,
    pub cgb_obj: PaletteRam,
}

impl Palettes {
    pub fn new() -> Self {
        Self {
            bgp: 0xFC,
            obp: [0xFF; 2],
            compatibility: false,
            cgb_bg: PaletteRam::new(),
            cgb_obj: PaletteRam::new(),
        }
    }

    pub fn bgp(&self) -> u8 {
        self.bgp
    }

    pub fn obp(&self, index: usize) -> u8 {
        self.obp[index]
    }

    pub fn set_compatibility(&mut self, on: bool) {
        self.compatibility = on;
    }

    pub fn write_bgp(&mut self, data: u8) {
        self.bgp = data;
    }

    pub fn write_obp(&mut self, index: usize, data: u8) {
        self.obp[index] = data;
    }

    /// Background colours selected by BGP.
    pub fn dmg_bg(&self) -> Colors {
        if self.compatibility {
            shade_colors(self.bgp, &self.cgb_bg.colors()[0])
        } else {
            shade_colors(self.bgp, &DMG_SHADES)
        }
    }

    /// Object colours selected by OBP0/OBP1.
    pub fn dmg_obj(&self, index: usize) -> Colors {
        if self.compatibility {
            shade_colors(self.obp[index], &self.cgb_obj.colors()[index])
        } else {
            shade_colors(self.obp[index], &DMG_SHADES)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb555() {
        assert_eq!(rgb555_to_rgba(0x0000), 0x000000FF);
        assert_eq!(rgb555_to_rgba(0x7FFF), 0xFFFFFFFF);
        assert_eq!(rgb555_to_rgba(0x001F), 0xFF0000FF);
        assert_eq!(rgb555_to_rgba(0x7C00), 0x0000FFFF);
    }

    #[test]
    fn test_dmg_palette() {
        let mut palettes = Palettes::new();
        assert_eq!(palettes.dmg_bg(), [DMG_SHADES[0], DMG_SHADES[3], DMG_SHADES[3], DMG_SHADES[3]]);
        palettes.write_bgp(0b11_10_01_00);
        assert_eq!(palettes.dmg_bg(), DMG_SHADES);

        palettes.write_obp(1, 0b00_00_00_11);
        assert_eq!(palettes.dmg_obj(1)[0], DMG_SHADES[3]);
        assert_eq!(palettes.dmg_obj(1)[1], DMG_SHADES[0]);
    }

    #[test]
    fn test_compatibility_palettes() {
        let mut palettes = Palettes::new();
        palettes.set_compatibility(true);

        palettes.cgb_obj.write_index(0x80 | 0x08);
        for color in [0x001F_u16, 0x03E0, 0x7C00, 0x0000] {
            let [lo, hi] = color.to_le_bytes();
            palettes.cgb_obj.write_data(lo);
            palettes.cgb_obj.write_data(hi);
        }

        palettes.write_obp(1, 0b00_01_10_11);
        assert_eq!(
            palettes.dmg_obj(1),
            [0x000000FF, 0x0000FFFF, 0x00FF00FF, 0xFF0000FF]
        );
        assert_eq!(palettes.dmg_bg(), [0xFFFFFFFF; 4]);
    }

    #[test]
    fn test_auto_increment() {
        let mut ram = PaletteRam::new();
        ram.write_index(0x80 | 0x3E);
        ram.write_data(0x1F);
        ram.write_data(0x00);
        assert_eq!(ram.read_index(), 0x80);

        ram.write_index(0x3E);
        assert_eq!(ram.read_data(), 0x1F);
        assert_eq!(ram.colors()[7][3], 0xFF0000FF);
    }
}
