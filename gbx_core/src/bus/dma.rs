use bit_field::BitField;

pub const OAM_DMA_LENGTH: u16 = 0xA0;
pub const OAM_DMA_CYCLES: u32 = 160;
pub const OAM_DMA_SOURCE_MAX: u8 = 0xDF;

pub const VRAM_DMA_BLOCK: u16 = 0x10;
/// M-cycles per copied block in normal speed
pub const VRAM_DMA_BLOCK_CYCLES: u32 = 8;

#[derive(Debug, Default)]
pub struct OamDma {
    page: u8,
}

impl OamDma {
    /// Latches a source page. Returns the source address if the page is valid.
    pub fn start(&mut self, page: u8) -> Option<u16> {
        self.page = page;
        if page > OAM_DMA_SOURCE_MAX {
            None
        } else {
            Some((page as u16) << 8)
        }
    }

    pub fn page(&self) -> u8 {
        self.page
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VramDmaMode {
    GeneralPurpose,
    HBlank,
}

#[derive(Debug)]
pub struct VramDma {
    regs: [u8; 4],
    source: u16,
    dest: u16,
    remaining: u16,
    mode: VramDmaMode,
    active: bool,
}

impl Default for VramDma {
    fn default() -> Self {
        Self {
            regs: [0xFF; 4],
            source: 0,
            dest: 0,
            remaining: 0,
            mode: VramDmaMode::GeneralPurpose,
            active: false,
        }
    }
}

impl VramDma {
    /// HDMA1-4
    pub fn write_reg(&mut self, index: usize, data: u8) {
        self.regs[index] = data;
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn mode(&self) -> VramDmaMode {
        self.mode
    }

    pub fn remaining(&self) -> u16 {
        self.remaining
    }

    /// Decodes an HDMA5 write. Returns the mode of a newly started transfer.
    pub fn start(&mut self, data: u8) -> Option<VramDmaMode> {
        if self.active && self.mode == VramDmaMode::HBlank && !data.get_bit(7) {
            self.active = false;
            return None;
        }

        self.source = (self.regs[0] as u16) << 8 | (self.regs[1] & 0xF0) as u16;
        self.dest = 0x8000 | ((self.regs[2] & 0x1F) as u16) << 8 | (self.regs[3] & 0xF0) as u16;
        self.remaining = data.get_bits(0..7) as u16 + 1;
        self.mode = if data.get_bit(7) {
            VramDmaMode::HBlank
        } else {
            VramDmaMode::GeneralPurpose
        };
        self.active = true;

        Some(self.mode)
    }

    pub fn source(&self) -> u16 {
        self.source
    }

    pub fn abort(&mut self) {
        self.active = false;
        self.remaining = 0;
    }

    /// Next block as (source, destination). Deactivates after the last block.
    pub fn next_block(&mut self) -> Option<(u16, u16)> {
        if !self.active || self.remaining == 0 {
            return None;
        }

        let block = (self.source, self.dest);
        self.source = self.source.wrapping_add(VRAM_DMA_BLOCK);
        self.dest = 0x8000 | (self.dest.wrapping_add(VRAM_DMA_BLOCK) & 0x1FFF);
        self.remaining -= 1;
        if self.remaining == 0 {
            self.active = false;
        }

        Some(block)
    }

    /// HDMA5 read
    pub fn status(&self) -> u8 {
        let blocks = (self.remaining.wrapping_sub(1) & 0x7F) as u8;
        if self.active {
            blocks
        } else {
            0x80 | blocks
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oam_source_page() {
        let mut dma = OamDma::default();
        assert_eq!(dma.start(0xC1), Some(0xC100));
        assert_eq!(dma.start(0xE0), None);
        assert_eq!(dma.page(), 0xE0);
    }

    #[test]
    fn test_vram_addresses() {
        let mut dma = VramDma::default();
        dma.write_reg(0, 0xC1);
        dma.write_reg(1, 0x2F);
        dma.write_reg(2, 0xF3);
        dma.write_reg(3, 0x4A);

        assert_eq!(dma.start(0x01), Some(VramDmaMode::GeneralPurpose));
        assert_eq!(dma.next_block(), Some((0xC120, 0x9340)));
        assert_eq!(dma.status(), 0x00);
        assert_eq!(dma.next_block(), Some((0xC130, 0x9350)));
        assert!(!dma.active());
        assert_eq!(dma.status(), 0xFF);
    }

    #[test]
    fn test_hblank_cancel() {
        let mut dma = VramDma::default();
        dma.write_reg(0, 0xC0);
        dma.write_reg(1, 0x00);
        dma.write_reg(2, 0x00);
        dma.write_reg(3, 0x00);

        assert_eq!(dma.start(0x83), Some(VramDmaMode::HBlank));
        dma.next_block();
        assert_eq!(dma.status(), 0x02);

        assert_eq!(dma.start(0x00), None);
        assert!(!dma.active());
        assert_eq!(dma.status(), 0x82);
    }
}
