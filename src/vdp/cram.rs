//! Color RAM (CRAM): 64 cores de 9 bits, 128 bytes.
//! Cada cor é uma word big-endian no formato `0000 BBB0 GGG0 RRR0`.
//!
//! Mantém um cache de paleta (código de 9 bits + RGB normal) recalculado a
//! cada escrita de byte.

use lazy_static::lazy_static;

pub const CRAM_SIZE: usize = 0x80;
pub const COLORS: usize = CRAM_SIZE / 2;

/// Intensidade de um pixel após shadow/highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Shade {
    Shadow = 0,
    Normal = 1,
    Highlight = 2,
}

impl Shade {
    pub fn darker(self) -> Self {
        match self {
            Shade::Highlight => Shade::Normal,
            _ => Shade::Shadow,
        }
    }

    pub fn brighter(self) -> Self {
        match self {
            Shade::Shadow => Shade::Normal,
            _ => Shade::Highlight,
        }
    }
}

// Níveis medidos na saída do DAC, por intensidade de 3 bits.
const SHADOW_LEVELS: [u8; 8] = [0, 29, 52, 70, 87, 101, 116, 130];
const NORMAL_LEVELS: [u8; 8] = [0, 52, 87, 116, 144, 172, 206, 255];
const HIGHLIGHT_LEVELS: [u8; 8] = [130, 144, 158, 172, 187, 206, 228, 255];

lazy_static! {
    /// ARGB8888 para cada código de cor de 9 bits (`BBBGGGRRR`) e cada `Shade`.
    static ref RGB_LOOKUP: [[u32; 512]; 3] = {
        let mut table = [[0u32; 512]; 3];
        for (shade, levels) in [SHADOW_LEVELS, NORMAL_LEVELS, HIGHLIGHT_LEVELS].iter().enumerate() {
            for code in 0..512usize {
                let r = levels[code & 7] as u32;
                let g = levels[(code >> 3) & 7] as u32;
                let b = levels[(code >> 6) & 7] as u32;
                table[shade][code] = 0xFF00_0000 | (r << 16) | (g << 8) | b;
            }
        }
        table
    };
}

/// Converte uma word da CRAM no código compacto `BBBGGGRRR`.
pub fn color_code(word: u16) -> u16 {
    ((word >> 1) & 0x7) | ((word >> 2) & 0x38) | ((word >> 3) & 0x1C0)
}

pub fn to_argb(code: u16, shade: Shade) -> u32 {
    RGB_LOOKUP[shade as usize][(code & 0x1FF) as usize]
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaletteEntry {
    pub code: u16,
    pub argb: u32,
}

#[derive(Clone)]
pub struct Cram {
    data: [u8; CRAM_SIZE],
    palette: [PaletteEntry; COLORS],
}

impl Cram {
    pub fn new() -> Self {
        let black = PaletteEntry {
            code: 0,
            argb: to_argb(0, Shade::Normal),
        };
        Self {
            data: [0; CRAM_SIZE],
            palette: [black; COLORS],
        }
    }

    pub fn read8(&self, addr: u16) -> u8 {
        self.data[addr as usize & (CRAM_SIZE - 1)]
    }

    pub fn write8(&mut self, addr: u16, value: u8) {
        let index = addr as usize & (CRAM_SIZE - 1);
        self.data[index] = value;
        self.update_palette(index & !1);
    }

    pub fn read16(&self, addr: u16) -> u16 {
        let even = addr as usize & (CRAM_SIZE - 2);
        u16::from_be_bytes([self.data[even], self.data[even + 1]])
    }

    pub fn write16(&mut self, addr: u16, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        let even = addr & !1;
        self.write8(even, hi);
        self.write8(even | 1, lo);
    }

    fn update_palette(&mut self, even: usize) {
        let word = u16::from_be_bytes([self.data[even], self.data[even + 1]]);
        let code = color_code(word);
        self.palette[even / 2] = PaletteEntry {
            code,
            argb: to_argb(code, Shade::Normal),
        };
    }

    /// Entrada do cache de paleta para o índice de cor 0..63.
    pub fn color(&self, index: usize) -> PaletteEntry {
        self.palette[index % COLORS]
    }

    pub fn argb(&self, index: usize, shade: Shade) -> u32 {
        match shade {
            Shade::Normal => self.color(index).argb,
            _ => to_argb(self.color(index).code, shade),
        }
    }
}

impl Default for Cram {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_code() {
        assert_eq!(color_code(0x000E), 0x007);
        assert_eq!(color_code(0x00E0), 0x038);
        assert_eq!(color_code(0x0E00), 0x1C0);
        assert_eq!(color_code(0x0EEE), 0x1FF);
    }

    #[test]
    fn test_palette_cache_follows_byte_writes() {
        let mut cram = Cram::new();
        cram.write8(0x02, 0x0E);
        assert_eq!(cram.color(1).code, 0x1C0);
        assert_eq!(cram.color(1).argb, 0xFF0000FF);

        cram.write8(0x03, 0x0E);
        assert_eq!(cram.color(1).argb, 0xFFFF00FF);
    }

    #[test]
    fn test_cram_address_wraps() {
        let mut cram = Cram::new();
        cram.write16(0x80, 0x0EEE);
        assert_eq!(cram.read16(0x00), 0x0EEE);
        assert_eq!(cram.color(0).argb, 0xFFFFFFFF);
    }

    #[test]
    fn test_shade_levels() {
        assert_eq!(to_argb(0x1FF, Shade::Shadow), 0xFF828282);
        assert_eq!(to_argb(0, Shade::Highlight), 0xFF828282);
        assert_eq!(Shade::Normal.darker(), Shade::Shadow);
        assert_eq!(Shade::Shadow.darker(), Shade::Shadow);
        assert_eq!(Shade::Normal.brighter(), Shade::Highlight);
    }
}
