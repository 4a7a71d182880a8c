//! VRAM - Video RAM do VDP (64 KB)
//! Armazena tiles, planos, sprites e tabelas de nome.

#[derive(Clone)]
pub struct Vram {
    data: Vec<u8>,
}

impl Vram {
    pub const SIZE: usize = 64 * 1024;

    pub fn new() -> Self {
        Self {
            data: vec![0; Self::SIZE],
        }
    }

    /// Leitura de byte
    pub fn read8(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    /// Escrita de byte
    pub fn write8(&mut self, addr: u16, value: u8) {
        self.data[addr as usize] = value;
    }

    /// Leitura de word (16 bits), sempre alinhada em endereço par
    pub fn read16(&self, addr: u16) -> u16 {
        let even = addr & !1;
        u16::from_be_bytes([self.data[even as usize], self.data[even as usize + 1]])
    }

    /// Escrita de word (16 bits), sempre alinhada em endereço par
    pub fn write16(&mut self, addr: u16, value: u16) {
        let even = addr & !1;
        let [hi, lo] = value.to_be_bytes();
        self.data[even as usize] = hi;
        self.data[even as usize + 1] = lo;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl Default for Vram {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vram_basic_rw() {
        let mut vram = Vram::new();
        vram.write16(0x100, 0xABCD);
        assert_eq!(vram.read16(0x100), 0xABCD);
        assert_eq!(vram.read8(0x100), 0xAB);
        assert_eq!(vram.read8(0x101), 0xCD);
    }

    #[test]
    fn test_vram_word_ignores_low_bit() {
        let mut vram = Vram::new();
        vram.write16(0x201, 0x1234);
        assert_eq!(vram.read8(0x200), 0x12);
        assert_eq!(vram.read8(0x201), 0x34);
        assert_eq!(vram.read16(0x201), 0x1234);
    }

    #[test]
    fn test_vram_last_word() {
        let mut vram = Vram::new();
        vram.write16(0xFFFF, 0xBEEF);
        assert_eq!(vram.read16(0xFFFE), 0xBEEF);
        assert_eq!(vram.as_slice().len(), 0x10000);
    }
}
