//! Implementação da VSRAM (Vertical Scroll RAM) do VDP.
//!
//! 40 entradas de 16 bits (80 bytes): pares (plano A, plano B) por coluna de
//! duas células. O endereço é mascarado em 0x7F; escritas acima de 0x4F são
//! descartadas e leituras nessa região retornam 0.

pub const VSRAM_SIZE: usize = 0x50;
pub const VSRAM_ADDRESS_MASK: u16 = 0x7F;

#[derive(Clone)]
pub struct Vsram {
    data: [u8; VSRAM_SIZE],
}

impl Vsram {
    pub fn new() -> Self {
        Self {
            data: [0; VSRAM_SIZE],
        }
    }

    pub fn read8(&self, addr: u16) -> u8 {
        let index = (addr & VSRAM_ADDRESS_MASK) as usize;
        self.data.get(index).copied().unwrap_or(0)
    }

    pub fn write8(&mut self, addr: u16, value: u8) {
        let index = (addr & VSRAM_ADDRESS_MASK) as usize;
        if let Some(byte) = self.data.get_mut(index) {
            *byte = value;
        }
    }

    pub fn read16(&self, addr: u16) -> u16 {
        let even = addr & !1;
        u16::from_be_bytes([self.read8(even), self.read8(even | 1)])
    }

    pub fn write16(&mut self, addr: u16, value: u16) {
        let even = addr & !1;
        let [hi, lo] = value.to_be_bytes();
        self.write8(even, hi);
        self.write8(even | 1, lo);
    }

    /// Scroll vertical (10 bits úteis, 11 em entrelaçado duplo) da entrada `index`.
    pub fn entry(&self, index: usize) -> u16 {
        self.read16((index * 2) as u16)
    }
}

impl Default for Vsram {
    fn default() -> Self {
        Self::new()
    }
}
