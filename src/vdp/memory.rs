//! Interface de memória do VDP: agrupa VRAM, CRAM e VSRAM e mantém o cache
//! da Sprite Attribute Table (SAT) sincronizado com as escritas na VRAM.

use super::cram::Cram;
use super::vram::Vram;
use super::vsram::Vsram;

/// 80 sprites × 8 bytes.
pub const SAT_CACHE_SIZE: usize = 0x280;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VdpRamType {
    Vram,
    Cram,
    Vsram,
}

#[derive(Clone)]
pub struct VdpMemory {
    pub vram: Vram,
    pub cram: Cram,
    pub vsram: Vsram,
    sat_cache: [u8; SAT_CACHE_SIZE],
    sat_base: u16,
}

impl VdpMemory {
    pub fn new() -> Self {
        Self {
            vram: Vram::new(),
            cram: Cram::new(),
            vsram: Vsram::new(),
            sat_cache: [0; SAT_CACHE_SIZE],
            sat_base: 0,
        }
    }

    pub fn write_vram_byte(&mut self, addr: u16, value: u8) {
        self.vram.write8(addr, value);
        let offset = addr.wrapping_sub(self.sat_base) as usize;
        if offset < SAT_CACHE_SIZE {
            self.sat_cache[offset] = value;
        }
    }

    pub fn write_vram_word(&mut self, addr: u16, value: u16) {
        let even = addr & !1;
        let [hi, lo] = value.to_be_bytes();
        self.write_vram_byte(even, hi);
        self.write_vram_byte(even | 1, lo);
    }

    pub fn write_word(&mut self, ram: VdpRamType, addr: u16, value: u16) {
        match ram {
            VdpRamType::Vram => self.write_vram_word(addr, value),
            VdpRamType::Cram => self.cram.write16(addr, value),
            VdpRamType::Vsram => self.vsram.write16(addr, value),
        }
    }

    pub fn read_word(&self, ram: VdpRamType, addr: u16) -> u16 {
        match ram {
            VdpRamType::Vram => self.vram.read16(addr),
            VdpRamType::Cram => self.cram.read16(addr),
            VdpRamType::Vsram => self.vsram.read16(addr),
        }
    }

    /// Move a janela da SAT. O cache não é recarregado: como no hardware,
    /// ele só enxerga as escritas feitas depois da mudança.
    pub fn set_sat_base(&mut self, base: u16) {
        self.sat_base = base;
    }

    pub fn sat_base(&self) -> u16 {
        self.sat_base
    }

    pub fn sat_cache(&self) -> &[u8] {
        &self.sat_cache
    }
}

impl Default for VdpMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sat_cache_mirrors_window() {
        let mut mem = VdpMemory::new();
        mem.set_sat_base(0xF800);
        mem.write_vram_word(0xF800, 0x0180);
        mem.write_vram_byte(0xF800 + 0x27F, 0x55);
        mem.write_vram_byte(0xF800 + 0x280, 0x66);
        mem.write_vram_byte(0xF7FF, 0x77);

        let cache = mem.sat_cache();
        assert_eq!(cache[0], 0x01);
        assert_eq!(cache[1], 0x80);
        assert_eq!(cache[0x27F], 0x55);
        assert_eq!(mem.vram.read8(0xFA80), 0x66);
        assert!(!cache.contains(&0x66));
        assert!(!cache.contains(&0x77));
    }

    #[test]
    fn test_sat_window_move_keeps_stale_cache() {
        let mut mem = VdpMemory::new();
        mem.set_sat_base(0x0000);
        mem.write_vram_byte(0x0000, 0xAA);
        mem.set_sat_base(0x1000);
        assert_eq!(mem.sat_cache()[0], 0xAA);
        mem.write_vram_byte(0x1000, 0xBB);
        assert_eq!(mem.sat_cache()[0], 0xBB);
    }

    #[test]
    fn test_word_routing() {
        let mut mem = VdpMemory::new();
        mem.write_word(VdpRamType::Cram, 0x02, 0x0EEE);
        mem.write_word(VdpRamType::Vsram, 0x04, 0x0123);
        mem.write_word(VdpRamType::Vram, 0x10, 0xCAFE);
        assert_eq!(mem.read_word(VdpRamType::Cram, 0x02), 0x0EEE);
        assert_eq!(mem.read_word(VdpRamType::Vsram, 0x04), 0x0123);
        assert_eq!(mem.read_word(VdpRamType::Vram, 0x11), 0xCAFE);
        assert_eq!(mem.cram.color(1).code, 0x1FF);
    }
}
