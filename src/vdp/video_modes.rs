//! Modos de vídeo do VDP (Mega Drive / Sega Genesis)
//!
//! Cada modo combina região (NTSC/PAL), largura (H32/H40) e altura (V28/V30)
//! e seleciona as constantes dos contadores H/V e a tabela de slots.
//!
//! Os contadores usam a técnica de "jump trigger": quando o contador bruto
//! atinge `jump + 1` ele é reatribuído para `0x200 + (jump + 1) - total`,
//! produzindo um período que não é potência de dois.

use std::fmt::{Display, Formatter};

pub const COUNTER_MASK: u16 = 0x1FF;

/// MCLK por slot (dois pixels) com o clock rápido do H40.
pub const MCLK_DIVIDER_FAST_VDP: u32 = 16;
/// MCLK por slot com o clock lento (todo o H32, e o hsync do H40).
pub const MCLK_DIVIDER_SLOW_VDP: u32 = 20;
/// A partir deste valor do contador H o H40 roda com o clock lento.
pub const H40_SLOW_CLOCK_START: u16 = 0x1E2;

/// Contador H vale 1 quando a VINT é sinalizada.
pub const VINT_SET_ON_HCOUNTER_VALUE: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HCounterMode {
    pub pixels_per_line: u16,
    pub jump_trigger: u16,
    pub hblank_set: u16,
    pub hblank_clear: u16,
    pub vcounter_increment_on: u16,
    pub slots_per_line: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VCounterMode {
    /// Período do contador; em NTSC V30 o contador roda 0..=0x1FF sem salto.
    pub total: u16,
    pub jump_trigger: u16,
    pub vblank_set: u16,
    pub vblank_clear: u16,
}

pub const H32: HCounterMode = HCounterMode {
    pixels_per_line: 342,
    jump_trigger: 0x127,
    hblank_set: 0x126,
    hblank_clear: 0x00A,
    vcounter_increment_on: 0x10A,
    slots_per_line: 171,
};

pub const H40: HCounterMode = HCounterMode {
    pixels_per_line: 420,
    jump_trigger: 0x16C,
    hblank_set: 0x166,
    hblank_clear: 0x00B,
    vcounter_increment_on: 0x14A,
    slots_per_line: 210,
};

const NTSC_V28: VCounterMode = VCounterMode {
    total: 262,
    jump_trigger: 0x0EA,
    vblank_set: 0x0E0,
    vblank_clear: 0x1FF,
};

const NTSC_V30: VCounterMode = VCounterMode {
    total: 512,
    jump_trigger: COUNTER_MASK,
    vblank_set: 0x0F0,
    vblank_clear: 0x1FF,
};

const PAL_V28: VCounterMode = VCounterMode {
    total: 313,
    jump_trigger: 0x102,
    vblank_set: 0x0E0,
    vblank_clear: 0x1FF,
};

const PAL_V30: VCounterMode = VCounterMode {
    total: 313,
    jump_trigger: 0x10A,
    vblank_set: 0x0F0,
    vblank_clear: 0x1FF,
};

/// Incremento de um contador de 9 bits com salto.
pub fn increment_counter(counter: u16, jump_trigger: u16, total: u16) -> u16 {
    let next = (counter + 1) & COUNTER_MASK;
    if next == jump_trigger + 1 {
        (COUNTER_MASK + 1) + (jump_trigger + 1) - total
    } else {
        next
    }
}

/// Classificação de um slot de acesso à memória.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotType {
    /// Slot usado pela renderização.
    None,
    /// Refresh interno da VRAM: nunca disponível.
    Refresh,
    /// Disponível para FIFO/DMA.
    External,
}

const fn build_slot_table<const N: usize>(active_blocks: usize, blank_external: &[usize]) -> [SlotType; N] {
    let mut table = [SlotType::None; N];
    // Um slot de acesso por bloco de duas células: 3 externos, 1 refresh.
    let mut block = 0;
    while block < active_blocks {
        table[block * 8 + 6] = if block % 4 == 3 {
            SlotType::Refresh
        } else {
            SlotType::External
        };
        block += 1;
    }
    let mut i = 0;
    while i < blank_external.len() {
        table[blank_external[i]] = SlotType::External;
        i += 1;
    }
    table
}

pub static H32_SLOTS: [SlotType; 171] = build_slot_table(16, &[130, 136, 144, 156]);
pub static H40_SLOTS: [SlotType; 210] = build_slot_table(20, &[164, 176, 196]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoMode {
    NtscH32V28,
    NtscH32V30,
    #[default]
    NtscH40V28,
    NtscH40V30,
    PalH32V28,
    PalH32V30,
    PalH40V28,
    PalH40V30,
}

impl VideoMode {
    pub fn from_flags(pal: bool, h40: bool, v30: bool) -> Self {
        match (pal, h40, v30) {
            (false, false, false) => VideoMode::NtscH32V28,
            (false, false, true) => VideoMode::NtscH32V30,
            (false, true, false) => VideoMode::NtscH40V28,
            (false, true, true) => VideoMode::NtscH40V30,
            (true, false, false) => VideoMode::PalH32V28,
            (true, false, true) => VideoMode::PalH32V30,
            (true, true, false) => VideoMode::PalH40V28,
            (true, true, true) => VideoMode::PalH40V30,
        }
    }

    pub fn is_h40(self) -> bool {
        matches!(
            self,
            VideoMode::NtscH40V28 | VideoMode::NtscH40V30 | VideoMode::PalH40V28 | VideoMode::PalH40V30
        )
    }

    pub fn is_v30(self) -> bool {
        matches!(
            self,
            VideoMode::NtscH32V30 | VideoMode::NtscH40V30 | VideoMode::PalH32V30 | VideoMode::PalH40V30
        )
    }

    pub fn is_pal(self) -> bool {
        matches!(
            self,
            VideoMode::PalH32V28 | VideoMode::PalH32V30 | VideoMode::PalH40V28 | VideoMode::PalH40V30
        )
    }

    pub fn h_counter_mode(self) -> &'static HCounterMode {
        if self.is_h40() {
            &H40
        } else {
            &H32
        }
    }

    pub fn v_counter_mode(self) -> &'static VCounterMode {
        match (self.is_pal(), self.is_v30()) {
            (false, false) => &NTSC_V28,
            (false, true) => &NTSC_V30,
            (true, false) => &PAL_V28,
            (true, true) => &PAL_V30,
        }
    }

    pub fn slot_table(self) -> &'static [SlotType] {
        if self.is_h40() {
            &H40_SLOTS
        } else {
            &H32_SLOTS
        }
    }

    /// Resolução ativa (largura, linhas).
    pub fn resolution(self) -> (usize, usize) {
        let width = if self.is_h40() { 320 } else { 256 };
        let height = if self.is_v30() { 240 } else { 224 };
        (width, height)
    }

    pub fn max_sprites_per_frame(self) -> usize {
        if self.is_h40() {
            80
        } else {
            64
        }
    }

    pub fn max_sprites_per_line(self) -> usize {
        if self.is_h40() {
            20
        } else {
            16
        }
    }

    pub fn max_sprite_pixels_per_line(self) -> usize {
        self.resolution().0
    }
}

impl Display for VideoMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (w, h) = self.resolution();
        let region = if self.is_pal() { "PAL" } else { "NTSC" };
        let h_mode = if self.is_h40() { "H40" } else { "H32" };
        let v_mode = if self.is_v30() { "V30" } else { "V28" };
        write!(f, "{region} {h_mode} {v_mode} ({w}x{h})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(table: &[SlotType], kind: SlotType) -> usize {
        table.iter().filter(|&&s| s == kind).count()
    }

    #[test]
    fn test_slot_tables() {
        assert_eq!(count(&H40_SLOTS, SlotType::External), 18);
        assert_eq!(count(&H40_SLOTS, SlotType::Refresh), 5);
        assert_eq!(count(&H32_SLOTS, SlotType::External), 16);
        assert_eq!(count(&H32_SLOTS, SlotType::Refresh), 4);
        assert_eq!(H40_SLOTS.len(), H40.slots_per_line as usize);
        assert_eq!(H32_SLOTS.len(), H32.slots_per_line as usize);
    }

    #[test]
    fn test_h_counter_period() {
        for mode in [H32, H40] {
            let mut h = 0u16;
            let mut steps = 0u16;
            loop {
                h = increment_counter(h, mode.jump_trigger, mode.pixels_per_line);
                steps += 1;
                if h == 0 {
                    break;
                }
            }
            assert_eq!(steps, mode.pixels_per_line);
        }
        assert_eq!(increment_counter(0x127, H32.jump_trigger, 342), 0x1D2);
        assert_eq!(increment_counter(0x16C, H40.jump_trigger, 420), 0x1C9);
    }

    #[test]
    fn test_v_counter_jumps() {
        assert_eq!(increment_counter(0x0EA, NTSC_V28.jump_trigger, NTSC_V28.total), 0x1E5);
        assert_eq!(increment_counter(0x102, PAL_V28.jump_trigger, PAL_V28.total), 0x1CA);
        assert_eq!(increment_counter(0x10A, PAL_V30.jump_trigger, PAL_V30.total), 0x1D2);
        assert_eq!(increment_counter(0x1FF, NTSC_V30.jump_trigger, NTSC_V30.total), 0);
        assert_eq!(increment_counter(0x0EA, NTSC_V30.jump_trigger, NTSC_V30.total), 0x0EB);
    }

    #[test]
    fn test_video_mode_flags() {
        let mode = VideoMode::from_flags(true, true, true);
        assert_eq!(mode, VideoMode::PalH40V30);
        assert!(mode.is_pal() && mode.is_h40() && mode.is_v30());
        assert_eq!(mode.resolution(), (320, 240));
        assert_eq!(VideoMode::NtscH32V28.resolution(), (256, 224));
        assert_eq!(VideoMode::NtscH32V28.max_sprites_per_line(), 16);
        assert_eq!(mode.to_string(), "PAL H40 V30 (320x240)");
    }
}
