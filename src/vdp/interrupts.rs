//! Máquina de temporização e interrupções do VDP (Mega Drive / Sega Genesis)
//!
//! Avança os contadores H/V meio slot (um pixel) por vez e mantém:
//! - **HBlank / VBlank**: flags de blanking lidas no status
//! - **VINT**: interrupção de quadro (nível 6) em `V == vblank_set, H == 1`
//! - **HINT**: contador regressivo de linhas recarregado do registrador 10 (nível 4)
//! - **Z80**: linha de interrupção do Z80, ativa por uma linha a partir da VINT
//! - **Odd frame**: alterna a cada quadro quando o entrelaçamento está ligado

use bitflags::bitflags;

use super::registers::DecodedRegisters;
use super::video_modes::{
    increment_counter, SlotType, VideoMode, COUNTER_MASK, H40_SLOW_CLOCK_START,
    MCLK_DIVIDER_FAST_VDP, MCLK_DIVIDER_SLOW_VDP, VINT_SET_ON_HCOUNTER_VALUE,
};

bitflags! {
    /// Registrador de status do VDP (10 bits lidos pela porta de controle)
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct VdpStatus: u16 {
        const FIFO_EMPTY       = 1 << 9;
        const FIFO_FULL        = 1 << 8;
        /// VINT pendente
        const VINT_PENDING     = 1 << 7;
        /// Mais sprites (ou pixels de sprite) numa linha do que o limite
        const SPRITE_OVERFLOW  = 1 << 6;
        /// Dois sprites opacos no mesmo pixel
        const SPRITE_COLLISION = 1 << 5;
        const ODD_FRAME        = 1 << 4;
        const VBLANK           = 1 << 3;
        const HBLANK           = 1 << 2;
        const DMA_BUSY         = 1 << 1;
        const PAL              = 1 << 0;
    }
}

/// Eventos produzidos por um meio slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimingEvents {
    /// Valor do contador de HINT após o incremento de V.
    pub hlines_counter: Option<u8>,
    pub z80_interrupt: Option<bool>,
    pub vint: bool,
    pub hint: bool,
}

#[derive(Clone, Debug)]
pub struct VdpInterruptController {
    pub status: VdpStatus,
    pub mode: VideoMode,

    pub h_counter: u16,
    pub v_counter: u16,
    /// Contador linear de pixels da linha (0..pixels_per_line).
    pub pixel_counter: u16,

    pub hint_counter: u8,
    pub hint_pending: bool,
    pub z80_interrupt: bool,
}

impl VdpInterruptController {
    pub fn new(mode: VideoMode, regs: &DecodedRegisters) -> Self {
        let mut irq = Self {
            status: VdpStatus::empty(),
            mode,
            h_counter: 0,
            v_counter: 0,
            pixel_counter: 0,
            hint_counter: 0,
            hint_pending: false,
            z80_interrupt: false,
        };
        irq.reset(mode, regs);
        irq
    }

    /// Contadores no sentinela 0x1FF: o primeiro meio slot leva H a 0.
    /// A contagem de HINT recomeça do registrador 10.
    pub fn reset(&mut self, mode: VideoMode, regs: &DecodedRegisters) {
        self.mode = mode;
        self.status = VdpStatus::empty();
        self.status.set(VdpStatus::PAL, mode.is_pal());
        self.h_counter = COUNTER_MASK;
        self.v_counter = COUNTER_MASK;
        self.pixel_counter = mode.h_counter_mode().pixels_per_line - 1;
        self.hint_counter = regs.hint_reload;
        self.hint_pending = false;
        self.z80_interrupt = false;
    }

    pub fn set_mode(&mut self, mode: VideoMode) {
        self.mode = mode;
        self.status.set(VdpStatus::PAL, mode.is_pal());
        // Realinha o contador linear com o H na geometria nova
        let h_mode = mode.h_counter_mode();
        let h = self.h_counter;
        let pixel = if h <= h_mode.jump_trigger {
            h
        } else {
            h.saturating_sub(COUNTER_MASK + 1 - h_mode.pixels_per_line)
        };
        self.pixel_counter = pixel.min(h_mode.pixels_per_line - 1);
    }

    // =====================================================
    // AVANÇO DOS CONTADORES
    // =====================================================

    pub fn advance_half_slot(&mut self, regs: &DecodedRegisters) -> TimingEvents {
        let mut events = TimingEvents::default();
        let h_mode = self.mode.h_counter_mode();
        let v_mode = self.mode.v_counter_mode();

        self.h_counter = increment_counter(self.h_counter, h_mode.jump_trigger, h_mode.pixels_per_line);
        self.pixel_counter = if self.h_counter == 0 {
            0
        } else {
            (self.pixel_counter + 1) % h_mode.pixels_per_line
        };

        if self.h_counter == h_mode.hblank_set {
            self.status.insert(VdpStatus::HBLANK);
        } else if self.h_counter == h_mode.hblank_clear {
            self.status.remove(VdpStatus::HBLANK);
        }

        if self.h_counter == h_mode.vcounter_increment_on {
            self.v_counter = increment_counter(self.v_counter, v_mode.jump_trigger, v_mode.total);

            // Contagem regressiva usa o blanking da linha anterior
            if self.status.contains(VdpStatus::VBLANK) {
                self.hint_counter = regs.hint_reload;
            } else if self.hint_counter == 0 {
                self.hint_counter = regs.hint_reload;
                self.hint_pending = true;
                events.hint = true;
            } else {
                self.hint_counter -= 1;
            }
            events.hlines_counter = Some(self.hint_counter);

            if self.v_counter == v_mode.vblank_set {
                self.status.insert(VdpStatus::VBLANK);
            } else if self.v_counter == v_mode.vblank_clear {
                self.status.remove(VdpStatus::VBLANK);
            }

            if self.v_counter == 0 && regs.is_interlaced() {
                self.status.toggle(VdpStatus::ODD_FRAME);
            }
        }

        if self.h_counter == VINT_SET_ON_HCOUNTER_VALUE {
            if self.v_counter == v_mode.vblank_set {
                self.status.insert(VdpStatus::VINT_PENDING);
                self.z80_interrupt = true;
                events.vint = true;
                events.z80_interrupt = Some(true);
            } else if self.v_counter == v_mode.vblank_set + 1 && self.z80_interrupt {
                self.z80_interrupt = false;
                events.z80_interrupt = Some(false);
            }
        }

        events
    }

    // =====================================================
    // CONSULTAS DE SLOT
    // =====================================================

    pub fn slot_index(&self) -> usize {
        (self.pixel_counter / 2) as usize
    }

    /// Slot atual disponível para FIFO/DMA. Fora da área ativa (`blanking`)
    /// todo slot que não seja refresh serve.
    pub fn is_external_slot(&self, blanking: bool) -> bool {
        let slot = self
            .mode
            .slot_table()
            .get(self.slot_index())
            .copied()
            .unwrap_or(SlotType::None);
        if blanking {
            slot != SlotType::Refresh
        } else {
            slot == SlotType::External
        }
    }

    pub fn is_draw_line_slot(&self) -> bool {
        let h_mode = self.mode.h_counter_mode();
        self.h_counter == h_mode.hblank_set + 1 && self.v_counter < self.mode.v_counter_mode().vblank_set
    }

    pub fn is_draw_frame_slot(&self) -> bool {
        let h_mode = self.mode.h_counter_mode();
        self.h_counter == h_mode.hblank_set + 1 && self.v_counter == self.mode.v_counter_mode().vblank_set
    }

    /// MCLK consumidos pelo próximo slot.
    pub fn clock_divisor(&self) -> u32 {
        if self.mode.is_h40() && self.h_counter < H40_SLOW_CLOCK_START {
            MCLK_DIVIDER_FAST_VDP
        } else {
            MCLK_DIVIDER_SLOW_VDP
        }
    }

    pub fn in_vblank(&self) -> bool {
        self.status.contains(VdpStatus::VBLANK)
    }

    // =====================================================
    // INTERFACE PARA A CPU
    // =====================================================

    /// Nível de interrupção pedido ao 68000 (6 VINT, 4 HINT, 0 nenhum).
    pub fn interrupt_level(&self, regs: &DecodedRegisters) -> u8 {
        if regs.vint_enabled && self.status.contains(VdpStatus::VINT_PENDING) {
            6
        } else if regs.hint_enabled && self.hint_pending {
            4
        } else {
            0
        }
    }

    pub fn acknowledge(&mut self, level: u8) {
        match level {
            6 => self.status.remove(VdpStatus::VINT_PENDING),
            4 => self.hint_pending = false,
            _ => {}
        }
    }

    /// HV counter: V no byte alto, H/2 no byte baixo.
    pub fn hv_counter(&self, regs: &DecodedRegisters) -> u16 {
        let v = self.v_counter;
        let v_byte = match regs.interlace {
            super::registers::InterlaceMode::DoubleResolution => ((v << 1) | (v >> 8)) & 0xFF,
            super::registers::InterlaceMode::Normal => (v & 0xFE) | ((v >> 8) & 1),
            super::registers::InterlaceMode::None => v & 0xFF,
        };
        (v_byte << 8) | ((self.h_counter >> 1) & 0xFF)
    }
}

impl Default for VdpInterruptController {
    fn default() -> Self {
        Self::new(VideoMode::default(), &DecodedRegisters::default())
    }
}
