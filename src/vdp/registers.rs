//! Registradores internos do VDP.
//! Existem 24 registradores de controle principais; no modo legado
//! (Mode 4, bit M5 do registrador 1 desligado) apenas os 11 primeiros
//! aceitam escrita.
//!
//! Os campos decodificados são sempre recalculados por `DecodedRegisters::decode`
//! a partir do array bruto, logo nunca divergem do último valor escrito.

use super::error::VdpError;

pub const REGISTER_COUNT: usize = 24;
pub const LEGACY_REGISTER_COUNT: usize = 11;

pub const REG_MODE_1: usize = 0x00;
pub const REG_MODE_2: usize = 0x01;
pub const REG_PLANE_A: usize = 0x02;
pub const REG_WINDOW: usize = 0x03;
pub const REG_PLANE_B: usize = 0x04;
pub const REG_SPRITE_TABLE: usize = 0x05;
pub const REG_BACKGROUND: usize = 0x07;
pub const REG_HCOUNTER: usize = 0x0A;
pub const REG_MODE_3: usize = 0x0B;
pub const REG_MODE_4: usize = 0x0C;
pub const REG_HSCROLL: usize = 0x0D;
pub const REG_AUTO_INCREMENT: usize = 0x0F;
pub const REG_PLANE_SIZE: usize = 0x10;
pub const REG_WINDOW_H: usize = 0x11;
pub const REG_WINDOW_V: usize = 0x12;
pub const REG_DMA_LENGTH_LOW: usize = 0x13;
pub const REG_DMA_LENGTH_HIGH: usize = 0x14;
pub const REG_DMA_SOURCE_LOW: usize = 0x15;
pub const REG_DMA_SOURCE_MID: usize = 0x16;
pub const REG_DMA_SOURCE_HIGH: usize = 0x17;

/// Modo de scroll horizontal (registrador 11, bits 1-0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HScrollMode {
    #[default]
    FullScreen,
    PerCell,
    PerLine,
}

/// Modo de entrelaçamento (registrador 12, bits 2-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterlaceMode {
    #[default]
    None,
    Normal,
    DoubleResolution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodedRegisters {
    pub left_column_blank: bool,
    pub hint_enabled: bool,
    pub hv_counter_latch: bool,
    pub display_enabled: bool,
    pub vint_enabled: bool,
    pub dma_enabled: bool,
    pub v30: bool,
    pub mode5: bool,
    pub plane_a_base: u16,
    pub window_base: u16,
    pub plane_b_base: u16,
    pub sat_base: u16,
    pub background_color: u8,
    pub hint_reload: u8,
    pub vscroll_per_column: bool,
    pub hscroll_mode: HScrollMode,
    pub h40: bool,
    pub shadow_highlight: bool,
    pub interlace: InterlaceMode,
    pub hscroll_base: u16,
    pub auto_increment: u8,
    /// Tamanho dos planos A/B em células (largura, altura).
    pub plane_width: usize,
    pub plane_height: usize,
    pub window_right: bool,
    pub window_h_pos: u8,
    pub window_down: bool,
    pub window_v_pos: u8,
    pub dma_length: u16,
    /// Endereço de origem do DMA em words (23 bits úteis para 68k→VDP).
    pub dma_source: u32,
    /// Bits 7-6 do registrador 23.
    pub dma_mode_bits: u8,
}

fn plane_cells(bits: u8) -> usize {
    match bits & 0x03 {
        0 => 32,
        1 => 64,
        3 => 128,
        // Valor inválido: o hardware se comporta como 32 células
        _ => 32,
    }
}

impl DecodedRegisters {
    pub fn decode(r: &[u8; REGISTER_COUNT]) -> Self {
        let h40 = r[REG_MODE_4] & 0x01 != 0;
        let plane_width = plane_cells(r[REG_PLANE_SIZE]);
        // Tabela de nomes limitada a 4096 células (ex.: 128x128 vira 128x32)
        let plane_height = plane_cells(r[REG_PLANE_SIZE] >> 4).min(4096 / plane_width);

        let window_mask: u8 = if h40 { 0x3C } else { 0x3E };
        let sat_mask: u8 = if h40 { 0x7E } else { 0x7F };

        Self {
            left_column_blank: r[REG_MODE_1] & 0x20 != 0,
            hint_enabled: r[REG_MODE_1] & 0x10 != 0,
            hv_counter_latch: r[REG_MODE_1] & 0x02 != 0,
            display_enabled: r[REG_MODE_2] & 0x40 != 0,
            vint_enabled: r[REG_MODE_2] & 0x20 != 0,
            dma_enabled: r[REG_MODE_2] & 0x10 != 0,
            v30: r[REG_MODE_2] & 0x08 != 0,
            mode5: r[REG_MODE_2] & 0x04 != 0,
            plane_a_base: ((r[REG_PLANE_A] & 0x38) as u16) << 10,
            window_base: ((r[REG_WINDOW] & window_mask) as u16) << 10,
            plane_b_base: ((r[REG_PLANE_B] & 0x07) as u16) << 13,
            sat_base: ((r[REG_SPRITE_TABLE] & sat_mask) as u16) << 9,
            background_color: r[REG_BACKGROUND] & 0x3F,
            hint_reload: r[REG_HCOUNTER],
            vscroll_per_column: r[REG_MODE_3] & 0x04 != 0,
            hscroll_mode: match r[REG_MODE_3] & 0x03 {
                2 => HScrollMode::PerCell,
                3 => HScrollMode::PerLine,
                _ => HScrollMode::FullScreen,
            },
            h40,
            shadow_highlight: r[REG_MODE_4] & 0x08 != 0,
            interlace: match (r[REG_MODE_4] >> 1) & 0x03 {
                1 => InterlaceMode::Normal,
                3 => InterlaceMode::DoubleResolution,
                _ => InterlaceMode::None,
            },
            hscroll_base: ((r[REG_HSCROLL] & 0x3F) as u16) << 10,
            auto_increment: r[REG_AUTO_INCREMENT],
            plane_width,
            plane_height,
            window_right: r[REG_WINDOW_H] & 0x80 != 0,
            window_h_pos: r[REG_WINDOW_H] & 0x1F,
            window_down: r[REG_WINDOW_V] & 0x80 != 0,
            window_v_pos: r[REG_WINDOW_V] & 0x1F,
            dma_length: u16::from_le_bytes([r[REG_DMA_LENGTH_LOW], r[REG_DMA_LENGTH_HIGH]]),
            dma_source: u32::from_le_bytes([
                r[REG_DMA_SOURCE_LOW],
                r[REG_DMA_SOURCE_MID],
                r[REG_DMA_SOURCE_HIGH] & 0x7F,
                0,
            ]),
            dma_mode_bits: r[REG_DMA_SOURCE_HIGH] >> 6,
        }
    }

    pub fn register_limit(&self) -> usize {
        if self.mode5 {
            REGISTER_COUNT
        } else {
            LEGACY_REGISTER_COUNT
        }
    }

    pub fn is_interlaced(&self) -> bool {
        self.interlace != InterlaceMode::None
    }
}

#[derive(Clone)]
pub struct VdpRegisters {
    regs: [u8; REGISTER_COUNT],
    decoded: DecodedRegisters,
}

impl VdpRegisters {
    pub fn new() -> Self {
        let regs = [0; REGISTER_COUNT];
        Self {
            regs,
            decoded: DecodedRegisters::decode(&regs),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Escrita validada vinda da porta de controle.
    pub fn write(&mut self, index: usize, value: u8) -> Result<(), VdpError> {
        let limit = self.decoded.register_limit();
        if index >= limit {
            return Err(VdpError::InvalidRegister {
                index,
                limit,
                mode: if self.decoded.mode5 { "mode 5" } else { "mode 4" },
            });
        }
        self.set_raw(index, value);
        Ok(())
    }

    /// Escrita sem validação, usada pelos efeitos colaterais do DMA.
    pub fn set_raw(&mut self, index: usize, value: u8) {
        self.regs[index] = value;
        self.decoded = DecodedRegisters::decode(&self.regs);
    }

    pub fn read(&self, index: usize) -> u8 {
        self.regs[index % REGISTER_COUNT]
    }

    pub fn decoded(&self) -> &DecodedRegisters {
        &self.decoded
    }

    pub fn set_dma_length(&mut self, length: u16) {
        let [lo, hi] = length.to_le_bytes();
        self.regs[REG_DMA_LENGTH_LOW] = lo;
        self.regs[REG_DMA_LENGTH_HIGH] = hi;
        self.decoded = DecodedRegisters::decode(&self.regs);
    }

    /// Só os 16 bits baixos da origem avançam; o registrador 23 não muda.
    pub fn set_dma_source_low(&mut self, source: u16) {
        let [lo, mid] = source.to_le_bytes();
        self.regs[REG_DMA_SOURCE_LOW] = lo;
        self.regs[REG_DMA_SOURCE_MID] = mid;
        self.decoded = DecodedRegisters::decode(&self.regs);
    }
}

impl Default for VdpRegisters {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode5_registers() -> VdpRegisters {
        let mut regs = VdpRegisters::new();
        regs.write(REG_MODE_2, 0x04).unwrap();
        regs
    }

    #[test]
    fn test_legacy_mode_rejects_extended_registers() {
        let mut regs = VdpRegisters::new();
        let err = regs.write(REG_MODE_4, 0x81).unwrap_err();
        assert!(matches!(err, VdpError::InvalidRegister { index: 12, limit: 11, .. }));
        assert_eq!(regs.read(REG_MODE_4), 0);
        assert!(!regs.decoded().h40);
    }

    #[test]
    fn test_mode5_accepts_all_registers() {
        let mut regs = mode5_registers();
        regs.write(REG_DMA_SOURCE_HIGH, 0xC0).unwrap();
        assert_eq!(regs.decoded().dma_mode_bits, 3);
        assert!(regs.write(REGISTER_COUNT, 0).is_err());
    }

    #[test]
    fn test_decoded_cache_follows_raw_value() {
        let mut regs = mode5_registers();
        regs.write(REG_MODE_2, 0x74).unwrap();
        assert!(regs.decoded().display_enabled);
        assert!(regs.decoded().vint_enabled);
        assert!(regs.decoded().dma_enabled);
        regs.write(REG_MODE_2, 0x04).unwrap();
        assert!(!regs.decoded().display_enabled);
        assert!(!regs.decoded().vint_enabled);
        assert_eq!(*regs.decoded(), DecodedRegisters::decode(&{
            let mut raw = [0u8; REGISTER_COUNT];
            raw[REG_MODE_2] = 0x04;
            raw
        }));
    }

    #[test]
    fn test_table_addresses() {
        let mut regs = mode5_registers();
        regs.write(REG_PLANE_A, 0x30).unwrap();
        regs.write(REG_WINDOW, 0x2E).unwrap();
        regs.write(REG_PLANE_B, 0x07).unwrap();
        regs.write(REG_SPRITE_TABLE, 0x7D).unwrap();
        regs.write(REG_HSCROLL, 0x3F).unwrap();
        let d = regs.decoded();
        assert_eq!(d.plane_a_base, 0xC000);
        assert_eq!(d.window_base, 0xB800);
        assert_eq!(d.plane_b_base, 0xE000);
        assert_eq!(d.sat_base, 0xFA00);
        assert_eq!(d.hscroll_base, 0xFC00);

        regs.write(REG_MODE_4, 0x81).unwrap();
        let d = regs.decoded();
        assert!(d.h40);
        assert_eq!(d.window_base, 0xB000);
        assert_eq!(d.sat_base, 0xF800);
    }

    #[test]
    fn test_plane_size_limits() {
        let mut regs = mode5_registers();
        regs.write(REG_PLANE_SIZE, 0x33).unwrap();
        assert_eq!((regs.decoded().plane_width, regs.decoded().plane_height), (128, 32));
        regs.write(REG_PLANE_SIZE, 0x11).unwrap();
        assert_eq!((regs.decoded().plane_width, regs.decoded().plane_height), (64, 64));
        regs.write(REG_PLANE_SIZE, 0x30).unwrap();
        assert_eq!((regs.decoded().plane_width, regs.decoded().plane_height), (32, 128));
    }

    #[test]
    fn test_dma_registers() {
        let mut regs = mode5_registers();
        regs.write(REG_DMA_LENGTH_LOW, 0x34).unwrap();
        regs.write(REG_DMA_LENGTH_HIGH, 0x12).unwrap();
        regs.write(REG_DMA_SOURCE_LOW, 0x56).unwrap();
        regs.write(REG_DMA_SOURCE_MID, 0x34).unwrap();
        regs.write(REG_DMA_SOURCE_HIGH, 0x7F).unwrap();
        assert_eq!(regs.decoded().dma_length, 0x1234);
        assert_eq!(regs.decoded().dma_source, 0x7F3456);

        regs.set_dma_length(0);
        regs.set_dma_source_low(0xFFFF);
        assert_eq!(regs.read(REG_DMA_LENGTH_HIGH), 0);
        assert_eq!(regs.decoded().dma_source, 0x7FFFFF);
    }
}
