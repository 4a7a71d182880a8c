//! Renderização dos planos A, B e Window do VDP (Tilemaps).
//!
//! Cada entrada do tilemap é de 2 bytes com formato:
//! Bit 15:    Prioridade (0 = abaixo de sprites, 1 = acima de sprites)
//! Bits 14-13: Paleta (0-3)
//! Bit 12:    Flip vertical
//! Bit 11:    Flip horizontal
//! Bits 10-0: Índice do tile (0-2047)
//!
//! Os tiles são 4bpp, dois pixels por byte (nibble alto à esquerda), 8x8 ou
//! 8x16 no entrelaçado de resolução dupla.

use crate::vdp::{
    registers::{DecodedRegisters, HScrollMode},
    vram::Vram,
    vsram::Vsram,
};

/// Tipos de plano do VDP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaneType {
    A,
    B,
    Window,
}

impl PlaneType {
    /// Deslocamento da word deste plano nas tabelas de scroll (A = 0, B = 1).
    fn scroll_slot(self) -> usize {
        match self {
            PlaneType::B => 1,
            _ => 0,
        }
    }
}

/// Entrada de tile no tilemap (2 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileEntry {
    pub tile_index: u16,
    pub palette: u8,
    pub priority: bool,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl TileEntry {
    pub fn from_word(word: u16) -> Self {
        Self {
            tile_index: word & 0x07FF,
            palette: ((word >> 13) & 0x03) as u8,
            priority: (word & 0x8000) != 0,
            flip_horizontal: (word & 0x0800) != 0,
            flip_vertical: (word & 0x1000) != 0,
        }
    }

    /// Índice de cor (0-15) do pixel `(x, y)` dentro do tile, já com os flips.
    pub fn pixel(&self, vram: &Vram, x: usize, y: usize, tile_height: usize) -> u8 {
        let px = if self.flip_horizontal { 7 - x } else { x };
        let py = if self.flip_vertical { tile_height - 1 - y } else { y };
        tile_pixel(vram, self.tile_index as usize, px, py, tile_height)
    }
}

/// Lê um nibble do bitmap de um tile sem aplicar flips.
pub fn tile_pixel(vram: &Vram, tile_index: usize, x: usize, y: usize, tile_height: usize) -> u8 {
    let tile_bytes = tile_height * 4;
    // Endereços fora da VRAM dão a volta em 64 KiB
    let addr = (tile_index * tile_bytes + y * 4 + x / 2) as u16;
    let byte = vram.read8(addr);
    if x & 1 == 0 {
        byte >> 4
    } else {
        byte & 0x0F
    }
}

/// Pixel produzido por um plano: cor em 6 bits (paleta * 16 + índice).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlanePixel {
    pub color: u8,
    pub priority: bool,
}

impl PlanePixel {
    pub fn is_transparent(&self) -> bool {
        self.color & 0x0F == 0
    }
}

/// Geometria da linha sendo desenhada.
#[derive(Debug, Clone, Copy)]
pub struct LineContext {
    /// Linha na tela (0..altura ativa).
    pub screen_line: usize,
    /// Linha usada para buscar tiles; `2 * linha + ímpar` no entrelaçado duplo.
    pub pattern_line: usize,
    pub tile_height: usize,
    pub width: usize,
}

impl LineContext {
    pub fn new(screen_line: usize, width: usize, double_resolution: bool, odd_frame: bool) -> Self {
        if double_resolution {
            Self {
                screen_line,
                pattern_line: screen_line * 2 + odd_frame as usize,
                tile_height: 16,
                width,
            }
        } else {
            Self {
                screen_line,
                pattern_line: screen_line,
                tile_height: 8,
                width,
            }
        }
    }
}

fn hscroll_value(vram: &Vram, regs: &DecodedRegisters, plane: PlaneType, line: usize) -> usize {
    let row_offset = match regs.hscroll_mode {
        HScrollMode::FullScreen => 0,
        HScrollMode::PerCell => (line & !7) * 4,
        HScrollMode::PerLine => line * 4,
    };
    let addr = regs
        .hscroll_base
        .wrapping_add(row_offset as u16)
        .wrapping_add(plane.scroll_slot() as u16 * 2);
    (vram.read16(addr) & 0x03FF) as usize
}

fn vscroll_value(vsram: &Vsram, regs: &DecodedRegisters, plane: PlaneType, x: usize, double: bool) -> usize {
    let entry = if regs.vscroll_per_column {
        (x / 16) * 2 + plane.scroll_slot()
    } else {
        plane.scroll_slot()
    };
    let mask = if double { 0x07FF } else { 0x03FF };
    (vsram.entry(entry) & mask) as usize
}

/// Desenha uma linha do plano A ou B em `out` (um pixel por coluna da tela).
pub fn render_scroll_plane(
    plane: PlaneType,
    vram: &Vram,
    vsram: &Vsram,
    regs: &DecodedRegisters,
    ctx: &LineContext,
    out: &mut [PlanePixel],
) {
    let base = match plane {
        PlaneType::B => regs.plane_b_base,
        _ => regs.plane_a_base,
    };
    let double = ctx.tile_height == 16;
    let width_px = regs.plane_width * 8;
    let height_px = regs.plane_height * ctx.tile_height;
    let hscroll = hscroll_value(vram, regs, plane, ctx.screen_line);

    for (x, pixel) in out.iter_mut().enumerate().take(ctx.width) {
        let px = (x + width_px - (hscroll % width_px)) % width_px;
        let vscroll = vscroll_value(vsram, regs, plane, x, double);
        let py = (ctx.pattern_line + vscroll) & (height_px - 1);

        let cell = (py / ctx.tile_height) * regs.plane_width + px / 8;
        let entry = TileEntry::from_word(vram.read16(base.wrapping_add((cell * 2) as u16)));
        *pixel = PlanePixel {
            color: (entry.palette << 4) | entry.pixel(vram, px % 8, py % ctx.tile_height, ctx.tile_height),
            priority: entry.priority,
        };
    }
}

/// Largura da tabela de nomes da janela, em células.
pub fn window_width_cells(regs: &DecodedRegisters) -> usize {
    if regs.h40 {
        64
    } else {
        32
    }
}

/// A janela substitui o plano A neste pixel?
pub fn window_contains(regs: &DecodedRegisters, x: usize, screen_line: usize) -> bool {
    let v_split = regs.window_v_pos as usize * 8;
    let in_rows = if regs.window_down {
        screen_line >= v_split
    } else {
        screen_line < v_split
    };
    if in_rows {
        return true;
    }
    let h_split = regs.window_h_pos as usize * 16;
    if regs.window_right {
        x >= h_split
    } else {
        x < h_split
    }
}

/// Pixel da janela na coluna `x` (sem scroll).
pub fn window_pixel(vram: &Vram, regs: &DecodedRegisters, ctx: &LineContext, x: usize) -> PlanePixel {
    let row = ctx.pattern_line / ctx.tile_height;
    let cell = row * window_width_cells(regs) + x / 8;
    let entry = TileEntry::from_word(vram.read16(regs.window_base.wrapping_add((cell * 2) as u16)));
    PlanePixel {
        color: (entry.palette << 4)
            | entry.pixel(vram, x % 8, ctx.pattern_line % ctx.tile_height, ctx.tile_height),
        priority: entry.priority,
    }
}
