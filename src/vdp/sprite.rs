//! Sprite Engine do VDP
//! Baseado na estrutura do hardware real do Mega Drive (SAT).
//! Cada entrada de 8 bytes define um sprite:
//!  Y (10 bits), tamanho `hhvv`, link (7 bits), atributos, X (9 bits)
//!
//! A renderização é feita em duas fases. A fase 1 percorre a lista ligada
//! (a partir do sprite 0) usando o cache interno da SAT e guarda os sprites
//! que cruzam a próxima linha. A fase 2 lê atributos e X da VRAM e desenha a
//! linha; o primeiro sprite da lista vence em cada pixel.

use fixedbitset::FixedBitSet;
use log::trace;

use crate::vdp::{
    planes::{tile_pixel, LineContext, PlanePixel},
    video_modes::VideoMode,
    vram::Vram,
};

/// Campos que o hardware mantém no cache interno da SAT.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpriteEntry {
    pub y: u16,
    /// Largura e altura em células (1-4).
    pub width: u8,
    pub height: u8,
    pub link: u8,
}

impl SpriteEntry {
    pub fn from_bytes(data: &[u8]) -> Self {
        let y = u16::from_be_bytes([data[0], data[1]]);
        Self {
            y: y & 0x07FF,
            width: ((data[2] >> 2) & 0x03) + 1,
            height: (data[2] & 0x03) + 1,
            link: data[3] & 0x7F,
        }
    }

    /// Lê a entrada `index` do cache da SAT.
    pub fn from_cache(cache: &[u8], index: usize) -> Option<Self> {
        cache.get(index * 8..index * 8 + 4).map(Self::from_bytes)
    }

    /// Primeira linha da tela coberta pelo sprite.
    pub fn top(&self, double_resolution: bool) -> isize {
        if double_resolution {
            (self.y & 0x07FF) as isize - 256
        } else {
            (self.y & 0x03FF) as isize - 128
        }
    }
}

/// Atributos lidos da VRAM na fase 2.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpriteAttributes {
    pub tile_index: u16,
    pub palette: u8,
    pub priority: bool,
    pub flip_x: bool,
    pub flip_y: bool,
    pub x: u16,
}

impl SpriteAttributes {
    pub fn from_vram(vram: &Vram, sat_base: u16, index: usize) -> Self {
        let base = sat_base.wrapping_add((index * 8) as u16);
        let attr = vram.read16(base.wrapping_add(4));
        let x = vram.read16(base.wrapping_add(6));
        Self {
            tile_index: attr & 0x07FF,
            palette: ((attr >> 13) & 0x03) as u8,
            priority: attr & 0x8000 != 0,
            flip_x: attr & 0x0800 != 0,
            flip_y: attr & 0x1000 != 0,
            x: x & 0x01FF,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpriteFlags {
    pub overflow: bool,
    pub collision: bool,
}

/// Sprite visível selecionado pela fase 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct VisibleSprite {
    index: usize,
    entry: SpriteEntry,
}

#[derive(Clone, Debug)]
pub struct SpriteEngine {
    visible: Vec<VisibleSprite>,
    drawn: FixedBitSet,
    log: bool,
}

impl SpriteEngine {
    pub fn new(log: bool) -> Self {
        Self {
            visible: Vec::with_capacity(20),
            drawn: FixedBitSet::with_capacity(320),
            log,
        }
    }

    pub fn reset(&mut self) {
        self.visible.clear();
    }

    pub fn visible_indices(&self) -> Vec<usize> {
        self.visible.iter().map(|s| s.index).collect()
    }

    /// Fase 1: seleciona os sprites que cruzam `ctx.pattern_line`.
    /// Retorna `true` se o limite de sprites por linha foi excedido.
    pub fn evaluate_line(&mut self, cache: &[u8], mode: VideoMode, ctx: &LineContext) -> bool {
        self.visible.clear();
        let max_frame = mode.max_sprites_per_frame();
        let max_line = mode.max_sprites_per_line();
        let double = ctx.tile_height == 16;
        let line = ctx.pattern_line as isize;

        let mut index = 0usize;
        // Link 0 ou auto-link encerram a lista antes do limite por quadro
        for _ in 0..max_frame {
            let Some(entry) = SpriteEntry::from_cache(cache, index) else {
                break;
            };
            let top = entry.top(double);
            let bottom = top + (entry.height as usize * ctx.tile_height) as isize;
            if line >= top && line < bottom {
                if self.visible.len() == max_line {
                    if self.log {
                        trace!("Sprite overflow na linha {}", ctx.screen_line);
                    }
                    return true;
                }
                self.visible.push(VisibleSprite { index, entry });
            }

            let link = entry.link as usize;
            if link >= max_frame && self.log {
                trace!("Sprite {}: link {} além do limite de {}", index, link, max_frame);
            }
            if link == 0 || link == index || link >= max_frame {
                break;
            }
            index = link;
        }
        false
    }

    /// Fase 2: desenha os sprites visíveis em `out`.
    pub fn render_line(
        &mut self,
        vram: &Vram,
        sat_base: u16,
        mode: VideoMode,
        ctx: &LineContext,
        out: &mut [PlanePixel],
    ) -> SpriteFlags {
        let mut flags = SpriteFlags::default();
        out.iter_mut().for_each(|p| *p = PlanePixel::default());
        self.drawn.clear();
        self.drawn.grow(ctx.width);

        let max_pixels = mode.max_sprite_pixels_per_line();
        let double = ctx.tile_height == 16;
        let mut pixels = 0usize;
        let mut nonzero_x_seen = false;

        'sprites: for sprite in &self.visible {
            let attrs = SpriteAttributes::from_vram(vram, sat_base, sprite.index);
            if attrs.x == 0 {
                if nonzero_x_seen {
                    break;
                }
                continue;
            }
            nonzero_x_seen = true;

            let last_tile = attrs.tile_index as usize
                + sprite.entry.width as usize * sprite.entry.height as usize
                - 1;
            if last_tile > 0x07FF && self.log {
                trace!(
                    "Sprite {}: tiles {:03X}..{:03X} passam do fim da VRAM",
                    sprite.index,
                    attrs.tile_index,
                    last_tile
                );
            }

            let width_px = sprite.entry.width as usize * 8;
            let height_px = sprite.entry.height as usize * ctx.tile_height;
            let row = ctx.pattern_line as isize - sprite.entry.top(double);
            // O campo ímpar pode ter mudado desde a fase 1
            if row < 0 || row as usize >= height_px {
                continue;
            }
            let row = row as usize;
            let row = if attrs.flip_y { height_px - 1 - row } else { row };
            let left = attrs.x as isize - 128;

            for col in 0..width_px {
                if pixels >= max_pixels {
                    flags.overflow = true;
                    break 'sprites;
                }
                pixels += 1;

                let sx = left + col as isize;
                if sx < 0 || sx as usize >= ctx.width {
                    continue;
                }
                let sx = sx as usize;

                let tx = if attrs.flip_x { width_px - 1 - col } else { col };
                // Tiles do sprite em ordem de coluna
                let tile = attrs.tile_index as usize
                    + (tx / 8) * sprite.entry.height as usize
                    + row / ctx.tile_height;
                let color = tile_pixel(vram, tile & 0x07FF, tx % 8, row % ctx.tile_height, ctx.tile_height);
                if color == 0 {
                    continue;
                }
                if self.drawn.contains(sx) {
                    flags.collision = true;
                    continue;
                }
                self.drawn.insert(sx);
                out[sx] = PlanePixel {
                    color: (attrs.palette << 4) | color,
                    priority: attrs.priority,
                };
            }
        }
        flags
    }
}

impl Default for SpriteEngine {
    fn default() -> Self {
        Self::new(false)
    }
}
