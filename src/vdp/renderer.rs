//! Renderizador de vídeo: composição por linha de fundo, planos, janela e
//! sprites, com resolução de prioridade e shadow/highlight.

use log::trace;

use crate::vdp::{
    cram::Shade,
    framebuffer::FrameBuffer,
    memory::VdpMemory,
    planes::{render_scroll_plane, window_contains, window_pixel, LineContext, PlanePixel, PlaneType},
    registers::{DecodedRegisters, InterlaceMode},
    sprite::{SpriteEngine, SpriteFlags},
    video_modes::VideoMode,
};

/// Prioridade de cada camada, em ordem crescente. Empates mantêm o pixel
/// que já estava lá.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum RenderPriority {
    #[default]
    Back,
    BNoPrio,
    ANoPrio,
    WindowNoPrio,
    SpriteNoPrio,
    BPrio,
    APrio,
    WindowPrio,
    SpritePrio,
}

impl RenderPriority {
    pub fn for_layer(layer: PlaneType, priority: bool) -> Self {
        match (layer, priority) {
            (PlaneType::B, false) => RenderPriority::BNoPrio,
            (PlaneType::B, true) => RenderPriority::BPrio,
            (PlaneType::A, false) => RenderPriority::ANoPrio,
            (PlaneType::A, true) => RenderPriority::APrio,
            (PlaneType::Window, false) => RenderPriority::WindowNoPrio,
            (PlaneType::Window, true) => RenderPriority::WindowPrio,
        }
    }

    pub fn for_sprite(priority: bool) -> Self {
        if priority {
            RenderPriority::SpritePrio
        } else {
            RenderPriority::SpriteNoPrio
        }
    }

    pub fn is_priority(self) -> bool {
        self >= RenderPriority::BPrio
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPixel {
    pub color: u8,
    pub priority: RenderPriority,
    pub shade: Shade,
}

const HIGHLIGHT_OPERATOR: u8 = 0x3E;
const SHADOW_OPERATOR: u8 = 0x3F;

/// Combina as camadas de um pixel. `front` é o plano A ou a janela.
pub fn resolve_pixel(
    backdrop: u8,
    plane_b: PlanePixel,
    front: (PlaneType, PlanePixel),
    sprite: PlanePixel,
    shadow_highlight: bool,
) -> ResolvedPixel {
    let mut color = backdrop;
    let mut priority = RenderPriority::Back;

    for (layer, pixel) in [(PlaneType::B, plane_b), front] {
        let candidate = RenderPriority::for_layer(layer, pixel.priority);
        if !pixel.is_transparent() && candidate > priority {
            color = pixel.color;
            priority = candidate;
        }
    }

    let mut operator = None;
    let mut sprite_won = false;
    if !sprite.is_transparent() {
        let candidate = RenderPriority::for_sprite(sprite.priority);
        if candidate > priority {
            if shadow_highlight && (sprite.color == HIGHLIGHT_OPERATOR || sprite.color == SHADOW_OPERATOR) {
                operator = Some(sprite.color);
            } else {
                color = sprite.color;
                priority = candidate;
                sprite_won = true;
            }
        }
    }

    let shade = if !shadow_highlight {
        Shade::Normal
    } else {
        let base = if priority.is_priority() || (sprite_won && color & 0x0F == 0x0E) {
            Shade::Normal
        } else {
            Shade::Shadow
        };
        match operator {
            Some(HIGHLIGHT_OPERATOR) => base.brighter(),
            Some(_) => base.darker(),
            None => base,
        }
    };

    ResolvedPixel { color, priority, shade }
}

#[derive(Clone, Debug)]
pub struct Renderer {
    plane_a: Vec<PlanePixel>,
    plane_b: Vec<PlanePixel>,
    sprite_line: Vec<PlanePixel>,
    sprites: SpriteEngine,
    log: bool,
}

impl Renderer {
    pub fn new(log: bool) -> Self {
        Self {
            plane_a: vec![PlanePixel::default(); 320],
            plane_b: vec![PlanePixel::default(); 320],
            sprite_line: vec![PlanePixel::default(); 320],
            sprites: SpriteEngine::new(log),
            log,
        }
    }

    pub fn reset(&mut self) {
        self.sprites.reset();
    }

    /// Altura do framebuffer para o modo atual.
    pub fn frame_size(mode: VideoMode, regs: &DecodedRegisters) -> (usize, usize) {
        let (width, height) = mode.resolution();
        if regs.interlace == InterlaceMode::DoubleResolution {
            (width, height * 2)
        } else {
            (width, height)
        }
    }

    fn line_context(mode: VideoMode, regs: &DecodedRegisters, line: usize, odd_frame: bool) -> LineContext {
        LineContext::new(
            line,
            mode.resolution().0,
            regs.interlace == InterlaceMode::DoubleResolution,
            odd_frame,
        )
    }

    /// Fase 1 para `line`. Retorna `true` em overflow de sprites por linha.
    pub fn prepare_sprites(
        &mut self,
        memory: &VdpMemory,
        regs: &DecodedRegisters,
        mode: VideoMode,
        line: usize,
        odd_frame: bool,
    ) -> bool {
        let ctx = Self::line_context(mode, regs, line, odd_frame);
        self.sprites.evaluate_line(memory.sat_cache(), mode, &ctx)
    }

    /// Fase 2: compõe a linha `line` no framebuffer.
    pub fn render_line(
        &mut self,
        memory: &VdpMemory,
        regs: &DecodedRegisters,
        mode: VideoMode,
        line: usize,
        odd_frame: bool,
        frame: &mut FrameBuffer,
    ) -> SpriteFlags {
        let ctx = Self::line_context(mode, regs, line, odd_frame);
        let fb_line = if ctx.tile_height == 16 { ctx.pattern_line } else { line };
        let backdrop_argb = memory.cram.argb(regs.background_color as usize, Shade::Normal);

        let (frame_width, frame_height) = (frame.width, frame.height);
        let Some(out) = frame.line_mut(fb_line) else {
            if self.log {
                trace!("Linha {} fora do framebuffer ({}x{})", fb_line, frame_width, frame_height);
            }
            return SpriteFlags::default();
        };

        if !regs.display_enabled {
            out.fill(backdrop_argb);
            return SpriteFlags::default();
        }

        render_scroll_plane(PlaneType::B, &memory.vram, &memory.vsram, regs, &ctx, &mut self.plane_b);
        render_scroll_plane(PlaneType::A, &memory.vram, &memory.vsram, regs, &ctx, &mut self.plane_a);
        let flags = self
            .sprites
            .render_line(&memory.vram, memory.sat_base(), mode, &ctx, &mut self.sprite_line);

        for (x, pixel) in out.iter_mut().enumerate().take(ctx.width) {
            if x < 8 && regs.left_column_blank {
                *pixel = backdrop_argb;
                continue;
            }
            let front = if window_contains(regs, x, line) {
                (PlaneType::Window, window_pixel(&memory.vram, regs, &ctx, x))
            } else {
                (PlaneType::A, self.plane_a[x])
            };
            let resolved = resolve_pixel(
                regs.background_color,
                self.plane_b[x],
                front,
                self.sprite_line[x],
                regs.shadow_highlight,
            );
            *pixel = memory.cram.argb(resolved.color as usize, resolved.shade);
        }

        flags
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vdp::cram::to_argb;
    use crate::vdp::registers::{
        VdpRegisters, REG_BACKGROUND, REG_MODE_1, REG_MODE_2, REG_MODE_4, REG_PLANE_A, REG_PLANE_B,
        REG_SPRITE_TABLE, REG_WINDOW, REG_WINDOW_H,
    };
    use rand::Rng;

    fn px(color: u8, priority: bool) -> PlanePixel {
        PlanePixel { color, priority }
    }

    #[test]
    fn test_priority_order() {
        assert!(RenderPriority::SpriteNoPrio < RenderPriority::BPrio);
        assert!(RenderPriority::WindowNoPrio > RenderPriority::ANoPrio);
        assert!(!RenderPriority::SpriteNoPrio.is_priority());
        assert!(RenderPriority::BPrio.is_priority());
    }

    #[test]
    fn test_highest_layer_wins() {
        let mut rng = rand::rng();
        for _ in 0..1000 {
            let b = px(rng.random_range(0..0x40), rng.random());
            let a = px(rng.random_range(0..0x40), rng.random());
            let s = px(rng.random_range(0..0x40), rng.random());
            let front_type = if rng.random() { PlaneType::A } else { PlaneType::Window };

            let resolved = resolve_pixel(0x05, b, (front_type, a), s, false);

            let mut expected = (RenderPriority::Back, 0x05);
            let candidates = [
                (RenderPriority::for_layer(PlaneType::B, b.priority), b),
                (RenderPriority::for_layer(front_type, a.priority), a),
                (RenderPriority::for_sprite(s.priority), s),
            ];
            for (tier, pixel) in candidates {
                if !pixel.is_transparent() && tier > expected.0 {
                    expected = (tier, pixel.color);
                }
            }
            assert_eq!((resolved.priority, resolved.color), expected);
            assert_eq!(resolved.shade, Shade::Normal);
        }
    }

    #[test]
    fn test_sprite_below_priority_plane() {
        let resolved = resolve_pixel(0, px(0x12, true), (PlaneType::A, px(0, false)), px(0x21, false), false);
        assert_eq!(resolved.color, 0x12);
        assert_eq!(resolved.priority, RenderPriority::BPrio);
    }

    #[test]
    fn test_shadow_highlight() {
        // Sem prioridade: sombra
        let r = resolve_pixel(0, px(0x11, false), (PlaneType::A, px(0, false)), px(0, false), true);
        assert_eq!(r.shade, Shade::Shadow);
        // Plano com prioridade: normal
        let r = resolve_pixel(0, px(0x11, true), (PlaneType::A, px(0, false)), px(0, false), true);
        assert_eq!(r.shade, Shade::Normal);
        // Operador de highlight sobre pixel sem prioridade
        let r = resolve_pixel(0, px(0x11, false), (PlaneType::A, px(0, false)), px(0x3E, false), true);
        assert_eq!((r.color, r.shade), (0x11, Shade::Normal));
        // Operador de sombra sobre pixel com prioridade baixa, sprite com prioridade
        let r = resolve_pixel(0, px(0x11, true), (PlaneType::A, px(0, false)), px(0x3F, true), true);
        assert_eq!((r.color, r.shade), (0x11, Shade::Shadow));
        // Sprite na cor 14 fica normal mesmo sem prioridade
        let r = resolve_pixel(0, px(0, false), (PlaneType::A, px(0, false)), px(0x1E, false), true);
        assert_eq!((r.color, r.shade), (0x1E, Shade::Normal));
        // Com shadow/highlight desligado, 0x3F é só uma cor
        let r = resolve_pixel(0, px(0, false), (PlaneType::A, px(0, false)), px(0x3F, false), false);
        assert_eq!(r.color, 0x3F);
    }

    fn setup() -> (VdpMemory, VdpRegisters) {
        let mut regs = VdpRegisters::new();
        regs.write(REG_MODE_2, 0x44).unwrap();
        regs.write(REG_MODE_4, 0x81).unwrap();
        regs.write(REG_PLANE_A, 0x30).unwrap();
        regs.write(REG_PLANE_B, 0x07).unwrap();
        regs.write(REG_WINDOW, 0x2C).unwrap();
        regs.write(REG_SPRITE_TABLE, 0x7C).unwrap();
        regs.write(REG_BACKGROUND, 0x02).unwrap();

        let mut memory = VdpMemory::new();
        memory.set_sat_base(regs.decoded().sat_base);
        memory.cram.write16(0x04, 0x000E); // cor 2: vermelho
        memory.cram.write16(0x06, 0x00E0); // cor 3: verde
        memory.cram.write16(0x08, 0x0E00); // cor 4: azul
        // Tile 1 sólido na cor 3, tile 2 sólido na cor 4
        for i in 0..32u16 {
            memory.write_vram_byte(32 + i, 0x33);
            memory.write_vram_byte(64 + i, 0x44);
        }
        (memory, regs)
    }

    #[test]
    fn test_render_line_layers() {
        let (mut memory, regs) = setup();
        memory.write_vram_word(0xC000 + 2, 0x0001); // plano A, célula 1
        memory.write_vram_word(0xB000 + 4, 0x0002); // janela, célula 2
        let mut renderer = Renderer::default();
        let mode = VideoMode::NtscH40V28;
        let mut fb = FrameBuffer::new(320, 224);

        renderer.prepare_sprites(&memory, regs.decoded(), mode, 0, false);
        renderer.render_line(&memory, regs.decoded(), mode, 0, false, &mut fb);
        assert_eq!(fb.pixel(0, 0), Some(to_argb(0x007, Shade::Normal)));
        assert_eq!(fb.pixel(8, 0), Some(to_argb(0x038, Shade::Normal)));
        assert_eq!(fb.pixel(16, 0), Some(to_argb(0x007, Shade::Normal)));

        // Janela cobrindo x < 32
        let mut regs = regs;
        regs.write(REG_WINDOW_H, 0x02).unwrap();
        renderer.render_line(&memory, regs.decoded(), mode, 0, false, &mut fb);
        assert_eq!(fb.pixel(8, 0), Some(to_argb(0x007, Shade::Normal)));
        assert_eq!(fb.pixel(16, 0), Some(to_argb(0x1C0, Shade::Normal)));

        // Coluna esquerda em branco
        regs.write(REG_MODE_1, 0x20).unwrap();
        regs.write(REG_WINDOW_H, 0x00).unwrap();
        memory.write_vram_word(0xC000, 0x0001);
        renderer.render_line(&memory, regs.decoded(), mode, 0, false, &mut fb);
        assert_eq!(fb.pixel(7, 0), Some(to_argb(0x007, Shade::Normal)));
        assert_eq!(fb.pixel(8, 0), Some(to_argb(0x038, Shade::Normal)));
    }

    #[test]
    fn test_sprite_over_plane() {
        let (mut memory, regs) = setup();
        memory.write_vram_word(0xC000, 0x0001);
        // Sprite 0: tile 2, em (0, 0)
        memory.write_vram_word(0xF800, 128);
        memory.write_vram_word(0xF802, 0x0000);
        memory.write_vram_word(0xF804, 0x0002);
        memory.write_vram_word(0xF806, 128);
        let mut renderer = Renderer::default();
        let mode = VideoMode::NtscH40V28;
        let mut fb = FrameBuffer::new(320, 224);

        renderer.prepare_sprites(&memory, regs.decoded(), mode, 0, false);
        let flags = renderer.render_line(&memory, regs.decoded(), mode, 0, false, &mut fb);
        assert_eq!(flags, SpriteFlags::default());
        assert_eq!(fb.pixel(0, 0), Some(to_argb(0x1C0, Shade::Normal)));

        // Plano A com prioridade passa na frente do sprite sem prioridade
        memory.write_vram_word(0xC000, 0x8001);
        renderer.render_line(&memory, regs.decoded(), mode, 0, false, &mut fb);
        assert_eq!(fb.pixel(0, 0), Some(to_argb(0x038, Shade::Normal)));
    }

    #[test]
    fn test_render_line_shadow_highlight() {
        let (mut memory, mut regs) = setup();
        regs.write(REG_MODE_4, 0x89).unwrap();
        memory.write_vram_word(0xC000, 0x0001);
        memory.write_vram_word(0xC002, 0x8001);
        // Tile 3 na cor 14; com a paleta 3 vira o operador de highlight
        for i in 0..32u16 {
            memory.write_vram_byte(96 + i, 0xEE);
        }
        memory.write_vram_word(0xF800, 128);
        memory.write_vram_word(0xF802, 0x0000);
        memory.write_vram_word(0xF804, 0x6003);
        memory.write_vram_word(0xF806, 128 + 16);
        let mut renderer = Renderer::default();
        let mode = VideoMode::NtscH40V28;
        let mut fb = FrameBuffer::new(320, 224);

        renderer.prepare_sprites(&memory, regs.decoded(), mode, 0, false);
        renderer.render_line(&memory, regs.decoded(), mode, 0, false, &mut fb);
        assert_eq!(fb.pixel(0, 0), Some(to_argb(0x038, Shade::Shadow)));
        assert_eq!(fb.pixel(8, 0), Some(to_argb(0x038, Shade::Normal)));
        // O operador não pinta: o fundo sombreado volta ao normal
        assert_eq!(fb.pixel(16, 0), Some(to_argb(0x007, Shade::Normal)));
        assert_eq!(fb.pixel(24, 0), Some(to_argb(0x007, Shade::Shadow)));
    }

    #[test]
    fn test_render_line_double_resolution() {
        let (mut memory, mut regs) = setup();
        regs.write(REG_MODE_4, 0x87).unwrap();
        // Tile 1 de 8x16: linhas 0-7 na cor 3, linhas 8-15 na cor 4
        for i in 0..32u16 {
            memory.write_vram_byte(32 + i, 0x00);
            memory.write_vram_byte(64 + i, 0x33);
            memory.write_vram_byte(96 + i, 0x44);
        }
        memory.write_vram_word(0xC000, 0x0001);
        let mut renderer = Renderer::default();
        let mode = VideoMode::NtscH40V28;
        let (width, height) = Renderer::frame_size(mode, regs.decoded());
        assert_eq!((width, height), (320, 448));
        let mut fb = FrameBuffer::new(width, height);
        let untouched = fb.pixel(0, 4);

        renderer.render_line(&memory, regs.decoded(), mode, 0, false, &mut fb);
        assert_eq!(fb.pixel(0, 0), Some(to_argb(0x038, Shade::Normal)));

        // Campo ímpar: linha 4 da tela busca a linha 9 e vai para a linha 9 do quadro
        renderer.render_line(&memory, regs.decoded(), mode, 4, true, &mut fb);
        assert_eq!(fb.pixel(0, 9), Some(to_argb(0x1C0, Shade::Normal)));
        assert_eq!(fb.pixel(8, 9), Some(to_argb(0x007, Shade::Normal)));
        assert_eq!(fb.pixel(0, 4), untouched);
    }

    #[test]
    fn test_display_disabled_draws_backdrop() {
        let (mut memory, mut regs) = setup();
        memory.write_vram_word(0xC000, 0x0001);
        regs.write(REG_MODE_2, 0x04).unwrap();
        let mut renderer = Renderer::default();
        let mut fb = FrameBuffer::new(320, 224);
        renderer.render_line(&memory, regs.decoded(), VideoMode::NtscH40V28, 5, false, &mut fb);
        assert!((0..320).all(|x| fb.pixel(x, 5) == Some(to_argb(0x007, Shade::Normal))));
    }
}
