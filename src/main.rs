//! MegaStrife VDP - demo sem janela
//!
//! Monta uma cena de teste pelas portas do VDP (incluindo DMA fill e
//! DMA 68k → VRAM), roda alguns quadros e grava o último em PNG.

use anyhow::{Context, Result};
use log::{debug, info};
use megastrife_vdp::{BusyState, GenesisVdp, Size, VdpBus, VdpConfig, VdpEvent, VdpProvider};

const DEFAULT_FRAMES: u32 = 3;
const DEFAULT_OUTPUT: &str = "frame.png";

/// "ROM" vista pelo DMA: quatro tiles de teste a partir do endereço 0.
struct DemoBus {
    rom: Vec<u16>,
    cpu_running: bool,
}

impl DemoBus {
    fn new() -> Self {
        let mut rom = Vec::with_capacity(4 * 16);
        // Tile 1: sólido, cor 1
        rom.extend_from_slice(&[0x1111; 16]);
        for row in 0..8u16 {
            // Tile 2: xadrez 2/3
            let word = if row % 2 == 0 { 0x2323 } else { 0x3232 };
            rom.extend_from_slice(&[word, word]);
        }
        for row in 0..8u16 {
            // Tile 3: listras horizontais 4/5
            let word = if row < 4 { 0x4444 } else { 0x5555 };
            rom.extend_from_slice(&[word, word]);
        }
        for row in 0..8u16 {
            // Tile 4: moldura na cor 6, miolo transparente
            let (left, right) = if row == 0 || row == 7 {
                (0x6666, 0x6666)
            } else {
                (0x6000, 0x0006)
            };
            rom.extend_from_slice(&[left, right]);
        }
        Self { rom, cpu_running: true }
    }
}

impl VdpBus for DemoBus {
    fn is_cpu_running(&self) -> bool {
        self.cpu_running
    }

    fn set_busy_state(&mut self, state: BusyState) {
        debug!("Barramento: VDP {:?}", state);
        self.cpu_running = state != BusyState::MemToVram;
    }

    fn read(&mut self, address: u32, _size: Size) -> u32 {
        let index = (address >> 1) as usize;
        self.rom.get(index).copied().unwrap_or(0) as u32
    }
}

fn set_register<B: VdpBus>(vdp: &mut GenesisVdp<B>, index: u16, value: u8) {
    vdp.write_control_port(0x8000 | (index << 8) | value as u16);
}

/// Envia um comando de acesso de duas words (código CD5..CD0 + endereço).
fn write_command<B: VdpBus>(vdp: &mut GenesisVdp<B>, code: u8, address: u16) {
    vdp.write_control_port(((code as u16 & 0x03) << 14) | (address & 0x3FFF));
    vdp.write_control_port(((code as u16 & 0x3C) << 2) | (address >> 14));
}

/// Roda slots até o DMA terminar e a FIFO esvaziar.
fn wait_dma<B: VdpBus>(vdp: &mut GenesisVdp<B>) -> u64 {
    let mut mclk = 0u64;
    while vdp.is_dma_active() || vdp.fifo_len() > 0 {
        mclk += vdp.step() as u64;
    }
    mclk
}

fn build_scene<B: VdpBus>(vdp: &mut GenesisVdp<B>) {
    const VRAM_WRITE: u8 = 0x01;
    const CRAM_WRITE: u8 = 0x03;
    const DMA: u8 = 0x20;

    set_register(vdp, 0x00, 0x04);
    set_register(vdp, 0x01, 0x14); // modo 5, DMA, tela desligada
    set_register(vdp, 0x0C, 0x81); // H40
    set_register(vdp, 0x02, 0x30); // plano A em 0xC000
    set_register(vdp, 0x04, 0x07); // plano B em 0xE000
    set_register(vdp, 0x05, 0x78); // SAT em 0xF000
    set_register(vdp, 0x0D, 0x3F); // hscroll em 0xFC00
    set_register(vdp, 0x10, 0x01); // 64×32 células
    set_register(vdp, 0x07, 0x0F);

    // Limpa a VRAM inteira com um fill de comprimento 0
    set_register(vdp, 0x0F, 0x01);
    set_register(vdp, 0x13, 0x00);
    set_register(vdp, 0x14, 0x00);
    set_register(vdp, 0x17, 0x80);
    write_command(vdp, VRAM_WRITE | DMA, 0x0000);
    vdp.write_data_port(0x0000);
    let mclk = wait_dma(vdp);
    info!("DMA fill da VRAM: {} MCLK", mclk);

    // Tiles 1..4 da "ROM" para 0x0020
    set_register(vdp, 0x0F, 0x02);
    set_register(vdp, 0x13, 64);
    set_register(vdp, 0x14, 0x00);
    set_register(vdp, 0x15, 0x00);
    set_register(vdp, 0x16, 0x00);
    set_register(vdp, 0x17, 0x00);
    write_command(vdp, VRAM_WRITE | DMA, 0x0020);
    let mclk = wait_dma(vdp);
    info!("DMA 68k -> VRAM: {} MCLK", mclk);

    write_command(vdp, CRAM_WRITE, 0x0000);
    for color in [0x0000, 0x0EEE, 0x000E, 0x00E0, 0x0E00, 0x0EE0, 0x00EE, 0x0E0E] {
        vdp.write_data_port(color);
    }
    // Fundo: paleta 0, cor 15
    write_command(vdp, CRAM_WRITE, 0x001E);
    vdp.write_data_port(0x0422);

    // Plano A: faixas diagonais dos tiles 2 e 3
    write_command(vdp, VRAM_WRITE, 0xC000);
    for row in 0..32u16 {
        for col in 0..64u16 {
            let entry = match (row + col) % 4 {
                0 => 0x0002,
                1 => 0x0003,
                _ => 0x0000,
            };
            vdp.write_data_port(entry);
        }
    }

    // Plano B: tile 1 com prioridade nas linhas de células 0 e 2
    write_command(vdp, VRAM_WRITE, 0xE000);
    for row in 0..4u16 {
        for _ in 0..64u16 {
            vdp.write_data_port(if row % 2 == 0 { 0x8001 } else { 0x0000 });
        }
    }

    // Dois sprites 2×2 com a moldura, encadeados
    write_command(vdp, VRAM_WRITE, 0xF000);
    for word in [128 + 96, 0x0501, 0x8004, 128 + 144, 128 + 120, 0x0500, 0x0004, 128 + 200] {
        vdp.write_data_port(word);
    }

    set_register(vdp, 0x01, 0x74); // tela e VINT ligados
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1) {
        Some(path) => VdpConfig::load(path).with_context(|| format!("Failed to load config: {}", path))?,
        None => VdpConfig::default(),
    };
    let output = args.get(2).map(String::as_str).unwrap_or(DEFAULT_OUTPUT);
    let frames = match args.get(3) {
        Some(text) => text
            .parse::<u32>()
            .with_context(|| format!("Invalid frame count: {}", text))?,
        None => DEFAULT_FRAMES,
    };

    info!("MegaStrife VDP ({:?}), {} quadro(s) -> {}", config.region, frames, output);

    let mut vdp = GenesisVdp::new(DemoBus::new(), config);
    build_scene(&mut vdp);

    let mut rendered = 0;
    let mut mclk = 0u64;
    while rendered < frames {
        mclk += vdp.step() as u64;
        for event in vdp.take_events() {
            match event {
                VdpEvent::NewFrame => {
                    rendered += 1;
                    info!("Quadro {} ({} MCLK)", rendered, mclk);
                    mclk = 0;
                }
                VdpEvent::VideoModeChange(mode) => info!("Modo de vídeo: {}", mode),
                VdpEvent::Z80Interrupt(level) => debug!("Z80 INT: {}", level),
                VdpEvent::HLinesCounter(_) => {}
            }
        }
        if vdp.interrupt_level() == 6 {
            vdp.acknowledge_interrupt(6);
        }
    }

    let frame = vdp.frame_buffer();
    let png = image::RgbaImage::from_raw(frame.width as u32, frame.height as u32, frame.to_rgba_bytes())
        .context("Framebuffer size does not match its geometry")?;
    png.save(output)
        .with_context(|| format!("Failed to write {}", output))?;
    info!("Quadro {}×{} salvo em {}", frame.width, frame.height, output);
    Ok(())
}
