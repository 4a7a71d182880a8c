// src/vdp/mod.rs

pub mod cram;
pub mod dma;
pub mod error;
pub mod fifo;
pub mod framebuffer;
pub mod interrupts;
pub mod memory;
pub mod planes;
pub mod ports;
pub mod registers;
pub mod renderer;
pub mod sprite;
pub mod video_modes;
pub mod vram;
pub mod vsram;


use log::{debug, error, trace, warn};

use crate::config::VdpConfig;
use dma::DmaHandler;
use error::VdpError;
use fifo::{Fifo, FifoEntry};
use interrupts::{TimingEvents, VdpInterruptController, VdpStatus};
use memory::{VdpMemory, VdpRamType};
use ports::{ControlWrite, PortState, VdpPortType};
use registers::{VdpRegisters, REG_MODE_1, REG_MODE_4, REG_SPRITE_TABLE};
use renderer::Renderer;

pub use dma::BusyState;
pub use framebuffer::FrameBuffer;
pub use video_modes::VideoMode;

/// Largura de um acesso ao barramento externo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Size {
    Byte,
    Word,
    Long,
}

/// Barramento do sistema visto pelo VDP.
pub trait VdpBus {
    /// `false` quando o 68000 está parado (requisito do DMA 68k → VDP).
    fn is_cpu_running(&self) -> bool;
    fn set_busy_state(&mut self, state: BusyState);
    fn read(&mut self, address: u32, size: Size) -> u32;
}

/// Eventos emitidos para o restante do sistema, drenados por `take_events`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VdpEvent {
    NewFrame,
    VideoModeChange(VideoMode),
    HLinesCounter(u8),
    Z80Interrupt(bool),
}

/// Interface do VDP para a CPU e para o laço principal.
pub trait VdpProvider {
    fn write_control_port(&mut self, word: u16);
    fn write_data_port(&mut self, word: u16);
    fn read_control_port(&mut self) -> u16;
    fn read_data_port(&mut self) -> u16;
    fn register(&self, index: usize) -> u8;
    fn set_register(&mut self, index: usize, value: u8);
    /// Avança um slot (dois pixels) e retorna os MCLK do próximo slot.
    fn step(&mut self) -> u32;
    fn frame_buffer(&self) -> &FrameBuffer;
    fn take_events(&mut self) -> Vec<VdpEvent>;
    fn reset(&mut self);
}

pub struct GenesisVdp<B: VdpBus> {
    config: VdpConfig,
    bus: B,
    regs: VdpRegisters,
    memory: VdpMemory,
    port: PortState,
    fifo: Fifo,
    dma: DmaHandler,
    timing: VdpInterruptController,
    renderer: Renderer,
    frame: FrameBuffer,
    events: Vec<VdpEvent>,
    busy: BusyState,
    /// HV counter congelado pelo bit 1 do registrador 0.
    hv_latch: Option<u16>,
}

impl<B: VdpBus> GenesisVdp<B> {
    pub fn new(bus: B, config: VdpConfig) -> Self {
        let regs = VdpRegisters::new();
        let mode = VideoMode::from_flags(config.is_pal(), regs.decoded().h40, regs.decoded().v30);
        let (width, height) = Renderer::frame_size(mode, regs.decoded());
        let timing = VdpInterruptController::new(mode, regs.decoded());
        Self {
            bus,
            regs,
            memory: VdpMemory::new(),
            port: PortState::new(),
            fifo: Fifo::new(),
            dma: DmaHandler::new(config.log_dma),
            timing,
            renderer: Renderer::new(config.log_render),
            frame: FrameBuffer::new(width, height),
            events: Vec::new(),
            busy: BusyState::NotBusy,
            hv_latch: None,
            config,
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn memory(&self) -> &VdpMemory {
        &self.memory
    }

    pub fn config(&self) -> &VdpConfig {
        &self.config
    }

    pub fn video_mode(&self) -> VideoMode {
        self.timing.mode
    }

    pub fn h_counter(&self) -> u16 {
        self.timing.h_counter
    }

    pub fn v_counter(&self) -> u16 {
        self.timing.v_counter
    }

    pub fn busy_state(&self) -> BusyState {
        self.busy
    }

    pub fn fifo_len(&self) -> usize {
        self.fifo.len()
    }

    pub fn is_dma_active(&self) -> bool {
        self.dma.is_active()
    }

    // =====================================================
    // INTERRUPÇÕES
    // =====================================================

    /// Nível pedido ao 68000: 6 (VINT), 4 (HINT) ou 0.
    pub fn interrupt_level(&self) -> u8 {
        self.timing.interrupt_level(self.regs.decoded())
    }

    pub fn acknowledge_interrupt(&mut self, level: u8) {
        trace!("Interrupção nível {} reconhecida", level);
        self.timing.acknowledge(level);
    }

    pub fn read_hv_counter(&self) -> u16 {
        self.hv_latch
            .unwrap_or_else(|| self.timing.hv_counter(self.regs.decoded()))
    }

    fn update_hv_latch(&mut self) {
        let decoded = self.regs.decoded();
        if !decoded.hv_counter_latch {
            self.hv_latch = None;
        } else if self.hv_latch.is_none() {
            let hv = self.timing.hv_counter(decoded);
            trace!("HV counter travado em {:04X}", hv);
            self.hv_latch = Some(hv);
        }
    }

    // =====================================================
    // REGISTRADORES
    // =====================================================

    fn write_register(&mut self, index: usize, value: u8) -> Result<(), VdpError> {
        self.regs.write(index, value)?;
        if self.config.log_registers {
            debug!("VDP reg {:02X} <- {:02X}", index, value);
        }

        if index == REG_MODE_1 {
            self.update_hv_latch();
        }
        if index == REG_SPRITE_TABLE || index == REG_MODE_4 {
            self.memory.set_sat_base(self.regs.decoded().sat_base);
        }
        self.update_video_mode();
        Ok(())
    }

    fn update_video_mode(&mut self) {
        let decoded = self.regs.decoded();
        let mode = VideoMode::from_flags(self.config.is_pal(), decoded.h40, decoded.v30);
        if mode != self.timing.mode {
            debug!("Modo de vídeo: {} -> {}", self.timing.mode, mode);
            self.timing.set_mode(mode);
            self.events.push(VdpEvent::VideoModeChange(mode));
        }
    }

    // =====================================================
    // FIFO / DMA
    // =====================================================

    fn update_busy_state(&mut self) {
        let state = self.dma.busy_state(&self.fifo);
        if state != self.busy {
            self.busy = state;
            self.bus.set_busy_state(state);
        }
    }

    fn log_fifo_write(&self, entry: &FifoEntry) {
        if self.config.log_fifo {
            trace!("FIFO {:?} {:04X} = {:04X}", entry.target, entry.address, entry.data);
        }
    }

    /// Aplica a entrada mais antiga em um slot externo. Entradas de VRAM
    /// precisam de dois slots, um por byte.
    fn drain_fifo_entry(&mut self) {
        let Some(entry) = self.fifo.peek().copied() else {
            return;
        };
        match entry.target.write_target() {
            Some(VdpRamType::Vram) => {
                if !entry.first_byte_written {
                    self.memory.write_vram_byte(entry.address, (entry.data >> 8) as u8);
                    if let Some(front) = self.fifo.peek_mut() {
                        front.first_byte_written = true;
                    }
                    return;
                }
                self.memory.write_vram_byte(entry.address ^ 1, entry.data as u8);
                self.log_fifo_write(&entry);
            }
            Some(ram) => {
                self.memory.write_word(ram, entry.address, entry.data);
                self.log_fifo_write(&entry);
            }
            None => self.report(VdpError::InvalidFifoTarget {
                code: entry.target.code(),
                address: entry.address,
            }),
        }
        self.fifo.pop();
    }

    /// Aplica a entrada mais antiga imediatamente (CPU parada esperando vaga).
    fn commit_oldest_entry(&mut self) {
        let Some(entry) = self.fifo.pop() else {
            return;
        };
        match entry.target.write_target() {
            Some(VdpRamType::Vram) => {
                if !entry.first_byte_written {
                    self.memory.write_vram_byte(entry.address, (entry.data >> 8) as u8);
                }
                self.memory.write_vram_byte(entry.address ^ 1, entry.data as u8);
            }
            Some(ram) => self.memory.write_word(ram, entry.address, entry.data),
            None => {
                self.report(VdpError::InvalidFifoTarget {
                    code: entry.target.code(),
                    address: entry.address,
                });
                return;
            }
        }
        self.log_fifo_write(&entry);
    }

    fn flush_fifo(&mut self) {
        while !self.fifo.is_empty() {
            self.commit_oldest_entry();
        }
    }

    fn run_dma_slot(&mut self) {
        let done = self.dma.step(
            &mut self.regs,
            &mut self.memory,
            &mut self.fifo,
            &mut self.port,
            &mut self.bus,
        );
        if done && self.config.log_dma {
            debug!("DMA terminou em V={:03X} H={:03X}", self.timing.v_counter, self.timing.h_counter);
        }
    }

    fn report(&self, err: VdpError) {
        match err {
            VdpError::InvalidRegister { .. } => warn!("{}", err),
            _ => error!("{}", err),
        }
    }

    // =====================================================
    // TEMPORIZAÇÃO / RENDERIZAÇÃO
    // =====================================================

    fn handle_timing_events(&mut self, events: TimingEvents) {
        if let Some(counter) = events.hlines_counter {
            self.events.push(VdpEvent::HLinesCounter(counter));
        }
        if let Some(level) = events.z80_interrupt {
            self.events.push(VdpEvent::Z80Interrupt(level));
        }
        if events.vint {
            trace!("VINT em V={:03X}", self.timing.v_counter);
        }
        if events.hint {
            trace!("HINT em V={:03X}", self.timing.v_counter);
        }
    }

    fn apply_sprite_status(&mut self, overflow: bool, collision: bool) {
        if overflow {
            self.timing.status.insert(VdpStatus::SPRITE_OVERFLOW);
        }
        if collision {
            self.timing.status.insert(VdpStatus::SPRITE_COLLISION);
        }
    }

    fn draw_line(&mut self) {
        let line = self.timing.v_counter as usize;
        let mode = self.timing.mode;
        let odd = self.timing.status.contains(VdpStatus::ODD_FRAME);
        let decoded = *self.regs.decoded();

        if line == 0 {
            let (width, height) = Renderer::frame_size(mode, &decoded);
            self.frame.resize(width, height);
        }

        let flags = self
            .renderer
            .render_line(&self.memory, &decoded, mode, line, odd, &mut self.frame);
        self.apply_sprite_status(flags.overflow, flags.collision);

        let next = line + 1;
        if next < mode.resolution().1 {
            let overflow = self.renderer.prepare_sprites(&self.memory, &decoded, mode, next, odd);
            self.apply_sprite_status(overflow, false);
        }
    }

    fn draw_frame(&mut self) {
        let decoded = *self.regs.decoded();
        let odd = self.timing.status.contains(VdpStatus::ODD_FRAME);
        let overflow = self
            .renderer
            .prepare_sprites(&self.memory, &decoded, self.timing.mode, 0, odd);
        self.apply_sprite_status(overflow, false);
        if self.config.log_render {
            trace!("Quadro completo ({})", self.timing.mode);
        }
        self.events.push(VdpEvent::NewFrame);
    }

    fn status_word(&self) -> VdpStatus {
        let mut status = self.timing.status
            & (VdpStatus::VINT_PENDING
                | VdpStatus::SPRITE_OVERFLOW
                | VdpStatus::SPRITE_COLLISION
                | VdpStatus::ODD_FRAME
                | VdpStatus::VBLANK
                | VdpStatus::HBLANK
                | VdpStatus::PAL);
        status.set(VdpStatus::FIFO_EMPTY, self.fifo.is_empty());
        status.set(VdpStatus::FIFO_FULL, self.fifo.is_full());
        status.set(VdpStatus::DMA_BUSY, self.dma.is_active());
        if !self.regs.decoded().display_enabled {
            status.insert(VdpStatus::VBLANK);
        }
        status
    }

    /// Status sem os efeitos colaterais da leitura pela porta.
    pub fn peek_status(&self) -> VdpStatus {
        self.status_word()
    }
}

impl<B: VdpBus> VdpProvider for GenesisVdp<B> {
    fn write_control_port(&mut self, word: u16) {
        match self.port.write_control(word) {
            ControlWrite::Register { index, value } => self.set_register(index, value),
            ControlWrite::FirstWord => {}
            ControlWrite::SecondWord { dma } => {
                if self.config.log_registers {
                    debug!("VDP comando: code={:02X} addr={:04X}", self.port.code, self.port.address);
                }
                if dma && self.regs.decoded().dma_enabled {
                    if let Err(err) = self.dma.setup(&self.regs, self.port.code) {
                        self.report(err);
                    }
                }
            }
        }
        self.update_busy_state();
    }

    fn write_data_port(&mut self, word: u16) {
        self.port.pending = false;
        if self.fifo.is_full() {
            self.commit_oldest_entry();
        }
        let entry = FifoEntry::new(self.port.port_type(), self.port.address, word);
        if let Err(err) = self.fifo.push(entry) {
            self.report(err);
        }
        self.port.advance(self.regs.decoded().auto_increment);

        if self.dma.is_awaiting_fill_data() {
            self.dma.start_fill(word);
        }
        self.update_busy_state();
    }

    fn read_control_port(&mut self) -> u16 {
        self.port.pending = false;
        let status = self.status_word();
        // VINT pendente só sai com o reconhecimento do 68000
        self.timing
            .status
            .remove(VdpStatus::SPRITE_OVERFLOW | VdpStatus::SPRITE_COLLISION);
        status.bits()
    }

    fn read_data_port(&mut self) -> u16 {
        self.port.pending = false;
        // A leitura espera a FIFO esvaziar
        self.flush_fifo();
        let address = self.port.address;
        let last = self.fifo.last_written();
        let value = match self.port.port_type() {
            VdpPortType::VramRead => self.memory.vram.read16(address & !1),
            VdpPortType::VsramRead => (self.memory.vsram.read16(address) & 0x07FF) | (last & 0xF800),
            VdpPortType::CramRead => (self.memory.cram.read16(address) & 0x0EEE) | (last & !0x0EEE),
            VdpPortType::Vram8BitRead => self.memory.vram.read8(address ^ 1) as u16 | (last & 0xFF00),
            _ => {
                self.report(VdpError::InvalidReadMode { code: self.port.code });
                last
            }
        };
        self.port.advance(self.regs.decoded().auto_increment);
        self.update_busy_state();
        value
    }

    fn register(&self, index: usize) -> u8 {
        self.regs.read(index)
    }

    fn set_register(&mut self, index: usize, value: u8) {
        if let Err(err) = self.write_register(index, value) {
            self.report(err);
        }
    }

    fn step(&mut self) -> u32 {
        for _ in 0..2 {
            let events = self.timing.advance_half_slot(self.regs.decoded());
            self.handle_timing_events(events);
        }

        let blanking = self.timing.in_vblank() || !self.regs.decoded().display_enabled;
        if self.timing.is_external_slot(blanking) {
            self.drain_fifo_entry();
            self.run_dma_slot();
        }

        if self.timing.is_draw_line_slot() {
            self.draw_line();
        } else if self.timing.is_draw_frame_slot() {
            self.draw_frame();
        }

        self.update_busy_state();
        self.timing.clock_divisor()
    }

    fn frame_buffer(&self) -> &FrameBuffer {
        &self.frame
    }

    fn take_events(&mut self) -> Vec<VdpEvent> {
        std::mem::take(&mut self.events)
    }

    fn reset(&mut self) {
        debug!("VDP reset");
        self.regs.reset();
        self.memory = VdpMemory::new();
        self.port = PortState::new();
        self.fifo.clear();
        self.dma.reset();
        let decoded = self.regs.decoded();
        let mode = VideoMode::from_flags(self.config.is_pal(), decoded.h40, decoded.v30);
        self.timing.reset(mode, decoded);
        self.renderer.reset();
        let (width, height) = Renderer::frame_size(mode, decoded);
        self.frame = FrameBuffer::new(width, height);
        self.events.clear();
        self.hv_latch = None;
        self.update_busy_state();
    }
}
