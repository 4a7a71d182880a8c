//! Controlador DMA do VDP
//!
//! Três modos, escolhidos pelos bits 7-6 do registrador 23:
//! - `0x`: 68k → VDP, lendo do barramento externo com a CPU parada
//! - `10`: preenchimento de VRAM com o byte alto da próxima escrita de dados
//! - `11`: cópia VRAM → VRAM
//!
//! Cada micro-passo roda em um slot externo e atualiza os registradores de
//! comprimento (19/20) e de origem (21/22) no próprio banco de registradores.

use log::{debug, error, trace};

use super::error::VdpError;
use super::fifo::{Fifo, FifoEntry};
use super::memory::VdpMemory;
use super::ports::{PortState, VdpPortType};
use super::registers::VdpRegisters;
use super::{Size, VdpBus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaMode {
    MemToVram,
    VramFill,
    VramCopy,
}

/// Motivo pelo qual o VDP está segurando o barramento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusyState {
    #[default]
    NotBusy,
    FifoFull,
    MemToVram,
    VramFill,
    VramCopy,
}

#[derive(Debug, Clone, Default)]
pub struct DmaHandler {
    mode: Option<DmaMode>,
    /// Fill armado, aguardando a word da porta de dados.
    awaiting_fill_data: bool,
    fill_data: u16,
    /// Byte lido no primeiro slot da cópia.
    copy_latch: Option<u8>,
    log: bool,
}

impl DmaHandler {
    pub fn new(log: bool) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.log);
    }

    /// DMA em andamento (não conta o fill que ainda espera seu dado).
    pub fn is_active(&self) -> bool {
        self.mode.is_some() && !self.awaiting_fill_data
    }

    pub fn is_awaiting_fill_data(&self) -> bool {
        self.awaiting_fill_data
    }

    /// Arma o DMA após a segunda word de um comando com CD5 ligado.
    pub fn setup(&mut self, regs: &VdpRegisters, code: u8) -> Result<DmaMode, VdpError> {
        let decoded = regs.decoded();
        let port_type = VdpPortType::from_code(code);
        let mode = match decoded.dma_mode_bits {
            0 | 1 if port_type.is_write() => DmaMode::MemToVram,
            2 if port_type == VdpPortType::VramWrite => DmaMode::VramFill,
            // Cópia ignora os bits de destino do código
            3 => DmaMode::VramCopy,
            _ => {
                let reg23 = regs.read(super::registers::REG_DMA_SOURCE_HIGH);
                return Err(VdpError::InvalidDmaMode { reg23, code });
            }
        };

        self.mode = Some(mode);
        self.awaiting_fill_data = mode == DmaMode::VramFill;
        self.copy_latch = None;
        if self.log {
            debug!(
                "DMA {:?}: source={:06X} length={:04X} code={:02X}",
                mode, decoded.dma_source, decoded.dma_length, code
            );
        }
        Ok(mode)
    }

    /// Registra o dado de preenchimento e libera o fill.
    pub fn start_fill(&mut self, data: u16) {
        if self.awaiting_fill_data {
            self.fill_data = data;
            self.awaiting_fill_data = false;
            if self.log {
                debug!("DMA fill liberado com dado {:04X}", data);
            }
        }
    }

    pub fn busy_state(&self, fifo: &Fifo) -> BusyState {
        if fifo.is_full() {
            return BusyState::FifoFull;
        }
        match self.mode {
            _ if !self.is_active() => BusyState::NotBusy,
            Some(DmaMode::MemToVram) => BusyState::MemToVram,
            Some(DmaMode::VramFill) => BusyState::VramFill,
            Some(DmaMode::VramCopy) => BusyState::VramCopy,
            None => BusyState::NotBusy,
        }
    }

    /// Um micro-passo de DMA num slot externo. Retorna `true` quando a
    /// transferência termina neste passo.
    pub fn step<B: VdpBus>(
        &mut self,
        regs: &mut VdpRegisters,
        memory: &mut VdpMemory,
        fifo: &mut Fifo,
        port: &mut PortState,
        bus: &mut B,
    ) -> bool {
        let Some(mode) = self.mode else {
            return false;
        };
        if self.awaiting_fill_data {
            return false;
        }

        match mode {
            DmaMode::MemToVram => {
                if bus.is_cpu_running() || fifo.is_full() {
                    return false;
                }
                let source = regs.decoded().dma_source;
                let data = (bus.read(source << 1, Size::Word) & 0xFFFF) as u16;
                let entry = FifoEntry::new(port.port_type(), port.address, data);
                if let Err(err) = fifo.push(entry) {
                    error!("DMA 68k->VDP: {}", err);
                    return false;
                }
                if self.log {
                    trace!("DMA 68k->VDP {:06X} -> {:04X} = {:04X}", source << 1, port.address, data);
                }
            }
            DmaMode::VramFill => {
                if !fifo.is_empty() {
                    return false;
                }
                let value = (self.fill_data >> 8) as u8;
                memory.write_vram_byte(port.address ^ 1, value);
                if self.log {
                    trace!("DMA fill {:04X} = {:02X}", port.address ^ 1, value);
                }
            }
            DmaMode::VramCopy => {
                if !fifo.is_empty() {
                    return false;
                }
                let source = regs.decoded().dma_source as u16;
                match self.copy_latch.take() {
                    None => {
                        self.copy_latch = Some(memory.vram.read8(source ^ 1));
                        return false;
                    }
                    Some(value) => {
                        memory.write_vram_byte(port.address ^ 1, value);
                        if self.log {
                            trace!("DMA copy {:04X} -> {:04X} = {:02X}", source ^ 1, port.address ^ 1, value);
                        }
                    }
                }
            }
        }

        self.advance(regs, port)
    }

    fn advance(&mut self, regs: &mut VdpRegisters, port: &mut PortState) -> bool {
        let decoded = *regs.decoded();
        let length = decoded.dma_length.wrapping_sub(1);
        regs.set_dma_length(length);
        regs.set_dma_source_low((decoded.dma_source as u16).wrapping_add(1));
        port.advance(decoded.auto_increment);

        if length == 0 {
            if self.log {
                debug!("DMA {:?} concluído", self.mode);
            }
            self.mode = None;
            self.copy_latch = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vdp::registers::{
        REG_AUTO_INCREMENT, REG_DMA_LENGTH_HIGH, REG_DMA_LENGTH_LOW, REG_DMA_SOURCE_HIGH,
        REG_DMA_SOURCE_LOW, REG_MODE_2,
    };

    struct HaltedBus {
        reads: Vec<u32>,
    }

    impl VdpBus for HaltedBus {
        fn is_cpu_running(&self) -> bool {
            false
        }

        fn set_busy_state(&mut self, _state: BusyState) {}

        fn read(&mut self, address: u32, _size: Size) -> u32 {
            self.reads.push(address);
            address & 0xFFFF
        }
    }

    fn dma_registers(mode_bits: u8, length: u16) -> VdpRegisters {
        let mut regs = VdpRegisters::new();
        regs.write(REG_MODE_2, 0x14).unwrap();
        regs.write(REG_AUTO_INCREMENT, 2).unwrap();
        regs.write(REG_DMA_LENGTH_LOW, length as u8).unwrap();
        regs.write(REG_DMA_LENGTH_HIGH, (length >> 8) as u8).unwrap();
        regs.write(REG_DMA_SOURCE_HIGH, mode_bits << 6).unwrap();
        regs
    }

    #[test]
    fn test_setup_modes() {
        let mut dma = DmaHandler::new(false);
        let regs = dma_registers(0b10, 1);
        assert_eq!(dma.setup(&regs, 0x21), Ok(DmaMode::VramFill));
        assert!(dma.is_awaiting_fill_data());
        assert!(!dma.is_active());

        // Fill exige código de escrita em VRAM
        let mut dma = DmaHandler::new(false);
        assert!(matches!(dma.setup(&regs, 0x23), Err(VdpError::InvalidDmaMode { .. })));
        assert!(!dma.is_active() && !dma.is_awaiting_fill_data());

        let regs = dma_registers(0b11, 1);
        assert_eq!(dma.setup(&regs, 0x30), Ok(DmaMode::VramCopy));
        let mut dma = DmaHandler::new(false);
        assert_eq!(dma.setup(&regs, 0x21), Ok(DmaMode::VramCopy));
        let mut dma = DmaHandler::new(false);
        assert_eq!(dma.setup(&regs, 0x20), Ok(DmaMode::VramCopy));

        let regs = dma_registers(0b01, 1);
        let mut dma = DmaHandler::new(false);
        assert_eq!(dma.setup(&regs, 0x23), Ok(DmaMode::MemToVram));
    }

    #[test]
    fn test_fill_steps() {
        let mut regs = dma_registers(0b10, 3);
        let mut memory = VdpMemory::new();
        let mut fifo = Fifo::new();
        let mut port = PortState { address: 0x2000, code: 0x21, pending: false };
        let mut bus = HaltedBus { reads: Vec::new() };
        let mut dma = DmaHandler::new(false);
        dma.setup(&regs, port.code).unwrap();
        assert!(!dma.step(&mut regs, &mut memory, &mut fifo, &mut port, &mut bus));
        dma.start_fill(0x5A00);

        let mut steps = 0;
        while !dma.step(&mut regs, &mut memory, &mut fifo, &mut port, &mut bus) {
            steps += 1;
        }
        assert_eq!(steps + 1, 3);
        assert_eq!(memory.vram.read8(0x2001), 0x5A);
        assert_eq!(memory.vram.read8(0x2003), 0x5A);
        assert_eq!(memory.vram.read8(0x2005), 0x5A);
        assert_eq!(memory.vram.read8(0x2007), 0x00);
        assert_eq!(regs.decoded().dma_length, 0);
        assert_eq!(regs.decoded().dma_source & 0xFFFF, 3);
        assert_eq!(port.address, 0x2006);
    }

    #[test]
    fn test_copy_uses_two_slots_per_byte() {
        let mut regs = dma_registers(0b11, 2);
        regs.write(REG_DMA_SOURCE_LOW, 0x10).unwrap();
        let mut memory = VdpMemory::new();
        memory.vram.write8(0x0011, 0xAA);
        memory.vram.write8(0x0010, 0xBB);
        let mut fifo = Fifo::new();
        let mut port = PortState { address: 0x0100, code: 0x30, pending: false };
        let mut bus = HaltedBus { reads: Vec::new() };
        let mut dma = DmaHandler::new(false);
        dma.setup(&regs, port.code).unwrap();

        let mut slots = 1;
        while !dma.step(&mut regs, &mut memory, &mut fifo, &mut port, &mut bus) {
            slots += 1;
        }
        assert_eq!(slots, 4);
        assert_eq!(memory.vram.read8(0x0101), 0xAA);
        assert_eq!(memory.vram.read8(0x0103), 0xBB);
    }

    #[test]
    fn test_mem_to_vram_waits_for_fifo_room() {
        let mut regs = dma_registers(0b00, 8);
        regs.write(REG_DMA_SOURCE_LOW, 0x80).unwrap();
        let mut memory = VdpMemory::new();
        let mut fifo = Fifo::new();
        let mut port = PortState { address: 0, code: 0x21, pending: false };
        let mut bus = HaltedBus { reads: Vec::new() };
        let mut dma = DmaHandler::new(false);
        dma.setup(&regs, port.code).unwrap();

        for _ in 0..6 {
            dma.step(&mut regs, &mut memory, &mut fifo, &mut port, &mut bus);
        }
        assert!(fifo.is_full());
        assert_eq!(bus.reads, vec![0x100, 0x102, 0x104, 0x106]);
        assert_eq!(dma.busy_state(&fifo), BusyState::FifoFull);
        fifo.pop();
        assert_eq!(dma.busy_state(&fifo), BusyState::MemToVram);
    }

    #[test]
    fn test_zero_length_runs_full_range() {
        let mut regs = dma_registers(0b10, 0);
        let mut memory = VdpMemory::new();
        let mut fifo = Fifo::new();
        let mut port = PortState { address: 0, code: 0x21, pending: false };
        let mut bus = HaltedBus { reads: Vec::new() };
        let mut dma = DmaHandler::new(false);
        regs.write(REG_AUTO_INCREMENT, 1).unwrap();
        dma.setup(&regs, port.code).unwrap();
        dma.start_fill(0xFF00);

        let mut steps = 1u32;
        while !dma.step(&mut regs, &mut memory, &mut fifo, &mut port, &mut bus) {
            steps += 1;
        }
        assert_eq!(steps, 0x10000);
        assert!(memory.vram.as_slice().iter().all(|&b| b == 0xFF));
    }
}
