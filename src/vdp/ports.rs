//! Protocolo das portas de controle/dados do VDP.
//!
//! A porta de controle recebe comandos de duas words:
//!
//! ```text
//! word 1: CD1 CD0 A13 A12 A11 A10 A9 A8 A7 A6 A5 A4 A3 A2 A1 A0
//! word 2:  0   0   0   0   0   0   0  0 CD5 CD4 CD3 CD2 0  0 A15 A14
//! ```
//!
//! Uma word com os dois bits superiores `10` é sempre escrita de registrador.

use super::memory::VdpRamType;

/// Destino/operação selecionados pelos bits CD3..CD0 do código.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VdpPortType {
    VramRead,
    VramWrite,
    CramRead,
    CramWrite,
    VsramRead,
    VsramWrite,
    Vram8BitRead,
    Invalid(u8),
}

impl VdpPortType {
    pub fn from_code(code: u8) -> Self {
        match code & 0x0F {
            0b0000 => VdpPortType::VramRead,
            0b0001 => VdpPortType::VramWrite,
            0b0011 => VdpPortType::CramWrite,
            0b0100 => VdpPortType::VsramRead,
            0b0101 => VdpPortType::VsramWrite,
            0b1000 => VdpPortType::CramRead,
            0b1100 => VdpPortType::Vram8BitRead,
            other => VdpPortType::Invalid(other),
        }
    }

    /// Bits CD3..CD0 correspondentes.
    pub fn code(self) -> u8 {
        match self {
            VdpPortType::VramRead => 0b0000,
            VdpPortType::VramWrite => 0b0001,
            VdpPortType::CramWrite => 0b0011,
            VdpPortType::VsramRead => 0b0100,
            VdpPortType::VsramWrite => 0b0101,
            VdpPortType::CramRead => 0b1000,
            VdpPortType::Vram8BitRead => 0b1100,
            VdpPortType::Invalid(code) => code,
        }
    }

    pub fn is_write(self) -> bool {
        matches!(
            self,
            VdpPortType::VramWrite | VdpPortType::CramWrite | VdpPortType::VsramWrite
        )
    }

    /// Memória alvo de uma escrita; `None` para leituras e códigos inválidos.
    pub fn write_target(self) -> Option<VdpRamType> {
        match self {
            VdpPortType::VramWrite => Some(VdpRamType::Vram),
            VdpPortType::CramWrite => Some(VdpRamType::Cram),
            VdpPortType::VsramWrite => Some(VdpRamType::Vsram),
            _ => None,
        }
    }
}

/// Resultado de uma word escrita na porta de controle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlWrite {
    Register { index: usize, value: u8 },
    FirstWord,
    /// Segunda word aceita; `dma` indica CD5 ligado.
    SecondWord { dma: bool },
}

pub const CODE_DMA: u8 = 0x20;

/// Endereço, código e flag de comando pendente.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortState {
    pub address: u16,
    pub code: u8,
    pub pending: bool,
}

impl PortState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_control(&mut self, word: u16) -> ControlWrite {
        if word & 0xC000 == 0x8000 {
            self.pending = false;
            return ControlWrite::Register {
                index: ((word >> 8) & 0x1F) as usize,
                value: (word & 0xFF) as u8,
            };
        }

        if !self.pending {
            self.address = (self.address & 0xC000) | (word & 0x3FFF);
            self.code = (self.code & 0x3C) | (word >> 14) as u8;
            self.pending = true;
            ControlWrite::FirstWord
        } else {
            self.address = (self.address & 0x3FFF) | ((word & 0x0003) << 14);
            self.code = (self.code & 0x03) | ((word >> 2) & 0x3C) as u8;
            self.pending = false;
            ControlWrite::SecondWord {
                dma: self.code & CODE_DMA != 0,
            }
        }
    }

    pub fn port_type(&self) -> VdpPortType {
        VdpPortType::from_code(self.code)
    }

    pub fn advance(&mut self, increment: u8) {
        self.address = self.address.wrapping_add(increment as u16);
    }
}
