//! Erros internos do VDP.
//!
//! O hardware real não possui estados de erro: todos estes casos são
//! registrados no log e absorvidos por `GenesisVdp`, nunca propagados
//! para o chamador.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VdpError {
    #[error("Register {index} is not writable in {mode} (limit {limit})")]
    InvalidRegister {
        index: usize,
        limit: usize,
        mode: &'static str,
    },

    #[error("FIFO full, cannot queue write to 0x{address:04X}")]
    FifoFull { address: u16 },

    #[error("Invalid DMA mode: reg23=0x{reg23:02X}, code=0x{code:02X}")]
    InvalidDmaMode { reg23: u8, code: u8 },

    #[error("FIFO entry with non-write target code 0x{code:02X} at 0x{address:04X}")]
    InvalidFifoTarget { code: u8, address: u16 },

    #[error("Data port read with non-read code 0x{code:02X}")]
    InvalidReadMode { code: u8 },
}
