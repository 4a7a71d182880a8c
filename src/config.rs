//! Configuração do VDP, lida de um arquivo RON.
//!
//! Substitui as flags globais de "verbose": a configuração é passada na
//! construção do `GenesisVdp` e não muda depois disso.
//!
//! Exemplo:
//! ```ron
//! (
//!     region: Pal,
//!     log_dma: true,
//! )
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Região do console (define o total de linhas por quadro e o bit PAL do status).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Region {
    #[default]
    Ntsc,
    Pal,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid RON config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VdpConfig {
    pub region: Region,
    /// Loga cada escrita de registrador aceita.
    pub log_registers: bool,
    /// Loga push/commit das entradas do FIFO.
    pub log_fifo: bool,
    /// Loga setup, passos e fim de DMA.
    pub log_dma: bool,
    /// Loga links e tiles de sprite fora da faixa e linhas fora do framebuffer.
    pub log_render: bool,
}

impl VdpConfig {
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Carrega a configuração de um arquivo `.ron`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    pub fn is_pal(&self) -> bool {
        self.region == Region::Pal
    }
}
