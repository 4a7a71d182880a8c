//! FIFO de escrita do VDP (4 entradas).
//!
//! Cada escrita na porta de dados vira uma entrada; as entradas são aplicadas
//! à memória nos slots externos, na ordem de chegada.

use std::collections::VecDeque;

use super::error::VdpError;
use super::ports::VdpPortType;

pub const FIFO_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FifoEntry {
    pub target: VdpPortType,
    pub address: u16,
    pub data: u16,
    /// VRAM grava um byte por slot; marca que o primeiro já foi gravado.
    pub first_byte_written: bool,
}

impl FifoEntry {
    pub fn new(target: VdpPortType, address: u16, data: u16) -> Self {
        Self {
            target,
            address,
            data,
            first_byte_written: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Fifo {
    entries: VecDeque<FifoEntry>,
    last_written: u16,
}

impl Fifo {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(FIFO_SIZE),
            last_written: 0,
        }
    }

    pub fn push(&mut self, entry: FifoEntry) -> Result<(), VdpError> {
        if self.is_full() {
            return Err(VdpError::FifoFull {
                address: entry.address,
            });
        }
        self.last_written = entry.data;
        self.entries.push_back(entry);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<FifoEntry> {
        self.entries.pop_front()
    }

    pub fn peek(&self) -> Option<&FifoEntry> {
        self.entries.front()
    }

    pub fn peek_mut(&mut self) -> Option<&mut FifoEntry> {
        self.entries.front_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= FIFO_SIZE
    }

    /// Último dado empurrado; as leituras da porta de dados misturam esses bits.
    pub fn last_written(&self) -> u16 {
        self.last_written
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.last_written = 0;
    }
}

impl Default for Fifo {
    fn default() -> Self {
        Self::new()
    }
}
