//! MegaStrife VDP - núcleo do processador de vídeo do Sega Genesis/Mega Drive
//!
//! O VDP é dirigido por `step()`, um slot de acesso (dois pixels) por chamada.
//! O restante do sistema fala com ele pelas portas de controle/dados
//! (`VdpProvider`) e o atende pelo trait `VdpBus`.

pub mod config;
pub mod vdp;

pub use config::{Region, VdpConfig};
pub use vdp::{BusyState, FrameBuffer, GenesisVdp, Size, VdpBus, VdpEvent, VdpProvider, VideoMode};
