//! Memory-Mapped I/O (MMIO) handling for Allwinner H3 emulation.
//!
//! This module provides handlers for the MMIO regions the emulator
//! models. Each peripheral with real behavior gets its own module; the
//! rest of the peripheral window is served by generic stub handlers.
//!
//! # Memory Map
//! - `0x01C00000-0x01C01000`: System Controller
//! - `0x01C0F000-0x01C10000`: SD/MMC0 host controller
//! - `0x01C20000-0x01C20400`: Clock Control Unit
//! - remainder of `0x01C00000-0x02000000`: generic stub handlers

use crate::irq::IrqLine;
use crate::mem::Ram;
use crate::sd::SdBus;

pub mod ccu;
pub mod generic;
pub mod sdhc;
pub mod syscon;

// Re-export types for convenience
pub use ccu::CcuState;
pub use sdhc::SdHostState;
pub use syscon::SysconState;

/// Shared emulator state accessible from MMIO callbacks and main loop
pub struct SocState {
    pub sdhc: SdHostState,
    pub ccu: CcuState,
    pub syscon: SysconState,
    /// DRAM view the SD host's DMA engine walks. The same backing
    /// storage is mapped into the CPU emulator.
    pub dram: Ram,
}

impl SocState {
    pub fn new(dram: Ram, card: Box<dyn SdBus>, sd_irq: Box<dyn IrqLine>) -> Self {
        Self {
            sdhc: SdHostState::new(card, sd_irq),
            ccu: CcuState::new(),
            syscon: SysconState::new(),
            dram,
        }
    }
}
