//! Clock Control Unit MMIO register handling.
//!
//! The CCU is a register-file shaped peripheral: a flat array of 32-bit
//! registers the guest programs and reads back. The only behavior the
//! model adds is the PLL lock handshake: a PLL control register written
//! with its ENABLE bit set reads back with the LOCK bit asserted, so
//! firmware spinning on lock makes progress immediately.

use std::collections::HashSet;
use tracing::{instrument, trace, warn};
use unicorn_engine::Unicorn;

use crate::snapshot::{Decoder, DeviceSnapshot, Encoder, SnapshotError};
use h3emu_hw::mmio::ccu::{BASE, END, PLL_REGISTERS, pll};

const REG_COUNT: usize = ((END - BASE) / 4) as usize;

/// Clock Control Unit state
pub struct CcuState {
    regs: [u32; REG_COUNT],
    reported_offsets: HashSet<u32>,
}

impl Default for CcuState {
    fn default() -> Self {
        Self::new()
    }
}

impl CcuState {
    pub fn new() -> Self {
        Self {
            regs: [0; REG_COUNT],
            reported_offsets: HashSet::new(),
        }
    }

    /// Restore every register to its power-on value.
    pub fn reset(&mut self) {
        self.regs = [0; REG_COUNT];
    }

    fn index(&mut self, offset: u32, access: &str) -> Option<usize> {
        let index = (offset / 4) as usize;
        if offset % 4 == 0 && index < REG_COUNT {
            Some(index)
        } else {
            if self.reported_offsets.insert(offset) {
                warn!("CCU guest error: {} at bad offset {:#X}", access, offset);
            }
            None
        }
    }

    /// Handle a read from a CCU register.
    pub fn read(&mut self, offset: u32) -> u32 {
        let value = match self.index(offset, "read") {
            Some(index) => self.regs[index],
            None => 0,
        };
        trace!("CCU register read: offset={:#X}, value={:#X}", offset, value);
        value
    }

    /// Handle a write to a CCU register.
    pub fn write(&mut self, offset: u32, value: u32) {
        trace!("CCU register write: offset={:#X}, value={:#X}", offset, value);

        let Some(index) = self.index(offset, "write") else {
            return;
        };

        let mut value = value;
        if PLL_REGISTERS.contains(&offset) && value & pll::ENABLE != 0 {
            // An enabled PLL locks instantly; there is no clock domain to
            // settle.
            value |= pll::LOCK;
        }
        self.regs[index] = value;
    }
}

impl DeviceSnapshot for CcuState {
    const DEVICE_ID: u32 = u32::from_be_bytes(*b"CCU ");
    const DEVICE_VERSION: u32 = 1;

    fn save_state(&self) -> Vec<u8> {
        let mut e = Encoder::new(Self::DEVICE_ID, Self::DEVICE_VERSION);
        for reg in self.regs {
            e.u32(reg);
        }
        e.finish()
    }

    fn load_state(&mut self, data: &[u8]) -> Result<(), SnapshotError> {
        let mut d = Decoder::new(Self::DEVICE_ID, Self::DEVICE_VERSION, data)?;
        for reg in &mut self.regs {
            *reg = d.u32()?;
        }
        d.finish()
    }
}

// ============================================================================
// Unicorn MMIO Adapters
// ============================================================================

/// MMIO read handler function (for use with Unicorn)
#[instrument(level = "trace", skip(uc))]
pub fn read_handler(uc: &mut Unicorn<'_, super::SocState>, addr: u64, _size: usize) -> u64 {
    uc.get_data_mut().ccu.read(addr as u32) as u64
}

/// MMIO write handler function (for use with Unicorn)
#[instrument(level = "trace", skip(uc))]
pub fn write_handler(uc: &mut Unicorn<'_, super::SocState>, addr: u64, _size: usize, value: u64) {
    uc.get_data_mut().ccu.write(addr as u32, value as u32);
}
