//! System Controller register definitions.
//!
//! # References
//! - Allwinner H3 Datasheet v1.2, §4.1 "System Controller"

/// System Controller MMIO region base address
pub const BASE: u32 = 0x01C0_0000;

/// System Controller MMIO region end address (exclusive)
pub const END: u32 = 0x01C0_1000;

/// System Controller register offsets (relative to `BASE`)
pub mod registers {
    /// Version register; writes are ignored
    pub const VER: u32 = 0x024;
    /// EMAC PHY clock configuration
    pub const EMAC_PHY_CLK: u32 = 0x030;
}
