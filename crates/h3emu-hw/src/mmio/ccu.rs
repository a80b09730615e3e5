//! Clock Control Unit register definitions.
//!
//! # References
//! - Allwinner H3 Datasheet v1.2, §4.3 "CCU"

/// CCU MMIO region base address
pub const BASE: u32 = 0x01C2_0000;

/// CCU MMIO region end address (exclusive)
pub const END: u32 = 0x01C2_0400;

/// CCU register offsets (relative to `BASE`)
pub mod registers {
    /// CPUX clock PLL control
    pub const PLL_CPUX: u32 = 0x000;
    /// Audio PLL control
    pub const PLL_AUDIO: u32 = 0x008;
    /// Video PLL control
    pub const PLL_VIDEO: u32 = 0x010;
    /// Video engine PLL control
    pub const PLL_VE: u32 = 0x018;
    /// DDR PLL control
    pub const PLL_DDR: u32 = 0x020;
    /// Peripheral PLL 0 control
    pub const PLL_PERIPH0: u32 = 0x028;
    /// GPU PLL control
    pub const PLL_GPU: u32 = 0x038;
    /// Peripheral PLL 1 control
    pub const PLL_PERIPH1: u32 = 0x044;
    /// Display engine PLL control
    pub const PLL_DE: u32 = 0x048;
    /// CPUX/AXI clock source configuration
    pub const CPUX_AXI_CFG: u32 = 0x050;
    /// AHB1/APB1 clock configuration
    pub const AHB1_APB1_CFG: u32 = 0x054;
    /// APB2 clock configuration
    pub const APB2_CFG: u32 = 0x058;
    /// SD/MMC0 module clock
    pub const SDMMC0_CLK: u32 = 0x088;
}

/// PLL control register bit flags (common to all PLL_* registers)
pub mod pll {
    /// PLL enable
    pub const ENABLE: u32 = 1 << 31;
    /// PLL has locked; read-only, asserted by the model when enabled
    pub const LOCK: u32 = 1 << 28;
}

/// Offsets of the PLL-family registers that carry the LOCK semantics
pub const PLL_REGISTERS: [u32; 9] = [
    registers::PLL_CPUX,
    registers::PLL_AUDIO,
    registers::PLL_VIDEO,
    registers::PLL_VE,
    registers::PLL_DDR,
    registers::PLL_PERIPH0,
    registers::PLL_GPU,
    registers::PLL_PERIPH1,
    registers::PLL_DE,
];
