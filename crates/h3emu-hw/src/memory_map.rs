//! # References
//! - Allwinner H3 Datasheet v1.2, §1.2 "Memory Mapping"

/// DRAM - external SDRAM attached to the DRAM controller
///
/// The H3 supports up to 2 GiB starting at 0x40000000. Boards ship with
/// 512 MiB or 1 GiB; the emulator maps a configurable amount starting at
/// `BASE`.
pub mod dram {
    /// DRAM base address
    pub const BASE: u32 = 0x4000_0000;
    /// Default emulated DRAM size (128 MiB)
    pub const DEFAULT_SIZE: usize = 128 * 1024 * 1024;
}

/// SRAM A1 - internal boot SRAM
pub mod sram_a1 {
    /// SRAM A1 base address
    pub const BASE: u32 = 0x0000_0000;
    /// SRAM A1 size (64 KiB)
    pub const SIZE: usize = 64 * 1024;
}

/// MMIO (Memory-Mapped I/O) region boundaries
///
/// All H3 peripherals live in a single window below DRAM. Sub-ranges with
/// dedicated device models are carved out of it; the remainder is served
/// by a generic stub handler.
pub mod mmio {
    /// Start of the peripheral MMIO window
    pub const BASE: u32 = 0x01C0_0000;
    /// End of the peripheral MMIO window (exclusive)
    pub const END: u32 = 0x0200_0000;
}
