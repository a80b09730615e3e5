/// CPU specifications
pub mod cpu {
    /// Cortex-A7 nominal frequency (1008 MHz)
    ///
    /// The H3 carries four Cortex-A7 cores; the emulator models a single
    /// core at this frequency.
    pub const CORTEX_A7_HZ: u64 = 1_008_000_000;
}

/// SD/MMC card specifications
pub mod sd {
    /// Standard data block size in bytes
    pub const BLOCK_SIZE: usize = 512;
}
