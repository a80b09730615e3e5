//! Memory setup utilities for Allwinner H3 emulation.
//!
//! This module maps DRAM, the boot SRAM and the peripheral MMIO window
//! into the CPU emulator, and loads the guest kernel image.

use crate::mmio;
use h3emu_hw::memory_map;
use h3emu_hw::mmio::{ccu as hw_ccu, sdhc as hw_sdhc, syscon as hw_syscon};
use tracing::debug;
use unicorn_engine::{Unicorn, unicorn_const::Prot};

// Memory constants from hardware definitions
pub const DRAM_BASE: u32 = memory_map::dram::BASE;
pub const SRAM_A1_BASE: u32 = memory_map::sram_a1::BASE;
pub const SRAM_A1_SIZE: usize = memory_map::sram_a1::SIZE;

/// Guest physical address the kernel image is loaded at; the common
/// sunxi convention of DRAM base + 512 KiB.
pub const KERNEL_LOAD_ADDR: u32 = DRAM_BASE + 0x8_0000;

// MMIO region constants; the peripheral window starts at the SYSCON base
const MMIO_END: u32 = memory_map::mmio::END;
const SYSCON_BASE: u32 = hw_syscon::BASE;
const SYSCON_END: u32 = hw_syscon::END;
const SDHC_BASE: u32 = hw_sdhc::BASE;
const SDHC_END: u32 = hw_sdhc::END;
const CCU_BASE: u32 = hw_ccu::BASE;

/// MMIO mappings are page granular; the CCU register file is smaller
/// than a page, so its window is padded and the model rejects the rest.
const CCU_WINDOW_END: u32 = CCU_BASE + 0x1000;

/// Map DRAM, boot SRAM and the peripheral window for the CPU.
///
/// `dram_ptr`/`dram_size` describe the backing storage of the [`crate::mem::Ram`]
/// held in the emulator's [`mmio::SocState`], so CPU loads/stores and
/// device DMA observe the same bytes.
pub fn setup_memory(
    emu: &mut Unicorn<'_, mmio::SocState>,
    dram_ptr: *mut u8,
    dram_size: usize,
) -> Result<(), String> {
    debug!(
        "  Mapping DRAM at {:#X} ({}MB)",
        DRAM_BASE,
        dram_size / (1024 * 1024)
    );
    // SAFETY: the backing storage is heap memory owned by the SocState
    // inside this Unicorn instance; it is never reallocated and outlives
    // every mapping.
    unsafe {
        emu.mem_map_ptr(DRAM_BASE as u64, dram_size as u64, Prot::ALL, dram_ptr as _)
            .map_err(|e| format!("failed to map DRAM: {:?}", e))?;
    }

    debug!(
        "  Mapping boot SRAM at {:#X} ({}KB)",
        SRAM_A1_BASE,
        SRAM_A1_SIZE / 1024
    );
    emu.mem_map(SRAM_A1_BASE as u64, SRAM_A1_SIZE as u64, Prot::ALL)
        .map_err(|e| format!("failed to map boot SRAM: {:?}", e))?;

    // Peripheral window, carved around the modeled devices.
    debug!(
        "  Mapping SYSCON MMIO region {:#X} - {:#X}",
        SYSCON_BASE, SYSCON_END
    );
    emu.mmio_map(
        SYSCON_BASE as u64,
        (SYSCON_END - SYSCON_BASE) as u64,
        Some(mmio::syscon::read_handler),
        Some(mmio::syscon::write_handler),
    )
    .map_err(|e| format!("failed to map SYSCON MMIO region: {:?}", e))?;

    debug!(
        "  Mapping generic MMIO region {:#X} - {:#X}",
        SYSCON_END, SDHC_BASE
    );
    emu.mmio_map(
        SYSCON_END as u64,
        (SDHC_BASE - SYSCON_END) as u64,
        Some(mmio::generic::read_handler),
        Some(mmio::generic::write_handler),
    )
    .map_err(|e| format!("failed to map generic MMIO region: {:?}", e))?;

    debug!(
        "  Mapping SDHC MMIO region {:#X} - {:#X}",
        SDHC_BASE, SDHC_END
    );
    emu.mmio_map(
        SDHC_BASE as u64,
        (SDHC_END - SDHC_BASE) as u64,
        Some(mmio::sdhc::read_handler),
        Some(mmio::sdhc::write_handler),
    )
    .map_err(|e| format!("failed to map SDHC MMIO region: {:?}", e))?;

    debug!(
        "  Mapping generic MMIO region {:#X} - {:#X}",
        SDHC_END, CCU_BASE
    );
    emu.mmio_map(
        SDHC_END as u64,
        (CCU_BASE - SDHC_END) as u64,
        Some(mmio::generic::read_handler),
        Some(mmio::generic::write_handler),
    )
    .map_err(|e| format!("failed to map generic MMIO region: {:?}", e))?;

    debug!(
        "  Mapping CCU MMIO region {:#X} - {:#X}",
        CCU_BASE, CCU_WINDOW_END
    );
    emu.mmio_map(
        CCU_BASE as u64,
        (CCU_WINDOW_END - CCU_BASE) as u64,
        Some(mmio::ccu::read_handler),
        Some(mmio::ccu::write_handler),
    )
    .map_err(|e| format!("failed to map CCU MMIO region: {:?}", e))?;

    debug!(
        "  Mapping generic MMIO region {:#X} - {:#X}",
        CCU_WINDOW_END, MMIO_END
    );
    emu.mmio_map(
        CCU_WINDOW_END as u64,
        (MMIO_END - CCU_WINDOW_END) as u64,
        Some(mmio::generic::read_handler),
        Some(mmio::generic::write_handler),
    )
    .map_err(|e| format!("failed to map generic MMIO region: {:?}", e))?;

    Ok(())
}

/// Load a flat kernel image at the conventional load address.
pub fn load_kernel(emu: &mut Unicorn<'_, mmio::SocState>, kernel: &[u8]) -> Result<(), String> {
    debug!(
        "  Loading kernel: addr={:#X}, size={:#X}",
        KERNEL_LOAD_ADDR,
        kernel.len()
    );
    emu.mem_write(KERNEL_LOAD_ADDR as u64, kernel)
        .map_err(|e| format!("failed to write kernel image: {:?}", e))
}
