//! SD/MMC host controller register definitions.
//!
//! # References
//! - Allwinner H3 Datasheet v1.2, §5.3 "SD/MMC Host Controller"
//! - <https://linux-sunxi.org/SD/MMC>

/// SD/MMC0 host controller MMIO region base address
pub const BASE: u32 = 0x01C0_F000;

/// SD/MMC0 host controller MMIO region end address (exclusive)
pub const END: u32 = 0x01C1_0000;

/// SDHC register offsets (relative to `BASE`)
pub mod registers {
    /// Global control register
    pub const GCTL: u32 = 0x000;

    /// Clock control register
    pub const CKCR: u32 = 0x004;

    /// Timeout register
    pub const TMOR: u32 = 0x008;

    /// Bus width register
    pub const BWDR: u32 = 0x00C;

    /// Block size register
    pub const BKSR: u32 = 0x010;

    /// Byte count register
    pub const BYCR: u32 = 0x014;

    /// Command register
    pub const CMDR: u32 = 0x018;

    /// Command argument register
    pub const CAGR: u32 = 0x01C;

    /// Response registers (4 registers x 4 bytes each)
    pub const RESP0: u32 = 0x020;
    pub const RESP1: u32 = 0x024;
    pub const RESP2: u32 = 0x028;
    pub const RESP3: u32 = 0x02C;

    /// Interrupt mask register
    pub const IMKR: u32 = 0x030;

    /// Masked interrupt status register
    pub const MISR: u32 = 0x034;

    /// Raw interrupt status register
    pub const RISR: u32 = 0x038;

    /// Status register
    pub const STAR: u32 = 0x03C;

    /// FIFO water level register
    pub const FWLR: u32 = 0x040;

    /// FIFO function select register
    pub const FUNS: u32 = 0x044;

    /// Debug enable register
    pub const DBGC: u32 = 0x050;

    /// Auto command 12 argument register
    pub const A12A: u32 = 0x058;

    /// SD new timing set register
    pub const NTSR: u32 = 0x05C;

    /// SD new timing debug register
    pub const SDBG: u32 = 0x060;

    /// Hardware reset register
    pub const HWRST: u32 = 0x078;

    /// Internal DMA controller control register
    pub const DMAC: u32 = 0x080;

    /// Descriptor list base address register
    pub const DLBA: u32 = 0x084;

    /// Internal DMA controller status register
    pub const IDST: u32 = 0x088;

    /// Internal DMA controller interrupt enable register
    pub const IDIE: u32 = 0x08C;

    /// Card threshold control register
    pub const THLDC: u32 = 0x100;

    /// eMMC DDR start bit detection control register
    pub const DSBD: u32 = 0x10C;

    /// Response CRC register (read-only storage)
    pub const RES_CRC: u32 = 0x110;

    /// Data CRC registers, lane 7 down to lane 0 (read-only storage)
    pub const DATA7_CRC: u32 = 0x114;
    pub const DATA6_CRC: u32 = 0x118;
    pub const DATA5_CRC: u32 = 0x11C;
    pub const DATA4_CRC: u32 = 0x120;
    pub const DATA3_CRC: u32 = 0x124;
    pub const DATA2_CRC: u32 = 0x128;
    pub const DATA1_CRC: u32 = 0x12C;
    pub const DATA0_CRC: u32 = 0x130;

    /// CRC status register (read-only storage)
    pub const CRC_STA: u32 = 0x134;

    /// Data FIFO register (PIO path)
    pub const FIFO: u32 = 0x200;
}

/// Global control register (GCTL) bit flags
pub mod gctl {
    /// Software reset, self-clearing
    pub const SOFT_RST: u32 = 1 << 0;
    /// FIFO reset, self-clearing
    pub const FIFO_RST: u32 = 1 << 1;
    /// DMA reset, self-clearing
    pub const DMA_RST: u32 = 1 << 2;
    /// Global interrupt enable
    pub const INT_ENB: u32 = 1 << 4;
    /// DMA transfer enable
    pub const DMA_ENB: u32 = 1 << 5;

    /// All self-clearing reset bits
    pub const RST_MASK: u32 = SOFT_RST | FIFO_RST | DMA_RST;
}

/// Command register (CMDR) bit flags
pub mod cmd {
    /// Command index field
    pub const CMDID_MASK: u32 = 0x3F;
    /// A response is expected
    pub const RESPONSE: u32 = 1 << 6;
    /// The expected response is 136 bits instead of 48
    pub const RESPONSE_LONG: u32 = 1 << 7;
    /// A data transfer accompanies the command
    pub const DATA: u32 = 1 << 9;
    /// Data direction: set = host to card
    pub const WRITE: u32 = 1 << 10;
    /// Send a stop command (CMD12) after the data transfer
    pub const AUTOSTOP: u32 = 1 << 12;
    /// Update clock registers only, no card interaction
    pub const CLKCHANGE: u32 = 1 << 21;
    /// Start the command, self-clearing
    pub const LOAD: u32 = 1 << 31;
}

/// Raw interrupt status register (RISR) bit flags
pub mod irq {
    /// Response timeout / no response received
    pub const NO_RESPONSE: u32 = 1 << 1;
    /// Command completed
    pub const CMD_COMPLETE: u32 = 1 << 2;
    /// Data transfer completed
    pub const DATA_COMPLETE: u32 = 1 << 3;
    /// Auto command done (CMD12 sent)
    pub const AUTOCMD_DONE: u32 = 1 << 14;
    /// SDIO interrupt
    pub const SDIO: u32 = 1 << 16;
    /// Card inserted
    pub const CARD_INSERT: u32 = 1 << 30;
    /// Card removed
    pub const CARD_REMOVE: u32 = 1 << 31;
}

/// Status register (STAR) bit flags
pub mod status {
    /// A card is present in the slot
    pub const CARD_PRESENT: u32 = 1 << 8;
}

/// Internal DMA controller status register (IDST) bit flags
pub mod idst {
    /// Transmit interrupt (host to card transfer finished)
    pub const TRANSMIT_IRQ: u32 = 1 << 0;
    /// Receive interrupt (card to host transfer finished)
    pub const RECEIVE_IRQ: u32 = 1 << 1;
    /// Summarized receive interrupt
    pub const SUM_RECEIVE_IRQ: u32 = 1 << 8;

    /// Bits the guest can clear by writing ones
    pub const WR_MASK: u32 = 0x3FF;
}

/// DMA transfer descriptor layout
///
/// Descriptors are 16-byte little-endian structures in guest memory,
/// singly linked through the `next` field: status, size, buffer address,
/// next descriptor address.
pub mod desc {
    /// Descriptor size in guest memory, bytes
    pub const BYTES: u32 = 16;

    /// Descriptor owned by the DMA engine; cleared on writeback
    pub const STATUS_HOLD: u32 = 1 << 31;
    /// Transfer error
    pub const STATUS_ERROR: u32 = 1 << 30;
    /// Second buffer address points to the next descriptor
    pub const STATUS_CHAIN: u32 = 1 << 4;
    /// First descriptor of the transfer
    pub const STATUS_FIRST: u32 = 1 << 3;
    /// Last descriptor of the transfer
    pub const STATUS_LAST: u32 = 1 << 2;
    /// Suppress the completion interrupt for this descriptor
    pub const STATUS_NOIRQ: u32 = 1 << 1;

    /// Buffer addresses are word-aligned; the low two bits are ignored
    pub const ADDR_MASK: u32 = 0xFFFF_FFFC;

    /// A `size` field of 0 denotes this many bytes (64 KiB)
    pub const SIZE_ZERO_BYTES: u32 = 0x1_0000;
}

/// Register reset values
pub mod reset {
    pub const GCTL: u32 = 0x0000_0300;
    pub const TMOR: u32 = 0xFFFF_FF40;
    pub const BKSR: u32 = 0x0000_0200;
    pub const BYCR: u32 = 0x0000_0200;
    pub const STAR: u32 = 0x0000_0100;
    pub const FWLR: u32 = 0x000F_0000;
    pub const A12A: u32 = 0x0000_FFFF;
    pub const NTSR: u32 = 0x0000_0001;
    pub const HWRST: u32 = 0x0000_0001;
}
