//! SD/MMC host controller MMIO register handling.
//!
//! This module implements the Allwinner H3 SD host controller: register
//! decode, command dispatch, the PIO FIFO path, the internal DMA
//! descriptor engine and interrupt aggregation. The controller is mapped
//! at 0x01C0F000-0x01C10000 and drives one card slot over the abstract
//! SD bus.
//!
//! # References
//! - Allwinner H3 Datasheet v1.2, §5.3 "SD/MMC Host Controller"
//! - <https://linux-sunxi.org/SD/MMC>

use std::collections::HashSet;
use tracing::{debug, instrument, trace, warn};
use unicorn_engine::Unicorn;

use crate::irq::IrqLine;
use crate::mem::GuestMemory;
use crate::sd::SdBus;
use crate::snapshot::{Decoder, DeviceSnapshot, Encoder, SnapshotError};
use h3emu_hw::mmio::sdhc::{cmd, desc, gctl, idst, irq, registers as reg, reset, status};

/// Bounce-buffer size for moving data between guest memory and the SD
/// bus. Keeps per-transfer memory fixed while amortizing descriptor
/// bookkeeping over reasonably large chunks.
const DMA_CHUNK: usize = 1024;

/// Safety cap on descriptors walked per transfer. Real hardware follows
/// a malformed chain that never sets LAST forever; the model gives up
/// after this many descriptors even if the byte count has not been
/// consumed.
const DMA_MAX_DESCRIPTORS: usize = 4096;

/// Command index injected by the auto-stop engine (STOP_TRANSMISSION).
const STOP_CMD_ID: u32 = 12;

/// One entry of the DMA descriptor chain as it sits in guest memory:
/// four little-endian u32 fields, 16 bytes total.
#[derive(Clone, Copy)]
struct TransferDescriptor {
    status: u32,
    size: u32,
    addr: u32,
    next: u32,
}

impl TransferDescriptor {
    fn fetch(mem: &dyn GuestMemory, desc_addr: u32) -> Self {
        let mut bytes = [0u8; desc::BYTES as usize];
        mem.read(desc_addr, &mut bytes);
        Self {
            status: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            size: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            addr: u32::from_le_bytes(bytes[8..12].try_into().unwrap()),
            next: u32::from_le_bytes(bytes[12..16].try_into().unwrap()),
        }
    }

    fn flush(&self, mem: &mut dyn GuestMemory, desc_addr: u32) {
        let mut bytes = [0u8; desc::BYTES as usize];
        bytes[0..4].copy_from_slice(&self.status.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.size.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.addr.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.next.to_le_bytes());
        mem.write(desc_addr, &bytes);
    }
}

/// SD host controller state: one instance per card slot.
pub struct SdHostState {
    // ========================================================================
    // REGISTER STATE - Direct mappings to hardware registers
    // ========================================================================

    // Control and configuration registers
    pub global_ctl: u32, // 0x000: GCTL
    pub clock_ctl: u32,  // 0x004: CKCR
    pub timeout: u32,    // 0x008: TMOR
    pub bus_width: u32,  // 0x00C: BWDR
    pub block_size: u32, // 0x010: BKSR
    pub byte_count: u32, // 0x014: BYCR

    // Command registers
    pub command: u32,     // 0x018: CMDR
    pub command_arg: u32, // 0x01C: CAGR

    // Response registers (4 registers x 4 bytes each)
    pub response: [u32; 4], // 0x020-0x02C: RESP0-3

    // Interrupt and status registers
    pub irq_mask: u32,   // 0x030: IMKR
    pub irq_status: u32, // 0x038: RISR (0x034 MISR reads through the mask)
    pub status: u32,     // 0x03C: STAR

    // FIFO configuration registers
    pub fifo_wlevel: u32,   // 0x040: FWLR
    pub fifo_func_sel: u32, // 0x044: FUNS
    pub debug_enable: u32,  // 0x050: DBGC
    pub auto12_arg: u32,    // 0x058: A12A

    // Timing and reset registers
    pub newtiming_set: u32,   // 0x05C: NTSR
    pub newtiming_debug: u32, // 0x060: SDBG
    pub hardware_rst: u32,    // 0x078: HWRST

    // Internal DMA controller registers
    pub dmac: u32,        // 0x080: DMAC
    pub desc_base: u32,   // 0x084: DLBA
    pub dmac_status: u32, // 0x088: IDST
    pub dmac_irq: u32,    // 0x08C: IDIE

    // Threshold and detection registers
    pub card_threshold: u32,   // 0x100: THLDC
    pub startbit_detect: u32,  // 0x10C: DSBD

    // CRC storage registers (read-only from the guest)
    pub response_crc: u32,  // 0x110: RES_CRC
    pub data_crc: [u32; 8], // 0x114-0x130: DATA7_CRC-DATA0_CRC
    pub status_crc: u32,    // 0x134: CRC_STA

    // ========================================================================
    // INTERNAL STATE - Emulation bookkeeping (not directly mapped to registers)
    // ========================================================================
    /// Bytes left in the current data transfer
    pub transfer_cnt: u32,

    /// The card slot this controller drives
    bus: Box<dyn SdBus>,

    /// Aggregated interrupt output
    irq_line: Box<dyn IrqLine>,

    /// Offsets already reported for guest misuse, so a looping driver
    /// cannot flood the log
    reported_offsets: HashSet<u32>,
}

impl SdHostState {
    pub fn new(bus: Box<dyn SdBus>, irq_line: Box<dyn IrqLine>) -> Self {
        let mut state = Self {
            global_ctl: 0,
            clock_ctl: 0,
            timeout: 0,
            bus_width: 0,
            block_size: 0,
            byte_count: 0,
            command: 0,
            command_arg: 0,
            response: [0; 4],
            irq_mask: 0,
            irq_status: 0,
            status: 0,
            fifo_wlevel: 0,
            fifo_func_sel: 0,
            debug_enable: 0,
            auto12_arg: 0,
            newtiming_set: 0,
            newtiming_debug: 0,
            hardware_rst: 0,
            dmac: 0,
            desc_base: 0,
            dmac_status: 0,
            dmac_irq: 0,
            card_threshold: 0,
            startbit_detect: 0,
            response_crc: 0,
            data_crc: [0; 8],
            status_crc: 0,
            transfer_cnt: 0,
            bus,
            irq_line,
            reported_offsets: HashSet::new(),
        };
        state.reset();
        state
    }

    /// Restore every register to its power-on value.
    pub fn reset(&mut self) {
        self.global_ctl = reset::GCTL;
        self.clock_ctl = 0;
        self.timeout = reset::TMOR;
        self.bus_width = 0;
        self.block_size = reset::BKSR;
        self.byte_count = reset::BYCR;
        self.command = 0;
        self.command_arg = 0;
        self.response = [0; 4];
        self.irq_mask = 0;
        self.irq_status = 0;
        self.status = reset::STAR;
        self.fifo_wlevel = reset::FWLR;
        self.fifo_func_sel = 0;
        self.debug_enable = 0;
        self.auto12_arg = reset::A12A;
        self.newtiming_set = reset::NTSR;
        self.newtiming_debug = 0;
        self.hardware_rst = reset::HWRST;
        self.dmac = 0;
        self.desc_base = 0;
        self.dmac_status = 0;
        self.dmac_irq = 0;
        self.card_threshold = 0;
        self.startbit_detect = 0;
        self.response_crc = 0;
        self.data_crc = [0; 8];
        self.status_crc = 0;
        self.transfer_cnt = 0;
        self.update_irq();
    }

    /// Handle a read from a controller register.
    pub fn read(&mut self, offset: u32) -> u32 {
        let value = match offset {
            reg::GCTL => self.global_ctl,
            reg::CKCR => self.clock_ctl,
            reg::TMOR => self.timeout,
            reg::BWDR => self.bus_width,
            reg::BKSR => self.block_size,
            reg::BYCR => self.byte_count,
            reg::CMDR => self.command,
            reg::CAGR => self.command_arg,
            reg::RESP0 => self.response[0],
            reg::RESP1 => self.response[1],
            reg::RESP2 => self.response[2],
            reg::RESP3 => self.response[3],
            reg::IMKR => self.irq_mask,
            reg::MISR => self.irq_status & self.irq_mask,
            reg::RISR => self.irq_status,
            reg::STAR => self.status,
            reg::FWLR => self.fifo_wlevel,
            reg::FUNS => self.fifo_func_sel,
            reg::DBGC => self.debug_enable,
            reg::A12A => self.auto12_arg,
            reg::NTSR => self.newtiming_set,
            reg::SDBG => self.newtiming_debug,
            reg::HWRST => self.hardware_rst,
            reg::DMAC => self.dmac,
            reg::DLBA => self.desc_base,
            reg::IDST => self.dmac_status,
            reg::IDIE => self.dmac_irq,
            reg::THLDC => self.card_threshold,
            reg::DSBD => self.startbit_detect,
            reg::RES_CRC => self.response_crc,
            reg::DATA7_CRC => self.data_crc[7],
            reg::DATA6_CRC => self.data_crc[6],
            reg::DATA5_CRC => self.data_crc[5],
            reg::DATA4_CRC => self.data_crc[4],
            reg::DATA3_CRC => self.data_crc[3],
            reg::DATA2_CRC => self.data_crc[2],
            reg::DATA1_CRC => self.data_crc[1],
            reg::DATA0_CRC => self.data_crc[0],
            reg::CRC_STA => self.status_crc,
            reg::FIFO => self.fifo_read(),
            _ => {
                self.guest_error(offset, "read of unimplemented register");
                0
            }
        };

        trace!("SDHC register read: offset={:#X}, value={:#X}", offset, value);
        value
    }

    /// Handle a write to a controller register.
    pub fn write(&mut self, mem: &mut dyn GuestMemory, offset: u32, value: u32) {
        trace!("SDHC register write: offset={:#X}, value={:#X}", offset, value);

        match offset {
            reg::GCTL => {
                // The reset bits are self-clearing and never read back.
                self.global_ctl = value & !gctl::RST_MASK;
                self.update_irq();
            }
            reg::CKCR => self.clock_ctl = value,
            reg::TMOR => self.timeout = value,
            reg::BWDR => self.bus_width = value,
            reg::BKSR => self.block_size = value,
            reg::BYCR => {
                self.byte_count = value;
                self.transfer_cnt = value;
            }
            reg::CMDR => {
                self.command = value;
                if value & cmd::LOAD != 0 {
                    self.send_command();
                    self.dma(mem);
                    self.auto_stop();
                }
                self.update_irq();
            }
            reg::CAGR => self.command_arg = value,
            reg::RESP0 => self.response[0] = value,
            reg::RESP1 => self.response[1] = value,
            reg::RESP2 => self.response[2] = value,
            reg::RESP3 => self.response[3] = value,
            reg::IMKR => {
                self.irq_mask = value;
                self.update_irq();
            }
            reg::MISR | reg::RISR => {
                // Write-one-to-clear.
                self.irq_status &= !value;
                self.update_irq();
            }
            reg::STAR => {
                // Write-one-to-clear, including CARD_PRESENT.
                self.status &= !value;
                self.update_irq();
            }
            reg::FWLR => self.fifo_wlevel = value,
            reg::FUNS => self.fifo_func_sel = value,
            reg::DBGC => self.debug_enable = value,
            reg::A12A => self.auto12_arg = value,
            reg::NTSR => self.newtiming_set = value,
            reg::SDBG => self.newtiming_debug = value,
            reg::HWRST => self.hardware_rst = value,
            reg::DMAC => {
                self.dmac = value;
                self.update_irq();
            }
            reg::DLBA => self.desc_base = value,
            reg::IDST => {
                // Write-one-to-clear for the low ten bits only.
                self.dmac_status &= !(value & idst::WR_MASK);
                self.update_irq();
            }
            reg::IDIE => {
                self.dmac_irq = value;
                self.update_irq();
            }
            reg::THLDC => self.card_threshold = value,
            reg::DSBD => self.startbit_detect = value,
            reg::RES_CRC
            | reg::DATA7_CRC
            | reg::DATA6_CRC
            | reg::DATA5_CRC
            | reg::DATA4_CRC
            | reg::DATA3_CRC
            | reg::DATA2_CRC
            | reg::DATA1_CRC
            | reg::DATA0_CRC
            | reg::CRC_STA => {
                // CRC registers are read-only storage; writes land nowhere.
                trace!("SDHC write to read-only CRC register {:#X} ignored", offset);
            }
            reg::FIFO => self.fifo_write(value),
            _ => self.guest_error(offset, "write to unimplemented register"),
        }
    }

    /// Card slot change notification from the SD bus.
    pub fn set_inserted(&mut self, inserted: bool) {
        debug!("SDHC card {}", if inserted { "insert" } else { "remove" });

        if inserted {
            self.irq_status |= irq::CARD_INSERT;
            self.irq_status &= !irq::CARD_REMOVE;
            self.status |= status::CARD_PRESENT;
        } else {
            self.irq_status &= !irq::CARD_INSERT;
            self.irq_status |= irq::CARD_REMOVE;
            self.status &= !status::CARD_PRESENT;
        }
        self.update_irq();
    }

    // ========================================================================
    // Interrupt aggregation and transfer accounting
    // ========================================================================

    /// Recompute the outgoing interrupt level from status, mask and the
    /// global enable.
    fn update_irq(&mut self) {
        let pending = if self.global_ctl & gctl::INT_ENB != 0 {
            self.irq_status & self.irq_mask
        } else {
            0
        };
        self.irq_line.set_level(pending != 0);
    }

    /// Account `bytes` against the running transfer; completing it raises
    /// the data interrupts.
    fn update_transfer_cnt(&mut self, bytes: u32) {
        self.transfer_cnt = self.transfer_cnt.saturating_sub(bytes);
        if self.transfer_cnt == 0 {
            self.irq_status |= irq::DATA_COMPLETE | irq::AUTOCMD_DONE;
        }
    }

    // ========================================================================
    // Command engine
    // ========================================================================

    /// Dispatch the command currently latched in CMDR/CAGR to the card.
    fn send_command(&mut self) {
        // The start bit self-clears the moment the command is accepted.
        self.command &= !cmd::LOAD;

        // A clock-change command only touches the clock registers; the
        // card never sees it.
        if self.command & cmd::CLKCHANGE == 0 {
            let index = (self.command & cmd::CMDID_MASK) as u8;
            debug!("SDHC command: CMD{} arg={:#X}", index, self.command_arg);

            let resp = match self.bus.submit(index, self.command_arg) {
                Ok(resp) => resp,
                Err(e) => {
                    debug!("SDHC command failed on the bus: {}", e);
                    self.irq_status |= irq::NO_RESPONSE;
                    return;
                }
            };

            if self.command & cmd::RESPONSE != 0 {
                let long = self.command & cmd::RESPONSE_LONG != 0;
                match resp.len() {
                    4 if !long => {
                        self.response[0] = u32::from_be_bytes(resp[0..4].try_into().unwrap());
                        self.response[1] = 0;
                        self.response[2] = 0;
                        self.response[3] = 0;
                    }
                    16 if long => {
                        self.response[0] = u32::from_be_bytes(resp[12..16].try_into().unwrap());
                        self.response[1] = u32::from_be_bytes(resp[8..12].try_into().unwrap());
                        self.response[2] = u32::from_be_bytes(resp[4..8].try_into().unwrap());
                        self.response[3] = u32::from_be_bytes(resp[0..4].try_into().unwrap());
                    }
                    len => {
                        debug!("SDHC response length {} does not match CMDR", len);
                        self.irq_status |= irq::NO_RESPONSE;
                        return;
                    }
                }
            }
        }

        self.irq_status |= irq::CMD_COMPLETE;
    }

    /// Inject a STOP_TRANSMISSION (CMD12) once a multi-block transfer has
    /// drained, when the guest asked for it.
    fn auto_stop(&mut self) {
        if self.command & cmd::AUTOSTOP != 0 && self.transfer_cnt == 0 {
            let saved_command = self.command;
            let saved_arg = self.command_arg;

            self.command = (self.command & !cmd::CMDID_MASK) | STOP_CMD_ID;
            self.command_arg = 0;
            self.send_command();

            self.command = saved_command;
            self.command_arg = saved_arg;
        }
    }

    // ========================================================================
    // Internal DMA descriptor engine
    // ========================================================================

    /// Walk the descriptor chain rooted at DLBA, moving bytes between
    /// guest memory and the SD bus until the byte count is consumed or
    /// the chain ends.
    fn dma(&mut self, mem: &mut dyn GuestMemory) {
        if self.byte_count == 0
            || self.block_size == 0
            || self.global_ctl & gctl::DMA_ENB == 0
        {
            return;
        }

        let is_write = self.command & cmd::WRITE != 0;

        // Reads require the card to have data lined up.
        if !is_write && !self.bus.data_ready() {
            trace!("SDHC DMA read with no data ready on the SD bus");
            return;
        }

        let mut desc_addr = self.desc_base;
        let mut walked = 0;

        while self.byte_count > 0 {
            if walked == DMA_MAX_DESCRIPTORS {
                warn!(
                    "SDHC descriptor chain exceeds {} entries without LAST, stopping",
                    DMA_MAX_DESCRIPTORS
                );
                break;
            }
            walked += 1;

            let descriptor = self.process_descriptor(mem, desc_addr, is_write);
            if descriptor.status & desc::STATUS_LAST != 0 {
                break;
            }
            desc_addr = descriptor.next;
        }

        self.irq_status |= irq::DATA_COMPLETE | irq::AUTOCMD_DONE;
        if is_write {
            self.dmac_status |= idst::TRANSMIT_IRQ;
        } else {
            self.dmac_status |= idst::RECEIVE_IRQ | idst::SUM_RECEIVE_IRQ;
        }
    }

    /// Move one descriptor's worth of data, then hand the descriptor back
    /// to the guest with HOLD cleared.
    fn process_descriptor(
        &mut self,
        mem: &mut dyn GuestMemory,
        desc_addr: u32,
        is_write: bool,
    ) -> TransferDescriptor {
        let mut descriptor = TransferDescriptor::fetch(&*mem, desc_addr);

        // A zero size field denotes the maximum segment, not an empty one.
        let segment = if descriptor.size == 0 {
            desc::SIZE_ZERO_BYTES
        } else {
            descriptor.size
        };
        let segment = segment.min(self.byte_count);

        debug!(
            "SDHC DMA segment: desc={:#X}, buf={:#X}, bytes={}, dir={}",
            desc_addr,
            descriptor.addr & desc::ADDR_MASK,
            segment,
            if is_write { "write" } else { "read" }
        );

        let mut chunk = [0u8; DMA_CHUNK];
        let mut bytes_done = 0u32;
        while bytes_done < segment {
            let len = ((segment - bytes_done) as usize).min(DMA_CHUNK);
            let buf_addr = (descriptor.addr & desc::ADDR_MASK).wrapping_add(bytes_done);
            let buf = &mut chunk[..len];

            if is_write {
                mem.read(buf_addr, buf);
                for &byte in buf.iter() {
                    self.bus.write_byte(byte);
                }
            } else {
                for byte in buf.iter_mut() {
                    *byte = self.bus.read_byte();
                }
                mem.write(buf_addr, buf);
            }
            bytes_done += len as u32;
        }

        self.update_transfer_cnt(bytes_done);
        self.byte_count = self.byte_count.saturating_sub(bytes_done);

        // Clearing HOLD is the completion marker the guest driver polls.
        descriptor.status &= !desc::STATUS_HOLD;
        descriptor.flush(mem, desc_addr);

        descriptor
    }

    // ========================================================================
    // PIO FIFO path
    // ========================================================================

    /// Pull one word from the card through the FIFO register.
    fn fifo_read(&mut self) -> u32 {
        if !self.bus.data_ready() {
            self.guest_error(reg::FIFO, "FIFO read with no data ready on the SD bus");
            return 0;
        }

        let mut bytes = [0u8; 4];
        for byte in &mut bytes {
            *byte = self.bus.read_byte();
        }
        let value = u32::from_le_bytes(bytes);

        self.update_transfer_cnt(4);
        self.auto_stop();
        self.update_irq();
        value
    }

    /// Push one word to the card through the FIFO register.
    fn fifo_write(&mut self, value: u32) {
        for byte in value.to_le_bytes() {
            self.bus.write_byte(byte);
        }

        self.update_transfer_cnt(4);
        self.auto_stop();
        self.update_irq();
    }

    /// Report guest misuse once per offset.
    fn guest_error(&mut self, offset: u32, what: &str) {
        if self.reported_offsets.insert(offset) {
            warn!("SDHC guest error: {} (offset={:#X})", what, offset);
        }
    }
}

impl DeviceSnapshot for SdHostState {
    const DEVICE_ID: u32 = u32::from_be_bytes(*b"SDHC");
    const DEVICE_VERSION: u32 = 1;

    fn save_state(&self) -> Vec<u8> {
        let mut e = Encoder::new(Self::DEVICE_ID, Self::DEVICE_VERSION);
        e.u32(self.global_ctl);
        e.u32(self.clock_ctl);
        e.u32(self.timeout);
        e.u32(self.bus_width);
        e.u32(self.block_size);
        e.u32(self.byte_count);
        e.u32(self.transfer_cnt);
        e.u32(self.command);
        e.u32(self.command_arg);
        for word in self.response {
            e.u32(word);
        }
        e.u32(self.irq_mask);
        e.u32(self.irq_status);
        e.u32(self.status);
        e.u32(self.fifo_wlevel);
        e.u32(self.fifo_func_sel);
        e.u32(self.debug_enable);
        e.u32(self.auto12_arg);
        e.u32(self.newtiming_set);
        e.u32(self.newtiming_debug);
        e.u32(self.hardware_rst);
        e.u32(self.dmac);
        e.u32(self.desc_base);
        e.u32(self.dmac_status);
        e.u32(self.dmac_irq);
        e.u32(self.card_threshold);
        e.u32(self.startbit_detect);
        e.u32(self.response_crc);
        for word in self.data_crc {
            e.u32(word);
        }
        e.u32(self.status_crc);
        e.finish()
    }

    fn load_state(&mut self, data: &[u8]) -> Result<(), SnapshotError> {
        let mut d = Decoder::new(Self::DEVICE_ID, Self::DEVICE_VERSION, data)?;
        self.global_ctl = d.u32()?;
        self.clock_ctl = d.u32()?;
        self.timeout = d.u32()?;
        self.bus_width = d.u32()?;
        self.block_size = d.u32()?;
        self.byte_count = d.u32()?;
        self.transfer_cnt = d.u32()?;
        self.command = d.u32()?;
        self.command_arg = d.u32()?;
        for word in &mut self.response {
            *word = d.u32()?;
        }
        self.irq_mask = d.u32()?;
        self.irq_status = d.u32()?;
        self.status = d.u32()?;
        self.fifo_wlevel = d.u32()?;
        self.fifo_func_sel = d.u32()?;
        self.debug_enable = d.u32()?;
        self.auto12_arg = d.u32()?;
        self.newtiming_set = d.u32()?;
        self.newtiming_debug = d.u32()?;
        self.hardware_rst = d.u32()?;
        self.dmac = d.u32()?;
        self.desc_base = d.u32()?;
        self.dmac_status = d.u32()?;
        self.dmac_irq = d.u32()?;
        self.card_threshold = d.u32()?;
        self.startbit_detect = d.u32()?;
        self.response_crc = d.u32()?;
        for word in &mut self.data_crc {
            *word = d.u32()?;
        }
        self.status_crc = d.u32()?;
        d.finish()?;

        // The line level is derived state; bring it in sync with what we
        // just restored.
        self.update_irq();
        Ok(())
    }
}

// ============================================================================
// Unicorn MMIO Adapters
// ============================================================================

/// MMIO read handler function (for use with Unicorn)
///
/// This is a thin adapter that converts Unicorn's u64 addresses to the
/// u32 offsets expected by the SDHC handler.
#[instrument(level = "trace", skip(uc))]
pub fn read_handler(uc: &mut Unicorn<'_, super::SocState>, addr: u64, _size: usize) -> u64 {
    uc.get_data_mut().sdhc.read(addr as u32) as u64
}

/// MMIO write handler function (for use with Unicorn)
///
/// Writes can kick off DMA, so the handler splits the shared state into
/// the controller and the DRAM view it walks.
#[instrument(level = "trace", skip(uc))]
pub fn write_handler(uc: &mut Unicorn<'_, super::SocState>, addr: u64, _size: usize, value: u64) {
    let super::SocState { sdhc, dram, .. } = uc.get_data_mut();
    sdhc.write(dram, addr as u32, value as u32);
}
