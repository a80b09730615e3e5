//! Abstract SD bus and a file-backed card.
//!
//! The host controller drives one card slot through the narrow [`SdBus`]
//! contract: submit a command, stream data bytes in either direction.
//! [`FileCard`] implements the identification and block I/O command
//! subset against a raw card image so the machine can boot firmware that
//! talks to real data; anything fancier lives behind the trait.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, trace, warn};

use h3emu_hw::specs::sd::BLOCK_SIZE;

/// Errors the SD bus can report for a submitted command.
#[derive(Debug, Error)]
pub enum SdBusError {
    /// No card is attached to the bus.
    #[error("no card on the bus")]
    NoCard,
    /// The card does not implement the command.
    #[error("CMD{0} rejected by the card")]
    Rejected(u8),
}

/// The SD bus as seen from the host controller.
///
/// `submit` returns the raw response as it appears on the wire: 0 bytes
/// for commands without a response, 4 bytes for 48-bit responses, 16
/// bytes for 136-bit responses, most significant byte first.
pub trait SdBus {
    /// Issue a command with its 32-bit argument.
    fn submit(&mut self, cmd: u8, arg: u32) -> Result<Vec<u8>, SdBusError>;

    /// Whether the card has read data waiting for the host.
    fn data_ready(&self) -> bool;

    /// Pull one data byte from the card.
    fn read_byte(&mut self) -> u8;

    /// Push one data byte to the card.
    fn write_byte(&mut self, value: u8);
}

/// Pack a 32-bit response word into wire order.
fn response_32(word: u32) -> Vec<u8> {
    word.to_be_bytes().to_vec()
}

/// Pack four 32-bit response words into wire order, most significant
/// word first.
fn response_128(words: [u32; 4]) -> Vec<u8> {
    let mut resp = Vec::with_capacity(16);
    for word in words {
        resp.extend_from_slice(&word.to_be_bytes());
    }
    resp
}

/// A card backed by a raw image file.
///
/// Block addresses in command arguments are multiplied by the standard
/// 512-byte block size. Reads stream from the image on demand; writes are
/// flushed block by block as the bytes arrive.
pub struct FileCard {
    file: Option<File>,

    /// Next command should be interpreted as ACMD (set by CMD55)
    app_command_next: bool,

    /// Bytes already read from the image, waiting for the host
    read_fifo: VecDeque<u8>,

    /// Image offset of the next block to stream on a read, if a read
    /// transfer is open
    read_pos: Option<u64>,

    /// Partial block accumulated from the host on a write
    write_buf: Vec<u8>,

    /// Image offset of the next block to flush on a write, if a write
    /// transfer is open
    write_pos: Option<u64>,
}

impl FileCard {
    /// Open a card over the image at `path`, or an empty slot when no
    /// path is given or the image cannot be opened.
    pub fn new(image: Option<PathBuf>) -> Self {
        let file = image.and_then(|path| {
            match std::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .open(&path)
            {
                Ok(file) => {
                    debug!("Opened SD card image: {:?}", path);
                    Some(file)
                }
                Err(e) => {
                    warn!("Failed to open SD card image {:?}: {}", path, e);
                    None
                }
            }
        });

        Self {
            file,
            app_command_next: false,
            read_fifo: VecDeque::new(),
            read_pos: None,
            write_pos: None,
            write_buf: Vec::with_capacity(BLOCK_SIZE),
        }
    }

    /// Whether an image is attached.
    pub fn present(&self) -> bool {
        self.file.is_some()
    }

    /// Stream the next block of an open read transfer into the FIFO.
    fn refill_read_fifo(&mut self) {
        let Some(offset) = self.read_pos else {
            return;
        };

        let mut block = [0u8; BLOCK_SIZE];
        if let Some(ref mut file) = self.file {
            if let Err(e) = file.seek(SeekFrom::Start(offset)) {
                warn!("Failed to seek card image to {:#X}: {}", offset, e);
            } else if let Err(e) = file.read_exact(&mut block) {
                warn!("Failed to read card image at {:#X}: {}", offset, e);
                block.fill(0);
            }
        }

        self.read_fifo.extend(block.iter());
        self.read_pos = Some(offset + BLOCK_SIZE as u64);
    }

    /// Flush one accumulated block of an open write transfer.
    fn flush_write_block(&mut self) {
        let Some(offset) = self.write_pos else {
            self.write_buf.clear();
            return;
        };

        if let Some(ref mut file) = self.file {
            if let Err(e) = file.seek(SeekFrom::Start(offset)) {
                warn!("Failed to seek card image to {:#X}: {}", offset, e);
            } else if let Err(e) = file.write_all(&self.write_buf) {
                warn!("Failed to write card image at {:#X}: {}", offset, e);
            } else {
                trace!("Wrote {} bytes at image offset {:#X}", self.write_buf.len(), offset);
                let _ = file.flush();
            }
        }

        self.write_buf.clear();
        self.write_pos = Some(offset + BLOCK_SIZE as u64);
    }

    /// Close any open data transfer.
    fn stop_transmission(&mut self) {
        self.read_fifo.clear();
        self.read_pos = None;
        self.write_pos = None;
        self.write_buf.clear();
    }

    fn execute_cmd(&mut self, cmd: u8, arg: u32) -> Result<Vec<u8>, SdBusError> {
        match cmd {
            // GO_IDLE_STATE
            0 => {
                self.stop_transmission();
                self.app_command_next = false;
                Ok(Vec::new())
            }
            // ALL_SEND_CID
            2 => Ok(response_128([0x1B53_4D45, 0x4D55_4C30, 0x1000_0001, 0x0001_2600])),
            // SEND_RELATIVE_ADDR: RCA in the upper half, status below
            3 => Ok(response_32(0x0001_0000 | (1 << 8))),
            // SELECT_CARD
            7 => Ok(response_32(1 << 8)),
            // SEND_IF_COND: voltage accepted, check pattern echoed
            8 => Ok(response_32(0x0000_0100 | (arg & 0xFF))),
            // SEND_CSD
            9 => Ok(response_128([0x400E_0032, 0x5B59_0000, 0x7637_7F80, 0x0A40_0001])),
            // SEND_CID
            10 => Ok(response_128([0x1B53_4D45, 0x4D55_4C30, 0x1000_0001, 0x0001_2600])),
            // STOP_TRANSMISSION
            12 => {
                self.stop_transmission();
                Ok(response_32(1 << 8))
            }
            // SEND_STATUS
            13 => Ok(response_32(1 << 8)),
            // SET_BLOCKLEN: the model only streams 512-byte blocks
            16 => {
                if arg != BLOCK_SIZE as u32 {
                    debug!("SET_BLOCKLEN {} ignored, card streams {}-byte blocks", arg, BLOCK_SIZE);
                }
                Ok(response_32(1 << 8))
            }
            // READ_SINGLE_BLOCK / READ_MULTIPLE_BLOCK
            17 | 18 => {
                self.read_fifo.clear();
                self.read_pos = Some(arg as u64 * BLOCK_SIZE as u64);
                self.refill_read_fifo();
                if cmd == 17 {
                    // Single block: everything is in the FIFO already.
                    self.read_pos = None;
                }
                Ok(response_32(1 << 8))
            }
            // WRITE_SINGLE_BLOCK / WRITE_MULTIPLE_BLOCK
            24 | 25 => {
                self.write_buf.clear();
                self.write_pos = Some(arg as u64 * BLOCK_SIZE as u64);
                Ok(response_32(1 << 8))
            }
            // APP_CMD
            55 => {
                self.app_command_next = true;
                Ok(response_32((1 << 8) | (1 << 5)))
            }
            _ => {
                debug!("Card rejects CMD{}", cmd);
                Err(SdBusError::Rejected(cmd))
            }
        }
    }

    fn execute_acmd(&mut self, cmd: u8, _arg: u32) -> Result<Vec<u8>, SdBusError> {
        match cmd {
            // SET_BUS_WIDTH
            6 => Ok(response_32(1 << 8)),
            // SD_SEND_OP_COND: powered up, high capacity
            41 => Ok(response_32(0xC0FF_8000)),
            _ => {
                debug!("Card rejects ACMD{}", cmd);
                Err(SdBusError::Rejected(cmd))
            }
        }
    }
}

impl SdBus for FileCard {
    fn submit(&mut self, cmd: u8, arg: u32) -> Result<Vec<u8>, SdBusError> {
        trace!("card command: CMD{} arg={:#X}", cmd, arg);

        if self.app_command_next && cmd != 55 {
            self.app_command_next = false;
            self.execute_acmd(cmd, arg)
        } else {
            self.execute_cmd(cmd, arg)
        }
    }

    fn data_ready(&self) -> bool {
        !self.read_fifo.is_empty() || self.read_pos.is_some()
    }

    fn read_byte(&mut self) -> u8 {
        if self.read_fifo.is_empty() {
            self.refill_read_fifo();
        }
        match self.read_fifo.pop_front() {
            Some(byte) => byte,
            None => {
                warn!("Card read with no open read transfer");
                0
            }
        }
    }

    fn write_byte(&mut self, value: u8) {
        self.write_buf.push(value);
        if self.write_buf.len() == BLOCK_SIZE {
            self.flush_write_block();
        }
    }
}
