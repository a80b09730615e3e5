//! Device state snapshots.
//!
//! Every snapshot is a little-endian byte stream with a fixed header
//! (device id, format version) followed by the device's fields in a
//! fixed order. The encoding carries no field tags: compatibility is
//! governed entirely by the version number, and a mismatch is rejected
//! before any field is decoded.

use thiserror::Error;

/// Errors raised while decoding a snapshot.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// The snapshot ended before all fields were decoded.
    #[error("unexpected end of snapshot data")]
    UnexpectedEof,
    /// The snapshot belongs to a different device.
    #[error("snapshot is for device {found:#010X}, expected {expected:#010X}")]
    DeviceMismatch { expected: u32, found: u32 },
    /// The snapshot was produced by an incompatible format version.
    #[error("snapshot version {found} not supported, expected {expected}")]
    VersionMismatch { expected: u32, found: u32 },
    /// Extra bytes followed the last field.
    #[error("trailing bytes after snapshot payload")]
    TrailingBytes,
}

/// Devices that can save and restore their guest-visible state.
///
/// `load_state` replays a snapshot into an already-constructed device
/// with no re-initialization; outputs derived from the restored state
/// (the IRQ line) are recomputed by the device afterwards.
pub trait DeviceSnapshot {
    /// Identifies the device type a snapshot belongs to.
    const DEVICE_ID: u32;
    /// Bumped whenever the field list or ordering changes.
    const DEVICE_VERSION: u32;

    fn save_state(&self) -> Vec<u8>;
    fn load_state(&mut self, data: &[u8]) -> Result<(), SnapshotError>;
}

/// Serializer for one device snapshot.
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    /// Start a snapshot for the given device id and version.
    pub fn new(device_id: u32, version: u32) -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(&device_id.to_le_bytes());
        buf.extend_from_slice(&version.to_le_bytes());
        Self { buf }
    }

    /// Append one field.
    pub fn u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Deserializer for one device snapshot.
pub struct Decoder<'a> {
    data: &'a [u8],
}

impl<'a> Decoder<'a> {
    /// Validate the header and position the decoder at the first field.
    pub fn new(device_id: u32, version: u32, data: &'a [u8]) -> Result<Self, SnapshotError> {
        let mut decoder = Self { data };
        let found_id = decoder.u32()?;
        if found_id != device_id {
            return Err(SnapshotError::DeviceMismatch {
                expected: device_id,
                found: found_id,
            });
        }
        let found_version = decoder.u32()?;
        if found_version != version {
            return Err(SnapshotError::VersionMismatch {
                expected: version,
                found: found_version,
            });
        }
        Ok(decoder)
    }

    /// Decode one field.
    pub fn u32(&mut self) -> Result<u32, SnapshotError> {
        let (bytes, rest) = self
            .data
            .split_at_checked(4)
            .ok_or(SnapshotError::UnexpectedEof)?;
        self.data = rest;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    /// Assert the payload is fully consumed.
    pub fn finish(self) -> Result<(), SnapshotError> {
        if self.data.is_empty() {
            Ok(())
        } else {
            Err(SnapshotError::TrailingBytes)
        }
    }
}
