//! # Record Format
//!
//! Binary encoding for persisted reference records.
//!
//! Format: Header (5 bytes) + postcard-serialized `MineralReference`.
//! - 4 bytes: Magic ("MREF")
//! - 1 byte: Version
//!
//! The header is validated before the payload is touched, so a row written
//! by an incompatible build fails with `Serialization` instead of decoding
//! into garbage.

use crate::{MineralError, MineralReference};

/// Magic bytes at the start of every encoded record.
pub const MAGIC_BYTES: &[u8; 4] = b"MREF";

/// Current record format version.
pub const FORMAT_VERSION: u8 = 1;

/// Maximum accepted payload size for a single record (64 KiB).
pub const MAX_RECORD_SIZE: usize = 64 * 1024;

const HEADER_LEN: usize = 5;

// =============================================================================
// RECORD HEADER
// =============================================================================

/// The header that precedes every encoded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl RecordHeader {
    /// Create a header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *MAGIC_BYTES,
            version: FORMAT_VERSION,
        }
    }

    /// Validate magic and version.
    pub fn validate(&self) -> Result<(), MineralError> {
        if &self.magic != MAGIC_BYTES {
            return Err(MineralError::Serialization(
                "Invalid record magic bytes".to_string(),
            ));
        }
        if self.version != FORMAT_VERSION {
            return Err(MineralError::Serialization(format!(
                "Unsupported record version: {} (expected {})",
                self.version, FORMAT_VERSION
            )));
        }
        Ok(())
    }

    fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, MineralError> {
        if bytes.len() < HEADER_LEN {
            return Err(MineralError::Serialization(
                "Record header too short".to_string(),
            ));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for RecordHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ENCODE / DECODE
// =============================================================================

/// Encode a record to bytes (header + payload).
pub fn record_to_bytes(record: &MineralReference) -> Result<Vec<u8>, MineralError> {
    let payload =
        postcard::to_stdvec(record).map_err(|e| MineralError::Serialization(e.to_string()))?;
    if payload.len() > MAX_RECORD_SIZE {
        return Err(MineralError::Serialization(format!(
            "Record {} is {} bytes, exceeds maximum {}",
            record.id,
            payload.len(),
            MAX_RECORD_SIZE
        )));
    }

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&RecordHeader::new().to_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode a record from bytes produced by [`record_to_bytes`].
pub fn record_from_bytes(bytes: &[u8]) -> Result<MineralReference, MineralError> {
    let header = RecordHeader::from_bytes(bytes)?;
    header.validate()?;

    let payload = &bytes[HEADER_LEN..];
    if payload.len() > MAX_RECORD_SIZE {
        return Err(MineralError::Serialization(format!(
            "Record payload {} bytes exceeds maximum {}",
            payload.len(),
            MAX_RECORD_SIZE
        )));
    }
    postcard::from_bytes(payload).map_err(|e| MineralError::Serialization(e.to_string()))
}
