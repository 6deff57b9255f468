//! # Formats
//!
//! Byte-level encodings used by the storage backends.

pub mod record;

pub use record::{RecordHeader, record_from_bytes, record_to_bytes};
