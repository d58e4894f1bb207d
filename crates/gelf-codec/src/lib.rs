//! GELF wire decoding.
//!
//! Handles the three concerns that sit between "bytes off a socket" and a
//! `gelf_common::Message`: zlib/gzip auto-detection, UDP chunk reassembly,
//! and JSON decoding (with the `_full_message` migration applied exactly
//! once, immediately after decode).

pub mod chunking;
pub mod compression;

use gelf_common::Message;
use thiserror::Error;

pub use chunking::ChunkReassembler;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid GELF JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("decompression failed: {0}")]
    Decompress(String),

    #[error("datagram shorter than chunk header")]
    Truncated,

    #[error("chunk sequence count mismatch for message id")]
    ChunkMismatch,

    #[error("incomplete chunked message")]
    Incomplete,
}

/// Decode a single, already-reassembled GELF payload: auto-detect
/// compression, then parse JSON, then apply `Message::fix()`.
pub fn decode(payload: &[u8]) -> Result<Message, CodecError> {
    let plain = compression::decompress(payload)?;
    let mut message: Message = serde_json::from_slice(&plain)?;
    message.fix();
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn decodes_plain_json() {
        let payload = br#"{"host":"db-01","short_message":"oom","timestamp":1700000000,"level":3}"#;
        let msg = decode(payload).unwrap();
        assert_eq!(msg.host, "db-01");
        assert_eq!(msg.short, "oom");
        assert_eq!(msg.level, 3);
    }

    #[test]
    fn decodes_real_gelf_extensions_at_top_level() {
        let payload = br#"{"host":"db-01","short_message":"oom","timestamp":1700000000,"level":3,"_container_id":"abc123"}"#;
        let msg = decode(payload).unwrap();
        assert_eq!(msg.extra.get("_container_id").unwrap(), "abc123");
    }

    #[test]
    fn decodes_compressed_json_and_applies_fix() {
        let json = br#"{"host":"db-01","short_message":"oom","timestamp":1700000000,"level":3,"_full_message":"stack trace here"}"#;
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(json).unwrap();
        let compressed = encoder.finish().unwrap();

        let msg = decode(&compressed).unwrap();
        assert_eq!(msg.full, "stack trace here");
        assert!(!msg.extra.contains_key("_full_message"));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = decode(b"not json").unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
    }
}
