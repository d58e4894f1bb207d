//! Auto-detecting zlib/gzip decompression.
//!
//! Peek the first two bytes without consuming them, compare against the
//! zlib/gzip magic numbers, and fall through to treating the payload as
//! uncompressed when neither matches.

use crate::CodecError;
use std::io::Read;

const MAGIC_ZLIB: [u8; 2] = [0x78, 0x9c];
const MAGIC_GZIP: [u8; 2] = [0x1f, 0x8b];

/// Decompress `input`, auto-detecting zlib/gzip from the leading magic
/// bytes. Payloads shorter than 2 bytes, or with no recognized magic, are
/// returned unchanged.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>, CodecError> {
    if input.len() < 2 {
        return Ok(input.to_vec());
    }

    let head = [input[0], input[1]];
    if head == MAGIC_GZIP {
        let mut decoder = flate2::read::GzDecoder::new(input);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| CodecError::Decompress(e.to_string()))?;
        Ok(out)
    } else if head == MAGIC_ZLIB {
        let mut decoder = flate2::read::ZlibDecoder::new(input);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| CodecError::Decompress(e.to_string()))?;
        Ok(out)
    } else {
        Ok(input.to_vec())
    }
}
