//! UDP chunk reassembly.
//!
//! A chunked GELF datagram starts with the two magic bytes `0x1e 0x0f`,
//! followed by an 8-byte message id, a 1-byte sequence index and a 1-byte
//! sequence count, then the chunk payload. Chunks for the same message id
//! can arrive in any order; a buffer is considered complete once every
//! index in `0..count` has been seen, and incomplete buffers are evicted
//! after 5 seconds of inactivity.

use crate::CodecError;
use dashmap::DashMap;
use std::time::{Duration, Instant};

const MAGIC: [u8; 2] = [0x1e, 0x0f];
const HEADER_LEN: usize = 12;

/// Idle eviction threshold for incomplete chunk buffers.
pub const CHUNK_IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Whether `datagram` begins with the chunked-message magic bytes.
pub fn is_chunked(datagram: &[u8]) -> bool {
    datagram.len() >= HEADER_LEN && datagram[0] == MAGIC[0] && datagram[1] == MAGIC[1]
}

struct ChunkBuffer {
    total: u8,
    received_count: u8,
    parts: Vec<Option<Vec<u8>>>,
    last_touch: Instant,
}

impl ChunkBuffer {
    fn new(total: u8) -> Self {
        Self {
            total,
            received_count: 0,
            parts: vec![None; total as usize],
            last_touch: Instant::now(),
        }
    }

    fn is_complete(&self) -> bool {
        self.received_count == self.total
    }

    fn assemble(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for part in &self.parts {
            if let Some(p) = part {
                out.extend_from_slice(p);
            }
        }
        out
    }
}

/// Reassembles chunked UDP GELF datagrams keyed by their 8-byte message id.
#[derive(Default)]
pub struct ChunkReassembler {
    buffers: DashMap<[u8; 8], ChunkBuffer>,
}

impl ChunkReassembler {
    pub fn new() -> Self {
        Self { buffers: DashMap::new() }
    }

    /// Feed one chunk. Returns the reassembled message bytes once every
    /// chunk for its message id has arrived, `None` while still waiting.
    pub fn ingest(&self, datagram: &[u8]) -> Result<Option<Vec<u8>>, CodecError> {
        if datagram.len() < HEADER_LEN {
            return Err(CodecError::Truncated);
        }

        let mut msg_id = [0u8; 8];
        msg_id.copy_from_slice(&datagram[2..10]);
        let seq_index = datagram[10];
        let seq_count = datagram[11];
        let payload = &datagram[HEADER_LEN..];

        if seq_count == 0 || seq_index >= seq_count {
            return Err(CodecError::ChunkMismatch);
        }

        let mut entry = self
            .buffers
            .entry(msg_id)
            .or_insert_with(|| ChunkBuffer::new(seq_count));

        if entry.total != seq_count {
            return Err(CodecError::ChunkMismatch);
        }

        entry.last_touch = Instant::now();
        let slot = &mut entry.parts[seq_index as usize];
        if slot.is_none() {
            *slot = Some(payload.to_vec());
            entry.received_count += 1;
        }

        if entry.is_complete() {
            let assembled = entry.assemble();
            drop(entry);
            self.buffers.remove(&msg_id);
            Ok(Some(assembled))
        } else {
            Ok(None)
        }
    }

    /// Evict buffers untouched for longer than `CHUNK_IDLE_TIMEOUT`.
    /// Returns the number of buffers evicted.
    pub fn sweep(&self) -> usize {
        let deadline = Instant::now();
        let stale: Vec<[u8; 8]> = self
            .buffers
            .iter()
            .filter(|entry| deadline.duration_since(entry.last_touch) >= CHUNK_IDLE_TIMEOUT)
            .map(|entry| *entry.key())
            .collect();
        let evicted = stale.len();
        for key in stale {
            self.buffers.remove(&key);
        }
        evicted
    }

    pub fn pending_count(&self) -> usize {
        self.buffers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(msg_id: [u8; 8], seq_index: u8, seq_count: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&msg_id);
        out.push(seq_index);
        out.push(seq_count);
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn reassembles_chunks_received_in_order() {
        let id = [1, 2, 3, 4, 5, 6, 7, 8];
        let r = ChunkReassembler::new();
        assert!(r.ingest(&chunk(id, 0, 2, b"hello ")).unwrap().is_none());
        let out = r.ingest(&chunk(id, 1, 2, b"world")).unwrap().unwrap();
        assert_eq!(out, b"hello world");
    }

    #[test]
    fn reassembles_chunks_received_in_reverse_order() {
        let id = [9, 9, 9, 9, 9, 9, 9, 9];
        let r = ChunkReassembler::new();
        assert!(r.ingest(&chunk(id, 2, 3, b"C")).unwrap().is_none());
        assert!(r.ingest(&chunk(id, 0, 3, b"A")).unwrap().is_none());
        let out = r.ingest(&chunk(id, 1, 3, b"B")).unwrap().unwrap();
        assert_eq!(out, b"ABC");
    }

    #[test]
    fn duplicate_chunk_does_not_double_count() {
        let id = [5; 8];
        let r = ChunkReassembler::new();
        assert!(r.ingest(&chunk(id, 0, 2, b"A")).unwrap().is_none());
        assert!(r.ingest(&chunk(id, 0, 2, b"A")).unwrap().is_none());
        let out = r.ingest(&chunk(id, 1, 2, b"B")).unwrap().unwrap();
        assert_eq!(out, b"AB");
    }

    #[test]
    fn is_chunked_detects_magic() {
        let id = [0; 8];
        assert!(is_chunked(&chunk(id, 0, 1, b"x")));
        assert!(!is_chunked(b"{\"short\":\"x\"}"));
    }

    #[test]
    fn sweep_evicts_only_after_idle_timeout() {
        let id = [7; 8];
        let r = ChunkReassembler::new();
        r.ingest(&chunk(id, 0, 2, b"A")).unwrap();
        assert_eq!(r.sweep(), 0);
        assert_eq!(r.pending_count(), 1);
    }
}
