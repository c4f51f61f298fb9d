//! Record framing for ledger partitions.
//!
//! ```text
//! [4 bytes: payload length (little-endian u32)]
//! [4 bytes: CRC32 of payload (little-endian u32)]
//! [N bytes: payload (bincode)]
//! ```
//!
//! A damaged frame never hides the frames after it: the scan resynchronizes
//! on the next intact frame. Only an incomplete frame running into EOF counts
//! as a torn tail.

use std::ops::Range;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::{LedgerError, LedgerResult};

/// Header size: 4 bytes length + 4 bytes CRC.
pub const HEADER_SIZE: usize = 8;

/// Serialize `record` into one frame.
pub fn encode<T: Serialize>(record: &T) -> LedgerResult<Vec<u8>> {
    let payload =
        bincode::serialize(record).map_err(|e| LedgerError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len())
        .map_err(|_| LedgerError::Serialization("record exceeds 4 GiB".into()))?;
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// How a partition ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tail {
    /// The last frame ends exactly at EOF.
    Clean,
    /// An interrupted append: fewer bytes than a header, or one incomplete
    /// frame reaching EOF. Safe to cut at `offset`.
    Torn { offset: usize },
    /// Bytes from `offset` to EOF are neither frames nor a torn append.
    /// Appending after them would bury them, cutting would lose them.
    Damaged { offset: usize },
}

/// Layout of a partition: payload ranges in file order and how it ends.
#[derive(Debug)]
pub struct Scan {
    pub payloads: Vec<Range<usize>>,
    /// Damaged frames that could not be recovered.
    pub skipped: usize,
    pub tail: Tail,
}

/// Result of decoding a partition.
#[derive(Debug)]
pub struct Decoded<T> {
    /// Records in file order.
    pub records: Vec<T>,
    pub skipped: usize,
    pub tail: Tail,
}

fn header(bytes: &[u8], offset: usize) -> (usize, u32) {
    let h = &bytes[offset..offset + HEADER_SIZE];
    let length = u32::from_le_bytes([h[0], h[1], h[2], h[3]]) as usize;
    let crc = u32::from_le_bytes([h[4], h[5], h[6], h[7]]);
    (length, crc)
}

/// Payload range of the frame at `offset` if it is complete and its CRC holds.
fn intact_at(bytes: &[u8], offset: usize) -> Option<Range<usize>> {
    if bytes.len().saturating_sub(offset) < HEADER_SIZE {
        return None;
    }
    let (length, crc) = header(bytes, offset);
    let start = offset + HEADER_SIZE;
    let end = start.checked_add(length)?;
    if length == 0 || end > bytes.len() || crc32fast::hash(&bytes[start..end]) != crc {
        return None;
    }
    Some(start..end)
}

/// First offset at or after `from` holding an intact frame.
fn next_intact(bytes: &[u8], from: usize) -> Option<usize> {
    (from..bytes.len().saturating_sub(HEADER_SIZE)).find(|&at| intact_at(bytes, at).is_some())
}

/// Walk the frames of `bytes`.
pub fn scan(bytes: &[u8]) -> Scan {
    let mut payloads = Vec::new();
    let mut skipped = 0usize;
    let mut offset = 0usize;

    let tail = loop {
        if offset == bytes.len() {
            break Tail::Clean;
        }
        if bytes.len() - offset < HEADER_SIZE {
            break Tail::Torn { offset };
        }
        if let Some(payload) = intact_at(bytes, offset) {
            offset = payload.end;
            payloads.push(payload);
            continue;
        }

        let (length, crc) = header(bytes, offset);
        let start = offset + HEADER_SIZE;
        match next_intact(bytes, offset + 1) {
            Some(next) => {
                // A bad length with an intact payload still checks out against
                // the stored CRC once the next frame fixes its end.
                if next > start && crc32fast::hash(&bytes[start..next]) == crc {
                    warn!(offset, length, recovered_len = next - start, "ledger frame length damaged; payload recovered");
                    payloads.push(start..next);
                } else {
                    warn!(offset, next, "damaged ledger frame skipped");
                    skipped += 1;
                }
                offset = next;
            }
            None => {
                let end = start.checked_add(length);
                match end {
                    Some(end) if length > 0 && end > bytes.len() => break Tail::Torn { offset },
                    Some(end) if length > 0 && end == bytes.len() => {
                        warn!(offset, length, "CRC mismatch on last ledger frame; skipping");
                        skipped += 1;
                        break Tail::Clean;
                    }
                    _ => break Tail::Damaged { offset },
                }
            }
        }
    };

    Scan {
        payloads,
        skipped,
        tail,
    }
}

/// Decode every recoverable frame in `bytes`.
///
/// Frames that fail the CRC or deserialization are counted in `skipped`.
pub fn decode_all<T: DeserializeOwned>(bytes: &[u8]) -> Decoded<T> {
    let scan = scan(bytes);
    let mut skipped = scan.skipped;
    let mut records = Vec::with_capacity(scan.payloads.len());
    for payload in scan.payloads {
        match bincode::deserialize::<T>(&bytes[payload.clone()]) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(offset = payload.start, error = %e, "undecodable ledger frame; skipping");
                skipped += 1;
            }
        }
    }
    Decoded {
        records,
        skipped,
        tail: scan.tail,
    }
}
