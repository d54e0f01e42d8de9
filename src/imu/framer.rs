//! # Frame Synchronization Engine
//!
//! Turns an arbitrary, possibly-misaligned serial byte stream into a
//! sequence of validated measurement records.
//!
//! This module handles:
//! - Accumulating partial reads in a fixed-capacity rolling buffer
//! - Locating the `0x55 0x55` frame marker after corruption or byte loss
//! - CRC-validating every candidate frame before decoding
//! - Counting dropped frames and discarded bytes for diagnostics
//!
//! Protocol-level failures (bad marker, unknown tag, CRC mismatch) are
//! handled by resynchronization and never surface as errors; the stream is
//! expected to contain noise and must self-heal.

use bytes::{Buf, BytesMut};
use tracing::{debug, error, warn};

use super::crc::crc16;
use super::decoder::decode_payload;
use super::protocol::{
    ImuRecord, PacketType, MAX_FRAME_LEN, MIN_FRAME_LEN, PAYLOAD_OFFSET, SYNC_BYTE, SYNC_MARKER,
};
use crate::error::{ImuBridgeError, Result};

/// Frame buffer capacity: twice the largest supported frame.
///
/// With reads capped below `BUFFER_CAPACITY - MAX_FRAME_LEN` bytes, the
/// consume-before-read discipline keeps `append` from ever overflowing.
pub const BUFFER_CAPACITY: usize = 2 * MAX_FRAME_LEN;

/// Fixed-capacity byte store for bytes not yet consumed into a record.
///
/// Backed by `BytesMut`; the logical occupied length is `len()`, and bytes
/// past it are never interpreted. No implicit growth beyond the capacity
/// fixed at construction.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: BytesMut,
    capacity: usize,
}

impl FrameBuffer {
    /// Create a buffer with the given fixed capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Append newly read bytes at the occupied-length offset
    ///
    /// # Errors
    ///
    /// Returns `BufferOverflow` if the append would exceed capacity.
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        if self.buf.len() + data.len() > self.capacity {
            return Err(ImuBridgeError::BufferOverflow {
                requested: data.len(),
                available: self.capacity - self.buf.len(),
            });
        }
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Remove the first `n` live bytes.
    ///
    /// `n` must not exceed the occupied length.
    pub fn consume(&mut self, n: usize) {
        self.buf.advance(n);
    }

    /// Reset the occupied length to zero
    pub fn discard_all(&mut self) {
        self.buf.clear();
    }

    /// Number of live bytes
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if no live bytes are buffered
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The live bytes, starting at the current frame-candidate head
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

/// Realign the buffer head to the next plausible frame boundary.
///
/// Called whenever the buffer head does not parse as a valid, complete,
/// CRC-correct frame. The scan starts at offset 1, since the head
/// candidate is already known bad, so the occupied length strictly
/// decreases (or reaches zero) on every call; this prevents livelock on
/// corrupted input.
///
/// A marker byte is accepted only when the following marker byte and a
/// recognized type tag can both be verified; a first marker byte too close
/// to the buffer end to verify discards the whole buffer and forces fresh
/// accumulation.
///
/// # Returns
///
/// * `usize` - The new occupied length
pub fn resync(buf: &mut FrameBuffer) -> usize {
    let bytes = buf.as_slice();
    let len = bytes.len();

    let mut i = 1;
    while i < len {
        if bytes[i] == SYNC_BYTE {
            if i + 3 >= len {
                // Cannot verify the marker pair and tag; start over
                buf.discard_all();
                return 0;
            }
            if bytes[i + 1] == SYNC_BYTE
                && PacketType::from_tag([bytes[i + 2], bytes[i + 3]]).is_some()
            {
                buf.consume(i);
                return buf.len();
            }
            // Candidate failed; keep scanning from the next byte
        }
        i += 1;
    }

    buf.discard_all();
    0
}

/// Decode and drop counters for one engine instance
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames validated, decoded and emitted
    pub frames_decoded: u64,

    /// Candidate frames dropped on checksum disagreement
    pub crc_failures: u64,

    /// Sync markers followed by an unrecognized type tag
    pub unknown_tags: u64,

    /// Bytes discarded while resynchronizing
    pub bytes_discarded: u64,
}

/// Streaming frame decoder.
///
/// One engine per connection: feed it raw reads in arrival order and it
/// emits validated records in the same order. Holds no state across decode
/// attempts beyond the buffered bytes themselves, so restarting after a
/// stop re-synchronizes from scratch.
#[derive(Debug)]
pub struct FrameEngine {
    buf: FrameBuffer,
    stats: FrameStats,
}

impl FrameEngine {
    /// Create an engine with the default buffer capacity
    pub fn new() -> Self {
        Self {
            buf: FrameBuffer::new(BUFFER_CAPACITY),
            stats: FrameStats::default(),
        }
    }

    /// Feed newly read bytes and collect every record they complete
    ///
    /// Appends `data` to the rolling buffer, then repeatedly aligns,
    /// validates and decodes frames from the head until the remaining
    /// bytes are too few or form only an incomplete frame.
    ///
    /// # Arguments
    ///
    /// * `data` - Bytes from the most recent transport read, in arrival
    ///   order
    ///
    /// # Returns
    ///
    /// * `Result<Vec<ImuRecord>>` - Zero or more records, in stream order
    ///
    /// # Errors
    ///
    /// Returns `BufferOverflow` if `data` does not fit the remaining
    /// buffer capacity. Protocol-level failures are handled internally by
    /// resynchronization and reported only through [`FrameStats`].
    pub fn feed(&mut self, data: &[u8]) -> Result<Vec<ImuRecord>> {
        self.buf.append(data)?;

        let mut records = Vec::new();

        while self.buf.len() >= MIN_FRAME_LEN {
            let bytes = self.buf.as_slice();

            if bytes[0..2] != SYNC_MARKER {
                self.resync_counted();
                continue;
            }

            let tag = [bytes[2], bytes[3]];
            let Some(ptype) = PacketType::from_tag(tag) else {
                self.stats.unknown_tags += 1;
                debug!("unrecognized type tag {:02X} {:02X}, resyncing", tag[0], tag[1]);
                self.resync_counted();
                continue;
            };

            let frame_len = ptype.frame_len();
            if self.buf.len() < frame_len {
                // Incomplete frame; wait for more input
                break;
            }

            let computed = crc16(&bytes[2..frame_len - 2]);
            let received = u16::from_be_bytes([bytes[frame_len - 2], bytes[frame_len - 1]]);
            if computed != received {
                self.stats.crc_failures += 1;
                warn!(
                    "CRC mismatch on {:?} frame: computed 0x{:04X}, received 0x{:04X}",
                    ptype, computed, received
                );
                self.resync_counted();
                continue;
            }

            match decode_payload(ptype, &bytes[PAYLOAD_OFFSET..frame_len - 2]) {
                Ok(record) => {
                    self.buf.consume(frame_len);
                    self.stats.frames_decoded += 1;
                    records.push(record);
                }
                Err(e) => {
                    // Internal invariant violation: the engine sliced the
                    // payload from a length-checked, CRC-correct frame.
                    // Recover by resyncing rather than terminating.
                    error!("internal decode fault: {}", e);
                    self.resync_counted();
                }
            }
        }

        Ok(records)
    }

    /// Counters accumulated since the engine was created
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Bytes currently buffered awaiting a complete frame
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    fn resync_counted(&mut self) {
        let before = self.buf.len();
        resync(&mut self.buf);
        self.stats.bytes_discarded += (before - self.buf.len()) as u64;
    }
}

impl Default for FrameEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imu::encoder::encode_frame;

    fn s0_frame() -> Vec<u8> {
        let mut payload = vec![0u8; 30];
        payload[27] = 0x01; // counter = 1
        encode_frame(*b"S0", &payload)
    }

    fn a2_frame() -> Vec<u8> {
        let mut payload = vec![0u8; 30];
        payload[0] = 0x40; // roll = 90 deg
        encode_frame(*b"A2", &payload)
    }

    fn z1_frame() -> Vec<u8> {
        let mut payload = Vec::with_capacity(40);
        payload.extend_from_slice(&7u32.to_le_bytes());
        for v in [0.0f32; 9] {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        encode_frame(*b"z1", &payload)
    }

    #[test]
    fn test_buffer_append_and_consume() {
        let mut buf = FrameBuffer::new(16);
        buf.append(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(buf.len(), 5);

        buf.consume(2);
        assert_eq!(buf.as_slice(), &[3, 4, 5]);

        buf.discard_all();
        assert!(buf.is_empty());
    }

    #[test]
    fn test_buffer_overflow() {
        let mut buf = FrameBuffer::new(8);
        buf.append(&[0u8; 6]).unwrap();

        let result = buf.append(&[0u8; 3]);
        assert!(matches!(
            result,
            Err(ImuBridgeError::BufferOverflow {
                requested: 3,
                available: 2,
            })
        ));
        // Failed append leaves the buffer untouched
        assert_eq!(buf.len(), 6);
    }

    #[test]
    fn test_buffer_capacity_reclaimed_after_consume() {
        let mut buf = FrameBuffer::new(8);
        buf.append(&[0u8; 8]).unwrap();
        buf.consume(8);
        buf.append(&[1u8; 8]).unwrap();
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn test_resync_no_marker_discards_all() {
        let mut buf = FrameBuffer::new(64);
        buf.append(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06]).unwrap();
        assert_eq!(resync(&mut buf), 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_resync_aligns_to_frame_start() {
        let mut buf = FrameBuffer::new(64);
        let mut data = vec![0xDE, 0xAD, 0xBE, 0xEF];
        data.extend_from_slice(&s0_frame()[..10]);
        buf.append(&data).unwrap();

        let n = resync(&mut buf);
        assert_eq!(n, 10);
        assert_eq!(&buf.as_slice()[..4], &[0x55, 0x55, 0x53, 0x30]);
    }

    #[test]
    fn test_resync_skips_false_candidates() {
        // A lone 0x55 and a marker pair with an unknown tag, then a real
        // frame head
        let mut buf = FrameBuffer::new(64);
        let mut data = vec![0x55, 0x00, 0x55, 0x55, 0x51, 0x39];
        data.extend_from_slice(&s0_frame()[..8]);
        buf.append(&data).unwrap();

        resync(&mut buf);
        assert_eq!(&buf.as_slice()[..4], &[0x55, 0x55, 0x53, 0x30]);
    }

    #[test]
    fn test_resync_marker_too_close_to_end() {
        let mut buf = FrameBuffer::new(64);
        buf.append(&[0x00, 0x00, 0x55, 0x55]).unwrap();
        assert_eq!(resync(&mut buf), 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_resync_ignores_head_candidate() {
        // The head is a plausible frame start; resync is only ever called
        // when it failed validation, so it must not be re-selected
        let mut buf = FrameBuffer::new(128);
        let mut data = s0_frame();
        data.extend_from_slice(&a2_frame());
        buf.append(&data).unwrap();

        resync(&mut buf);
        assert_eq!(&buf.as_slice()[..4], &[0x55, 0x55, 0x41, 0x32]);
    }

    #[test]
    fn test_engine_decodes_single_frame() {
        let mut engine = FrameEngine::new();
        let records = engine.feed(&s0_frame()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].packet_type(), PacketType::ScaledSensor0);
        assert_eq!(engine.buffered(), 0);
        assert_eq!(engine.stats().frames_decoded, 1);

        let ImuRecord::ScaledSensor0(ref data) = records[0] else {
            panic!("wrong variant");
        };
        assert_eq!(data.itow, 1);
    }

    #[test]
    fn test_engine_byte_by_byte_matches_one_shot() {
        let frame = a2_frame();

        let mut one_shot = FrameEngine::new();
        let expected = one_shot.feed(&frame).unwrap();

        let mut engine = FrameEngine::new();
        let mut records = Vec::new();
        for &byte in &frame {
            records.extend(engine.feed(&[byte]).unwrap());
        }

        assert_eq!(records, expected);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_engine_mixed_frames_in_order() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&s0_frame());
        stream.extend_from_slice(&z1_frame());
        stream.extend_from_slice(&a2_frame());
        stream.extend_from_slice(&s0_frame());

        // Chunk sizes deliberately unrelated to frame boundaries
        let mut engine = FrameEngine::new();
        let mut records = Vec::new();
        for chunk in stream.chunks(11) {
            records.extend(engine.feed(chunk).unwrap());
        }

        let types: Vec<_> = records.iter().map(|r| r.packet_type()).collect();
        assert_eq!(
            types,
            vec![
                PacketType::ScaledSensor0,
                PacketType::ImuData1,
                PacketType::AngleData2,
                PacketType::ScaledSensor0,
            ]
        );
        assert_eq!(engine.stats().frames_decoded, 4);
        assert_eq!(engine.stats().crc_failures, 0);
    }

    #[test]
    fn test_engine_recovers_from_garbage_prefix() {
        let mut stream = vec![0x00, 0xFF, 0x55, 0x12, 0xAB, 0xCD, 0x42];
        stream.extend_from_slice(&s0_frame());

        let mut engine = FrameEngine::new();
        let records = engine.feed(&stream).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].packet_type(), PacketType::ScaledSensor0);
        assert!(engine.stats().bytes_discarded > 0);
    }

    #[test]
    fn test_engine_drops_corrupted_frame_and_recovers() {
        let mut corrupted = s0_frame();
        corrupted[10] ^= 0x01; // flip one payload bit

        let mut stream = corrupted;
        stream.extend_from_slice(&a2_frame());

        let mut engine = FrameEngine::new();
        let records = engine.feed(&stream).unwrap();

        // The corrupted frame is dropped; the following frame decodes
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].packet_type(), PacketType::AngleData2);
        assert_eq!(engine.stats().crc_failures, 1);
        assert_eq!(engine.stats().frames_decoded, 1);
    }

    #[test]
    fn test_engine_counts_unknown_tags() {
        let mut stream = encode_frame(*b"Q9", &[0u8; 30]);
        stream.extend_from_slice(&s0_frame());

        let mut engine = FrameEngine::new();
        let records = engine.feed(&stream).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(engine.stats().unknown_tags, 1);
    }

    #[test]
    fn test_engine_waits_for_incomplete_frame() {
        let frame = z1_frame();
        let (head, tail) = frame.split_at(frame.len() - 5);

        let mut engine = FrameEngine::new();
        assert!(engine.feed(head).unwrap().is_empty());
        assert_eq!(engine.buffered(), head.len());

        let records = engine.feed(tail).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].packet_type(), PacketType::ImuData1);
    }

    #[test]
    fn test_engine_overflow_on_oversized_read() {
        let mut engine = FrameEngine::new();
        let result = engine.feed(&vec![0u8; BUFFER_CAPACITY + 1]);
        assert!(matches!(result, Err(ImuBridgeError::BufferOverflow { .. })));
    }

    #[test]
    fn test_engine_flushes_garbage_within_capacity() {
        // A full buffer of markerless noise is discarded wholesale and
        // never jams the engine
        let mut engine = FrameEngine::new();
        let records = engine.feed(&vec![0xA5u8; BUFFER_CAPACITY]).unwrap();
        assert!(records.is_empty());
        assert_eq!(engine.buffered(), 0);

        let records = engine.feed(&s0_frame()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_engine_single_corrupt_byte_in_every_position() {
        // Corrupting any single CRC-covered byte must drop the frame, and
        // the next frame must still decode
        let good = s0_frame();
        for i in 2..good.len() {
            let mut corrupted = good.clone();
            corrupted[i] ^= 0xFF;

            let mut stream = corrupted;
            stream.extend_from_slice(&good);

            let mut engine = FrameEngine::new();
            let records = engine.feed(&stream).unwrap();

            assert_eq!(
                records.len(),
                1,
                "corruption at byte {} should drop exactly one frame",
                i
            );
            assert_eq!(records[0].packet_type(), PacketType::ScaledSensor0);
        }
    }
}
