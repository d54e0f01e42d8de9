//! # Frame Encoder
//!
//! Builds complete IMU38x frames around a tag and payload.
//!
//! The engine itself only decodes; encoding exists for the one-shot reset
//! command and for constructing device-faithful frames in tests and
//! simulations.

use super::crc::crc16;
use super::protocol::SYNC_MARKER;

/// Encode a complete frame from a type tag and payload
///
/// # Arguments
///
/// * `tag` - 2-byte type tag (e.g. `b"S0"`)
/// * `payload` - Payload bytes (must fit the 1-byte length field)
///
/// # Returns
///
/// * `Vec<u8>` - Complete frame: sync + tag + length + payload + CRC
///
/// # Panics
///
/// Panics if `payload` exceeds 255 bytes; every supported packet type is
/// far below that bound.
///
/// # Examples
///
/// ```no_run
/// use imu_bridge::imu::encoder::encode_frame;
///
/// let frame = encode_frame([0x53, 0x30], &[0u8; 30]);
/// assert_eq!(frame.len(), 37);
/// ```
pub fn encode_frame(tag: [u8; 2], payload: &[u8]) -> Vec<u8> {
    assert!(payload.len() <= u8::MAX as usize, "payload too long for length field");

    // Build the CRC-covered region: Tag + Length + Payload
    let mut frame_data = Vec::with_capacity(3 + payload.len());
    frame_data.extend_from_slice(&tag);
    frame_data.push(payload.len() as u8);
    frame_data.extend_from_slice(payload);

    let crc = crc16(&frame_data);

    // Build complete frame: Sync + Tag + Length + Payload + CRC
    let mut complete_frame = Vec::with_capacity(2 + frame_data.len() + 2);
    complete_frame.extend_from_slice(&SYNC_MARKER);
    complete_frame.extend_from_slice(&frame_data);
    complete_frame.extend_from_slice(&crc.to_be_bytes());

    complete_frame
}
