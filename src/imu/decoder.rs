//! # Packet Decoder
//!
//! Decodes validated IMU38x frames into scaled measurement records.
//!
//! Legacy formats (`S0`, `S1`, `A2`) pack every measurement as a
//! big-endian two's-complement 16-bit fraction of the field's full
//! physical range; the value in physical units is `raw * scale / 2^16`.
//! Newer formats (`a2`, `z1`, `e2`) carry packed little-endian integers,
//! floats and doubles that are already in physical units.

use super::crc::crc16;
use super::protocol::*;
use crate::error::{ImuBridgeError, Result};

/// Decode a complete frame
///
/// One-shot entry point for callers that already hold a full candidate
/// frame; the streaming engine performs the same steps incrementally.
///
/// # Arguments
///
/// * `frame` - Frame bytes starting at the sync marker; trailing extra
///   bytes beyond the type's fixed length are ignored
///
/// # Returns
///
/// * `Result<ImuRecord>` - Decoded record, or error if invalid
///
/// # Errors
///
/// Returns error if:
/// - Frame is too short to identify or shorter than its declared length
/// - Sync marker is incorrect
/// - Type tag is unrecognized
/// - CRC check fails
pub fn decode_frame(frame: &[u8]) -> Result<ImuRecord> {
    // Minimum to identify a candidate: sync(2) + tag(2)
    if frame.len() < 4 {
        return Err(ImuBridgeError::Protocol(format!(
            "frame too short to identify: {} bytes",
            frame.len()
        )));
    }

    if frame[0..2] != SYNC_MARKER {
        return Err(ImuBridgeError::Protocol(format!(
            "invalid sync marker: {:02X} {:02X}",
            frame[0], frame[1]
        )));
    }

    let ptype = PacketType::from_tag([frame[2], frame[3]])
        .ok_or(ImuBridgeError::UnknownPacketType([frame[2], frame[3]]))?;

    let frame_len = ptype.frame_len();
    if frame.len() < frame_len {
        return Err(ImuBridgeError::Protocol(format!(
            "incomplete {:?} frame: expected {} bytes, got {}",
            ptype,
            frame_len,
            frame.len()
        )));
    }

    // CRC covers tag + length byte + payload
    let computed = crc16(&frame[2..frame_len - 2]);
    let received = u16::from_be_bytes([frame[frame_len - 2], frame[frame_len - 1]]);
    if computed != received {
        return Err(ImuBridgeError::CrcMismatch { computed, received });
    }

    decode_payload(ptype, &frame[PAYLOAD_OFFSET..frame_len - 2])
}

/// Decode a payload byte range into the record for `ptype`
///
/// # Arguments
///
/// * `ptype` - Packet type looked up from the frame tag
/// * `payload` - Exactly the payload bytes (sync, tag, length and CRC
///   stripped)
///
/// # Errors
///
/// Returns `MalformedPayload` if the byte range length does not match the
/// type's fixed payload size.
pub fn decode_payload(ptype: PacketType, payload: &[u8]) -> Result<ImuRecord> {
    if payload.len() != ptype.payload_len() {
        return Err(ImuBridgeError::MalformedPayload {
            packet: ptype,
            expected: ptype.payload_len(),
            actual: payload.len(),
        });
    }

    let record = match ptype {
        PacketType::ScaledSensor0 => ImuRecord::ScaledSensor0(decode_scaled_sensor0(payload)),
        PacketType::ScaledSensor1 => ImuRecord::ScaledSensor1(decode_scaled_sensor1(payload)),
        PacketType::AngleData2 => ImuRecord::AngleData2(decode_angle_data2(payload)),
        PacketType::Attitude2 => ImuRecord::Attitude2(decode_attitude2(payload)),
        PacketType::ImuData1 => ImuRecord::ImuData1(decode_imu_data1(payload)),
        PacketType::InsData2 => ImuRecord::InsData2(decode_ins_data2(payload)),
    };

    Ok(record)
}

/// Read a legacy 16-bit field: big-endian two's-complement, scaled to the
/// field's physical full range
fn scaled_i16(payload: &[u8], offset: usize, scale: f64) -> f64 {
    let raw = i16::from_be_bytes([payload[offset], payload[offset + 1]]);
    f64::from(raw) * scale / 65536.0
}

/// Read three consecutive legacy 16-bit fields with a shared scale
fn scaled_triplet(payload: &[u8], offset: usize, scale: f64) -> [f64; 3] {
    [
        scaled_i16(payload, offset, scale),
        scaled_i16(payload, offset + 2, scale),
        scaled_i16(payload, offset + 4, scale),
    ]
}

fn read_u16_be(payload: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([payload[offset], payload[offset + 1]])
}

fn read_u32_be(payload: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        payload[offset],
        payload[offset + 1],
        payload[offset + 2],
        payload[offset + 3],
    ])
}

fn read_u32_le(payload: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        payload[offset],
        payload[offset + 1],
        payload[offset + 2],
        payload[offset + 3],
    ])
}

fn read_f32_le(payload: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        payload[offset],
        payload[offset + 1],
        payload[offset + 2],
        payload[offset + 3],
    ])
}

fn read_f64_le(payload: &[u8], offset: usize) -> f64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&payload[offset..offset + 8]);
    f64::from_le_bytes(bytes)
}

/// Read three consecutive little-endian floats
fn f32_triplet_le(payload: &[u8], offset: usize) -> [f32; 3] {
    [
        read_f32_le(payload, offset),
        read_f32_le(payload, offset + 4),
        read_f32_le(payload, offset + 8),
    ]
}

/// Read three consecutive little-endian doubles
fn f64_triplet_le(payload: &[u8], offset: usize) -> [f64; 3] {
    [
        read_f64_le(payload, offset),
        read_f64_le(payload, offset + 8),
        read_f64_le(payload, offset + 16),
    ]
}

/// Decode an `S0` scaled sensor payload (30 bytes)
fn decode_scaled_sensor0(payload: &[u8]) -> ScaledSensor0 {
    ScaledSensor0 {
        accels: scaled_triplet(payload, 0, ACCEL_SCALE),
        rates: scaled_triplet(payload, 6, RATE_SCALE),
        mags: scaled_triplet(payload, 12, MAG_SCALE),
        temps: [
            scaled_i16(payload, 18, TEMP_SCALE),
            scaled_i16(payload, 20, TEMP_SCALE),
            scaled_i16(payload, 22, TEMP_SCALE),
            scaled_i16(payload, 24, TEMP_SCALE),
        ],
        itow: read_u16_be(payload, 26),
        bit_status: read_u16_be(payload, 28),
    }
}

/// Decode an `S1` scaled sensor payload (24 bytes)
fn decode_scaled_sensor1(payload: &[u8]) -> ScaledSensor1 {
    ScaledSensor1 {
        accels: scaled_triplet(payload, 0, ACCEL_SCALE),
        rates: scaled_triplet(payload, 6, RATE_SCALE),
        temps: [
            scaled_i16(payload, 12, TEMP_SCALE),
            scaled_i16(payload, 14, TEMP_SCALE),
            scaled_i16(payload, 16, TEMP_SCALE),
            scaled_i16(payload, 18, TEMP_SCALE),
        ],
        counter: read_u16_be(payload, 20),
        bit_status: read_u16_be(payload, 22),
    }
}

/// Decode an `A2` angle mode payload (30 bytes)
fn decode_angle_data2(payload: &[u8]) -> AngleData2 {
    AngleData2 {
        angles: scaled_triplet(payload, 0, ANGLE_SCALE),
        rates: scaled_triplet(payload, 6, RATE_SCALE),
        accels: scaled_triplet(payload, 12, ACCEL_SCALE),
        temps: [
            scaled_i16(payload, 18, TEMP_SCALE),
            scaled_i16(payload, 20, TEMP_SCALE),
            scaled_i16(payload, 22, TEMP_SCALE),
        ],
        itow: read_u32_be(payload, 24),
        bit_status: read_u16_be(payload, 28),
    }
}

/// Decode an `a2` EKF attitude payload (48 bytes)
fn decode_attitude2(payload: &[u8]) -> Attitude2 {
    Attitude2 {
        itow: read_u32_le(payload, 0),
        itow_seconds: read_f64_le(payload, 4),
        angles: f32_triplet_le(payload, 12),
        rates: f32_triplet_le(payload, 24),
        accels: f32_triplet_le(payload, 36),
    }
}

/// Decode a `z1` timer-stamped IMU payload (40 bytes)
fn decode_imu_data1(payload: &[u8]) -> ImuData1 {
    ImuData1 {
        timer: read_u32_le(payload, 0),
        accels: f32_triplet_le(payload, 4),
        rates: f32_triplet_le(payload, 16),
        mags: f32_triplet_le(payload, 28),
    }
}

/// Decode an `e2` INS state payload (147 bytes)
fn decode_ins_data2(payload: &[u8]) -> InsData2 {
    InsData2 {
        timer: read_u32_le(payload, 0),
        gps_heading: read_f32_le(payload, 4),
        gps_itow: read_u32_le(payload, 8),
        angles: f32_triplet_le(payload, 12),
        accels: f32_triplet_le(payload, 24),
        accel_bias: f32_triplet_le(payload, 36),
        rates: f32_triplet_le(payload, 48),
        rate_bias: f32_triplet_le(payload, 60),
        velocity: f32_triplet_le(payload, 72),
        gps_velocity: f32_triplet_le(payload, 84),
        position: f64_triplet_le(payload, 96),
        gps_position: f64_triplet_le(payload, 120),
        op_mode: payload[144],
        lin_accel_switch: payload[145],
        turn_switch: payload[146],
    }
}
