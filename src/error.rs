//! # Error Types
//!
//! Custom error types for IMU Bridge using `thiserror`.

use thiserror::Error;

use crate::imu::protocol::PacketType;

/// Main error type for IMU Bridge
#[derive(Debug, Error)]
pub enum ImuBridgeError {
    /// Frame-level protocol errors (bad sync marker, incomplete frame)
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Sync marker present but the type tag matches no registry entry
    #[error("unknown packet type tag: {0:02X?}")]
    UnknownPacketType([u8; 2]),

    /// Declared checksum disagrees with the computed checksum
    #[error("CRC mismatch: computed 0x{computed:04X}, received 0x{received:04X}")]
    CrcMismatch {
        computed: u16,
        received: u16,
    },

    /// Payload length disagrees with the decoder's fixed layout.
    ///
    /// Unreachable through the frame engine, which checks the declared
    /// frame length before decoding; surfacing it means a programming
    /// fault rather than stream corruption.
    #[error("malformed {packet:?} payload: expected {expected} bytes, got {actual}")]
    MalformedPayload {
        packet: PacketType,
        expected: usize,
        actual: usize,
    },

    /// Appending read bytes would exceed the frame buffer's fixed capacity
    #[error("frame buffer overflow: {requested} bytes exceed remaining capacity {available}")]
    BufferOverflow {
        requested: usize,
        available: usize,
    },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Record serialization errors in the telemetry sink
    #[error("record serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Serial transport errors
    #[error("serial error: {0}")]
    Serial(String),

    /// No device present at any candidate path
    #[error("no IMU device found at: {0}")]
    SerialPortNotFound(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for IMU Bridge
pub type Result<T> = std::result::Result<T, ImuBridgeError>;
