//! # IMU38x Protocol Module
//!
//! Implementation of the IMU38x binary telemetry protocol.
//!
//! This module handles:
//! - Frame synchronization over an unreliable byte stream
//! - CRC16 checksum calculation and validation
//! - Decoding six fixed-length packet formats into scaled records
//! - Building the one-shot device reset frame

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod crc;
pub mod framer;
