//! # IMU Bridge Library
//!
//! Decode IMU38x inertial telemetry from a serial byte stream into
//! physically-scaled measurement records.
//!
//! This library provides the frame synchronization and packet-decoding
//! engine for the IMU38x binary protocol, plus the serial transport and
//! JSONL telemetry sink around it.

pub mod config;
pub mod error;
pub mod imu;
pub mod serial;
pub mod telemetry;
