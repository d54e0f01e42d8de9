//! # IMU Bridge
//!
//! Decode IMU38x inertial telemetry from a serial byte stream into
//! physically-scaled measurement records.
//!
//! This application opens the IMU's serial port, optionally issues the
//! one-shot reset command, then runs the frame-decoding engine over the
//! incoming bytes and forwards every validated record to the JSONL
//! telemetry sink.

use anyhow::Result;
use tracing::{debug, info, warn};

mod config;
mod error;
mod imu;
mod serial;
mod telemetry;

use config::Config;
use imu::framer::FrameEngine;
use serial::ImuSerial;
use telemetry::{run_sink, JsonlLogger};

/// Bytes requested per serial read.
///
/// Kept below the frame buffer's spare capacity so a read appended after
/// the largest possible incomplete frame can never overflow it.
const READ_CHUNK_SIZE: usize = 128;

/// Number of decoded frames between status log messages
const STATS_LOG_INTERVAL_FRAMES: u64 = 1000;

/// Main entry point for the IMU Bridge application
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (defaults when no file is present)
///    - Open the serial connection, autodetecting the device path
///    - Optionally write the one-shot reset command
///    - Spawn the telemetry sink task
///
/// 2. **Main Loop**
///    - Read a chunk from the serial port
///    - Feed it to the frame engine and forward decoded records
///    - Log decode/drop counters every 1000 frames
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Stop reading, log final counters
///    - Close the record channel and wait for the sink to drain
///
/// # Errors
///
/// Returns error if:
/// - The configuration file is present but invalid
/// - No IMU device can be opened
/// - The transport fails mid-stream (protocol-level corruption is
///   handled internally and never terminates the process)
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let (stdout, _guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_writer(stdout)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("IMU Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = if std::path::Path::new(&config_path).exists() {
        info!("Loading configuration from {}", config_path);
        Config::load(&config_path)?
    } else {
        info!("No configuration file at {}, using defaults", config_path);
        Config::default()
    };

    // Open the serial connection
    let mut serial = if config.serial.port.is_empty() {
        ImuSerial::open(config.serial.baud_rate)?
    } else {
        ImuSerial::open_with_paths(&[config.serial.port.as_str()], config.serial.baud_rate)?
    };
    info!("IMU serial port opened at: {}", serial.device_path());

    if config.serial.reset_on_connect {
        serial.send_reset().await?;
        info!("Sent device reset command");
    }

    // The engine pushes records into the channel and never blocks on the
    // sink side
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let sink_handle = if config.telemetry.enabled {
        let logger = JsonlLogger::new(
            &config.telemetry.log_dir,
            config.telemetry.max_records_per_file,
            config.telemetry.max_files_to_keep,
        )?;
        info!("Telemetry logging to {}", config.telemetry.log_dir);
        Some(tokio::spawn(run_sink(rx, logger)))
    } else {
        drop(rx);
        None
    };

    let mut engine = FrameEngine::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    let mut last_log_count: u64 = 0;

    info!("Decoding IMU frames (press Ctrl+C to exit)");

    // Main decode loop
    loop {
        tokio::select! {
            result = serial.read_bytes(&mut chunk) => {
                let n = match result {
                    Ok(0) => {
                        warn!("Serial stream closed by transport");
                        break;
                    }
                    Ok(n) => n,
                    Err(e) => return Err(e.into()),
                };

                for record in engine.feed(&chunk[..n])? {
                    if tx.send(record).is_err() {
                        debug!("Telemetry sink not running, record discarded");
                    }
                }

                let stats = engine.stats();
                if stats.frames_decoded - last_log_count >= STATS_LOG_INTERVAL_FRAMES {
                    info!(
                        "Decoded {} frames ({} CRC failures, {} unknown tags, {} bytes discarded)",
                        stats.frames_decoded,
                        stats.crc_failures,
                        stats.unknown_tags,
                        stats.bytes_discarded
                    );
                    last_log_count = stats.frames_decoded;
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    let stats = engine.stats();
    info!(
        "Total frames decoded: {} ({} dropped on CRC)",
        stats.frames_decoded, stats.crc_failures
    );

    // Close the channel and let the sink drain what it already holds
    drop(tx);
    if let Some(handle) = sink_handle {
        let _ = handle.await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imu::framer::BUFFER_CAPACITY;
    use crate::imu::protocol::MAX_FRAME_LEN;

    #[test]
    fn test_read_chunk_fits_buffer() {
        // The buffer can hold at most one incomplete frame (MAX - 1
        // bytes) between reads; the next chunk must still fit
        assert!(READ_CHUNK_SIZE + MAX_FRAME_LEN - 1 <= BUFFER_CAPACITY);
    }

    #[test]
    fn test_stats_log_interval_constant() {
        assert_eq!(STATS_LOG_INTERVAL_FRAMES, 1000);
    }
}
