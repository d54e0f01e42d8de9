//! # Serial Communication Module
//!
//! Handles serial communication with the IMU38x device.
//!
//! This module handles:
//! - Opening the serial port at the configured baud rate (8N1)
//! - Device-path autodetection over common USB-serial paths
//! - Async chunk reads feeding the frame engine
//! - Writing the one-shot software reset command

use crate::error::{ImuBridgeError, Result};
use crate::imu::protocol::RESET_COMMAND;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

pub mod port_trait;

pub use port_trait::{SerialPortIO, TokioSerialPort};

/// Factory-default IMU38x baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default device paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial adapters (most common for the IMU38x)
    "/dev/ttyACM0", // USB CDC devices
];

/// IMU Serial Port Handler
///
/// Manages the connection to the IMU over a serial link. Generic over
/// [`SerialPortIO`] so the read/write paths can be exercised against a
/// mock port.
pub struct ImuSerial<P: SerialPortIO = TokioSerialPort> {
    /// Serial port handle
    port: P,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
}

impl<P: SerialPortIO> std::fmt::Debug for ImuSerial<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImuSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl ImuSerial<TokioSerialPort> {
    /// Open a connection to the IMU
    ///
    /// Auto-detects the device by trying common paths.
    ///
    /// # Arguments
    ///
    /// * `baud_rate` - Line rate, typically [`DEFAULT_BAUD_RATE`]
    ///
    /// # Errors
    ///
    /// Returns error if no device is found or the connection fails
    pub fn open(baud_rate: u32) -> Result<Self> {
        Self::open_with_paths(DEFAULT_DEVICE_PATHS, baud_rate)
    }

    /// Open a connection to the IMU with custom device paths
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyUSB0"])
    /// * `baud_rate` - Line rate
    ///
    /// # Returns
    ///
    /// * `Result<ImuSerial>` - Connected serial port or error
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Successfully opened IMU device at {}", path);
                    return Ok(Self {
                        port: TokioSerialPort::new(port),
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(ImuBridgeError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with 8N1 settings
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| ImuBridgeError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }
}

impl<P: SerialPortIO> ImuSerial<P> {
    /// Wrap an already-opened port (used with mock ports in tests)
    pub fn with_port(port: P, device_path: impl Into<String>) -> Self {
        Self {
            port,
            device_path: device_path.into(),
        }
    }

    /// Write the one-shot software reset command to the device
    ///
    /// The device does not acknowledge the reset; the frame engine simply
    /// re-synchronizes on whatever the device emits next.
    pub async fn send_reset(&mut self) -> Result<()> {
        self.port
            .write_all(&RESET_COMMAND)
            .await
            .map_err(|e| ImuBridgeError::Serial(format!("Failed to write reset command: {}", e)))?;

        self.port
            .flush()
            .await
            .map_err(|e| ImuBridgeError::Serial(format!("Failed to flush serial port: {}", e)))?;

        debug!("Sent reset command ({} bytes)", RESET_COMMAND.len());
        Ok(())
    }

    /// Read available bytes from the device into `buf`
    ///
    /// # Returns
    ///
    /// * `Result<usize>` - Number of bytes read; 0 means the transport
    ///   closed the stream
    pub async fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.port
            .read(buf)
            .await
            .map_err(|e| ImuBridgeError::Serial(format!("Failed to read from serial port: {}", e)))
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}
