//! # IMU38x Protocol Constants and Types
//!
//! Core protocol definitions for the IMU38x serial telemetry link.

use serde::Serialize;

/// Frame sync marker (always `0x55 0x55`)
pub const SYNC_MARKER: [u8; 2] = [0x55, 0x55];

/// First byte of the sync marker, used by the resynchronizer scan
pub const SYNC_BYTE: u8 = 0x55;

/// Bytes of framing overhead shared by every packet type:
/// sync(2) + tag(2) + length(1) + crc(2)
pub const FRAME_OVERHEAD: usize = 7;

/// Offset of the payload within a frame (after sync, tag and length byte)
pub const PAYLOAD_OFFSET: usize = 5;

/// Total length of the smallest supported frame (`S1`)
pub const MIN_FRAME_LEN: usize = 31;

/// Total length of the largest supported frame (`e2`)
pub const MAX_FRAME_LEN: usize = 154;

/// One-shot software reset command: sync + tag `rS` + zero-length payload + CRC.
///
/// Written once at connection start when configured; the device does not
/// acknowledge it.
pub const RESET_COMMAND: [u8; 7] = [0x55, 0x55, 0x72, 0x53, 0x00, 0xFC, 0x88];

/// Acceleration scale for legacy 16-bit fields: 20 g full range in m/s²
pub const ACCEL_SCALE: f64 = 9.80665 * 20.0;

/// Angular rate scale for legacy 16-bit fields: 1260 deg/s full range
pub const RATE_SCALE: f64 = 1260.0;

/// Magnetometer scale for legacy 16-bit fields: 2 gauss full range
pub const MAG_SCALE: f64 = 2.0;

/// Temperature scale for legacy 16-bit fields: 200 °C full range
pub const TEMP_SCALE: f64 = 200.0;

/// Angle scale for legacy 16-bit fields: 360 deg full range
pub const ANGLE_SCALE: f64 = 360.0;

/// The six supported packet formats.
///
/// Each variant fixes a 2-byte ASCII type tag and a total frame length;
/// together with its decode routine in [`crate::imu::decoder`] this forms
/// the packet registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PacketType {
    /// `S0`: scaled sensor data: accels, rates, mags, temperatures
    ScaledSensor0,
    /// `S1`: scaled sensor data without magnetometer
    ScaledSensor1,
    /// `A2`: angle mode: Euler angles, corrected rates, accels
    AngleData2,
    /// `a2`: EKF attitude output (packed floats)
    Attitude2,
    /// `z1`: timer-stamped scaled IMU output (packed floats)
    ImuData1,
    /// `e2`: full INS state output (packed floats and doubles)
    InsData2,
}

impl PacketType {
    /// Look up a packet type from its 2-byte wire tag
    ///
    /// # Arguments
    ///
    /// * `tag` - The two bytes following the sync marker
    ///
    /// # Returns
    ///
    /// * `Option<PacketType>` - The matching type, or `None` for an
    ///   unrecognized tag
    pub fn from_tag(tag: [u8; 2]) -> Option<Self> {
        match tag {
            [0x53, 0x30] => Some(Self::ScaledSensor0),
            [0x53, 0x31] => Some(Self::ScaledSensor1),
            [0x41, 0x32] => Some(Self::AngleData2),
            [0x61, 0x32] => Some(Self::Attitude2),
            [0x7A, 0x31] => Some(Self::ImuData1),
            [0x65, 0x32] => Some(Self::InsData2),
            _ => None,
        }
    }

    /// The 2-byte ASCII wire tag for this packet type
    pub fn tag(self) -> [u8; 2] {
        match self {
            Self::ScaledSensor0 => [0x53, 0x30],
            Self::ScaledSensor1 => [0x53, 0x31],
            Self::AngleData2 => [0x41, 0x32],
            Self::Attitude2 => [0x61, 0x32],
            Self::ImuData1 => [0x7A, 0x31],
            Self::InsData2 => [0x65, 0x32],
        }
    }

    /// Total frame length in bytes, including sync marker, tag, length
    /// byte, payload and CRC.
    ///
    /// Fixed per type before any payload interpretation.
    pub fn frame_len(self) -> usize {
        match self {
            Self::ScaledSensor0 => 37,
            Self::ScaledSensor1 => 31,
            Self::AngleData2 => 37,
            Self::Attitude2 => 55,
            Self::ImuData1 => 47,
            Self::InsData2 => 154,
        }
    }

    /// Payload length in bytes (frame length minus framing overhead)
    pub fn payload_len(self) -> usize {
        self.frame_len() - FRAME_OVERHEAD
    }
}

/// `S0` scaled sensor data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaledSensor0 {
    /// Accelerations in m/s² (x, y, z)
    pub accels: [f64; 3],

    /// Angular rates in deg/s (x, y, z)
    pub rates: [f64; 3],

    /// Magnetic field in gauss (x, y, z)
    pub mags: [f64; 3],

    /// Rate sensor and board temperatures in °C
    pub temps: [f64; 4],

    /// GPS ITOW time tag, lower 16 bits, in ms
    pub itow: u16,

    /// Master BIT and status bitmask
    pub bit_status: u16,
}

/// `S1` scaled sensor data (no magnetometer)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaledSensor1 {
    /// Accelerations in m/s² (x, y, z)
    pub accels: [f64; 3],

    /// Angular rates in deg/s (x, y, z)
    pub rates: [f64; 3],

    /// Rate sensor and board temperatures in °C
    pub temps: [f64; 4],

    /// Packet counter
    pub counter: u16,

    /// Master BIT and status bitmask
    pub bit_status: u16,
}

/// `A2` angle mode data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AngleData2 {
    /// Roll, pitch, yaw angles in degrees
    pub angles: [f64; 3],

    /// Corrected angular rates in deg/s (x, y, z)
    pub rates: [f64; 3],

    /// Accelerations in m/s² (x, y, z)
    pub accels: [f64; 3],

    /// Rate sensor temperatures in °C
    pub temps: [f64; 3],

    /// GPS ITOW time tag in ms
    pub itow: u32,

    /// Master BIT and status bitmask
    pub bit_status: u16,
}

/// `a2` EKF attitude output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attitude2 {
    /// ITOW time tag in ms
    pub itow: u32,

    /// ITOW time tag in seconds (redundant double-precision copy)
    pub itow_seconds: f64,

    /// Yaw, pitch, roll angles in degrees
    pub angles: [f32; 3],

    /// Corrected angular rates in deg/s (x, y, z)
    pub rates: [f32; 3],

    /// Corrected accelerations in m/s² (x, y, z)
    pub accels: [f32; 3],
}

/// `z1` timer-stamped scaled IMU output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImuData1 {
    /// Free-running timer in ms
    pub timer: u32,

    /// Accelerations in m/s² (x, y, z)
    pub accels: [f32; 3],

    /// Angular rates in deg/s (x, y, z)
    pub rates: [f32; 3],

    /// Magnetic field in gauss (x, y, z)
    pub mags: [f32; 3],
}

/// `e2` full INS state output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsData2 {
    /// Free-running timer in ms
    pub timer: u32,

    /// GPS course over ground in degrees
    pub gps_heading: f32,

    /// GPS ITOW time tag in ms
    pub gps_itow: u32,

    /// Roll, pitch, yaw angles in degrees
    pub angles: [f32; 3],

    /// Accelerations in m/s² (x, y, z)
    pub accels: [f32; 3],

    /// Estimated accelerometer bias in m/s²
    pub accel_bias: [f32; 3],

    /// Angular rates in deg/s (x, y, z)
    pub rates: [f32; 3],

    /// Estimated rate sensor bias in deg/s
    pub rate_bias: [f32; 3],

    /// NED velocity in m/s
    pub velocity: [f32; 3],

    /// GPS-reported NED velocity in m/s
    pub gps_velocity: [f32; 3],

    /// Latitude (deg), longitude (deg), altitude (m)
    pub position: [f64; 3],

    /// GPS-reported latitude (deg), longitude (deg), altitude (m)
    pub gps_position: [f64; 3],

    /// Operating mode
    pub op_mode: u8,

    /// Linear-acceleration switch flag
    pub lin_accel_switch: u8,

    /// Turn switch / GPS-update bitmask
    pub turn_switch: u8,
}

/// One decoded measurement record, tagged by packet type.
///
/// Exactly one variant is produced per validated frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "packet", content = "fields")]
pub enum ImuRecord {
    ScaledSensor0(ScaledSensor0),
    ScaledSensor1(ScaledSensor1),
    AngleData2(AngleData2),
    Attitude2(Attitude2),
    ImuData1(ImuData1),
    InsData2(InsData2),
}

impl ImuRecord {
    /// The packet type this record was decoded from
    pub fn packet_type(&self) -> PacketType {
        match self {
            Self::ScaledSensor0(_) => PacketType::ScaledSensor0,
            Self::ScaledSensor1(_) => PacketType::ScaledSensor1,
            Self::AngleData2(_) => PacketType::AngleData2,
            Self::Attitude2(_) => PacketType::Attitude2,
            Self::ImuData1(_) => PacketType::ImuData1,
            Self::InsData2(_) => PacketType::InsData2,
        }
    }
}

/// All supported packet types, in registry order
pub const ALL_PACKET_TYPES: [PacketType; 6] = [
    PacketType::ScaledSensor0,
    PacketType::ScaledSensor1,
    PacketType::AngleData2,
    PacketType::Attitude2,
    PacketType::ImuData1,
    PacketType::InsData2,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        for ptype in ALL_PACKET_TYPES {
            assert_eq!(PacketType::from_tag(ptype.tag()), Some(ptype));
        }
    }

    #[test]
    fn test_unknown_tags_rejected() {
        assert_eq!(PacketType::from_tag([0x00, 0x00]), None);
        assert_eq!(PacketType::from_tag([0x55, 0x55]), None);
        assert_eq!(PacketType::from_tag([0x53, 0x32]), None); // "S2"
        assert_eq!(PacketType::from_tag([0x72, 0x53]), None); // reset cmd tag
    }

    #[test]
    fn test_frame_lengths() {
        assert_eq!(PacketType::ScaledSensor0.frame_len(), 37);
        assert_eq!(PacketType::ScaledSensor1.frame_len(), 31);
        assert_eq!(PacketType::AngleData2.frame_len(), 37);
        assert_eq!(PacketType::Attitude2.frame_len(), 55);
        assert_eq!(PacketType::ImuData1.frame_len(), 47);
        assert_eq!(PacketType::InsData2.frame_len(), 154);
    }

    #[test]
    fn test_min_max_frame_len_consistent() {
        let min = ALL_PACKET_TYPES.iter().map(|p| p.frame_len()).min().unwrap();
        let max = ALL_PACKET_TYPES.iter().map(|p| p.frame_len()).max().unwrap();
        assert_eq!(min, MIN_FRAME_LEN);
        assert_eq!(max, MAX_FRAME_LEN);
    }

    #[test]
    fn test_payload_lengths() {
        assert_eq!(PacketType::ScaledSensor0.payload_len(), 30);
        assert_eq!(PacketType::ScaledSensor1.payload_len(), 24);
        assert_eq!(PacketType::AngleData2.payload_len(), 30);
        assert_eq!(PacketType::Attitude2.payload_len(), 48);
        assert_eq!(PacketType::ImuData1.payload_len(), 40);
        assert_eq!(PacketType::InsData2.payload_len(), 147);
    }

    #[test]
    fn test_ascii_tags() {
        assert_eq!(&PacketType::ScaledSensor0.tag(), b"S0");
        assert_eq!(&PacketType::ScaledSensor1.tag(), b"S1");
        assert_eq!(&PacketType::AngleData2.tag(), b"A2");
        assert_eq!(&PacketType::Attitude2.tag(), b"a2");
        assert_eq!(&PacketType::ImuData1.tag(), b"z1");
        assert_eq!(&PacketType::InsData2.tag(), b"e2");
    }

    #[test]
    fn test_reset_command_framing() {
        assert_eq!(RESET_COMMAND[0..2], SYNC_MARKER);
        assert_eq!(RESET_COMMAND[4], 0x00); // zero-length payload
    }
}
