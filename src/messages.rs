// Message types crossing the zenoh boundary

use serde::{Deserialize, Serialize};

/// Raw sensor frame from the sensor node: four ultrasonic ranges (cm) in the
/// sensor-fixed frame plus compass yaw in degrees.
///
/// Missing fields deserialize to 0.0 so a partial payload degrades to "very
/// close obstacle" downstream instead of an error.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SensorReport {
    #[serde(rename = "n", default)]
    pub north: f32,
    #[serde(rename = "e", default)]
    pub east: f32,
    #[serde(rename = "s", default)]
    pub south: f32,
    #[serde(rename = "w", default)]
    pub west: f32,
    #[serde(rename = "y", default)]
    pub yaw: f32,
}

/// The four drive modes. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    Manual,
    ObstacleAvoidance,
    WallFollowing,
    RoomMapping,
}

/// A decoded single-byte command from teleop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Forward,
    Backward,
    StrafeLeft,
    StrafeRight,
    RotateLeft,
    RotateRight,
    Stop,
    SetMode(DriveMode),
}

#[derive(Debug, thiserror::Error)]
pub enum CommandParseError {
    #[error("unrecognized command byte 0x{0:02X}")]
    UnknownByte(u8),

    #[error("empty command payload")]
    Empty,
}

impl Command {
    /// Decode a teleop byte. Unknown bytes are an error the caller logs and
    /// drops; they never reach the controller.
    pub fn from_byte(byte: u8) -> Result<Self, CommandParseError> {
        match byte {
            b'w' => Ok(Command::Forward),
            b's' => Ok(Command::Backward),
            b'a' => Ok(Command::StrafeLeft),
            b'd' => Ok(Command::StrafeRight),
            b'q' => Ok(Command::RotateLeft),
            b'e' => Ok(Command::RotateRight),
            b' ' => Ok(Command::Stop),
            b'0' => Ok(Command::SetMode(DriveMode::Manual)),
            b'1' => Ok(Command::SetMode(DriveMode::ObstacleAvoidance)),
            b'2' => Ok(Command::SetMode(DriveMode::WallFollowing)),
            b'3' => Ok(Command::SetMode(DriveMode::RoomMapping)),
            other => Err(CommandParseError::UnknownByte(other)),
        }
    }

    pub fn from_payload(payload: &[u8]) -> Result<Self, CommandParseError> {
        match payload.first() {
            Some(&byte) => Self::from_byte(byte),
            None => Err(CommandParseError::Empty),
        }
    }
}

/// Read-only status projection published by the runtime. Never consumed by
/// the control core itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Telemetry {
    pub mode: DriveMode,
    pub speed: u16,
    pub heading: f32,
}

impl Telemetry {
    pub fn startup(speed: u16) -> Self {
        Self {
            mode: DriveMode::Manual,
            speed,
            heading: 0.0,
        }
    }
}

/// Dead-reckoned exploration path plus the clearances it was built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapSnapshot {
    pub path: Vec<(f32, f32)>,
    pub n: f32,
    pub e: f32,
    pub w: f32,
    pub y: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_bytes_map_to_intents() {
        assert_eq!(Command::from_byte(b'w').unwrap(), Command::Forward);
        assert_eq!(Command::from_byte(b'q').unwrap(), Command::RotateLeft);
        assert_eq!(Command::from_byte(b' ').unwrap(), Command::Stop);
        assert_eq!(
            Command::from_byte(b'3').unwrap(),
            Command::SetMode(DriveMode::RoomMapping)
        );
    }

    #[test]
    fn unknown_byte_is_rejected() {
        assert!(Command::from_byte(b'z').is_err());
        assert!(Command::from_payload(b"").is_err());
    }

    #[test]
    fn sensor_report_defaults_missing_fields_to_zero() {
        let report: SensorReport =
            serde_json::from_str(r#"{"y":5.35,"n":8.54,"e":32.80}"#).unwrap();
        assert_eq!(report.north, 8.54);
        assert_eq!(report.east, 32.80);
        assert_eq!(report.south, 0.0);
        assert_eq!(report.west, 0.0);
        assert_eq!(report.yaw, 5.35);
    }

    #[test]
    fn telemetry_serializes_mode_snake_case() {
        let t = Telemetry {
            mode: DriveMode::ObstacleAvoidance,
            speed: 255,
            heading: 12.5,
        };
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains(r#""mode":"obstacle_avoidance""#));
    }
}
