//! Robot snapshot and sensor reading types
//!
//! A [`RobotSnapshot`] is the full observable state of one robot. The engines
//! take a snapshot by reference and hand back a new one; they never mutate the
//! caller's copy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::limits;

/// Robot types that carry a gripper and accept grab/release
pub const MANIPULATOR_TYPES: [&str; 2] = ["arm", "manipulator"];

/// Mechanical state of a robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobotStatus {
    #[default]
    Idle,
    Moving,
    Rotating,
    Grabbing,
    Releasing,
    Charging,
}

impl RobotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RobotStatus::Idle => "idle",
            RobotStatus::Moving => "moving",
            RobotStatus::Rotating => "rotating",
            RobotStatus::Grabbing => "grabbing",
            RobotStatus::Releasing => "releasing",
            RobotStatus::Charging => "charging",
        }
    }
}

impl fmt::Display for RobotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named sensor channel.
///
/// Channels order as temperature, proximity, pressure, then any other name
/// alphabetically, so maps keyed by channel iterate in calibration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Channel {
    Temperature,
    Proximity,
    Pressure,
    /// A channel outside the calibration table
    Other(String),
}

impl Channel {
    /// The channels every robot carries
    pub const FIXED: [Channel; 3] = [Channel::Temperature, Channel::Proximity, Channel::Pressure];

    pub fn as_str(&self) -> &str {
        match self {
            Channel::Temperature => "temperature",
            Channel::Proximity => "proximity",
            Channel::Pressure => "pressure",
            Channel::Other(name) => name,
        }
    }
}

impl From<&str> for Channel {
    fn from(name: &str) -> Self {
        match name {
            "temperature" => Channel::Temperature,
            "proximity" => Channel::Proximity,
            "pressure" => Channel::Pressure,
            other => Channel::Other(other.to_string()),
        }
    }
}

impl From<String> for Channel {
    fn from(name: String) -> Self {
        Channel::from(name.as_str())
    }
}

impl From<Channel> for String {
    fn from(channel: Channel) -> Self {
        channel.as_str().to_string()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a single calibration reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    #[default]
    Ok,
    Warning,
}

/// Result of calibrating one channel.
///
/// Every field may be missing on the wire. A missing `calibratedValue` is kept
/// apart from an explicit `null`: only the latter means the sensor produced no
/// value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalibrationReading {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub sensor_type: Option<Channel>,
    pub raw_value: f64,
    /// `None` when absent, `Some(None)` for an explicit `null`
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub calibrated_value: Option<Option<f64>>,
    pub offset: f64,
    pub unit: String,
    pub status: ReadingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}

impl CalibrationReading {
    /// Mark the reading as needing attention, replacing any earlier message
    pub fn flag(&mut self, message: impl Into<String>) {
        self.status = ReadingStatus::Warning;
        self.message = Some(message.into());
    }

    pub fn is_warning(&self) -> bool {
        self.status == ReadingStatus::Warning
    }

    /// The calibrated value, if one was recorded
    pub fn value(&self) -> Option<f64> {
        self.calibrated_value.flatten()
    }

    /// Whether the reading says outright that it carries no usable value
    pub fn has_no_data(&self) -> bool {
        match self.calibrated_value {
            Some(Some(value)) => !value.is_finite(),
            Some(None) => true,
            None => false,
        }
    }
}

/// Last known reading per channel; `None` before the first calibration
pub type SensorMap = BTreeMap<Channel, Option<CalibrationReading>>;

/// Full observable state of one robot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotSnapshot {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub robot_type: String,
    pub location: String,
    pub status: RobotStatus,
    pub battery_level: f64,
    pub sensors: SensorMap,
    pub created_at: DateTime<Utc>,
    pub last_calibration: Option<DateTime<Utc>>,
}

impl RobotSnapshot {
    /// Create an idle, fully charged robot with no sensor data yet
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        robot_type: impl Into<String>,
        location: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            robot_type: robot_type.into(),
            location: location.unwrap_or_else(|| "unknown".into()),
            status: RobotStatus::Idle,
            battery_level: limits::BATTERY_MAX,
            sensors: Channel::FIXED.into_iter().map(|c| (c, None)).collect(),
            created_at: Utc::now(),
            last_calibration: None,
        }
    }

    /// Whether this robot type has a gripper
    pub fn supports_manipulation(&self) -> bool {
        MANIPULATOR_TYPES.contains(&self.robot_type.as_str())
    }

    pub fn is_depleted(&self) -> bool {
        self.battery_level <= limits::BATTERY_MIN
    }
}
