//! Robot Fleet Shared Types
//!
//! This crate provides the robot model, the command and calibration engines,
//! and the wire protocol/codec shared by the fleet node and the operator console.

pub mod calibration;
pub mod codec;
pub mod model;
pub mod protocol;
pub mod state_machine;

use std::time::{SystemTime, UNIX_EPOCH};

// Re-export commonly used types at crate root
pub use calibration::{
    validate_health, CalibrationEngine, CalibrationProfile, CalibrationReport, CalibrationStatus,
    ChannelSpec, HealthReport, CHANNEL_TABLE,
};
pub use model::{
    CalibrationReading, Channel, ReadingStatus, RobotSnapshot, RobotStatus, SensorMap,
};
pub use protocol::{Envelope, ErrorCode, Header, Payload, Request, Response};
pub use state_machine::{CommandError, CommandKind, CommandResult, Parameters};

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Operating limits shared by the node and the console
pub mod limits {
    /// Lowest representable battery level
    pub const BATTERY_MIN: f64 = 0.0;

    /// Battery level of a freshly registered or fully charged robot
    pub const BATTERY_MAX: f64 = 100.0;

    /// Default TCP address the node listens on
    pub const DEFAULT_NODE_ADDR: &str = "127.0.0.1:7070";

    /// How long the console waits for a response before giving up
    pub const REQUEST_TIMEOUT_MS: u64 = 3000;

    /// Idle client sessions are closed after this long without a request
    pub const SESSION_IDLE_TIMEOUT_MS: u64 = 300_000;

    /// Clamp a battery level into the valid range
    pub fn clamp_battery(level: f64) -> f64 {
        level.clamp(BATTERY_MIN, BATTERY_MAX)
    }
}
