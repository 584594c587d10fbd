//! Robot Command State Machine
//!
//! Validates one command against one robot snapshot and derives the next
//! snapshot. Guards run in a fixed order: unknown command, depleted battery,
//! then command-specific validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::limits;
use crate::model::{RobotSnapshot, RobotStatus};

/// Free-form command parameters as received on the wire
pub type Parameters = serde_json::Map<String, Value>;

/// Commands a robot understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Move,
    Stop,
    Rotate,
    Grab,
    Release,
    Charge,
}

impl CommandKind {
    /// Every command, in the order reported to clients
    pub const ALL: [CommandKind; 6] = [
        CommandKind::Move,
        CommandKind::Stop,
        CommandKind::Rotate,
        CommandKind::Grab,
        CommandKind::Release,
        CommandKind::Charge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Move => "move",
            CommandKind::Stop => "stop",
            CommandKind::Rotate => "rotate",
            CommandKind::Grab => "grab",
            CommandKind::Release => "release",
            CommandKind::Charge => "charge",
        }
    }

    /// Parse a command name, rejecting anything outside [`CommandKind::ALL`]
    pub fn parse(name: &str) -> Result<Self, CommandError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))
    }

    /// Names of all commands, for error responses
    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|k| k.as_str().to_string()).collect()
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a `move` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Forward,
        Direction::Backward,
        Direction::Left,
        Direction::Right,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == name)
    }
}

/// Why a command was rejected. The snapshot is never modified on error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Battery depleted. Please charge the robot.")]
    BatteryDepleted,

    #[error("{0}")]
    InvalidParameter(String),

    #[error("This robot type does not support {0} operations")]
    UnsupportedForType(CommandKind),
}

impl CommandError {
    fn invalid_direction() -> Self {
        let names: Vec<&str> = Direction::ALL.iter().map(Direction::as_str).collect();
        CommandError::InvalidParameter(format!("Invalid direction. Use: {}", names.join(", ")))
    }

    fn invalid_number(param: &str) -> Self {
        CommandError::InvalidParameter(format!("Invalid {}. Expected a number", param))
    }
}

/// A validated command with its parameters resolved
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Move { direction: Direction, distance: f64 },
    Stop,
    Rotate { degrees: f64 },
    Grab,
    Release,
    Charge,
}

/// How an action changes the battery
#[derive(Debug, Clone, Copy, PartialEq)]
enum BatteryEffect {
    Drain(f64),
    Recharge,
}

impl Action {
    pub fn kind(&self) -> CommandKind {
        match self {
            Action::Move { .. } => CommandKind::Move,
            Action::Stop => CommandKind::Stop,
            Action::Rotate { .. } => CommandKind::Rotate,
            Action::Grab => CommandKind::Grab,
            Action::Release => CommandKind::Release,
            Action::Charge => CommandKind::Charge,
        }
    }

    /// Status the robot is left in once the action is applied
    pub fn terminal_status(&self) -> RobotStatus {
        match self {
            Action::Move { .. } => RobotStatus::Moving,
            Action::Stop => RobotStatus::Idle,
            Action::Rotate { .. } => RobotStatus::Rotating,
            Action::Grab => RobotStatus::Grabbing,
            Action::Release => RobotStatus::Releasing,
            Action::Charge => RobotStatus::Charging,
        }
    }

    fn battery_effect(&self) -> BatteryEffect {
        match self {
            Action::Move { distance, .. } => BatteryEffect::Drain(distance * 2.0),
            Action::Stop => BatteryEffect::Drain(0.0),
            Action::Rotate { degrees } => BatteryEffect::Drain(degrees.abs() / 90.0),
            Action::Grab => BatteryEffect::Drain(5.0),
            Action::Release => BatteryEffect::Drain(2.0),
            Action::Charge => BatteryEffect::Recharge,
        }
    }
}

/// Outcome of a successfully applied command
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub action: Action,
    pub status: RobotStatus,
    pub battery_level: f64,
}

/// Wire record describing the outcome of a command
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degrees: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RobotStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_battery_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_commands: Option<Vec<String>>,
}

impl From<&Executed> for CommandResult {
    fn from(executed: &Executed) -> Self {
        let mut result = CommandResult {
            success: true,
            action: Some(executed.action.kind().as_str().to_string()),
            status: Some(executed.status),
            new_battery_level: Some(executed.battery_level),
            ..Default::default()
        };
        match &executed.action {
            Action::Move { direction, distance } => {
                result.direction = Some(direction.as_str().to_string());
                result.distance = Some(*distance);
            }
            Action::Rotate { degrees } => result.degrees = Some(*degrees),
            Action::Stop | Action::Grab | Action::Release | Action::Charge => {}
        }
        result
    }
}

impl From<&CommandError> for CommandResult {
    fn from(err: &CommandError) -> Self {
        let available_commands = match err {
            CommandError::UnknownCommand(_) => Some(CommandKind::names()),
            _ => None,
        };
        CommandResult {
            success: false,
            error: Some(err.to_string()),
            available_commands,
            ..Default::default()
        }
    }
}

/// Apply a command to a snapshot.
///
/// Returns the next snapshot and what was done, or the reason the command was
/// rejected. `snapshot` itself is never modified.
pub fn apply(
    snapshot: &RobotSnapshot,
    name: &str,
    params: &Parameters,
) -> Result<(RobotSnapshot, Executed), CommandError> {
    let kind = CommandKind::parse(name)?;

    if snapshot.is_depleted() && kind != CommandKind::Charge {
        return Err(CommandError::BatteryDepleted);
    }

    let action = validate(kind, snapshot, params)?;

    let mut next = snapshot.clone();
    next.status = action.terminal_status();
    next.battery_level = match action.battery_effect() {
        BatteryEffect::Drain(cost) => limits::clamp_battery(next.battery_level - cost),
        BatteryEffect::Recharge => limits::BATTERY_MAX,
    };

    let executed = Executed {
        action,
        status: next.status,
        battery_level: next.battery_level,
    };
    Ok((next, executed))
}

/// Execute a command, folding any rejection into the result record.
///
/// On rejection the returned snapshot equals the input.
pub fn execute(
    snapshot: &RobotSnapshot,
    name: &str,
    params: &Parameters,
) -> (RobotSnapshot, CommandResult) {
    match apply(snapshot, name, params) {
        Ok((next, executed)) => (next, CommandResult::from(&executed)),
        Err(err) => (snapshot.clone(), CommandResult::from(&err)),
    }
}

/// Resolve parameters and check command-specific preconditions
fn validate(
    kind: CommandKind,
    snapshot: &RobotSnapshot,
    params: &Parameters,
) -> Result<Action, CommandError> {
    match kind {
        CommandKind::Move => {
            let direction = match params.get("direction") {
                None => Direction::Forward,
                Some(Value::String(name)) => {
                    Direction::parse(name).ok_or_else(CommandError::invalid_direction)?
                }
                Some(_) => return Err(CommandError::invalid_direction()),
            };
            let distance = number_param(params, "distance", 1.0)?;
            Ok(Action::Move { direction, distance })
        }
        CommandKind::Stop => Ok(Action::Stop),
        CommandKind::Rotate => {
            let degrees = number_param(params, "degrees", 90.0)?;
            Ok(Action::Rotate { degrees })
        }
        CommandKind::Grab | CommandKind::Release => {
            if !snapshot.supports_manipulation() {
                return Err(CommandError::UnsupportedForType(kind));
            }
            Ok(if kind == CommandKind::Grab {
                Action::Grab
            } else {
                Action::Release
            })
        }
        CommandKind::Charge => Ok(Action::Charge),
    }
}

/// Only a missing key takes the default; an explicit `null` is rejected
fn number_param(params: &Parameters, key: &str, default: f64) -> Result<f64, CommandError> {
    match params.get(key) {
        None => Ok(default),
        Some(value) => value
            .as_f64()
            .ok_or_else(|| CommandError::invalid_number(key)),
    }
}
