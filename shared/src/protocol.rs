//! Wire protocol between the operator console and a fleet node
//!
//! Every frame carries one [`Envelope`]. Requests flow console -> node;
//! the node answers each with exactly one response whose header acknowledges
//! the request's sequence id.

use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationReport, HealthReport};
use crate::model::RobotSnapshot;
use crate::now_ms;
use crate::state_machine::{CommandResult, Parameters};

/// Message metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Console id on requests, node id on responses
    pub sender_id: String,
    pub sequence_id: u64,
    /// Sequence id of the request this message answers, or
    /// [`Header::UNREADABLE_ACK`] when the request frame could not be decoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_sequence_id: Option<u64>,
    pub timestamp_ms: u64,
}

impl Header {
    /// Acknowledges a frame whose sequence id is unknown. Consoles number
    /// requests from 1, so no real request carries it.
    pub const UNREADABLE_ACK: u64 = 0;

    pub fn new(sender_id: impl Into<String>, sequence_id: u64) -> Self {
        Self {
            sender_id: sender_id.into(),
            sequence_id,
            ack_sequence_id: None,
            timestamp_ms: now_ms(),
        }
    }

    pub fn ack(sender_id: impl Into<String>, sequence_id: u64, ack_sequence_id: u64) -> Self {
        Self {
            ack_sequence_id: Some(ack_sequence_id),
            ..Self::new(sender_id, sequence_id)
        }
    }
}

/// Operations a console can ask of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Request {
    /// Liveness probe for the node itself
    NodeHealth,
    RegisterRobot {
        name: Option<String>,
        #[serde(rename = "type")]
        robot_type: Option<String>,
        location: Option<String>,
    },
    ListRobots,
    GetRobot {
        id: String,
    },
    Command {
        id: String,
        command: Option<String>,
        #[serde(default)]
        parameters: Parameters,
    },
    Calibrate {
        id: String,
    },
    /// Health check over a robot's stored sensor readings
    SensorHealth {
        id: String,
    },
    DeleteRobot {
        id: String,
    },
}

impl Request {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Request::NodeHealth => "node_health",
            Request::RegisterRobot { .. } => "register_robot",
            Request::ListRobots => "list_robots",
            Request::GetRobot { .. } => "get_robot",
            Request::Command { .. } => "command",
            Request::Calibrate { .. } => "calibrate",
            Request::SensorHealth { .. } => "sensor_health",
            Request::DeleteRobot { .. } => "delete_robot",
        }
    }
}

/// Class of a request-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    BadRequest,
}

/// Node answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
    NodeHealth {
        status: String,
        timestamp: String,
        version: String,
    },
    Robot(RobotSnapshot),
    Robots {
        robots: Vec<RobotSnapshot>,
    },
    CommandResult(CommandResult),
    Calibration(CalibrationReport),
    SensorHealth(HealthReport),
    Deleted {
        id: String,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl Response {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Response::Error {
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}

/// Frame body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    Request(Request),
    Response(Response),
}

/// One framed message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub header: Header,
    pub payload: Payload,
}

impl Envelope {
    pub fn request(sender_id: impl Into<String>, sequence_id: u64, request: Request) -> Self {
        Self {
            header: Header::new(sender_id, sequence_id),
            payload: Payload::Request(request),
        }
    }

    /// Build the response to a request with sequence id `ack_sequence_id`
    pub fn response(
        sender_id: impl Into<String>,
        sequence_id: u64,
        ack_sequence_id: u64,
        response: Response,
    ) -> Self {
        Self {
            header: Header::ack(sender_id, sequence_id, ack_sequence_id),
            payload: Payload::Response(response),
        }
    }
}
