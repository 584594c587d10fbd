//! Request handlers for each request kind

mod calibrate;
mod control;
mod fleet;
mod status;

pub use calibrate::{handle_calibrate, handle_sensor_health};
pub use control::handle_command;
pub use fleet::{handle_delete, handle_get, handle_list, handle_register};
pub use status::handle_node_health;

use crate::registry::{FleetRegistry, RegistryError};
use rand::rngs::StdRng;
use robofleet_shared::{CalibrationEngine, Response};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// Calibration engine shared by all sessions
pub type SharedCalibrator = Arc<Mutex<CalibrationEngine<StdRng>>>;

/// Context passed to request handlers
#[derive(Clone)]
pub struct HandlerContext {
    pub node_id: String,
    pub registry: Arc<FleetRegistry>,
    pub calibrator: SharedCalibrator,
}

/// Turn a registry failure into an error response
fn registry_error(err: RegistryError) -> Response {
    match &err {
        RegistryError::NotFound { id } => warn!("Request rejected: no robot with id {}", id),
        other => warn!("Request rejected: {}", other),
    }
    Response::error(err.code(), err.to_string())
}
