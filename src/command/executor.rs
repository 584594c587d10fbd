//! Request executor - dispatches incoming requests and builds responses

use super::handlers::{self, HandlerContext, SharedCalibrator};
use crate::registry::FleetRegistry;
use rand::rngs::StdRng;
use robofleet_shared::{
    now_ms, CalibrationEngine, Envelope, ErrorCode, Payload, Request, Response,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Executes requests received from consoles
pub struct RequestExecutor {
    node_id: String,
    sequence_id: AtomicU64,
    registry: Arc<FleetRegistry>,
    calibrator: SharedCalibrator,
}

impl RequestExecutor {
    pub fn new(
        node_id: String,
        registry: Arc<FleetRegistry>,
        calibrator: CalibrationEngine<StdRng>,
    ) -> Self {
        Self {
            node_id,
            sequence_id: AtomicU64::new(0),
            registry,
            calibrator: Arc::new(Mutex::new(calibrator)),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn registry(&self) -> &Arc<FleetRegistry> {
        &self.registry
    }

    /// Execute the request in `envelope` and return the response envelope
    pub async fn execute(&self, envelope: &Envelope) -> Envelope {
        let start_time = now_ms();
        let header = &envelope.header;

        let response = match &envelope.payload {
            Payload::Request(request) => {
                debug!(
                    "Executing request: seq={} kind={} from={}",
                    header.sequence_id,
                    request.name(),
                    header.sender_id
                );
                self.dispatch(request).await
            }
            Payload::Response(_) => {
                warn!(
                    "Received a response from {} (seq={}), expected a request",
                    header.sender_id, header.sequence_id
                );
                Response::error(ErrorCode::BadRequest, "Expected a request")
            }
        };

        debug!(
            "  Request seq={} answered in {}ms",
            header.sequence_id,
            now_ms().saturating_sub(start_time)
        );
        self.reply(header.sequence_id, response)
    }

    /// Wrap a response in an envelope acknowledging `ack_sequence_id`
    pub fn reply(&self, ack_sequence_id: u64, response: Response) -> Envelope {
        let seq = self.sequence_id.fetch_add(1, Ordering::SeqCst) + 1;
        Envelope::response(&self.node_id, seq, ack_sequence_id, response)
    }

    async fn dispatch(&self, request: &Request) -> Response {
        let ctx = HandlerContext {
            node_id: self.node_id.clone(),
            registry: self.registry.clone(),
            calibrator: self.calibrator.clone(),
        };

        match request {
            Request::NodeHealth => handlers::handle_node_health(&ctx).await,
            Request::RegisterRobot {
                name,
                robot_type,
                location,
            } => {
                handlers::handle_register(&ctx, name.clone(), robot_type.clone(), location.clone())
                    .await
            }
            Request::ListRobots => handlers::handle_list(&ctx).await,
            Request::GetRobot { id } => handlers::handle_get(&ctx, id).await,
            Request::Command {
                id,
                command,
                parameters,
            } => handlers::handle_command(&ctx, id, command.as_deref(), parameters).await,
            Request::Calibrate { id } => handlers::handle_calibrate(&ctx, id).await,
            Request::SensorHealth { id } => handlers::handle_sensor_health(&ctx, id).await,
            Request::DeleteRobot { id } => handlers::handle_delete(&ctx, id).await,
        }
    }
}
