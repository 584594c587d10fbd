//! Node health handler

use super::HandlerContext;
use chrono::{SecondsFormat, Utc};
use robofleet_shared::Response;
use tracing::debug;

/// Handle NODE_HEALTH request
///
/// Always answers; a node that can read the request is healthy.
pub async fn handle_node_health(ctx: &HandlerContext) -> Response {
    debug!("Health check on {}", ctx.node_id);

    Response::NodeHealth {
        status: "healthy".into(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        version: env!("CARGO_PKG_VERSION").into(),
    }
}
