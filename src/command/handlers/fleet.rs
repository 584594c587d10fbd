//! Fleet membership handlers (register, list, get, delete)

use super::{registry_error, HandlerContext};
use robofleet_shared::Response;
use tracing::info;

/// Handle REGISTER_ROBOT request
pub async fn handle_register(
    ctx: &HandlerContext,
    name: Option<String>,
    robot_type: Option<String>,
    location: Option<String>,
) -> Response {
    match ctx.registry.register(name, robot_type, location).await {
        Ok(robot) => Response::Robot(robot),
        Err(e) => registry_error(e),
    }
}

/// Handle LIST_ROBOTS request
pub async fn handle_list(ctx: &HandlerContext) -> Response {
    let robots = ctx.registry.list().await;
    info!("Listed {} robots", robots.len());
    Response::Robots { robots }
}

/// Handle GET_ROBOT request
pub async fn handle_get(ctx: &HandlerContext, id: &str) -> Response {
    match ctx.registry.get(id).await {
        Ok(robot) => Response::Robot(robot),
        Err(e) => registry_error(e),
    }
}

/// Handle DELETE_ROBOT request
pub async fn handle_delete(ctx: &HandlerContext, id: &str) -> Response {
    match ctx.registry.delete(id).await {
        Ok(()) => Response::Deleted { id: id.to_string() },
        Err(e) => registry_error(e),
    }
}
