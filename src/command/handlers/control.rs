//! Robot command handler

use super::{registry_error, HandlerContext};
use robofleet_shared::{state_machine, ErrorCode, Parameters, Response};
use tracing::{info, warn};

/// Handle COMMAND request
///
/// The command runs against the robot's stored snapshot while the registry
/// holds that robot's lock, and the resulting snapshot is written back
/// whether or not the command succeeded.
pub async fn handle_command(
    ctx: &HandlerContext,
    id: &str,
    command: Option<&str>,
    parameters: &Parameters,
) -> Response {
    // Unknown robot is reported before a missing command
    let robot = match ctx.registry.get(id).await {
        Ok(robot) => robot,
        Err(e) => return registry_error(e),
    };

    let command = match command {
        Some(c) if !c.is_empty() => c,
        _ => {
            warn!("Command request for {} without a command", robot.id);
            return Response::error(ErrorCode::BadRequest, "Command is required");
        }
    };

    let outcome = ctx
        .registry
        .update(id, |snapshot| {
            let (next, result) = state_machine::execute(snapshot, command, parameters);
            *snapshot = next;
            result
        })
        .await;

    match outcome {
        Ok(result) => {
            if result.success {
                info!("Executed command '{}' on robot {}", command, id);
            } else {
                warn!(
                    "Command '{}' on robot {} rejected: {}",
                    command,
                    id,
                    result.error.as_deref().unwrap_or("unknown reason")
                );
            }
            Response::CommandResult(result)
        }
        Err(e) => registry_error(e),
    }
}
