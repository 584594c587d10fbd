//! Sensor calibration and sensor health handlers

use super::{registry_error, HandlerContext};
use robofleet_shared::{validate_health, Response};
use tracing::{info, warn};

/// Handle CALIBRATE request
///
/// Runs a calibration and merges the readings into the stored snapshot.
pub async fn handle_calibrate(ctx: &HandlerContext, id: &str) -> Response {
    let robot = match ctx.registry.get(id).await {
        Ok(robot) => robot,
        Err(e) => return registry_error(e),
    };

    let report = ctx.calibrator.lock().await.calibrate(&robot);

    if let Err(e) = ctx
        .registry
        .update(id, |snapshot| *snapshot = report.apply_to(snapshot))
        .await
    {
        // robot removed while calibrating
        return registry_error(e);
    }

    if report.has_warnings() {
        for warning in &report.warnings {
            warn!("Calibration warning on {}: {}", id, warning);
        }
        warn!(
            "Calibrated sensors for robot {} with {} warnings",
            id,
            report.warnings.len()
        );
    } else {
        info!("Calibrated sensors for robot {}", id);
    }
    Response::Calibration(report)
}

/// Handle SENSOR_HEALTH request
pub async fn handle_sensor_health(ctx: &HandlerContext, id: &str) -> Response {
    match ctx.registry.get(id).await {
        Ok(robot) => {
            let health = validate_health(&robot.sensors);
            info!(
                "Sensor health for {}: healthy={} issues={}",
                id,
                health.healthy,
                health.issues.len()
            );
            Response::SensorHealth(health)
        }
        Err(e) => registry_error(e),
    }
}
