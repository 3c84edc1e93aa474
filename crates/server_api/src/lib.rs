use chrono::{DateTime, Utc};
use shared::{
    domain::{Appointment, AppointmentId, AppointmentStatus, TimeWindow, WorkspaceId},
    error::{ApiError, ErrorCode},
    protocol::{CreateAppointmentRequest, UpdateAppointmentRequest},
};
use storage::{NewAppointment, Storage};
use tracing::{info, warn};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

pub fn appointments_route() -> &'static str {
    "/appointments"
}

pub fn appointment_route() -> &'static str {
    "/appointments/:appointment_id"
}

pub async fn list_appointments(
    ctx: &ApiContext,
    workspace_id: WorkspaceId,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<Vec<Appointment>, ApiError> {
    let range = match (from, to) {
        (Some(from), Some(to)) => Some(window(from, to)?),
        (None, None) => None,
        _ => {
            return Err(ApiError::validation(
                "`from` and `to` must be supplied together",
            ))
        }
    };
    ctx.storage
        .list_appointments(workspace_id, range)
        .await
        .map_err(internal)
}

pub async fn get_appointment(
    ctx: &ApiContext,
    appointment_id: AppointmentId,
) -> Result<Appointment, ApiError> {
    ctx.storage
        .get_appointment(appointment_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(appointment_id))
}

pub async fn create_appointment(
    ctx: &ApiContext,
    req: CreateAppointmentRequest,
) -> Result<Appointment, ApiError> {
    let proposed = window(req.scheduled_start, req.scheduled_end)?;
    if !req.allow_conflicts {
        ensure_no_conflicts(ctx, req.workspace_id, proposed, None).await?;
    }

    let created = ctx
        .storage
        .create_appointment(NewAppointment {
            workspace_id: req.workspace_id,
            client_id: req.client_id,
            window: proposed,
            status: AppointmentStatus::Scheduled,
            location_type: req.location_type,
            location_details: req.location_details,
            notes: req.notes,
        })
        .await
        .map_err(internal)?;
    info!(
        appointment_id = created.id.0,
        workspace_id = created.workspace_id.0,
        overridden = req.allow_conflicts,
        "appointment created"
    );
    Ok(created)
}

/// Applies a partial update. Moving a scheduled appointment, or bringing one back to
/// `scheduled`, is rejected with [`ErrorCode::Conflict`] when it would overlap another
/// scheduled appointment, unless the request carries the override flag.
pub async fn update_appointment(
    ctx: &ApiContext,
    appointment_id: AppointmentId,
    req: UpdateAppointmentRequest,
) -> Result<Appointment, ApiError> {
    let current = get_appointment(ctx, appointment_id).await?;

    let mut next = current.clone();
    if let Some(start) = req.scheduled_start {
        next.scheduled_start = start;
    }
    if let Some(end) = req.scheduled_end {
        next.scheduled_end = end;
    }
    if let Some(status) = req.status {
        next.status = status;
    }
    if let Some(location_type) = req.location_type {
        next.location_type = location_type;
    }
    if let Some(details) = req.location_details {
        next.location_details = Some(details);
    }
    if let Some(notes) = req.notes {
        next.notes = notes;
    }

    let proposed = window(next.scheduled_start, next.scheduled_end)?;
    let moved = proposed != current.window();
    let reactivated = !current.status.blocks_time() && next.status.blocks_time();
    if next.status.blocks_time() && (moved || reactivated) && !req.allow_conflicts {
        ensure_no_conflicts(ctx, next.workspace_id, proposed, Some(appointment_id)).await?;
    }

    let stored = persist(ctx, &next).await?;
    info!(
        appointment_id = appointment_id.0,
        status = stored.status.as_str(),
        moved,
        overridden = req.allow_conflicts,
        "appointment updated"
    );
    Ok(stored)
}

pub async fn delete_appointment(
    ctx: &ApiContext,
    appointment_id: AppointmentId,
) -> Result<(), ApiError> {
    let deleted = ctx
        .storage
        .delete_appointment(appointment_id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(not_found(appointment_id));
    }
    info!(appointment_id = appointment_id.0, "appointment deleted");
    Ok(())
}

async fn ensure_no_conflicts(
    ctx: &ApiContext,
    workspace_id: WorkspaceId,
    proposed: TimeWindow,
    exclude: Option<AppointmentId>,
) -> Result<(), ApiError> {
    let conflicts = ctx
        .storage
        .find_overlapping(workspace_id, proposed, exclude)
        .await
        .map_err(internal)?;
    if conflicts.is_empty() {
        return Ok(());
    }
    warn!(
        workspace_id = workspace_id.0,
        conflicts = conflicts.len(),
        "scheduling conflict rejected"
    );
    Err(ApiError::conflict(conflicts))
}

fn window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<TimeWindow, ApiError> {
    TimeWindow::new(start, end).map_err(|e| ApiError::validation(e.to_string()))
}

/// A row deleted after it was read reports `NotFound`, like any unknown id.
async fn persist(ctx: &ApiContext, appointment: &Appointment) -> Result<Appointment, ApiError> {
    ctx.storage
        .update_appointment(appointment)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(appointment.id))
}

fn not_found(appointment_id: AppointmentId) -> ApiError {
    ApiError::not_found(format!("appointment {} not found", appointment_id.0))
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
