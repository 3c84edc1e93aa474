//! Two-phase persistence of calendar mutations: issue the write, then either install
//! an undo descriptor or hand back what the caller needs to compensate.

use std::{sync::Arc, time::Duration};

use shared::{
    domain::{Appointment, AppointmentId, AppointmentStatus, TimeWindow},
    protocol::{ConflictReport, UpdateAppointmentRequest},
};
use tracing::{debug, info, warn};

use crate::{
    error::ClientError,
    notify::{Notification, NotificationAction, Notifier},
    store::AppointmentStore,
    undo::{UndoDescriptor, UndoFamily, UndoLedger},
};

/// Where an appointment sat before a gesture moved it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevertDescriptor {
    pub appointment_id: AppointmentId,
    pub original: TimeWindow,
}

impl RevertDescriptor {
    pub fn of(appointment: &Appointment) -> Self {
        Self {
            appointment_id: appointment.id,
            original: appointment.window(),
        }
    }
}

/// Server-reported overlap awaiting the user's "keep both" or "cancel".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConflict {
    pub revert: RevertDescriptor,
    pub report: ConflictReport,
}

#[derive(Debug)]
pub enum RescheduleOutcome {
    Committed(Appointment),
    Conflict(PendingConflict),
    /// The appointment disappeared before the write landed.
    NotFound,
    Failed {
        revert: RevertDescriptor,
        message: String,
    },
}

pub struct RescheduleFlow {
    store: Arc<AppointmentStore>,
    ledger: Arc<UndoLedger>,
    notifier: Arc<dyn Notifier>,
    undo_window: Duration,
}

impl RescheduleFlow {
    pub fn new(
        store: Arc<AppointmentStore>,
        ledger: Arc<UndoLedger>,
        notifier: Arc<dyn Notifier>,
        undo_window: Duration,
    ) -> Self {
        Self {
            store,
            ledger,
            notifier,
            undo_window,
        }
    }

    pub async fn attempt_reschedule(
        &self,
        appointment_id: AppointmentId,
        proposed: TimeWindow,
    ) -> RescheduleOutcome {
        let Some(current) = self.store.get(appointment_id).await else {
            debug!(
                appointment_id = appointment_id.0,
                "reschedule target vanished; aborting"
            );
            return RescheduleOutcome::NotFound;
        };
        self.submit(RevertDescriptor::of(&current), proposed, false)
            .await
    }

    /// "Keep both": re-issues the pending write with the conflict override.
    pub async fn confirm_with_override(&self, pending: PendingConflict) -> RescheduleOutcome {
        self.submit(pending.revert, pending.report.proposed, true)
            .await
    }

    async fn submit(
        &self,
        revert: RevertDescriptor,
        proposed: TimeWindow,
        allow_conflicts: bool,
    ) -> RescheduleOutcome {
        let appointment_id = revert.appointment_id;
        let request = UpdateAppointmentRequest::reschedule(proposed).with_override(allow_conflicts);

        match self.store.update(appointment_id, &request).await {
            Ok(updated) => {
                self.ledger.record(UndoDescriptor::Reschedule(revert)).await;
                info!(
                    appointment_id = appointment_id.0,
                    overridden = allow_conflicts,
                    "appointment rescheduled"
                );
                self.notifier.notify(
                    Notification::success("Appointment moved")
                        .with_action(NotificationAction::Undo(UndoFamily::Reschedule))
                        .dismiss_after(self.undo_window),
                );
                RescheduleOutcome::Committed(updated)
            }
            Err(ClientError::Conflict(conflicts)) => {
                info!(
                    appointment_id = appointment_id.0,
                    conflicts = conflicts.len(),
                    "reschedule needs conflict confirmation"
                );
                RescheduleOutcome::Conflict(PendingConflict {
                    revert,
                    report: ConflictReport {
                        proposed,
                        conflicts,
                    },
                })
            }
            Err(ClientError::NotFound(_)) => {
                debug!(
                    appointment_id = appointment_id.0,
                    "reschedule target deleted concurrently"
                );
                RescheduleOutcome::NotFound
            }
            Err(err) => {
                warn!(appointment_id = appointment_id.0, error = %err, "reschedule failed");
                let message = format!("Could not move appointment: {err}");
                self.notifier.notify(Notification::error(message.clone()));
                RescheduleOutcome::Failed { revert, message }
            }
        }
    }
}

#[derive(Debug)]
pub enum CancellationOutcome {
    Cancelled(Appointment),
    AlreadyCancelled,
    NotFound,
    Failed(String),
}

pub struct CancellationFlow {
    store: Arc<AppointmentStore>,
    ledger: Arc<UndoLedger>,
    notifier: Arc<dyn Notifier>,
    undo_window: Duration,
}

impl CancellationFlow {
    pub fn new(
        store: Arc<AppointmentStore>,
        ledger: Arc<UndoLedger>,
        notifier: Arc<dyn Notifier>,
        undo_window: Duration,
    ) -> Self {
        Self {
            store,
            ledger,
            notifier,
            undo_window,
        }
    }

    /// Marks the appointment cancelled, appending `reason` to its notes.
    pub async fn cancel_appointment(
        &self,
        appointment_id: AppointmentId,
        reason: Option<&str>,
    ) -> CancellationOutcome {
        let Some(current) = self.store.get(appointment_id).await else {
            return CancellationOutcome::NotFound;
        };
        if current.status == AppointmentStatus::Cancelled {
            return CancellationOutcome::AlreadyCancelled;
        }

        let request = UpdateAppointmentRequest {
            status: Some(AppointmentStatus::Cancelled),
            notes: reason.map(|reason| Some(notes_with_reason(current.notes.as_deref(), reason))),
            ..UpdateAppointmentRequest::default()
        };

        match self.store.update(appointment_id, &request).await {
            Ok(updated) => {
                self.ledger
                    .record(UndoDescriptor::Cancellation {
                        appointment_id,
                        original_status: current.status,
                        original_notes: current.notes,
                    })
                    .await;
                info!(appointment_id = appointment_id.0, "appointment cancelled");
                self.notifier.notify(
                    Notification::success("Appointment cancelled")
                        .with_action(NotificationAction::Undo(UndoFamily::Cancellation))
                        .dismiss_after(self.undo_window),
                );
                CancellationOutcome::Cancelled(updated)
            }
            Err(ClientError::NotFound(_)) => CancellationOutcome::NotFound,
            Err(err) => {
                warn!(appointment_id = appointment_id.0, error = %err, "cancellation failed");
                let message = format!("Could not cancel appointment: {err}");
                self.notifier.notify(Notification::error(message.clone()));
                CancellationOutcome::Failed(message)
            }
        }
    }
}

fn notes_with_reason(existing: Option<&str>, reason: &str) -> String {
    match existing.map(str::trim_end).filter(|notes| !notes.is_empty()) {
        Some(notes) => format!("{notes}\nCancellation reason: {reason}"),
        None => format!("Cancellation reason: {reason}"),
    }
}

#[cfg(test)]
#[path = "tests/commit_tests.rs"]
mod tests;
