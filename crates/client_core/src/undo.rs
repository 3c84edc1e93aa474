use std::sync::Arc;

use shared::{
    domain::{Appointment, AppointmentId, AppointmentStatus},
    protocol::UpdateAppointmentRequest,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    commit::RevertDescriptor,
    notify::{Notification, Notifier},
    store::AppointmentStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UndoFamily {
    Reschedule,
    Cancellation,
}

/// Pre-image of the most recent mutation in a family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoDescriptor {
    Reschedule(RevertDescriptor),
    Cancellation {
        appointment_id: AppointmentId,
        original_status: AppointmentStatus,
        original_notes: Option<String>,
    },
}

impl UndoDescriptor {
    pub fn family(&self) -> UndoFamily {
        match self {
            Self::Reschedule(_) => UndoFamily::Reschedule,
            Self::Cancellation { .. } => UndoFamily::Cancellation,
        }
    }

    pub fn appointment_id(&self) -> AppointmentId {
        match self {
            Self::Reschedule(revert) => revert.appointment_id,
            Self::Cancellation { appointment_id, .. } => *appointment_id,
        }
    }

    /// Update that restores the pre-image. It goes through the server's conflict check
    /// like any other write: a slot taken in the meantime makes the undo fail.
    pub fn inverse_request(&self) -> UpdateAppointmentRequest {
        match self {
            Self::Reschedule(revert) => UpdateAppointmentRequest::reschedule(revert.original),
            Self::Cancellation {
                original_status,
                original_notes,
                ..
            } => UpdateAppointmentRequest {
                status: Some(*original_status),
                notes: Some(original_notes.clone()),
                ..UpdateAppointmentRequest::default()
            },
        }
    }
}

#[derive(Debug)]
pub enum UndoOutcome {
    Restored(Appointment),
    NothingToUndo,
    /// The inverse update failed. The descriptor is gone either way.
    Failed(String),
}

#[derive(Default)]
struct UndoSlots {
    reschedule: Option<UndoDescriptor>,
    cancellation: Option<UndoDescriptor>,
}

impl UndoSlots {
    fn slot(&mut self, family: UndoFamily) -> &mut Option<UndoDescriptor> {
        match family {
            UndoFamily::Reschedule => &mut self.reschedule,
            UndoFamily::Cancellation => &mut self.cancellation,
        }
    }
}

/// One pending inverse mutation per [`UndoFamily`]. In-memory only.
///
/// Recording into an occupied slot replaces the older descriptor, and that earlier
/// mutation can no longer be undone.
pub struct UndoLedger {
    store: Arc<AppointmentStore>,
    notifier: Arc<dyn Notifier>,
    slots: Mutex<UndoSlots>,
}

impl UndoLedger {
    pub fn new(store: Arc<AppointmentStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            slots: Mutex::new(UndoSlots::default()),
        }
    }

    /// Installs `descriptor`, returning whichever descriptor it displaced.
    pub async fn record(&self, descriptor: UndoDescriptor) -> Option<UndoDescriptor> {
        let family = descriptor.family();
        let appointment_id = descriptor.appointment_id();
        let replaced = self.slots.lock().await.slot(family).replace(descriptor);
        if let Some(previous) = &replaced {
            debug!(
                ?family,
                appointment_id = appointment_id.0,
                forfeited_appointment_id = previous.appointment_id().0,
                "undo slot overwritten"
            );
        }
        replaced
    }

    pub async fn pending(&self, family: UndoFamily) -> Option<UndoDescriptor> {
        self.slots.lock().await.slot(family).clone()
    }

    pub async fn clear(&self) {
        *self.slots.lock().await = UndoSlots::default();
    }

    pub async fn undo(&self, family: UndoFamily) -> UndoOutcome {
        let Some(descriptor) = self.slots.lock().await.slot(family).take() else {
            return UndoOutcome::NothingToUndo;
        };
        let appointment_id = descriptor.appointment_id();

        match self
            .store
            .update(appointment_id, &descriptor.inverse_request())
            .await
        {
            Ok(restored) => {
                info!(?family, appointment_id = appointment_id.0, "mutation undone");
                self.notifier.notify(Notification::info(match family {
                    UndoFamily::Reschedule => "Appointment moved back",
                    UndoFamily::Cancellation => "Cancellation undone",
                }));
                UndoOutcome::Restored(restored)
            }
            Err(err) => {
                warn!(
                    ?family,
                    appointment_id = appointment_id.0,
                    error = %err,
                    "undo failed"
                );
                let message = format!("Could not undo: {err}");
                self.notifier.notify(Notification::error(message.clone()));
                UndoOutcome::Failed(message)
            }
        }
    }

    /// Keyboard-shortcut undo: a pending cancellation wins over a pending reschedule.
    pub async fn undo_latest(&self) -> UndoOutcome {
        let family = {
            let slots = self.slots.lock().await;
            if slots.cancellation.is_some() {
                UndoFamily::Cancellation
            } else {
                UndoFamily::Reschedule
            }
        };
        self.undo(family).await
    }
}

#[cfg(test)]
#[path = "tests/undo_tests.rs"]
mod tests;
