//! Drag and keyboard reschedule gestures.
//!
//! ```text
//! Idle -> Dragging | KeyboardRescheduling -> confirm -> Idle
//!                                                    \-> ConflictPending -> keep both -> Idle
//!                                                                        \-> cancel    -> Idle
//! ```
//!
//! Only one gesture exists at a time. Starting another while one is active is ignored.
//! The ghost overlays [`AppointmentStore::snapshot`] in [`RescheduleController::visible_events`].
//! The store itself changes only when the commit flow succeeds.

use std::sync::Arc;

use shared::{
    domain::{Appointment, AppointmentId, AppointmentStatus, TimeWindow},
    protocol::ConflictReport,
};
use tracing::{debug, info};

use crate::{
    commit::{PendingConflict, RescheduleFlow, RescheduleOutcome, RevertDescriptor},
    geometry::{
        apply_offset, GridCell, GridOffset, ScreenPoint, TimeGridGeometry, KEYBOARD_SLOT_MINUTES,
    },
    input::{Key, KeyInput},
    store::AppointmentStore,
    undo::{UndoLedger, UndoOutcome},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Pointer,
    Keyboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionPhase {
    Idle,
    Dragging,
    KeyboardRescheduling,
    ConflictPending,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureDelta {
    /// Current pointer position. The offset is measured from the cell where the drag began.
    PointerAt(ScreenPoint),
    /// One keyboard increment, added to the offset accumulated so far.
    Step(GridOffset),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    KeepBoth,
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    pub kind: GestureKind,
    pub revert: RevertDescriptor,
    origin: Option<GridCell>,
    pub ghost: Option<ScreenPoint>,
    pub offset: GridOffset,
    pub candidate: TimeWindow,
    pub has_conflict: bool,
}

impl DragState {
    pub fn appointment_id(&self) -> AppointmentId {
        self.revert.appointment_id
    }
}

enum Interaction {
    Idle,
    Active(DragState),
    ConflictPending {
        drag: DragState,
        pending: PendingConflict,
    },
}

#[derive(Debug)]
pub enum ConfirmOutcome {
    Committed(Appointment),
    ConflictPending(ConflictReport),
    /// The user backed out. The ghost snaps back to `original`.
    Cancelled(RevertDescriptor),
    /// The write failed. The ghost snaps back and the error has been surfaced.
    Reverted {
        revert: RevertDescriptor,
        message: String,
    },
    /// Dropped where it started, so no request was sent.
    Unchanged,
    /// The appointment was deleted while the gesture was in flight.
    Vanished,
    /// Nothing to confirm in the current phase.
    Ignored,
}

#[derive(Debug)]
pub enum KeyOutcome {
    Moved(TimeWindow),
    Confirmed(ConfirmOutcome),
    Cancelled(RevertDescriptor),
    Undo(UndoOutcome),
    Ignored,
}

/// One rendered calendar entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub appointment_id: AppointmentId,
    pub window: TimeWindow,
    pub status: AppointmentStatus,
    /// Drawn at the gesture's candidate position instead of the stored one.
    pub ghost: bool,
    pub conflicted: bool,
}

pub struct RescheduleController {
    geometry: Arc<dyn TimeGridGeometry>,
    store: Arc<AppointmentStore>,
    flow: RescheduleFlow,
    ledger: Arc<UndoLedger>,
    interaction: Interaction,
}

impl RescheduleController {
    pub fn new(
        geometry: Arc<dyn TimeGridGeometry>,
        store: Arc<AppointmentStore>,
        flow: RescheduleFlow,
        ledger: Arc<UndoLedger>,
    ) -> Self {
        Self {
            geometry,
            store,
            flow,
            ledger,
            interaction: Interaction::Idle,
        }
    }

    pub fn phase(&self) -> InteractionPhase {
        match &self.interaction {
            Interaction::Idle => InteractionPhase::Idle,
            Interaction::Active(drag) => match drag.kind {
                GestureKind::Pointer => InteractionPhase::Dragging,
                GestureKind::Keyboard => InteractionPhase::KeyboardRescheduling,
            },
            Interaction::ConflictPending { .. } => InteractionPhase::ConflictPending,
        }
    }

    pub fn drag_state(&self) -> Option<&DragState> {
        match &self.interaction {
            Interaction::Idle => None,
            Interaction::Active(drag) | Interaction::ConflictPending { drag, .. } => Some(drag),
        }
    }

    pub fn pending_conflict(&self) -> Option<&ConflictReport> {
        match &self.interaction {
            Interaction::ConflictPending { pending, .. } => Some(&pending.report),
            _ => None,
        }
    }

    /// Pointer-down on an appointment. Returns `false` when the gesture was not started.
    pub async fn begin_drag(&mut self, appointment_id: AppointmentId, at: ScreenPoint) -> bool {
        let Some(origin) = self.geometry.cell_at(at) else {
            debug!(
                appointment_id = appointment_id.0,
                "drag started outside the grid; ignored"
            );
            return false;
        };
        self.begin(appointment_id, GestureKind::Pointer, Some(origin), Some(at))
            .await
    }

    pub async fn begin_keyboard_reschedule(&mut self, appointment_id: AppointmentId) -> bool {
        self.begin(appointment_id, GestureKind::Keyboard, None, None)
            .await
    }

    async fn begin(
        &mut self,
        appointment_id: AppointmentId,
        kind: GestureKind,
        origin: Option<GridCell>,
        ghost: Option<ScreenPoint>,
    ) -> bool {
        if let Some(active) = self.drag_state() {
            debug!(
                appointment_id = appointment_id.0,
                active_appointment_id = active.appointment_id().0,
                "gesture already active; ignoring"
            );
            return false;
        }
        let Some(appointment) = self.store.get(appointment_id).await else {
            debug!(appointment_id = appointment_id.0, "unknown appointment");
            return false;
        };

        let revert = RevertDescriptor::of(&appointment);
        debug!(appointment_id = appointment_id.0, ?kind, "gesture started");
        self.interaction = Interaction::Active(DragState {
            kind,
            revert,
            origin,
            ghost,
            offset: GridOffset::ZERO,
            candidate: revert.original,
            has_conflict: false,
        });
        true
    }

    /// Recomputes the candidate from the gesture's snapshot. Pointer positions outside the
    /// grid keep the last valid candidate. Returns the candidate, or `None` when no
    /// gesture accepts movement.
    pub fn update_candidate(&mut self, delta: GestureDelta) -> Option<TimeWindow> {
        let slot_minutes = self.geometry.slot_minutes();
        let Interaction::Active(drag) = &mut self.interaction else {
            return None;
        };

        match (drag.kind, delta) {
            (GestureKind::Pointer, GestureDelta::PointerAt(point)) => {
                drag.ghost = Some(point);
                if let (Some(origin), Some(cell)) = (drag.origin, self.geometry.cell_at(point)) {
                    drag.offset = GridOffset::between(origin, cell);
                }
                drag.candidate = apply_offset(drag.revert.original, drag.offset, slot_minutes);
            }
            (GestureKind::Keyboard, GestureDelta::Step(step)) => {
                drag.offset = drag.offset + step;
                drag.candidate =
                    apply_offset(drag.revert.original, drag.offset, KEYBOARD_SLOT_MINUTES);
            }
            _ => return None,
        }
        Some(drag.candidate)
    }

    pub fn pointer_move(&mut self, at: ScreenPoint) -> Option<TimeWindow> {
        self.update_candidate(GestureDelta::PointerAt(at))
    }

    /// Pointer-up ends a drag by confirming it.
    pub async fn pointer_up(&mut self) -> ConfirmOutcome {
        match &self.interaction {
            Interaction::Active(drag) if drag.kind == GestureKind::Pointer => self.confirm().await,
            _ => ConfirmOutcome::Ignored,
        }
    }

    /// Hands the candidate to the commit flow. Gesture state is kept until the flow
    /// resolves, then cleared or moved to [`InteractionPhase::ConflictPending`].
    pub async fn confirm(&mut self) -> ConfirmOutcome {
        let Interaction::Active(drag) = &self.interaction else {
            return ConfirmOutcome::Ignored;
        };
        if drag.candidate == drag.revert.original {
            self.interaction = Interaction::Idle;
            return ConfirmOutcome::Unchanged;
        }

        let outcome = self
            .flow
            .attempt_reschedule(drag.appointment_id(), drag.candidate)
            .await;
        self.settle(outcome)
    }

    /// Resolves a server-reported conflict. Does nothing unless one is pending.
    pub async fn resolve_conflict(&mut self, choice: ConflictChoice) -> ConfirmOutcome {
        let Interaction::ConflictPending { pending, .. } = &self.interaction else {
            return ConfirmOutcome::Ignored;
        };

        match choice {
            ConflictChoice::Cancel => match self.cancel() {
                Some(revert) => ConfirmOutcome::Cancelled(revert),
                None => ConfirmOutcome::Ignored,
            },
            ConflictChoice::KeepBoth => {
                let outcome = self.flow.confirm_with_override(pending.clone()).await;
                self.settle(outcome)
            }
        }
    }

    fn settle(&mut self, outcome: RescheduleOutcome) -> ConfirmOutcome {
        let previous = std::mem::replace(&mut self.interaction, Interaction::Idle);
        let drag = match previous {
            Interaction::Active(drag) | Interaction::ConflictPending { drag, .. } => drag,
            Interaction::Idle => return ConfirmOutcome::Ignored,
        };

        match outcome {
            RescheduleOutcome::Committed(appointment) => ConfirmOutcome::Committed(appointment),
            RescheduleOutcome::Conflict(pending) => {
                let report = pending.report.clone();
                self.interaction = Interaction::ConflictPending {
                    drag: DragState {
                        has_conflict: true,
                        ..drag
                    },
                    pending,
                };
                ConfirmOutcome::ConflictPending(report)
            }
            RescheduleOutcome::NotFound => ConfirmOutcome::Vanished,
            RescheduleOutcome::Failed { revert, message } => {
                ConfirmOutcome::Reverted { revert, message }
            }
        }
    }

    /// Abandons the gesture and returns where the appointment belongs. Safe in any phase.
    pub fn cancel(&mut self) -> Option<RevertDescriptor> {
        let previous = std::mem::replace(&mut self.interaction, Interaction::Idle);
        match previous {
            Interaction::Idle => None,
            Interaction::Active(drag) | Interaction::ConflictPending { drag, .. } => {
                debug!(
                    appointment_id = drag.appointment_id().0,
                    "gesture cancelled"
                );
                Some(drag.revert)
            }
        }
    }

    /// The owning view is going away.
    pub fn teardown(&mut self) {
        self.cancel();
    }

    pub async fn handle_key(&mut self, input: KeyInput) -> KeyOutcome {
        if input.is_undo_shortcut() {
            if self.phase() != InteractionPhase::Idle {
                return KeyOutcome::Ignored;
            }
            info!("undo shortcut");
            return KeyOutcome::Undo(self.ledger.undo_latest().await);
        }

        match (self.phase(), input.key) {
            (InteractionPhase::KeyboardRescheduling, _) if input.keyboard_step().is_some() => {
                match input.keyboard_step().and_then(|step| {
                    self.update_candidate(GestureDelta::Step(step))
                }) {
                    Some(candidate) => KeyOutcome::Moved(candidate),
                    None => KeyOutcome::Ignored,
                }
            }
            (InteractionPhase::KeyboardRescheduling, Key::Enter) => {
                KeyOutcome::Confirmed(self.confirm().await)
            }
            (InteractionPhase::ConflictPending, Key::Escape) => {
                KeyOutcome::Confirmed(self.resolve_conflict(ConflictChoice::Cancel).await)
            }
            (InteractionPhase::KeyboardRescheduling | InteractionPhase::Dragging, Key::Escape) => {
                match self.cancel() {
                    Some(revert) => KeyOutcome::Cancelled(revert),
                    None => KeyOutcome::Ignored,
                }
            }
            _ => KeyOutcome::Ignored,
        }
    }

    /// Store projection with the active gesture's ghost drawn at its candidate window.
    pub async fn visible_events(&self) -> Vec<CalendarEvent> {
        let ghost = self.drag_state();
        let mut events: Vec<CalendarEvent> = self
            .store
            .snapshot()
            .await
            .into_iter()
            .map(|appointment| {
                let moving = ghost.filter(|drag| drag.appointment_id() == appointment.id);
                CalendarEvent {
                    appointment_id: appointment.id,
                    window: moving.map_or(appointment.window(), |drag| drag.candidate),
                    status: appointment.status,
                    ghost: moving.is_some(),
                    conflicted: moving.is_some_and(|drag| drag.has_conflict),
                }
            })
            .collect();
        events.sort_by_key(|event| (event.window.start, event.appointment_id));
        events
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
