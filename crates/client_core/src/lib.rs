//! Headless calendar client: appointment store, reschedule interaction, and undo.
//!
//! The [`controller::RescheduleController`] owns the transient drag/keyboard state and
//! hands finished gestures to [`commit::RescheduleFlow`]. Successful mutations leave an
//! inverse descriptor in the [`undo::UndoLedger`]. All persisted state flows through
//! [`store::AppointmentStore`], the single in-memory copy of the backend's appointments.

pub mod api;
pub mod commit;
pub mod config;
pub mod controller;
pub mod error;
pub mod geometry;
pub mod input;
pub mod notify;
pub mod session;
pub mod store;
pub mod undo;

#[cfg(test)]
mod test_support;

pub use api::{AppointmentApi, HttpAppointmentApi};
pub use commit::{
    CancellationFlow, CancellationOutcome, PendingConflict, RescheduleFlow, RescheduleOutcome,
    RevertDescriptor,
};
pub use config::ClientSettings;
pub use controller::{
    CalendarEvent, ConfirmOutcome, ConflictChoice, GestureDelta, GestureKind, InteractionPhase,
    KeyOutcome, RescheduleController,
};
pub use error::ClientError;
pub use geometry::{GridCell, GridOffset, ScreenPoint, TimeGridGeometry, UniformTimeGrid};
pub use input::{Key, KeyInput};
pub use notify::{
    CollectingNotifier, Notification, NotificationAction, NotificationLevel, Notifier,
    TracingNotifier,
};
pub use session::{default_grid, CalendarSession};
pub use store::AppointmentStore;
pub use undo::{UndoDescriptor, UndoFamily, UndoLedger, UndoOutcome};
