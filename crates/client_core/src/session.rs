use std::sync::Arc;

use shared::domain::{AppointmentId, WorkspaceId};
use tracing::info;

use crate::{
    api::{AppointmentApi, HttpAppointmentApi},
    commit::{CancellationFlow, CancellationOutcome, RescheduleFlow},
    config::ClientSettings,
    controller::RescheduleController,
    error::ClientError,
    geometry::{TimeGridGeometry, UniformTimeGrid},
    notify::{NotificationAction, Notifier},
    store::AppointmentStore,
    undo::{UndoLedger, UndoOutcome},
};

/// Default pixel size of one grid cell for headless sessions.
const DEFAULT_COLUMN_WIDTH: f64 = 120.0;
const DEFAULT_ROW_HEIGHT: f64 = 12.0;

/// Grid used by [`CalendarSession::connect`].
pub fn default_grid(settings: &ClientSettings) -> UniformTimeGrid {
    UniformTimeGrid::week(
        DEFAULT_COLUMN_WIDTH,
        DEFAULT_ROW_HEIGHT,
        settings.slot_minutes,
    )
}

/// One calendar view's worth of wiring: a shared store and ledger, plus the flows and
/// the gesture controller that use them.
pub struct CalendarSession {
    pub store: Arc<AppointmentStore>,
    pub ledger: Arc<UndoLedger>,
    pub controller: RescheduleController,
    cancellations: CancellationFlow,
}

impl CalendarSession {
    pub fn new(
        api: Arc<dyn AppointmentApi>,
        workspace_id: WorkspaceId,
        geometry: Arc<dyn TimeGridGeometry>,
        notifier: Arc<dyn Notifier>,
        settings: &ClientSettings,
    ) -> Self {
        let store = Arc::new(AppointmentStore::new(api, workspace_id));
        let ledger = Arc::new(UndoLedger::new(store.clone(), notifier.clone()));
        let flow = RescheduleFlow::new(
            store.clone(),
            ledger.clone(),
            notifier.clone(),
            settings.undo_window(),
        );
        let cancellations = CancellationFlow::new(
            store.clone(),
            ledger.clone(),
            notifier,
            settings.undo_window(),
        );
        let controller = RescheduleController::new(geometry, store.clone(), flow, ledger.clone());
        Self {
            store,
            ledger,
            controller,
            cancellations,
        }
    }

    /// HTTP-backed session on a week grid, with the store already loaded.
    pub async fn connect(
        settings: &ClientSettings,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ClientError> {
        let api = HttpAppointmentApi::new(&settings.server_url)?;
        let session = Self::new(
            Arc::new(api),
            settings.workspace_id,
            Arc::new(default_grid(settings)),
            notifier,
            settings,
        );
        let loaded = session.store.load().await?;
        info!(server_url = %settings.server_url, loaded, "calendar session ready");
        Ok(session)
    }

    pub async fn cancel_appointment(
        &self,
        appointment_id: AppointmentId,
        reason: Option<&str>,
    ) -> CancellationOutcome {
        self.cancellations
            .cancel_appointment(appointment_id, reason)
            .await
    }

    /// Runs a notification's inline action.
    pub async fn perform(&self, action: NotificationAction) -> UndoOutcome {
        match action {
            NotificationAction::Undo(family) => self.ledger.undo(family).await,
        }
    }
}
