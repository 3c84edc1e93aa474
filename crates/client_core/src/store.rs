use std::{collections::HashMap, sync::Arc};

use shared::{
    domain::{Appointment, AppointmentId, WorkspaceId},
    protocol::{CreateAppointmentRequest, UpdateAppointmentRequest},
};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{api::AppointmentApi, error::ClientError};

/// Session-wide cache of the workspace's appointments.
///
/// The cache only changes after the backend has accepted a write, so readers never
/// observe a tentative value. Views read [`AppointmentStore::snapshot`] and never
/// write to it.
pub struct AppointmentStore {
    api: Arc<dyn AppointmentApi>,
    workspace_id: WorkspaceId,
    appointments: RwLock<HashMap<AppointmentId, Appointment>>,
}

impl AppointmentStore {
    pub fn new(api: Arc<dyn AppointmentApi>, workspace_id: WorkspaceId) -> Self {
        Self {
            api,
            workspace_id,
            appointments: RwLock::new(HashMap::new()),
        }
    }

    pub fn workspace_id(&self) -> WorkspaceId {
        self.workspace_id
    }

    /// Replaces the cache with the server's current list.
    pub async fn load(&self) -> Result<usize, ClientError> {
        let fetched = self.api.list_appointments(self.workspace_id).await?;
        let count = fetched.len();
        let mut guard = self.appointments.write().await;
        *guard = fetched
            .into_iter()
            .map(|appointment| (appointment.id, appointment))
            .collect();
        info!(
            workspace_id = self.workspace_id.0,
            count, "appointment store loaded"
        );
        Ok(count)
    }

    pub async fn get(&self, appointment_id: AppointmentId) -> Option<Appointment> {
        self.appointments.read().await.get(&appointment_id).cloned()
    }

    /// Every cached appointment, ordered by start then id.
    pub async fn snapshot(&self) -> Vec<Appointment> {
        let mut appointments: Vec<_> = self.appointments.read().await.values().cloned().collect();
        appointments.sort_by_key(|appointment| (appointment.scheduled_start, appointment.id));
        appointments
    }

    pub async fn create(&self, req: &CreateAppointmentRequest) -> Result<Appointment, ClientError> {
        let created = self.api.create_appointment(req).await?;
        self.appointments
            .write()
            .await
            .insert(created.id, created.clone());
        Ok(created)
    }

    pub async fn update(
        &self,
        appointment_id: AppointmentId,
        req: &UpdateAppointmentRequest,
    ) -> Result<Appointment, ClientError> {
        match self.api.update_appointment(appointment_id, req).await {
            Ok(updated) => {
                self.appointments
                    .write()
                    .await
                    .insert(updated.id, updated.clone());
                Ok(updated)
            }
            Err(err) if err.is_not_found() => {
                debug!(
                    appointment_id = appointment_id.0,
                    "appointment vanished server-side; evicting"
                );
                self.appointments.write().await.remove(&appointment_id);
                Err(err)
            }
            Err(err) => {
                if err.is_conflict() {
                    debug!(
                        appointment_id = appointment_id.0,
                        "write rejected as a conflict; cache untouched"
                    );
                }
                Err(err)
            }
        }
    }

    pub async fn delete(&self, appointment_id: AppointmentId) -> Result<(), ClientError> {
        match self.api.delete_appointment(appointment_id).await {
            Err(err) if !err.is_not_found() => Err(err),
            _ => {
                self.appointments.write().await.remove(&appointment_id);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
