use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use shared::{
    domain::{
        Appointment, AppointmentId, AppointmentStatus, ClientId, LocationType, TimeWindow,
        WorkspaceId,
    },
    protocol::{CreateAppointmentRequest, UpdateAppointmentRequest},
};

use crate::{
    api::AppointmentApi,
    config::ClientSettings,
    error::ClientError,
    geometry::UniformTimeGrid,
    notify::CollectingNotifier,
    session::CalendarSession,
};

pub(crate) const WORKSPACE: WorkspaceId = WorkspaceId(1);

/// 2024-05-06 is a Monday.
pub(crate) fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, hour, minute, 0).unwrap()
}

pub(crate) fn window(start: DateTime<Utc>, end: DateTime<Utc>) -> TimeWindow {
    TimeWindow::new(start, end).expect("window")
}

pub(crate) fn appointment(id: i64, start: DateTime<Utc>, end: DateTime<Utc>) -> Appointment {
    Appointment {
        id: AppointmentId(id),
        workspace_id: WORKSPACE,
        client_id: ClientId(100 + id),
        scheduled_start: start,
        scheduled_end: end,
        status: AppointmentStatus::Scheduled,
        location_type: LocationType::InPerson,
        location_details: None,
        notes: None,
        updated_at: start,
    }
}

/// Scripted failure for the next update call.
pub(crate) enum Scripted {
    Conflict(Vec<Appointment>),
    Unavailable,
    NotFound,
}

#[derive(Default)]
struct FakeState {
    appointments: HashMap<AppointmentId, Appointment>,
    scripted: VecDeque<Scripted>,
    updates: Vec<(AppointmentId, UpdateAppointmentRequest)>,
    next_id: i64,
}

/// In-memory backend. It never detects conflicts on its own: tests script them.
#[derive(Default)]
pub(crate) struct FakeAppointmentApi {
    state: Mutex<FakeState>,
}

impl FakeAppointmentApi {
    pub(crate) fn with(appointments: Vec<Appointment>) -> Arc<Self> {
        let api = Self::default();
        {
            let mut state = api.state.lock().unwrap();
            state.next_id = appointments.iter().map(|a| a.id.0).max().unwrap_or(0) + 1;
            state.appointments = appointments.into_iter().map(|a| (a.id, a)).collect();
        }
        Arc::new(api)
    }

    pub(crate) fn script(&self, next: Scripted) {
        self.state.lock().unwrap().scripted.push_back(next);
    }

    pub(crate) fn remove(&self, appointment_id: AppointmentId) {
        self.state.lock().unwrap().appointments.remove(&appointment_id);
    }

    pub(crate) fn server_copy(&self, appointment_id: AppointmentId) -> Option<Appointment> {
        self.state
            .lock()
            .unwrap()
            .appointments
            .get(&appointment_id)
            .cloned()
    }

    pub(crate) fn updates(&self) -> Vec<(AppointmentId, UpdateAppointmentRequest)> {
        self.state.lock().unwrap().updates.clone()
    }
}

#[async_trait]
impl AppointmentApi for FakeAppointmentApi {
    async fn list_appointments(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Vec<Appointment>, ClientError> {
        let state = self.state.lock().unwrap();
        let mut listed: Vec<_> = state
            .appointments
            .values()
            .filter(|a| a.workspace_id == workspace_id)
            .cloned()
            .collect();
        listed.sort_by_key(|a| (a.scheduled_start, a.id));
        Ok(listed)
    }

    async fn create_appointment(
        &self,
        req: &CreateAppointmentRequest,
    ) -> Result<Appointment, ClientError> {
        let mut state = self.state.lock().unwrap();
        let id = AppointmentId(state.next_id.max(1));
        state.next_id = id.0 + 1;
        let created = Appointment {
            id,
            workspace_id: req.workspace_id,
            client_id: req.client_id,
            scheduled_start: req.scheduled_start,
            scheduled_end: req.scheduled_end,
            status: AppointmentStatus::Scheduled,
            location_type: req.location_type,
            location_details: req.location_details.clone(),
            notes: req.notes.clone(),
            updated_at: Utc::now(),
        };
        state.appointments.insert(id, created.clone());
        Ok(created)
    }

    async fn update_appointment(
        &self,
        appointment_id: AppointmentId,
        req: &UpdateAppointmentRequest,
    ) -> Result<Appointment, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.updates.push((appointment_id, req.clone()));
        match state.scripted.pop_front() {
            Some(Scripted::Conflict(conflicts)) => return Err(ClientError::Conflict(conflicts)),
            Some(Scripted::Unavailable) => {
                return Err(ClientError::Api {
                    status: 503,
                    code: None,
                    message: "service unavailable".into(),
                })
            }
            Some(Scripted::NotFound) => return Err(ClientError::NotFound(appointment_id)),
            None => {}
        }

        let stored = state
            .appointments
            .get_mut(&appointment_id)
            .ok_or(ClientError::NotFound(appointment_id))?;
        if let Some(start) = req.scheduled_start {
            stored.scheduled_start = start;
        }
        if let Some(end) = req.scheduled_end {
            stored.scheduled_end = end;
        }
        if let Some(status) = req.status {
            stored.status = status;
        }
        if let Some(notes) = &req.notes {
            stored.notes = notes.clone();
        }
        Ok(stored.clone())
    }

    async fn delete_appointment(&self, appointment_id: AppointmentId) -> Result<(), ClientError> {
        match self.state.lock().unwrap().appointments.remove(&appointment_id) {
            Some(_) => Ok(()),
            None => Err(ClientError::NotFound(appointment_id)),
        }
    }
}

/// 100px day columns, 20px quarter-hour rows.
pub(crate) fn test_grid() -> UniformTimeGrid {
    UniformTimeGrid::week(100.0, 20.0, 15)
}

pub(crate) struct Harness {
    pub(crate) api: Arc<FakeAppointmentApi>,
    pub(crate) notifier: Arc<CollectingNotifier>,
    pub(crate) session: CalendarSession,
}

pub(crate) async fn harness(appointments: Vec<Appointment>) -> Harness {
    let api = FakeAppointmentApi::with(appointments);
    let notifier = Arc::new(CollectingNotifier::new());
    let session = CalendarSession::new(
        api.clone(),
        WORKSPACE,
        Arc::new(test_grid()),
        notifier.clone(),
        &ClientSettings::default(),
    );
    session.store.load().await.expect("load");
    Harness {
        api,
        notifier,
        session,
    }
}
