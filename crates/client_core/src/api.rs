use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Appointment, AppointmentId, WorkspaceId},
    error::ApiError,
    protocol::{CreateAppointmentRequest, ListAppointmentsQuery, UpdateAppointmentRequest},
};
use tracing::debug;
use url::Url;

use crate::error::ClientError;

/// REST collaborator behind the appointment store.
///
/// `update_appointment` must report an overlap as [`ClientError::Conflict`], never as a
/// generic failure, so the commit flow can route it to an explicit user decision.
#[async_trait]
pub trait AppointmentApi: Send + Sync {
    async fn list_appointments(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Vec<Appointment>, ClientError>;
    async fn create_appointment(
        &self,
        req: &CreateAppointmentRequest,
    ) -> Result<Appointment, ClientError>;
    async fn update_appointment(
        &self,
        appointment_id: AppointmentId,
        req: &UpdateAppointmentRequest,
    ) -> Result<Appointment, ClientError>;
    async fn delete_appointment(&self, appointment_id: AppointmentId) -> Result<(), ClientError>;
}

pub struct HttpAppointmentApi {
    http: Client,
    base_url: Url,
}

impl HttpAppointmentApi {
    pub fn new(server_url: &str) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(server_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }
}

#[async_trait]
impl AppointmentApi for HttpAppointmentApi {
    async fn list_appointments(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Vec<Appointment>, ClientError> {
        let response = self
            .http
            .get(self.endpoint("appointments")?)
            .query(&ListAppointmentsQuery {
                workspace_id: workspace_id.0,
                from: None,
                to: None,
            })
            .send()
            .await?;
        decode(response, None).await
    }

    async fn create_appointment(
        &self,
        req: &CreateAppointmentRequest,
    ) -> Result<Appointment, ClientError> {
        let response = self
            .http
            .post(self.endpoint("appointments")?)
            .json(req)
            .send()
            .await?;
        decode(response, None).await
    }

    async fn update_appointment(
        &self,
        appointment_id: AppointmentId,
        req: &UpdateAppointmentRequest,
    ) -> Result<Appointment, ClientError> {
        debug!(
            appointment_id = appointment_id.0,
            allow_conflicts = req.allow_conflicts,
            "PUT appointment"
        );
        let response = self
            .http
            .put(self.endpoint(&format!("appointments/{}", appointment_id.0))?)
            .json(req)
            .send()
            .await?;
        decode(response, Some(appointment_id)).await
    }

    async fn delete_appointment(&self, appointment_id: AppointmentId) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.endpoint(&format!("appointments/{}", appointment_id.0))?)
            .send()
            .await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(failure(response, Some(appointment_id)).await)
    }
}

async fn decode<T: DeserializeOwned>(
    response: Response,
    appointment_id: Option<AppointmentId>,
) -> Result<T, ClientError> {
    if response.status().is_success() {
        return Ok(response.json().await?);
    }
    Err(failure(response, appointment_id).await)
}

async fn failure(response: Response, appointment_id: Option<AppointmentId>) -> ClientError {
    let status = response.status();
    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => return ClientError::Http(err),
    };
    let api_error = serde_json::from_str::<ApiError>(&body).ok();

    match (status, appointment_id) {
        (StatusCode::CONFLICT, _) => {
            ClientError::Conflict(api_error.map(|err| err.conflicts).unwrap_or_default())
        }
        (StatusCode::NOT_FOUND, Some(appointment_id)) => ClientError::NotFound(appointment_id),
        _ => ClientError::Api {
            status: status.as_u16(),
            code: api_error.as_ref().map(|err| err.code),
            message: api_error.map(|err| err.message).unwrap_or(body),
        },
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
