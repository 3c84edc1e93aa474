use shared::{
    domain::{Appointment, AppointmentId},
    error::ErrorCode,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server url: {0}")]
    InvalidServerUrl(#[from] url::ParseError),
    #[error("transport failure: {0}")]
    Http(#[from] reqwest::Error),
    /// The server refused the write because it overlaps other appointments.
    #[error("scheduling conflict with {} appointment(s)", .0.len())]
    Conflict(Vec<Appointment>),
    #[error("appointment {0} not found")]
    NotFound(AppointmentId),
    #[error("server rejected request ({status}): {message}")]
    Api {
        status: u16,
        code: Option<ErrorCode>,
        message: String,
    },
}

impl ClientError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
