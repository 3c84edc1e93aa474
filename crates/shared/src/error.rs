use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Appointment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Validation,
    /// Business-rule rejection: the proposed time overlaps other appointments.
    Conflict,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<Appointment>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            conflicts: Vec::new(),
        }
    }

    pub fn conflict(conflicts: Vec<Appointment>) -> Self {
        Self {
            code: ErrorCode::Conflict,
            message: format!(
                "proposed time overlaps {} other appointment(s)",
                conflicts.len()
            ),
            conflicts,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }
}
