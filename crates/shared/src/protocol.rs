use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Appointment, AppointmentStatus, ClientId, LocationType, TimeWindow, WorkspaceId,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub workspace_id: WorkspaceId,
    pub client_id: ClientId,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub location_type: LocationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub allow_conflicts: bool,
}

/// Partial update for `PUT /appointments/{id}`. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_type: Option<LocationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_details: Option<String>,
    /// `Some(None)` clears the notes, `None` leaves them untouched.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "double_option"
    )]
    pub notes: Option<Option<String>>,
    /// Conflict override: persist even when the window overlaps other appointments.
    #[serde(default)]
    pub allow_conflicts: bool,
}

impl UpdateAppointmentRequest {
    pub fn reschedule(window: TimeWindow) -> Self {
        Self {
            scheduled_start: Some(window.start),
            scheduled_end: Some(window.end),
            ..Self::default()
        }
    }

    pub fn with_override(mut self, allow_conflicts: bool) -> Self {
        self.allow_conflicts = allow_conflicts;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListAppointmentsQuery {
    /// Plain integer so the struct survives URL query encoding.
    pub workspace_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
}

/// Server-reported overlap for a proposed window. The client only renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub proposed: TimeWindow,
    pub conflicts: Vec<Appointment>,
}

mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
