use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

use shared::domain::{
    Appointment, AppointmentId, AppointmentStatus, ClientId, LocationType, TimeWindow, WorkspaceId,
};

// Timestamps are stored as UTC RFC 3339 text, so SQL string comparison orders them in time.
const APPOINTMENT_COLUMNS: &str = "id, workspace_id, client_id, scheduled_start, scheduled_end, \
     status, location_type, location_details, notes, updated_at";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub workspace_id: WorkspaceId,
    pub client_id: ClientId,
    pub window: TimeWindow,
    pub status: AppointmentStatus,
    pub location_type: LocationType,
    pub location_details: Option<String>,
    pub notes: Option<String>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every pooled connection to a private in-memory database would see its own empty schema.
        let max_connections = if database_url.starts_with("sqlite::memory:") {
            1
        } else {
            5
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn create_appointment(&self, new: NewAppointment) -> Result<Appointment> {
        let now = Utc::now();
        let rec = sqlx::query(
            "INSERT INTO appointments
                (workspace_id, client_id, scheduled_start, scheduled_end, status,
                 location_type, location_details, notes, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(new.workspace_id.0)
        .bind(new.client_id.0)
        .bind(new.window.start)
        .bind(new.window.end)
        .bind(new.status.as_str())
        .bind(new.location_type.as_str())
        .bind(new.location_details.as_deref())
        .bind(new.notes.as_deref())
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert appointment")?;
        let id = AppointmentId(rec.get::<i64, _>(0));
        debug!(appointment_id = id.0, "stored new appointment");

        Ok(Appointment {
            id,
            workspace_id: new.workspace_id,
            client_id: new.client_id,
            scheduled_start: new.window.start,
            scheduled_end: new.window.end,
            status: new.status,
            location_type: new.location_type,
            location_details: new.location_details,
            notes: new.notes,
            updated_at: now,
        })
    }

    pub async fn get_appointment(&self, id: AppointmentId) -> Result<Option<Appointment>> {
        let row = sqlx::query(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(appointment_from_row).transpose()
    }

    /// Appointments of a workspace ordered by start, then id. With `range`, only those
    /// intersecting it are returned.
    pub async fn list_appointments(
        &self,
        workspace_id: WorkspaceId,
        range: Option<TimeWindow>,
    ) -> Result<Vec<Appointment>> {
        let rows = match range {
            Some(range) => {
                sqlx::query(&format!(
                    "SELECT {APPOINTMENT_COLUMNS} FROM appointments
                     WHERE workspace_id = ? AND scheduled_start < ? AND scheduled_end > ?
                     ORDER BY scheduled_start, id"
                ))
                .bind(workspace_id.0)
                .bind(range.end)
                .bind(range.start)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {APPOINTMENT_COLUMNS} FROM appointments
                     WHERE workspace_id = ?
                     ORDER BY scheduled_start, id"
                ))
                .bind(workspace_id.0)
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.iter().map(appointment_from_row).collect()
    }

    /// Persists every mutable column of `appointment` and returns the stored row, or
    /// `None` when no row has that id.
    pub async fn update_appointment(
        &self,
        appointment: &Appointment,
    ) -> Result<Option<Appointment>> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE appointments
             SET scheduled_start = ?, scheduled_end = ?, status = ?, location_type = ?,
                 location_details = ?, notes = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(appointment.scheduled_start)
        .bind(appointment.scheduled_end)
        .bind(appointment.status.as_str())
        .bind(appointment.location_type.as_str())
        .bind(appointment.location_details.as_deref())
        .bind(appointment.notes.as_deref())
        .bind(now)
        .bind(appointment.id.0)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to update appointment {}", appointment.id.0))?;

        if result.rows_affected() == 0 {
            debug!(appointment_id = appointment.id.0, "update matched no row");
            return Ok(None);
        }

        Ok(Some(Appointment {
            updated_at: now,
            ..appointment.clone()
        }))
    }

    pub async fn delete_appointment(&self, id: AppointmentId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Scheduled appointments in `workspace_id` whose window overlaps `window`.
    pub async fn find_overlapping(
        &self,
        workspace_id: WorkspaceId,
        window: TimeWindow,
        exclude: Option<AppointmentId>,
    ) -> Result<Vec<Appointment>> {
        let rows = sqlx::query(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments
             WHERE workspace_id = ? AND status = ? AND id != ?
               AND scheduled_start < ? AND scheduled_end > ?
             ORDER BY scheduled_start, id"
        ))
        .bind(workspace_id.0)
        .bind(AppointmentStatus::Scheduled.as_str())
        .bind(exclude.map(|id| id.0).unwrap_or(-1))
        .bind(window.end)
        .bind(window.start)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(appointment_from_row).collect()
    }
}

fn appointment_from_row(row: &SqliteRow) -> Result<Appointment> {
    let status: String = row.try_get("status")?;
    let location_type: String = row.try_get("location_type")?;
    Ok(Appointment {
        id: AppointmentId(row.try_get("id")?),
        workspace_id: WorkspaceId(row.try_get("workspace_id")?),
        client_id: ClientId(row.try_get("client_id")?),
        scheduled_start: row.try_get::<DateTime<Utc>, _>("scheduled_start")?,
        scheduled_end: row.try_get::<DateTime<Utc>, _>("scheduled_end")?,
        status: status.parse()?,
        location_type: location_type.parse()?,
        location_details: row.try_get("location_details")?,
        notes: row.try_get("notes")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
