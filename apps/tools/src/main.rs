use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use shared::domain::{
    AppointmentId, AppointmentStatus, ClientId, LocationType, TimeWindow, WorkspaceId,
};
use storage::{NewAppointment, Storage};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://data/calendar.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    CreateAppointment {
        workspace_id: i64,
        client_id: i64,
        /// RFC 3339, e.g. 2024-05-06T09:00:00Z
        start: DateTime<Utc>,
        #[arg(long, default_value_t = 60)]
        minutes: i64,
        #[arg(long, default_value = "in_person")]
        location: LocationType,
        #[arg(long)]
        notes: Option<String>,
    },
    List {
        workspace_id: i64,
    },
    SetStatus {
        appointment_id: i64,
        status: AppointmentStatus,
    },
    Delete {
        appointment_id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::CreateAppointment {
            workspace_id,
            client_id,
            start,
            minutes,
            location,
            notes,
        } => {
            let window = TimeWindow::new(start, start + Duration::minutes(minutes))?;
            let created = storage
                .create_appointment(NewAppointment {
                    workspace_id: WorkspaceId(workspace_id),
                    client_id: ClientId(client_id),
                    window,
                    status: AppointmentStatus::Scheduled,
                    location_type: location,
                    location_details: None,
                    notes,
                })
                .await?;
            println!("created appointment_id={}", created.id);
        }
        Command::List { workspace_id } => {
            for a in storage
                .list_appointments(WorkspaceId(workspace_id), None)
                .await?
            {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    a.id,
                    a.client_id,
                    a.scheduled_start.to_rfc3339(),
                    a.scheduled_end.to_rfc3339(),
                    a.status.as_str()
                );
            }
        }
        Command::SetStatus {
            appointment_id,
            status,
        } => {
            let mut appointment = storage
                .get_appointment(AppointmentId(appointment_id))
                .await?
                .with_context(|| format!("appointment {appointment_id} not found"))?;
            appointment.status = status;
            storage
                .update_appointment(&appointment)
                .await?
                .with_context(|| format!("appointment {appointment_id} was deleted meanwhile"))?;
            println!("appointment_id={appointment_id} status={}", status.as_str());
        }
        Command::Delete { appointment_id } => {
            let removed = storage
                .delete_appointment(AppointmentId(appointment_id))
                .await?;
            println!("appointment_id={appointment_id} removed={removed}");
        }
    }

    Ok(())
}
