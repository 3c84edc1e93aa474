use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use client_core::{
    config::load_client_settings, default_grid, CalendarSession, CancellationOutcome, ClientError,
    ConfirmOutcome, ConflictChoice, GridCell, InteractionPhase, KeyInput, KeyOutcome,
    NotificationAction, ScreenPoint, TimeGridGeometry, TracingNotifier, UndoFamily, UndoOutcome,
};
use shared::{
    domain::{Appointment, AppointmentId, ClientId, LocationType, WorkspaceId},
    protocol::CreateAppointmentRequest,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Headless calendar client: drives the same gestures a calendar view would.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    workspace_id: Option<i64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the workspace's appointments.
    List,
    /// Book a new appointment. The server refuses overlaps unless `--keep-both` is given.
    Book {
        client_id: i64,
        /// RFC 3339, e.g. 2024-05-06T09:00:00Z
        start: DateTime<Utc>,
        #[arg(long, default_value_t = 60)]
        minutes: i64,
        #[arg(long, default_value = "in_person")]
        location: LocationType,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        keep_both: bool,
    },
    Delete {
        appointment_id: i64,
    },
    /// Drag an appointment by whole grid cells.
    Drag {
        appointment_id: i64,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        rows: i64,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        days: i64,
        #[arg(long)]
        keep_both: bool,
        /// Undo the move straight after it lands.
        #[arg(long)]
        undo: bool,
    },
    /// Keyboard reschedule, e.g. `--keys Right,Down,Enter`.
    Move {
        appointment_id: i64,
        #[arg(long, value_delimiter = ',')]
        keys: Vec<KeyInput>,
        #[arg(long)]
        keep_both: bool,
        #[arg(long)]
        undo: bool,
    },
    Cancel {
        appointment_id: i64,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        undo: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_client_settings();
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    if let Some(workspace_id) = args.workspace_id {
        settings.workspace_id = WorkspaceId(workspace_id);
    }

    let mut session = CalendarSession::connect(&settings, Arc::new(TracingNotifier))
        .await
        .with_context(|| format!("failed to reach {}", settings.server_url))?;

    match args.command {
        Command::List => {
            for appointment in session.store.snapshot().await {
                print_appointment(&appointment);
            }
        }
        Command::Book {
            client_id,
            start,
            minutes,
            location,
            notes,
            keep_both,
        } => {
            let request = CreateAppointmentRequest {
                workspace_id: session.store.workspace_id(),
                client_id: ClientId(client_id),
                scheduled_start: start,
                scheduled_end: start + Duration::minutes(minutes),
                location_type: location,
                location_details: None,
                notes,
                allow_conflicts: keep_both,
            };
            match session.store.create(&request).await {
                Ok(created) => print_appointment(&created),
                Err(ClientError::Conflict(conflicts)) => {
                    println!("overlaps {} appointment(s):", conflicts.len());
                    for conflict in &conflicts {
                        print_appointment(conflict);
                    }
                    bail!("not booked; pass --keep-both to book anyway");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Command::Delete { appointment_id } => {
            session.store.delete(AppointmentId(appointment_id)).await?;
            println!("appointment {appointment_id} deleted");
        }
        Command::Drag {
            appointment_id,
            rows,
            days,
            keep_both,
            undo,
        } => {
            let grid = default_grid(&settings);
            let origin = GridCell {
                day: grid.days / 2,
                slot: grid.slots_per_day / 2,
            };
            let target = GridCell {
                day: origin.day + days,
                slot: origin.slot + rows,
            };
            let centre = |cell: GridCell| {
                let corner = grid.point_for(cell);
                ScreenPoint::new(
                    corner.x + grid.column_width / 2.0,
                    corner.y + grid.row_height / 2.0,
                )
            };
            if grid.cell_at(centre(target)).is_none() {
                bail!("drag of {days} day(s) and {rows} row(s) leaves the calendar grid");
            }

            let controller = &mut session.controller;
            if !controller
                .begin_drag(AppointmentId(appointment_id), centre(origin))
                .await
            {
                bail!("appointment {appointment_id} is not in this workspace");
            }
            controller.pointer_move(centre(target));
            let outcome = controller.pointer_up().await;
            let committed = settle(&mut session, outcome, keep_both).await;
            if committed && undo {
                undo_family(&session, UndoFamily::Reschedule).await;
            }
        }
        Command::Move {
            appointment_id,
            keys,
            keep_both,
            undo,
        } => {
            let controller = &mut session.controller;
            if !controller
                .begin_keyboard_reschedule(AppointmentId(appointment_id))
                .await
            {
                bail!("appointment {appointment_id} is not in this workspace");
            }

            let mut confirmed = None;
            for key in keys {
                match controller.handle_key(key).await {
                    KeyOutcome::Moved(candidate) => {
                        println!("candidate {} - {}", candidate.start, candidate.end);
                    }
                    KeyOutcome::Confirmed(outcome) => {
                        confirmed = Some(outcome);
                        break;
                    }
                    KeyOutcome::Cancelled(_) => {
                        println!("reschedule abandoned");
                        return Ok(());
                    }
                    KeyOutcome::Undo(_) | KeyOutcome::Ignored => {}
                }
            }
            let outcome = match confirmed {
                Some(outcome) => outcome,
                None if controller.phase() == InteractionPhase::KeyboardRescheduling => {
                    controller.confirm().await
                }
                None => ConfirmOutcome::Ignored,
            };
            let committed = settle(&mut session, outcome, keep_both).await;
            if committed && undo {
                undo_family(&session, UndoFamily::Reschedule).await;
            }
        }
        Command::Cancel {
            appointment_id,
            reason,
            undo,
        } => {
            match session
                .cancel_appointment(AppointmentId(appointment_id), reason.as_deref())
                .await
            {
                CancellationOutcome::Cancelled(appointment) => {
                    print_appointment(&appointment);
                    if undo {
                        undo_family(&session, UndoFamily::Cancellation).await;
                    }
                }
                CancellationOutcome::AlreadyCancelled => {
                    println!("appointment {appointment_id} is already cancelled");
                }
                CancellationOutcome::NotFound => {
                    bail!("appointment {appointment_id} not found");
                }
                CancellationOutcome::Failed(message) => bail!(message),
            }
        }
    }

    Ok(())
}

/// Prints a gesture's result, resolving a conflict prompt from `keep_both`. Returns
/// whether the move landed.
async fn settle(session: &mut CalendarSession, outcome: ConfirmOutcome, keep_both: bool) -> bool {
    let outcome = match outcome {
        ConfirmOutcome::ConflictPending(report) => {
            println!(
                "{} - {} overlaps {} appointment(s):",
                report.proposed.start,
                report.proposed.end,
                report.conflicts.len()
            );
            for conflict in &report.conflicts {
                print_appointment(conflict);
            }
            let choice = if keep_both {
                ConflictChoice::KeepBoth
            } else {
                ConflictChoice::Cancel
            };
            info!(?choice, "resolving conflict");
            session.controller.resolve_conflict(choice).await
        }
        other => other,
    };

    match outcome {
        ConfirmOutcome::Committed(appointment) => {
            print_appointment(&appointment);
            true
        }
        ConfirmOutcome::Cancelled(revert) => {
            println!(
                "kept at {} - {}",
                revert.original.start, revert.original.end
            );
            false
        }
        ConfirmOutcome::Reverted { message, .. } => {
            println!("{message}");
            false
        }
        ConfirmOutcome::Unchanged => {
            println!("dropped in place; nothing to save");
            false
        }
        ConfirmOutcome::Vanished => {
            println!("appointment was deleted elsewhere");
            false
        }
        ConfirmOutcome::ConflictPending(_) | ConfirmOutcome::Ignored => false,
    }
}

async fn undo_family(session: &CalendarSession, family: UndoFamily) {
    match session.perform(NotificationAction::Undo(family)).await {
        UndoOutcome::Restored(appointment) => {
            println!("undone:");
            print_appointment(&appointment);
        }
        UndoOutcome::NothingToUndo => println!("nothing to undo"),
        UndoOutcome::Failed(message) => println!("{message}"),
    }
}

fn print_appointment(appointment: &Appointment) {
    println!(
        "#{} client={} {} - {} [{}] {}",
        appointment.id,
        appointment.client_id,
        appointment.scheduled_start,
        appointment.scheduled_end,
        appointment.status.as_str(),
        appointment.notes.as_deref().unwrap_or("")
    );
}
