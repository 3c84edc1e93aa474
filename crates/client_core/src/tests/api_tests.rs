use super::*;
use axum::{
    extract::{Path, Query},
    http::StatusCode as HttpStatus,
    routing::{get, put},
    Json, Router,
};
use shared::error::ErrorCode;
use tokio::net::TcpListener;

use crate::test_support::{appointment, at};

const CONFLICTING: i64 = 1;
const MISSING: i64 = 2;
const BROKEN: i64 = 3;

async fn handle_update(
    Path(appointment_id): Path<i64>,
    Json(req): Json<UpdateAppointmentRequest>,
) -> Result<Json<Appointment>, (HttpStatus, Json<ApiError>)> {
    match appointment_id {
        CONFLICTING if !req.allow_conflicts => Err((
            HttpStatus::CONFLICT,
            Json(ApiError::conflict(vec![appointment(
                9,
                at(6, 10, 0),
                at(6, 11, 0),
            )])),
        )),
        MISSING => Err((
            HttpStatus::NOT_FOUND,
            Json(ApiError::not_found("appointment 2 not found")),
        )),
        BROKEN => Err((
            HttpStatus::INTERNAL_SERVER_ERROR,
            Json(ApiError::new(ErrorCode::Internal, "database is locked")),
        )),
        id => {
            let mut updated = appointment(id, at(6, 9, 0), at(6, 10, 0));
            if let (Some(start), Some(end)) = (req.scheduled_start, req.scheduled_end) {
                updated.scheduled_start = start;
                updated.scheduled_end = end;
            }
            Ok(Json(updated))
        }
    }
}

async fn handle_list(Query(query): Query<ListAppointmentsQuery>) -> Json<Vec<Appointment>> {
    let mut first = appointment(4, at(6, 9, 0), at(6, 10, 0));
    first.workspace_id = WorkspaceId(query.workspace_id);
    Json(vec![first])
}

async fn handle_delete(Path(appointment_id): Path<i64>) -> HttpStatus {
    if appointment_id == MISSING {
        HttpStatus::NOT_FOUND
    } else {
        HttpStatus::NO_CONTENT
    }
}

async fn spawn_appointments_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new()
        .route("/appointments", get(handle_list))
        .route(
            "/appointments/:appointment_id",
            put(handle_update).delete(handle_delete),
        );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn move_to_ten() -> UpdateAppointmentRequest {
    UpdateAppointmentRequest::reschedule(
        shared::domain::TimeWindow::new(at(6, 10, 0), at(6, 11, 0)).expect("window"),
    )
}

#[tokio::test]
async fn conflict_response_is_distinguishable_and_carries_conflicts() {
    let api = HttpAppointmentApi::new(&spawn_appointments_server().await).expect("api");

    let err = api
        .update_appointment(AppointmentId(CONFLICTING), &move_to_ten())
        .await
        .expect_err("conflict");
    match err {
        ClientError::Conflict(conflicts) => {
            assert_eq!(conflicts.len(), 1);
            assert_eq!(conflicts[0].id, AppointmentId(9));
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    let updated = api
        .update_appointment(
            AppointmentId(CONFLICTING),
            &move_to_ten().with_override(true),
        )
        .await
        .expect("override accepted");
    assert_eq!(updated.scheduled_start, at(6, 10, 0));
}

#[tokio::test]
async fn not_found_and_server_errors_map_to_their_own_variants() {
    let api = HttpAppointmentApi::new(&spawn_appointments_server().await).expect("api");

    let err = api
        .update_appointment(AppointmentId(MISSING), &move_to_ten())
        .await
        .expect_err("missing");
    assert!(err.is_not_found());

    let err = api
        .update_appointment(AppointmentId(BROKEN), &move_to_ten())
        .await
        .expect_err("broken");
    match err {
        ClientError::Api {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 500);
            assert_eq!(code, Some(ErrorCode::Internal));
            assert_eq!(message, "database is locked");
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn list_sends_workspace_and_delete_accepts_no_content() {
    let server_url = spawn_appointments_server().await;
    let api = HttpAppointmentApi::new(&format!("{server_url}/")).expect("api");

    let listed = api.list_appointments(WorkspaceId(42)).await.expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].workspace_id, WorkspaceId(42));

    api.delete_appointment(AppointmentId(4))
        .await
        .expect("delete");
    let err = api
        .delete_appointment(AppointmentId(MISSING))
        .await
        .expect_err("missing");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn unreachable_server_is_a_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let api = HttpAppointmentApi::new(&format!("http://{addr}")).expect("api");
    let err = api
        .update_appointment(AppointmentId(4), &move_to_ten())
        .await
        .expect_err("connection refused");
    assert!(matches!(err, ClientError::Http(_)));
}

#[test]
fn base_url_keeps_path_prefix() {
    let api = HttpAppointmentApi::new("http://calendar.local/api").expect("api");
    assert_eq!(api.base_url().as_str(), "http://calendar.local/api/");
    assert!(matches!(
        HttpAppointmentApi::new("not a url"),
        Err(ClientError::InvalidServerUrl(_))
    ));
}
