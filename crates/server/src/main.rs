use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use server_api::{
    appointment_route, appointments_route, create_appointment, delete_appointment,
    get_appointment, list_appointments, update_appointment, ApiContext,
};
use shared::{
    domain::{Appointment, AppointmentId, WorkspaceId},
    error::{ApiError, ErrorCode},
    protocol::{CreateAppointmentRequest, ListAppointmentsQuery, UpdateAppointmentRequest},
};
use storage::Storage;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;

use config::load_settings;

const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

type HttpResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let database_url = settings.database_url.clone();
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let state = AppState {
        api: ApiContext { storage },
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            appointments_route(),
            get(http_list_appointments).post(http_create_appointment),
        )
        .route(
            appointment_route(),
            get(http_get_appointment)
                .put(http_update_appointment)
                .delete(http_delete_appointment),
        )
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .with_state(state)
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = status_for(err.code);
    if status.is_server_error() {
        error!(message = %err.message, "request failed");
    }
    (status, Json(err))
}

async fn healthz(State(state): State<Arc<AppState>>) -> HttpResult<&'static str> {
    state.api.storage.health_check().await.map_err(|e| {
        reject(ApiError::new(ErrorCode::Internal, e.to_string()))
    })?;
    Ok("ok")
}

async fn http_list_appointments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListAppointmentsQuery>,
) -> HttpResult<Json<Vec<Appointment>>> {
    list_appointments(
        &state.api,
        WorkspaceId(query.workspace_id),
        query.from,
        query.to,
    )
    .await
    .map(Json)
    .map_err(reject)
}

async fn http_create_appointment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAppointmentRequest>,
) -> HttpResult<(StatusCode, Json<Appointment>)> {
    let created = create_appointment(&state.api, req).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn http_get_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<i64>,
) -> HttpResult<Json<Appointment>> {
    get_appointment(&state.api, AppointmentId(appointment_id))
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_update_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<i64>,
    Json(req): Json<UpdateAppointmentRequest>,
) -> HttpResult<Json<Appointment>> {
    update_appointment(&state.api, AppointmentId(appointment_id), req)
        .await
        .map(Json)
        .map_err(reject)
}

async fn http_delete_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<i64>,
) -> HttpResult<StatusCode> {
    delete_appointment(&state.api, AppointmentId(appointment_id))
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
