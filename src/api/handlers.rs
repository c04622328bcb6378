//! HTTP request handlers

use super::types::{
    AddSpeakerRequest, CommitteeQuery, CommitteeRequest, CommitteeStatusSummary,
    CreateMotionRequest, EntryResponse, ErrorResponse, HealthResponse, MotionHistoryResponse,
    MotionResponse, NextSpeakerResponse, RollCallRequest, SpeakerListRequest,
    SpeakerListResponse, StartSessionResponse, SwitchSpeakerListRequest,
    SwitchSpeakerListResponse, TimerResponse, UpdateSpeakerListRequest,
};
use super::AppState;
use crate::floor::{AttendanceStats, Board, FloorError, FloorErrorKind};
use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use tower_http::trace::TraceLayer;

type BearerHeader = Option<TypedHeader<Authorization<Bearer>>>;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Motions (administrative)
        .route("/api/motions", post(create_motion))
        .route("/api/motions/:motion_id/:list_id", post(update_speaker_list))
        // Display reads
        .route("/api/display/board", get(get_board))
        .route("/api/display/sessions", get(motion_history))
        // Display actions
        .route("/api/display/speakers", post(add_speaker))
        .route("/api/display/roll-call", post(roll_call))
        .route("/api/display/start-session", post(start_session))
        .route("/api/display/switch-speaker-list", post(switch_speaker_list))
        .route("/api/display/timer/start", post(start_timer))
        .route("/api/display/timer/stop", post(stop_timer))
        .route("/api/display/speaker/next", post(next_speaker))
        // Liveness
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn authorize(state: &AppState, auth: &BearerHeader) -> Result<(), AppError> {
    let token = auth
        .as_ref()
        .map(|TypedHeader(authorization)| authorization.token());
    if state.gate.is_authorized(token) {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

/// Unwrap a JSON body, answering malformed input in the API's error shape
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

// ============================================================
// Motions
// ============================================================

async fn create_motion(
    State(state): State<AppState>,
    auth: BearerHeader,
    payload: Result<Json<CreateMotionRequest>, JsonRejection>,
) -> Result<Json<MotionResponse>, AppError> {
    authorize(&state, &auth)?;
    let cmd = body(payload)?.into_command()?;
    let motion = state.engine.create_motion(&cmd)?;
    Ok(Json(MotionResponse { motion }))
}

async fn update_speaker_list(
    State(state): State<AppState>,
    auth: BearerHeader,
    Path((motion_id, list_id)): Path<(i64, i64)>,
    payload: Result<Json<UpdateSpeakerListRequest>, JsonRejection>,
) -> Result<Json<SpeakerListResponse>, AppError> {
    authorize(&state, &auth)?;
    let edits = body(payload)?.into_edits()?;
    let speaker_list = state
        .engine
        .update_speaker_list(motion_id, list_id, &edits)?;
    Ok(Json(SpeakerListResponse { speaker_list }))
}

// ============================================================
// Display reads
// ============================================================

fn committee_id(query: Result<Query<CommitteeQuery>, QueryRejection>) -> Result<i64, AppError> {
    let Query(query) = query.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    query
        .committee_id
        .ok_or_else(|| AppError::BadRequest("committeeId is required".to_string()))
}

async fn get_board(
    State(state): State<AppState>,
    query: Result<Query<CommitteeQuery>, QueryRejection>,
) -> Result<Json<Board>, AppError> {
    let committee_id = committee_id(query)?;
    Ok(Json(state.engine.board(committee_id)?))
}

async fn motion_history(
    State(state): State<AppState>,
    query: Result<Query<CommitteeQuery>, QueryRejection>,
) -> Result<Json<MotionHistoryResponse>, AppError> {
    let committee_id = committee_id(query)?;
    let items = state.engine.motion_history(committee_id)?;
    Ok(Json(MotionHistoryResponse {
        total: items.len(),
        items,
    }))
}

// ============================================================
// Display actions
// ============================================================

async fn add_speaker(
    State(state): State<AppState>,
    payload: Result<Json<AddSpeakerRequest>, JsonRejection>,
) -> Result<Json<EntryResponse>, AppError> {
    let (list_id, delegate_id) = body(payload)?.ids()?;
    let entry = state.engine.add_speaker(list_id, delegate_id)?;
    Ok(Json(EntryResponse { entry }))
}

async fn roll_call(
    State(state): State<AppState>,
    payload: Result<Json<RollCallRequest>, JsonRejection>,
) -> Result<Json<AttendanceStats>, AppError> {
    let (committee_id, attendance) = body(payload)?.into_parts()?;
    Ok(Json(state.engine.roll_call(committee_id, &attendance)?))
}

async fn start_session(
    State(state): State<AppState>,
    payload: Result<Json<CommitteeRequest>, JsonRejection>,
) -> Result<Json<StartSessionResponse>, AppError> {
    let committee_id = body(payload)?
        .committee_id
        .ok_or_else(|| AppError::BadRequest("committeeId is required".to_string()))?;
    let committee = state.engine.start_session(committee_id)?;
    Ok(Json(StartSessionResponse {
        committee: CommitteeStatusSummary {
            id: committee.id,
            status: committee.status,
        },
    }))
}

async fn switch_speaker_list(
    State(state): State<AppState>,
    payload: Result<Json<SwitchSpeakerListRequest>, JsonRejection>,
) -> Result<Json<SwitchSpeakerListResponse>, AppError> {
    let cmd = body(payload)?.into_command()?;
    let position = state.engine.switch_speaker_list(&cmd)?;
    Ok(Json(SwitchSpeakerListResponse {
        success: true,
        speaker_list_id: position.speaker_list_id,
        current_index: position.current_index,
        total_lists: position.total_lists,
    }))
}

async fn start_timer(
    State(state): State<AppState>,
    payload: Result<Json<SpeakerListRequest>, JsonRejection>,
) -> Result<Json<TimerResponse>, AppError> {
    let list_id = body(payload)?.list_id()?;
    let speaker = state.engine.start_timer(list_id)?;
    Ok(Json(TimerResponse {
        success: true,
        current_speaker: Some(speaker),
    }))
}

async fn stop_timer(
    State(state): State<AppState>,
    payload: Result<Json<SpeakerListRequest>, JsonRejection>,
) -> Result<Json<TimerResponse>, AppError> {
    let list_id = body(payload)?.list_id()?;
    let stopped = state.engine.stop_timer(list_id)?;
    Ok(Json(TimerResponse {
        success: true,
        current_speaker: stopped,
    }))
}

async fn next_speaker(
    State(state): State<AppState>,
    payload: Result<Json<SpeakerListRequest>, JsonRejection>,
) -> Result<Json<NextSpeakerResponse>, AppError> {
    let list_id = body(payload)?.list_id()?;
    let speaker_queue = state.engine.next_speaker(list_id)?;
    Ok(Json(NextSpeakerResponse {
        success: true,
        speaker_queue,
    }))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Unauthorized,
    NotFound(String),
    Conflict(String),
    InvalidState(String),
    Internal(String),
}

impl From<FloorError> for AppError {
    fn from(err: FloorError) -> Self {
        let message = err.to_string();
        let kind = err.kind();
        match kind {
            FloorErrorKind::Validation => AppError::BadRequest(message),
            FloorErrorKind::NotFound => AppError::NotFound(message),
            FloorErrorKind::Conflict => AppError::Conflict(message),
            FloorErrorKind::InvalidState => AppError::InvalidState(message),
            FloorErrorKind::Internal => {
                tracing::error!(
                    error = %message,
                    retryable = kind.is_retryable(),
                    "Floor operation failed"
                );
                AppError::Internal(message)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::InvalidState(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
