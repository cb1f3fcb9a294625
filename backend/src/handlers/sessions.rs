//! Staff endpoints scoped to one class session.

use axum::{
    extract::{Extension, Path, State},
    http::HeaderMap,
    Json,
};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::parse_id,
    models::{
        actor::Actor,
        attendance::{Attendance, InPersonSignPayload},
        report::SessionRosterResponse,
        signature_token::{IssueTokenPayload, IssuedTokenResponse, SignatureRequestSummary},
    },
    state::AppState,
    types::SessionId,
    utils::{network::client_ip, time},
};

pub async fn issue_signature_token(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(session_id): Path<String>,
    Json(payload): Json<IssueTokenPayload>,
) -> Result<Json<IssuedTokenResponse>, AppError> {
    payload.validate()?;
    let session_id: SessionId = parse_id(&session_id, "session id")?;
    let now = time::now_utc(&state.config.time_zone);
    let issued = state
        .signatures
        .issue_or_renew(&actor, session_id, payload.subject_id, payload.ttl_minutes, now)
        .await?;
    Ok(Json(issued))
}

pub async fn request_signatures(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(session_id): Path<String>,
) -> Result<Json<SignatureRequestSummary>, AppError> {
    let session_id: SessionId = parse_id(&session_id, "session id")?;
    let now = time::now_utc(&state.config.time_zone);
    let summary = state
        .signatures
        .request_signatures(&actor, session_id, now)
        .await?;
    Ok(Json(summary))
}

pub async fn sign_in_person(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<InPersonSignPayload>,
) -> Result<Json<Attendance>, AppError> {
    payload.validate()?;
    let session_id: SessionId = parse_id(&session_id, "session id")?;
    let now = time::now_utc(&state.config.time_zone);
    let record = state
        .signatures
        .sign_in_person(
            &actor,
            session_id,
            payload.subject_id,
            payload.signature,
            client_ip(&headers),
            now,
        )
        .await?;
    Ok(Json(record))
}

pub async fn session_attendance(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionRosterResponse>, AppError> {
    let session_id: SessionId = parse_id(&session_id, "session id")?;
    let roster = state.reports.session_roster(&actor, session_id).await?;
    Ok(Json(roster))
}
