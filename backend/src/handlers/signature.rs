//! Public signature endpoints. The token in the path is the only credential.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        attendance::{AbsencePayload, SignPayload},
        signature_token::{AbsenceResponse, SignResponse, SignatureContextResponse},
    },
    state::AppState,
    utils::{network::client_ip, time},
};

pub async fn get_signature(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<SignatureContextResponse>, AppError> {
    let now = time::now_utc(&state.config.time_zone);
    let context = state.signatures.validate(&token, now).await?;
    Ok(Json(context))
}

pub async fn sign(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<SignPayload>,
) -> Result<Json<SignResponse>, AppError> {
    payload.validate()?;
    let now = time::now_utc(&state.config.time_zone);
    let signed = state
        .signatures
        .consume(&token, payload.signature, client_ip(&headers), now)
        .await?;
    Ok(Json(signed))
}

pub async fn declare_absence(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<AbsencePayload>,
) -> Result<Json<AbsenceResponse>, AppError> {
    payload.validate()?;
    let now = time::now_utc(&state.config.time_zone);
    let declared = state
        .signatures
        .declare_absence(&token, &payload.reason, now)
        .await?;
    Ok(Json(declared))
}
