use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    models::{actor::Actor, subject::SubjectRole},
    state::AppState,
    utils::jwt::{verify_access_token, Claims},
};

/// Requires a bearer token of a teacher or admin; inserts the [`Actor`].
pub async fn auth_staff(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let actor = authenticate_request(request.headers(), &state.config.jwt_secret)?;
    if !actor.role.is_staff() {
        return Err(AppError::Forbidden("Staff role required".into()));
    }
    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    if let Some(rest) = header.strip_prefix("Bearer ") {
        return Some(rest);
    }
    if let Some(rest) = header.strip_prefix("bearer ") {
        return Some(rest);
    }
    if let Some(space_idx) = header.find(' ') {
        let (scheme, rest) = header.split_at(space_idx);
        if scheme.eq_ignore_ascii_case("bearer") {
            return Some(rest.trim_start());
        }
    }
    None
}

fn actor_from_claims(claims: &Claims) -> Option<Actor> {
    let role: SubjectRole =
        serde_json::from_value(serde_json::Value::String(claims.role.to_lowercase())).ok()?;
    Some(Actor {
        subject_id: claims.sub.parse().ok()?,
        organization_id: claims.organization_id.parse().ok()?,
        role,
    })
}

fn authenticate_request(headers: &HeaderMap, secret: &str) -> Result<Actor, AppError> {
    let unauthorized = || AppError::Unauthorized("Missing or invalid bearer token".into());
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer_token)
        .ok_or_else(unauthorized)?;

    let claims = verify_access_token(token, secret).map_err(|_| unauthorized())?;
    actor_from_claims(&claims).ok_or_else(unauthorized)
}
