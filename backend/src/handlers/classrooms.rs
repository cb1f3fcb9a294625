use axum::{
    extract::{Extension, Path, State},
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
    Json,
};

use crate::{
    error::AppError,
    handlers::parse_id,
    models::{actor::Actor, report::ClassroomAttendanceSummary},
    state::AppState,
    types::ClassroomId,
    utils::time,
};

pub async fn attendance_summary(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(classroom_id): Path<String>,
) -> Result<Json<ClassroomAttendanceSummary>, AppError> {
    let classroom_id: ClassroomId = parse_id(&classroom_id, "classroom id")?;
    let now = time::now_utc(&state.config.time_zone);
    let summary = state
        .reports
        .classroom_summary(&actor, classroom_id, now)
        .await?;
    Ok(Json(summary))
}

pub async fn export_attendance(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(classroom_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let classroom_id: ClassroomId = parse_id(&classroom_id, "classroom id")?;
    let now = time::now_utc(&state.config.time_zone);
    let csv = state
        .reports
        .classroom_export(&actor, classroom_id, now)
        .await?;

    let filename = format!(
        "attendance_{}_{}.csv",
        classroom_id,
        time::now_in_timezone(&state.config.time_zone).format("%Y%m%d_%H%M%S")
    );
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok((headers, csv))
}
