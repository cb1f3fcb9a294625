//! Read-only SQL over sessions, classrooms, users and enrollments.

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

use crate::models::{class_session::ClassSession, report::AttendanceMatrixRow, subject::Subject};
use crate::repositories::store::PendingSessionQuery;
use crate::types::{ClassroomId, OrganizationId, SessionId, SubjectId};

const SESSION_COLUMNS: &str = "s.id, s.classroom_id, c.organization_id, c.name AS classroom_name, \
     s.title, s.start_time, s.end_time";

const MATRIX_COLUMNS: &str = "u.id AS subject_id, u.full_name, u.email, s.id AS session_id, \
     s.title AS session_title, s.start_time, s.end_time, a.status, a.signed_at, \
     (a.signature_url IS NOT NULL) AS has_signature";

pub async fn find_session<'e, E: PgExecutor<'e>>(
    executor: E,
    id: SessionId,
) -> Result<Option<ClassSession>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM class_sessions s \
         JOIN classrooms c ON c.id = s.classroom_id \
         WHERE s.id = $1",
        SESSION_COLUMNS
    );
    sqlx::query_as::<_, ClassSession>(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn find_subject<'e, E: PgExecutor<'e>>(
    executor: E,
    id: SubjectId,
) -> Result<Option<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(
        "SELECT id, organization_id, full_name, email, LOWER(role) AS role \
         FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn enrolled_classroom_ids<'e, E: PgExecutor<'e>>(
    executor: E,
    subject_id: SubjectId,
) -> Result<Vec<ClassroomId>, sqlx::Error> {
    sqlx::query_scalar::<_, ClassroomId>(
        "SELECT classroom_id FROM enrollments WHERE user_id = $1 ORDER BY classroom_id",
    )
    .bind(subject_id)
    .fetch_all(executor)
    .await
}

pub async fn pending_past_sessions<'e, E: PgExecutor<'e>>(
    executor: E,
    query: &PendingSessionQuery,
) -> Result<Vec<ClassSession>, sqlx::Error> {
    let classroom_ids: Vec<String> = query
        .classroom_ids
        .iter()
        .map(ToString::to_string)
        .collect();
    let sql = format!(
        "SELECT {} FROM class_sessions s \
         JOIN classrooms c ON c.id = s.classroom_id \
         WHERE s.classroom_id = ANY($1) \
           AND s.id <> $2 \
           AND s.end_time < $3 \
           AND NOT EXISTS ( \
               SELECT 1 FROM attendances a \
               WHERE a.session_id = s.id \
                 AND a.subject_id = $4 \
                 AND a.status IN ('present', 'excused', 'absent') \
           ) \
         ORDER BY s.start_time DESC \
         LIMIT $5",
        SESSION_COLUMNS
    );
    sqlx::query_as::<_, ClassSession>(&sql)
        .bind(classroom_ids)
        .bind(query.exclude_session_id)
        .bind(query.now)
        .bind(query.subject_id)
        .bind(query.limit)
        .fetch_all(executor)
        .await
}

pub async fn session_matrix<'e, E: PgExecutor<'e>>(
    executor: E,
    session_id: SessionId,
) -> Result<Vec<AttendanceMatrixRow>, sqlx::Error> {
    let sql = format!(
        "WITH roster AS ( \
             SELECT e.user_id AS subject_id FROM enrollments e \
             JOIN class_sessions cs ON cs.classroom_id = e.classroom_id \
             WHERE cs.id = $1 \
             UNION \
             SELECT subject_id FROM attendances WHERE session_id = $1 \
         ) \
         SELECT {} FROM roster r \
         JOIN users u ON u.id = r.subject_id \
         JOIN class_sessions s ON s.id = $1 \
         LEFT JOIN attendances a ON a.session_id = s.id AND a.subject_id = u.id \
         ORDER BY u.full_name, u.id",
        MATRIX_COLUMNS
    );
    sqlx::query_as::<_, AttendanceMatrixRow>(&sql)
        .bind(session_id)
        .fetch_all(executor)
        .await
}

pub async fn classroom_matrix<'e, E: PgExecutor<'e>>(
    executor: E,
    classroom_id: ClassroomId,
    now: DateTime<Utc>,
) -> Result<Vec<AttendanceMatrixRow>, sqlx::Error> {
    let sql = format!(
        "WITH roster AS ( \
             SELECT user_id AS subject_id FROM enrollments WHERE classroom_id = $1 \
             UNION \
             SELECT at.subject_id FROM attendances at \
             JOIN class_sessions cs ON cs.id = at.session_id \
             WHERE cs.classroom_id = $1 AND cs.end_time < $2 \
         ) \
         SELECT {} FROM roster r \
         JOIN users u ON u.id = r.subject_id \
         CROSS JOIN class_sessions s \
         LEFT JOIN attendances a ON a.session_id = s.id AND a.subject_id = u.id \
         WHERE s.classroom_id = $1 AND s.end_time < $2 \
         ORDER BY u.full_name, u.id, s.start_time",
        MATRIX_COLUMNS
    );
    sqlx::query_as::<_, AttendanceMatrixRow>(&sql)
        .bind(classroom_id)
        .bind(now)
        .fetch_all(executor)
        .await
}

pub async fn find_classroom_organization<'e, E: PgExecutor<'e>>(
    executor: E,
    classroom_id: ClassroomId,
) -> Result<Option<OrganizationId>, sqlx::Error> {
    sqlx::query_scalar::<_, OrganizationId>("SELECT organization_id FROM classrooms WHERE id = $1")
        .bind(classroom_id)
        .fetch_optional(executor)
        .await
}
