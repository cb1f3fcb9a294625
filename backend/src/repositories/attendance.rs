//! SQL for the `attendances` table.

use sqlx::PgExecutor;

use crate::models::attendance::{Attendance, AttendanceOutcome, AttendanceWrite};
use crate::types::{AttendanceId, SessionId, SubjectId};

const SELECT_COLUMNS: &str = "id, session_id, subject_id, status, signature_url, proof_url, \
     signed_at, ip_address, created_at, updated_at";

pub async fn find_by_pair<'e, E: PgExecutor<'e>>(
    executor: E,
    session_id: SessionId,
    subject_id: SubjectId,
) -> Result<Option<Attendance>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM attendances WHERE session_id = $1 AND subject_id = $2",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, Attendance>(&query)
        .bind(session_id)
        .bind(subject_id)
        .fetch_optional(executor)
        .await
}

/// Inserts the row or overwrites the outcome's columns on the existing one.
///
/// A presence overwrites status, signature, IP and signing time. An absence
/// overwrites status, proof and signing time; the other columns are left as they were.
pub async fn upsert<'e, E: PgExecutor<'e>>(
    executor: E,
    write: &AttendanceWrite,
) -> Result<Attendance, sqlx::Error> {
    let status = write.status().as_str();
    match &write.outcome {
        AttendanceOutcome::Present {
            signature_url,
            ip_address,
        } => {
            let query = format!(
                "INSERT INTO attendances \
                    (id, session_id, subject_id, status, signature_url, proof_url, \
                     signed_at, ip_address, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, NULL, $6, $7, $6, $6) \
                 ON CONFLICT (session_id, subject_id) DO UPDATE SET \
                    status = EXCLUDED.status, \
                    signature_url = EXCLUDED.signature_url, \
                    signed_at = EXCLUDED.signed_at, \
                    ip_address = EXCLUDED.ip_address, \
                    updated_at = EXCLUDED.updated_at \
                 RETURNING {}",
                SELECT_COLUMNS
            );
            sqlx::query_as::<_, Attendance>(&query)
                .bind(AttendanceId::new())
                .bind(write.session_id)
                .bind(write.subject_id)
                .bind(status)
                .bind(signature_url)
                .bind(write.signed_at)
                .bind(ip_address)
                .fetch_one(executor)
                .await
        }
        AttendanceOutcome::Absent { proof_url } => {
            let query = format!(
                "INSERT INTO attendances \
                    (id, session_id, subject_id, status, signature_url, proof_url, \
                     signed_at, ip_address, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, NULL, $5, $6, NULL, $6, $6) \
                 ON CONFLICT (session_id, subject_id) DO UPDATE SET \
                    status = EXCLUDED.status, \
                    proof_url = EXCLUDED.proof_url, \
                    signed_at = EXCLUDED.signed_at, \
                    updated_at = EXCLUDED.updated_at \
                 RETURNING {}",
                SELECT_COLUMNS
            );
            sqlx::query_as::<_, Attendance>(&query)
                .bind(AttendanceId::new())
                .bind(write.session_id)
                .bind(write.subject_id)
                .bind(status)
                .bind(proof_url)
                .bind(write.signed_at)
                .fetch_one(executor)
                .await
        }
    }
}
