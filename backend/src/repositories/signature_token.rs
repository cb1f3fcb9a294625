//! SQL for the `signature_tokens` table.

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

use crate::models::signature_token::SignatureToken;
use crate::types::{SessionId, SignatureTokenId, SubjectId};

const SELECT_COLUMNS: &str =
    "id, token, session_id, subject_id, expires_at, used_at, email_sent_at, created_at";

pub async fn find_by_value<'e, E: PgExecutor<'e>>(
    executor: E,
    token: &str,
) -> Result<Option<SignatureToken>, sqlx::Error> {
    let query = format!("SELECT {} FROM signature_tokens WHERE token = $1", SELECT_COLUMNS);
    sqlx::query_as::<_, SignatureToken>(&query)
        .bind(token)
        .fetch_optional(executor)
        .await
}

/// Serializes issuance for one (session, subject) pair until the transaction ends.
pub async fn lock_pair<'e, E: PgExecutor<'e>>(
    executor: E,
    session_id: SessionId,
    subject_id: SubjectId,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("signature:{}:{}", session_id, subject_id))
        .execute(executor)
        .await
        .map(|_| ())
}

/// The unused token for the pair that stays valid the longest, expired or not.
pub async fn find_latest_unused<'e, E: PgExecutor<'e>>(
    executor: E,
    session_id: SessionId,
    subject_id: SubjectId,
) -> Result<Option<SignatureToken>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM signature_tokens \
         WHERE session_id = $1 AND subject_id = $2 AND used_at IS NULL \
         ORDER BY expires_at DESC, created_at DESC \
         LIMIT 1",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, SignatureToken>(&query)
        .bind(session_id)
        .bind(subject_id)
        .fetch_optional(executor)
        .await
}

pub async fn insert<'e, E: PgExecutor<'e>>(
    executor: E,
    token: &SignatureToken,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO signature_tokens \
            (id, token, session_id, subject_id, expires_at, used_at, email_sent_at, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(token.id)
    .bind(&token.token)
    .bind(token.session_id)
    .bind(token.subject_id)
    .bind(token.expires_at)
    .bind(token.used_at)
    .bind(token.email_sent_at)
    .bind(token.created_at)
    .execute(executor)
    .await
    .map(|_| ())
}

pub async fn renew<'e, E: PgExecutor<'e>>(
    executor: E,
    token: &SignatureToken,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE signature_tokens SET expires_at = $2, email_sent_at = $3 \
         WHERE id = $1 AND used_at IS NULL",
    )
    .bind(token.id)
    .bind(token.expires_at)
    .bind(token.email_sent_at)
    .execute(executor)
    .await
    .map(|_| ())
}

/// Stamps `used_at` only if the token is still unused and unexpired.
///
/// Returns the number of rows stamped: 1 for the winning caller, 0 otherwise.
pub async fn mark_used_if_active<'e, E: PgExecutor<'e>>(
    executor: E,
    token_id: SignatureTokenId,
    used_at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE signature_tokens SET used_at = $2 \
         WHERE id = $1 AND used_at IS NULL AND expires_at > $2",
    )
    .bind(token_id)
    .bind(used_at)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete_expired_unused<'e, E: PgExecutor<'e>>(
    executor: E,
    expired_before: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM signature_tokens WHERE used_at IS NULL AND expires_at < $1",
    )
    .bind(expired_before)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
