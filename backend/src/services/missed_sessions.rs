//! Finds past sessions a subject never signed and hands out backfill tokens.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::error::SignatureError;
use crate::models::class_session::MissedSession;
use crate::models::signature_token::{IssuePolicy, IssueRequest};
use crate::repositories::store::{PendingSessionQuery, SignatureStore};
use crate::types::{ClassroomId, SessionId, SubjectId};
use crate::utils::token::generate_signature_token;

/// Most sessions returned per lookup.
pub const MISSED_SESSION_LIMIT: i64 = 5;

/// Lifetime of a backfill token.
pub const BACKFILL_TOKEN_TTL_MINUTES: i64 = 60;

#[derive(Clone)]
pub struct MissedSessionResolver {
    store: Arc<dyn SignatureStore>,
}

impl MissedSessionResolver {
    pub fn new(store: Arc<dyn SignatureStore>) -> Self {
        Self { store }
    }

    /// Past sessions in the subject's classrooms (and the current one) with no
    /// attendance row, most recent first, each with a usable token.
    pub async fn find_missed_sessions(
        &self,
        subject_id: SubjectId,
        current_session_id: SessionId,
        current_classroom_id: ClassroomId,
        now: DateTime<Utc>,
    ) -> Result<Vec<MissedSession>, SignatureError> {
        let mut classroom_ids = self.store.enrolled_classroom_ids(subject_id).await?;
        if !classroom_ids.contains(&current_classroom_id) {
            classroom_ids.push(current_classroom_id);
        }

        let sessions = self
            .store
            .pending_past_sessions(PendingSessionQuery {
                subject_id,
                classroom_ids,
                exclude_session_id: current_session_id,
                now,
                limit: MISSED_SESSION_LIMIT,
            })
            .await?;

        let mut missed = Vec::with_capacity(sessions.len());
        for session in sessions {
            let outcome = self
                .store
                .issue_token(IssueRequest {
                    session_id: session.id,
                    subject_id,
                    now,
                    expires_at: now + Duration::minutes(BACKFILL_TOKEN_TTL_MINUTES),
                    fresh_token: generate_signature_token(),
                    policy: IssuePolicy::ReuseActive,
                })
                .await?;
            let token = outcome.into_token();
            missed.push(MissedSession {
                session_id: session.id,
                title: session.title,
                classroom_name: session.classroom_name,
                start_time: session.start_time,
                end_time: session.end_time,
                token: token.token,
                token_expires_at: token.expires_at,
            });
        }

        tracing::debug!(
            subject_id = %subject_id,
            current_session_id = %current_session_id,
            count = missed.len(),
            "Resolved missed sessions"
        );
        Ok(missed)
    }
}
