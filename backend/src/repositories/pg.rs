//! PostgreSQL implementation of the signature store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{
    attendance::{Attendance, AttendanceWrite},
    class_session::ClassSession,
    report::AttendanceMatrixRow,
    signature_token::{IssueOutcome, IssueRequest, SignatureToken},
    subject::Subject,
};
use crate::repositories::{
    attendance, class_session, signature_token,
    store::{AttendanceStore, PendingSessionQuery, SessionDirectory, StoreError, TokenStore},
    transaction::{begin_transaction, commit_transaction, rollback_transaction},
};
use crate::types::{ClassroomId, OrganizationId, SessionId, SignatureTokenId, SubjectId};

#[derive(Debug, Clone)]
pub struct PgSignatureStore {
    pool: PgPool,
}

impl PgSignatureStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TokenStore for PgSignatureStore {
    async fn find_token_by_value(&self, token: &str) -> Result<Option<SignatureToken>, StoreError> {
        Ok(signature_token::find_by_value(&self.pool, token).await?)
    }

    async fn issue_token(&self, request: IssueRequest) -> Result<IssueOutcome, StoreError> {
        let mut tx = begin_transaction(&self.pool).await?;
        signature_token::lock_pair(&mut *tx, request.session_id, request.subject_id).await?;
        let existing =
            signature_token::find_latest_unused(&mut *tx, request.session_id, request.subject_id)
                .await?;

        let outcome = request.resolve(existing);
        match &outcome {
            IssueOutcome::Reused(_) => {}
            IssueOutcome::Renewed(token) => signature_token::renew(&mut *tx, token).await?,
            IssueOutcome::Minted(token) => signature_token::insert(&mut *tx, token).await?,
        }
        commit_transaction(tx).await?;

        let token = outcome.token();
        tracing::debug!(
            token_id = %token.id,
            session_id = %token.session_id,
            subject_id = %token.subject_id,
            outcome = outcome.kind(),
            "Issued signature token"
        );
        Ok(outcome)
    }

    async fn consume_token(
        &self,
        token_id: SignatureTokenId,
        used_at: DateTime<Utc>,
        write: AttendanceWrite,
    ) -> Result<Option<Attendance>, StoreError> {
        let mut tx = begin_transaction(&self.pool).await?;
        let stamped = signature_token::mark_used_if_active(&mut *tx, token_id, used_at).await?;
        if stamped == 0 {
            rollback_transaction(tx).await?;
            return Ok(None);
        }
        let record = attendance::upsert(&mut *tx, &write).await?;
        commit_transaction(tx).await?;
        Ok(Some(record))
    }

    async fn delete_expired_tokens(
        &self,
        expired_before: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Ok(signature_token::delete_expired_unused(&self.pool, expired_before).await?)
    }
}

#[async_trait]
impl AttendanceStore for PgSignatureStore {
    async fn find_attendance(
        &self,
        session_id: SessionId,
        subject_id: SubjectId,
    ) -> Result<Option<Attendance>, StoreError> {
        Ok(attendance::find_by_pair(&self.pool, session_id, subject_id).await?)
    }

    async fn upsert_attendance(&self, write: AttendanceWrite) -> Result<Attendance, StoreError> {
        Ok(attendance::upsert(&self.pool, &write).await?)
    }
}

#[async_trait]
impl SessionDirectory for PgSignatureStore {
    async fn find_session(&self, id: SessionId) -> Result<Option<ClassSession>, StoreError> {
        Ok(class_session::find_session(&self.pool, id).await?)
    }

    async fn find_subject(&self, id: SubjectId) -> Result<Option<Subject>, StoreError> {
        Ok(class_session::find_subject(&self.pool, id).await?)
    }

    async fn enrolled_classroom_ids(
        &self,
        subject_id: SubjectId,
    ) -> Result<Vec<ClassroomId>, StoreError> {
        Ok(class_session::enrolled_classroom_ids(&self.pool, subject_id).await?)
    }

    async fn pending_past_sessions(
        &self,
        query: PendingSessionQuery,
    ) -> Result<Vec<ClassSession>, StoreError> {
        Ok(class_session::pending_past_sessions(&self.pool, &query).await?)
    }

    async fn session_matrix(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AttendanceMatrixRow>, StoreError> {
        Ok(class_session::session_matrix(&self.pool, session_id).await?)
    }

    async fn classroom_matrix(
        &self,
        classroom_id: ClassroomId,
        now: DateTime<Utc>,
    ) -> Result<Vec<AttendanceMatrixRow>, StoreError> {
        Ok(class_session::classroom_matrix(&self.pool, classroom_id, now).await?)
    }

    async fn find_classroom_organization(
        &self,
        classroom_id: ClassroomId,
    ) -> Result<Option<OrganizationId>, StoreError> {
        Ok(class_session::find_classroom_organization(&self.pool, classroom_id).await?)
    }
}
