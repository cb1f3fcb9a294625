//! Persistence seams of the signature engine.
//!
//! Services only see these traits. `PgSignatureStore` implements them on
//! PostgreSQL; the `test-utils` feature adds an in-memory implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    attendance::{Attendance, AttendanceWrite},
    class_session::ClassSession,
    report::AttendanceMatrixRow,
    signature_token::{IssueOutcome, IssueRequest, SignatureToken},
    subject::Subject,
};
use crate::types::{ClassroomId, OrganizationId, SessionId, SignatureTokenId, SubjectId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Filter for past sessions a subject never resolved.
#[derive(Debug, Clone)]
pub struct PendingSessionQuery {
    pub subject_id: SubjectId,
    pub classroom_ids: Vec<ClassroomId>,
    pub exclude_session_id: SessionId,
    pub now: DateTime<Utc>,
    pub limit: i64,
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn find_token_by_value(&self, token: &str) -> Result<Option<SignatureToken>, StoreError>;

    /// Issues a token for the request's pair, serialized against concurrent
    /// issuance for the same pair. See [`IssueRequest::resolve`].
    async fn issue_token(&self, request: IssueRequest) -> Result<IssueOutcome, StoreError>;

    /// Marks the token used and applies the attendance write as one unit.
    ///
    /// The token is only stamped if it is still unused and unexpired at `used_at`.
    /// Returns `None`, with nothing written, when that condition no longer holds.
    async fn consume_token(
        &self,
        token_id: SignatureTokenId,
        used_at: DateTime<Utc>,
        write: AttendanceWrite,
    ) -> Result<Option<Attendance>, StoreError>;

    /// Deletes unused tokens that expired before the cutoff. Returns the count.
    async fn delete_expired_tokens(&self, expired_before: DateTime<Utc>) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn find_attendance(
        &self,
        session_id: SessionId,
        subject_id: SubjectId,
    ) -> Result<Option<Attendance>, StoreError>;

    /// Creates or overwrites the row for the write's (session, subject) pair.
    async fn upsert_attendance(&self, write: AttendanceWrite) -> Result<Attendance, StoreError>;
}

/// Read-only view over sessions, classrooms, subjects and enrollments.
#[async_trait]
pub trait SessionDirectory: Send + Sync {
    async fn find_session(&self, id: SessionId) -> Result<Option<ClassSession>, StoreError>;

    async fn find_subject(&self, id: SubjectId) -> Result<Option<Subject>, StoreError>;

    async fn enrolled_classroom_ids(&self, subject_id: SubjectId)
        -> Result<Vec<ClassroomId>, StoreError>;

    /// Past sessions in the given classrooms without a resolved attendance for
    /// the subject, most recent first.
    async fn pending_past_sessions(
        &self,
        query: PendingSessionQuery,
    ) -> Result<Vec<ClassSession>, StoreError>;

    /// Enrolled subjects (plus anyone who already has a row) for one session.
    async fn session_matrix(&self, session_id: SessionId)
        -> Result<Vec<AttendanceMatrixRow>, StoreError>;

    /// Past sessions of one classroom crossed with its roster: enrolled subjects
    /// plus anyone with attendance on one of those past sessions. Ordered by
    /// subject name then session start.
    async fn classroom_matrix(
        &self,
        classroom_id: ClassroomId,
        now: DateTime<Utc>,
    ) -> Result<Vec<AttendanceMatrixRow>, StoreError>;

    /// Returns the owning organization of a classroom, if it exists.
    async fn find_classroom_organization(
        &self,
        classroom_id: ClassroomId,
    ) -> Result<Option<OrganizationId>, StoreError>;
}

/// Everything the signature services need from persistence.
pub trait SignatureStore: TokenStore + AttendanceStore + SessionDirectory {}

impl<T> SignatureStore for T where T: TokenStore + AttendanceStore + SessionDirectory {}
