//! Presence and absence outcomes for one (session, subject) pair.
//!
//! Every write is an overwrite of the outcome's fields: presence replaces the
//! signature, timestamp and address; absence replaces the reason and timestamp
//! and leaves any earlier signature in place.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::SignatureError;
use crate::models::attendance::{
    Attendance, AttendanceOutcome, AttendanceWrite, ABSENCE_REASON_PREFIX,
};
use crate::repositories::store::SignatureStore;
use crate::types::{SessionId, SignatureTokenId, SubjectId};

fn presence_write(
    session_id: SessionId,
    subject_id: SubjectId,
    signature: String,
    ip_address: Option<String>,
    now: DateTime<Utc>,
) -> AttendanceWrite {
    AttendanceWrite {
        session_id,
        subject_id,
        outcome: AttendanceOutcome::Present {
            signature_url: signature,
            ip_address,
        },
        signed_at: now,
    }
}

fn absence_write(
    session_id: SessionId,
    subject_id: SubjectId,
    reason: &str,
    now: DateTime<Utc>,
) -> AttendanceWrite {
    AttendanceWrite {
        session_id,
        subject_id,
        outcome: AttendanceOutcome::Absent {
            proof_url: format!("{}{}", ABSENCE_REASON_PREFIX, reason.trim()),
        },
        signed_at: now,
    }
}

/// How a write reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// Plain upsert, used when staff record on the subject's behalf.
    Direct,
    /// Upsert together with consuming the token; nothing is written if the
    /// token is no longer active.
    ConsumeToken(SignatureTokenId),
}

#[derive(Clone)]
pub struct AttendanceRecorder {
    store: Arc<dyn SignatureStore>,
}

impl AttendanceRecorder {
    pub fn new(store: Arc<dyn SignatureStore>) -> Self {
        Self { store }
    }

    pub async fn record_presence(
        &self,
        session_id: SessionId,
        subject_id: SubjectId,
        signature: String,
        ip_address: Option<String>,
        now: DateTime<Utc>,
        commit: Commit,
    ) -> Result<Attendance, SignatureError> {
        let write = presence_write(session_id, subject_id, signature, ip_address, now);
        self.apply(write, now, commit).await
    }

    pub async fn record_absence(
        &self,
        session_id: SessionId,
        subject_id: SubjectId,
        reason: &str,
        now: DateTime<Utc>,
        commit: Commit,
    ) -> Result<Attendance, SignatureError> {
        let write = absence_write(session_id, subject_id, reason, now);
        self.apply(write, now, commit).await
    }

    async fn apply(
        &self,
        write: AttendanceWrite,
        now: DateTime<Utc>,
        commit: Commit,
    ) -> Result<Attendance, SignatureError> {
        match commit {
            Commit::Direct => Ok(self.store.upsert_attendance(write).await?),
            Commit::ConsumeToken(token_id) => self
                .store
                .consume_token(token_id, now, write)
                .await?
                .ok_or(SignatureError::AlreadyUsed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{attendance::AttendanceStatus, signature_token::SignatureToken};
    use crate::repositories::memory::InMemorySignatureStore;
    use chrono::Duration;

    fn recorder() -> (Arc<InMemorySignatureStore>, AttendanceRecorder) {
        let store = Arc::new(InMemorySignatureStore::new());
        let recorder = AttendanceRecorder::new(store.clone());
        (store, recorder)
    }

    #[tokio::test]
    async fn absence_records_reason_with_prefix() {
        let (_, recorder) = recorder();
        let record = recorder
            .record_absence(
                SessionId::new(),
                SubjectId::new(),
                "Sick",
                Utc::now(),
                Commit::Direct,
            )
            .await
            .unwrap();
        assert_eq!(record.status, AttendanceStatus::Absent);
        assert_eq!(record.proof_url.as_deref(), Some("Reason: Sick"));
        assert!(record.signature_url.is_none());
    }

    #[tokio::test]
    async fn presence_overwrites_previous_presence() {
        let (store, recorder) = recorder();
        let (session, subject) = (SessionId::new(), SubjectId::new());
        let now = Utc::now();
        recorder
            .record_presence(
                session,
                subject,
                "sig1".into(),
                Some("10.0.0.1".into()),
                now,
                Commit::Direct,
            )
            .await
            .unwrap();
        let later = now + Duration::minutes(5);
        let record = recorder
            .record_presence(session, subject, "sig2".into(), None, later, Commit::Direct)
            .await
            .unwrap();

        assert_eq!(record.signature_url.as_deref(), Some("sig2"));
        assert_eq!(record.ip_address, None);
        assert_eq!(record.signed_at, Some(later));
        assert_eq!(store.attendances().len(), 1);
    }

    #[tokio::test]
    async fn presence_after_absence_keeps_reason() {
        let (_, recorder) = recorder();
        let (session, subject) = (SessionId::new(), SubjectId::new());
        let now = Utc::now();
        recorder
            .record_absence(session, subject, "Train delayed", now, Commit::Direct)
            .await
            .unwrap();
        let record = recorder
            .record_presence(session, subject, "sig".into(), None, now, Commit::Direct)
            .await
            .unwrap();
        assert_eq!(record.status, AttendanceStatus::Present);
        assert_eq!(record.proof_url.as_deref(), Some("Reason: Train delayed"));
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_persistence_error() {
        let (store, recorder) = recorder();
        store.set_fail_writes(true);
        let err = recorder
            .record_presence(
                SessionId::new(),
                SubjectId::new(),
                "sig".into(),
                None,
                Utc::now(),
                Commit::Direct,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SignatureError::Persistence(_)));
    }

    #[tokio::test]
    async fn token_bound_absence_is_written_once() {
        let (store, recorder) = recorder();
        let (session, subject) = (SessionId::new(), SubjectId::new());
        let now = Utc::now();
        let token = SignatureToken::new(
            session,
            subject,
            "abc123".into(),
            now + Duration::minutes(30),
            now,
        );
        store.insert_token(token.clone());

        let record = recorder
            .record_absence(session, subject, " Sick ", now, Commit::ConsumeToken(token.id))
            .await
            .unwrap();
        assert_eq!(record.proof_url.as_deref(), Some("Reason: Sick"));
        assert_eq!(store.tokens()[0].used_at, Some(now));

        let err = recorder
            .record_presence(
                session,
                subject,
                "sig".into(),
                None,
                now,
                Commit::ConsumeToken(token.id),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SignatureError::AlreadyUsed));
        let rows = store.attendances();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, AttendanceStatus::Absent);
    }
}
