//! In-memory signature store for service and API tests.
//!
//! Mirrors the PostgreSQL store's semantics: issuance and consumption happen
//! under one lock, so they are atomic with respect to each other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard,
};

use crate::models::{
    attendance::{Attendance, AttendanceStatus, AttendanceWrite},
    class_session::ClassSession,
    report::AttendanceMatrixRow,
    signature_token::{IssueOutcome, IssueRequest, SignatureToken},
    subject::{Subject, SubjectRole},
};
use crate::repositories::store::{
    AttendanceStore, PendingSessionQuery, SessionDirectory, StoreError, TokenStore,
};
use crate::types::{ClassroomId, OrganizationId, SessionId, SignatureTokenId, SubjectId};

#[derive(Debug, Default)]
struct Inner {
    classrooms: HashMap<ClassroomId, (OrganizationId, String)>,
    subjects: HashMap<SubjectId, Subject>,
    enrollments: BTreeSet<(SubjectId, ClassroomId)>,
    sessions: HashMap<SessionId, ClassSession>,
    tokens: Vec<SignatureToken>,
    attendances: Vec<Attendance>,
}

#[derive(Debug, Default)]
pub struct InMemorySignatureStore {
    inner: Mutex<Inner>,
    fail_writes: AtomicBool,
    fail_issuance: AtomicBool,
}

impl InMemorySignatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("in-memory store poisoned".into()))
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("writes disabled".into()));
        }
        Ok(())
    }

    /// Makes every subsequent write fail with a backend error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes token issuance fail while other writes keep working.
    pub fn set_fail_issuance(&self, fail: bool) {
        self.fail_issuance.store(fail, Ordering::SeqCst);
    }

    pub fn add_classroom(&self, organization_id: OrganizationId, name: &str) -> ClassroomId {
        let id = ClassroomId::new();
        self.inner
            .lock()
            .expect("lock store")
            .classrooms
            .insert(id, (organization_id, name.to_string()));
        id
    }

    pub fn add_subject(
        &self,
        organization_id: OrganizationId,
        full_name: &str,
        role: SubjectRole,
    ) -> Subject {
        let subject = Subject {
            id: SubjectId::new(),
            organization_id,
            full_name: full_name.to_string(),
            email: format!("{}@example.com", full_name.to_lowercase().replace(' ', ".")),
            role,
        };
        self.inner
            .lock()
            .expect("lock store")
            .subjects
            .insert(subject.id, subject.clone());
        subject
    }

    pub fn enroll(&self, subject_id: SubjectId, classroom_id: ClassroomId) {
        self.inner
            .lock()
            .expect("lock store")
            .enrollments
            .insert((subject_id, classroom_id));
    }

    pub fn add_session(
        &self,
        classroom_id: ClassroomId,
        title: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> ClassSession {
        let mut inner = self.inner.lock().expect("lock store");
        let (organization_id, classroom_name) = inner
            .classrooms
            .get(&classroom_id)
            .cloned()
            .expect("classroom must be added before its sessions");
        let session = ClassSession {
            id: SessionId::new(),
            classroom_id,
            organization_id,
            classroom_name,
            title: title.to_string(),
            start_time,
            end_time,
        };
        inner.sessions.insert(session.id, session.clone());
        session
    }

    /// Inserts a token row as is, bypassing issuance rules.
    pub fn insert_token(&self, token: SignatureToken) {
        self.inner.lock().expect("lock store").tokens.push(token);
    }

    /// Inserts an attendance row directly, the way administrative tooling would.
    pub fn insert_attendance(
        &self,
        session_id: SessionId,
        subject_id: SubjectId,
        status: AttendanceStatus,
        now: DateTime<Utc>,
    ) -> Attendance {
        let record = Attendance {
            id: crate::types::AttendanceId::new(),
            session_id,
            subject_id,
            status,
            signature_url: None,
            proof_url: None,
            signed_at: Some(now),
            ip_address: None,
            created_at: now,
            updated_at: now,
        };
        let mut inner = self.inner.lock().expect("lock store");
        inner
            .attendances
            .retain(|a| !(a.session_id == session_id && a.subject_id == subject_id));
        inner.attendances.push(record.clone());
        record
    }

    pub fn tokens(&self) -> Vec<SignatureToken> {
        self.inner.lock().expect("lock store").tokens.clone()
    }

    pub fn attendances(&self) -> Vec<Attendance> {
        self.inner.lock().expect("lock store").attendances.clone()
    }
}

fn upsert_locked(inner: &mut Inner, write: AttendanceWrite) -> Attendance {
    if let Some(existing) = inner
        .attendances
        .iter_mut()
        .find(|a| a.session_id == write.session_id && a.subject_id == write.subject_id)
    {
        write.apply_to(existing);
        return existing.clone();
    }
    let record = write.into_new_record();
    inner.attendances.push(record.clone());
    record
}

fn matrix_row(
    subject: &Subject,
    session: &ClassSession,
    attendance: Option<&Attendance>,
) -> AttendanceMatrixRow {
    AttendanceMatrixRow {
        subject_id: subject.id,
        full_name: subject.full_name.clone(),
        email: subject.email.clone(),
        session_id: session.id,
        session_title: session.title.clone(),
        start_time: session.start_time,
        end_time: session.end_time,
        status: attendance.map(|a| a.status),
        signed_at: attendance.and_then(|a| a.signed_at),
        has_signature: attendance.is_some_and(|a| a.signature_url.is_some()),
    }
}

impl Inner {
    fn roster_for(&self, classroom_id: ClassroomId, session_ids: &[SessionId]) -> Vec<Subject> {
        let mut ids: BTreeSet<SubjectId> = self
            .enrollments
            .iter()
            .filter(|(_, classroom)| *classroom == classroom_id)
            .map(|(subject, _)| *subject)
            .collect();
        ids.extend(
            self.attendances
                .iter()
                .filter(|a| session_ids.contains(&a.session_id))
                .map(|a| a.subject_id),
        );
        let mut subjects: Vec<Subject> = ids
            .into_iter()
            .filter_map(|id| self.subjects.get(&id).cloned())
            .collect();
        subjects.sort_by(|a, b| a.full_name.cmp(&b.full_name).then(a.id.cmp(&b.id)));
        subjects
    }

    fn attendance_for(&self, session_id: SessionId, subject_id: SubjectId) -> Option<&Attendance> {
        self.attendances
            .iter()
            .find(|a| a.session_id == session_id && a.subject_id == subject_id)
    }
}

#[async_trait]
impl TokenStore for InMemorySignatureStore {
    async fn find_token_by_value(&self, token: &str) -> Result<Option<SignatureToken>, StoreError> {
        Ok(self.lock()?.tokens.iter().find(|t| t.token == token).cloned())
    }

    async fn issue_token(&self, request: IssueRequest) -> Result<IssueOutcome, StoreError> {
        self.check_writable()?;
        if self.fail_issuance.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("issuance disabled".into()));
        }
        let mut inner = self.lock()?;
        let existing = inner
            .tokens
            .iter()
            .filter(|t| {
                t.session_id == request.session_id
                    && t.subject_id == request.subject_id
                    && t.used_at.is_none()
            })
            .max_by_key(|t| (t.expires_at, t.created_at))
            .cloned();

        let outcome = request.resolve(existing);
        match &outcome {
            IssueOutcome::Reused(_) => {}
            IssueOutcome::Renewed(token) => {
                if let Some(stored) = inner.tokens.iter_mut().find(|t| t.id == token.id) {
                    stored.expires_at = token.expires_at;
                    stored.email_sent_at = token.email_sent_at;
                }
            }
            IssueOutcome::Minted(token) => inner.tokens.push(token.clone()),
        }
        Ok(outcome)
    }

    async fn consume_token(
        &self,
        token_id: SignatureTokenId,
        used_at: DateTime<Utc>,
        write: AttendanceWrite,
    ) -> Result<Option<Attendance>, StoreError> {
        self.check_writable()?;
        let mut inner = self.lock()?;
        let Some(token) = inner.tokens.iter_mut().find(|t| t.id == token_id) else {
            return Ok(None);
        };
        if token.used_at.is_some() || token.expires_at <= used_at {
            return Ok(None);
        }
        token.used_at = Some(used_at);
        Ok(Some(upsert_locked(&mut inner, write)))
    }

    async fn delete_expired_tokens(
        &self,
        expired_before: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        self.check_writable()?;
        let mut inner = self.lock()?;
        let before = inner.tokens.len();
        inner
            .tokens
            .retain(|t| t.used_at.is_some() || t.expires_at >= expired_before);
        Ok((before - inner.tokens.len()) as u64)
    }
}

#[async_trait]
impl AttendanceStore for InMemorySignatureStore {
    async fn find_attendance(
        &self,
        session_id: SessionId,
        subject_id: SubjectId,
    ) -> Result<Option<Attendance>, StoreError> {
        Ok(self.lock()?.attendance_for(session_id, subject_id).cloned())
    }

    async fn upsert_attendance(&self, write: AttendanceWrite) -> Result<Attendance, StoreError> {
        self.check_writable()?;
        let mut inner = self.lock()?;
        Ok(upsert_locked(&mut inner, write))
    }
}

#[async_trait]
impl SessionDirectory for InMemorySignatureStore {
    async fn find_session(&self, id: SessionId) -> Result<Option<ClassSession>, StoreError> {
        Ok(self.lock()?.sessions.get(&id).cloned())
    }

    async fn find_subject(&self, id: SubjectId) -> Result<Option<Subject>, StoreError> {
        Ok(self.lock()?.subjects.get(&id).cloned())
    }

    async fn enrolled_classroom_ids(
        &self,
        subject_id: SubjectId,
    ) -> Result<Vec<ClassroomId>, StoreError> {
        Ok(self
            .lock()?
            .enrollments
            .iter()
            .filter(|(subject, _)| *subject == subject_id)
            .map(|(_, classroom)| *classroom)
            .collect())
    }

    async fn pending_past_sessions(
        &self,
        query: PendingSessionQuery,
    ) -> Result<Vec<ClassSession>, StoreError> {
        let inner = self.lock()?;
        let mut sessions: Vec<ClassSession> = inner
            .sessions
            .values()
            .filter(|s| query.classroom_ids.contains(&s.classroom_id))
            .filter(|s| s.id != query.exclude_session_id)
            .filter(|s| s.end_time < query.now)
            .filter(|s| inner.attendance_for(s.id, query.subject_id).is_none())
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        sessions.truncate(query.limit.max(0) as usize);
        Ok(sessions)
    }

    async fn session_matrix(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AttendanceMatrixRow>, StoreError> {
        let inner = self.lock()?;
        let Some(session) = inner.sessions.get(&session_id) else {
            return Ok(Vec::new());
        };
        Ok(inner
            .roster_for(session.classroom_id, &[session.id])
            .iter()
            .map(|subject| {
                matrix_row(subject, session, inner.attendance_for(session.id, subject.id))
            })
            .collect())
    }

    async fn classroom_matrix(
        &self,
        classroom_id: ClassroomId,
        now: DateTime<Utc>,
    ) -> Result<Vec<AttendanceMatrixRow>, StoreError> {
        let inner = self.lock()?;
        let mut sessions: Vec<&ClassSession> = inner
            .sessions
            .values()
            .filter(|s| s.classroom_id == classroom_id && s.end_time < now)
            .collect();
        sessions.sort_by_key(|s| s.start_time);
        let session_ids: Vec<SessionId> = sessions.iter().map(|s| s.id).collect();

        let mut rows = Vec::new();
        for subject in inner.roster_for(classroom_id, &session_ids) {
            for session in &sessions {
                rows.push(matrix_row(
                    &subject,
                    session,
                    inner.attendance_for(session.id, subject.id),
                ));
            }
        }
        Ok(rows)
    }

    async fn find_classroom_organization(
        &self,
        classroom_id: ClassroomId,
    ) -> Result<Option<OrganizationId>, StoreError> {
        Ok(self
            .lock()?
            .classrooms
            .get(&classroom_id)
            .map(|(organization_id, _)| *organization_id))
    }
}
