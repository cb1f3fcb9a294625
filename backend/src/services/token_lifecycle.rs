//! Signature token lifecycle: issue, validate, consume.
//!
//! A token is ACTIVE until `expires_at`, then EXPIRED; consuming it (by signing
//! or declaring an absence) makes it CONSUMED. Expiry is never stored, it is
//! derived from the clock every time a token is read.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

use crate::config::Config;
use crate::error::SignatureError;
use crate::models::{
    actor::Actor,
    attendance::Attendance,
    class_session::{ClassSession, MissedSession},
    signature_token::{
        AbsenceResponse, IssuePolicy, IssueRequest, IssuedTokenResponse, SignResponse,
        SignatureContextResponse, SignatureRequestSummary, SignatureToken, TokenState,
    },
    subject::{Subject, SubjectRole},
};
use crate::repositories::store::SignatureStore;
use crate::services::{
    attendance_recorder::{AttendanceRecorder, Commit},
    missed_sessions::MissedSessionResolver,
    notification::{dispatch, SignatureNotifier},
};
use crate::types::{SessionId, SubjectId};
use crate::utils::{email::SignatureEmail, time::local_date_time, token::generate_signature_token};

/// Default lifetime of a token sent on demand by staff.
pub const DEFAULT_RESEND_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone)]
pub struct SignatureSettings {
    pub resend_ttl: Duration,
    /// Time after a session ends during which its request links stay valid.
    pub request_grace: Duration,
    pub time_zone: Tz,
    pub app_base_url: String,
}

impl SignatureSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            resend_ttl: Duration::minutes(config.signature_resend_ttl_minutes),
            request_grace: Duration::hours(config.signature_request_grace_hours),
            time_zone: config.time_zone,
            app_base_url: config.app_base_url.clone(),
        }
    }

    fn link(&self, token: &str) -> String {
        format!("{}/signature/{}", self.app_base_url, token)
    }
}

impl Default for SignatureSettings {
    fn default() -> Self {
        Self {
            resend_ttl: Duration::minutes(DEFAULT_RESEND_TTL_MINUTES),
            request_grace: Duration::hours(24),
            time_zone: chrono_tz::UTC,
            app_base_url: "http://localhost:8000".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct SignatureService {
    store: Arc<dyn SignatureStore>,
    notifier: Arc<dyn SignatureNotifier>,
    recorder: AttendanceRecorder,
    resolver: MissedSessionResolver,
    settings: SignatureSettings,
}

impl SignatureService {
    pub fn new(
        store: Arc<dyn SignatureStore>,
        notifier: Arc<dyn SignatureNotifier>,
        settings: SignatureSettings,
    ) -> Self {
        Self {
            recorder: AttendanceRecorder::new(store.clone()),
            resolver: MissedSessionResolver::new(store.clone()),
            store,
            notifier,
            settings,
        }
    }

    /// Resolves a token to its subject and session.
    ///
    /// An expired token fails even if it was consumed; a consumed one succeeds
    /// with `already_signed` set.
    pub async fn validate(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<SignatureContextResponse, SignatureError> {
        let token = self.find_token(token).await?;
        if token.is_expired_at(now) {
            return Err(SignatureError::Expired);
        }

        let session = self.load_session(token.session_id).await?;
        let subject = self.load_subject(token.subject_id).await?;
        let already_signed = token.is_used()
            || self
                .store
                .find_attendance(session.id, subject.id)
                .await?
                .is_some_and(|record| record.is_signed());

        let missed_sessions = self
            .resolver
            .find_missed_sessions(subject.id, session.id, session.classroom_id, now)
            .await?;

        Ok(SignatureContextResponse {
            subject: subject.into(),
            session: session.into(),
            already_signed,
            missed_sessions,
        })
    }

    /// Records a signature and consumes the token in one unit.
    pub async fn consume(
        &self,
        token: &str,
        signature: String,
        ip_address: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<SignResponse, SignatureError> {
        let token = self.active_token(token, now).await?;
        let session = self.load_session(token.session_id).await?;
        let attendance = self
            .recorder
            .record_presence(
                session.id,
                token.subject_id,
                signature,
                ip_address,
                now,
                Commit::ConsumeToken(token.id),
            )
            .await?;
        tracing::info!(
            session_id = %session.id,
            subject_id = %token.subject_id,
            "Attendance signed"
        );

        let missed_sessions = self.missed_after_commit(&token, &session, now).await;
        Ok(SignResponse {
            attendance,
            missed_sessions,
        })
    }

    /// Records an absence with its reason and consumes the token in one unit.
    pub async fn declare_absence(
        &self,
        token: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<AbsenceResponse, SignatureError> {
        let token = self.active_token(token, now).await?;
        let session = self.load_session(token.session_id).await?;
        self.recorder
            .record_absence(
                session.id,
                token.subject_id,
                reason,
                now,
                Commit::ConsumeToken(token.id),
            )
            .await?;
        tracing::info!(
            session_id = %session.id,
            subject_id = %token.subject_id,
            "Absence declared"
        );

        let missed_sessions = self.missed_after_commit(&token, &session, now).await;
        Ok(AbsenceResponse { missed_sessions })
    }

    /// Missed sessions for a subject whose outcome is already committed.
    /// Errors are logged and yield an empty list.
    async fn missed_after_commit(
        &self,
        token: &SignatureToken,
        session: &ClassSession,
        now: DateTime<Utc>,
    ) -> Vec<MissedSession> {
        match self
            .resolver
            .find_missed_sessions(token.subject_id, session.id, session.classroom_id, now)
            .await
        {
            Ok(missed) => missed,
            Err(err) => {
                tracing::error!(
                    error = %err,
                    session_id = %session.id,
                    subject_id = %token.subject_id,
                    "Failed to list missed sessions after recording attendance"
                );
                Vec::new()
            }
        }
    }

    /// Issues a token for one subject, renewing any unused one, and notifies them.
    pub async fn issue_or_renew(
        &self,
        actor: &Actor,
        session_id: SessionId,
        subject_id: SubjectId,
        ttl_minutes: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<IssuedTokenResponse, SignatureError> {
        let session = self.authorize_session(actor, session_id).await?;
        let subject = self.load_subject(subject_id).await?;
        if subject.organization_id != session.organization_id {
            return Err(SignatureError::NotFound("Subject"));
        }

        let ttl = ttl_minutes
            .map(Duration::minutes)
            .unwrap_or(self.settings.resend_ttl);
        let token = self.renew_and_notify(&session, &subject, now + ttl, now).await?;
        Ok(IssuedTokenResponse {
            token: token.token,
            expires_at: token.expires_at,
        })
    }

    /// Sends a signature request to every student of the session still pending.
    pub async fn request_signatures(
        &self,
        actor: &Actor,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> Result<SignatureRequestSummary, SignatureError> {
        let session = self.authorize_session(actor, session_id).await?;
        let expires_at = std::cmp::max(
            session.end_time + self.settings.request_grace,
            now + self.settings.resend_ttl,
        );

        let mut summary = SignatureRequestSummary {
            requested: 0,
            skipped: 0,
        };
        for row in self.store.session_matrix(session.id).await? {
            let Some(subject) = self.store.find_subject(row.subject_id).await? else {
                continue;
            };
            if subject.role != SubjectRole::Student {
                continue;
            }
            if row.status.is_some() {
                summary.skipped += 1;
                continue;
            }
            self.renew_and_notify(&session, &subject, expires_at, now)
                .await?;
            summary.requested += 1;
        }

        tracing::info!(
            session_id = %session.id,
            requested = summary.requested,
            skipped = summary.skipped,
            "Signature requests sent"
        );
        Ok(summary)
    }

    /// Records a signature captured on a staff member's device. No token involved.
    pub async fn sign_in_person(
        &self,
        actor: &Actor,
        session_id: SessionId,
        subject_id: SubjectId,
        signature: String,
        ip_address: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Attendance, SignatureError> {
        let session = self.authorize_session(actor, session_id).await?;
        let subject = self.load_subject(subject_id).await?;
        if subject.organization_id != session.organization_id {
            return Err(SignatureError::NotFound("Subject"));
        }
        let record = self
            .recorder
            .record_presence(session.id, subject.id, signature, ip_address, now, Commit::Direct)
            .await?;
        tracing::info!(
            session_id = %session.id,
            subject_id = %subject.id,
            signed_by = %actor.subject_id,
            "Attendance signed in person"
        );
        Ok(record)
    }

    /// Loads a session the actor is allowed to manage.
    pub async fn authorize_session(
        &self,
        actor: &Actor,
        session_id: SessionId,
    ) -> Result<ClassSession, SignatureError> {
        let session = self.load_session(session_id).await?;
        if !actor.can_manage(session.organization_id) {
            return Err(SignatureError::Forbidden(
                "Not allowed to manage this session".to_string(),
            ));
        }
        Ok(session)
    }

    async fn renew_and_notify(
        &self,
        session: &ClassSession,
        subject: &Subject,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<SignatureToken, SignatureError> {
        let token = self
            .store
            .issue_token(IssueRequest {
                session_id: session.id,
                subject_id: subject.id,
                now,
                expires_at,
                fresh_token: generate_signature_token(),
                policy: IssuePolicy::RenewUnused,
            })
            .await?
            .into_token();

        let email = SignatureEmail {
            to_email: subject.email.clone(),
            full_name: subject.full_name.clone(),
            session_title: session.title.clone(),
            classroom_name: session.classroom_name.clone(),
            starts_at: local_date_time(session.start_time, &self.settings.time_zone),
            expires_at: local_date_time(token.expires_at, &self.settings.time_zone),
            link: self.settings.link(&token.token),
        };
        dispatch(self.notifier.as_ref(), email).await;
        Ok(token)
    }

    async fn find_token(&self, token: &str) -> Result<SignatureToken, SignatureError> {
        self.store
            .find_token_by_value(token)
            .await?
            .ok_or(SignatureError::NotFound("Signature token"))
    }

    async fn active_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<SignatureToken, SignatureError> {
        let token = self.find_token(token).await?;
        match token.state_at(now) {
            TokenState::Active => Ok(token),
            TokenState::Expired => Err(SignatureError::Expired),
            TokenState::Consumed => Err(SignatureError::AlreadyUsed),
        }
    }

    async fn load_session(&self, id: SessionId) -> Result<ClassSession, SignatureError> {
        self.store
            .find_session(id)
            .await?
            .ok_or(SignatureError::NotFound("Session"))
    }

    async fn load_subject(&self, id: SubjectId) -> Result<Subject, SignatureError> {
        self.store
            .find_subject(id)
            .await?
            .ok_or(SignatureError::NotFound("Subject"))
    }
}
