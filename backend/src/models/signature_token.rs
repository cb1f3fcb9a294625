//! Signature tokens: single-use, time-boxed credentials for signing one session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{
    attendance::Attendance,
    class_session::{MissedSession, SessionResponse},
    subject::SubjectResponse,
};
use crate::types::{SessionId, SignatureTokenId, SubjectId};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// Database representation of a signature token.
pub struct SignatureToken {
    pub id: SignatureTokenId,
    /// Opaque value presented by the signer in the signature link.
    pub token: String,
    pub session_id: SessionId,
    /// Student or teacher allowed to consume this token.
    pub subject_id: SubjectId,
    pub expires_at: DateTime<Utc>,
    /// Set once the token has been consumed. Terminal.
    pub used_at: Option<DateTime<Utc>>,
    /// Last notification dispatch, kept for auditing only.
    pub email_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Observed lifecycle state of a token at a given instant.
///
/// Expiry is never written; it is derived from `expires_at` whenever a token is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
    Active,
    Expired,
    Consumed,
}

impl SignatureToken {
    pub fn new(
        session_id: SessionId,
        subject_id: SubjectId,
        token: String,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SignatureTokenId::new(),
            token,
            session_id,
            subject_id,
            expires_at,
            used_at: None,
            email_sent_at: None,
            created_at: now,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        if self.is_used() {
            TokenState::Consumed
        } else if self.is_expired_at(now) {
            TokenState::Expired
        } else {
            TokenState::Active
        }
    }
}

/// How an issuance treats an unused token that already exists for the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuePolicy {
    /// Extend any unused token, expired or not, and stamp the notification time.
    RenewUnused,
    /// Hand back an unexpired unused token untouched; mint a new one otherwise.
    ReuseActive,
}

/// Everything a store needs to issue a token for one (session, subject) pair.
#[derive(Debug, Clone)]
pub struct IssueRequest {
    pub session_id: SessionId,
    pub subject_id: SubjectId,
    pub now: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Value used only when a new token has to be minted.
    pub fresh_token: String,
    pub policy: IssuePolicy,
}

/// What an issuance did, carrying the resulting token.
#[derive(Debug, Clone)]
pub enum IssueOutcome {
    Reused(SignatureToken),
    Renewed(SignatureToken),
    Minted(SignatureToken),
}

impl IssueOutcome {
    pub fn token(&self) -> &SignatureToken {
        match self {
            IssueOutcome::Reused(token)
            | IssueOutcome::Renewed(token)
            | IssueOutcome::Minted(token) => token,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            IssueOutcome::Reused(_) => "reused",
            IssueOutcome::Renewed(_) => "renewed",
            IssueOutcome::Minted(_) => "minted",
        }
    }

    pub fn into_token(self) -> SignatureToken {
        match self {
            IssueOutcome::Reused(token)
            | IssueOutcome::Renewed(token)
            | IssueOutcome::Minted(token) => token,
        }
    }
}

impl IssueRequest {
    /// Decides the outcome given the most recent unused token for the pair.
    ///
    /// Stores call this while holding the pair's issuance lock, then persist the
    /// result: nothing for `Reused`, an update for `Renewed`, an insert for `Minted`.
    pub fn resolve(self, existing: Option<SignatureToken>) -> IssueOutcome {
        match (existing, self.policy) {
            (Some(mut token), IssuePolicy::RenewUnused) if !token.is_used() => {
                token.expires_at = self.expires_at;
                token.email_sent_at = Some(self.now);
                IssueOutcome::Renewed(token)
            }
            (Some(token), IssuePolicy::ReuseActive)
                if token.state_at(self.now) == TokenState::Active =>
            {
                IssueOutcome::Reused(token)
            }
            _ => {
                let mut token = SignatureToken::new(
                    self.session_id,
                    self.subject_id,
                    self.fresh_token,
                    self.expires_at,
                    self.now,
                );
                if self.policy == IssuePolicy::RenewUnused {
                    token.email_sent_at = Some(self.now);
                }
                IssueOutcome::Minted(token)
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
/// Staff request to issue (or renew) a signature token for one subject.
pub struct IssueTokenPayload {
    #[schema(value_type = String)]
    pub subject_id: SubjectId,
    /// Lifetime of the token in minutes. Defaults to the configured resend TTL.
    #[validate(range(min = 1, max = 10080, message = "ttl_minutes must be between 1 and 10080"))]
    pub ttl_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IssuedTokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignatureRequestSummary {
    /// Subjects that received a (new or renewed) token.
    pub requested: usize,
    /// Enrolled subjects skipped because their attendance is already resolved.
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// What a signature link resolves to.
pub struct SignatureContextResponse {
    pub subject: SubjectResponse,
    pub session: SessionResponse,
    /// True when the token was consumed or the subject already signed.
    pub already_signed: bool,
    pub missed_sessions: Vec<MissedSession>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignResponse {
    pub attendance: Attendance,
    pub missed_sessions: Vec<MissedSession>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AbsenceResponse {
    pub missed_sessions: Vec<MissedSession>,
}
