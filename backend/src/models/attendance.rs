//! Attendance records keyed by (session, subject) and the payloads that write them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::types::{AttendanceId, SessionId, SubjectId};
use crate::validation::rules;

/// Prefix stored in `proof_url` in front of a declared absence reason.
pub const ABSENCE_REASON_PREFIX: &str = "Reason: ";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// Database representation of one subject's attendance for one session.
pub struct Attendance {
    #[schema(value_type = String)]
    pub id: AttendanceId,
    #[schema(value_type = String)]
    pub session_id: SessionId,
    #[schema(value_type = String)]
    pub subject_id: SubjectId,
    pub status: AttendanceStatus,
    /// Handwritten signature blob (usually an image data URL).
    pub signature_url: Option<String>,
    /// Proof link, or `"Reason: ..."` for a declared absence.
    pub proof_url: Option<String>,
    pub signed_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Excused => "excused",
        }
    }
}

impl Attendance {
    /// A row counts as signed when it is present or carries a signature.
    pub fn is_signed(&self) -> bool {
        self.status == AttendanceStatus::Present || self.signature_url.is_some()
    }
}

/// The fields an attendance write overwrites, by outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttendanceOutcome {
    Present {
        signature_url: String,
        ip_address: Option<String>,
    },
    Absent {
        proof_url: String,
    },
}

/// A fully prepared upsert for one (session, subject) pair.
///
/// Applying it overwrites the outcome's fields on an existing row; it never merges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceWrite {
    pub session_id: SessionId,
    pub subject_id: SubjectId,
    pub outcome: AttendanceOutcome,
    pub signed_at: DateTime<Utc>,
}

impl AttendanceWrite {
    pub fn status(&self) -> AttendanceStatus {
        match self.outcome {
            AttendanceOutcome::Present { .. } => AttendanceStatus::Present,
            AttendanceOutcome::Absent { .. } => AttendanceStatus::Absent,
        }
    }

    /// Builds the row this write produces when no row exists yet.
    pub fn into_new_record(self) -> Attendance {
        let status = self.status();
        let (signature_url, proof_url, ip_address) = match self.outcome {
            AttendanceOutcome::Present {
                signature_url,
                ip_address,
            } => (Some(signature_url), None, ip_address),
            AttendanceOutcome::Absent { proof_url } => (None, Some(proof_url), None),
        };
        Attendance {
            id: AttendanceId::new(),
            session_id: self.session_id,
            subject_id: self.subject_id,
            status,
            signature_url,
            proof_url,
            signed_at: Some(self.signed_at),
            ip_address,
            created_at: self.signed_at,
            updated_at: self.signed_at,
        }
    }

    /// Overwrites the outcome's fields on an existing row.
    pub fn apply_to(self, record: &mut Attendance) {
        record.status = self.status();
        match self.outcome {
            AttendanceOutcome::Present {
                signature_url,
                ip_address,
            } => {
                record.signature_url = Some(signature_url);
                record.ip_address = ip_address;
            }
            AttendanceOutcome::Absent { proof_url } => {
                record.proof_url = Some(proof_url);
            }
        }
        record.signed_at = Some(self.signed_at);
        record.updated_at = self.signed_at;
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
/// Signature submitted through a signature link.
pub struct SignPayload {
    #[validate(custom(function = "rules::validate_signature_blob"))]
    pub signature: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
/// Absence declared through a signature link.
pub struct AbsencePayload {
    #[validate(custom(function = "rules::validate_absence_reason"))]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
/// Signature captured on a teacher's device for one of the session's subjects.
pub struct InPersonSignPayload {
    #[schema(value_type = String)]
    pub subject_id: SubjectId,
    #[validate(custom(function = "rules::validate_signature_blob"))]
    pub signature: String,
}
