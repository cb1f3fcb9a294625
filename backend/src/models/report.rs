//! Read models for attendance rosters and classroom aggregation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::attendance::AttendanceStatus;
use crate::types::{ClassroomId, SessionId, SubjectId};

#[derive(Debug, Clone, FromRow)]
/// One (subject, session) cell with the subject's attendance, if any.
pub struct AttendanceMatrixRow {
    pub subject_id: SubjectId,
    pub full_name: String,
    pub email: String,
    pub session_id: SessionId,
    pub session_title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: Option<AttendanceStatus>,
    pub signed_at: Option<DateTime<Utc>>,
    pub has_signature: bool,
}

impl AttendanceMatrixRow {
    pub fn roster_status(&self) -> RosterStatus {
        RosterStatus::from(self.status)
    }

    pub fn duration_hours(&self) -> f64 {
        (self.end_time - self.start_time).num_minutes().max(0) as f64 / 60.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RosterStatus {
    Present,
    Absent,
    Excused,
    Pending,
}

impl RosterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RosterStatus::Present => "present",
            RosterStatus::Absent => "absent",
            RosterStatus::Excused => "excused",
            RosterStatus::Pending => "pending",
        }
    }
}

impl From<Option<AttendanceStatus>> for RosterStatus {
    fn from(status: Option<AttendanceStatus>) -> Self {
        match status {
            Some(AttendanceStatus::Present) => RosterStatus::Present,
            Some(AttendanceStatus::Absent) => RosterStatus::Absent,
            Some(AttendanceStatus::Excused) => RosterStatus::Excused,
            None => RosterStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RosterEntry {
    #[schema(value_type = String)]
    pub subject_id: SubjectId,
    pub full_name: String,
    pub email: String,
    pub status: RosterStatus,
    pub signed_at: Option<DateTime<Utc>>,
    pub has_signature: bool,
}

impl From<AttendanceMatrixRow> for RosterEntry {
    fn from(row: AttendanceMatrixRow) -> Self {
        Self {
            status: row.roster_status(),
            subject_id: row.subject_id,
            full_name: row.full_name,
            email: row.email,
            signed_at: row.signed_at,
            has_signature: row.has_signature,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionRosterResponse {
    #[schema(value_type = String)]
    pub session_id: SessionId,
    pub entries: Vec<RosterEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubjectAttendanceSummary {
    #[schema(value_type = String)]
    pub subject_id: SubjectId,
    pub full_name: String,
    pub email: String,
    pub present: u32,
    pub absent: u32,
    pub excused: u32,
    pub pending: u32,
    /// Scheduled hours of the sessions the subject attended, rounded to 2 decimals.
    pub present_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClassroomAttendanceSummary {
    #[schema(value_type = String)]
    pub classroom_id: ClassroomId,
    pub past_sessions: usize,
    pub subjects: Vec<SubjectAttendanceSummary>,
}
