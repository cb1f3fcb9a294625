//! Attendance read models: session rosters and per-classroom aggregation.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

use crate::error::SignatureError;
use crate::models::{
    actor::Actor,
    report::{
        AttendanceMatrixRow, ClassroomAttendanceSummary, RosterEntry, RosterStatus,
        SessionRosterResponse, SubjectAttendanceSummary,
    },
};
use crate::repositories::store::SignatureStore;
use crate::types::{ClassroomId, SessionId};
use crate::utils::{csv::render_csv, time::local_date};

const EXPORT_HEADER: [&str; 6] = [
    "Subject",
    "Email",
    "Session",
    "Date",
    "Status",
    "Hours Attended",
];

fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}

/// Folds (subject, session) rows, ordered by subject, into per-subject totals.
pub fn summarize(rows: &[AttendanceMatrixRow]) -> Vec<SubjectAttendanceSummary> {
    let mut summaries: Vec<SubjectAttendanceSummary> = Vec::new();
    for row in rows {
        let needs_new = summaries
            .last()
            .map_or(true, |current| current.subject_id != row.subject_id);
        if needs_new {
            summaries.push(SubjectAttendanceSummary {
                subject_id: row.subject_id,
                full_name: row.full_name.clone(),
                email: row.email.clone(),
                present: 0,
                absent: 0,
                excused: 0,
                pending: 0,
                present_hours: 0.0,
            });
        }
        let Some(summary) = summaries.last_mut() else {
            continue;
        };
        match row.roster_status() {
            RosterStatus::Present => {
                summary.present += 1;
                summary.present_hours += row.duration_hours();
            }
            RosterStatus::Absent => summary.absent += 1,
            RosterStatus::Excused => summary.excused += 1,
            RosterStatus::Pending => summary.pending += 1,
        }
    }
    for summary in &mut summaries {
        summary.present_hours = round_hours(summary.present_hours);
    }
    summaries
}

fn export_row(row: &AttendanceMatrixRow, tz: &Tz) -> Vec<String> {
    let status = row.roster_status();
    let hours = if status == RosterStatus::Present {
        row.duration_hours()
    } else {
        0.0
    };
    vec![
        row.full_name.clone(),
        row.email.clone(),
        row.session_title.clone(),
        local_date(row.start_time, tz),
        status.as_str().to_string(),
        format!("{:.2}", hours),
    ]
}

#[derive(Clone)]
pub struct AttendanceReportService {
    store: Arc<dyn SignatureStore>,
    time_zone: Tz,
}

impl AttendanceReportService {
    pub fn new(store: Arc<dyn SignatureStore>, time_zone: Tz) -> Self {
        Self { store, time_zone }
    }

    pub async fn session_roster(
        &self,
        actor: &Actor,
        session_id: SessionId,
    ) -> Result<SessionRosterResponse, SignatureError> {
        let session = self
            .store
            .find_session(session_id)
            .await?
            .ok_or(SignatureError::NotFound("Session"))?;
        if !actor.can_manage(session.organization_id) {
            return Err(SignatureError::Forbidden(
                "Not allowed to view this session".to_string(),
            ));
        }
        let entries = self
            .store
            .session_matrix(session.id)
            .await?
            .into_iter()
            .map(RosterEntry::from)
            .collect();
        Ok(SessionRosterResponse {
            session_id: session.id,
            entries,
        })
    }

    pub async fn classroom_summary(
        &self,
        actor: &Actor,
        classroom_id: ClassroomId,
        now: DateTime<Utc>,
    ) -> Result<ClassroomAttendanceSummary, SignatureError> {
        let rows = self.classroom_rows(actor, classroom_id, now).await?;
        let mut sessions: Vec<SessionId> = rows.iter().map(|row| row.session_id).collect();
        sessions.sort();
        sessions.dedup();
        Ok(ClassroomAttendanceSummary {
            classroom_id,
            past_sessions: sessions.len(),
            subjects: summarize(&rows),
        })
    }

    /// One CSV line per (subject, past session).
    pub async fn classroom_export(
        &self,
        actor: &Actor,
        classroom_id: ClassroomId,
        now: DateTime<Utc>,
    ) -> Result<String, SignatureError> {
        let rows = self.classroom_rows(actor, classroom_id, now).await?;
        let tz = self.time_zone;
        let lines: Vec<Vec<String>> = rows.iter().map(|row| export_row(row, &tz)).collect();
        render_csv(&EXPORT_HEADER, &lines).map_err(SignatureError::Internal)
    }

    async fn classroom_rows(
        &self,
        actor: &Actor,
        classroom_id: ClassroomId,
        now: DateTime<Utc>,
    ) -> Result<Vec<AttendanceMatrixRow>, SignatureError> {
        let organization_id = self
            .store
            .find_classroom_organization(classroom_id)
            .await?
            .ok_or(SignatureError::NotFound("Classroom"))?;
        if !actor.can_manage(organization_id) {
            return Err(SignatureError::Forbidden(
                "Not allowed to view this classroom".to_string(),
            ));
        }
        Ok(self.store.classroom_matrix(classroom_id, now).await?)
    }
}
