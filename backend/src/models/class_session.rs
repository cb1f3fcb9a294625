//! Class sessions as seen by the signature engine (read-only).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::types::{ClassroomId, OrganizationId, SessionId};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// A class session joined with the classroom it belongs to.
pub struct ClassSession {
    pub id: SessionId,
    pub classroom_id: ClassroomId,
    pub organization_id: OrganizationId,
    pub classroom_name: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl ClassSession {
    pub fn is_past_at(&self, now: DateTime<Utc>) -> bool {
        self.end_time < now
    }

    /// Scheduled length in hours, never negative.
    pub fn duration_hours(&self) -> f64 {
        let minutes = (self.end_time - self.start_time).num_minutes().max(0);
        minutes as f64 / 60.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    #[schema(value_type = String)]
    pub id: SessionId,
    pub title: String,
    #[schema(value_type = String)]
    pub classroom_id: ClassroomId,
    pub classroom_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl From<ClassSession> for SessionResponse {
    fn from(session: ClassSession) -> Self {
        Self {
            id: session.id,
            title: session.title,
            classroom_id: session.classroom_id,
            classroom_name: session.classroom_name,
            start_time: session.start_time,
            end_time: session.end_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// A past session still waiting for the subject's signature, with a token to sign it.
pub struct MissedSession {
    #[schema(value_type = String)]
    pub session_id: SessionId,
    pub title: String,
    pub classroom_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub token: String,
    pub token_expires_at: DateTime<Utc>,
}
