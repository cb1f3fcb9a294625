//! Signers: students, and teachers signing for themselves.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::types::{OrganizationId, SubjectId};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subject {
    pub id: SubjectId,
    pub organization_id: OrganizationId,
    pub full_name: String,
    pub email: String,
    pub role: SubjectRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubjectRole {
    Student,
    Teacher,
    Admin,
}

impl SubjectRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectRole::Student => "student",
            SubjectRole::Teacher => "teacher",
            SubjectRole::Admin => "admin",
        }
    }

    /// Staff may issue tokens and sign on a student's behalf.
    pub fn is_staff(&self) -> bool {
        matches!(self, SubjectRole::Teacher | SubjectRole::Admin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// Public view of a subject, as shown on the signature page.
pub struct SubjectResponse {
    #[schema(value_type = String)]
    pub id: SubjectId,
    pub full_name: String,
    pub email: String,
    pub role: SubjectRole,
}

impl From<Subject> for SubjectResponse {
    fn from(subject: Subject) -> Self {
        Self {
            id: subject.id,
            full_name: subject.full_name,
            email: subject.email,
            role: subject.role,
        }
    }
}
