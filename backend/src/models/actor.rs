//! The authenticated caller of a staff endpoint.

use crate::models::subject::SubjectRole;
use crate::types::{OrganizationId, SubjectId};

/// Identity carried by a verified bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub subject_id: SubjectId,
    pub organization_id: OrganizationId,
    pub role: SubjectRole,
}

impl Actor {
    /// Staff of the given organization may manage its sessions and classrooms.
    pub fn can_manage(&self, organization_id: OrganizationId) -> bool {
        self.role.is_staff() && self.organization_id == organization_id
    }
}
