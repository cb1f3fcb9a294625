#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use crate::{
    error::ErrorResponse,
    handlers::health::HealthResponse,
    models::{
        attendance::{
            AbsencePayload, Attendance, AttendanceStatus, InPersonSignPayload, SignPayload,
        },
        class_session::{MissedSession, SessionResponse},
        report::{
            ClassroomAttendanceSummary, RosterEntry, RosterStatus, SessionRosterResponse,
            SubjectAttendanceSummary,
        },
        signature_token::{
            AbsenceResponse, IssueTokenPayload, IssuedTokenResponse, SignResponse,
            SignatureContextResponse, SignatureRequestSummary, TokenState,
        },
        subject::{SubjectResponse, SubjectRole},
    },
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_doc,
        get_signature_doc,
        sign_doc,
        declare_absence_doc,
        issue_signature_token_doc,
        request_signatures_doc,
        sign_in_person_doc,
        session_attendance_doc,
        classroom_summary_doc,
        classroom_export_doc
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            // signature links
            SignatureContextResponse,
            SignResponse,
            AbsenceResponse,
            SignPayload,
            AbsencePayload,
            MissedSession,
            SubjectResponse,
            SubjectRole,
            SessionResponse,
            TokenState,
            // staff
            IssueTokenPayload,
            IssuedTokenResponse,
            SignatureRequestSummary,
            InPersonSignPayload,
            Attendance,
            AttendanceStatus,
            // reports
            SessionRosterResponse,
            RosterEntry,
            RosterStatus,
            ClassroomAttendanceSummary,
            SubjectAttendanceSummary
        )
    ),
    modifiers(&SecuritySchemes),
    tags(
        (name = "Signature", description = "Public signature links"),
        (name = "Sessions", description = "Staff actions on a class session"),
        (name = "Classrooms", description = "Classroom attendance reports"),
        (name = "Ops", description = "Operational endpoints")
    ),
    security(("BearerAuth" = []))
)]
pub struct ApiDoc;

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        let mut bearer = Http::new(HttpAuthScheme::Bearer);
        bearer.bearer_format = Some("JWT".to_string());
        components.add_security_scheme("BearerAuth", SecurityScheme::Http(bearer));
    }
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, body = HealthResponse),
        (status = 503, description = "Store unreachable", body = HealthResponse)
    ),
    tag = "Ops",
    security(())
)]
fn health_doc() {}

#[utoipa::path(
    get,
    path = "/api/signature/{token}",
    params(("token" = String, Path, description = "Signature token")),
    responses(
        (status = 200, body = SignatureContextResponse),
        (status = 404, description = "Unknown token", body = ErrorResponse),
        (status = 410, description = "TOKEN_EXPIRED", body = ErrorResponse)
    ),
    tag = "Signature",
    security(())
)]
fn get_signature_doc() {}

#[utoipa::path(
    post,
    path = "/api/signature/{token}",
    params(("token" = String, Path, description = "Signature token")),
    request_body = SignPayload,
    responses(
        (status = 200, body = SignResponse),
        (status = 400, description = "Invalid signature", body = ErrorResponse),
        (status = 404, description = "Unknown token", body = ErrorResponse),
        (status = 410, description = "TOKEN_EXPIRED or TOKEN_ALREADY_USED", body = ErrorResponse)
    ),
    tag = "Signature",
    security(())
)]
fn sign_doc() {}

#[utoipa::path(
    post,
    path = "/api/signature/{token}/absence",
    params(("token" = String, Path, description = "Signature token")),
    request_body = AbsencePayload,
    responses(
        (status = 200, body = AbsenceResponse),
        (status = 400, description = "Invalid reason", body = ErrorResponse),
        (status = 404, description = "Unknown token", body = ErrorResponse),
        (status = 410, description = "TOKEN_EXPIRED or TOKEN_ALREADY_USED", body = ErrorResponse)
    ),
    tag = "Signature",
    security(())
)]
fn declare_absence_doc() {}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/signature-tokens",
    params(("id" = String, Path, description = "Session id")),
    request_body = IssueTokenPayload,
    responses(
        (status = 200, body = IssuedTokenResponse),
        (status = 403, body = ErrorResponse),
        (status = 404, body = ErrorResponse)
    ),
    tag = "Sessions"
)]
fn issue_signature_token_doc() {}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/signature-requests",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, body = SignatureRequestSummary),
        (status = 403, body = ErrorResponse),
        (status = 404, body = ErrorResponse)
    ),
    tag = "Sessions"
)]
fn request_signatures_doc() {}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/attendance/in-person",
    params(("id" = String, Path, description = "Session id")),
    request_body = InPersonSignPayload,
    responses(
        (status = 200, body = Attendance),
        (status = 403, body = ErrorResponse),
        (status = 404, body = ErrorResponse)
    ),
    tag = "Sessions"
)]
fn sign_in_person_doc() {}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}/attendance",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, body = SessionRosterResponse),
        (status = 403, body = ErrorResponse),
        (status = 404, body = ErrorResponse)
    ),
    tag = "Sessions"
)]
fn session_attendance_doc() {}

#[utoipa::path(
    get,
    path = "/api/classrooms/{id}/attendance/summary",
    params(("id" = String, Path, description = "Classroom id")),
    responses(
        (status = 200, body = ClassroomAttendanceSummary),
        (status = 403, body = ErrorResponse),
        (status = 404, body = ErrorResponse)
    ),
    tag = "Classrooms"
)]
fn classroom_summary_doc() {}

#[utoipa::path(
    get,
    path = "/api/classrooms/{id}/attendance/export",
    params(("id" = String, Path, description = "Classroom id")),
    responses(
        (status = 200, description = "CSV export", content_type = "text/csv", body = String),
        (status = 403, body = ErrorResponse),
        (status = 404, body = ErrorResponse)
    ),
    tag = "Classrooms"
)]
fn classroom_export_doc() {}
