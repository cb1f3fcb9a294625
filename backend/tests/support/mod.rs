#![allow(dead_code)]
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use klassflow_backend::{
    build_router,
    config::Config,
    models::{
        class_session::ClassSession,
        signature_token::SignatureToken,
        subject::{Subject, SubjectRole},
    },
    repositories::InMemorySignatureStore,
    services::LogNotifier,
    state::AppState,
    types::{ClassroomId, OrganizationId},
    utils::jwt::{create_access_token, Claims},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// An application wired to an in-memory store with one classroom, one
/// enrolled student, one teacher and one ongoing session.
pub struct TestApp {
    pub store: Arc<InMemorySignatureStore>,
    pub router: Router,
    pub config: Config,
    pub organization_id: OrganizationId,
    pub classroom_id: ClassroomId,
    pub student: Subject,
    pub teacher: Subject,
    pub session: ClassSession,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemorySignatureStore::new());
        let config = Config::for_tests();
        let organization_id = OrganizationId::new();
        let classroom_id = store.add_classroom(organization_id, "Group A");
        let student = store.add_subject(organization_id, "Ada Lovelace", SubjectRole::Student);
        let teacher = store.add_subject(organization_id, "Grace Hopper", SubjectRole::Teacher);
        store.enroll(student.id, classroom_id);
        let now = Utc::now();
        let session = store.add_session(
            classroom_id,
            "Rust 101",
            now - Duration::minutes(15),
            now + Duration::hours(2),
        );
        let state = AppState::new(store.clone(), Arc::new(LogNotifier), config.clone());
        Self {
            router: build_router(state),
            store,
            config,
            organization_id,
            classroom_id,
            student,
            teacher,
            session,
        }
    }

    /// Inserts an active token for the student and the ongoing session.
    pub fn student_token(&self, ttl: Duration) -> SignatureToken {
        let now = Utc::now();
        let token = SignatureToken::new(
            self.session.id,
            self.student.id,
            klassflow_backend::utils::token::generate_signature_token(),
            now + ttl,
            now,
        );
        self.store.insert_token(token.clone());
        token
    }

    pub fn past_session(&self, days_ago: i64, title: &str) -> ClassSession {
        let start: DateTime<Utc> = Utc::now() - Duration::days(days_ago);
        self.store
            .add_session(self.classroom_id, title, start, start + Duration::hours(1))
    }

    pub fn bearer_for(&self, subject: &Subject) -> String {
        self.bearer(
            &subject.id.to_string(),
            &subject.organization_id.to_string(),
            subject.role.as_str(),
        )
    }

    pub fn bearer(&self, subject_id: &str, organization_id: &str, role: &str) -> String {
        let claims = Claims::new(subject_id.into(), organization_id.into(), role.into(), 1);
        let token = create_access_token(&claims, &self.config.jwt_secret).expect("sign jwt");
        format!("Bearer {}", token)
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = self.call_raw(method, uri, bearer, body).await;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn call_raw(
        &self,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(bearer) = bearer {
            builder = builder.header(header::AUTHORIZATION, bearer);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }
}
