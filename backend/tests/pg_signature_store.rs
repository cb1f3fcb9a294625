use chrono::{Duration, DurationRound, Utc};
use std::sync::Arc;

use klassflow_backend::{
    models::{
        attendance::{AttendanceOutcome, AttendanceStatus, AttendanceWrite},
        signature_token::{IssueOutcome, IssuePolicy, IssueRequest},
        subject::SubjectRole,
    },
    repositories::{
        AttendanceStore, PendingSessionQuery, PgSignatureStore, SessionDirectory, TokenStore,
    },
    services::{LogNotifier, SignatureService, SignatureSettings},
    types::{SessionId, SubjectId},
    utils::token::generate_signature_token,
};

mod pg_support;

use pg_support::{
    enroll, integration_guard, seed_attendance, seed_classroom, seed_organization, seed_session,
    seed_subject, test_pool,
};

fn now() -> chrono::DateTime<Utc> {
    // Postgres keeps microseconds.
    Utc::now()
        .duration_trunc(Duration::microseconds(1))
        .expect("truncate now")
}

fn issue_request(
    session_id: SessionId,
    subject_id: SubjectId,
    policy: IssuePolicy,
    at: chrono::DateTime<Utc>,
    ttl: Duration,
) -> IssueRequest {
    IssueRequest {
        session_id,
        subject_id,
        now: at,
        expires_at: at + ttl,
        fresh_token: generate_signature_token(),
        policy,
    }
}

fn renew_request(
    session_id: SessionId,
    subject_id: SubjectId,
    at: chrono::DateTime<Utc>,
) -> IssueRequest {
    issue_request(session_id, subject_id, IssuePolicy::RenewUnused, at, Duration::minutes(30))
}

fn presence(session_id: SessionId, subject_id: SubjectId, signature: &str) -> AttendanceWrite {
    AttendanceWrite {
        session_id,
        subject_id,
        outcome: AttendanceOutcome::Present {
            signature_url: signature.to_string(),
            ip_address: Some("127.0.0.1".into()),
        },
        signed_at: now(),
    }
}

struct Seeded {
    store: PgSignatureStore,
    session_id: SessionId,
    subject_id: SubjectId,
    classroom_id: klassflow_backend::types::ClassroomId,
}

async fn seeded() -> Seeded {
    let pool = test_pool().await;
    let org = seed_organization(&pool).await;
    let classroom_id = seed_classroom(&pool, org, "Group A").await;
    let subject_id = seed_subject(&pool, org, "Ada Lovelace", SubjectRole::Student).await;
    enroll(&pool, subject_id, classroom_id).await;
    let start = now();
    let session_id =
        seed_session(&pool, classroom_id, "Rust 101", start, start + Duration::hours(2)).await;
    Seeded {
        store: PgSignatureStore::new(pool),
        session_id,
        subject_id,
        classroom_id,
    }
}

#[tokio::test]
async fn renew_keeps_token_value_and_extends_expiry() {
    let _guard = integration_guard().await;
    let s = seeded().await;
    let t0 = now();

    let first = s
        .store
        .issue_token(renew_request(s.session_id, s.subject_id, t0))
        .await
        .expect("first issue");
    assert!(matches!(first, IssueOutcome::Minted(_)));

    let t1 = t0 + Duration::minutes(10);
    let second = s
        .store
        .issue_token(renew_request(s.session_id, s.subject_id, t1))
        .await
        .expect("second issue");
    assert!(matches!(second, IssueOutcome::Renewed(_)));
    assert_eq!(second.token().token, first.token().token);

    let stored = s
        .store
        .find_token_by_value(&first.token().token)
        .await
        .expect("find token")
        .expect("token exists");
    assert_eq!(stored.expires_at, t1 + Duration::minutes(30));
    assert_eq!(stored.email_sent_at, Some(t1));
}

#[tokio::test]
async fn concurrent_issuance_yields_one_token() {
    let _guard = integration_guard().await;
    let s = seeded().await;
    let store = Arc::new(s.store);
    let t0 = now();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let request = issue_request(
            s.session_id,
            s.subject_id,
            IssuePolicy::ReuseActive,
            t0,
            Duration::hours(1),
        );
        handles.push(tokio::spawn(async move { store.issue_token(request).await }));
    }
    let mut values = Vec::new();
    for handle in handles {
        let outcome = handle.await.expect("join").expect("issue");
        values.push(outcome.into_token().token);
    }
    values.dedup();
    assert_eq!(values.len(), 1);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM signature_tokens")
        .fetch_one(store.pool())
        .await
        .expect("count tokens");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn concurrent_consumption_has_one_winner() {
    let _guard = integration_guard().await;
    let s = seeded().await;
    let store = Arc::new(s.store);
    let t0 = now();
    let token = store
        .issue_token(renew_request(s.session_id, s.subject_id, t0))
        .await
        .expect("issue")
        .into_token();
    let token_id = token.id;

    let mut handles = Vec::new();
    for i in 0..6 {
        let store = store.clone();
        let write = presence(s.session_id, s.subject_id, &format!("sig{}", i));
        handles.push(tokio::spawn(async move {
            store.consume_token(token_id, t0 + Duration::minutes(1), write).await
        }));
    }
    let mut winners = 0;
    for handle in handles {
        if handle.await.expect("join").expect("consume").is_some() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendances")
        .fetch_one(store.pool())
        .await
        .expect("count attendances");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn expired_token_is_not_consumed() {
    let _guard = integration_guard().await;
    let s = seeded().await;
    let t0 = now();
    let token = s
        .store
        .issue_token(renew_request(s.session_id, s.subject_id, t0))
        .await
        .expect("issue")
        .into_token();

    let result = s
        .store
        .consume_token(
            token.id,
            t0 + Duration::minutes(30),
            presence(s.session_id, s.subject_id, "late"),
        )
        .await
        .expect("consume");
    assert!(result.is_none());
    assert!(s
        .store
        .find_attendance(s.session_id, s.subject_id)
        .await
        .expect("find attendance")
        .is_none());
}

#[tokio::test]
async fn absence_upsert_keeps_signature() {
    let _guard = integration_guard().await;
    let s = seeded().await;
    s.store
        .upsert_attendance(presence(s.session_id, s.subject_id, "sig1"))
        .await
        .expect("presence");
    let record = s
        .store
        .upsert_attendance(AttendanceWrite {
            session_id: s.session_id,
            subject_id: s.subject_id,
            outcome: AttendanceOutcome::Absent {
                proof_url: "Reason: Sick".into(),
            },
            signed_at: now(),
        })
        .await
        .expect("absence");
    assert_eq!(record.status, AttendanceStatus::Absent);
    assert_eq!(record.signature_url.as_deref(), Some("sig1"));
    assert_eq!(record.proof_url.as_deref(), Some("Reason: Sick"));
}

#[tokio::test]
async fn pending_sessions_skip_resolved_and_current() {
    let _guard = integration_guard().await;
    let s = seeded().await;
    let pool = s.store.pool().clone();
    let t0 = now();
    let mut past = Vec::new();
    for day in 1..=9 {
        let start = t0 - Duration::days(day);
        let end = start + Duration::hours(1);
        let title = format!("Day {}", day);
        past.push(seed_session(&pool, s.classroom_id, &title, start, end).await);
    }
    s.store
        .upsert_attendance(presence(past[0], s.subject_id, "sig"))
        .await
        .expect("resolve day 1");
    seed_attendance(&pool, past[2], s.subject_id, AttendanceStatus::Excused).await;
    seed_attendance(&pool, past[3], s.subject_id, AttendanceStatus::Absent).await;

    let sessions = s
        .store
        .pending_past_sessions(PendingSessionQuery {
            subject_id: s.subject_id,
            classroom_ids: vec![s.classroom_id],
            exclude_session_id: past[1],
            now: t0,
            limit: 5,
        })
        .await
        .expect("pending sessions");

    let ids: Vec<SessionId> = sessions.iter().map(|session| session.id).collect();
    assert_eq!(ids, vec![past[4], past[5], past[6], past[7], past[8]]);
    assert_eq!(sessions[0].classroom_name, "Group A");
}

#[tokio::test]
async fn classroom_matrix_roster_ignores_future_only_attendance() {
    let _guard = integration_guard().await;
    let s = seeded().await;
    let pool = s.store.pool().clone();
    let t0 = now();
    let org = seed_organization(&pool).await;
    let guest = seed_subject(&pool, org, "Guest", SubjectRole::Student).await;
    let visitor = seed_subject(&pool, org, "Visitor", SubjectRole::Student).await;
    let start = t0 - Duration::days(1);
    let end = start + Duration::hours(1);
    let past = seed_session(&pool, s.classroom_id, "Lesson", start, end).await;
    seed_attendance(&pool, past, guest, AttendanceStatus::Present).await;
    seed_attendance(&pool, s.session_id, visitor, AttendanceStatus::Absent).await;

    let rows = s
        .store
        .classroom_matrix(s.classroom_id, t0)
        .await
        .expect("classroom matrix");

    let subjects: Vec<SubjectId> = rows.iter().map(|row| row.subject_id).collect();
    assert_eq!(subjects, vec![s.subject_id, guest]);
    assert!(rows.iter().all(|row| row.session_id == past));
}

#[tokio::test]
async fn service_flow_against_postgres() {
    let _guard = integration_guard().await;
    let s = seeded().await;
    let pool = s.store.pool().clone();
    let start = now() - Duration::days(1);
    let end = start + Duration::hours(1);
    let yesterday = seed_session(&pool, s.classroom_id, "Yesterday", start, end).await;
    let store = Arc::new(s.store);
    let service = SignatureService::new(
        store.clone(),
        Arc::new(LogNotifier),
        SignatureSettings::default(),
    );

    let t0 = now();
    let token = store
        .issue_token(renew_request(s.session_id, s.subject_id, t0))
        .await
        .expect("issue")
        .into_token();

    let signed = service
        .consume(&token.token, "sig".into(), None, t0)
        .await
        .expect("consume");
    assert_eq!(signed.attendance.status, AttendanceStatus::Present);
    assert_eq!(signed.missed_sessions.len(), 1);
    assert_eq!(signed.missed_sessions[0].session_id, yesterday);

    let matrix = store.session_matrix(s.session_id).await.expect("matrix");
    assert_eq!(matrix.len(), 1);
    assert_eq!(matrix[0].status, Some(AttendanceStatus::Present));
    assert!(matrix[0].has_signature);

    let deleted = store
        .delete_expired_tokens(t0 + Duration::days(1))
        .await
        .expect("cleanup");
    // The consumed token stays; the unused backfill token expired an hour in.
    assert_eq!(deleted, 1);
}
