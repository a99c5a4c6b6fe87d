//! The HTTP job source against a local axum stand-in for the employer API.

use api_lib::adapters::HttpJobSource;
use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use job_portal_core::domain::RemoteApplication;
use job_portal_core::ports::{JobSourceService, PortError};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// How the stub answers, plus the last application body it received.
#[derive(Clone)]
struct Stub {
    jobs: (StatusCode, Value),
    submit: (StatusCode, Value),
    delay: Duration,
    received: Arc<Mutex<Option<Value>>>,
}

impl Stub {
    fn new(jobs: (StatusCode, Value), submit: (StatusCode, Value)) -> Self {
        Self {
            jobs,
            submit,
            delay: Duration::ZERO,
            received: Arc::new(Mutex::new(None)),
        }
    }
}

async fn jobs(State(stub): State<Stub>) -> (StatusCode, Json<Value>) {
    tokio::time::sleep(stub.delay).await;
    (stub.jobs.0, Json(stub.jobs.1))
}

async fn applications(
    State(stub): State<Stub>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    *stub.received.lock().unwrap() = Some(body);
    (stub.submit.0, Json(stub.submit.1))
}

/// Serves the stub on an ephemeral port and returns its base URL.
async fn serve(stub: Stub) -> String {
    let app = Router::new()
        .route("/jobs", get(jobs))
        .route("/applications", post(applications))
        .with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn application(job_external_id: &str) -> RemoteApplication {
    RemoteApplication {
        job_external_id: job_external_id.to_string(),
        user_id: Uuid::new_v4(),
        resume_link: "https://example.com/cv.pdf".to_string(),
        skills: vec!["Cooking".to_string()],
        certifications: vec![],
        cover_letter: None,
    }
}

#[tokio::test]
async fn fetch_parses_loose_job_objects() {
    let stub = Stub::new(
        (
            StatusCode::OK,
            json!([
                {
                    "id": 1001,
                    "title": "Sous Chef",
                    "role": "Chef",
                    "location": "NY",
                    "required_skills": ["Cooking", "Food Safety"],
                    "required_certifications": ["Food Handler Certification"],
                    "posted_at": "2024-05-01T09:30:00"
                },
                { "id": "D-7", "title": "Driver", "role": "Driver", "location": "LA", "company": "Fast Freight" }
            ]),
        ),
        (StatusCode::OK, json!({})),
    );
    let source = HttpJobSource::new(serve(stub).await, Duration::from_secs(2)).unwrap();

    let postings = source.fetch_jobs().await.unwrap();

    assert_eq!(postings.len(), 2);
    assert_eq!(postings[0].external_id, "1001");
    assert_eq!(postings[0].company, None);
    assert_eq!(postings[0].required_skills, vec!["Cooking", "Food Safety"]);
    assert!(postings[0].posted_at.is_some());
    assert_eq!(postings[1].external_id, "D-7");
    assert!(postings[1].required_skills.is_empty());
    assert_eq!(postings[1].company.as_deref(), Some("Fast Freight"));
}

#[tokio::test]
async fn fetch_maps_server_errors_and_garbage() {
    let down = Stub::new((StatusCode::BAD_GATEWAY, json!({})), (StatusCode::OK, json!({})));
    let source = HttpJobSource::new(serve(down).await, Duration::from_secs(2)).unwrap();
    assert!(matches!(
        source.fetch_jobs().await.unwrap_err(),
        PortError::RemoteUnavailable(_)
    ));

    let garbage = Stub::new((StatusCode::OK, json!({"jobs": "nope"})), (StatusCode::OK, json!({})));
    let source = HttpJobSource::new(serve(garbage).await, Duration::from_secs(2)).unwrap();
    assert!(matches!(
        source.fetch_jobs().await.unwrap_err(),
        PortError::RemoteRejected(_)
    ));
}

#[tokio::test]
async fn slow_responses_time_out_as_unavailable() {
    let mut slow = Stub::new((StatusCode::OK, json!([])), (StatusCode::OK, json!({})));
    slow.delay = Duration::from_secs(5);
    let source = HttpJobSource::new(serve(slow).await, Duration::from_millis(100)).unwrap();

    assert!(matches!(
        source.fetch_jobs().await.unwrap_err(),
        PortError::RemoteUnavailable(_)
    ));
}

#[tokio::test]
async fn unreachable_host_is_unavailable() {
    // Nothing listens on the discard port.
    let source = HttpJobSource::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
    assert!(matches!(
        source.fetch_jobs().await.unwrap_err(),
        PortError::RemoteUnavailable(_)
    ));
}

#[tokio::test]
async fn submit_sends_numeric_job_id_and_reads_the_receipt() {
    let stub = Stub::new(
        (StatusCode::OK, json!([])),
        (StatusCode::CREATED, json!({"success": true, "application_id": 555})),
    );
    let received = stub.received.clone();
    let source = HttpJobSource::new(serve(stub).await, Duration::from_secs(2)).unwrap();

    let receipt = source.submit_application(&application("1001")).await.unwrap();

    assert_eq!(receipt.application_id, "555");
    let body = received.lock().unwrap().clone().unwrap();
    assert_eq!(body["job_id"], json!(1001));
    assert_eq!(body["skills"], json!(["Cooking"]));
    assert!(body.get("cover_letter").is_none());
}

#[tokio::test]
async fn submit_failures_are_rejections() {
    let refused = Stub::new(
        (StatusCode::OK, json!([])),
        (StatusCode::BAD_REQUEST, json!({"success": false, "error": "Job closed"})),
    );
    let source = HttpJobSource::new(serve(refused).await, Duration::from_secs(2)).unwrap();
    match source.submit_application(&application("JOB-9")).await {
        Err(PortError::RemoteRejected(reason)) => assert_eq!(reason, "Job closed"),
        other => panic!("expected a rejection, got {:?}", other.map(|r| r.application_id)),
    }

    let broken = Stub::new(
        (StatusCode::OK, json!([])),
        (StatusCode::SERVICE_UNAVAILABLE, json!({"success": false})),
    );
    let source = HttpJobSource::new(serve(broken).await, Duration::from_secs(2)).unwrap();
    assert!(matches!(
        source.submit_application(&application("1")).await.unwrap_err(),
        PortError::RemoteUnavailable(_)
    ));
}
