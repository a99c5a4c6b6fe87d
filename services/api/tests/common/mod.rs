//! Shared fixtures: an in-memory SQLite store and scriptable job sources.

#![allow(dead_code)]

use api_lib::adapters::DbAdapter;
use api_lib::config::{Config, EmployerApiConfig};
use async_trait::async_trait;
use job_portal_core::domain::{JobPosting, RemoteApplication, RemoteReceipt, User};
use job_portal_core::ports::{DatabaseService, JobSourceService, PortError, PortResult};
use job_portal_core::{ProfileDraft, ProfileService};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A migrated in-memory database. A single long-lived connection keeps the
/// database alive for the whole test.
pub async fn memory_db() -> Arc<DbAdapter> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    let db = DbAdapter::new(pool);
    db.run_migrations().await.unwrap();
    Arc::new(db)
}

/// A migrated database file with several pooled connections, so concurrent
/// callers really do race at the store. The file is left in the temp dir.
pub async fn shared_db() -> Arc<DbAdapter> {
    let path = std::env::temp_dir().join(format!("job-portal-test-{}.db", uuid::Uuid::new_v4()));
    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(10))
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .unwrap();
    let db = DbAdapter::new(pool);
    db.run_migrations().await.unwrap();
    Arc::new(db)
}

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "sqlite::memory:".to_string(),
        log_level: tracing::Level::INFO,
        cors_origin: "http://localhost:3000".to_string(),
        job_cache_ttl: Duration::from_secs(900),
        employer_api: EmployerApiConfig {
            enabled: false,
            base_url: String::new(),
            api_key: None,
            timeout: Duration::from_millis(200),
        },
    }
}

pub async fn create_user(db: &DbAdapter, username: &str) -> User {
    db.create_user(username, &format!("{}@example.com", username), "not-a-real-hash")
        .await
        .unwrap()
}

/// Saves a profile that satisfies the completeness rule.
pub async fn complete_profile(db: Arc<DbAdapter>, user: &User, skills: &[&str], certs: &[&str]) {
    ProfileService::new(db)
        .upsert(
            user.user_id,
            ProfileDraft {
                headline: Some("Line cook".to_string()),
                summary: None,
                experience: Some("Five years in busy kitchens".to_string()),
                resume_link: Some("https://example.com/resume.pdf".to_string()),
                skills: skills.iter().map(|s| s.to_string()).collect(),
                certifications: certs.iter().map(|s| s.to_string()).collect(),
            },
        )
        .await
        .unwrap();
}

pub fn posting(id: &str, title: &str, skills: &[&str], certs: &[&str]) -> JobPosting {
    JobPosting {
        external_id: id.to_string(),
        title: title.to_string(),
        role: "Chef".to_string(),
        company: Some("Culinary Collective".to_string()),
        location: "NY".to_string(),
        description: Some(format!("{} wanted", title)),
        required_skills: skills.iter().map(|s| s.to_string()).collect(),
        required_certifications: certs.iter().map(|s| s.to_string()).collect(),
        posted_at: None,
    }
}

/// What the scripted source does when an application is forwarded.
#[derive(Clone, Copy, Debug)]
pub enum SubmitBehavior {
    Accept,
    Hang,
    Reject,
}

/// A job source whose responses the test controls, counting every call.
pub struct ScriptedSource {
    postings: Mutex<Option<Vec<JobPosting>>>,
    submit: Mutex<SubmitBehavior>,
    fetch_delay: Mutex<Duration>,
    pub fetches: AtomicUsize,
    pub submissions: AtomicUsize,
}

impl ScriptedSource {
    pub fn serving(postings: Vec<JobPosting>) -> Arc<Self> {
        Arc::new(Self {
            postings: Mutex::new(Some(postings)),
            submit: Mutex::new(SubmitBehavior::Accept),
            fetch_delay: Mutex::new(Duration::ZERO),
            fetches: AtomicUsize::new(0),
            submissions: AtomicUsize::new(0),
        })
    }

    /// A source whose every fetch fails.
    pub fn unreachable() -> Arc<Self> {
        let source = Self::serving(Vec::new());
        source.go_down();
        source
    }

    pub fn set_postings(&self, postings: Vec<JobPosting>) {
        *self.postings.lock().unwrap() = Some(postings);
    }

    pub fn go_down(&self) {
        *self.postings.lock().unwrap() = None;
    }

    /// Every later fetch waits this long before answering.
    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = delay;
    }

    pub fn set_submit(&self, behavior: SubmitBehavior) {
        *self.submit.lock().unwrap() = behavior;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobSourceService for ScriptedSource {
    async fn fetch_jobs(&self) -> PortResult<Vec<JobPosting>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.postings
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| PortError::RemoteUnavailable("connection refused".to_string()))
    }

    async fn submit_application(
        &self,
        application: &RemoteApplication,
    ) -> PortResult<RemoteReceipt> {
        let n = self.submissions.fetch_add(1, Ordering::SeqCst);
        let behavior = *self.submit.lock().unwrap();
        match behavior {
            SubmitBehavior::Accept => Ok(RemoteReceipt {
                application_id: format!("remote-{}-{}", application.job_external_id, n),
            }),
            SubmitBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(RemoteReceipt {
                    application_id: "too-late".to_string(),
                })
            }
            SubmitBehavior::Reject => Err(PortError::RemoteRejected("job closed".to_string())),
        }
    }
}
