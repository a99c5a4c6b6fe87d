//! services/api/src/adapters/sample_jobs.rs
//!
//! A `JobSourceService` backed by the built-in sample postings, used when the
//! employer API is disabled.

use async_trait::async_trait;
use chrono::Utc;
use job_portal_core::domain::{JobPosting, RemoteApplication, RemoteReceipt};
use job_portal_core::ports::{JobSourceService, PortResult};
use job_portal_core::seed::sample_postings;
use tracing::info;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct StaticJobSource;

impl StaticJobSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl JobSourceService for StaticJobSource {
    async fn fetch_jobs(&self) -> PortResult<Vec<JobPosting>> {
        Ok(sample_postings(Utc::now()))
    }

    async fn submit_application(
        &self,
        application: &RemoteApplication,
    ) -> PortResult<RemoteReceipt> {
        let application_id = format!("mock-{}", Uuid::new_v4());
        info!(
            "Sample source accepted application for job {} as {}",
            application.job_external_id, application_id
        );
        Ok(RemoteReceipt { application_id })
    }
}
