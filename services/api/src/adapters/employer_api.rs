//! services/api/src/adapters/employer_api.rs
//!
//! The HTTP adapter for the external employer API, implementing the
//! `JobSourceService` port with `reqwest`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use job_portal_core::domain::{JobPosting, RemoteApplication, RemoteReceipt};
use job_portal_core::ports::{JobSourceService, PortError, PortResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

const JOBS_ENDPOINT: &str = "/jobs";
const APPLICATIONS_ENDPOINT: &str = "/applications";

//=========================================================================================
// Wire Types
//=========================================================================================

/// A job as the employer API sends it. Only `id` is mandatory.
#[derive(Deserialize, Debug)]
struct WireJob {
    id: Value,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    required_skills: Option<Vec<String>>,
    #[serde(default)]
    required_certifications: Option<Vec<String>>,
    #[serde(default)]
    posted_at: Option<String>,
}

impl WireJob {
    fn into_posting(self) -> Option<JobPosting> {
        let external_id = match self.id {
            Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some(JobPosting {
            external_id,
            title: self.title.unwrap_or_default(),
            role: self.role.unwrap_or_default(),
            company: self.company,
            location: self.location.unwrap_or_default(),
            description: self.description,
            required_skills: self.required_skills.unwrap_or_default(),
            required_certifications: self.required_certifications.unwrap_or_default(),
            posted_at: self.posted_at.as_deref().and_then(parse_posted_at),
        })
    }
}

/// Accepts RFC 3339, or a naive ISO-8601 timestamp taken as UTC.
pub fn parse_posted_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[derive(Serialize, Debug)]
struct WireApplication<'a> {
    job_id: Value,
    user_id: Uuid,
    resume_link: &'a str,
    skills: &'a [String],
    certifications: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    cover_letter: Option<&'a str>,
}

/// Numeric external ids go back out as JSON numbers.
fn job_id_value(external_id: &str) -> Value {
    external_id
        .parse::<u64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(external_id.to_string()))
}

#[derive(Deserialize, Debug)]
struct WireReceipt {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    application_id: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

//=========================================================================================
// The Adapter
//=========================================================================================

#[derive(Clone)]
pub struct HttpJobSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpJobSource {
    /// Builds the client with a per-request timeout covering both endpoints.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

fn transport_error(e: reqwest::Error) -> PortError {
    PortError::RemoteUnavailable(e.to_string())
}

#[async_trait]
impl JobSourceService for HttpJobSource {
    async fn fetch_jobs(&self) -> PortResult<Vec<JobPosting>> {
        let url = self.url(JOBS_ENDPOINT);
        info!("Fetching jobs from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(PortError::RemoteUnavailable(format!(
                "employer API returned {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(PortError::RemoteRejected(format!(
                "employer API returned {}",
                status
            )));
        }

        let body = response.text().await.map_err(transport_error)?;
        let jobs: Vec<WireJob> = serde_json::from_str(&body)
            .map_err(|e| PortError::RemoteRejected(format!("malformed job list: {}", e)))?;

        let total = jobs.len();
        let postings: Vec<JobPosting> = jobs.into_iter().filter_map(WireJob::into_posting).collect();
        if postings.len() < total {
            warn!(
                "Skipped {} jobs without a usable id",
                total - postings.len()
            );
        }
        Ok(postings)
    }

    async fn submit_application(
        &self,
        application: &RemoteApplication,
    ) -> PortResult<RemoteReceipt> {
        let url = self.url(APPLICATIONS_ENDPOINT);
        let payload = WireApplication {
            job_id: job_id_value(&application.job_external_id),
            user_id: application.user_id,
            resume_link: &application.resume_link,
            skills: &application.skills,
            certifications: &application.certifications,
            cover_letter: application.cover_letter.as_deref(),
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(PortError::RemoteUnavailable(format!(
                "employer API returned {}",
                status
            )));
        }

        let body = response.text().await.map_err(transport_error)?;
        let receipt: Option<WireReceipt> = serde_json::from_str(&body).ok();

        match receipt {
            Some(WireReceipt {
                success: true,
                application_id: Some(id),
                ..
            }) if status.is_success() => {
                let application_id = match id {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                Ok(RemoteReceipt { application_id })
            }
            Some(WireReceipt {
                error: Some(error), ..
            }) => Err(PortError::RemoteRejected(error)),
            _ if !status.is_success() => Err(PortError::RemoteRejected(format!(
                "employer API returned {}",
                status
            ))),
            _ => Err(PortError::RemoteRejected(
                "malformed application receipt".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn posted_at_accepts_rfc3339_and_naive_timestamps() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        assert_eq!(parse_posted_at("2024-05-01T09:30:00Z"), Some(expected));
        assert_eq!(parse_posted_at("2024-05-01T11:30:00+02:00"), Some(expected));
        assert_eq!(parse_posted_at("2024-05-01T09:30:00"), Some(expected));
        assert_eq!(parse_posted_at("2024-05-01T09:30:00.000"), Some(expected));
        assert_eq!(parse_posted_at("yesterday"), None);
    }

    #[test]
    fn numeric_and_string_ids_are_both_accepted() {
        let jobs: Vec<WireJob> =
            serde_json::from_str(r#"[{"id": 1001, "title": "Cook"}, {"id": "abc"}, {"id": null}]"#)
                .unwrap();
        let ids: Vec<String> = jobs
            .into_iter()
            .filter_map(WireJob::into_posting)
            .map(|p| p.external_id)
            .collect();
        assert_eq!(ids, vec!["1001".to_string(), "abc".to_string()]);
    }

    #[test]
    fn missing_arrays_become_empty() {
        let job: WireJob = serde_json::from_str(r#"{"id": "7", "title": "Driver"}"#).unwrap();
        let posting = job.into_posting().unwrap();
        assert!(posting.required_skills.is_empty());
        assert!(posting.required_certifications.is_empty());
        assert_eq!(posting.company, None);
    }

    #[test]
    fn job_id_is_numeric_when_possible() {
        assert_eq!(job_id_value("1001"), serde_json::json!(1001));
        assert_eq!(job_id_value("JOB-9"), serde_json::json!("JOB-9"));
    }
}
