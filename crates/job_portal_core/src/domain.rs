//! crates/job_portal_core/src/domain.rs
//!
//! Defines the pure, core data structures for the job portal.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Company name used when the job source omits one.
pub const DEFAULT_COMPANY: &str = "Acme Corp";

// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
}

/// A user's job-seeking profile. Owned 1:1 by a [`User`].
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub user_id: Uuid,
    pub headline: Option<String>,
    pub summary: Option<String>,
    pub experience: Option<String>,
    pub resume_link: Option<String>,
    pub skills: Vec<String>,
    pub certifications: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// An empty profile for `user_id`.
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            headline: None,
            summary: None,
            experience: None,
            resume_link: None,
            skills: Vec::new(),
            certifications: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// A profile may be used to apply once it has a resume link, experience,
    /// and at least one skill and one certification.
    pub fn is_complete(&self) -> bool {
        let present = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.trim().is_empty());
        present(&self.resume_link)
            && present(&self.experience)
            && !self.skills.is_empty()
            && !self.certifications.is_empty()
    }
}

/// A job posting as it lives in the local cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: Uuid,
    /// The job source's own identifier, stable across syncs.
    pub external_id: String,
    pub title: String,
    pub role: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub required_skills: Vec<String>,
    pub required_certifications: Vec<String>,
    pub posted_at: DateTime<Utc>,
    pub last_synced_at: DateTime<Utc>,
}

/// A job posting as delivered by the external job source, before reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct JobPosting {
    pub external_id: String,
    pub title: String,
    pub role: String,
    pub company: Option<String>,
    pub location: String,
    pub description: Option<String>,
    pub required_skills: Vec<String>,
    pub required_certifications: Vec<String>,
    pub posted_at: Option<DateTime<Utc>>,
}

impl JobPosting {
    /// Builds the cached form of this posting, keeping `id` for rows that already exist.
    pub fn into_job(self, id: Uuid, synced_at: DateTime<Utc>) -> Job {
        Job {
            id,
            external_id: self.external_id,
            title: self.title,
            role: self.role,
            company: self
                .company
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_COMPANY.to_string()),
            location: self.location,
            description: self.description.unwrap_or_default(),
            required_skills: self.required_skills,
            required_certifications: self.required_certifications,
            posted_at: self.posted_at.unwrap_or(synced_at),
            last_synced_at: synced_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationStatus {
    Submitted,
    Withdrawn,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(ApplicationStatus::Submitted),
            "withdrawn" => Ok(ApplicationStatus::Withdrawn),
            other => Err(format!("unknown application status '{}'", other)),
        }
    }
}

/// A submitted application. Skills and certifications are a snapshot taken at
/// submission time and never follow later profile edits.
#[derive(Debug, Clone, PartialEq)]
pub struct Application {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_id: Uuid,
    pub resume_link: String,
    pub skills: Vec<String>,
    pub certifications: Vec<String>,
    pub cover_letter: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub remote_application_id: Option<String>,
}

/// The payload forwarded to the external job source on submission.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteApplication {
    pub job_external_id: String,
    pub user_id: Uuid,
    pub resume_link: String,
    pub skills: Vec<String>,
    pub certifications: Vec<String>,
    pub cover_letter: Option<String>,
}

/// What the job source hands back for an accepted application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteReceipt {
    pub application_id: String,
}

/// Two distinct users, stored lowest id first so the pair is unordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserPair {
    low: Uuid,
    high: Uuid,
}

impl UserPair {
    /// Returns `None` when both ids are the same user.
    pub fn new(a: Uuid, b: Uuid) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn low(&self) -> Uuid {
        self.low
    }

    pub fn high(&self) -> Uuid {
        self.high
    }
}

/// A pending, directed request from `requester_id` to `recipient_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRequest {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub recipient_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A symmetric connection; `user_one_id` is always the lower id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: Uuid,
    pub user_one_id: Uuid,
    pub user_two_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Connection {
    pub fn counterpart_for(&self, user_id: Uuid) -> Option<Uuid> {
        if self.user_one_id == user_id {
            Some(self.user_two_id)
        } else if self.user_two_id == user_id {
            Some(self.user_one_id)
        } else {
            None
        }
    }
}

/// Where an unordered pair of users currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairState {
    Unconnected,
    Pending { requester: Uuid, recipient: Uuid },
    Connected,
}

/// The write a connection action resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairChange {
    Keep,
    OpenRequest { requester: Uuid, recipient: Uuid },
    /// Drop every request between the pair and create the connection.
    Connect,
    /// Drop every request between the pair.
    ClearRequests,
    /// Drop the connection and every request between the pair.
    Disconnect,
}

/// A persisted chat message. Append-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub room: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
